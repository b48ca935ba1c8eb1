//! Seeded bagged decision-tree ensemble.
//!
//! A small in-house ensemble over tabular numeric features: each tree is
//! grown on a bootstrap resample with exhaustive gini splitting, and the
//! ensemble predicts by majority vote. Chosen for robustness to tiny,
//! noisy, mixed-scale training sets; the design constraint is only that
//! training is deterministic under a fixed seed and honors the
//! fit/predict contract.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_TREE_COUNT: usize = 25;
pub const DEFAULT_MAX_DEPTH: usize = 4;
pub const DEFAULT_MIN_LEAF: usize = 1;

/// Ensemble hyperparameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub tree_count: usize,
    pub max_depth: usize,
    pub min_leaf: usize,
    pub seed: u64,
}

impl ForestConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            tree_count: DEFAULT_TREE_COUNT,
            max_depth: DEFAULT_MAX_DEPTH,
            min_leaf: DEFAULT_MIN_LEAF,
            seed: 42,
        }
    }
}

/// Errors surfaced by [`Forest::fit`].
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("training set is empty")]
    EmptyDataset,

    #[error("feature matrix has {features} rows but {labels} labels")]
    LabelMismatch { features: usize, labels: usize },

    #[error("feature row {row} has {got} columns, expected {expected}")]
    RaggedRow {
        row: usize,
        got: usize,
        expected: usize,
    },

    #[error("non-finite feature value at row {row}, column {column}")]
    NonFinite { row: usize, column: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        class: u8,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Tree {
    root: Node,
}

impl Tree {
    fn predict(&self, x: &[f64]) -> u8 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { class } => return *class,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    // Out-of-range feature indices read as 0.0 rather than
                    // panicking on a hand-edited artifact.
                    let value = x.get(*feature).copied().unwrap_or(0.0);
                    node = if value <= *threshold { left } else { right };
                }
            }
        }
    }
}

/// Bagged decision-tree ensemble with binary {0, 1} output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forest {
    pub config: ForestConfig,
    pub feature_count: usize,
    trees: Vec<Tree>,
}

impl Forest {
    /// Fit an ensemble on `x` (rows of numeric features, canonical column
    /// order) against binary labels `y`. Deterministic: the same inputs,
    /// hyperparameters, and seed always yield the same ensemble.
    pub fn fit(x: &[Vec<f64>], y: &[u8], config: ForestConfig) -> Result<Self, TrainError> {
        if x.is_empty() {
            return Err(TrainError::EmptyDataset);
        }
        if x.len() != y.len() {
            return Err(TrainError::LabelMismatch {
                features: x.len(),
                labels: y.len(),
            });
        }
        let feature_count = x[0].len();
        for (row, features) in x.iter().enumerate() {
            if features.len() != feature_count {
                return Err(TrainError::RaggedRow {
                    row,
                    got: features.len(),
                    expected: feature_count,
                });
            }
            for (column, value) in features.iter().enumerate() {
                if !value.is_finite() {
                    return Err(TrainError::NonFinite { row, column });
                }
            }
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let n = x.len();
        let mut trees = Vec::with_capacity(config.tree_count);
        for _ in 0..config.tree_count {
            let sample: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
            let root = grow(&sample, x, y, 0, &config);
            trees.push(Tree { root });
        }

        Ok(Forest {
            config,
            feature_count,
            trees,
        })
    }

    /// Majority vote over the ensemble: 1 iff strictly more than half the
    /// trees predict 1.
    pub fn predict(&self, x: &[f64]) -> u8 {
        let ones = self
            .trees
            .iter()
            .filter(|tree| tree.predict(x) == 1)
            .count();
        u8::from(ones * 2 > self.trees.len())
    }
}

impl crate::RiskModel for Forest {
    fn predict_row(&self, features: &[f64]) -> dg_common::RiskLevel {
        // A trained model never emits Safe: its negative class means
        // "not high", not "provably nothing happened".
        if self.predict(features) == 1 {
            dg_common::RiskLevel::High
        } else {
            dg_common::RiskLevel::Low
        }
    }
}

fn majority(samples: &[usize], y: &[u8]) -> u8 {
    let ones = samples.iter().filter(|&&s| y[s] == 1).count();
    // Ties break toward the negative class.
    u8::from(ones * 2 > samples.len())
}

fn is_pure(samples: &[usize], y: &[u8]) -> bool {
    samples.windows(2).all(|w| y[w[0]] == y[w[1]])
}

fn gini(ones: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p1 = ones as f64 / total as f64;
    let p0 = 1.0 - p1;
    1.0 - p0 * p0 - p1 * p1
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

/// Exhaustive best split: every feature, every midpoint between
/// consecutive distinct values. First strictly-better candidate wins,
/// which keeps tie-breaking deterministic.
fn best_split(samples: &[usize], x: &[Vec<f64>], y: &[u8], min_leaf: usize) -> Option<SplitCandidate> {
    let feature_count = x[samples[0]].len();
    let mut best: Option<SplitCandidate> = None;

    for feature in 0..feature_count {
        let mut values: Vec<f64> = samples.iter().map(|&s| x[s][feature]).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values.dedup();

        for pair in values.windows(2) {
            let threshold = (pair[0] + pair[1]) / 2.0;
            let mut left_total = 0;
            let mut left_ones = 0;
            let mut right_total = 0;
            let mut right_ones = 0;
            for &s in samples {
                if x[s][feature] <= threshold {
                    left_total += 1;
                    left_ones += usize::from(y[s] == 1);
                } else {
                    right_total += 1;
                    right_ones += usize::from(y[s] == 1);
                }
            }
            if left_total < min_leaf || right_total < min_leaf {
                continue;
            }
            let total = (left_total + right_total) as f64;
            let impurity = (left_total as f64 / total) * gini(left_ones, left_total)
                + (right_total as f64 / total) * gini(right_ones, right_total);
            let better = match &best {
                Some(current) => impurity < current.impurity,
                None => true,
            };
            if better {
                best = Some(SplitCandidate {
                    feature,
                    threshold,
                    impurity,
                });
            }
        }
    }

    best
}

fn grow(samples: &[usize], x: &[Vec<f64>], y: &[u8], depth: usize, config: &ForestConfig) -> Node {
    if depth >= config.max_depth || samples.len() < 2 * config.min_leaf || is_pure(samples, y) {
        return Node::Leaf {
            class: majority(samples, y),
        };
    }

    let Some(split) = best_split(samples, x, y, config.min_leaf) else {
        return Node::Leaf {
            class: majority(samples, y),
        };
    };

    let (left, right): (Vec<usize>, Vec<usize>) = samples
        .iter()
        .copied()
        .partition(|&s| x[s][split.feature] <= split.threshold);

    Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left: Box::new(grow(&left, x, y, depth + 1, config)),
        right: Box::new(grow(&right, x, y, depth + 1, config)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RiskModel;
    use dg_common::RiskLevel;
    use proptest::prelude::*;

    fn bootstrap_matrix() -> (Vec<Vec<f64>>, Vec<u8>) {
        (
            vec![
                vec![1.0, 0.0, 1.0],
                vec![3.0, 1.0, 5.0],
                vec![10.0, 1.0, 12.0],
                vec![2.0, 0.0, 2.0],
            ],
            vec![0, 1, 1, 0],
        )
    }

    #[test]
    fn fits_and_separates_bootstrap_examples() {
        let (x, y) = bootstrap_matrix();
        let forest = Forest::fit(&x, &y, ForestConfig::with_seed(42)).unwrap();
        for (features, label) in x.iter().zip(&y) {
            assert_eq!(forest.predict(features), *label, "row {features:?}");
        }
    }

    #[test]
    fn fit_is_deterministic_for_fixed_seed() {
        let (x, y) = bootstrap_matrix();
        let a = Forest::fit(&x, &y, ForestConfig::with_seed(42)).unwrap();
        let b = Forest::fit(&x, &y, ForestConfig::with_seed(42)).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn different_seeds_may_differ_but_stay_valid() {
        let (x, y) = bootstrap_matrix();
        let forest = Forest::fit(&x, &y, ForestConfig::with_seed(7)).unwrap();
        for features in &x {
            assert!(forest.predict(features) <= 1);
        }
    }

    #[test]
    fn single_class_dataset_predicts_constant() {
        let x = vec![vec![1.0, 0.0, 1.0], vec![2.0, 0.0, 3.0]];
        let y = vec![0, 0];
        let forest = Forest::fit(&x, &y, ForestConfig::default()).unwrap();
        assert_eq!(forest.predict(&[100.0, 1.0, 50.0]), 0);
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let err = Forest::fit(&[], &[], ForestConfig::default()).unwrap_err();
        assert!(matches!(err, TrainError::EmptyDataset));
    }

    #[test]
    fn label_count_mismatch_is_rejected() {
        let x = vec![vec![1.0, 0.0, 1.0]];
        let err = Forest::fit(&x, &[0, 1], ForestConfig::default()).unwrap_err();
        assert!(matches!(err, TrainError::LabelMismatch { .. }));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let x = vec![vec![1.0, 0.0, 1.0], vec![1.0, 0.0]];
        let err = Forest::fit(&x, &[0, 1], ForestConfig::default()).unwrap_err();
        assert!(matches!(err, TrainError::RaggedRow { row: 1, .. }));
    }

    #[test]
    fn non_finite_features_are_rejected() {
        let x = vec![vec![1.0, f64::NAN, 1.0]];
        let err = Forest::fit(&x, &[0], ForestConfig::default()).unwrap_err();
        assert!(matches!(err, TrainError::NonFinite { row: 0, column: 1 }));
    }

    #[test]
    fn serde_roundtrip_preserves_predictions() {
        let (x, y) = bootstrap_matrix();
        let forest = Forest::fit(&x, &y, ForestConfig::with_seed(42)).unwrap();
        let json = serde_json::to_string(&forest).unwrap();
        let back: Forest = serde_json::from_str(&json).unwrap();
        for features in &x {
            assert_eq!(forest.predict(features), back.predict(features));
        }
    }

    #[test]
    fn risk_model_never_emits_safe() {
        let (x, y) = bootstrap_matrix();
        let forest = Forest::fit(&x, &y, ForestConfig::with_seed(42)).unwrap();
        for features in &x {
            assert_ne!(forest.predict_row(features), RiskLevel::Safe);
        }
    }

    proptest! {
        #[test]
        fn prediction_is_always_binary(
            a in 0.0f64..100.0,
            b in 0.0f64..1.0,
            c in 0.1f64..50.0,
        ) {
            let (x, y) = bootstrap_matrix();
            let forest = Forest::fit(&x, &y, ForestConfig::with_seed(42)).unwrap();
            prop_assert!(forest.predict(&[a, b, c]) <= 1);
        }
    }
}
