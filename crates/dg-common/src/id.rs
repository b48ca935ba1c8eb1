//! Model identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a trained model artifact.
///
/// Format: `model-<date>-<time>-<random>`
/// Example: `model-20260807-143022-9f3ab2`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(pub String);

impl ModelId {
    /// Generate a new model ID.
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        let random: String = uuid::Uuid::new_v4().to_string().chars().take(6).collect();
        ModelId(format!("model-{}-{}", now.format("%Y%m%d-%H%M%S"), random))
    }

    /// Parse an existing model ID string.
    pub fn parse(s: &str) -> Option<Self> {
        if s.starts_with("model-") && s.len() > 10 {
            Some(ModelId(s.to_string()))
        } else {
            None
        }
    }
}

impl Default for ModelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_id_parses() {
        let id = ModelId::new();
        assert!(ModelId::parse(&id.0).is_some());
    }

    #[test]
    fn rejects_foreign_prefix() {
        assert!(ModelId::parse("sess-20260807-143022-abc123").is_none());
        assert!(ModelId::parse("model-").is_none());
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(ModelId::new(), ModelId::new());
    }
}
