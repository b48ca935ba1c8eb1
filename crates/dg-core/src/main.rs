//! driftgate CLI entry point.
//!
//! Three independently invokable stages over the shared artifact layout.
//! The exit code is the contract consumed by the calling CI gate:
//! 0 = no high-risk drift, 1 = remediation required, >= 10 = error.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing::error;

use dg_config::{resolve_config, ConfigOverrides};
use dg_core::classify::run_classify;
use dg_core::extract::run_extract;
use dg_core::train::run_train;
use dg_core::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "driftgate",
    version,
    about = "Drift risk classification gate for infrastructure CI"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract features from detector change records
    Extract {
        /// Change-record input artifact from the drift detector
        #[arg(long, env = "DRIFTGATE_INPUT")]
        input: Option<PathBuf>,
        /// Feature table output artifact
        #[arg(long, env = "DRIFTGATE_FEATURES")]
        features: Option<PathBuf>,
    },
    /// Train the risk model from labeled drift history
    Train {
        /// Labeled historical feature table
        #[arg(long, env = "DRIFTGATE_HISTORY")]
        history: Option<PathBuf>,
        /// Model artifact output path
        #[arg(long, env = "DRIFTGATE_MODEL")]
        model: Option<PathBuf>,
        /// Seed for deterministic training
        #[arg(long, env = "DRIFTGATE_SEED")]
        seed: Option<u64>,
    },
    /// Classify extracted features and gate on the risk decision
    Classify {
        /// Feature table artifact
        #[arg(long, env = "DRIFTGATE_FEATURES")]
        features: Option<PathBuf>,
        /// Model artifact path
        #[arg(long, env = "DRIFTGATE_MODEL")]
        model: Option<PathBuf>,
        /// Predictions output artifact
        #[arg(long, env = "DRIFTGATE_PREDICTIONS")]
        predictions: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    process::exit(run(cli).as_i32());
}

fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Commands::Extract { input, features } => {
            let config = resolve_config(ConfigOverrides {
                input_path: input,
                features_path: features,
                ..Default::default()
            });
            match run_extract(&config) {
                Ok(summary) => {
                    if summary.degraded_to_baseline {
                        println!("no usable drift input; safe baseline features generated");
                    }
                    println!(
                        "features extracted: {} row(s) -> {}",
                        summary.rows,
                        summary.features_path.display()
                    );
                    ExitCode::Clean
                }
                Err(e) => fail(&e),
            }
        }
        Commands::Train {
            history,
            model,
            seed,
        } => {
            let config = resolve_config(ConfigOverrides {
                history_path: history,
                model_path: model,
                training_seed: seed,
                ..Default::default()
            });
            match run_train(&config) {
                Ok(summary) => {
                    if summary.used_bootstrap {
                        println!("drift history unusable; trained on bootstrap dataset");
                    }
                    println!(
                        "model {} trained on {} example(s) -> {}",
                        summary.model_id,
                        summary.examples,
                        summary.model_path.display()
                    );
                    ExitCode::Clean
                }
                Err(e) => fail(&e),
            }
        }
        Commands::Classify {
            features,
            model,
            predictions,
        } => {
            let config = resolve_config(ConfigOverrides {
                features_path: features,
                model_path: model,
                predictions_path: predictions,
                ..Default::default()
            });
            match run_classify(&config) {
                Ok(outcome) => {
                    for p in &outcome.predictions {
                        println!(
                            "{}\t{}\t{}",
                            p.row.address, p.row.resource_type, p.predicted_risk
                        );
                    }
                    if outcome.high_risk {
                        println!("high-risk drift detected; remediation required");
                        ExitCode::HighRisk
                    } else {
                        println!("only safe drift detected");
                        ExitCode::Clean
                    }
                }
                Err(e) => fail(&e),
            }
        }
    }
}

fn fail(err: &dg_common::Error) -> ExitCode {
    let code = ExitCode::from_error(err);
    error!(code = code.as_i32(), error = %err, "stage failed");
    code
}
