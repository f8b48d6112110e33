//! telemetry-anomaly - isolation-forest anomaly scoring for vehicle telemetry
//!
//! Trains a StandardScaler + IsolationForest on a baseline table of normal
//! telemetry, persists the artifacts, and scores a second table, writing
//! per-row anomaly scores and labels.
//!
//! # Usage
//!
//! ```bash
//! # Train then score with built-in defaults (or ./telemetry_anomaly.toml)
//! telemetry-anomaly
//!
//! # Train only
//! telemetry-anomaly train --input data/normal.csv --models-dir models
//!
//! # Score with the baseline scaler instead of refitting
//! telemetry-anomaly score --input data/faulty.csv --output scored.csv --scaler-mode reuse
//! ```
//!
//! # Environment Variables
//!
//! - `TELEMETRY_ANOMALY_CONFIG`: Path to a TOML config file
//! - `RUST_LOG`: Logging filter (default: `[logging] level`, else info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use telemetry_anomaly::config::{LoggingConfig, PipelineConfig, ScalerMode};
use telemetry_anomaly::error::{PipelineError, Stage};
use telemetry_anomaly::pipeline;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "telemetry-anomaly")]
#[command(about = "Isolation-forest anomaly scoring for vehicle telemetry")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML config file (overrides $TELEMETRY_ANOMALY_CONFIG)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Emit JSON log lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Fit scaler and forest on the baseline table and persist them
    Train {
        /// Baseline table
        #[arg(long)]
        input: Option<PathBuf>,
        /// Artifact directory
        #[arg(long)]
        models_dir: Option<PathBuf>,
    },

    /// Score a table against persisted artifacts
    Score {
        /// Table to score
        #[arg(long)]
        input: Option<PathBuf>,
        /// Scored output table
        #[arg(long)]
        output: Option<PathBuf>,
        /// Artifact directory
        #[arg(long)]
        models_dir: Option<PathBuf>,
        /// Scaler applied to the scoring table
        #[arg(long, value_enum)]
        scaler_mode: Option<ScalerMode>,
    },

    /// Train, then score (default)
    Run {
        /// Baseline table
        #[arg(long)]
        baseline: Option<PathBuf>,
        /// Table to score
        #[arg(long)]
        input: Option<PathBuf>,
        /// Scored output table
        #[arg(long)]
        output: Option<PathBuf>,
        /// Artifact directory
        #[arg(long)]
        models_dir: Option<PathBuf>,
        /// Scaler applied to the scoring table
        #[arg(long, value_enum)]
        scaler_mode: Option<ScalerMode>,
    },
}

impl SubCommand {
    /// Fold command-line overrides into the loaded config.
    fn apply(&self, config: &mut PipelineConfig) {
        let paths = &mut config.paths;
        match self {
            SubCommand::Train { input, models_dir } => {
                set(&mut paths.baseline, input);
                set(&mut paths.models_dir, models_dir);
            }
            SubCommand::Score {
                input,
                output,
                models_dir,
                scaler_mode,
            } => {
                set(&mut paths.scoring, input);
                set(&mut paths.output, output);
                set(&mut paths.models_dir, models_dir);
                set(&mut config.scoring.scaler_mode, scaler_mode);
            }
            SubCommand::Run {
                baseline,
                input,
                output,
                models_dir,
                scaler_mode,
            } => {
                set(&mut paths.baseline, baseline);
                set(&mut paths.scoring, input);
                set(&mut paths.output, output);
                set(&mut paths.models_dir, models_dir);
                set(&mut config.scoring.scaler_mode, scaler_mode);
            }
        }
    }
}

fn set<T: Clone>(target: &mut T, value: &Option<T>) {
    if let Some(v) = value {
        *target = v.clone();
    }
}

// ============================================================================
// Logging
// ============================================================================

fn env_filter(default_level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level))
}

fn init_logging(logging: &LoggingConfig, force_json: bool) {
    if logging.json || force_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter(&logging.level))
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter(&logging.level))
            .with_target(false)
            .init();
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    let args = CliArgs::parse();
    let command = args.command.unwrap_or(SubCommand::Run {
        baseline: None,
        input: None,
        output: None,
        models_dir: None,
        scaler_mode: None,
    });

    // Config warnings are emitted before the configured subscriber exists,
    // so route them through a default one.
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(env_filter("info"))
        .with_target(false)
        .finish();
    let loaded = tracing::subscriber::with_default(bootstrap, || {
        PipelineConfig::load(args.config.as_deref()).and_then(|mut config| {
            command.apply(&mut config);
            config.validate().map(|()| config)
        })
    });
    let config = loaded
        .map_err(|e| PipelineError::from(e).at(Stage::Config))
        .context("loading configuration")?;

    init_logging(&config.logging, args.log_json);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        command = ?command,
        "telemetry-anomaly starting"
    );

    let (name, outcome) = match command {
        SubCommand::Train { .. } => ("train", pipeline::train(&config).map(|_| ())),
        SubCommand::Score { .. } => ("score", pipeline::score(&config).map(|_| ())),
        SubCommand::Run { .. } => ("run", pipeline::run(&config).map(|_| ())),
    };

    if let Err(e) = &outcome {
        error!(stage = %e.stage, category = e.error.category(), "{}", e.error);
    }
    outcome.with_context(|| format!("{name} command failed"))
}
