//! telemetry-anomaly: Isolation Forest anomaly scoring for vehicle telemetry
//!
//! Two batch stages joined by files on disk.
//!
//! ## Architecture
//!
//! - **Trainer**: baseline table -> StandardScaler + IsolationForest -> artifacts
//! - **Scorer**: artifacts + scoring table -> per-row score, rescaled scores, label
//! - **Storage**: zstd artifacts, JSON manifest with digests, atomic CSV output
//! - **Config**: TOML with defaults, typo suggestions and range validation

pub mod acquisition;
pub mod config;
pub mod error;
pub mod ml_engine;
pub mod pipeline;
pub mod storage;
pub mod types;

// Re-export configuration
pub use config::{PipelineConfig, ScalerMode};

// Re-export errors
pub use error::{PipelineError, Stage, StageError};

// Re-export ML types
pub use ml_engine::{
    AnomalyLabel, Contamination, IsolationForest, IsolationForestParams, MaxSamples,
    ScoreSummary, StandardScaler,
};

// Re-export pipeline entry points
pub use pipeline::{run, score, train, RunReport, ScoringReport, TrainingReport};

// Re-export data types
pub use types::{FeatureSchema, ObservationTable, RowScore, ScoredTable};
