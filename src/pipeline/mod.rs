//! Train/score pipeline
//!
//! ```text
//! TRAIN:  baseline CSV -> StandardScaler.fit -> IsolationForest.fit -> scaler + model + manifest
//! SCORE:  manifest + scaler + model, scoring CSV -> standardize -> decision_function -> scored CSV
//! ```
//!
//! The two stages share nothing in memory: `run` trains, then the scorer
//! reloads everything from disk exactly as a separate invocation would.

pub mod scorer;
pub mod trainer;

pub use scorer::{load_artifacts, score, score_table, LoadedArtifacts, ScoringReport};
pub use trainer::{fit_baseline, persist, train, FittedModel, TrainingReport};

use tracing::info;

use crate::config::PipelineConfig;
use crate::error::StageError;

/// Reports from a full train-then-score run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub training: TrainingReport,
    pub scoring: ScoringReport,
}

/// Train on the baseline table, then score the scoring table. Scoring is
/// skipped if training fails.
pub fn run(config: &PipelineConfig) -> Result<RunReport, StageError> {
    let training = train(config)?;
    let scoring = score(config)?;
    info!(
        trained_rows = training.rows,
        scored_rows = scoring.rows,
        outliers = scoring.outliers,
        "Pipeline run complete"
    );
    Ok(RunReport { training, scoring })
}
