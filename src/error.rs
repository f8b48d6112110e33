//! Pipeline error taxonomy.
//!
//! Every failure in the trainer or scorer maps onto one of four
//! conditions: a missing file, a schema violation, a corrupt artifact or a
//! write failure. Library functions return [`PipelineError`]; the two stage
//! entry points wrap it in a [`StageError`] so the terminating message names
//! the stage that failed.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::ConfigError;

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Loading and validating configuration
    Config,
    /// Fitting scaler + forest on the baseline table
    Train,
    /// Scoring the second table against persisted artifacts
    Score,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Config => write!(f, "config"),
            Stage::Train => write!(f, "train"),
            Stage::Score => write!(f, "score"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("schema error: {0}")]
    Schema(String),

    #[error("cannot deserialize {}: {reason}", .path.display())]
    Deserialization { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PipelineError {
    /// Classify an I/O failure on `path`: a missing file becomes `NotFound`,
    /// everything else stays an I/O error.
    pub fn from_io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path: path.to_path_buf() }
        } else {
            Self::Io { path: path.to_path_buf(), source }
        }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    pub fn deserialization(path: &Path, reason: impl fmt::Display) -> Self {
        Self::Deserialization {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Short category name used in structured log fields.
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFound",
            Self::Schema(_) => "SchemaError",
            Self::Deserialization { .. } => "DeserializationError",
            Self::Io { .. } => "IOError",
            Self::Config(_) => "ConfigError",
        }
    }

    /// Attach the stage this error aborted.
    pub fn at(self, stage: Stage) -> StageError {
        StageError { stage, error: self }
    }
}

/// A [`PipelineError`] tagged with the stage it terminated.
#[derive(Debug, Error)]
#[error("{stage} stage failed ({}): {error}", .error.category())]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub error: PipelineError,
}

/// Tag the error side of a `Result` with its stage.
pub trait StageContext<T> {
    fn in_stage(self, stage: Stage) -> Result<T, StageError>;
}

impl<T> StageContext<T> for Result<T, PipelineError> {
    fn in_stage(self, stage: Stage) -> Result<T, StageError> {
        self.map_err(|e| e.at(stage))
    }
}
