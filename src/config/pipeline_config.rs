//! Pipeline Configuration - paths, input format, forest parameters
//!
//! Every field has a default, so running without a config file scores
//! `data/alfa-romeo-faulty-data.csv` against a model trained on the normal data.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;
use crate::ml_engine::{Contamination, IsolationForestParams, MaxSamples};
use crate::types::DateOrder;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a train / score run.
///
/// Load with `PipelineConfig::load()` which searches:
/// 1. explicit `--config` path
/// 2. `$TELEMETRY_ANOMALY_CONFIG` env var
/// 3. `./telemetry_anomaly.toml`
/// 4. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub forest: IsolationForestParams,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PipelineConfig {
    /// Load configuration. An explicit path must exist and parse; the
    /// env-var and working-directory candidates fall back to defaults with a
    /// warning when they are broken.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            let config = Self::load_from_file(path)?;
            info!(path = %path.display(), "Loaded pipeline config");
            return Ok(config);
        }

        // 1. Check env var
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded pipeline config from {}", defaults::CONFIG_ENV_VAR);
                        return Ok(config);
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from env, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", defaults::CONFIG_ENV_VAR);
            }
        }

        // 2. Check working directory
        let local = PathBuf::from(defaults::CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(path = %local.display(), "Loaded pipeline config");
                    return Ok(config);
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", defaults::CONFIG_FILE);
                }
            }
        }

        // 3. Defaults
        info!("No config file found — using built-in defaults");
        Ok(Self::default())
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys are warned about,
    /// never rejected.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate value ranges. Suspicious-but-legal values only warn.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (errors, warnings) = super::validation::validate_ranges(self);
        for w in &warnings {
            warn!("{}", w);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Paths
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Baseline table (numeric features only)
    pub baseline: PathBuf,
    /// Table to score (features + timestamp column)
    pub scoring: PathBuf,
    /// Scored output table
    pub output: PathBuf,
    /// Directory for scaler, model and manifest
    pub models_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            baseline: PathBuf::from(defaults::BASELINE_PATH),
            scoring: PathBuf::from(defaults::SCORING_PATH),
            output: PathBuf::from(defaults::OUTPUT_PATH),
            models_dir: PathBuf::from(defaults::MODELS_DIR),
        }
    }
}

impl PathsConfig {
    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths::in_dir(&self.models_dir)
    }
}

/// Fixed locations of the three persisted artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub scaler: PathBuf,
    pub model: PathBuf,
    pub manifest: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            scaler: dir.join(defaults::SCALER_FILE),
            model: dir.join(defaults::MODEL_FILE),
            manifest: dir.join(defaults::MANIFEST_FILE),
        }
    }
}

// ============================================================================
// Input Format
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Single-byte field delimiter
    pub delimiter: char,
    /// Timestamp column in the scoring table
    pub timestamp_column: String,
    /// Read `NN/NN/YYYY` timestamps as day/month instead of month/day
    pub day_first: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            delimiter: defaults::DELIMITER,
            timestamp_column: defaults::TIMESTAMP_COLUMN.to_string(),
            day_first: false,
        }
    }
}

impl InputConfig {
    /// Delimiter as the byte the CSV reader expects. Validation guarantees ASCII.
    pub fn delimiter_byte(&self) -> u8 {
        u8::try_from(self.delimiter).unwrap_or(b',')
    }

    pub fn date_order(&self) -> DateOrder {
        if self.day_first {
            DateOrder::DayFirst
        } else {
            DateOrder::MonthFirst
        }
    }
}

// ============================================================================
// Scoring
// ============================================================================

/// Which scaler the scorer applies to the scoring table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ScalerMode {
    /// Fit a fresh scaler on the scoring table (legacy behaviour)
    #[default]
    Refit,
    /// Apply the scaler persisted by the trainer
    Reuse,
}

impl std::fmt::Display for ScalerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalerMode::Refit => write!(f, "refit"),
            ScalerMode::Reuse => write!(f, "reuse"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub scaler_mode: ScalerMode,
}

// ============================================================================
// Logging
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
