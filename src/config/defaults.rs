//! Pipeline default constants.
//!
//! The path defaults are the standard batch layout: baseline and
//! scoring CSVs under `data/`, fitted artifacts under `models/`.

// ============================================================================
// Paths
// ============================================================================

/// Baseline ("normal") telemetry table used for training.
pub const BASELINE_PATH: &str = "data/alfa-romeo-normal-data.csv";

/// Telemetry table to score against the trained artifacts.
pub const SCORING_PATH: &str = "data/alfa-romeo-faulty-data.csv";

/// Scored output table.
pub const OUTPUT_PATH: &str = "data/alfa-romeo-faulty-data-anomalies.csv";

/// Directory holding the scaler, model and manifest.
pub const MODELS_DIR: &str = "models";

/// Serialized scaler file name inside the models directory.
pub const SCALER_FILE: &str = "scaler.json.zst";

/// Serialized model file name inside the models directory.
pub const MODEL_FILE: &str = "iforest.json.zst";

/// Artifact manifest file name inside the models directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Config file looked up in the working directory.
pub const CONFIG_FILE: &str = "telemetry_anomaly.toml";

/// Environment variable pointing at a config file.
pub const CONFIG_ENV_VAR: &str = "TELEMETRY_ANOMALY_CONFIG";

// ============================================================================
// Input
// ============================================================================

/// Timestamp column segregated from the scoring table's features.
pub const TIMESTAMP_COLUMN: &str = "Datetime";

/// Field delimiter for input and output tables.
pub const DELIMITER: char = ',';

// ============================================================================
// Isolation Forest
// ============================================================================

/// Number of isolation trees in the ensemble.
pub const N_ESTIMATORS: usize = 100;

/// Seed for deterministic tree construction.
pub const FOREST_SEED: u64 = 42;

// ============================================================================
// Artifacts
// ============================================================================

/// zstd level for artifact compression.
pub const ZSTD_LEVEL: i32 = 3;

/// Manifest / artifact envelope format version.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

// ============================================================================
// Scored output columns
// ============================================================================

pub const SCORE_COLUMN: &str = "Anomaly_Score";
pub const SCORE_X1000_COLUMN: &str = "Anomaly_Score_IFR_Norm";
pub const SCORE_X10_COLUMN: &str = "Anomaly_Score_IPW_Norm";
pub const SCORE_X100_COLUMN: &str = "Anomaly_Score_IT_Norm";
pub const LABEL_COLUMN: &str = "Anomaly_Label";
