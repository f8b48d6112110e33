//! Config Validation Tests
//!
//! Typo detection on raw TOML keys and range validation on the parsed
//! config, exercised independently from the rest of the pipeline.

use telemetry_anomaly::config::validation::{
    known_config_keys, suggest_correction, validate_unknown_keys,
};
use telemetry_anomaly::config::{ConfigError, PipelineConfig, ScalerMode};
use telemetry_anomaly::{Contamination, MaxSamples};

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_forest_section_warns_with_suggestion() {
    let toml_str = r#"
[forest]
n_estimator = 50
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("n_estimator"));
    assert_eq!(warnings[0].suggestion.as_deref(), Some("forest.n_estimators"));
}

#[test]
fn typo_in_scoring_section_warns() {
    let toml_str = r#"
[scoring]
scalar_mode = "reuse"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].suggestion.as_deref(), Some("scoring.scaler_mode"));
}

#[test]
fn valid_config_produces_zero_warnings() {
    let toml_str = r#"
[paths]
baseline = "data/normal.csv"
scoring = "data/faulty.csv"
output = "data/faulty-scored.csv"
models_dir = "models"

[input]
delimiter = ";"
timestamp_column = "Datetime"
day_first = true

[forest]
n_estimators = 200
seed = 7
max_samples = { count = 128 }
contamination = { fraction = 0.05 }

[scoring]
scaler_mode = "reuse"

[logging]
level = "debug"
json = true
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(warnings.is_empty(), "Unexpected warnings: {warnings:?}");

    let config = PipelineConfig::from_toml_str(toml_str).expect("valid config");
    assert_eq!(config.forest.n_estimators, 200);
    assert_eq!(config.forest.max_samples, MaxSamples::Count(128));
    assert_eq!(config.forest.contamination, Contamination::Fraction(0.05));
    assert_eq!(config.scoring.scaler_mode, ScalerMode::Reuse);
    assert_eq!(config.input.delimiter, ';');
    assert!(config.input.day_first);
    assert!(config.logging.json);
}

#[test]
fn unknown_keys_do_not_break_loading() {
    let toml_str = r#"
[forest]
n_estimators = 10
tree_depth = 4
"#;
    let config = PipelineConfig::from_toml_str(toml_str).expect("unknown keys only warn");
    assert_eq!(config.forest.n_estimators, 10);
}

#[test]
fn suggestion_requires_small_edit_distance() {
    let known = known_config_keys();
    assert_eq!(
        suggest_correction("paths.basline", &known).as_deref(),
        Some("paths.baseline")
    );
    assert_eq!(suggest_correction("completely.unrelated.key", &known), None);
}

// ============================================================================
// Range Validation
// ============================================================================

#[test]
fn contamination_out_of_range_is_rejected() {
    let toml_str = r#"
[forest]
contamination = { fraction = 0.7 }
"#;
    match PipelineConfig::from_toml_str(toml_str) {
        Err(ConfigError::Validation(errors)) => {
            assert!(errors.iter().any(|e| e.contains("contamination")));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn zero_trees_is_rejected() {
    let toml_str = r#"
[forest]
n_estimators = 0
"#;
    assert!(matches!(
        PipelineConfig::from_toml_str(toml_str),
        Err(ConfigError::Validation(_))
    ));
}

#[test]
fn output_may_not_overwrite_scoring_input() {
    let toml_str = r#"
[paths]
scoring = "data/faulty.csv"
output = "data/faulty.csv"
"#;
    assert!(matches!(
        PipelineConfig::from_toml_str(toml_str),
        Err(ConfigError::Validation(_))
    ));
}

#[test]
fn malformed_toml_is_parse_error() {
    assert!(matches!(
        PipelineConfig::from_toml_str("[forest\nn_estimators = 3"),
        Err(ConfigError::Parse(..))
    ));
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn explicit_config_file_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("telemetry_anomaly.toml");
    std::fs::write(&path, "[forest]\nseed = 1234\n").unwrap();

    let config = PipelineConfig::load(Some(&path)).unwrap();
    assert_eq!(config.forest.seed, 1234);
    assert_eq!(config.forest.n_estimators, 100);
}

#[test]
fn missing_explicit_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = PipelineConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::Io(..)));
}

#[test]
fn defaults_round_trip_through_toml() {
    let config = PipelineConfig::default();
    let text = config.to_toml().unwrap();
    assert_eq!(PipelineConfig::from_toml_str(&text).unwrap(), config);
}
