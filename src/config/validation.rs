//! Config validation: unknown-key detection with Levenshtein suggestions
//! and value range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

use crate::ml_engine::{Contamination, MaxSamples};

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " — did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for PipelineConfig.
///
/// Maintained by hand to match the structs in pipeline_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [paths]
        "paths",
        "paths.baseline",
        "paths.scoring",
        "paths.output",
        "paths.models_dir",
        // [input]
        "input",
        "input.delimiter",
        "input.timestamp_column",
        "input.day_first",
        // [forest]
        "forest",
        "forest.n_estimators",
        "forest.max_samples",
        "forest.max_samples.count",
        "forest.contamination",
        "forest.contamination.fraction",
        "forest.seed",
        // [scoring]
        "scoring",
        "scoring.scaler_mode",
        // [logging]
        "logging",
        "logging.level",
        "logging.json",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (k, levenshtein(unknown, k)))
        .filter(|&(_, d)| d <= 3)
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys; it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Range Validation
// ============================================================================

/// Validate value ranges on a parsed PipelineConfig.
///
/// Returns (errors, warnings): errors are values the pipeline cannot run
/// with; warnings are legal but unusual.
pub fn validate_ranges(config: &super::PipelineConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let forest = &config.forest;
    if forest.n_estimators == 0 {
        errors.push("forest.n_estimators must be > 0".to_string());
    } else if forest.n_estimators > 10_000 {
        warnings.push(ValidationWarning {
            field: "forest.n_estimators".to_string(),
            message: format!(
                "forest.n_estimators = {} is unusually large; training will be slow",
                forest.n_estimators
            ),
            suggestion: None,
        });
    }

    if let MaxSamples::Count(k) = forest.max_samples {
        if k < 2 {
            errors.push(format!("forest.max_samples.count = {k} must be >= 2"));
        }
    }

    if let Contamination::Fraction(p) = forest.contamination {
        if !p.is_finite() || p <= 0.0 || p > 0.5 {
            errors.push(format!(
                "forest.contamination.fraction = {p} must be in (0, 0.5]"
            ));
        }
    }

    let input = &config.input;
    if !input.delimiter.is_ascii() || input.delimiter == '"' || input.delimiter == '\n' {
        errors.push(format!(
            "input.delimiter = {:?} must be a single ASCII character other than quote or newline",
            input.delimiter
        ));
    }
    if input.timestamp_column.trim().is_empty() {
        errors.push("input.timestamp_column must not be empty".to_string());
    }

    let paths = &config.paths;
    for (name, value) in [
        ("paths.baseline", &paths.baseline),
        ("paths.scoring", &paths.scoring),
        ("paths.output", &paths.output),
        ("paths.models_dir", &paths.models_dir),
    ] {
        if value.as_os_str().is_empty() {
            errors.push(format!("{name} must not be empty"));
        }
    }
    if paths.output == paths.scoring {
        errors.push("paths.output must differ from paths.scoring".to_string());
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("seed", "seed"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("n_estimator", "n_estimators"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [forest]
            seed = 1
            contamination = { fraction = 0.1 }
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"forest".to_string()));
        assert!(keys.contains(&"forest.seed".to_string()));
        assert!(keys.contains(&"forest.contamination.fraction".to_string()));
    }

    #[test]
    fn test_suggest_none_when_far() {
        let known = known_config_keys();
        assert!(suggest_correction("completely.unrelated.key", &known).is_none());
    }

    #[test]
    fn test_zero_estimators_is_error() {
        let mut config = crate::config::PipelineConfig::default();
        config.forest.n_estimators = 0;
        let (errors, _) = validate_ranges(&config);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("n_estimators"));
    }

    #[test]
    fn test_default_config_is_clean() {
        let (errors, warnings) = validate_ranges(&crate::config::PipelineConfig::default());
        assert!(errors.is_empty(), "{errors:?}");
        assert!(warnings.is_empty());
    }
}
