//! Scoring stage.
//!
//! Loads the persisted artifact set, reads the scoring table with its
//! timestamp column segregated, standardizes the features, scores every
//! row and writes the scored table. No output file is produced unless every
//! row scored.
//!
//! In `ScalerMode::Refit` (the default) the features are standardized with
//! a scaler fitted on the scoring table itself rather than the persisted
//! baseline scaler. Scores then describe each row relative to the scoring
//! table's own distribution. `ScalerMode::Reuse` applies the baseline scaler.

use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::acquisition::read_table;
use crate::config::{ArtifactPaths, PipelineConfig, ScalerMode};
use crate::error::{PipelineError, Stage, StageContext, StageError};
use crate::ml_engine::{AnomalyLabel, IsolationForest, ScoreSummary, StandardScaler};
use crate::storage::{load_model, load_scaler, write_scored_table, ArtifactManifest};
use crate::types::{ObservationTable, RowScore, ScoredTable, TimestampSpec};

/// A verified artifact set.
#[derive(Debug, Clone)]
pub struct LoadedArtifacts {
    pub manifest: ArtifactManifest,
    pub scaler: StandardScaler,
    pub forest: IsolationForest,
}

/// Outcome of a successful scoring run.
#[derive(Debug, Clone)]
pub struct ScoringReport {
    pub rows: usize,
    pub outliers: usize,
    pub scaler_mode: ScalerMode,
    pub summary: ScoreSummary,
    pub output: PathBuf,
    pub elapsed: Duration,
}

/// Load manifest, scaler and model, checking digests and feature counts.
pub fn load_artifacts(paths: &ArtifactPaths) -> Result<LoadedArtifacts, PipelineError> {
    let manifest = ArtifactManifest::load(&paths.manifest)?;
    let scaler = load_scaler(&paths.scaler, Some(&manifest.scaler_md5))?;
    let forest = load_model(&paths.model, Some(&manifest.model_md5))?;

    let expected = manifest.schema.len();
    if scaler.n_features() != expected {
        return Err(PipelineError::deserialization(
            &paths.scaler,
            format!("scaler has {} features, manifest lists {}", scaler.n_features(), expected),
        ));
    }
    if forest.n_features() != expected {
        return Err(PipelineError::deserialization(
            &paths.model,
            format!("model has {} features, manifest lists {}", forest.n_features(), expected),
        ));
    }

    debug!(
        features = expected,
        trained_at = %manifest.created_at,
        trees = forest.n_trees(),
        "Artifacts loaded"
    );
    Ok(LoadedArtifacts {
        manifest,
        scaler,
        forest,
    })
}

/// Score every row of `table` against `artifacts`.
pub fn score_table(
    table: &ObservationTable,
    artifacts: &LoadedArtifacts,
    mode: ScalerMode,
) -> Result<Vec<RowScore>, PipelineError> {
    table.schema().ensure_matches(&artifacts.manifest.schema)?;
    if table.n_rows() == 0 {
        return Err(PipelineError::schema("scoring table has no data rows"));
    }

    let scaled = match mode {
        ScalerMode::Refit => {
            warn!(
                rows = table.n_rows(),
                "Refitting scaler on the scoring table; scores are relative to this table, not the baseline"
            );
            StandardScaler::fit_transform(table.values())?.1
        }
        ScalerMode::Reuse => artifacts.scaler.transform(table.values())?,
    };

    let decision = artifacts.forest.decision_function(&scaled)?;
    Ok(decision
        .into_iter()
        .map(|d| RowScore::new(d, AnomalyLabel::from_decision(d)))
        .collect())
}

/// Run the scoring stage end to end.
pub fn score(config: &PipelineConfig) -> Result<ScoringReport, StageError> {
    let start = Instant::now();
    let mode = config.scoring.scaler_mode;
    info!(
        path = %config.paths.scoring.display(),
        scaler_mode = %mode,
        "Scoring stage started"
    );

    let artifacts = load_artifacts(&config.paths.artifact_paths()).in_stage(Stage::Score)?;
    let table = read_table(
        &config.paths.scoring,
        &config.input,
        TimestampSpec::Required(&config.input.timestamp_column),
    )
    .in_stage(Stage::Score)?;

    let scores = score_table(&table, &artifacts, mode).in_stage(Stage::Score)?;
    let decision: Vec<f64> = scores.iter().map(|s| s.score).collect();
    let labels: Vec<AnomalyLabel> = scores.iter().map(|s| s.label).collect();
    let summary = ScoreSummary::from_scores(&decision, &labels);

    let scored = ScoredTable::new(&table, scores).in_stage(Stage::Score)?;
    write_scored_table(&config.paths.output, &scored, config.input.delimiter_byte())
        .in_stage(Stage::Score)?;

    let report = ScoringReport {
        rows: scored.n_rows(),
        outliers: summary.outliers,
        scaler_mode: mode,
        summary,
        output: config.paths.output.clone(),
        elapsed: start.elapsed(),
    };
    info!(
        rows = report.rows,
        outliers = report.outliers,
        min_score = report.summary.min,
        median_score = report.summary.median,
        output = %report.output.display(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Scoring stage complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml_engine::IsolationForestParams;
    use crate::pipeline::trainer::{fit_baseline, persist};

    fn table(headers: &[&str], rows: &[&[&str]], spec: TimestampSpec<'_>) -> ObservationTable {
        ObservationTable::from_records(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
            spec,
        )
        .unwrap()
    }

    fn trained(dir: &std::path::Path) -> ArtifactPaths {
        let baseline = table(
            &["a", "b"],
            &[&["0", "0"], &["0.1", "0.1"], &["0.2", "0.15"], &["0.05", "0.12"], &["0.15", "0.02"]],
            TimestampSpec::Absent,
        );
        let model = fit_baseline(&baseline, &IsolationForestParams::default()).unwrap();
        let paths = ArtifactPaths::in_dir(dir);
        persist(&model, &paths).unwrap();
        paths
    }

    #[test]
    fn test_reordered_columns_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = load_artifacts(&trained(dir.path())).unwrap();
        let scoring = table(
            &["b", "a", "Datetime"],
            &[&["0", "0", "2023-01-01 00:00:00"]],
            TimestampSpec::Required("Datetime"),
        );
        let err = score_table(&scoring, &artifacts, ScalerMode::Reuse).unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
    }

    #[test]
    fn test_labels_follow_decision_sign() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = load_artifacts(&trained(dir.path())).unwrap();
        let scoring = table(
            &["a", "b", "Datetime"],
            &[
                &["0.1", "0.1", "2023-01-01 00:00:00"],
                &["25", "-30", "2023-01-01 00:00:01"],
            ],
            TimestampSpec::Required("Datetime"),
        );
        let scores = score_table(&scoring, &artifacts, ScalerMode::Reuse).unwrap();
        for s in &scores {
            assert_eq!(s.label == AnomalyLabel::Inlier, s.score >= 0.0);
        }
        assert!(scores[1].score < scores[0].score);
    }

    #[test]
    fn test_empty_scoring_table_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = load_artifacts(&trained(dir.path())).unwrap();
        let scoring = table(&["a", "b", "Datetime"], &[], TimestampSpec::Required("Datetime"));
        for mode in [ScalerMode::Refit, ScalerMode::Reuse] {
            let err = score_table(&scoring, &artifacts, mode).unwrap_err();
            assert!(matches!(err, PipelineError::Schema(_)));
        }
    }

    #[test]
    fn test_missing_manifest_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_artifacts(&ArtifactPaths::in_dir(dir.path())).unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { .. }));
    }
}
