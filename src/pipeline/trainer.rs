//! Training stage.
//!
//! Reads the baseline table, standardizes it, fits the isolation forest on
//! the standardized rows and persists scaler, model and manifest. Any
//! existing manifest is removed before the new artifacts are written and the
//! new one is written last, so a run that fails part-way leaves no manifest
//! and the scorer never picks up a mixed artifact set.

use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::acquisition::read_table;
use crate::config::{ArtifactPaths, PipelineConfig};
use crate::error::{PipelineError, Stage, StageContext, StageError};
use crate::ml_engine::{
    AnomalyLabel, IsolationForest, IsolationForestParams, ScoreSummary, StandardScaler,
};
use crate::storage::{save_model, save_scaler, ArtifactManifest};
use crate::types::{FeatureSchema, ObservationTable, TimestampSpec};

/// Scaler and forest fitted on one baseline table.
#[derive(Debug, Clone)]
pub struct FittedModel {
    pub schema: FeatureSchema,
    pub scaler: StandardScaler,
    pub forest: IsolationForest,
    /// Decision scores of the (standardized) baseline rows
    pub baseline_summary: ScoreSummary,
}

/// Outcome of a successful training run.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub rows: usize,
    pub features: Vec<String>,
    pub trees: usize,
    pub max_samples: usize,
    pub offset: f64,
    pub baseline_summary: ScoreSummary,
    pub artifacts: ArtifactPaths,
    pub elapsed: Duration,
}

/// Fit scaler and forest on `table` without touching the filesystem.
pub fn fit_baseline(
    table: &ObservationTable,
    params: &IsolationForestParams,
) -> Result<FittedModel, PipelineError> {
    if table.n_rows() < 2 {
        return Err(PipelineError::schema(format!(
            "baseline table needs at least 2 rows, found {}",
            table.n_rows()
        )));
    }

    let (scaler, scaled) = StandardScaler::fit_transform(table.values())?;
    let forest = IsolationForest::fit(&scaled, params)?;

    let decision = forest.decision_function(&scaled)?;
    let labels: Vec<AnomalyLabel> = decision.iter().copied().map(AnomalyLabel::from_decision).collect();
    let baseline_summary = ScoreSummary::from_scores(&decision, &labels);

    Ok(FittedModel {
        schema: table.schema().clone(),
        scaler,
        forest,
        baseline_summary,
    })
}

/// Persist a fitted model as scaler, model and manifest files.
pub fn persist(model: &FittedModel, paths: &ArtifactPaths) -> Result<ArtifactManifest, PipelineError> {
    match std::fs::remove_file(&paths.manifest) {
        Ok(()) => debug!(path = %paths.manifest.display(), "Removed previous manifest"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(PipelineError::Io {
                path: paths.manifest.clone(),
                source,
            })
        }
    }

    let scaler_md5 = save_scaler(&paths.scaler, &model.scaler)?;
    let model_md5 = save_model(&paths.model, &model.forest)?;

    let manifest = ArtifactManifest::new(
        model.schema.clone(),
        model.forest.n_training_rows(),
        model.forest.params().clone(),
        model.forest.offset(),
        scaler_md5,
        model_md5,
    );
    manifest.save(&paths.manifest)?;
    Ok(manifest)
}

/// Run the training stage end to end.
pub fn train(config: &PipelineConfig) -> Result<TrainingReport, StageError> {
    let start = Instant::now();
    let baseline = &config.paths.baseline;
    info!(path = %baseline.display(), "Training stage started");

    let table = read_table(baseline, &config.input, TimestampSpec::Absent).in_stage(Stage::Train)?;
    let model = fit_baseline(&table, &config.forest).in_stage(Stage::Train)?;

    let artifacts = config.paths.artifact_paths();
    persist(&model, &artifacts).in_stage(Stage::Train)?;

    let report = TrainingReport {
        rows: table.n_rows(),
        features: model.schema.columns().to_vec(),
        trees: model.forest.n_trees(),
        max_samples: model.forest.max_samples(),
        offset: model.forest.offset(),
        baseline_summary: model.baseline_summary,
        artifacts,
        elapsed: start.elapsed(),
    };

    info!(
        rows = report.rows,
        features = report.features.len(),
        trees = report.trees,
        baseline_outliers = report.baseline_summary.outliers,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Training stage complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline(rows: usize) -> ObservationTable {
        let records = (0..rows)
            .map(|i| {
                let t = i as f64 * 0.1;
                vec![format!("{}", 800.0 + t.sin() * 20.0), format!("{}", 35.0 + t.cos())]
            })
            .collect();
        ObservationTable::from_records(
            vec!["rpm".into(), "map".into()],
            records,
            TimestampSpec::Absent,
        )
        .unwrap()
    }

    #[test]
    fn test_fit_baseline_standardizes_before_fitting() {
        let table = baseline(80);
        let model = fit_baseline(&table, &IsolationForestParams::default()).unwrap();

        assert_eq!(model.forest.n_features(), 2);
        assert_eq!(model.forest.n_training_rows(), 80);
        let scaled = model.scaler.transform(table.values()).unwrap();
        let mean_rpm = scaled.iter().map(|r| r[0]).sum::<f64>() / scaled.len() as f64;
        assert!(mean_rpm.abs() < 1e-9);
    }

    #[test]
    fn test_single_row_baseline_rejected() {
        let err = fit_baseline(&baseline(1), &IsolationForestParams::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
    }

    #[test]
    fn test_persist_writes_all_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        let model = fit_baseline(&baseline(40), &IsolationForestParams::default()).unwrap();

        let manifest = persist(&model, &paths).unwrap();
        assert!(paths.scaler.exists());
        assert!(paths.model.exists());
        assert!(paths.manifest.exists());
        assert_eq!(manifest.schema, model.schema);
        assert_eq!(manifest.training_rows, 40);
    }

    #[test]
    fn test_failed_persist_leaves_no_stale_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        let model = fit_baseline(&baseline(40), &IsolationForestParams::default()).unwrap();
        persist(&model, &paths).unwrap();

        // A non-empty directory where the model file goes makes the rename fail
        std::fs::remove_file(&paths.model).unwrap();
        std::fs::create_dir(&paths.model).unwrap();
        std::fs::write(paths.model.join("blocker"), b"x").unwrap();

        let err = persist(&model, &paths).unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
        assert!(!paths.manifest.exists());
        let err = crate::pipeline::load_artifacts(&paths).unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { .. }));
    }
}
