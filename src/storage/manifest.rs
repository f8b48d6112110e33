//! Artifact manifest.
//!
//! Written last by the trainer, so its presence marks a complete artifact
//! set. The scorer reads it first to learn the training schema and the
//! digests the scaler and model files must match.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use super::write_atomic;
use crate::config::defaults::ARTIFACT_FORMAT_VERSION;
use crate::error::PipelineError;
use crate::ml_engine::IsolationForestParams;
use crate::types::FeatureSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub format_version: u32,
    /// Version of the crate that trained the artifacts
    pub crate_version: String,
    pub created_at: DateTime<Utc>,
    /// Ordered feature columns the scaler and forest were fitted on
    pub schema: FeatureSchema,
    pub training_rows: usize,
    pub forest: IsolationForestParams,
    /// Decision threshold offset of the fitted forest
    pub offset: f64,
    pub scaler_md5: String,
    pub model_md5: String,
}

impl ArtifactManifest {
    pub fn new(
        schema: FeatureSchema,
        training_rows: usize,
        forest: IsolationForestParams,
        offset: f64,
        scaler_md5: String,
        model_md5: String,
    ) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: Utc::now(),
            schema,
            training_rows,
            forest,
            offset,
            scaler_md5,
            model_md5,
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), PipelineError> {
        let json = serde_json::to_vec_pretty(self).map_err(|e| PipelineError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;
        write_atomic(path, &json)?;
        info!(
            path = %path.display(),
            features = self.schema.len(),
            training_rows = self.training_rows,
            "Manifest saved"
        );
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let bytes = std::fs::read(path).map_err(|e| PipelineError::from_io(path, e))?;
        let manifest: Self =
            serde_json::from_slice(&bytes).map_err(|e| PipelineError::deserialization(path, e))?;

        if manifest.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(PipelineError::deserialization(
                path,
                format!(
                    "format version mismatch: manifest has v{}, expected v{}",
                    manifest.format_version, ARTIFACT_FORMAT_VERSION
                ),
            ));
        }
        if manifest.schema.is_empty() {
            return Err(PipelineError::deserialization(path, "manifest lists no feature columns"));
        }
        Ok(manifest)
    }
}
