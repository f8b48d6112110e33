//! Scaler and model artifact persistence.
//!
//! Each artifact is a versioned JSON envelope, zstd-compressed, written
//! atomically (temp file then rename). The MD5 digest of the bytes on disk
//! is returned on save and recorded in the manifest; loading with an
//! expected digest rejects files that were truncated or modified.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use super::write_atomic;
use crate::config::defaults::{ARTIFACT_FORMAT_VERSION, ZSTD_LEVEL};
use crate::error::PipelineError;
use crate::ml_engine::{IsolationForest, StandardScaler};

/// What an artifact file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Scaler,
    IsolationForest,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Scaler => write!(f, "scaler"),
            ArtifactKind::IsolationForest => write!(f, "isolation_forest"),
        }
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    format_version: u32,
    kind: ArtifactKind,
    payload: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    format_version: u32,
    kind: ArtifactKind,
    payload: T,
}

/// Hex MD5 of a byte slice.
pub fn digest(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

/// Serialize, compress and atomically write `value`. Returns the digest of
/// the written bytes.
pub fn save_artifact<T: Serialize>(
    path: &Path,
    kind: ArtifactKind,
    value: &T,
) -> Result<String, PipelineError> {
    let envelope = EnvelopeRef {
        format_version: ARTIFACT_FORMAT_VERSION,
        kind,
        payload: value,
    };
    let json = serde_json::to_vec(&envelope).map_err(|e| PipelineError::Io {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })?;
    let compressed = zstd::encode_all(json.as_slice(), ZSTD_LEVEL).map_err(|e| PipelineError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    write_atomic(path, &compressed)?;
    let md5 = digest(&compressed);
    info!(
        path = %path.display(),
        %kind,
        raw_bytes = json.len(),
        stored_bytes = compressed.len(),
        md5 = %md5,
        "Artifact saved"
    );
    Ok(md5)
}

/// Read, verify, decompress and deserialize an artifact.
pub fn load_artifact<T: DeserializeOwned>(
    path: &Path,
    kind: ArtifactKind,
    expected_md5: Option<&str>,
) -> Result<T, PipelineError> {
    let bytes = std::fs::read(path).map_err(|e| PipelineError::from_io(path, e))?;

    if let Some(expected) = expected_md5 {
        let actual = digest(&bytes);
        if actual != expected {
            return Err(PipelineError::deserialization(
                path,
                format!("digest mismatch: manifest records {expected}, file has {actual}"),
            ));
        }
    }

    let json = zstd::decode_all(bytes.as_slice())
        .map_err(|e| PipelineError::deserialization(path, format!("zstd decode error: {e}")))?;
    let envelope: Envelope<T> = serde_json::from_slice(&json)
        .map_err(|e| PipelineError::deserialization(path, e))?;

    if envelope.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(PipelineError::deserialization(
            path,
            format!(
                "format version mismatch: file has v{}, expected v{}",
                envelope.format_version, ARTIFACT_FORMAT_VERSION
            ),
        ));
    }
    if envelope.kind != kind {
        return Err(PipelineError::deserialization(
            path,
            format!("expected a {kind} artifact, found {}", envelope.kind),
        ));
    }

    debug!(path = %path.display(), %kind, "Artifact loaded");
    Ok(envelope.payload)
}

pub fn save_scaler(path: &Path, scaler: &StandardScaler) -> Result<String, PipelineError> {
    save_artifact(path, ArtifactKind::Scaler, scaler)
}

pub fn load_scaler(path: &Path, expected_md5: Option<&str>) -> Result<StandardScaler, PipelineError> {
    load_artifact(path, ArtifactKind::Scaler, expected_md5)
}

pub fn save_model(path: &Path, model: &IsolationForest) -> Result<String, PipelineError> {
    save_artifact(path, ArtifactKind::IsolationForest, model)
}

/// Load a model and check its internal structure.
pub fn load_model(path: &Path, expected_md5: Option<&str>) -> Result<IsolationForest, PipelineError> {
    let model: IsolationForest = load_artifact(path, ArtifactKind::IsolationForest, expected_md5)?;
    model
        .validate()
        .map_err(|reason| PipelineError::deserialization(path, reason))?;
    Ok(model)
}
