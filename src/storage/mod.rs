//! Artifact and output persistence
//!
//! - `artifacts`: zstd-compressed scaler/model files with MD5 digests
//! - `manifest`: JSON manifest tying the artifact set to its training schema
//! - `table_writer`: scored CSV output
//!
//! Every file is written through [`write_atomic`], so an interrupted run never
//! leaves a half-written artifact or output table behind.

pub mod artifacts;
pub mod manifest;
pub mod table_writer;

pub use artifacts::{load_model, load_scaler, save_model, save_scaler, ArtifactKind};
pub use manifest::ArtifactManifest;
pub use table_writer::write_scored_table;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// Write `bytes` to a sibling temp file, then rename it over `path`.
/// Creates the parent directory if needed.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    let io_err = |source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let tmp_path = tmp_path_for(path);
    std::fs::write(&tmp_path, bytes).map_err(io_err)?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(io_err(e));
    }
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
