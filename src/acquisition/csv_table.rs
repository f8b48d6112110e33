//! Delimited-text telemetry table reader.
//!
//! Reads a header row plus records with the `csv` crate and hands them to
//! [`ObservationTable::from_records`] for numeric parsing and timestamp
//! segregation. Records are read as flexible so ragged rows surface as a
//! schema error with a row number rather than a low-level parse error.

use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

use crate::config::InputConfig;
use crate::error::PipelineError;
use crate::types::{ObservationTable, TimestampSpec};

/// Read and parse a telemetry table.
pub fn read_table(
    path: &Path,
    input: &InputConfig,
    timestamp: TimestampSpec<'_>,
) -> Result<ObservationTable, PipelineError> {
    let file = File::open(path).map_err(|e| PipelineError::from_io(path, e))?;
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(input.delimiter_byte())
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| csv_error(path, e))?
        .iter()
        .map(|s| s.to_string())
        .collect();
    debug!(path = %path.display(), columns = headers.len(), "Read table header");

    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| csv_error(path, e))?;
        // Skip fully blank lines (e.g. trailing newline padding)
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        records.push(record.iter().map(|s| s.to_string()).collect());
    }

    let table = ObservationTable::from_records_with_order(headers, records, timestamp, input.date_order())?;
    info!(
        path = %path.display(),
        rows = table.n_rows(),
        features = table.n_features(),
        timestamp = table.timestamps().map(|t| t.name.as_str()),
        "Loaded telemetry table"
    );
    Ok(table)
}

fn csv_error(path: &Path, err: csv::Error) -> PipelineError {
    let position = err
        .position()
        .map(|p| format!(" at line {}", p.line()))
        .unwrap_or_default();
    match err.into_kind() {
        csv::ErrorKind::Io(e) => PipelineError::from_io(path, e),
        kind => PipelineError::schema(format!(
            "{}{}: {:?}",
            path.display(),
            position,
            kind
        )),
    }
}
