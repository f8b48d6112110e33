//! Scored table CSV writer.

use std::path::Path;
use tracing::info;

use super::write_atomic;
use crate::error::PipelineError;
use crate::types::ScoredTable;

/// Serialize `scored` with `delimiter` and write it atomically to `path`.
pub fn write_scored_table(
    path: &Path,
    scored: &ScoredTable<'_>,
    delimiter: u8,
) -> Result<(), PipelineError> {
    let encode_err = |e: csv::Error| PipelineError::Io {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
    };

    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    wtr.write_record(scored.headers()).map_err(encode_err)?;
    for record in scored.records() {
        wtr.write_record(&record).map_err(encode_err)?;
    }
    let bytes = wtr.into_inner().map_err(|e| PipelineError::Io {
        path: path.to_path_buf(),
        source: e.into_error(),
    })?;

    write_atomic(path, &bytes)?;
    info!(path = %path.display(), rows = scored.n_rows(), "Scored table written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml_engine::AnomalyLabel;
    use crate::types::{ObservationTable, RowScore, TimestampSpec};

    #[test]
    fn test_written_file_reads_back() {
        let table = ObservationTable::from_records(
            vec!["rpm".into(), "Datetime".into()],
            vec![
                vec!["800".into(), "2023-05-01 10:00:00".into()],
                vec!["9000".into(), "2023-05-01 10:00:01".into()],
            ],
            TimestampSpec::Required("Datetime"),
        )
        .unwrap();
        let scored = ScoredTable::new(
            &table,
            vec![
                RowScore::new(0.05, AnomalyLabel::Inlier),
                RowScore::new(-0.2, AnomalyLabel::Outlier),
            ],
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("scored.csv");
        write_scored_table(&path, &scored, b',').unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers.first().map(String::as_str), Some("rpm"));
        assert_eq!(headers.last().map(String::as_str), Some("Datetime"));

        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[1][5], "-1");
        let x1000: f64 = rows[1][2].parse().unwrap();
        assert_eq!(x1000, -0.2 * 1000.0);
    }
}
