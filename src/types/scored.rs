//! Scored output table.
//!
//! Column order: the input's feature columns, then `Anomaly_Score` and its
//! three rescaled variants (×1000, ×10, ×100), then `Anomaly_Label`, then the
//! timestamp column last.

use crate::config::defaults::{
    LABEL_COLUMN, SCORE_COLUMN, SCORE_X1000_COLUMN, SCORE_X100_COLUMN, SCORE_X10_COLUMN,
};
use crate::error::PipelineError;
use crate::ml_engine::AnomalyLabel;
use crate::types::table::ObservationTable;

/// Derived per-row columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowScore {
    pub score: f64,
    pub score_x1000: f64,
    pub score_x10: f64,
    pub score_x100: f64,
    pub label: AnomalyLabel,
}

impl RowScore {
    pub fn new(score: f64, label: AnomalyLabel) -> Self {
        Self {
            score,
            score_x1000: score * 1000.0,
            score_x10: score * 10.0,
            score_x100: score * 100.0,
            label,
        }
    }
}

/// An observation table joined with its row scores.
#[derive(Debug, Clone)]
pub struct ScoredTable<'a> {
    table: &'a ObservationTable,
    scores: Vec<RowScore>,
}

impl<'a> ScoredTable<'a> {
    pub fn new(table: &'a ObservationTable, scores: Vec<RowScore>) -> Result<Self, PipelineError> {
        if scores.len() != table.n_rows() {
            return Err(PipelineError::schema(format!(
                "{} scores for {} rows",
                scores.len(),
                table.n_rows()
            )));
        }
        Ok(Self { table, scores })
    }

    pub fn headers(&self) -> Vec<String> {
        let mut headers: Vec<String> = self.table.schema().columns().to_vec();
        headers.extend(
            [
                SCORE_COLUMN,
                SCORE_X1000_COLUMN,
                SCORE_X10_COLUMN,
                SCORE_X100_COLUMN,
                LABEL_COLUMN,
            ]
            .map(String::from),
        );
        if let Some(ts) = self.table.timestamps() {
            headers.push(ts.name.clone());
        }
        headers
    }

    /// Output records in header order.
    pub fn records(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        let timestamps = self.table.timestamps();
        self.table
            .raw()
            .iter()
            .zip(&self.scores)
            .enumerate()
            .map(move |(i, (raw, s))| {
                let mut record = raw.clone();
                record.push(s.score.to_string());
                record.push(s.score_x1000.to_string());
                record.push(s.score_x10.to_string());
                record.push(s.score_x100.to_string());
                record.push(s.label.to_string());
                if let Some(ts) = timestamps {
                    record.push(ts.values[i].to_string());
                }
                record
            })
    }

    pub fn scores(&self) -> &[RowScore] {
        &self.scores
    }

    pub fn n_rows(&self) -> usize {
        self.scores.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::table::TimestampSpec;

    #[test]
    fn test_rescaled_columns_are_exact_multiples() {
        let s = RowScore::new(-0.0731, AnomalyLabel::Outlier);
        assert_eq!(s.score_x1000, -0.0731 * 1000.0);
        assert_eq!(s.score_x10, -0.0731 * 10.0);
        assert_eq!(s.score_x100, -0.0731 * 100.0);
    }

    #[test]
    fn test_column_order_timestamp_last() {
        let table = ObservationTable::from_records(
            vec!["Datetime".into(), "rpm".into(), "map".into()],
            vec![vec!["2023-01-01 00:00:00".into(), "800".into(), "35.0".into()]],
            TimestampSpec::Required("Datetime"),
        )
        .unwrap();
        let scored = ScoredTable::new(&table, vec![RowScore::new(0.125, AnomalyLabel::Inlier)]).unwrap();

        assert_eq!(
            scored.headers(),
            vec![
                "rpm",
                "map",
                "Anomaly_Score",
                "Anomaly_Score_IFR_Norm",
                "Anomaly_Score_IPW_Norm",
                "Anomaly_Score_IT_Norm",
                "Anomaly_Label",
                "Datetime",
            ]
        );
        let records: Vec<Vec<String>> = scored.records().collect();
        assert_eq!(
            records[0],
            vec!["800", "35.0", "0.125", "125", "1.25", "12.5", "1", "2023-01-01 00:00:00"]
        );
    }

    #[test]
    fn test_score_count_must_match_rows() {
        let table = ObservationTable::from_records(
            vec!["rpm".into()],
            vec![vec!["1".into()], vec!["2".into()]],
            TimestampSpec::Absent,
        )
        .unwrap();
        assert!(ScoredTable::new(&table, vec![RowScore::new(0.0, AnomalyLabel::Inlier)]).is_err());
    }
}
