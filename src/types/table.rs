//! Observation tables: time-ordered sensor samples with named numeric
//! feature columns and an optional timestamp column.
//!
//! The timestamp column is segregated at construction so numeric transforms
//! only ever see feature values; it is reattached when the scored table is
//! written. Feature cells keep their original text alongside the parsed
//! value so the output reproduces the input verbatim.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use std::fmt;

use crate::error::PipelineError;
use crate::types::schema::FeatureSchema;

// ============================================================================
// Timestamps
// ============================================================================

/// Unambiguous naive formats tried in order after RFC 3339. `%.f` also
/// accepts no fraction.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// `MM/DD/YYYY` forms, the default reading of slash dates.
const MONTH_FIRST_FORMATS: &[&str] = &["%m/%d/%Y %H:%M:%S%.f", "%m/%d/%Y %H:%M"];

/// `DD/MM/YYYY` forms, used only when day-first is configured.
const DAY_FIRST_FORMATS: &[&str] = &["%d/%m/%Y %H:%M:%S%.f", "%d/%m/%Y %H:%M"];

/// How to read ambiguous `NN/NN/YYYY` dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateOrder {
    /// `01/05/2023` is 5 January
    #[default]
    MonthFirst,
    /// `01/05/2023` is 1 May
    DayFirst,
}

/// A parsed timestamp cell, with or without a UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    Naive(NaiveDateTime),
    Zoned(DateTime<FixedOffset>),
}

impl Timestamp {
    /// Parse with slash dates read month-first.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::parse_with(raw, DateOrder::MonthFirst)
    }

    pub fn parse_with(raw: &str, order: DateOrder) -> Option<Self> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Self::Zoned(dt));
        }
        if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
            return Some(Self::Zoned(dt));
        }
        let slash_formats = match order {
            DateOrder::MonthFirst => MONTH_FIRST_FORMATS,
            DateOrder::DayFirst => DAY_FIRST_FORMATS,
        };
        for fmt in NAIVE_DATETIME_FORMATS.iter().chain(slash_formats) {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(Self::Naive(dt));
            }
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(Self::Naive)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Naive(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.f")),
            Self::Zoned(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.f%:z")),
        }
    }
}

/// The segregated timestamp column.
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampColumn {
    pub name: String,
    /// Original position in the input header
    pub source_index: usize,
    pub values: Vec<Timestamp>,
}

// ============================================================================
// Observation Table
// ============================================================================

/// Whether a table is expected to carry a timestamp column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampSpec<'a> {
    /// Every column is a numeric feature
    Absent,
    /// The named column must exist and parse as timestamps
    Required(&'a str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObservationTable {
    schema: FeatureSchema,
    raw: Vec<Vec<String>>,
    values: Vec<Vec<f64>>,
    timestamps: Option<TimestampColumn>,
}

impl ObservationTable {
    /// Build a table from a header and string records, parsing every
    /// feature cell as a finite `f64`. Slash dates are read month-first.
    pub fn from_records(
        headers: Vec<String>,
        records: Vec<Vec<String>>,
        timestamp: TimestampSpec<'_>,
    ) -> Result<Self, PipelineError> {
        Self::from_records_with_order(headers, records, timestamp, DateOrder::MonthFirst)
    }

    pub fn from_records_with_order(
        headers: Vec<String>,
        records: Vec<Vec<String>>,
        timestamp: TimestampSpec<'_>,
        date_order: DateOrder,
    ) -> Result<Self, PipelineError> {
        let headers: Vec<String> = headers.into_iter().map(|h| h.trim().to_string()).collect();

        let mut seen = HashSet::new();
        for (idx, h) in headers.iter().enumerate() {
            if h.is_empty() {
                return Err(PipelineError::schema(format!("column {idx} has an empty header")));
            }
            if !seen.insert(h.as_str()) {
                return Err(PipelineError::schema(format!("duplicate column '{h}' in header")));
            }
        }

        let ts_index = match timestamp {
            TimestampSpec::Absent => None,
            TimestampSpec::Required(name) => Some(
                headers
                    .iter()
                    .position(|h| h == name)
                    .ok_or_else(|| PipelineError::schema(format!("timestamp column '{name}' is missing")))?,
            ),
        };

        let feature_indices: Vec<usize> = (0..headers.len()).filter(|i| Some(*i) != ts_index).collect();
        if feature_indices.is_empty() {
            return Err(PipelineError::schema("table has no feature columns"));
        }

        let mut raw = Vec::with_capacity(records.len());
        let mut values = Vec::with_capacity(records.len());
        let mut ts_values = Vec::with_capacity(if ts_index.is_some() { records.len() } else { 0 });

        for (row_idx, record) in records.into_iter().enumerate() {
            // Row numbers in messages are 1-based data rows (header excluded)
            let line = row_idx + 1;
            if record.len() != headers.len() {
                return Err(PipelineError::schema(format!(
                    "row {line} has {} fields, header has {}",
                    record.len(),
                    headers.len()
                )));
            }

            if let Some(ti) = ts_index {
                let ts = Timestamp::parse_with(&record[ti], date_order).ok_or_else(|| {
                    PipelineError::schema(format!(
                        "row {line}: cannot parse '{}' in column '{}' as a timestamp",
                        record[ti], headers[ti]
                    ))
                })?;
                ts_values.push(ts);
            }

            let mut row_values = Vec::with_capacity(feature_indices.len());
            let mut row_raw = Vec::with_capacity(feature_indices.len());
            for &fi in &feature_indices {
                let cell = record[fi].trim();
                row_values.push(parse_feature(cell, &headers[fi], line)?);
                row_raw.push(cell.to_string());
            }
            values.push(row_values);
            raw.push(row_raw);
        }

        let schema = FeatureSchema::new(feature_indices.iter().map(|&i| headers[i].clone()).collect());
        let timestamps = ts_index.map(|ti| TimestampColumn {
            name: headers[ti].clone(),
            source_index: ti,
            values: ts_values,
        });

        Ok(Self {
            schema,
            raw,
            values,
            timestamps,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Parsed feature values, row-major, timestamp excluded.
    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// Original feature cell text, row-major, timestamp excluded.
    pub fn raw(&self) -> &[Vec<String>] {
        &self.raw
    }

    pub fn timestamps(&self) -> Option<&TimestampColumn> {
        self.timestamps.as_ref()
    }

    pub fn n_rows(&self) -> usize {
        self.values.len()
    }

    pub fn n_features(&self) -> usize {
        self.schema.len()
    }
}

fn parse_feature(cell: &str, column: &str, line: usize) -> Result<f64, PipelineError> {
    if cell.is_empty() {
        return Err(PipelineError::schema(format!(
            "row {line}: missing value in column '{column}'"
        )));
    }
    match cell.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        Ok(_) => Err(PipelineError::schema(format!(
            "row {line}: non-finite value '{cell}' in column '{column}'"
        ))),
        Err(_) => Err(PipelineError::schema(format!(
            "non-numeric column '{column}': row {line} holds '{cell}'"
        ))),
    }
}
