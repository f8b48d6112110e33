//! Feature schema: the ordered identity of a table's feature columns.
//!
//! Recorded in the artifact manifest at training time and checked against
//! the scoring table so a column mismatch fails fast instead of silently
//! producing meaningless scores.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Check that `self` (the table being scored) lists exactly the columns of
    /// `expected` (the fitted schema), in the same order.
    pub fn ensure_matches(&self, expected: &FeatureSchema) -> Result<(), PipelineError> {
        if self == expected {
            return Ok(());
        }

        if let Some(missing) = expected.columns.iter().find(|c| !self.columns.contains(c)) {
            return Err(PipelineError::schema(format!(
                "feature column '{missing}' used at training time is missing from the scoring table"
            )));
        }
        if let Some(extra) = self.columns.iter().find(|c| !expected.columns.contains(c)) {
            return Err(PipelineError::schema(format!(
                "feature column '{extra}' was not present at training time"
            )));
        }
        if self.columns.len() != expected.columns.len() {
            return Err(PipelineError::schema(format!(
                "scoring table has {} feature columns, model was trained on {}",
                self.columns.len(),
                expected.columns.len()
            )));
        }

        // Same set, different order
        match self
            .columns
            .iter()
            .zip(&expected.columns)
            .enumerate()
            .find(|(_, (a, b))| a != b)
        {
            Some((pos, (got, want))) => Err(PipelineError::schema(format!(
                "feature column order differs from training: position {pos} is '{got}', expected '{want}'"
            ))),
            None => Err(PipelineError::schema("feature columns differ from training")),
        }
    }
}
