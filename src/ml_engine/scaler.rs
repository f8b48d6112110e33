//! Per-feature standardization (zero mean, unit variance).
//!
//! Statistics are accumulated column by column with Welford's algorithm so
//! a single pass over the rows yields numerically stable mean and variance.
//! Variance is the population variance (divide by `n`), and a feature with
//! zero variance keeps a scale of 1.0 so it transforms to all zeros instead
//! of dividing by zero.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Fitted centering and scaling parameters, in fixed column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
    var: Vec<f64>,
    n_samples_seen: u64,
}

impl StandardScaler {
    /// Fit on row-major feature vectors. Every row must have the same width.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, PipelineError> {
        let Some(first) = rows.first() else {
            return Err(PipelineError::schema("cannot fit scaler on an empty table"));
        };
        let width = first.len();

        let mut count: u64 = 0;
        let mut mean = vec![0.0_f64; width];
        let mut m2 = vec![0.0_f64; width];

        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(PipelineError::schema(format!(
                    "row {row_idx} has {} features, expected {width}",
                    row.len()
                )));
            }
            count += 1;
            let n = count as f64;
            for (i, &x) in row.iter().enumerate() {
                let delta = x - mean[i];
                mean[i] += delta / n;
                let delta2 = x - mean[i];
                m2[i] += delta * delta2;
            }
        }

        let n = count as f64;
        let var: Vec<f64> = m2.iter().map(|&m| m / n).collect();
        let scale = var
            .iter()
            .map(|&v| {
                let std = v.sqrt();
                if std > f64::EPSILON * 10.0 { std } else { 1.0 }
            })
            .collect();

        Ok(Self {
            mean,
            scale,
            var,
            n_samples_seen: count,
        })
    }

    /// Standardize rows with the fitted parameters.
    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, PipelineError> {
        rows.iter()
            .enumerate()
            .map(|(row_idx, row)| {
                self.check_width(row_idx, row)?;
                Ok(row
                    .iter()
                    .zip(self.mean.iter().zip(&self.scale))
                    .map(|(&x, (&m, &s))| (x - m) / s)
                    .collect())
            })
            .collect()
    }

    /// Fit on `rows` and return the scaler with the standardized rows.
    pub fn fit_transform(rows: &[Vec<f64>]) -> Result<(Self, Vec<Vec<f64>>), PipelineError> {
        let scaler = Self::fit(rows)?;
        let scaled = scaler.transform(rows)?;
        Ok((scaler, scaled))
    }

    /// Map standardized rows back to the original units.
    pub fn inverse_transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, PipelineError> {
        rows.iter()
            .enumerate()
            .map(|(row_idx, row)| {
                self.check_width(row_idx, row)?;
                Ok(row
                    .iter()
                    .zip(self.mean.iter().zip(&self.scale))
                    .map(|(&z, (&m, &s))| z * s + m)
                    .collect())
            })
            .collect()
    }

    fn check_width(&self, row_idx: usize, row: &[f64]) -> Result<(), PipelineError> {
        if row.len() == self.mean.len() {
            Ok(())
        } else {
            Err(PipelineError::schema(format!(
                "row {row_idx} has {} features, scaler was fitted on {}",
                row.len(),
                self.mean.len()
            )))
        }
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn n_samples_seen(&self) -> u64 {
        self.n_samples_seen
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    pub fn var(&self) -> &[f64] {
        &self.var
    }
}
