//! Score distribution summaries for run reports and logs.

use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Max, Min, OrderStatistics};

use crate::ml_engine::isolation_forest::AnomalyLabel;

/// Distribution of decision scores over one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub count: usize,
    pub outliers: usize,
    pub min: f64,
    pub p05: f64,
    pub median: f64,
    pub mean: f64,
    pub max: f64,
    pub std_dev: f64,
}

impl ScoreSummary {
    /// Summarize `scores`; `labels` must be index-aligned with `scores`.
    pub fn from_scores(scores: &[f64], labels: &[AnomalyLabel]) -> Self {
        let outliers = labels.iter().filter(|l| **l == AnomalyLabel::Outlier).count();
        if scores.is_empty() {
            return Self {
                count: 0,
                outliers,
                min: f64::NAN,
                p05: f64::NAN,
                median: f64::NAN,
                mean: f64::NAN,
                max: f64::NAN,
                std_dev: f64::NAN,
            };
        }

        let mut data = Data::new(scores.to_vec());
        Self {
            count: scores.len(),
            outliers,
            min: data.min(),
            p05: data.quantile(0.05),
            median: data.median(),
            mean: statrs::statistics::Statistics::mean(scores.iter()),
            max: data.max(),
            std_dev: statrs::statistics::Statistics::population_std_dev(scores.iter()),
        }
    }

    pub fn outlier_fraction(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.outliers as f64 / self.count as f64
        }
    }
}

impl std::fmt::Display for ScoreSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "n={} outliers={} ({:.1}%) min={:.4} p05={:.4} median={:.4} mean={:.4} max={:.4}",
            self.count,
            self.outliers,
            self.outlier_fraction() * 100.0,
            self.min,
            self.p05,
            self.median,
            self.mean,
            self.max
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_basic() {
        let scores = [0.1, -0.2, 0.05, 0.3, -0.05];
        let labels: Vec<AnomalyLabel> = scores.iter().map(|s| AnomalyLabel::from_decision(*s)).collect();
        let summary = ScoreSummary::from_scores(&scores, &labels);

        assert_eq!(summary.count, 5);
        assert_eq!(summary.outliers, 2);
        assert!((summary.min + 0.2).abs() < 1e-12);
        assert!((summary.max - 0.3).abs() < 1e-12);
        assert!((summary.median - 0.05).abs() < 1e-12);
        assert!((summary.mean - 0.04).abs() < 1e-12);
        assert!((summary.outlier_fraction() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_summary_empty() {
        let summary = ScoreSummary::from_scores(&[], &[]);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.outlier_fraction(), 0.0);
        assert!(summary.mean.is_nan());
    }
}
