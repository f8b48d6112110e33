//! Isolation Forest anomaly model.
//!
//! An ensemble of [`IsolationTree`]s, each grown on a random sub-sample of
//! the training rows. Rows that are isolated after few random splits are
//! anomalous. Score conventions:
//!
//! - `score_samples(x) = -2^(-E[h(x)] / c(ψ))`, in `[-1, 0]`; lower is more
//!   anomalous.
//! - `decision_function(x) = score_samples(x) - offset`; negative is an
//!   outlier.
//! - `predict(x)` is `+1` (inlier) when the decision value is `>= 0`,
//!   otherwise `-1` (outlier).
//!
//! With `Contamination::Auto` the offset is fixed at `-0.5`; with
//! `Contamination::Fraction(p)` it is the `p` quantile of the training
//! scores, so roughly a fraction `p` of the baseline is labelled outlier.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics};
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::ml_engine::isolation_tree::{average_path_length, IsolationTree};

/// Sub-sample cap used when `max_samples = auto`.
pub const AUTO_MAX_SAMPLES: usize = 256;

/// Decision offset used when `contamination = auto`.
pub const AUTO_OFFSET: f64 = -0.5;

/// How many rows each tree is grown on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxSamples {
    /// `min(256, n_rows)`
    Auto,
    /// Fixed count, clipped to the number of training rows.
    Count(usize),
}

/// Policy for placing the inlier/outlier decision threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Contamination {
    Auto,
    /// Expected outlier fraction of the training data, in `(0, 0.5]`.
    Fraction(f64),
}

/// Hyper-parameters for [`IsolationForest::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolationForestParams {
    pub n_estimators: usize,
    pub max_samples: MaxSamples,
    pub contamination: Contamination,
    pub seed: u64,
}

impl Default for IsolationForestParams {
    fn default() -> Self {
        Self {
            n_estimators: crate::config::defaults::N_ESTIMATORS,
            max_samples: MaxSamples::Auto,
            contamination: Contamination::Auto,
            seed: crate::config::defaults::FOREST_SEED,
        }
    }
}

/// Discrete anomaly label, serialized as `+1` / `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyLabel {
    Inlier,
    Outlier,
}

impl AnomalyLabel {
    pub fn as_i8(self) -> i8 {
        match self {
            Self::Inlier => 1,
            Self::Outlier => -1,
        }
    }

    pub fn from_decision(decision: f64) -> Self {
        if decision >= 0.0 {
            Self::Inlier
        } else {
            Self::Outlier
        }
    }
}

impl std::fmt::Display for AnomalyLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_i8())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForest {
    params: IsolationForestParams,
    trees: Vec<IsolationTree>,
    /// ψ, the effective sub-sample size
    max_samples: usize,
    n_features: usize,
    n_training_rows: usize,
    offset: f64,
}

impl IsolationForest {
    /// Grow the ensemble on row-major, already-scaled feature vectors.
    pub fn fit(data: &[Vec<f64>], params: &IsolationForestParams) -> Result<Self, PipelineError> {
        let n = data.len();
        if n < 2 {
            return Err(PipelineError::schema(format!(
                "isolation forest needs at least 2 training rows, got {n}"
            )));
        }
        let n_features = data[0].len();
        if n_features == 0 {
            return Err(PipelineError::schema("training table has no feature columns"));
        }
        for (row_idx, row) in data.iter().enumerate() {
            if row.len() != n_features {
                return Err(PipelineError::schema(format!(
                    "training row {row_idx} has {} features, expected {n_features}",
                    row.len()
                )));
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(PipelineError::schema(format!(
                    "training row {row_idx} contains a non-finite value"
                )));
            }
        }
        if params.n_estimators == 0 {
            return Err(PipelineError::schema("n_estimators must be at least 1"));
        }

        let max_samples = match params.max_samples {
            MaxSamples::Auto => AUTO_MAX_SAMPLES.min(n),
            MaxSamples::Count(k) if k > n => {
                warn!(requested = k, rows = n, "max_samples exceeds training rows, using all rows");
                n
            }
            MaxSamples::Count(k) => k.max(2),
        };
        let max_depth = (max_samples as f64).log2().ceil() as usize;

        let mut master = StdRng::seed_from_u64(params.seed);
        let trees: Vec<IsolationTree> = (0..params.n_estimators)
            .map(|_| {
                let mut rng = StdRng::seed_from_u64(master.gen());
                let sample = rand::seq::index::sample(&mut rng, n, max_samples).into_vec();
                IsolationTree::grow(data, sample, max_depth, &mut rng)
            })
            .collect();

        let mut forest = Self {
            params: params.clone(),
            trees,
            max_samples,
            n_features,
            n_training_rows: n,
            offset: AUTO_OFFSET,
        };

        if let Contamination::Fraction(p) = params.contamination {
            if !(p > 0.0 && p <= 0.5) {
                return Err(PipelineError::schema(format!(
                    "contamination fraction must be in (0, 0.5], got {p}"
                )));
            }
            let mut training_scores = Data::new(forest.score_samples(data)?);
            forest.offset = training_scores.quantile(p);
        }

        info!(
            trees = forest.trees.len(),
            max_samples,
            max_depth,
            features = n_features,
            offset = forest.offset,
            "Isolation forest fitted"
        );
        Ok(forest)
    }

    /// Raw anomaly score per row, in `[-1, 0]`. Lower is more anomalous.
    pub fn score_samples(&self, data: &[Vec<f64>]) -> Result<Vec<f64>, PipelineError> {
        self.check_width(data)?;
        Ok(data.iter().map(|row| self.score_row(row)).collect())
    }

    /// Shifted score: negative means outlier.
    pub fn decision_function(&self, data: &[Vec<f64>]) -> Result<Vec<f64>, PipelineError> {
        Ok(self
            .score_samples(data)?
            .into_iter()
            .map(|s| s - self.offset)
            .collect())
    }

    pub fn predict(&self, data: &[Vec<f64>]) -> Result<Vec<AnomalyLabel>, PipelineError> {
        Ok(self
            .decision_function(data)?
            .into_iter()
            .map(AnomalyLabel::from_decision)
            .collect())
    }

    /// Raw anomaly score of a single vector.
    pub fn score_one(&self, x: &[f64]) -> Result<f64, PipelineError> {
        if x.len() != self.n_features {
            return Err(PipelineError::schema(format!(
                "vector has {} features, model expects {}",
                x.len(),
                self.n_features
            )));
        }
        Ok(self.score_row(x))
    }

    /// Caller guarantees `x.len() == n_features`.
    fn score_row(&self, x: &[f64]) -> f64 {
        let mean_depth =
            self.trees.iter().map(|t| t.path_length(x)).sum::<f64>() / self.trees.len() as f64;
        let score = -(2.0_f64).powf(-mean_depth / average_path_length(self.max_samples));
        debug!(mean_depth, score, "scored vector");
        score
    }

    fn check_width(&self, data: &[Vec<f64>]) -> Result<(), PipelineError> {
        match data.iter().position(|row| row.len() != self.n_features) {
            None => Ok(()),
            Some(row_idx) => Err(PipelineError::schema(format!(
                "row {row_idx} has {} features, model expects {}",
                data[row_idx].len(),
                self.n_features
            ))),
        }
    }

    /// Structural sanity check for a deserialized model.
    pub fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("model has no trees".to_string());
        }
        if self.trees.len() != self.params.n_estimators {
            return Err(format!(
                "tree count mismatch: model has {}, params say {}",
                self.trees.len(),
                self.params.n_estimators
            ));
        }
        if self.max_samples < 2 || !self.offset.is_finite() {
            return Err("invalid normalisation parameters".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            if !tree.is_well_formed() {
                return Err(format!("tree {i} is malformed"));
            }
            if tree.max_feature_index().is_some_and(|f| f >= self.n_features) {
                return Err(format!(
                    "tree {i} splits on a feature beyond the model's {} features",
                    self.n_features
                ));
            }
        }
        Ok(())
    }

    pub fn params(&self) -> &IsolationForestParams {
        &self.params
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn max_samples(&self) -> usize {
        self.max_samples
    }

    pub fn n_training_rows(&self) -> usize {
        self.n_training_rows
    }

    /// Threshold on `score_samples`: rows scoring below it are outliers.
    pub fn offset(&self) -> f64 {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tight cluster around the origin plus one far-away row.
    fn cluster_with_outlier() -> Vec<Vec<f64>> {
        let mut rows: Vec<Vec<f64>> = (0..60)
            .map(|i| {
                let t = i as f64 * 0.1;
                vec![t.sin() * 0.3, t.cos() * 0.3, (t * 1.7).sin() * 0.2]
            })
            .collect();
        rows.push(vec![6.0, -6.0, 5.0]);
        rows
    }

    #[test]
    fn test_scores_bounded() {
        let data = cluster_with_outlier();
        let forest = IsolationForest::fit(&data, &IsolationForestParams::default()).unwrap();
        for s in forest.score_samples(&data).unwrap() {
            assert!((-1.0..=0.0).contains(&s), "score {s} outside [-1, 0]");
        }
    }

    #[test]
    fn test_outlier_gets_lowest_score_and_label() {
        let data = cluster_with_outlier();
        let forest = IsolationForest::fit(&data, &IsolationForestParams::default()).unwrap();
        let decision = forest.decision_function(&data).unwrap();
        let labels = forest.predict(&data).unwrap();

        let (min_idx, _) = decision
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();
        assert_eq!(min_idx, data.len() - 1);
        assert_eq!(labels[min_idx], AnomalyLabel::Outlier);
    }

    #[test]
    fn test_same_seed_same_scores() {
        let data = cluster_with_outlier();
        let params = IsolationForestParams::default();
        let a = IsolationForest::fit(&data, &params).unwrap();
        let b = IsolationForest::fit(&data, &params).unwrap();
        let query = vec![0.4, -0.2, 1.1];
        assert_eq!(a.score_one(&query).unwrap(), b.score_one(&query).unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seed_different_forest() {
        let data = cluster_with_outlier();
        let a = IsolationForest::fit(&data, &IsolationForestParams::default()).unwrap();
        let b = IsolationForest::fit(
            &data,
            &IsolationForestParams {
                seed: 7,
                ..IsolationForestParams::default()
            },
        )
        .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_label_matches_decision_sign() {
        let data = cluster_with_outlier();
        let forest = IsolationForest::fit(&data, &IsolationForestParams::default()).unwrap();
        let raw = forest.score_samples(&data).unwrap();
        let labels = forest.predict(&data).unwrap();
        for (s, label) in raw.iter().zip(&labels) {
            let expected = if *s >= forest.offset() {
                AnomalyLabel::Inlier
            } else {
                AnomalyLabel::Outlier
            };
            assert_eq!(*label, expected);
        }
    }

    #[test]
    fn test_fraction_contamination_sets_quantile_offset() {
        let data = cluster_with_outlier();
        let params = IsolationForestParams {
            contamination: Contamination::Fraction(0.1),
            ..IsolationForestParams::default()
        };
        let forest = IsolationForest::fit(&data, &params).unwrap();
        assert_ne!(forest.offset(), AUTO_OFFSET);

        let outliers = forest
            .predict(&data)
            .unwrap()
            .into_iter()
            .filter(|l| *l == AnomalyLabel::Outlier)
            .count();
        // ~10% of 61 rows, allowing for the quantile estimator and ties
        assert!((3..=9).contains(&outliers), "outliers = {outliers}");
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let data = cluster_with_outlier();
        let forest = IsolationForest::fit(&data, &IsolationForestParams::default()).unwrap();
        let err = forest.score_samples(&[vec![1.0, 2.0]]).unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
    }

    #[test]
    fn test_single_vector_width_checked() {
        let data = cluster_with_outlier();
        let forest = IsolationForest::fit(&data, &IsolationForestParams::default()).unwrap();
        for bad in [vec![], vec![0.1], vec![0.1, 0.2, 0.3, 0.4]] {
            let err = forest.score_one(&bad).unwrap_err();
            assert!(matches!(err, PipelineError::Schema(_)), "width {}", bad.len());
        }
        assert!(forest.score_one(&data[0]).is_ok());
    }

    #[test]
    fn test_single_row_rejected() {
        let err = IsolationForest::fit(&[vec![1.0, 2.0]], &IsolationForestParams::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
    }

    #[test]
    fn test_max_samples_auto_caps_at_256() {
        let data: Vec<Vec<f64>> = (0..600).map(|i| vec![i as f64, (i % 17) as f64]).collect();
        let forest = IsolationForest::fit(
            &data,
            &IsolationForestParams {
                n_estimators: 5,
                ..IsolationForestParams::default()
            },
        )
        .unwrap();
        assert_eq!(forest.max_samples(), 256);
        assert_eq!(forest.n_trees(), 5);
        assert!(forest.validate().is_ok());
    }
}
