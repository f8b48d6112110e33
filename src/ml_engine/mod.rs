//! ML Engine: standardization and Isolation Forest scoring
//!
//! ## Architecture
//! - `scaler`: per-feature zero-mean / unit-variance transform (Welford fit)
//! - `isolation_tree`: one randomized partitioning tree + path-length normaliser
//! - `isolation_forest`: seeded ensemble, scores, decision threshold, labels
//! - `summary`: score distribution statistics (statrs)

pub mod scaler;
pub mod isolation_tree;
pub mod isolation_forest;
pub mod summary;

pub use scaler::StandardScaler;
pub use isolation_tree::{average_path_length, IsolationTree};
pub use isolation_forest::{
    AnomalyLabel, Contamination, IsolationForest, IsolationForestParams, MaxSamples,
};
pub use summary::ScoreSummary;
