//! Shared data structures for the telemetry anomaly pipeline
//!
//! - `table`: ObservationTable (parsed input, timestamp segregated)
//! - `schema`: FeatureSchema (ordered feature column identity)
//! - `scored`: ScoredTable (input features + derived score/label columns)

mod table;
mod schema;
mod scored;

pub use table::*;
pub use schema::*;
pub use scored::*;
