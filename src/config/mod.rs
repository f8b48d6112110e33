//! Pipeline Configuration Module
//!
//! Paths, input format, Isolation Forest parameters and logging, loaded from
//! TOML. The loaded [`PipelineConfig`] is passed explicitly to the trainer
//! and scorer; there is no global configuration state.
//!
//! ## Loading Order
//!
//! 1. `--config <PATH>` on the command line
//! 2. `TELEMETRY_ANOMALY_CONFIG` environment variable (path to TOML file)
//! 3. `telemetry_anomaly.toml` in the current working directory
//! 4. Built-in defaults

mod pipeline_config;
pub mod defaults;
pub mod validation;

pub use pipeline_config::*;
