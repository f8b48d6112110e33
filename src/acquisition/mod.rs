//! Telemetry data acquisition module
//!
//! Loads baseline and scoring tables from delimited text files.

pub mod csv_table;

pub use csv_table::read_table;
