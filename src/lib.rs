//! simmodel-db - telescope simulation model database loader
//!
//! Reads the simulation model description tree (parameter descriptions,
//! per-telescope and per-site value files, tabulated data files) and loads it
//! into MongoDB.
//!
//! ## Entry points
//!
//! - **Load**: drop and rebuild the value, description and data-file databases
//! - **Update**: overwrite the value of one (entity, version, parameter) record
//! - **Export**: write the nested JSON model document used by the UI
//! - **Fetch**: download a stored data file

pub mod config;
pub mod db;
pub mod export;
pub mod ingest;
pub mod loader;
pub mod logging;
pub mod types;
pub mod update;

pub use config::{Args, ModelConfig};
pub use loader::{DatabaseLoader, LoadReport};
pub use types::{LoaderError, Result};
