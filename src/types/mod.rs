//! Shared types

pub mod error;

pub use error::{LoaderError, Result};
