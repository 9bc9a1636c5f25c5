//! Error types for the simulation model loader

use std::path::Path;

/// Main error type for loader operations
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("YAML error: {0}")]
    Yaml(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Bulk write failed: {0}")]
    BulkWrite(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl LoaderError {
    /// Attach the offending path to an I/O failure
    pub fn io_at(path: &Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(format!("file {} does not exist", path.display()))
        } else {
            Self::Io(format!("{}: {}", path.display(), err))
        }
    }

    /// Attach the offending path to a YAML parse failure
    pub fn yaml_at(path: &Path, err: serde_yaml::Error) -> Self {
        Self::Yaml(format!("{}: {}", path.display(), err))
    }

    /// Classify a driver error raised by a bulk insert
    pub fn bulk_write(err: mongodb::error::Error) -> Self {
        match *err.kind {
            mongodb::error::ErrorKind::InsertMany(_) => Self::BulkWrite(err.to_string()),
            _ => Self::Database(err.to_string()),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<std::io::Error> for LoaderError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_yaml::Error> for LoaderError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml(err.to_string())
    }
}

impl From<serde_json::Error> for LoaderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<mongodb::error::Error> for LoaderError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<bson::ser::Error> for LoaderError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Database(format!("BSON encoding failed: {}", err))
    }
}

/// Result type alias for loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;
