//! Error types for dropquery-store.

use std::path::PathBuf;

/// Result type for dropquery-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in dropquery-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A stored value is not the JSON document its key requires.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A document that must be a JSON object was something else.
    #[error("Document for {0} is not a JSON object")]
    NotAnObject(&'static str),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Timestamp could not be formatted.
    #[error("Time formatting error: {0}")]
    TimeFormat(#[from] time::error::Format),

    /// CSV writer error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
