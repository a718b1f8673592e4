//! Error types for dropquery-core.
//!
//! Ledger operations return [`Error`]; detectors return the narrower
//! [`DetectError`](crate::detector::DetectError), which the hub discards.
//!
//! # Propagation
//!
//! | Error | Where it stops |
//! |-------|----------------|
//! | [`Error::ContextInvalidated`] | Gate worker (dropped silently) |
//! | [`Error::Storage`] | Gate worker (logged, record dropped) |
//! | [`Error::InvalidVolume`] | Caller of `record_query` |
//! | [`Error::Sync`] | Sync worker (logged, never surfaced) |

use thiserror::Error;

/// Errors that can occur in the detection and accounting pipeline.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Persisting or loading ledger state failed.
    #[error("Storage error: {0}")]
    Storage(#[from] dropquery_store::Error),

    /// The extension runtime context is gone; storage is off limits.
    #[error("Extension context invalidated")]
    ContextInvalidated,

    /// A volume that is negative, infinite or NaN.
    #[error("Invalid volume: {0} ml (must be finite and non-negative)")]
    InvalidVolume(f64),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Remote sync failed.
    #[error("Sync failed: {0}")]
    Sync(String),

    /// Operation was cancelled.
    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type alias using dropquery-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
