//! Error types for parsing in dropquery-types.

use thiserror::Error;

/// Errors that can occur when parsing DropQuery values.
///
/// This error type is platform-agnostic and carries no storage or
/// runtime errors (those belong in dropquery-store and dropquery-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Generic malformed input.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Model tag not present in the model table.
    #[error("Unknown model tag: {0}")]
    UnknownModel(String),

    /// Display unit not one of ml, gallons or ounces.
    #[error("Unknown display unit: {0}")]
    UnknownUnit(String),

    /// Volume label not one of ml, L, m³, gal or oz.
    #[error("Unknown volume label: {0}")]
    UnknownLabel(String),

    /// Calendar date not in `YYYY-MM-DD` form.
    #[error("Invalid calendar date: {0}")]
    InvalidDate(String),
}

/// Result type alias using dropquery-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
