//! Data models for stored data.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One raw row of the key-value table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    /// Key name.
    pub key: String,
    /// Decoded JSON value.
    pub value: serde_json::Value,
    /// Last time the key was written.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}
