//! Local persistence for the DropQuery usage ledger.
//!
//! This crate provides a SQLite-backed key-value store holding the ledger
//! state and app flags as JSON documents, one value per persisted key.
//!
//! # Features
//!
//! - Load and save the ledger state atomically
//! - App flags (survey completion, reset marker, sync identity)
//! - Atomic clear-and-reseed for user-initiated resets
//! - History queries by model and date range
//! - CSV export of history and daily totals
//!
//! # Example
//!
//! ```no_run
//! use dropquery_store::{HistoryQuery, Store};
//!
//! let store = Store::open_default()?;
//! let state = store.load_ledger()?;
//! println!("total: {} ml", state.total_usage_ml);
//!
//! let recent = store.query_history(&HistoryQuery::new().limit(10))?;
//! # Ok::<(), dropquery_store::Error>(())
//! ```

mod error;
mod export;
pub mod keys;
mod models;
mod queries;
mod schema;
mod store;

pub use error::{Error, Result};
pub use export::{write_daily_totals_csv, write_history_csv};
pub use models::StoredEntry;
pub use queries::HistoryQuery;
pub use store::Store;

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/dropquery/ledger.db`
/// - macOS: `~/Library/Application Support/dropquery/ledger.db`
/// - Windows: `C:\Users\<user>\AppData\Local\dropquery\ledger.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("dropquery")
        .join("ledger.db")
}
