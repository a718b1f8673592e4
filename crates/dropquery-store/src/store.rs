//! Main store implementation.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Transaction};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use tracing::{debug, info};

use dropquery_types::{AppFlags, DailyTotal, LedgerState, UsageRecord};

use crate::error::{Error, Result};
use crate::keys;
use crate::models::StoredEntry;
use crate::queries::HistoryQuery;
use crate::schema;

/// SQLite-based key-value store for the usage ledger.
///
/// Each persisted key holds one JSON value. The ledger state and the app
/// flags are each spread over several keys and always written inside a
/// single transaction.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::initialize(&conn)?;

        Ok(Self { conn })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }
}

// Raw key-value operations
impl Store {
    /// Get the raw JSON text stored under `key`.
    pub fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Get and decode the value stored under `key`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_raw(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Encode and store `value` under `key`.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        put(&self.conn, key, &raw)?;
        Ok(())
    }

    /// Remove `key`. Returns whether it existed.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let removed = self.conn.execute("DELETE FROM kv WHERE key = ?", [key])?;
        Ok(removed > 0)
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    /// All stored entries with decoded values, sorted by key.
    pub fn entries(&self) -> Result<Vec<StoredEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value, updated_at FROM kv ORDER BY key")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(key, raw, updated_at)| {
                Ok(StoredEntry {
                    key,
                    value: serde_json::from_str(&raw)?,
                    updated_at: OffsetDateTime::from_unix_timestamp(updated_at)
                        .unwrap_or(OffsetDateTime::UNIX_EPOCH),
                })
            })
            .collect()
    }

    /// Delete every key. Returns the number of keys removed.
    pub fn clear(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM kv", [])?;
        info!("Cleared {} stored keys", removed);
        Ok(removed)
    }
}

// Ledger documents
impl Store {
    /// Load the ledger state; missing keys take their zero values.
    pub fn load_ledger(&self) -> Result<LedgerState> {
        let document = self.read_document(keys::LEDGER_KEYS)?;
        Ok(serde_json::from_value(document)?)
    }

    /// Persist the full ledger state in one transaction.
    pub fn save_ledger(&self, state: &LedgerState) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        write_document(&tx, "ledger", keys::LEDGER_KEYS, serde_json::to_value(state)?)?;
        tx.commit()?;
        debug!(
            "Saved ledger: {} history records, total {:.4} ml",
            state.history.len(),
            state.total_usage_ml
        );
        Ok(())
    }

    /// Load the app flags; missing keys take their defaults.
    pub fn load_flags(&self) -> Result<AppFlags> {
        let document = self.read_document(keys::FLAG_KEYS)?;
        Ok(serde_json::from_value(document)?)
    }

    /// Persist the app flags in one transaction.
    pub fn save_flags(&self, flags: &AppFlags) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        write_document(&tx, "flags", keys::FLAG_KEYS, serde_json::to_value(flags)?)?;
        tx.commit()?;
        Ok(())
    }

    /// Clear every key and seed `state` and `flags`, atomically.
    pub fn reset_to(&self, state: &LedgerState, flags: &AppFlags) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let removed = tx.execute("DELETE FROM kv", [])?;
        write_document(&tx, "ledger", keys::LEDGER_KEYS, serde_json::to_value(state)?)?;
        write_document(&tx, "flags", keys::FLAG_KEYS, serde_json::to_value(flags)?)?;
        tx.commit()?;
        info!("Reset store ({} keys cleared)", removed);
        Ok(())
    }

    /// Query retained usage records.
    pub fn query_history(&self, query: &HistoryQuery) -> Result<Vec<UsageRecord>> {
        let history: Vec<UsageRecord> = self.get(keys::HISTORY)?.unwrap_or_default();
        Ok(query.apply(&history))
    }

    /// Archived daily totals, oldest first.
    pub fn daily_totals(&self) -> Result<Vec<DailyTotal>> {
        Ok(self.get(keys::DAILY_HISTORY)?.unwrap_or_default())
    }

    fn read_document(&self, keys: &[&str]) -> Result<Value> {
        let mut document = Map::new();
        for key in keys {
            if let Some(raw) = self.get_raw(key)? {
                document.insert((*key).to_string(), serde_json::from_str(&raw)?);
            }
        }
        Ok(Value::Object(document))
    }
}

fn put(conn: &Connection, key: &str, raw: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
        rusqlite::params![key, raw, OffsetDateTime::now_utc().unix_timestamp()],
    )
}

/// Write each listed top-level field of `document` to its key.
///
/// Listed keys absent from the document are deleted so a `None` field does
/// not leave a stale value behind.
fn write_document(
    tx: &Transaction<'_>,
    name: &'static str,
    keys: &[&str],
    document: Value,
) -> Result<()> {
    let Value::Object(fields) = document else {
        return Err(Error::NotAnObject(name));
    };
    for key in keys {
        match fields.get(*key) {
            Some(value) => {
                put(tx, key, &serde_json::to_string(value)?)?;
            }
            None => {
                tx.execute("DELETE FROM kv WHERE key = ?", [key])?;
            }
        }
    }
    Ok(())
}
