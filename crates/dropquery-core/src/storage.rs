//! Storage abstraction for the ledger.
//!
//! [`LedgerStorage`] decouples the accounting rules from persistence. The
//! native implementation is [`SqliteStorage`]; tests use
//! [`MemoryStorage`](crate::mock::MemoryStorage).

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::Mutex;

use dropquery_store::Store;
use dropquery_types::{AppFlags, LedgerState};

use crate::error::Result;

/// Persistence operations the ledger needs.
///
/// Every write must be atomic: either all keys of the document change or
/// none do.
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    /// Load the ledger state; zero state when nothing is stored.
    async fn load_state(&self) -> Result<LedgerState>;

    /// Persist the full ledger state.
    async fn save_state(&self, state: &LedgerState) -> Result<()>;

    /// Load the app flags; defaults when nothing is stored.
    async fn load_flags(&self) -> Result<AppFlags>;

    /// Persist the app flags.
    async fn save_flags(&self, flags: &AppFlags) -> Result<()>;

    /// Clear every key and seed `state` and `flags`.
    async fn reset(&self, state: &LedgerState, flags: &AppFlags) -> Result<()>;
}

/// SQLite-backed ledger storage.
pub struct SqliteStorage {
    store: Mutex<Store>,
}

impl SqliteStorage {
    /// Wrap an open store.
    pub fn new(store: Store) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    /// Open or create the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(Store::open(path)?))
    }

    /// Open an in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Store::open_in_memory()?))
    }

    /// Run a closure against the underlying store.
    pub async fn with_store<T>(&self, f: impl FnOnce(&Store) -> T) -> T {
        let store = self.store.lock().await;
        f(&store)
    }
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage").finish_non_exhaustive()
    }
}

#[async_trait]
impl LedgerStorage for SqliteStorage {
    async fn load_state(&self) -> Result<LedgerState> {
        Ok(self.store.lock().await.load_ledger()?)
    }

    async fn save_state(&self, state: &LedgerState) -> Result<()> {
        Ok(self.store.lock().await.save_ledger(state)?)
    }

    async fn load_flags(&self) -> Result<AppFlags> {
        Ok(self.store.lock().await.load_flags()?)
    }

    async fn save_flags(&self, flags: &AppFlags) -> Result<()> {
        Ok(self.store.lock().await.save_flags(flags)?)
    }

    async fn reset(&self, state: &LedgerState, flags: &AppFlags) -> Result<()> {
        Ok(self.store.lock().await.reset_to(state, flags)?)
    }
}
