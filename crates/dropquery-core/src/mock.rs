//! Test doubles for the ledger's collaborators.
//!
//! - [`MemoryStorage`]: in-memory [`LedgerStorage`] with failure injection
//! - [`FixedClock`]: a settable [`Clock`]
//! - [`RecordingSync`]: a [`SyncClient`] that keeps every pushed event
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use dropquery_core::mock::{FixedClock, MemoryStorage};
//! use dropquery_core::Ledger;
//! use dropquery_types::ModelTag;
//!
//! #[tokio::main]
//! async fn main() {
//!     let clock = Arc::new(FixedClock::new(time::macros::datetime!(2024-01-15 10:00 UTC)));
//!     let ledger = Ledger::new(MemoryStorage::new(), clock);
//!     ledger.record_query(ModelTag::ChatGpt, 0.322).await.unwrap();
//!     assert_eq!(ledger.summary().await.unwrap().queries_today, 1);
//! }
//! ```

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use dropquery_types::{AppFlags, LedgerState};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::storage::LedgerStorage;
use crate::sync::{SyncClient, SyncEvent};

/// In-memory ledger storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: RwLock<Option<LedgerState>>,
    flags: RwLock<Option<AppFlags>>,
    write_count: AtomicU32,
    should_fail: AtomicBool,
    /// Number of operations to fail before succeeding.
    remaining_failures: AtomicU32,
}

impl MemoryStorage {
    /// Empty storage; loads return zero state and default flags.
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with `state`.
    pub fn with_state(state: LedgerState) -> Self {
        Self {
            state: RwLock::new(Some(state)),
            ..Self::default()
        }
    }

    /// Make every operation fail (or stop failing).
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    /// Fail the next `count` operations, then succeed.
    pub fn set_transient_failures(&self, count: u32) {
        self.remaining_failures.store(count, Ordering::Relaxed);
    }

    /// Remaining transient failures.
    pub fn remaining_failures(&self) -> u32 {
        self.remaining_failures.load(Ordering::Relaxed)
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> u32 {
        self.write_count.load(Ordering::Relaxed)
    }

    /// Stored state, if any was written.
    pub async fn stored_state(&self) -> Option<LedgerState> {
        self.state.read().await.clone()
    }

    fn check_should_fail(&self) -> Result<()> {
        if self.remaining_failures.load(Ordering::Relaxed) > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(mock_failure());
        }
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(mock_failure());
        }
        Ok(())
    }
}

fn mock_failure() -> Error {
    Error::Storage(dropquery_store::Error::Io(std::io::Error::other(
        "Mock storage failure",
    )))
}

#[async_trait]
impl LedgerStorage for MemoryStorage {
    async fn load_state(&self) -> Result<LedgerState> {
        self.check_should_fail()?;
        Ok(self.state.read().await.clone().unwrap_or_default())
    }

    async fn save_state(&self, state: &LedgerState) -> Result<()> {
        self.check_should_fail()?;
        *self.state.write().await = Some(state.clone());
        self.write_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn load_flags(&self) -> Result<AppFlags> {
        self.check_should_fail()?;
        Ok(self.flags.read().await.clone().unwrap_or_default())
    }

    async fn save_flags(&self, flags: &AppFlags) -> Result<()> {
        self.check_should_fail()?;
        *self.flags.write().await = Some(flags.clone());
        self.write_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn reset(&self, state: &LedgerState, flags: &AppFlags) -> Result<()> {
        self.check_should_fail()?;
        *self.state.write().await = Some(state.clone());
        *self.flags.write().await = Some(flags.clone());
        self.write_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<OffsetDateTime>,
}

impl FixedClock {
    /// Clock frozen at `now`.
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Jump to `now`.
    pub fn set(&self, now: OffsetDateTime) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    /// Move forward by `by`.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.now
            .lock()
            .map(|guard| *guard)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }
}

/// Sync client that records pushed events.
#[derive(Debug, Default)]
pub struct RecordingSync {
    events: Mutex<Vec<SyncEvent>>,
}

impl RecordingSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events pushed so far.
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl SyncClient for RecordingSync {
    fn push(&self, event: SyncEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dropquery_types::ModelTag;
    use time::macros::datetime;

    #[tokio::test]
    async fn test_memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.load_state().await.unwrap(), LedgerState::default());
        let state = LedgerState {
            total_usage_ml: 2.0,
            ..Default::default()
        };
        storage.save_state(&state).await.unwrap();
        assert_eq!(storage.load_state().await.unwrap(), state);
        assert_eq!(storage.write_count(), 1);
    }

    #[tokio::test]
    async fn test_transient_failures() {
        let storage = MemoryStorage::new();
        storage.set_transient_failures(2);
        assert!(storage.load_state().await.is_err());
        assert!(storage.load_state().await.is_err());
        assert!(storage.load_state().await.is_ok());
        assert_eq!(storage.remaining_failures(), 0);
    }

    #[tokio::test]
    async fn test_should_fail() {
        let storage = MemoryStorage::new();
        storage.set_should_fail(true);
        assert!(matches!(
            storage.save_flags(&AppFlags::default()).await,
            Err(Error::Storage(_))
        ));
        storage.set_should_fail(false);
        assert!(storage.save_flags(&AppFlags::default()).await.is_ok());
    }

    #[test]
    fn test_fixed_clock_advance() {
        let clock = FixedClock::new(datetime!(2024-01-15 23:59 UTC));
        clock.advance(Duration::from_secs(120));
        assert_eq!(clock.today(), time::macros::date!(2024 - 01 - 16));
    }

    #[test]
    fn test_recording_sync() {
        let sync = RecordingSync::new();
        sync.push(SyncEvent::query(
            None,
            ModelTag::Gemini,
            0.26,
            OffsetDateTime::UNIX_EPOCH,
        ));
        assert_eq!(sync.events().len(), 1);
    }
}
