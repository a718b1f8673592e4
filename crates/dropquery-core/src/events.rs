//! Ledger event system for UI refresh notifications.
//!
//! Every successful ledger mutation broadcasts a [`LedgerEvent`]. Sending
//! never fails: with no subscribers the event is simply dropped, and slow
//! subscribers observe `RecvError::Lagged` rather than blocking the ledger.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use dropquery_types::{DisplayUnit, LedgerSummary, UsageRecord};

/// Events emitted by the ledger.
///
/// All events are serializable for logging and IPC.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum LedgerEvent {
    /// A query was recorded.
    Recorded {
        summary: LedgerSummary,
        record: UsageRecord,
    },
    /// The ledger was wiped and re-seeded.
    Reset,
    /// The display unit preference changed.
    DisplayUnitChanged { unit: DisplayUnit },
    /// The onboarding survey was completed.
    OnboardingCompleted,
}

/// Sender for ledger events.
pub type EventSender = broadcast::Sender<LedgerEvent>;

/// Receiver for ledger events.
pub type EventReceiver = broadcast::Receiver<LedgerEvent>;

/// Event dispatcher for sending events to multiple receivers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: EventSender,
}

impl EventDispatcher {
    /// Create a new event dispatcher.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send an event.
    pub fn send(&self, event: LedgerEvent) {
        // No receivers is fine
        let _ = self.sender.send(event);
    }

    /// Get the number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(100)
    }
}
