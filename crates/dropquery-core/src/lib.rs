//! Query detection and usage accounting for DropQuery.
//!
//! This crate turns page activity into a persisted water-usage ledger:
//!
//! ```text
//! PageEvent ─▶ DetectorHub ─▶ candidate channel ─▶ QueryTracker (gate) ─▶ Ledger
//!                                                                         ├─▶ LedgerEvent broadcast
//!                                                                         └─▶ SyncClient::push
//! ```
//!
//! # Features
//!
//! - **Detectors**: network interception, DOM heuristics for known and
//!   unknown chat sites, conversation-turn and search-panel detection
//! - **Throttle gate**: near-simultaneous candidates become one record
//! - **Ledger**: day rollover, 7-day history, rolling average, serialized writes
//! - **Messaging**: impact messages and periodic summary text
//! - **Remote sync**: fire-and-forget HTTP mirror (feature `http-sync`)
//! - **Context probe**: one flag silences every channel when the runtime goes away
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use dropquery_core::{
//!     ContextHandle, DetectorHub, Ledger, PageEvent, QueryTracker, SystemClock, Transport,
//!     candidate_channel, storage::SqliteStorage,
//! };
//! use dropquery_types::{ThrottleGate, VolumeEstimates};
//!
//! #[tokio::main]
//! async fn main() -> dropquery_core::Result<()> {
//!     let clock = Arc::new(SystemClock::detect());
//!     let ledger = Arc::new(Ledger::new(SqliteStorage::open_in_memory()?, clock.clone()));
//!
//!     let (tx, rx) = candidate_channel();
//!     let mut hub = DetectorHub::new(VolumeEstimates::default(), ContextHandle::new(), clock, tx);
//!     hub.handle(PageEvent::Request {
//!         url: "https://chatgpt.com/backend-api/conversation".into(),
//!         method: "POST".into(),
//!         transport: Transport::Fetch,
//!         status: Some(200),
//!     });
//!     drop(hub);
//!
//!     let tracker = QueryTracker::new(ledger.clone(), ThrottleGate::default());
//!     let stats = tracker.run(rx, Default::default()).await;
//!     assert_eq!(stats.recorded, 1);
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod context;
pub mod detector;
pub mod error;
pub mod events;
pub mod ledger;
pub mod messaging;
pub mod mock;
pub mod onboarding;
pub mod storage;
pub mod sync;
pub mod tracker;

pub use clock::{Clock, SystemClock};
pub use context::ContextHandle;
pub use detector::{
    DetectError, Detection, Detector, DetectorHub, DetectorKind, ElementSnapshot, NodeId,
    PageEvent, PageModel, Transport,
};
pub use error::{Error, Result};
pub use events::{EventDispatcher, EventReceiver, EventSender, LedgerEvent};
pub use ledger::{Ledger, LedgerConfig};
pub use messaging::{
    EquivalenceConstants, ImpactMessage, MessageGenerator, SummaryFigures, SummaryFrequency, Tone,
    summary_text,
};
pub use onboarding::{SurveyAnswers, UsageFrequency, UsagePurpose};
pub use storage::{LedgerStorage, SqliteStorage};
#[cfg(feature = "http-sync")]
pub use sync::HttpSyncClient;
pub use sync::{NoopSync, SyncClient, SyncConfig, SyncEvent};
pub use tracker::{Candidate, CandidateReceiver, CandidateSender, QueryTracker, TrackerStats, candidate_channel};

// Re-export types from dropquery-types for convenience
pub use dropquery_types::{
    AppFlags, DailyTotal, DisplayUnit, LedgerState, LedgerSummary, ModelTag, ThrottleGate,
    UsageRecord, VolumeEstimates,
};
