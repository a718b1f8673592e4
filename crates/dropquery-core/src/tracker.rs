//! Candidate channel and the gate worker that turns candidates into ledger
//! records.
//!
//! Every detector emits into one unbounded channel. [`QueryTracker`] drains
//! it, applies the [`ThrottleGate`] so one user action yields at most one
//! record, and calls [`Ledger::record_query`]. Rejected candidates and
//! failed writes are dropped, never retried.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use dropquery_types::{ModelTag, ThrottleGate, UsageRecord};

use crate::detector::DetectorKind;
use crate::error::Error;
use crate::ledger::Ledger;
use crate::storage::LedgerStorage;

/// A detector's unconfirmed signal that a query was sent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub model: ModelTag,
    pub volume_ml: f64,
    pub source: DetectorKind,
    /// Milliseconds since the Unix epoch.
    pub at_ms: u64,
}

/// Sender half of the candidate channel.
pub type CandidateSender = mpsc::UnboundedSender<Candidate>;

/// Receiver half of the candidate channel.
pub type CandidateReceiver = mpsc::UnboundedReceiver<Candidate>;

/// Create the candidate channel.
pub fn candidate_channel() -> (CandidateSender, CandidateReceiver) {
    mpsc::unbounded_channel()
}

/// Counters from one tracker run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrackerStats {
    /// Candidates let through by the gate.
    pub admitted: u64,
    /// Candidates collapsed by the gate.
    pub rejected: u64,
    /// Admitted candidates that became ledger records.
    pub recorded: u64,
    /// Admitted candidates whose ledger write failed.
    pub dropped: u64,
}

/// Gate worker between detectors and the ledger.
pub struct QueryTracker<S> {
    ledger: Arc<Ledger<S>>,
    gate: ThrottleGate,
    stats: TrackerStats,
}

impl<S> std::fmt::Debug for QueryTracker<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryTracker")
            .field("gate", &self.gate)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<S: LedgerStorage> QueryTracker<S> {
    pub fn new(ledger: Arc<Ledger<S>>, gate: ThrottleGate) -> Self {
        Self {
            ledger,
            gate,
            stats: TrackerStats::default(),
        }
    }

    pub fn stats(&self) -> TrackerStats {
        self.stats
    }

    pub fn gate(&self) -> &ThrottleGate {
        &self.gate
    }

    /// Gate one candidate and record it if admitted.
    ///
    /// Returns the record, or `None` when the gate rejected the candidate or
    /// the ledger write failed.
    pub async fn offer(&mut self, candidate: Candidate) -> Option<UsageRecord> {
        if !self.gate.admit(candidate.at_ms) {
            self.stats.rejected += 1;
            debug!(
                "Throttled {} candidate from {} detector",
                candidate.model, candidate.source
            );
            return None;
        }
        self.stats.admitted += 1;

        match self
            .ledger
            .record_query(candidate.model, candidate.volume_ml)
            .await
        {
            Ok(record) => {
                self.stats.recorded += 1;
                Some(record)
            }
            Err(Error::ContextInvalidated) => {
                self.stats.dropped += 1;
                debug!("Context invalidated, dropping {} query", candidate.model);
                None
            }
            Err(e) => {
                self.stats.dropped += 1;
                warn!("Dropped {} query: {}", candidate.model, e);
                None
            }
        }
    }

    /// Drain `candidates` until cancelled or every sender is gone.
    pub async fn run(mut self, mut candidates: CandidateReceiver, cancel: CancellationToken) -> TrackerStats {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Query tracker cancelled");
                    break;
                }
                candidate = candidates.recv() => {
                    let Some(candidate) = candidate else {
                        debug!("All detectors gone, stopping tracker");
                        break;
                    };
                    self.offer(candidate).await;
                }
            }
        }
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FixedClock, MemoryStorage};
    use time::macros::datetime;

    fn tracker() -> QueryTracker<MemoryStorage> {
        let clock = Arc::new(FixedClock::new(datetime!(2024-01-15 10:00 UTC)));
        let ledger = Arc::new(Ledger::new(MemoryStorage::new(), clock));
        QueryTracker::new(ledger, ThrottleGate::default())
    }

    fn candidate(at_ms: u64) -> Candidate {
        Candidate {
            model: ModelTag::ChatGpt,
            volume_ml: 0.322,
            source: DetectorKind::Network,
            at_ms,
        }
    }

    #[tokio::test]
    async fn test_burst_records_once() {
        let mut tracker = tracker();
        assert!(tracker.offer(candidate(1_000)).await.is_some());
        assert!(tracker.offer(candidate(1_200)).await.is_none());
        assert!(tracker.offer(candidate(2_499)).await.is_none());
        assert!(tracker.offer(candidate(2_500)).await.is_some());

        let stats = tracker.stats();
        assert_eq!(stats.admitted, 2);
        assert_eq!(stats.rejected, 2);
        assert_eq!(stats.recorded, 2);
    }

    #[tokio::test]
    async fn test_ledger_failure_is_dropped() {
        let mut tracker = tracker();
        tracker.ledger.storage().set_transient_failures(1);
        assert!(tracker.offer(candidate(0)).await.is_none());
        // The gate slot was still consumed.
        assert!(tracker.offer(candidate(100)).await.is_none());
        assert!(tracker.offer(candidate(5_000)).await.is_some());
        assert_eq!(tracker.stats().dropped, 1);
    }

    #[tokio::test]
    async fn test_run_until_senders_close() {
        let tracker = tracker();
        let ledger = Arc::clone(&tracker.ledger);
        let (tx, rx) = candidate_channel();
        for at in [0, 10, 20, 3_000] {
            tx.send(candidate(at)).unwrap();
        }
        drop(tx);

        let stats = tracker.run(rx, CancellationToken::new()).await;
        assert_eq!(stats.recorded, 2);
        assert_eq!(stats.rejected, 2);
        assert_eq!(ledger.state().await.unwrap().history.len(), 2);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let tracker = tracker();
        let (_tx, rx) = candidate_channel();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let stats = tracker.run(rx, cancel).await;
        assert_eq!(stats, TrackerStats::default());
    }
}
