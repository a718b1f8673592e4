//! Query detectors and the hub that drives them.
//!
//! Each [`Detector`] is a synchronous state machine fed the same stream of
//! [`PageEvent`]s. The [`DetectorHub`] owns the [`PageModel`], routes every
//! event to the detectors that apply to the current host, and turns their
//! detections into [`Candidate`]s on the candidate channel. Several
//! detectors may fire for one user action; the throttle gate downstream
//! collapses them.
//!
//! | Detector | Hosts | Fires on |
//! |----------|-------|----------|
//! | [`NetworkDetector`] | all | successful POST/beacon to an AI endpoint |
//! | [`StructuredDomDetector`] | known AI hosts | Enter, send click, form submit |
//! | [`GenericDomDetector`] | other hosts | Enter or submit on a chat-like input |
//! | [`MutationDetector`] | all | inserted user conversation turns |
//! | [`SurfaceDetector`] | search hosts | inserted AI answer panels |

pub mod generic;
pub mod mutation;
pub mod network;
pub mod page;
pub mod selector;
pub mod structured;
pub mod surface;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use dropquery_types::{ModelTag, VolumeEstimates};

use crate::clock::Clock;
use crate::context::ContextHandle;
use crate::tracker::{Candidate, CandidateSender};

pub use generic::GenericDomDetector;
pub use mutation::MutationDetector;
pub use network::NetworkDetector;
pub use page::{ElementSnapshot, NodeId, PageEvent, PageModel, Transport};
pub use selector::{RuleTable, Selector};
pub use structured::StructuredDomDetector;
pub use surface::SurfaceDetector;

/// Which heuristic produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    Network,
    StructuredDom,
    GenericDom,
    Mutation,
    Surface,
}

impl DetectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorKind::Network => "network",
            DetectorKind::StructuredDom => "structured_dom",
            DetectorKind::GenericDom => "generic_dom",
            DetectorKind::Mutation => "mutation",
            DetectorKind::Surface => "surface",
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detector failures. The hub logs and discards these.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum DetectError {
    #[error("Invalid page URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unknown node {0}")]
    UnknownNode(NodeId),
}

/// A detector's claim that a prompt was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub model: ModelTag,
}

impl Detection {
    pub fn new(model: ModelTag) -> Self {
        Self { model }
    }
}

/// A query-detection heuristic.
pub trait Detector: Send {
    fn kind(&self) -> DetectorKind;

    /// Whether this detector runs on pages served from `host`.
    fn applies_to(&self, host: &str) -> bool;

    /// Observe one event. `page` already reflects the event.
    fn observe(&mut self, event: &PageEvent, page: &PageModel) -> Result<Vec<Detection>, DetectError>;

    /// Forget per-page state.
    fn reset(&mut self);
}

/// The standard detector set.
pub fn default_detectors() -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(NetworkDetector::new()),
        Box::new(StructuredDomDetector::new()),
        Box::new(GenericDomDetector::new()),
        Box::new(MutationDetector::new()),
        Box::new(SurfaceDetector::new()),
    ]
}

/// Drives detectors over a page-event stream.
pub struct DetectorHub {
    page: PageModel,
    detectors: Vec<Box<dyn Detector>>,
    estimates: VolumeEstimates,
    context: ContextHandle,
    clock: Arc<dyn Clock>,
    candidates: CandidateSender,
}

impl fmt::Debug for DetectorHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectorHub")
            .field("host", &self.page.host())
            .field(
                "detectors",
                &self.detectors.iter().map(|d| d.kind()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl DetectorHub {
    /// Hub with the standard detectors.
    pub fn new(
        estimates: VolumeEstimates,
        context: ContextHandle,
        clock: Arc<dyn Clock>,
        candidates: CandidateSender,
    ) -> Self {
        Self::with_detectors(default_detectors(), estimates, context, clock, candidates)
    }

    pub fn with_detectors(
        detectors: Vec<Box<dyn Detector>>,
        estimates: VolumeEstimates,
        context: ContextHandle,
        clock: Arc<dyn Clock>,
        candidates: CandidateSender,
    ) -> Self {
        Self {
            page: PageModel::new(),
            detectors,
            estimates,
            context,
            clock,
            candidates,
        }
    }

    pub fn page(&self) -> &PageModel {
        &self.page
    }

    /// Handle an event stamped with the current clock.
    pub fn handle(&mut self, event: PageEvent) -> usize {
        let at_ms = self.clock.now_ms();
        self.handle_at(event, at_ms)
    }

    /// Handle an event that happened at `at_ms`. Returns the number of
    /// candidates emitted.
    ///
    /// Nothing is emitted once the context is invalid.
    pub fn handle_at(&mut self, event: PageEvent, at_ms: u64) -> usize {
        if !self.context.is_valid() {
            debug!("Context invalidated, dropping page event");
            return 0;
        }

        if let Err(e) = self.page.apply(&event) {
            debug!("Page model rejected event: {}", e);
            return 0;
        }
        if matches!(event, PageEvent::Navigated { .. }) {
            for detector in &mut self.detectors {
                detector.reset();
            }
        }

        let host = self.page.host().to_string();
        let mut emitted = 0;
        for detector in &mut self.detectors {
            if !detector.applies_to(&host) {
                continue;
            }
            let detections = match detector.observe(&event, &self.page) {
                Ok(detections) => detections,
                Err(e) => {
                    debug!("{} detector failed: {}", detector.kind(), e);
                    continue;
                }
            };
            for detection in detections {
                let candidate = Candidate {
                    model: detection.model,
                    volume_ml: self.estimates.estimate(detection.model),
                    source: detector.kind(),
                    at_ms,
                };
                debug!(
                    "{} detector candidate: {} ({} ml)",
                    candidate.source, candidate.model, candidate.volume_ml
                );
                if self.candidates.send(candidate).is_err() {
                    debug!("Candidate channel closed");
                    return emitted;
                }
                emitted += 1;
            }
        }
        emitted
    }

    /// Consume page events until cancelled or the sender side closes.
    pub async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<PageEvent>,
        cancel: CancellationToken,
    ) -> Self {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Detector hub cancelled");
                    break;
                }
                event = events.recv() => {
                    let Some(event) = event else { break };
                    self.handle(event);
                }
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::FixedClock;
    use crate::tracker::candidate_channel;
    use time::macros::datetime;

    fn hub() -> (DetectorHub, mpsc::UnboundedReceiver<Candidate>, ContextHandle) {
        let (tx, rx) = candidate_channel();
        let context = ContextHandle::new();
        let clock = Arc::new(FixedClock::new(datetime!(2024-01-15 10:00 UTC)));
        let hub = DetectorHub::new(VolumeEstimates::default(), context.clone(), clock, tx);
        (hub, rx, context)
    }

    fn chatgpt_post() -> PageEvent {
        PageEvent::Request {
            url: "https://chatgpt.com/backend-api/conversation".to_string(),
            method: "POST".to_string(),
            transport: Transport::Fetch,
            status: Some(200),
        }
    }

    #[test]
    fn test_network_candidate_carries_estimate() {
        let (mut hub, mut rx, _) = hub();
        hub.handle_at(
            PageEvent::Navigated {
                url: "https://chatgpt.com/".to_string(),
            },
            0,
        );
        assert_eq!(hub.handle_at(chatgpt_post(), 42), 1);
        let candidate = rx.try_recv().unwrap();
        assert_eq!(candidate.model, ModelTag::ChatGpt);
        assert_eq!(candidate.volume_ml, 0.322);
        assert_eq!(candidate.source, DetectorKind::Network);
        assert_eq!(candidate.at_ms, 42);
    }

    #[test]
    fn test_invalid_context_silences_everything() {
        let (mut hub, mut rx, context) = hub();
        context.invalidate();
        assert_eq!(hub.handle_at(chatgpt_post(), 0), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_detector_errors_are_discarded() {
        let (mut hub, mut rx, _) = hub();
        let emitted = hub.handle_at(
            PageEvent::Input {
                target: NodeId(99),
                value: "x".to_string(),
            },
            0,
        );
        assert_eq!(emitted, 0);
        assert!(rx.try_recv().is_err());
        // The hub keeps working afterwards.
        assert_eq!(hub.handle_at(chatgpt_post(), 1), 1);
    }

    #[test]
    fn test_closed_channel_is_tolerated() {
        let (mut hub, rx, _) = hub();
        drop(rx);
        assert_eq!(hub.handle_at(chatgpt_post(), 0), 0);
    }

    #[tokio::test]
    async fn test_run_stops_when_events_close() {
        let (hub, mut rx, _) = hub();
        let (tx, events) = mpsc::unbounded_channel();
        tx.send(chatgpt_post()).unwrap();
        drop(tx);
        let hub = hub.run(events, CancellationToken::new()).await;
        assert_eq!(hub.page().host(), "");
        assert!(rx.try_recv().is_ok());
    }
}
