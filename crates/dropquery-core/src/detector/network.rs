//! Network interception: successful POSTs and beacons to AI endpoints.

use dropquery_types::endpoints::{classify_url, is_post_like};

use super::page::{PageEvent, PageModel, Transport};
use super::{DetectError, Detection, Detector, DetectorKind};

/// Fires on every successful POST-like request to a known or pattern-matched
/// AI endpoint, regardless of the page host.
#[derive(Debug, Default, Clone)]
pub struct NetworkDetector;

impl NetworkDetector {
    pub fn new() -> Self {
        Self
    }

    /// Classify one request. Beacons count as POST-like and successful.
    pub fn classify(url: &str, method: &str, transport: Transport, status: Option<u16>) -> Option<Detection> {
        let beacon = transport == Transport::Beacon;
        if !beacon && !is_post_like(method) {
            return None;
        }
        let succeeded = beacon || status.is_some_and(|s| (200..300).contains(&s));
        if !succeeded {
            return None;
        }
        classify_url(url).map(|hit| Detection::new(hit.model))
    }
}

impl Detector for NetworkDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Network
    }

    fn applies_to(&self, _host: &str) -> bool {
        true
    }

    fn observe(&mut self, event: &PageEvent, _page: &PageModel) -> Result<Vec<Detection>, DetectError> {
        let PageEvent::Request {
            url,
            method,
            transport,
            status,
        } = event
        else {
            return Ok(Vec::new());
        };
        Ok(Self::classify(url, method, *transport, *status)
            .into_iter()
            .collect())
    }

    fn reset(&mut self) {}
}
