//! Throttle/dedup gate that collapses near-simultaneous query candidates.
//!
//! Several detectors usually fire for the same user action (the network
//! request, the Enter key, the new conversation turn). The gate admits the
//! first and rejects everything that arrives within the window after it.
//!
//! # Example
//!
//! ```
//! use dropquery_types::ThrottleGate;
//!
//! let mut gate = ThrottleGate::default();
//! assert!(gate.admit(0));
//! assert!(!gate.admit(500));
//! assert!(gate.admit(1600));
//! ```

use std::time::Duration;

/// Default dedup window in milliseconds.
pub const DEFAULT_WINDOW_MS: u64 = 1500;

/// Admits at most one candidate per window.
///
/// Timestamps are milliseconds on any monotonic-ish clock; only differences
/// matter. State is process-local and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleGate {
    window_ms: u64,
    last_admitted_at: Option<u64>,
}

impl Default for ThrottleGate {
    fn default() -> Self {
        Self::with_window_ms(DEFAULT_WINDOW_MS)
    }
}

impl ThrottleGate {
    /// Create a gate with the given window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self::with_window_ms(u64::try_from(window.as_millis()).unwrap_or(u64::MAX))
    }

    /// Create a gate with a window given in milliseconds.
    #[must_use]
    pub fn with_window_ms(window_ms: u64) -> Self {
        Self {
            window_ms,
            last_admitted_at: None,
        }
    }

    /// Decide whether a candidate observed at `timestamp_ms` is admitted.
    ///
    /// The first call always admits. Afterwards a candidate is admitted iff
    /// at least the window has elapsed since the last admitted one. A
    /// timestamp earlier than the last admitted one is rejected.
    pub fn admit(&mut self, timestamp_ms: u64) -> bool {
        if let Some(last) = self.last_admitted_at {
            if timestamp_ms < last || timestamp_ms - last < self.window_ms {
                return false;
            }
        }
        self.last_admitted_at = Some(timestamp_ms);
        true
    }

    /// Timestamp of the most recently admitted candidate.
    #[must_use]
    pub fn last_admitted_at(&self) -> Option<u64> {
        self.last_admitted_at
    }

    /// Configured window.
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Forget the last admission so the next candidate is admitted.
    pub fn reset(&mut self) {
        self.last_admitted_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_admit_always_succeeds() {
        let mut gate = ThrottleGate::default();
        assert!(gate.admit(0));
        assert_eq!(gate.last_admitted_at(), Some(0));
    }

    #[test]
    fn test_window_scenario() {
        let mut gate = ThrottleGate::default();
        assert!(gate.admit(0));
        assert!(!gate.admit(500));
        // rejection does not move the window
        assert_eq!(gate.last_admitted_at(), Some(0));
        assert!(gate.admit(1600));
        assert_eq!(gate.last_admitted_at(), Some(1600));
    }

    #[test]
    fn test_exact_window_boundary_admits() {
        let mut gate = ThrottleGate::with_window_ms(1000);
        assert!(gate.admit(10_000));
        assert!(!gate.admit(10_999));
        assert!(gate.admit(11_000));
    }

    #[test]
    fn test_earlier_timestamp_rejected() {
        let mut gate = ThrottleGate::default();
        assert!(gate.admit(5_000));
        assert!(!gate.admit(1_000));
        assert_eq!(gate.last_admitted_at(), Some(5_000));
    }

    #[test]
    fn test_reset_reopens_gate() {
        let mut gate = ThrottleGate::default();
        assert!(gate.admit(100));
        gate.reset();
        assert!(gate.admit(200));
    }

    #[test]
    fn test_window_from_duration() {
        let gate = ThrottleGate::new(Duration::from_secs(2));
        assert_eq!(gate.window(), Duration::from_millis(2000));
    }

    proptest! {
        #[test]
        fn burst_within_window_admits_once(
            start in 0u64..1_000_000_000,
            offsets in proptest::collection::vec(0u64..DEFAULT_WINDOW_MS, 1..20),
        ) {
            let mut gate = ThrottleGate::default();
            let mut times: Vec<u64> = offsets.iter().map(|o| start + o).collect();
            times.insert(0, start);
            let admitted = times.iter().filter(|&&t| gate.admit(t)).count();
            prop_assert_eq!(admitted, 1);
        }

        #[test]
        fn admitted_candidates_are_window_apart(
            mut times in proptest::collection::vec(0u64..100_000, 1..50),
        ) {
            times.sort_unstable();
            let mut gate = ThrottleGate::default();
            let admitted: Vec<u64> = times.into_iter().filter(|&t| gate.admit(t)).collect();
            prop_assert!(!admitted.is_empty());
            for pair in admitted.windows(2) {
                prop_assert!(pair[1] - pair[0] >= DEFAULT_WINDOW_MS);
            }
        }
    }
}
