//! Wall-clock abstraction so day rollover can be tested deterministically.

use time::{Date, OffsetDateTime, UtcOffset};

/// Source of the current instant in device-local time.
pub trait Clock: Send + Sync {
    /// Current instant, in the device's local offset.
    fn now(&self) -> OffsetDateTime;

    /// Current device-local calendar date.
    fn today(&self) -> Date {
        self.now().date()
    }

    /// Milliseconds since the Unix epoch, for gate timestamps.
    fn now_ms(&self) -> u64 {
        u64::try_from(self.now().unix_timestamp_nanos() / 1_000_000).unwrap_or(0)
    }
}

/// The system clock, reporting in a fixed local offset.
///
/// The offset is resolved once at construction. On Unix the local offset can
/// only be determined while the process is single-threaded, so construct
/// this before starting a multi-threaded runtime; if the offset cannot be
/// determined, UTC is used.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: UtcOffset,
}

impl SystemClock {
    /// Resolve the local offset now.
    pub fn detect() -> Self {
        Self {
            offset: UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
        }
    }

    /// Use an explicit offset.
    pub fn with_offset(offset: UtcOffset) -> Self {
        Self { offset }
    }

    /// The offset this clock reports in.
    pub fn offset(&self) -> UtcOffset {
        self.offset
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::detect()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    struct At(OffsetDateTime);

    impl Clock for At {
        fn now(&self) -> OffsetDateTime {
            self.0
        }
    }

    #[test]
    fn test_today_uses_local_offset() {
        // 23:30 in UTC-5 is already the next day in UTC
        let clock = At(datetime!(2024-01-15 23:30 -5));
        assert_eq!(clock.today(), time::macros::date!(2024 - 01 - 15));
    }

    #[test]
    fn test_now_ms() {
        let clock = At(datetime!(1970-01-01 00:00:01.5 UTC));
        assert_eq!(clock.now_ms(), 1500);
    }

    #[test]
    fn test_system_clock_offset() {
        let clock = SystemClock::with_offset(offset!(+2));
        assert_eq!(clock.now().offset(), offset!(+2));
    }
}
