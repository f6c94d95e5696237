//! Ledger time: timestamps, clocks and auction window constants.

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;

/// Auction window constants, in seconds.
pub mod constants {
    /// Default auction window (one day).
    pub const DEFAULT_AUCTION_WINDOW_SECS: u64 = 86_400;

    /// Smallest window the configuration accepts (half a day).
    pub const MIN_AUCTION_WINDOW_SECS: u64 = DEFAULT_AUCTION_WINDOW_SECS / 2;
}

/// A timestamp on the ledger clock (always UTC).
pub type Timestamp = DateTime<Utc>;

/// Source of the ledger's current time.
///
/// Implementations must be monotonically non-decreasing.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Manually driven clock, advanced in whole seconds like a block clock.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    /// Create a clock starting at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Create a clock starting at the given unix second.
    pub fn at_unix(secs: i64) -> Self {
        let start = Utc
            .timestamp_opt(secs, 0)
            .single()
            .unwrap_or_default();
        Self::new(start)
    }

    /// Move the clock forward.
    pub fn advance(&self, secs: u64) {
        let mut now = self.now.lock();
        if let Some(next) = i64::try_from(secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|d| now.checked_add_signed(d))
        {
            *now = next;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::at_unix(1_653_963_516)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}

/// End of a window of `window_secs` that opened at `start`, inclusive.
///
/// Returns `None` when the deadline is beyond the representable range,
/// in which case the window never closes.
pub fn window_deadline(start: Timestamp, window_secs: u64) -> Option<Timestamp> {
    let secs = i64::try_from(window_secs).ok()?;
    start.checked_add_signed(Duration::try_seconds(secs)?)
}

/// Check whether `now` still lies inside the window `[start, start + window_secs]`.
pub fn within_window(start: Timestamp, window_secs: u64, now: Timestamp) -> bool {
    match window_deadline(start, window_secs) {
        Some(deadline) => now <= deadline,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_floor_is_half_the_default() {
        assert_eq!(constants::DEFAULT_AUCTION_WINDOW_SECS, 86_400);
        assert_eq!(constants::MIN_AUCTION_WINDOW_SECS, 43_200);
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::at_unix(1_000);
        assert_eq!(clock.now().timestamp(), 1_000);
        clock.advance(500);
        assert_eq!(clock.now().timestamp(), 1_500);
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let clock = ManualClock::at_unix(10_000);
        let start = clock.now();
        clock.advance(86_400);
        assert!(within_window(start, 86_400, clock.now()));
        clock.advance(1);
        assert!(!within_window(start, 86_400, clock.now()));
    }

    #[test]
    fn test_unrepresentable_window_never_closes() {
        let start = ManualClock::default().now();
        assert!(window_deadline(start, u64::MAX).is_none());
        assert!(within_window(start, u64::MAX, start));
    }

    proptest! {
        #[test]
        fn prop_within_window_matches_arithmetic(window in 0u64..10_000_000, elapsed in 0u64..20_000_000) {
            let clock = ManualClock::at_unix(1_600_000_000);
            let start = clock.now();
            clock.advance(elapsed);
            prop_assert_eq!(within_window(start, window, clock.now()), elapsed <= window);
        }
    }
}
