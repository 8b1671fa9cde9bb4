// Rate-limit tracker.
// Shared knowledge of GitHub throttling windows for every caller using one token.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::clock::Clock;

use super::types::RateLimitInfo;

/// Backoff applied when a throttling response carries no reset header.
pub const DEFAULT_BACKOFF_MS: i64 = 60_000;

/// Quota above which any previous block is considered lifted.
const HEALTHY_REMAINING: i64 = 10;

#[derive(Debug, Default)]
struct RateLimitState {
    blocked_until: Option<i64>,
    remaining: Option<i64>,
    /// Last `x-ratelimit-reset` seen, in epoch milliseconds.
    quota_reset_at: Option<i64>,
}

/// Convert an `x-ratelimit-reset` value (Unix seconds) to epoch milliseconds.
///
/// Values that do not fit are treated as if the header were absent.
pub fn reset_header_ms(reset_secs: i64) -> Option<i64> {
    reset_secs.checked_mul(1000)
}

/// Tracks the active rate-limit window, if any.
///
/// Windows are discovered from response headers and reset lazily: nothing
/// runs in the background, [`RateLimitTracker::is_rate_limited`] forgets a
/// window once the clock has passed it.
pub struct RateLimitTracker {
    clock: Arc<dyn Clock>,
    state: Mutex<RateLimitState>,
}

impl RateLimitTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(RateLimitState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, RateLimitState> {
        // State is plain integers, a poisoned lock still holds a usable value.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_rate_limited(&self) -> bool {
        let now = self.clock.now_ms();
        let mut state = self.state();
        match state.blocked_until {
            Some(until) if until > now => true,
            Some(_) => {
                debug!("rate limit window elapsed");
                state.blocked_until = None;
                false
            }
            None => false,
        }
    }

    /// Record the status and rate-limit headers of a GitHub response.
    ///
    /// `reset_secs` is the raw `x-ratelimit-reset` value (Unix seconds).
    pub fn record_response(&self, status: u16, remaining: Option<i64>, reset_secs: Option<i64>) {
        let now = self.clock.now_ms();
        let reset_ms = reset_secs.and_then(reset_header_ms);
        let backoff_until = reset_ms.unwrap_or(now.saturating_add(DEFAULT_BACKOFF_MS));
        let mut state = self.state();
        if reset_ms.is_some() {
            state.quota_reset_at = reset_ms;
        }

        if status == 403 || status == 429 {
            warn!(status, blocked_until = backoff_until, "GitHub rate limit hit");
            state.blocked_until = Some(backoff_until);
            if remaining.is_some() {
                state.remaining = remaining;
            }
            return;
        }

        if let Some(remaining) = remaining {
            state.remaining = Some(remaining);
            if remaining <= 0 && reset_ms.is_some() {
                warn!(blocked_until = backoff_until, "GitHub quota exhausted");
                state.blocked_until = Some(backoff_until);
            } else if remaining > HEALTHY_REMAINING {
                state.blocked_until = None;
            }
        }
    }

    /// Whole seconds until the current window lifts.
    pub fn retry_after_secs(&self) -> Option<u64> {
        let now = self.clock.now_ms();
        let until = self.state().blocked_until?;
        let millis = until.saturating_sub(now);
        if millis <= 0 {
            return None;
        }
        Some((millis as u64).div_ceil(1000))
    }

    pub fn remaining(&self) -> Option<i64> {
        self.state().remaining
    }

    pub fn blocked_until(&self) -> Option<i64> {
        self.state().blocked_until
    }

    /// Quota headers from the last response, same shape as a page's [`RateLimitInfo`].
    pub fn snapshot(&self) -> RateLimitInfo {
        let state = self.state();
        RateLimitInfo {
            remaining: state.remaining,
            reset_at: state.quota_reset_at,
        }
    }

    /// Forget everything observed so far.
    pub fn reset(&self) {
        *self.state() = RateLimitState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const START: i64 = 1_700_000_000_000;

    fn tracker() -> (Arc<ManualClock>, RateLimitTracker) {
        let clock = Arc::new(ManualClock::new(START));
        let tracker = RateLimitTracker::new(clock.clone());
        (clock, tracker)
    }

    #[test]
    fn test_429_blocks_until_reset() {
        let (clock, tracker) = tracker();
        let reset_secs = START / 1000 + 30;

        tracker.record_response(429, Some(0), Some(reset_secs));
        assert!(tracker.is_rate_limited());
        assert_eq!(tracker.retry_after_secs(), Some(30));

        clock.set(reset_secs * 1000 - 1);
        assert!(tracker.is_rate_limited());

        clock.set(reset_secs * 1000);
        assert!(!tracker.is_rate_limited());
        assert_eq!(tracker.blocked_until(), None);
        assert_eq!(tracker.retry_after_secs(), None);
    }

    #[test]
    fn test_default_backoff_without_reset_header() {
        let (_clock, tracker) = tracker();

        tracker.record_response(403, None, None);
        assert!(tracker.is_rate_limited());
        assert_eq!(tracker.retry_after_secs(), Some(60));
    }

    #[test]
    fn test_exhausted_quota_blocks() {
        let (_clock, tracker) = tracker();

        tracker.record_response(200, Some(0), Some(START / 1000 + 120));
        assert!(tracker.is_rate_limited());
        assert_eq!(tracker.remaining(), Some(0));
        assert_eq!(tracker.retry_after_secs(), Some(120));
    }

    #[test]
    fn test_healthy_response_clears_block() {
        let (_clock, tracker) = tracker();

        tracker.record_response(429, None, None);
        assert!(tracker.is_rate_limited());

        tracker.record_response(200, Some(4999), Some(START / 1000 + 3600));
        assert!(!tracker.is_rate_limited());
        assert_eq!(tracker.remaining(), Some(4999));
    }

    #[test]
    fn test_low_but_positive_quota_keeps_block() {
        let (_clock, tracker) = tracker();

        tracker.record_response(429, None, None);
        tracker.record_response(200, Some(5), None);
        assert!(tracker.is_rate_limited());
        assert_eq!(tracker.remaining(), Some(5));
    }

    #[test]
    fn test_past_reset_is_not_blocking() {
        let (_clock, tracker) = tracker();

        tracker.record_response(429, None, Some(START / 1000 - 10));
        assert_eq!(tracker.retry_after_secs(), None);
        assert!(!tracker.is_rate_limited());
    }

    #[test]
    fn test_oversized_reset_header_falls_back_to_default() {
        let (_clock, tracker) = tracker();

        tracker.record_response(429, Some(0), Some(i64::MAX));
        assert!(tracker.is_rate_limited());
        assert_eq!(tracker.retry_after_secs(), Some(60));
        assert_eq!(tracker.snapshot().reset_at, None);

        tracker.record_response(200, Some(0), Some(i64::MIN));
        tracker.record_response(429, None, Some(i64::MIN / 1000));
        assert_eq!(tracker.retry_after_secs(), None);
        tracker.record_response(429, None, Some(i64::MAX));
        assert_eq!(tracker.blocked_until(), Some(START + DEFAULT_BACKOFF_MS));
        assert_eq!(reset_header_ms(1_700_000_000), Some(1_700_000_000_000));
    }

    #[test]
    fn test_snapshot_reports_quota_reset_not_block() {
        let (_clock, tracker) = tracker();

        tracker.record_response(200, Some(100), Some(START / 1000 + 3600));
        tracker.record_response(429, None, None);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.remaining, Some(100));
        assert_eq!(snapshot.reset_at, Some(START + 3_600_000));
        assert_eq!(tracker.blocked_until(), Some(START + DEFAULT_BACKOFF_MS));
    }

    #[test]
    fn test_snapshot_and_reset() {
        let (_clock, tracker) = tracker();
        tracker.record_response(200, Some(42), None);

        assert_eq!(
            tracker.snapshot(),
            RateLimitInfo {
                remaining: Some(42),
                reset_at: None
            }
        );

        tracker.reset();
        assert_eq!(tracker.snapshot(), RateLimitInfo::default());
    }
}
