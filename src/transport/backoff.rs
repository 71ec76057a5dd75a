use std::time::Duration;

/// Exponential backoff with a hard attempt ceiling.
///
/// The delay for attempt `n` (zero-based) is `base * 2^n`, capped at
/// `max_delay`. Once the ceiling is reached `next_delay` returns `None` and
/// the caller must fail terminally rather than retry forever. Cancellation is
/// an explicit flag so callers never have to kill timers.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max_delay: Duration,
    max_attempts: u32,
    attempt: u32,
    cancelled: bool,
}

impl Backoff {
    pub fn new(base: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            max_delay,
            max_attempts,
            attempt: 0,
            cancelled: false,
        }
    }

    /// Delay to sleep before the next attempt, or `None` when out of attempts
    /// or cancelled.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.cancelled || self.attempt >= self.max_attempts {
            return None;
        }
        // Cap the shift; beyond 2^16 the max_delay clamp dominates anyway.
        let exp = self.attempt.min(16);
        let delay = self
            .base
            .saturating_mul(1u32 << exp)
            .min(self.max_delay);
        self.attempt += 1;
        Some(delay)
    }

    /// Attempts handed out so far.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
        self.cancelled = false;
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }
}
