//! Linear reconnect backoff with an attempt ceiling.

use std::time::Duration;

/// Tracks reconnect attempts for one client.
///
/// Each close asks for [`next_delay`](Self::next_delay): attempt `n` waits
/// `n * base_delay`. A successful open calls [`reset`](Self::reset), so
/// backoff never carries over from one outage to the next.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    max_attempts: u32,
    base_delay: Duration,
    attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            attempts: 0,
        }
    }

    /// Attempts scheduled since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Count a close and return the delay before the next attempt, or
    /// `None` once the ceiling is reached.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        self.attempts += 1;
        Some(self.base_delay * self.attempts)
    }
}
