//! Connection state and reconnect backoff

use std::fmt;
use std::time::Duration;

/// Observable state of the relay connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Waiting `delay` before reconnect attempt number `attempt`.
    Backoff { attempt: u32, delay: Duration },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => f.write_str("Disconnected"),
            ConnectionState::Connecting => f.write_str("Connecting"),
            ConnectionState::Connected => f.write_str("Connected"),
            ConnectionState::Backoff { attempt, delay } => {
                write!(f, "Reconnecting in {}s (attempt {})", delay.as_secs(), attempt)
            }
        }
    }
}

/// A connection that survived this long resets the backoff sequence.
pub const STABILITY_THRESHOLD: Duration = Duration::from_secs(60);

/// Exponential backoff: 1s, 2s, 4s, ... capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    next_secs: u64,
    max_secs: u64,
    attempt: u32,
}

impl Backoff {
    pub fn new(max_secs: u64) -> Self {
        Self {
            next_secs: 1,
            max_secs: max_secs.max(1),
            attempt: 0,
        }
    }

    /// Delay before the next attempt, advancing the sequence.
    pub fn next_delay(&mut self) -> (u32, Duration) {
        let delay = Duration::from_secs(self.next_secs.min(self.max_secs));
        self.next_secs = self.next_secs.saturating_mul(2).min(self.max_secs);
        self.attempt = self.attempt.saturating_add(1);
        (self.attempt, delay)
    }

    /// Start over after a stable session.
    pub fn reset(&mut self) {
        self.next_secs = 1;
        self.attempt = 0;
    }

    /// Record how long an established session lasted before it dropped.
    /// Sessions that stayed up past [`STABILITY_THRESHOLD`] restart the
    /// sequence.
    pub fn session_ended(&mut self, connected_for: Duration) {
        if connected_for >= STABILITY_THRESHOLD {
            self.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut backoff = Backoff::new(8);
        let delays: Vec<u64> = (0..6).map(|_| backoff.next_delay().1.as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 8, 8]);
    }

    #[test]
    fn test_backoff_reset() {
        let mut backoff = Backoff::new(64);
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), (1, Duration::from_secs(1)));
    }

    #[test]
    fn test_stable_session_resets_backoff() {
        let mut backoff = Backoff::new(64);
        backoff.next_delay();
        backoff.next_delay();

        // A short-lived session keeps escalating.
        backoff.session_ended(Duration::from_secs(5));
        assert_eq!(backoff.next_delay(), (3, Duration::from_secs(4)));

        backoff.session_ended(STABILITY_THRESHOLD);
        assert_eq!(backoff.next_delay(), (1, Duration::from_secs(1)));
    }

    #[test]
    fn test_huge_cap_does_not_overflow() {
        let mut backoff = Backoff::new(u64::MAX);
        let mut last = Duration::ZERO;
        for _ in 0..64 {
            last = backoff.next_delay().1;
        }
        assert_eq!(last, Duration::from_secs(1 << 63));
        assert_eq!(backoff.next_delay().1, Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_state_display() {
        let state = ConnectionState::Backoff {
            attempt: 3,
            delay: Duration::from_secs(4),
        };
        assert_eq!(state.to_string(), "Reconnecting in 4s (attempt 3)");
        assert!(!state.is_connected());
        assert!(ConnectionState::Connected.is_connected());
    }
}
