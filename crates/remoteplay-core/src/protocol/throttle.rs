//! Rate limiting for `MOVE` commands.
//!
//! # Why throttle? (for beginners)
//!
//! A finger dragging across the touch surface produces a sample every few
//! milliseconds.  Forwarding every one of them would flood the serial radio
//! link, whose throughput is far lower than the touch sampling rate.  The
//! throttle admits at most one move per interval and drops the rest.
//!
//! Dropped moves are **not** merged into the next admitted one, so the cursor
//! on the peer travels less than the finger did during a fast drag.  Clicks
//! never pass through the throttle.

use std::time::Duration;

use crate::domain::pointer::Timestamp;

/// Default minimum spacing between two admitted moves.
pub const DEFAULT_MOVE_INTERVAL: Duration = Duration::from_millis(30);

/// Admits at most one move per `min_interval`.
///
/// # Examples
///
/// ```rust
/// use remoteplay_core::{MoveThrottle, Timestamp};
///
/// let mut throttle = MoveThrottle::default();
/// assert!(throttle.admit(Timestamp::from_millis(0)));
/// assert!(!throttle.admit(Timestamp::from_millis(10)));
/// assert!(throttle.admit(Timestamp::from_millis(30)));
/// ```
#[derive(Debug, Clone)]
pub struct MoveThrottle {
    min_interval_ms: u64,
    last_admitted: Option<Timestamp>,
}

impl Default for MoveThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_MOVE_INTERVAL)
    }
}

impl MoveThrottle {
    /// Creates a throttle with the given minimum spacing.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval_ms: u64::try_from(min_interval.as_millis()).unwrap_or(u64::MAX),
            last_admitted: None,
        }
    }

    /// Returns the configured spacing.
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    /// Decides whether a move produced at `at` may be sent.
    ///
    /// The first move is always admitted.  Afterwards a move is admitted once
    /// at least `min_interval` has elapsed since the last admitted one, and
    /// the admission time is recorded.
    pub fn admit(&mut self, at: Timestamp) -> bool {
        let allowed = match self.last_admitted {
            None => true,
            Some(last) => at.millis_since(last) >= self.min_interval_ms,
        };
        if allowed {
            self.last_admitted = Some(at);
        }
        allowed
    }

    /// Forgets the last admission so the next move passes immediately.
    pub fn reset(&mut self) {
        self.last_admitted = None;
    }
}
