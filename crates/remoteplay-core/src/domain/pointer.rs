//! Raw pointer samples produced by the touch surface.
//!
//! A touch *session* starts with a [`Phase::Down`] sample, continues with any
//! number of [`Phase::Move`] samples and ends with a [`Phase::Up`] sample.
//! The input surface guarantees that timestamps never decrease within a
//! session.

use std::fmt;

/// Milliseconds on the input surface's wall clock.
///
/// Only differences between timestamps are meaningful; the epoch is whatever
/// the input surface uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Creates a timestamp from a millisecond count.
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Returns the raw millisecond count.
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Milliseconds elapsed since `earlier`, or 0 if `earlier` is later.
    pub fn millis_since(self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Returns this timestamp shifted forward by `ms` milliseconds.
    pub fn plus_millis(self, ms: u64) -> Self {
        Self(self.0.saturating_add(ms))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Where a sample sits within a touch session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// First contact touched the surface.
    Down,
    /// One or more contacts moved, or a contact was added while held.
    Move,
    /// The last contact left the surface; the session is over.
    Up,
}

/// A single pointer sample.
///
/// `x`/`y` are the primary contact's position in surface pixels and `contacts`
/// is the number of fingers touching the surface when the sample was taken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub timestamp: Timestamp,
    pub x: f32,
    pub y: f32,
    pub contacts: u8,
    pub phase: Phase,
}

impl PointerSample {
    /// Creates a sample from its parts.
    pub fn new(timestamp: Timestamp, phase: Phase, x: f32, y: f32, contacts: u8) -> Self {
        Self {
            timestamp,
            x,
            y,
            contacts,
            phase,
        }
    }

    /// Single-contact touch-down at `(x, y)`.
    pub fn down(ms: u64, x: f32, y: f32) -> Self {
        Self::new(Timestamp::from_millis(ms), Phase::Down, x, y, 1)
    }

    /// Single-contact move to `(x, y)`.
    pub fn moved(ms: u64, x: f32, y: f32) -> Self {
        Self::new(Timestamp::from_millis(ms), Phase::Move, x, y, 1)
    }

    /// Last contact lifted at `(x, y)`.
    pub fn up(ms: u64, x: f32, y: f32) -> Self {
        Self::new(Timestamp::from_millis(ms), Phase::Up, x, y, 1)
    }

    /// Returns a copy of this sample with a different contact count.
    pub fn with_contacts(mut self, contacts: u8) -> Self {
        self.contacts = contacts;
        self
    }

    /// Euclidean distance in pixels between this sample and `(x, y)`.
    pub fn distance_to(&self, x: f32, y: f32) -> f32 {
        (self.x - x).hypot(self.y - y)
    }
}
