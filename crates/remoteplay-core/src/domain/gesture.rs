//! Gesture recognition from raw pointer samples.
//!
//! [`GestureRecognizer`] is a small state machine fed one [`PointerSample`] at
//! a time.  It classifies each touch session as a tap, a double-tap, a
//! two-finger tap, or a drag and emits [`GestureEvent`]s as soon as the
//! classification is certain.
//!
//! # Why are taps delayed? (for beginners)
//!
//! When a finger lifts after a short, stationary touch the recognizer cannot
//! yet know whether a second tap will follow.  It therefore parks the first
//! tap as *pending* and only reports it once the double-tap window has expired
//! (see [`GestureRecognizer::poll`]).  If a second tap lands inside the window
//! the pair is reported as a single [`GestureEvent::DoubleTap`] and the
//! pending tap is never emitted.
//!
//! ```text
//!            Down(1)             moved > slop
//!   Idle ───────────► Pressed ───────────────► Dragging ──┐ Move: Drag{dx,dy}
//!    ▲                  │  │                       ▲      │
//!    │       Up (tap)   │  │ contacts >= 2         └──────┘
//!    ├──────────────────┘  ▼
//!    │      Up        MultiTouch  (TwoFingerTap emitted on entry)
//!    └────────────────────┘
//! ```
//!
//! All timing decisions use the timestamps carried on the samples, never the
//! system clock, so the recognizer is fully deterministic under test.

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::pointer::{Phase, PointerSample, Timestamp};

/// A classified, discrete interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureEvent {
    /// A single stationary tap, confirmed after the double-tap window.
    Tap,
    /// Two taps in quick succession at roughly the same spot.
    DoubleTap,
    /// Two contacts touched the surface together.
    TwoFingerTap,
    /// The held contact moved by `(dx, dy)` pixels since the previous drag
    /// sample.
    Drag { dx: i32, dy: i32 },
}

/// Thresholds used to tell gestures apart.
///
/// The defaults follow the usual handheld platform values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Movement (pixels) a contact may make before a touch stops being a tap
    /// and becomes a drag.
    pub touch_slop_px: f32,
    /// Maximum gap between the first tap's release and the second tap's
    /// touch-down for the pair to count as a double-tap.
    pub double_tap_timeout_ms: u64,
    /// Maximum distance (pixels) between the two touch-downs of a double-tap.
    pub double_tap_slop_px: f32,
    /// A stationary press held this long is a long press, not a tap.
    pub long_press_timeout_ms: u64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            touch_slop_px: 8.0,
            double_tap_timeout_ms: 300,
            double_tap_slop_px: 100.0,
            long_press_timeout_ms: 500,
        }
    }
}

/// Per-session classification state.
#[derive(Debug, Clone, Copy)]
enum Session {
    /// No contact on the surface.
    Idle,
    /// One contact down, still inside the touch slop.
    Pressed {
        down_at: Timestamp,
        origin: (f32, f32),
        /// `true` when this press may complete a double-tap.
        second_tap: bool,
    },
    /// One contact down and moving.  `anchor` is the position already
    /// accounted for by emitted drag deltas.
    Dragging { anchor: (f32, f32) },
    /// A second contact joined; the rest of the session is ignored.
    MultiTouch,
}

/// A released tap waiting for the double-tap window to expire.
#[derive(Debug, Clone, Copy)]
struct PendingTap {
    released_at: Timestamp,
    origin: (f32, f32),
}

/// Turns pointer samples into [`GestureEvent`]s.
///
/// # Examples
///
/// ```rust
/// use remoteplay_core::{GestureEvent, GestureRecognizer, PointerSample, Timestamp};
///
/// let mut recognizer = GestureRecognizer::default();
/// assert!(recognizer.process(&PointerSample::down(0, 50.0, 50.0)).is_empty());
/// assert!(recognizer.process(&PointerSample::up(60, 50.0, 50.0)).is_empty());
///
/// // The tap is confirmed once the double-tap window has passed.
/// assert_eq!(recognizer.poll(Timestamp::from_millis(400)), Some(GestureEvent::Tap));
/// ```
#[derive(Debug, Clone)]
pub struct GestureRecognizer {
    config: GestureConfig,
    session: Session,
    pending_tap: Option<PendingTap>,
}

impl Default for GestureRecognizer {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

impl GestureRecognizer {
    /// Creates a recognizer with the given thresholds.
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            session: Session::Idle,
            pending_tap: None,
        }
    }

    /// Feeds one sample and returns the gestures it completed, in order.
    pub fn process(&mut self, sample: &PointerSample) -> Vec<GestureEvent> {
        let mut events = Vec::new();

        if let Some(tap) = self.confirm_expired_tap(sample.timestamp) {
            events.push(tap);
        }

        match sample.phase {
            Phase::Down => self.on_down(sample, &mut events),
            Phase::Move => self.on_move(sample, &mut events),
            Phase::Up => self.on_up(sample, &mut events),
        }

        events
    }

    /// Confirms a pending tap whose double-tap window has expired by `now`.
    ///
    /// The input surface only produces samples while a finger is down, so the
    /// owner of the recognizer must call this from a timer to release the
    /// last tap of a burst.
    pub fn poll(&mut self, now: Timestamp) -> Option<GestureEvent> {
        self.confirm_expired_tap(now)
    }

    /// When the pending tap (if any) will be confirmed, assuming no further
    /// touch arrives.
    pub fn tap_deadline(&self) -> Option<Timestamp> {
        match (self.session, self.pending_tap) {
            (Session::Idle, Some(pending)) => Some(
                pending
                    .released_at
                    .plus_millis(self.config.double_tap_timeout_ms),
            ),
            _ => None,
        }
    }

    /// Drops the current session and any pending tap without emitting.
    pub fn reset(&mut self) {
        self.session = Session::Idle;
        self.pending_tap = None;
    }

    fn confirm_expired_tap(&mut self, now: Timestamp) -> Option<GestureEvent> {
        // A session in progress decides the pending tap's fate itself.
        if !matches!(self.session, Session::Idle) {
            return None;
        }
        let pending = self.pending_tap?;
        if now.millis_since(pending.released_at) >= self.config.double_tap_timeout_ms {
            self.pending_tap = None;
            Some(GestureEvent::Tap)
        } else {
            None
        }
    }

    fn on_down(&mut self, sample: &PointerSample, events: &mut Vec<GestureEvent>) {
        if sample.contacts >= 2 {
            self.begin_multi_touch(events);
            return;
        }

        // Any pending tap here is still inside the time window; only the
        // spatial tolerance remains to be checked.
        let second_tap = match self.pending_tap {
            Some(pending)
                if sample.distance_to(pending.origin.0, pending.origin.1)
                    <= self.config.double_tap_slop_px =>
            {
                true
            }
            Some(_) => {
                self.pending_tap = None;
                events.push(GestureEvent::Tap);
                false
            }
            None => false,
        };

        self.session = Session::Pressed {
            down_at: sample.timestamp,
            origin: (sample.x, sample.y),
            second_tap,
        };
    }

    fn on_move(&mut self, sample: &PointerSample, events: &mut Vec<GestureEvent>) {
        match self.session {
            Session::Idle | Session::MultiTouch => {}
            _ if sample.contacts >= 2 => self.begin_multi_touch(events),
            Session::Pressed {
                origin, second_tap, ..
            } => {
                if sample.distance_to(origin.0, origin.1) > self.config.touch_slop_px {
                    if second_tap {
                        self.release_pending_tap(events);
                    }
                    // The first delta covers the movement made inside the slop.
                    self.session = Session::Dragging { anchor: origin };
                    self.emit_drag(sample, events);
                }
            }
            Session::Dragging { .. } => self.emit_drag(sample, events),
        }
    }

    fn on_up(&mut self, sample: &PointerSample, events: &mut Vec<GestureEvent>) {
        if sample.contacts >= 2
            && matches!(
                self.session,
                Session::Pressed { .. } | Session::Dragging { .. }
            )
        {
            self.begin_multi_touch(events);
        }

        let session = std::mem::replace(&mut self.session, Session::Idle);
        let Session::Pressed {
            down_at,
            origin,
            second_tap,
        } = session
        else {
            return;
        };

        let held_ms = sample.timestamp.millis_since(down_at);
        let stationary = sample.distance_to(origin.0, origin.1) <= self.config.touch_slop_px;
        let is_tap = stationary && held_ms < self.config.long_press_timeout_ms;

        match (is_tap, second_tap) {
            (true, true) => {
                self.pending_tap = None;
                events.push(GestureEvent::DoubleTap);
            }
            (true, false) => {
                self.pending_tap = Some(PendingTap {
                    released_at: sample.timestamp,
                    origin,
                });
            }
            (false, true) => self.release_pending_tap(events),
            (false, false) => {
                trace!(held_ms, stationary, "press released without a tap");
            }
        }
    }

    fn begin_multi_touch(&mut self, events: &mut Vec<GestureEvent>) {
        if self.pending_tap.take().is_some() {
            trace!("pending tap cancelled by multi-touch");
        }
        self.session = Session::MultiTouch;
        events.push(GestureEvent::TwoFingerTap);
    }

    fn release_pending_tap(&mut self, events: &mut Vec<GestureEvent>) {
        if self.pending_tap.take().is_some() {
            events.push(GestureEvent::Tap);
        }
    }

    fn emit_drag(&mut self, sample: &PointerSample, events: &mut Vec<GestureEvent>) {
        if let Session::Dragging { anchor } = &mut self.session {
            let dx = (sample.x - anchor.0).round();
            let dy = (sample.y - anchor.1).round();
            // Advance by the rounded amount; the sub-pixel residue carries over.
            anchor.0 += dx;
            anchor.1 += dy;
            events.push(GestureEvent::Drag {
                dx: dx as i32,
                dy: dy as i32,
            });
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
