//! # remoteplay-core
//!
//! Shared library for RemotePlay containing the pointer/gesture domain and the
//! textual command protocol spoken between the handheld and the peer.
//!
//! This crate is used by both the handheld and the peer applications.
//! It has zero dependencies on OS APIs, radio stacks, UI frameworks, or async
//! runtimes, so everything in it can be driven from plain unit tests.
//!
//! # Architecture overview (for beginners)
//!
//! RemotePlay turns a phone-sized touch surface into a wireless touchpad for a
//! paired computer (the "peer").  Finger movements on the handheld become short
//! text lines such as `MOVE:2,3` that travel over a serial radio link and are
//! replayed as pointer input on the peer.
//!
//! - **`domain`** – Raw pointer samples, bonded peer handles, and the
//!   [`GestureRecognizer`] state machine that classifies samples into taps,
//!   double-taps, two-finger taps and drags.
//!
//! - **`protocol`** – The newline-delimited wire format.  [`Command`] maps
//!   gesture events to protocol lines and parses them back on the peer, and
//!   [`MoveThrottle`] bounds the rate of `MOVE` lines.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `remoteplay_core::Command` instead of `remoteplay_core::protocol::command::Command`.
pub use domain::gesture::{GestureConfig, GestureEvent, GestureRecognizer};
pub use domain::peer::{PeerHandle, SERIAL_PORT_SERVICE_ID};
pub use domain::pointer::{Phase, PointerSample, Timestamp};
pub use protocol::command::{Command, MouseButton, ProtocolError};
pub use protocol::throttle::MoveThrottle;
