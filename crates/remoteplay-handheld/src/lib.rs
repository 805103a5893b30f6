//! remoteplay-handheld library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the handheld do? (for beginners)
//!
//! The handheld is the device in the user's hand.  Its touch surface acts as
//! a touchpad for a paired computer (the *peer*):
//!
//! 1. The user picks a bonded peer; the `ConnectionManager` opens a serial
//!    channel to it over the radio.
//! 2. Every touch sample goes through the gesture recognizer: taps become
//!    `CLICK:LEFT`, double-taps and two-finger taps become `CLICK:RIGHT`, and
//!    drags become `MOVE:dx,dy`.
//! 3. The `SendScheduler` drops moves that arrive faster than one per 30 ms
//!    and writes the rest, in order, from a background task.
//! 4. A failed write flips the status to `Failed("IOError")` and stops output
//!    until the user connects again.

/// Application layer: use cases for the handheld.
pub mod application;

/// Infrastructure layer: radio, serial link, peer list, config and input.
pub mod infrastructure;
