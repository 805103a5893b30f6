//! remoteplay-peer library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the peer do? (for beginners)
//!
//! The *peer* is the computer whose pointer the handheld controls.  It
//! listens for one handheld at a time, reads newline-delimited command lines
//! (`CLICK:LEFT`, `CLICK:RIGHT`, `MOVE:dx,dy`) and replays each one on a
//! [`PointerSink`](application::apply_commands::PointerSink).
//!
//! Nothing is ever sent back: the protocol has no acknowledgements, so a
//! line that fails to parse is logged and skipped.

/// Application layer: applying decoded commands to a pointer sink.
pub mod application;

/// Infrastructure layer: the stream listener and pointer sinks.
pub mod infrastructure;
