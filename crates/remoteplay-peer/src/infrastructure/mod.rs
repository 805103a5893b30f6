//! Infrastructure layer for the peer.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `remoteplay_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`network`** – TCP listener standing in for the serial service.  Accepts
//!   one handheld at a time and feeds every received line to the use case.
//!
//! - **`sink`** – `PointerSink` implementations: a logging sink that tracks a
//!   virtual cursor, and a recording sink for tests.

pub mod network;
pub mod sink;
