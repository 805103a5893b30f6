//! Domain entities for RemotePlay.
//!
//! This module contains pure business logic with no infrastructure dependencies.
//!
//! # What lives here?
//!
//! - [`pointer`] – the raw input vocabulary: timestamps, phases and samples as
//!   produced by the touch surface.
//! - [`peer`] – the identity of a bonded remote computer.
//! - [`gesture`] – the recognizer that turns sample sequences into discrete
//!   gesture events.
//!
//! Nothing in this module knows about radios, sockets, or threads.  The
//! recognizer is driven entirely by the timestamps carried on the samples, so
//! tests can replay exact timings without sleeping.

pub mod gesture;
pub mod peer;
pub mod pointer;
