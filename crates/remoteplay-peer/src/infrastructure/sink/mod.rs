//! Pointer sinks.

pub mod logging;
pub mod mock;
