//! Input surface adapters.
//!
//! The binary has no touch screen, so pointer samples come from a recorded
//! text trace instead (see [`trace`]).

pub mod trace;
