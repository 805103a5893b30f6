//! Protocol module containing the line commands and the move rate limiter.

pub mod command;
pub mod throttle;

pub use command::{Command, MouseButton, ProtocolError, LINE_DELIMITER};
pub use throttle::{MoveThrottle, DEFAULT_MOVE_INTERVAL};
