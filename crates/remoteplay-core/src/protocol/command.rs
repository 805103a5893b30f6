//! Textual command lines exchanged between the handheld and the peer.
//!
//! Wire format (UTF-8, one command per line, `\n` terminated):
//! ```text
//! CLICK:LEFT
//! CLICK:RIGHT
//! MOVE:<dx>,<dy>        dx/dy are signed decimal integers, e.g. MOVE:-4,12
//! ```
//!
//! Lines carry no framing beyond the delimiter and no acknowledgement is ever
//! sent back.  The peer tolerates a trailing `\r` so that lines typed into a
//! terminal emulator are accepted too.

use std::fmt;

use thiserror::Error;

use crate::domain::gesture::GestureEvent;

/// Terminates every command on the wire.
pub const LINE_DELIMITER: char = '\n';

/// Errors that can occur while parsing a received command line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The line contained nothing but whitespace.
    #[error("empty command line")]
    Empty,

    /// The line did not start with a known verb or named an unknown button.
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    /// A `MOVE` line whose arguments are not two signed integers.
    #[error("malformed MOVE arguments: {0:?}")]
    MalformedMove(String),
}

/// Which pointer button a click presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
}

impl MouseButton {
    fn as_wire(self) -> &'static str {
        match self {
            MouseButton::Left => "LEFT",
            MouseButton::Right => "RIGHT",
        }
    }
}

/// One protocol command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Press and release a button at the current cursor position.
    Click(MouseButton),
    /// Move the cursor by a relative offset in pixels.
    Move { dx: i32, dy: i32 },
}

impl Command {
    /// Returns the full wire line, delimiter included.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use remoteplay_core::Command;
    ///
    /// assert_eq!(Command::Move { dx: 2, dy: -3 }.encode_line(), "MOVE:2,-3\n");
    /// ```
    pub fn encode_line(&self) -> String {
        let mut line = self.to_string();
        line.push(LINE_DELIMITER);
        line
    }

    /// `true` for commands subject to the move throttle.
    ///
    /// Clicks are never dropped; only relative moves are rate limited.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Command::Move { .. })
    }

    /// Parses a single received line.
    ///
    /// Surrounding whitespace (including the delimiter and a trailing `\r`)
    /// is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] when the line is empty, the verb is unknown,
    /// or the `MOVE` arguments do not parse as two `i32`s.
    pub fn parse_line(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ProtocolError::Empty);
        }

        match line.split_once(':') {
            Some(("CLICK", "LEFT")) => Ok(Command::Click(MouseButton::Left)),
            Some(("CLICK", "RIGHT")) => Ok(Command::Click(MouseButton::Right)),
            Some(("MOVE", args)) => parse_move_args(args),
            _ => Err(ProtocolError::UnknownCommand(line.to_string())),
        }
    }
}

fn parse_move_args(args: &str) -> Result<Command, ProtocolError> {
    let malformed = || ProtocolError::MalformedMove(args.to_string());
    let (dx, dy) = args.split_once(',').ok_or_else(malformed)?;
    let dx = dx.trim().parse::<i32>().map_err(|_| malformed())?;
    let dy = dy.trim().parse::<i32>().map_err(|_| malformed())?;
    Ok(Command::Move { dx, dy })
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Click(button) => write!(f, "CLICK:{}", button.as_wire()),
            Command::Move { dx, dy } => write!(f, "MOVE:{dx},{dy}"),
        }
    }
}

/// Gesture to command mapping used by the handheld.
///
/// | Gesture          | Command       |
/// |------------------|---------------|
/// | `Tap`            | `CLICK:LEFT`  |
/// | `DoubleTap`      | `CLICK:RIGHT` |
/// | `TwoFingerTap`   | `CLICK:RIGHT` |
/// | `Drag{dx,dy}`    | `MOVE:dx,dy`  |
impl From<GestureEvent> for Command {
    fn from(event: GestureEvent) -> Self {
        match event {
            GestureEvent::Tap => Command::Click(MouseButton::Left),
            GestureEvent::DoubleTap | GestureEvent::TwoFingerTap => {
                Command::Click(MouseButton::Right)
            }
            GestureEvent::Drag { dx, dy } => Command::Move { dx, dy },
        }
    }
}
