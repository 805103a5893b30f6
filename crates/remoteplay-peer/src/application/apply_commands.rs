//! ApplyCommandsUseCase: turns received command lines into pointer input.
//!
//! This use case sits at the application layer and delegates to a
//! [`PointerSink`] trait object for the actual cursor movement.  The sink
//! implementations live in the infrastructure layer.

use std::sync::Arc;

use remoteplay_core::{Command, MouseButton, ProtocolError};
use thiserror::Error;
use tracing::trace;

/// Error type for pointer sink operations.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("platform error: {0}")]
    Platform(String),
}

/// Why a received line was not applied.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// The line is not a valid command.
    #[error("malformed line: {0}")]
    Protocol(#[from] ProtocolError),
    /// The command parsed but the sink refused it.
    #[error("pointer sink failed: {0}")]
    Sink(#[from] SinkError),
}

/// Something that can move and click a pointer.
#[cfg_attr(test, mockall::automock)]
pub trait PointerSink: Send + Sync {
    /// Presses and releases `button` at the current position.
    fn click(&self, button: MouseButton) -> Result<(), SinkError>;

    /// Moves the pointer by a relative offset.
    fn move_by(&self, dx: i32, dy: i32) -> Result<(), SinkError>;
}

/// Counters kept by [`ApplyCommandsUseCase`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    /// Commands handed to the sink successfully.
    pub applied: u64,
    /// Lines skipped because they did not parse.
    pub malformed: u64,
    /// Commands the sink failed to apply.
    pub failed: u64,
}

/// The Apply Commands use case.
pub struct ApplyCommandsUseCase {
    sink: Arc<dyn PointerSink>,
    stats: ApplyStats,
}

impl ApplyCommandsUseCase {
    pub fn new(sink: Arc<dyn PointerSink>) -> Self {
        Self {
            sink,
            stats: ApplyStats::default(),
        }
    }

    /// Parses `line` and applies the command it carries.
    ///
    /// Blank lines are reported as [`ProtocolError::Empty`] but not counted
    /// as malformed.
    ///
    /// # Errors
    ///
    /// - [`ApplyError::Protocol`] if the line does not parse.
    /// - [`ApplyError::Sink`] if the sink failed.
    pub fn handle_line(&mut self, line: &str) -> Result<Command, ApplyError> {
        let command = match Command::parse_line(line) {
            Ok(command) => command,
            Err(ProtocolError::Empty) => return Err(ProtocolError::Empty.into()),
            Err(e) => {
                self.stats.malformed += 1;
                return Err(e.into());
            }
        };
        self.apply(command)?;
        Ok(command)
    }

    /// Counts a line that was dropped before it could be parsed.
    pub fn reject_line(&mut self) {
        self.stats.malformed += 1;
    }

    /// Applies an already decoded command.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the sink failed.
    pub fn apply(&mut self, command: Command) -> Result<(), SinkError> {
        let result = match command {
            Command::Click(button) => self.sink.click(button),
            Command::Move { dx, dy } => self.sink.move_by(dx, dy),
        };
        match &result {
            Ok(()) => {
                self.stats.applied += 1;
                trace!(%command, "applied");
            }
            Err(_) => self.stats.failed += 1,
        }
        result
    }

    pub fn stats(&self) -> ApplyStats {
        self.stats
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
