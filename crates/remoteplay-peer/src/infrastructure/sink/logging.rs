//! A pointer sink that tracks a virtual cursor and logs what it does.
//!
//! Useful on a desktop without input-injection rights, and as the default
//! sink of the `remoteplay-peer` binary.  The cursor starts in the middle of
//! a `width × height` screen and is clamped to its edges.

use std::sync::{Mutex, MutexGuard, PoisonError};

use remoteplay_core::MouseButton;
use tracing::{debug, info};

use crate::application::apply_commands::{PointerSink, SinkError};

/// Virtual screen with a cursor.
pub struct LoggingSink {
    width: i32,
    height: i32,
    cursor: Mutex<(i32, i32)>,
}

impl LoggingSink {
    /// Creates a sink for a `width × height` screen.  Zero dimensions are
    /// treated as one pixel.
    pub fn new(width: u32, height: u32) -> Self {
        let width = i32::try_from(width.max(1)).unwrap_or(i32::MAX);
        let height = i32::try_from(height.max(1)).unwrap_or(i32::MAX);
        Self {
            width,
            height,
            cursor: Mutex::new((width / 2, height / 2)),
        }
    }

    /// Current cursor position.
    pub fn position(&self) -> (i32, i32) {
        *self.lock_cursor()
    }

    fn lock_cursor(&self) -> MutexGuard<'_, (i32, i32)> {
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PointerSink for LoggingSink {
    fn click(&self, button: MouseButton) -> Result<(), SinkError> {
        let (x, y) = self.position();
        info!(?button, x, y, "click");
        Ok(())
    }

    fn move_by(&self, dx: i32, dy: i32) -> Result<(), SinkError> {
        let mut cursor = self.lock_cursor();
        cursor.0 = cursor.0.saturating_add(dx).clamp(0, self.width - 1);
        cursor.1 = cursor.1.saturating_add(dy).clamp(0, self.height - 1);
        debug!(dx, dy, x = cursor.0, y = cursor.1, "move");
        Ok(())
    }
}
