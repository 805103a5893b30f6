//! Recording pointer sink for tests.
//!
//! # Why a recording sink?
//!
//! A real sink would move the cursor of the machine running the tests.
//! `RecordingSink` pushes every call into a `Mutex<Vec<...>>` instead, so
//! assertions can inspect exactly what was applied and in what order.
//!
//! Set `should_fail = true` to make every call return
//! [`SinkError::Platform`] and exercise the error paths of callers.

use std::sync::Mutex;

use remoteplay_core::MouseButton;

use crate::application::apply_commands::{PointerSink, SinkError};

/// A sink that records calls instead of moving a pointer.
#[derive(Default)]
pub struct RecordingSink {
    /// Every button passed to `click`, in order.
    pub clicks: Mutex<Vec<MouseButton>>,
    /// Every (dx, dy) passed to `move_by`, in order.
    pub moves: Mutex<Vec<(i32, i32)>>,
    /// When `true`, every method returns `SinkError::Platform`.
    pub should_fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every call fails.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }
}

impl PointerSink for RecordingSink {
    fn click(&self, button: MouseButton) -> Result<(), SinkError> {
        if self.should_fail {
            return Err(SinkError::Platform("mock failure".into()));
        }
        self.clicks.lock().expect("lock poisoned").push(button);
        Ok(())
    }

    fn move_by(&self, dx: i32, dy: i32) -> Result<(), SinkError> {
        if self.should_fail {
            return Err(SinkError::Platform("mock failure".into()));
        }
        self.moves.lock().expect("lock poisoned").push((dx, dy));
        Ok(())
    }
}
