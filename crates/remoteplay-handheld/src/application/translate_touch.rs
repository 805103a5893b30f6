//! TouchpadUseCase: pointer samples in, scheduled commands out.
//!
//! This is the producer side of the pipeline.  It runs synchronously on the
//! input context: recognise, encode, submit.  Nothing here waits for the
//! radio; [`SendScheduler::submit`] returns immediately.

use std::sync::Arc;

use remoteplay_core::{Command, GestureConfig, GestureRecognizer, PointerSample, Timestamp};
use tracing::debug;

use crate::application::send_commands::{SendScheduler, SubmitOutcome};

/// Turns touch input into protocol commands.
pub struct TouchpadUseCase {
    recognizer: GestureRecognizer,
    scheduler: Arc<SendScheduler>,
}

impl TouchpadUseCase {
    pub fn new(gesture: GestureConfig, scheduler: Arc<SendScheduler>) -> Self {
        Self {
            recognizer: GestureRecognizer::new(gesture),
            scheduler,
        }
    }

    /// Processes one sample and submits every command it produced.
    pub fn handle_sample(&mut self, sample: &PointerSample) -> Vec<SubmitOutcome> {
        self.recognizer
            .process(sample)
            .into_iter()
            .map(|event| self.submit(Command::from(event), sample.timestamp))
            .collect()
    }

    /// Releases a pending tap whose double-tap window has expired by `now`.
    ///
    /// Call this from a timer at [`next_deadline`](Self::next_deadline).
    pub fn tick(&mut self, now: Timestamp) -> Option<SubmitOutcome> {
        let event = self.recognizer.poll(now)?;
        Some(self.submit(Command::from(event), now))
    }

    /// When [`tick`](Self::tick) next has something to do.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.recognizer.tap_deadline()
    }

    /// Forgets any half-recognised gesture.
    pub fn reset(&mut self) {
        self.recognizer.reset();
    }

    fn submit(&self, command: Command, at: Timestamp) -> SubmitOutcome {
        let outcome = self.scheduler.submit(command, at);
        debug!(%command, %at, ?outcome, "gesture command");
        outcome
    }
}
