//! Mock radio stack for testing.
//!
//! # Why a mock radio?
//!
//! A real radio needs paired hardware and cannot be observed from test code.
//! [`MockRadio`] keeps everything in memory: every call is appended to a log
//! and every byte written through an opened channel is captured, so tests can
//! assert exactly what would have gone over the air and in what order.
//!
//! Failures and stalls are injected through the control methods
//! (`fail_next_open`, `fail_writes`, `stall_open`, `stall_writes`).  A stalled
//! operation never completes on its own, which lets tests check that closing
//! the link interrupts it.  Stalled writes can also be released with
//! `stall_writes(false)`; they then succeed or fail according to
//! `fail_writes`, so a test decides exactly when a write in flight fails.
//!
//! Clones share state, so a test can keep one handle for assertions while the
//! code under test owns another.

use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use remoteplay_core::PeerHandle;
use tokio::sync::Notify;
use uuid::Uuid;

use super::{ByteChannel, RadioStack};

/// One recorded interaction with the radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioCall {
    CancelDiscovery,
    Open { address: String, service_id: Uuid },
    Shutdown,
}

#[derive(Default)]
struct State {
    calls: Vec<RadioCall>,
    written: Vec<u8>,
    fail_next_open: Option<io::ErrorKind>,
    fail_writes: bool,
    stall_open: bool,
    stall_writes: bool,
}

/// A radio that records calls instead of touching hardware.
#[derive(Clone, Default)]
pub struct MockRadio {
    state: Arc<Mutex<State>>,
    released: Arc<Notify>,
}

impl MockRadio {
    /// Creates a radio whose opens and writes succeed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `open` fail with `kind`.
    pub fn fail_next_open(&self, kind: io::ErrorKind) {
        self.state.lock().expect("lock poisoned").fail_next_open = Some(kind);
    }

    /// Makes every subsequent write fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().expect("lock poisoned").fail_writes = fail;
    }

    /// Makes subsequent opens hang until cancelled.
    pub fn stall_open(&self, stall: bool) {
        self.state.lock().expect("lock poisoned").stall_open = stall;
    }

    /// Makes subsequent writes hang until cancelled.  Turning the stall off
    /// also releases writes already waiting.
    pub fn stall_writes(&self, stall: bool) {
        self.state.lock().expect("lock poisoned").stall_writes = stall;
        if !stall {
            self.released.notify_waiters();
        }
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<RadioCall> {
        self.state.lock().expect("lock poisoned").calls.clone()
    }

    /// All bytes written so far, split into lines (delimiter included).
    pub fn written_lines(&self) -> Vec<String> {
        let state = self.state.lock().expect("lock poisoned");
        String::from_utf8_lossy(&state.written)
            .split_inclusive('\n')
            .map(str::to_string)
            .collect()
    }

    /// Number of channel shutdowns observed.
    pub fn shutdown_count(&self) -> usize {
        self.count(|c| matches!(c, RadioCall::Shutdown))
    }

    /// Number of open attempts observed.
    pub fn open_count(&self) -> usize {
        self.count(|c| matches!(c, RadioCall::Open { .. }))
    }

    fn count(&self, pred: impl Fn(&RadioCall) -> bool) -> usize {
        self.state
            .lock()
            .expect("lock poisoned")
            .calls
            .iter()
            .filter(|c| pred(c))
            .count()
    }
}

#[async_trait]
impl RadioStack for MockRadio {
    fn cancel_discovery(&self) {
        self.state
            .lock()
            .expect("lock poisoned")
            .calls
            .push(RadioCall::CancelDiscovery);
    }

    async fn open(&self, peer: &PeerHandle, service_id: Uuid) -> io::Result<Box<dyn ByteChannel>> {
        let (fail, stall) = {
            let mut state = self.state.lock().expect("lock poisoned");
            state.calls.push(RadioCall::Open {
                address: peer.address().to_string(),
                service_id,
            });
            (state.fail_next_open.take(), state.stall_open)
        };

        if stall {
            std::future::pending::<()>().await;
        }
        if let Some(kind) = fail {
            return Err(io::Error::new(kind, "mock open failure"));
        }
        Ok(Box::new(MockChannel {
            state: Arc::clone(&self.state),
            released: Arc::clone(&self.released),
        }))
    }
}

/// Channel handed out by [`MockRadio::open`].
pub struct MockChannel {
    state: Arc<Mutex<State>>,
    released: Arc<Notify>,
}

#[async_trait]
impl ByteChannel for MockChannel {
    async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let fail = loop {
            // Register before reading the flag so a release in between is not missed.
            let released = self.released.notified();
            let (fail, stall) = {
                let state = self.state.lock().expect("lock poisoned");
                (state.fail_writes, state.stall_writes)
            };
            if !stall {
                break fail;
            }
            released.await;
        };
        if fail {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock write failure"));
        }
        self.state
            .lock()
            .expect("lock poisoned")
            .written
            .extend_from_slice(bytes);
        Ok(())
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        self.state
            .lock()
            .expect("lock poisoned")
            .calls
            .push(RadioCall::Shutdown);
        Ok(())
    }
}
