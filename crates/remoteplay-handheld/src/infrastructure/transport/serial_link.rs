//! `SerialLink`: the lifecycle-guarded connection to one peer.
//!
//! # Lifecycle
//!
//! ```text
//!                connect()            channel open
//! Disconnected ───────────► Connecting ─────────────► Connected
//!      ▲                        │                         │
//!      │ close()                │ open error / timeout    │ write error
//!      │                        ▼                         ▼
//!      └─────────────────────  Failed  ◄──────────────────┘
//! ```
//!
//! `close()` can be called from any state, any number of times, and leaves the
//! link `Disconnected`.
//!
//! # Concurrency (for beginners)
//!
//! The byte channel is the only shared mutable resource.  It sits behind an
//! async mutex so that at most one write uses it at a time, and it is *taken
//! out* of the mutex by whoever shuts it down, which guarantees the shutdown
//! happens exactly once.
//!
//! A write that hangs on a slow radio would keep the mutex locked forever and
//! stop `close()` from ever reaching the channel.  To prevent that, `close()`
//! first raises a `closed` flag on a `watch` channel.  Every in-flight connect
//! and write races its I/O against that flag with `tokio::select!`, gives up
//! with an error when the flag is raised, and releases the mutex.
//!
//! Each `SerialLink` is used for a single connect attempt.  Reconnecting
//! means building a fresh link, so commands can never leak from an old
//! session into a new one.

use std::future::Future;
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use remoteplay_core::{PeerHandle, SERIAL_PORT_SERVICE_ID};
use thiserror::Error;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::infrastructure::radio::{ByteChannel, RadioStack};

/// Connection state of a [`SerialLink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

/// Errors returned by [`SerialLink::write`].
#[derive(Debug, Error)]
pub enum LinkError {
    /// The link is not in the `Connected` state.
    #[error("link is not connected (state: {0:?})")]
    NotConnected(LinkState),

    /// The link was closed while the write was in flight.
    #[error("link closed during write")]
    Closed,

    /// The radio reported an I/O failure; the link is now `Failed`.
    #[error("write failed: {0}")]
    WriteFailed(#[source] io::Error),
}

/// Errors returned by a connect attempt.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// No usable peer: nothing bonded, no adapter, or the adapter is off.
    #[error("peer unavailable: {0}")]
    PeerUnavailable(String),

    /// The platform refused the radio operation for lack of authorization.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Opening the channel failed or timed out.
    #[error("connection to {peer} failed: {source}")]
    ConnectFailed {
        peer: String,
        #[source]
        source: io::Error,
    },

    /// A disconnect request interrupted the attempt.
    #[error("connect attempt cancelled")]
    Cancelled,

    /// `connect` was called twice on the same link.
    #[error("link to {0} has already been used")]
    LinkReused(String),
}

/// Parameters for opening a link.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Upper bound on opening the channel.
    pub connect_timeout: Duration,
    /// Service identifier of the peer's serial listener.
    pub service_id: Uuid,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            service_id: SERIAL_PORT_SERVICE_ID,
        }
    }
}

/// An exclusively owned serial connection to one peer.
pub struct SerialLink {
    peer: PeerHandle,
    state: Mutex<LinkState>,
    channel: AsyncMutex<Option<Box<dyn ByteChannel>>>,
    closed: watch::Sender<bool>,
}

impl SerialLink {
    /// Creates a `Disconnected` link targeting `peer`.
    pub fn new(peer: PeerHandle) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            peer,
            state: Mutex::new(LinkState::Disconnected),
            channel: AsyncMutex::new(None),
            closed,
        }
    }

    /// The peer this link targets.
    pub fn peer(&self) -> &PeerHandle {
        &self.peer
    }

    /// Current state.
    pub fn state(&self) -> LinkState {
        *self.lock_state()
    }

    /// Opens the channel.
    ///
    /// Cancels discovery, opens the stream to the peer's service and only
    /// then becomes `Connected`.  On failure the link becomes `Failed` and
    /// holds no channel.
    ///
    /// # Errors
    ///
    /// - [`ConnectError::PermissionDenied`] if the radio refused access.
    /// - [`ConnectError::ConnectFailed`] if the open failed or timed out.
    /// - [`ConnectError::Cancelled`] if [`close`](Self::close) ran first or
    ///   during the attempt.
    /// - [`ConnectError::LinkReused`] if this link was connected before.
    pub async fn connect(
        &self,
        radio: &dyn RadioStack,
        config: &LinkConfig,
    ) -> Result<(), ConnectError> {
        {
            let mut state = self.lock_state();
            if *self.closed.borrow() {
                return Err(ConnectError::Cancelled);
            }
            if *state != LinkState::Disconnected {
                return Err(ConnectError::LinkReused(self.peer.to_string()));
            }
            *state = LinkState::Connecting;
        }
        info!(peer = %self.peer, "connecting");

        radio.cancel_discovery();

        let open = tokio::time::timeout(
            config.connect_timeout,
            radio.open(&self.peer, config.service_id),
        );
        let opened = tokio::select! {
            result = open => result,
            _ = self.closed_signal() => {
                debug!(peer = %self.peer, "connect interrupted by close");
                return Err(ConnectError::Cancelled);
            }
        };

        let channel = match opened {
            Ok(Ok(channel)) => channel,
            Ok(Err(e)) => return Err(self.fail_connect(self.classify_open_error(e))),
            Err(_elapsed) => {
                let source = io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no answer within {:?}", config.connect_timeout),
                );
                return Err(self.fail_connect(ConnectError::ConnectFailed {
                    peer: self.peer.to_string(),
                    source,
                }));
            }
        };

        let mut slot = self.channel.lock().await;
        let installed = {
            let mut state = self.lock_state();
            if *self.closed.borrow() {
                Err(channel)
            } else {
                *slot = Some(channel);
                *state = LinkState::Connected;
                Ok(())
            }
        };
        drop(slot);

        match installed {
            Ok(()) => {
                info!(peer = %self.peer, "Connected to {}", self.peer.name());
                Ok(())
            }
            Err(mut orphan) => {
                // close() won the race; the fresh channel must not stay open.
                if let Err(e) = orphan.shutdown().await {
                    debug!(error = %e, "shutdown of cancelled channel failed");
                }
                Err(ConnectError::Cancelled)
            }
        }
    }

    /// Writes `bytes` to the peer.
    ///
    /// Fails fast unless the link is `Connected`.  Never retries.  An I/O
    /// failure shuts the channel down and moves the link to `Failed`.
    ///
    /// # Errors
    ///
    /// - [`LinkError::NotConnected`] when called in any other state.
    /// - [`LinkError::Closed`] when `close()` interrupted the write.
    /// - [`LinkError::WriteFailed`] when the radio reported an error.
    pub async fn write(&self, bytes: &[u8]) -> Result<(), LinkError> {
        let state = self.state();
        if state != LinkState::Connected {
            return Err(LinkError::NotConnected(state));
        }

        tokio::select! {
            biased;
            _ = self.closed_signal() => Err(LinkError::Closed),
            result = self.write_locked(bytes) => result,
        }
    }

    /// Closes the link.  Idempotent and safe while a write is in flight.
    pub async fn close(&self) {
        {
            let mut state = self.lock_state();
            self.closed.send_replace(true);
            *state = LinkState::Disconnected;
        }

        // In-flight writes observe the flag and release the lock.
        let channel = self.channel.lock().await.take();
        if let Some(mut channel) = channel {
            if let Err(e) = channel.shutdown().await {
                debug!(error = %e, "channel shutdown reported an error");
            }
            info!(peer = %self.peer, "Socket Closed");
        }
    }

    async fn write_locked(&self, bytes: &[u8]) -> Result<(), LinkError> {
        let mut slot = self.channel.lock().await;
        let channel = slot.as_mut().ok_or(LinkError::Closed)?;

        match channel.write_all(bytes).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(peer = %self.peer, error = %e, "write failed; link presumed dead");
                let dead = slot.take();
                drop(slot);
                {
                    let mut state = self.lock_state();
                    if *state == LinkState::Connected {
                        *state = LinkState::Failed;
                    }
                }
                if let Some(mut dead) = dead {
                    if let Err(err) = dead.shutdown().await {
                        debug!(error = %err, "shutdown of failed channel reported an error");
                    }
                }
                Err(LinkError::WriteFailed(e))
            }
        }
    }

    fn classify_open_error(&self, e: io::Error) -> ConnectError {
        if e.kind() == io::ErrorKind::PermissionDenied {
            ConnectError::PermissionDenied(e.to_string())
        } else {
            ConnectError::ConnectFailed {
                peer: self.peer.to_string(),
                source: e,
            }
        }
    }

    fn fail_connect(&self, error: ConnectError) -> ConnectError {
        let mut state = self.lock_state();
        if *self.closed.borrow() {
            return ConnectError::Cancelled;
        }
        *state = LinkState::Failed;
        warn!(peer = %self.peer, %error, "connect failed");
        error
    }

    /// Resolves once `close()` has been called.
    fn closed_signal(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut closed = self.closed.subscribe();
        async move {
            let _ = closed.wait_for(|is_closed| *is_closed).await;
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, LinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("peer", &self.peer)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::infrastructure::radio::mock::{MockRadio, RadioCall};

    fn desk() -> PeerHandle {
        PeerHandle::new("00:11:22:33:44:55", "Desk-01")
    }

    async fn connected(radio: &MockRadio) -> SerialLink {
        let link = SerialLink::new(desk());
        assert_ok!(link.connect(radio, &LinkConfig::default()).await);
        link
    }

    // ── connect ───────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_connect_cancels_discovery_before_opening_channel() {
        // Arrange
        let radio = MockRadio::new();
        let link = SerialLink::new(desk());

        // Act
        let result = link.connect(&radio, &LinkConfig::default()).await;

        // Assert
        assert_ok!(result);
        assert_eq!(link.state(), LinkState::Connected);
        assert_eq!(
            radio.calls(),
            vec![
                RadioCall::CancelDiscovery,
                RadioCall::Open {
                    address: "00:11:22:33:44:55".to_string(),
                    service_id: SERIAL_PORT_SERVICE_ID,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_connect_open_failure_leaves_link_failed() {
        let radio = MockRadio::new();
        radio.fail_next_open(io::ErrorKind::ConnectionRefused);
        let link = SerialLink::new(desk());

        let result = link.connect(&radio, &LinkConfig::default()).await;

        assert!(matches!(result, Err(ConnectError::ConnectFailed { .. })));
        assert_eq!(link.state(), LinkState::Failed);
        assert!(matches!(
            link.write(b"CLICK:LEFT\n").await,
            Err(LinkError::NotConnected(LinkState::Failed))
        ));
    }

    #[tokio::test]
    async fn test_connect_permission_denied_is_reported_distinctly() {
        let radio = MockRadio::new();
        radio.fail_next_open(io::ErrorKind::PermissionDenied);
        let link = SerialLink::new(desk());

        let result = link.connect(&radio, &LinkConfig::default()).await;

        assert!(matches!(result, Err(ConnectError::PermissionDenied(_))));
        assert_eq!(link.state(), LinkState::Failed);
    }

    #[tokio::test]
    async fn test_connect_times_out_when_open_never_completes() {
        // Arrange
        let radio = MockRadio::new();
        radio.stall_open(true);
        let link = SerialLink::new(desk());
        let config = LinkConfig {
            connect_timeout: Duration::from_millis(20),
            ..LinkConfig::default()
        };

        // Act
        let result = link.connect(&radio, &config).await;

        // Assert
        match result {
            Err(ConnectError::ConnectFailed { source, .. }) => {
                assert_eq!(source.kind(), io::ErrorKind::TimedOut);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(link.state(), LinkState::Failed);
    }

    #[tokio::test]
    async fn test_close_during_connect_cancels_attempt() {
        // Arrange
        let radio = MockRadio::new();
        radio.stall_open(true);
        let link = Arc::new(SerialLink::new(desk()));
        let connecting = {
            let link = Arc::clone(&link);
            let radio = radio.clone();
            tokio::spawn(async move { link.connect(&radio, &LinkConfig::default()).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(link.state(), LinkState::Connecting);

        // Act
        link.close().await;

        // Assert
        let result = connecting.await.unwrap();
        assert!(matches!(result, Err(ConnectError::Cancelled)));
        assert_eq!(link.state(), LinkState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_after_close_is_cancelled() {
        let radio = MockRadio::new();
        let link = SerialLink::new(desk());
        link.close().await;

        let result = link.connect(&radio, &LinkConfig::default()).await;

        assert!(matches!(result, Err(ConnectError::Cancelled)));
        assert_eq!(radio.open_count(), 0);
    }

    #[tokio::test]
    async fn test_second_connect_on_same_link_is_rejected() {
        let radio = MockRadio::new();
        let link = connected(&radio).await;

        let result = link.connect(&radio, &LinkConfig::default()).await;

        assert!(matches!(result, Err(ConnectError::LinkReused(_))));
        assert_eq!(link.state(), LinkState::Connected);
    }

    // ── write ─────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_write_before_connect_fails_fast() {
        let link = SerialLink::new(desk());

        let result = link.write(b"CLICK:LEFT\n").await;

        assert!(matches!(
            result,
            Err(LinkError::NotConnected(LinkState::Disconnected))
        ));
    }

    #[tokio::test]
    async fn test_writes_reach_channel_in_order() {
        let radio = MockRadio::new();
        let link = connected(&radio).await;

        for line in ["CLICK:LEFT\n", "MOVE:1,2\n", "CLICK:RIGHT\n"] {
            assert_ok!(link.write(line.as_bytes()).await);
        }

        assert_eq!(
            radio.written_lines(),
            vec!["CLICK:LEFT\n", "MOVE:1,2\n", "CLICK:RIGHT\n"]
        );
    }

    #[tokio::test]
    async fn test_write_failure_marks_link_failed_and_releases_channel() {
        // Arrange
        let radio = MockRadio::new();
        let link = connected(&radio).await;
        radio.fail_writes(true);

        // Act
        let first = link.write(b"MOVE:1,1\n").await;
        let second = link.write(b"MOVE:1,1\n").await;

        // Assert
        assert!(matches!(first, Err(LinkError::WriteFailed(_))));
        assert!(matches!(
            second,
            Err(LinkError::NotConnected(LinkState::Failed))
        ));
        assert_eq!(link.state(), LinkState::Failed);
        assert_eq!(radio.shutdown_count(), 1);
    }

    // ── close ─────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_close_twice_is_idempotent() {
        let radio = MockRadio::new();
        let link = connected(&radio).await;

        link.close().await;
        link.close().await;

        assert_eq!(link.state(), LinkState::Disconnected);
        assert_eq!(radio.shutdown_count(), 1);
        assert_err!(link.write(b"CLICK:LEFT\n").await);
    }

    #[tokio::test]
    async fn test_close_on_never_opened_link_is_harmless() {
        let link = SerialLink::new(desk());
        link.close().await;
        assert_eq!(link.state(), LinkState::Disconnected);
    }

    #[tokio::test]
    async fn test_close_interrupts_stalled_write() {
        // Arrange
        let radio = MockRadio::new();
        let link = Arc::new(connected(&radio).await);
        radio.stall_writes(true);
        let writer = {
            let link = Arc::clone(&link);
            tokio::spawn(async move { link.write(b"MOVE:5,5\n").await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Act
        link.close().await;

        // Assert
        let result = writer.await.unwrap();
        assert!(matches!(result, Err(LinkError::Closed)));
        assert_eq!(radio.shutdown_count(), 1);
        assert!(radio.written_lines().is_empty());
    }

    #[tokio::test]
    async fn test_close_after_write_failure_does_not_shut_down_twice() {
        let radio = MockRadio::new();
        let link = connected(&radio).await;
        radio.fail_writes(true);
        assert_err!(link.write(b"CLICK:LEFT\n").await);

        link.close().await;

        assert_eq!(link.state(), LinkState::Disconnected);
        assert_eq!(radio.shutdown_count(), 1);
    }
}
