//! ConnectionManager: bridges peer selection to the serial link.
//!
//! The manager owns at most one [`SerialLink`] at a time.  It drives the
//! link's connect and close, turns the outcome into a [`ConnectionStatus`],
//! and switches the [`SendScheduler`]'s output on and off.
//!
//! # Attempt numbers
//!
//! Connecting takes a while, and the user may disconnect in the meantime.
//! Every connect and disconnect request bumps an attempt counter.  When a
//! connect finishes it compares its own attempt number with the current one;
//! if they differ a disconnect happened, and the result is thrown away
//! instead of enabling output on a link nobody wants any more.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use remoteplay_core::PeerHandle;
use tracing::{debug, info, warn};

use crate::application::send_commands::SendScheduler;
use crate::application::status::{
    ConnectionStatus, StatusBoard, CONNECT_FAILURE_REASON, NO_PAIRED_DEVICES_REASON,
};
use crate::infrastructure::discovery::{DiscoveryError, PeerDirectory};
use crate::infrastructure::radio::RadioStack;
use crate::infrastructure::transport::{ConnectError, LinkConfig, LinkState, SerialLink};

/// Result of a successful [`ConnectionManager::request_connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// The link is now connected and output is enabled.
    Connected,
    /// Another attempt or session was already active; nothing was done.
    AlreadyActive,
}

#[derive(Default)]
struct Slot {
    attempt: u64,
    connecting: bool,
    link: Option<Arc<SerialLink>>,
}

impl Slot {
    fn is_active(&self) -> bool {
        self.connecting
            || self
                .link
                .as_ref()
                .is_some_and(|link| link.state() == LinkState::Connected)
    }
}

/// Orchestrates the connection lifecycle.
pub struct ConnectionManager {
    radio: Arc<dyn RadioStack>,
    directory: Arc<dyn PeerDirectory>,
    scheduler: Arc<SendScheduler>,
    status: Arc<StatusBoard>,
    link_config: LinkConfig,
    slot: Mutex<Slot>,
}

impl ConnectionManager {
    pub fn new(
        radio: Arc<dyn RadioStack>,
        directory: Arc<dyn PeerDirectory>,
        scheduler: Arc<SendScheduler>,
        status: Arc<StatusBoard>,
        link_config: LinkConfig,
    ) -> Self {
        Self {
            radio,
            directory,
            scheduler,
            status,
            link_config,
            slot: Mutex::new(Slot::default()),
        }
    }

    /// The current user-visible status.
    pub fn status(&self) -> ConnectionStatus {
        self.status.current()
    }

    /// Follows status changes.
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// The peer of the live session, if connected.
    pub fn active_peer(&self) -> Option<PeerHandle> {
        self.lock_slot()
            .link
            .as_ref()
            .filter(|link| link.state() == LinkState::Connected)
            .map(|link| link.peer().clone())
    }

    /// Lists bonded peers.
    ///
    /// # Errors
    ///
    /// Forwards the directory's [`DiscoveryError`].
    pub fn bonded_peers(&self) -> Result<Vec<PeerHandle>, DiscoveryError> {
        self.directory.bonded_peers()
    }

    /// Connects to `peer`.
    ///
    /// Does nothing while another attempt is in progress or a session is
    /// connected; disconnect first to switch peers.  A previous failed link is
    /// closed before the new attempt starts.
    ///
    /// # Errors
    ///
    /// Returns the link's [`ConnectError`].  Every error except
    /// [`ConnectError::Cancelled`] is also published as
    /// [`ConnectionStatus::Failed`].
    pub async fn request_connect(&self, peer: PeerHandle) -> Result<ConnectOutcome, ConnectError> {
        let (link, attempt, stale) = {
            let mut slot = self.lock_slot();
            if slot.is_active() {
                debug!(peer = %peer, "connect request ignored; a session is already active");
                return Ok(ConnectOutcome::AlreadyActive);
            }
            slot.attempt += 1;
            slot.connecting = true;
            let stale = slot.link.take();
            let link = Arc::new(SerialLink::new(peer.clone()));
            slot.link = Some(Arc::clone(&link));
            // Output to the previous link stops here, so its late write
            // failures cannot replace this status.
            self.scheduler.disable(ConnectionStatus::Connecting {
                peer: peer.name().to_string(),
            });
            (link, slot.attempt, stale)
        };

        if let Some(stale) = stale {
            stale.close().await;
        }

        let result = link.connect(self.radio.as_ref(), &self.link_config).await;

        let superseded = {
            let mut slot = self.lock_slot();
            if slot.attempt != attempt {
                true
            } else {
                slot.connecting = false;
                match &result {
                    Ok(()) => {
                        self.scheduler.enable(
                            Arc::clone(&link),
                            ConnectionStatus::Connected {
                                peer: peer.name().to_string(),
                            },
                        );
                    }
                    Err(e) => {
                        if let Some(reason) = failure_reason(e) {
                            self.status.publish(ConnectionStatus::Failed(reason));
                        }
                    }
                }
                false
            }
        };

        if superseded {
            // A disconnect arrived while the attempt was in flight.
            link.close().await;
            return Err(ConnectError::Cancelled);
        }

        result.map(|()| {
            info!(peer = %peer, "Connected to {}", peer.name());
            ConnectOutcome::Connected
        })
    }

    /// Resolves `name` (or an address) in the bonded-peer list and connects.
    ///
    /// # Errors
    ///
    /// - [`ConnectError::PeerUnavailable`] when the adapter is missing or off,
    ///   no peer is bonded, or none matches `name`.
    /// - [`ConnectError::PermissionDenied`] when listing peers was refused.
    /// - Anything [`request_connect`](Self::request_connect) returns.
    pub async fn request_connect_by_name(&self, name: &str) -> Result<ConnectOutcome, ConnectError> {
        if self.lock_slot().is_active() {
            return Ok(ConnectOutcome::AlreadyActive);
        }

        let peer = match self.resolve_peer(name) {
            Ok(peer) => peer,
            Err(e) => {
                warn!(name, error = %e, "cannot resolve peer");
                self.publish_resolve_failure(&e);
                return Err(e);
            }
        };
        self.request_connect(peer).await
    }

    /// Closes the link, discards queued commands and returns to `Idle`.
    ///
    /// Effective while a connect or write is in flight: both fail instead of
    /// completing.
    pub async fn request_disconnect(&self) {
        let link = {
            let mut slot = self.lock_slot();
            slot.attempt += 1;
            slot.connecting = false;
            self.scheduler.disable(ConnectionStatus::Idle);
            slot.link.take()
        };

        match link {
            Some(link) => link.close().await,
            None => debug!("disconnect requested with no link"),
        }
    }

    /// Reports a lookup failure unless another attempt became active while
    /// the directory was being read.
    fn publish_resolve_failure(&self, error: &ConnectError) {
        let slot = self.lock_slot();
        if slot.is_active() {
            debug!("another attempt is active; lookup failure not published");
            return;
        }
        if let Some(reason) = failure_reason(error) {
            self.status.publish(ConnectionStatus::Failed(reason));
        }
    }

    fn resolve_peer(&self, name: &str) -> Result<PeerHandle, ConnectError> {
        let peers = self.directory.bonded_peers().map_err(|e| match e {
            DiscoveryError::PermissionDenied => ConnectError::PermissionDenied(e.to_string()),
            DiscoveryError::NoAdapter | DiscoveryError::AdapterDisabled => {
                ConnectError::PeerUnavailable(e.to_string())
            }
        })?;

        if peers.is_empty() {
            return Err(ConnectError::PeerUnavailable(
                NO_PAIRED_DEVICES_REASON.to_string(),
            ));
        }

        peers
            .into_iter()
            .find(|p| p.name() == name || p.address() == name)
            .ok_or_else(|| ConnectError::PeerUnavailable(format!("No paired device named {name}")))
    }

    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The status reason shown for a failed attempt, or `None` when the failure
/// should not change the status.
fn failure_reason(error: &ConnectError) -> Option<String> {
    match error {
        ConnectError::PeerUnavailable(reason) => Some(reason.clone()),
        ConnectError::PermissionDenied(_) => Some(error.to_string()),
        ConnectError::ConnectFailed { .. } => Some(CONNECT_FAILURE_REASON.to_string()),
        ConnectError::Cancelled | ConnectError::LinkReused(_) => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::io;
    use std::time::Duration;

    use remoteplay_core::{Command, MouseButton, Timestamp};
    use tokio_test::assert_ok;

    use super::*;
    use crate::application::send_commands::{SchedulerConfig, SubmitOutcome};
    use crate::infrastructure::discovery::{MockPeerDirectory, StaticPeerDirectory};
    use crate::infrastructure::radio::mock::MockRadio;

    fn desk() -> PeerHandle {
        PeerHandle::new("00:11:22:33:44:55", "Desk-01")
    }

    struct Fixture {
        radio: MockRadio,
        status: Arc<StatusBoard>,
        scheduler: Arc<SendScheduler>,
        manager: ConnectionManager,
    }

    fn fixture_with_directory(directory: Arc<dyn PeerDirectory>) -> Fixture {
        let radio = MockRadio::new();
        let status = Arc::new(StatusBoard::new());
        let scheduler = Arc::new(SendScheduler::spawn(
            SchedulerConfig::default(),
            Arc::clone(&status),
        ));
        let manager = ConnectionManager::new(
            Arc::new(radio.clone()),
            directory,
            Arc::clone(&scheduler),
            Arc::clone(&status),
            LinkConfig::default(),
        );
        Fixture {
            radio,
            status,
            scheduler,
            manager,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_directory(Arc::new(StaticPeerDirectory::new(vec![desk()])))
    }

    // ── request_connect ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_request_connect_success_publishes_connected_and_enables_output() {
        // Arrange
        let f = fixture();

        // Act
        let outcome = f.manager.request_connect(desk()).await;

        // Assert
        assert_eq!(assert_ok!(outcome), ConnectOutcome::Connected);
        assert_eq!(
            f.manager.status(),
            ConnectionStatus::Connected {
                peer: "Desk-01".to_string()
            }
        );
        assert!(f.scheduler.is_enabled());
        assert_eq!(f.manager.active_peer(), Some(desk()));
    }

    #[tokio::test]
    async fn test_request_connect_while_connected_is_noop() {
        let f = fixture();
        assert_ok!(f.manager.request_connect(desk()).await);

        let second = f
            .manager
            .request_connect(PeerHandle::new("AA:BB:CC:DD:EE:FF", "Other"))
            .await;

        assert_eq!(assert_ok!(second), ConnectOutcome::AlreadyActive);
        assert_eq!(f.radio.open_count(), 1);
        assert_eq!(f.manager.active_peer(), Some(desk()));
    }

    #[tokio::test]
    async fn test_request_connect_while_connecting_is_noop() {
        // Arrange
        let f = Arc::new(fixture());
        f.radio.stall_open(true);
        let first = {
            let f = Arc::clone(&f);
            tokio::spawn(async move { f.manager.request_connect(desk()).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Act
        let second = f.manager.request_connect(desk()).await;

        // Assert
        assert_eq!(assert_ok!(second), ConnectOutcome::AlreadyActive);
        assert_eq!(f.radio.open_count(), 1);
        f.manager.request_disconnect().await;
        assert!(matches!(first.await.unwrap(), Err(ConnectError::Cancelled)));
    }

    #[tokio::test]
    async fn test_request_connect_failure_publishes_connection_failed() {
        let f = fixture();
        f.radio.fail_next_open(io::ErrorKind::ConnectionRefused);

        let result = f.manager.request_connect(desk()).await;

        assert!(matches!(result, Err(ConnectError::ConnectFailed { .. })));
        assert_eq!(
            f.manager.status(),
            ConnectionStatus::Failed("Connection failed!".to_string())
        );
        assert!(!f.scheduler.is_enabled());
    }

    #[tokio::test]
    async fn test_request_connect_after_failure_retries_with_fresh_link() {
        let f = fixture();
        f.radio.fail_next_open(io::ErrorKind::ConnectionRefused);
        let _ = f.manager.request_connect(desk()).await;

        let retry = f.manager.request_connect(desk()).await;

        assert_eq!(assert_ok!(retry), ConnectOutcome::Connected);
        assert_eq!(f.radio.open_count(), 2);
    }

    #[tokio::test]
    async fn test_disconnect_during_connect_cancels_and_returns_to_idle() {
        // Arrange
        let f = Arc::new(fixture());
        f.radio.stall_open(true);
        let attempt = {
            let f = Arc::clone(&f);
            tokio::spawn(async move { f.manager.request_connect(desk()).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Act
        f.manager.request_disconnect().await;

        // Assert
        assert!(matches!(attempt.await.unwrap(), Err(ConnectError::Cancelled)));
        assert_eq!(f.manager.status(), ConnectionStatus::Idle);
        assert!(!f.scheduler.is_enabled());
    }

    // ── request_disconnect ────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_request_disconnect_closes_link_and_disables_output() {
        // Arrange
        let f = fixture();
        assert_ok!(f.manager.request_connect(desk()).await);

        // Act
        f.manager.request_disconnect().await;

        // Assert
        assert_eq!(f.status.current(), ConnectionStatus::Idle);
        assert_eq!(f.radio.shutdown_count(), 1);
        assert_eq!(
            f.scheduler
                .submit(Command::Click(MouseButton::Left), Timestamp::from_millis(0)),
            SubmitOutcome::Discarded
        );
        assert_eq!(f.manager.active_peer(), None);
    }

    #[tokio::test]
    async fn test_request_disconnect_twice_is_harmless() {
        let f = fixture();
        assert_ok!(f.manager.request_connect(desk()).await);

        f.manager.request_disconnect().await;
        f.manager.request_disconnect().await;

        assert_eq!(f.manager.status(), ConnectionStatus::Idle);
        assert_eq!(f.radio.shutdown_count(), 1);
    }

    // ── request_connect_by_name ───────────────────────────────────────────────

    #[tokio::test]
    async fn test_connect_by_name_resolves_bonded_peer() {
        let f = fixture();

        let outcome = f.manager.request_connect_by_name("Desk-01").await;

        assert_eq!(assert_ok!(outcome), ConnectOutcome::Connected);
        assert_eq!(f.manager.active_peer(), Some(desk()));
    }

    #[tokio::test]
    async fn test_connect_by_name_with_no_bonded_peers_reports_peer_unavailable() {
        // Arrange
        let mut directory = MockPeerDirectory::new();
        directory
            .expect_bonded_peers()
            .times(1)
            .returning(|| Ok(Vec::new()));
        let f = fixture_with_directory(Arc::new(directory));

        // Act
        let result = f.manager.request_connect_by_name("Desk-01").await;

        // Assert
        assert!(matches!(result, Err(ConnectError::PeerUnavailable(_))));
        assert_eq!(
            f.manager.status(),
            ConnectionStatus::Failed("No paired Bluetooth devices found".to_string())
        );
        assert_eq!(f.radio.open_count(), 0);
    }

    #[tokio::test]
    async fn test_connect_by_name_with_disabled_adapter_reports_reason() {
        let mut directory = MockPeerDirectory::new();
        directory
            .expect_bonded_peers()
            .returning(|| Err(DiscoveryError::AdapterDisabled));
        let f = fixture_with_directory(Arc::new(directory));

        let result = f.manager.request_connect_by_name("Desk-01").await;

        assert!(matches!(result, Err(ConnectError::PeerUnavailable(_))));
        assert_eq!(
            f.manager.status(),
            ConnectionStatus::Failed("Bluetooth is not enabled".to_string())
        );
    }

    #[tokio::test]
    async fn test_connect_by_name_with_denied_listing_reports_permission_denied() {
        let mut directory = MockPeerDirectory::new();
        directory
            .expect_bonded_peers()
            .returning(|| Err(DiscoveryError::PermissionDenied));
        let f = fixture_with_directory(Arc::new(directory));

        let result = f.manager.request_connect_by_name("Desk-01").await;

        assert!(matches!(result, Err(ConnectError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_connect_by_unknown_name_reports_peer_unavailable() {
        let f = fixture();

        let result = f.manager.request_connect_by_name("Kitchen").await;

        assert!(matches!(result, Err(ConnectError::PeerUnavailable(_))));
        assert_eq!(f.radio.open_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_connect_by_name_failure_keeps_status_of_concurrent_attempt() {
        // Arrange – the lookup for "Kitchen" is held until another attempt is connecting.
        let (entered_tx, entered_rx) = std::sync::mpsc::channel::<()>();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let mut directory = MockPeerDirectory::new();
        directory.expect_bonded_peers().times(1).returning(move || {
            let _ = entered_tx.send(());
            let _ = release_rx.recv();
            Ok(vec![desk()])
        });
        let f = Arc::new(fixture_with_directory(Arc::new(directory)));
        f.radio.stall_open(true);

        let by_name = {
            let f = Arc::clone(&f);
            tokio::spawn(async move { f.manager.request_connect_by_name("Kitchen").await })
        };
        tokio::task::spawn_blocking(move || entered_rx.recv())
            .await
            .unwrap()
            .expect("lookup started");
        let direct = {
            let f = Arc::clone(&f);
            tokio::spawn(async move { f.manager.request_connect(desk()).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Act
        release_tx.send(()).expect("lookup waiting");
        let result = by_name.await.unwrap();

        // Assert
        assert!(matches!(result, Err(ConnectError::PeerUnavailable(_))));
        assert_eq!(
            f.manager.status(),
            ConnectionStatus::Connecting {
                peer: "Desk-01".to_string()
            }
        );
        f.manager.request_disconnect().await;
        assert!(matches!(direct.await.unwrap(), Err(ConnectError::Cancelled)));
    }
}
