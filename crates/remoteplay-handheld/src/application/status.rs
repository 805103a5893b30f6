//! Connection status broadcast.
//!
//! [`StatusBoard`] holds the one user-visible connection status and lets any
//! number of observers follow it through a `tokio::sync::watch` channel.  A
//! watch channel only keeps the latest value, which is exactly what a status
//! indicator needs: a slow observer skips intermediate states instead of
//! queueing them.

use std::fmt;

use tokio::sync::watch;
use tracing::info;

/// Reason published when a write on an established link fails.
pub const WRITE_FAILURE_REASON: &str = "IOError";

/// Reason published when opening the channel fails or times out.
pub const CONNECT_FAILURE_REASON: &str = "Connection failed!";

/// Reason published when no bonded peer exists.
pub const NO_PAIRED_DEVICES_REASON: &str = "No paired Bluetooth devices found";

/// User-visible connection status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Idle,
    Connecting { peer: String },
    Connected { peer: String },
    Failed(String),
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Idle => f.write_str("Idle"),
            ConnectionStatus::Connecting { peer } => write!(f, "Connecting to {peer}"),
            ConnectionStatus::Connected { peer } => write!(f, "Connected to {peer}"),
            ConnectionStatus::Failed(reason) => f.write_str(reason),
        }
    }
}

/// Single source of truth for the connection status.
#[derive(Debug)]
pub struct StatusBoard {
    tx: watch::Sender<ConnectionStatus>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    /// Creates a board showing [`ConnectionStatus::Idle`].
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ConnectionStatus::Idle);
        Self { tx }
    }

    /// Publishes `status`; observers are only woken when it actually changes.
    pub fn publish(&self, status: ConnectionStatus) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status.clone();
                true
            }
        });
        if changed {
            info!(%status, "connection status changed");
        }
    }

    /// The latest status.
    pub fn current(&self) -> ConnectionStatus {
        self.tx.borrow().clone()
    }

    /// A receiver that observes every future change.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_board_starts_idle() {
        assert_eq!(StatusBoard::new().current(), ConnectionStatus::Idle);
    }

    #[test]
    fn test_connected_status_displays_peer_name() {
        let status = ConnectionStatus::Connected {
            peer: "Desk-01".to_string(),
        };
        assert_eq!(status.to_string(), "Connected to Desk-01");
    }

    #[tokio::test]
    async fn test_subscriber_sees_published_status() {
        // Arrange
        let board = StatusBoard::new();
        let mut rx = board.subscribe();

        // Act
        board.publish(ConnectionStatus::Failed(WRITE_FAILURE_REASON.to_string()));

        // Assert
        rx.changed().await.expect("sender alive");
        assert_eq!(
            *rx.borrow(),
            ConnectionStatus::Failed("IOError".to_string())
        );
    }

    #[test]
    fn test_republishing_same_status_does_not_notify() {
        let board = StatusBoard::new();
        let rx = board.subscribe();

        board.publish(ConnectionStatus::Idle);

        assert!(!rx.has_changed().unwrap());
    }
}
