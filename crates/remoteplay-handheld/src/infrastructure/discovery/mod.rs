//! Bonded peer listing.
//!
//! The handheld never scans for new peers; it only connects to devices that
//! were paired beforehand at the platform level.  [`PeerDirectory`] is the
//! seam to the platform's paired-device list.  Adapter problems are reported
//! as distinct [`DiscoveryError`] variants so the connection manager can show
//! the user exactly what is wrong.
//!
//! [`StaticPeerDirectory`] serves the `[[peers]]` list from the config file and
//! is what the binary uses with the TCP serial emulation.

use remoteplay_core::PeerHandle;
use thiserror::Error;
use tracing::debug;

/// Reasons the bonded-device list cannot be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("Bluetooth not supported")]
    NoAdapter,

    #[error("Bluetooth is not enabled")]
    AdapterDisabled,

    #[error("permission to list paired devices was denied")]
    PermissionDenied,
}

/// Source of previously bonded peers.
#[cfg_attr(test, mockall::automock)]
pub trait PeerDirectory: Send + Sync {
    /// Returns the bonded peers, possibly empty.
    fn bonded_peers(&self) -> Result<Vec<PeerHandle>, DiscoveryError>;
}

/// A fixed peer list.
#[derive(Debug, Clone, Default)]
pub struct StaticPeerDirectory {
    peers: Vec<PeerHandle>,
}

impl StaticPeerDirectory {
    pub fn new(peers: Vec<PeerHandle>) -> Self {
        Self { peers }
    }
}

impl PeerDirectory for StaticPeerDirectory {
    fn bonded_peers(&self) -> Result<Vec<PeerHandle>, DiscoveryError> {
        debug!(count = self.peers.len(), "listing bonded peers");
        Ok(self.peers.clone())
    }
}
