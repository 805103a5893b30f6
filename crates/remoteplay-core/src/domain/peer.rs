//! Bonded peer identity.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Well-known service identifier of the serial port profile.
///
/// Peers advertise their command listener under this id; the handheld opens
/// its stream channel against it.
pub const SERIAL_PORT_SERVICE_ID: Uuid = Uuid::from_u128(0x0000_1101_0000_1000_8000_0080_5F9B_34FB);

/// A previously bonded remote computer.
///
/// Handles come from the platform's paired-device list and are never modified
/// afterwards, so the fields are private and only exposed through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerHandle {
    address: String,
    name: String,
}

impl PeerHandle {
    /// Creates a handle from the platform address and display name.
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
        }
    }

    /// Platform address (a MAC address for real radios, `host:port` for the
    /// TCP emulation).
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Human-readable device name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for PeerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.address)
    }
}
