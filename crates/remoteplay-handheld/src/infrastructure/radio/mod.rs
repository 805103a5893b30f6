//! Radio stack adapters.
//!
//! The handheld never talks to the operating system's radio API directly.
//! Everything goes through two small traits:
//!
//! - [`RadioStack`] – cancels peer discovery and opens a stream channel to a
//!   bonded peer's serial service.
//! - [`ByteChannel`] – the opened, exclusively owned byte stream.
//!
//! Errors are plain [`std::io::Error`]s; the radio reports a single
//! undifferentiated failure kind apart from `PermissionDenied`, which callers
//! surface separately so the user can be asked for authorization.
//!
//! # Sub-modules
//!
//! - **`tcp`** – serial emulation over TCP.  The peer address is `host:port`,
//!   which lets the handheld and the `remoteplay-peer` binary run on a
//!   desktop without any radio hardware.
//! - **`mock`** – in-memory radio that records calls and can inject failures
//!   and stalls.  Used by unit and integration tests.

use std::io;

use async_trait::async_trait;
use remoteplay_core::PeerHandle;
use uuid::Uuid;

pub mod mock;
pub mod tcp;

/// An open, reliable, ordered byte stream to one peer.
///
/// A channel has exactly one owner; the serial link guards it with a lock so
/// that writes and shutdown never overlap.
#[async_trait]
pub trait ByteChannel: Send {
    /// Writes every byte of `bytes` or fails.
    async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Releases the underlying stream.
    async fn shutdown(&mut self) -> io::Result<()>;
}

/// The platform radio stack.
#[async_trait]
pub trait RadioStack: Send + Sync {
    /// Stops any ongoing peer scan.  Scanning slows down connection set-up on
    /// real radios, so it is always cancelled before opening a channel.
    fn cancel_discovery(&self);

    /// Opens a stream channel to `peer`'s service `service_id`.
    async fn open(&self, peer: &PeerHandle, service_id: Uuid) -> io::Result<Box<dyn ByteChannel>>;
}
