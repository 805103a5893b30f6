//! Serial channel emulation over TCP.

use std::io;

use async_trait::async_trait;
use remoteplay_core::PeerHandle;
use tokio::{io::AsyncWriteExt, net::TcpStream};
use tracing::debug;
use uuid::Uuid;

use super::{ByteChannel, RadioStack};

/// Opens "serial" channels as TCP connections to the peer's `host:port`
/// address.  There is no discovery to cancel.
#[derive(Debug, Default, Clone)]
pub struct TcpRadio;

impl TcpRadio {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RadioStack for TcpRadio {
    fn cancel_discovery(&self) {
        debug!("tcp radio: no discovery in progress");
    }

    async fn open(&self, peer: &PeerHandle, service_id: Uuid) -> io::Result<Box<dyn ByteChannel>> {
        debug!(peer = %peer, %service_id, "opening tcp serial channel");
        let stream = TcpStream::connect(peer.address()).await?;
        // Commands are tiny; send each one immediately.
        stream.set_nodelay(true)?;
        Ok(Box::new(TcpChannel { stream }))
    }
}

/// A connected TCP stream posing as a serial channel.
pub struct TcpChannel {
    stream: TcpStream,
}

#[async_trait]
impl ByteChannel for TcpChannel {
    async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        AsyncWriteExt::shutdown(&mut self.stream).await
    }
}
