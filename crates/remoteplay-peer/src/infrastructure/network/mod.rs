//! Network infrastructure for the peer.
//!
//! A TCP listener stands in for the serial service the handheld connects to.
//! The stream carries newline-delimited command lines in one direction only.
//!
//! Architecture:
//! - `CommandListener` accepts one handheld at a time; a second handheld
//!   waits in the accept backlog until the first disconnects.
//! - `serve_stream` reads lines until EOF and hands each to the
//!   [`ApplyCommandsUseCase`].  Bad lines are logged and skipped; they never
//!   end the session.  A line longer than [`MAX_LINE_LEN`] is skipped without
//!   being buffered in full.

use std::future::Future;
use std::net::SocketAddr;

use remoteplay_core::ProtocolError;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::application::apply_commands::{ApplyCommandsUseCase, ApplyError};

/// Default listen address of the peer binary.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:24810";

/// Longest accepted line, delimiter included.  Valid commands are far shorter.
pub const MAX_LINE_LEN: usize = 256;

/// Errors that can occur in the peer network layer.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The listen socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    /// An I/O error on the listen socket.
    #[error("listener I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Accepts handheld connections and applies what they send.
pub struct CommandListener {
    listener: TcpListener,
}

impl CommandListener {
    /// Binds the listen socket.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::Bind`] if the address is invalid or in use.
    pub async fn bind(addr: &str) -> Result<Self, ListenerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ListenerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        Ok(Self { listener })
    }

    /// The bound address (useful when binding port 0).
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::Io`] if the socket cannot report its address.
    pub fn local_addr(&self) -> Result<SocketAddr, ListenerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves handhelds one after another until `shutdown` resolves.
    ///
    /// A session in progress is abandoned when `shutdown` fires.
    pub async fn run<F>(&self, use_case: &mut ApplyCommandsUseCase, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let accepted = tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => accepted,
            };
            let (stream, remote) = match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("accept failed: {e}");
                    continue;
                }
            };
            if let Err(e) = stream.set_nodelay(true) {
                debug!("set_nodelay failed for {remote}: {e}");
            }
            info!("handheld connected from {remote}");

            tokio::select! {
                _ = &mut shutdown => break,
                result = serve_stream(stream, use_case) => match result {
                    Ok(lines) => info!(lines, "handheld {remote} disconnected"),
                    Err(e) => warn!("session with {remote} ended: {e}"),
                },
            }
        }
        info!("listener stopped");
    }
}

/// Reads command lines from `reader` until EOF and applies each one.
///
/// Returns the number of lines read, blank ones included.  Lines that are
/// not valid UTF-8 are decoded lossily and then rejected by the parser.
/// Lines longer than [`MAX_LINE_LEN`] are counted as malformed and discarded
/// up to the next newline.
///
/// # Errors
///
/// Returns the underlying I/O error if reading fails.
pub async fn serve_stream<R>(
    reader: R,
    use_case: &mut ApplyCommandsUseCase,
) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut lines = 0_u64;

    loop {
        buf.clear();
        let read = (&mut reader)
            .take(MAX_LINE_LEN as u64)
            .read_until(b'\n', &mut buf)
            .await?;
        if read == 0 {
            return Ok(lines);
        }
        lines += 1;

        if buf.len() == MAX_LINE_LEN && buf.last() != Some(&b'\n') {
            let skipped = skip_line(&mut reader).await?;
            use_case.reject_line();
            warn!(
                line = lines,
                len = MAX_LINE_LEN as u64 + skipped,
                "skipping oversize line"
            );
            continue;
        }

        let line = String::from_utf8_lossy(&buf);
        match use_case.handle_line(&line) {
            Ok(command) => debug!(%command, "received"),
            Err(ApplyError::Protocol(ProtocolError::Empty)) => {}
            Err(ApplyError::Protocol(e)) => warn!(line = lines, "skipping line: {e}"),
            Err(ApplyError::Sink(e)) => error!(line = lines, "could not apply command: {e}"),
        }
    }
}

/// Discards input up to and including the next newline.  Returns the
/// number of bytes discarded.
async fn skip_line<R>(reader: &mut R) -> std::io::Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut skipped = 0_u64;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(skipped);
        }
        let (used, done) = match available.iter().position(|&b| b == b'\n') {
            Some(pos) => (pos + 1, true),
            None => (available.len(), false),
        };
        reader.consume(used);
        skipped += used as u64;
        if done {
            return Ok(skipped);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
