//! RemotePlay peer entry point.
//!
//! Listens for a handheld and replays the pointer commands it sends on a
//! virtual cursor.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ CommandListener::bind()   -- TCP stand-in for the serial service
//!  └─ listener.run()            -- one handheld at a time, until Ctrl+C
//!       └─ serve_stream()       -- lines -> ApplyCommandsUseCase -> LoggingSink
//! ```

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use remoteplay_peer::application::apply_commands::ApplyCommandsUseCase;
use remoteplay_peer::infrastructure::{
    network::{CommandListener, DEFAULT_BIND_ADDR},
    sink::logging::LoggingSink,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// RemotePlay peer.
///
/// Receives `CLICK` / `MOVE` lines from a handheld and applies them.
#[derive(Debug, Parser)]
#[command(
    name = "remoteplay-peer",
    about = "Apply pointer commands received from a RemotePlay handheld",
    version
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, default_value = DEFAULT_BIND_ADDR, env = "REMOTEPLAY_PEER_BIND")]
    bind: String,

    /// Width of the virtual screen in pixels.
    #[arg(long, default_value_t = 1920)]
    width: u32,

    /// Height of the virtual screen in pixels.
    #[arg(long, default_value_t = 1080)]
    height: u32,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, default_value = "info", env = "REMOTEPLAY_LOG_LEVEL")]
    log_level: String,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    info!("RemotePlay peer starting");

    let sink = Arc::new(LoggingSink::new(cli.width, cli.height));
    let mut use_case = ApplyCommandsUseCase::new(sink.clone());

    let listener = CommandListener::bind(&cli.bind)
        .await
        .with_context(|| format!("cannot listen on {}", cli.bind))?;
    info!("waiting for a handheld on {}", listener.local_addr()?);

    listener
        .run(&mut use_case, async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
            }
        })
        .await;

    let stats = use_case.stats();
    let (x, y) = sink.position();
    info!(
        applied = stats.applied,
        malformed = stats.malformed,
        failed = stats.failed,
        x,
        y,
        "RemotePlay peer stopped"
    );
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
