//! RemotePlay handheld entry point.
//!
//! Loads the config, connects to a bonded peer, and replays a touch trace
//! through the gesture pipeline.  With no trace the link stays open until
//! Ctrl+C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config_from()           -- TOML config (+ --config override)
//!  └─ SendScheduler::spawn()       -- background write worker
//!  └─ ConnectionManager            -- TcpRadio + StaticPeerDirectory
//!       └─ request_connect_by_name()
//!  └─ replay loop                  -- trace samples -> TouchpadUseCase
//!  └─ request_disconnect()
//! ```
//!
//! # Usage
//!
//! ```text
//! remoteplay-handheld --peer Desk-01 --trace session.trace --realtime
//! remoteplay-handheld --init-config
//! remoteplay-handheld --list-peers
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use remoteplay_core::{PointerSample, Timestamp};
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use remoteplay_handheld::application::{
    connect_peer::ConnectionManager,
    send_commands::{SchedulerConfig, SendScheduler},
    status::StatusBoard,
    translate_touch::TouchpadUseCase,
};
use remoteplay_handheld::infrastructure::{
    discovery::StaticPeerDirectory,
    input::trace::read_trace,
    radio::tcp::TcpRadio,
    storage::config::{config_file_path, load_config_from, save_config_to, AppConfig},
    transport::LinkConfig,
};

/// How long to wait for queued commands on the way out.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

// ── CLI argument definitions ──────────────────────────────────────────────────

/// RemotePlay handheld.
///
/// Turns touch gestures into pointer commands for a paired computer.
#[derive(Debug, Parser)]
#[command(
    name = "remoteplay-handheld",
    about = "Use a touch trace as a wireless touchpad for a paired peer",
    version
)]
struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, env = "REMOTEPLAY_CONFIG")]
    config: Option<PathBuf>,

    /// Name or address of the bonded peer.  Overrides `handheld.default_peer`.
    #[arg(long, env = "REMOTEPLAY_PEER")]
    peer: Option<String>,

    /// Touch trace to replay.  `-` reads standard input.
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Replay the trace at its recorded pace.
    #[arg(long)]
    realtime: bool,

    /// Write a default config file and exit.
    #[arg(long)]
    init_config: bool,

    /// Print the bonded peers and exit.
    #[arg(long)]
    list_peers: bool,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config_file_path().context("no --config given and no platform config directory")?,
    };
    let config = if cli.init_config {
        AppConfig::default()
    } else {
        load_config_from(&config_path)
            .with_context(|| format!("failed to load config from {}", config_path.display()))?
    };

    // RUST_LOG wins; otherwise the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.handheld.log_level)),
        )
        .init();

    if cli.init_config {
        save_config_to(&config, &config_path)?;
        info!("wrote default config to {}", config_path.display());
        return Ok(());
    }

    info!("RemotePlay handheld starting");

    // ── Wiring ────────────────────────────────────────────────────────────────
    let status = Arc::new(StatusBoard::new());
    let scheduler = Arc::new(SendScheduler::spawn(
        SchedulerConfig {
            move_interval: config.scheduler.move_interval(),
        },
        Arc::clone(&status),
    ));
    let manager = ConnectionManager::new(
        Arc::new(TcpRadio::new()),
        Arc::new(StaticPeerDirectory::new(config.peers.clone())),
        Arc::clone(&scheduler),
        Arc::clone(&status),
        LinkConfig {
            connect_timeout: config.link.connect_timeout(),
            service_id: config.link.service_id,
        },
    );

    if cli.list_peers {
        let peers = manager.bonded_peers()?;
        if peers.is_empty() {
            warn!("no bonded peers configured");
        }
        for peer in peers {
            info!("bonded peer: {peer}");
        }
        return Ok(());
    }

    // ── Connect ───────────────────────────────────────────────────────────────
    let peer_name = cli
        .peer
        .clone()
        .or_else(|| config.handheld.default_peer.clone())
        .context("no peer selected: pass --peer or set handheld.default_peer")?;
    manager
        .request_connect_by_name(&peer_name)
        .await
        .with_context(|| format!("could not connect to {peer_name}"))?;

    let samples = match cli.trace.clone() {
        Some(path) => tokio::task::spawn_blocking(move || load_trace(&path)).await??,
        None => Vec::new(),
    };
    let mut touchpad = TouchpadUseCase::new(config.gesture.clone(), Arc::clone(&scheduler));

    // ── Session ───────────────────────────────────────────────────────────────
    let session = async {
        if cli.trace.is_some() {
            replay(&samples, &mut touchpad, cli.realtime).await;
            if tokio::time::timeout(FLUSH_TIMEOUT, scheduler.flush()).await.is_err() {
                warn!("timed out waiting for queued commands");
            }
        } else {
            info!("no trace given; press Ctrl+C to disconnect");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = session => {}
        _ = tokio::signal::ctrl_c() => info!("shutdown signal received"),
    }

    let stats = scheduler.stats();
    info!(
        sent = stats.sent,
        throttled = stats.throttled,
        discarded = stats.discarded,
        failed = stats.failed,
        "session finished"
    );

    manager.request_disconnect().await;
    info!("RemotePlay handheld stopped");
    Ok(())
}

fn load_trace(path: &Path) -> anyhow::Result<Vec<PointerSample>> {
    let samples = if path == Path::new("-") {
        read_trace(std::io::stdin().lock())?
    } else {
        let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        read_trace(BufReader::new(file))?
    };
    info!(count = samples.len(), "trace loaded");
    Ok(samples)
}

/// Feeds `samples` to the touchpad, firing the tap timer between samples.
async fn replay(samples: &[PointerSample], touchpad: &mut TouchpadUseCase, realtime: bool) {
    let Some(first) = samples.first() else {
        return;
    };
    let pace = Pace {
        realtime,
        origin: first.timestamp,
        start: Instant::now(),
    };

    for sample in samples {
        if let Some(deadline) = touchpad.next_deadline() {
            if deadline <= sample.timestamp {
                pace.wait_until(deadline).await;
                touchpad.tick(deadline);
            }
        }
        pace.wait_until(sample.timestamp).await;
        touchpad.handle_sample(sample);
    }

    if let Some(deadline) = touchpad.next_deadline() {
        pace.wait_until(deadline).await;
        touchpad.tick(deadline);
    }
}

/// Maps trace time onto the wall clock when replaying in real time.
struct Pace {
    realtime: bool,
    origin: Timestamp,
    start: Instant,
}

impl Pace {
    async fn wait_until(&self, at: Timestamp) {
        if self.realtime {
            let offset = Duration::from_millis(at.millis_since(self.origin));
            tokio::time::sleep_until(self.start + offset).await;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
