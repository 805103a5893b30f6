//! SendScheduler: rate-limits commands and dispatches them off the input path.
//!
//! # How commands flow (for beginners)
//!
//! ```text
//!  input thread                          worker task
//!  ────────────                          ───────────
//!  submit(cmd) ──► throttle ──► mpsc ──► link.write(line)
//!      │              │                     │
//!      │ disabled     │ too soon            │ WriteFailed
//!      ▼              ▼                     ▼
//!   Discarded     Throttled          disable output,
//!                                    status = Failed("IOError")
//! ```
//!
//! `submit` is synchronous and never waits for the radio, so a slow or stuck
//! write can never stall gesture recognition.  One persistent worker task
//! drains an unbounded queue in FIFO order, which keeps commands from the
//! same producer in order and bounds the number of writes in flight to one.
//!
//! # Output epochs
//!
//! Every call to [`enable`](SendScheduler::enable) or
//! [`disable`](SendScheduler::disable) starts a new *epoch*.  Queued commands
//! remember the epoch they were submitted in; the worker discards any whose
//! epoch is no longer current.  This is how a disconnect drops everything
//! still queued for the old link without having to drain the queue.
//!
//! Status changes that go with an epoch change (`Connected` on enable, `Idle`
//! on disable, `Failed("IOError")` on a write failure) are published while
//! the output lock is held.  A write that fails on an old link therefore can
//! only report `IOError` if no newer status has been published since.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use remoteplay_core::protocol::throttle::DEFAULT_MOVE_INTERVAL;
use remoteplay_core::{Command, MoveThrottle, Timestamp};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, trace};

use crate::application::status::{ConnectionStatus, StatusBoard, WRITE_FAILURE_REASON};
use crate::infrastructure::transport::{LinkError, SerialLink};

/// Tuning for the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Minimum spacing between two transmitted `MOVE` commands.
    pub move_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            move_interval: DEFAULT_MOVE_INTERVAL,
        }
    }
}

/// What [`SendScheduler::submit`] did with a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Queued for transmission.
    Queued,
    /// A move dropped by the rate limit.
    Throttled,
    /// Dropped because output is disabled.
    Discarded,
}

/// Snapshot of the scheduler counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Commands written to the link.
    pub sent: u64,
    /// Moves dropped by the rate limit.
    pub throttled: u64,
    /// Commands dropped because output was disabled or the link closed.
    pub discarded: u64,
    /// Writes that failed with an I/O error.
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    sent: AtomicU64,
    throttled: AtomicU64,
    discarded: AtomicU64,
    failed: AtomicU64,
}

struct Output {
    link: Option<Arc<SerialLink>>,
    epoch: u64,
    throttle: MoveThrottle,
}

struct Shared {
    output: Mutex<Output>,
    counters: Counters,
    status: Arc<StatusBoard>,
}

impl Shared {
    fn lock_output(&self) -> MutexGuard<'_, Output> {
        self.output.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.lock_output().epoch == epoch
    }

    /// Disables output and publishes the write failure if `epoch` is still
    /// current.  Returns `true` if it was.
    fn fail_output(&self, epoch: u64) -> bool {
        let mut output = self.lock_output();
        if output.epoch != epoch {
            return false;
        }
        output.epoch += 1;
        output.link = None;
        self.status
            .publish(ConnectionStatus::Failed(WRITE_FAILURE_REASON.to_string()));
        true
    }
}

enum Job {
    Send {
        command: Command,
        link: Arc<SerialLink>,
        epoch: u64,
    },
    Flush(oneshot::Sender<()>),
}

/// Rate-limiting, non-blocking command dispatcher.
pub struct SendScheduler {
    shared: Arc<Shared>,
    jobs: mpsc::UnboundedSender<Job>,
}

impl SendScheduler {
    /// Creates the scheduler and spawns its worker on the current Tokio
    /// runtime.  Output starts disabled.
    ///
    /// The worker exits when the scheduler is dropped.
    pub fn spawn(config: SchedulerConfig, status: Arc<StatusBoard>) -> Self {
        let shared = Arc::new(Shared {
            output: Mutex::new(Output {
                link: None,
                epoch: 0,
                throttle: MoveThrottle::new(config.move_interval),
            }),
            counters: Counters::default(),
            status,
        });
        let (jobs, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(Arc::clone(&shared), rx));
        Self { shared, jobs }
    }

    /// Offers `command`, produced at `at`, for transmission.
    ///
    /// Never blocks.  Clicks are always queued while output is enabled;
    /// moves are queued only when the throttle admits them.
    pub fn submit(&self, command: Command, at: Timestamp) -> SubmitOutcome {
        let mut output = self.shared.lock_output();

        let Some(link) = output.link.clone() else {
            self.shared.counters.discarded.fetch_add(1, Ordering::Relaxed);
            trace!(%command, "output disabled; command discarded");
            return SubmitOutcome::Discarded;
        };

        if command.is_rate_limited() && !output.throttle.admit(at) {
            self.shared.counters.throttled.fetch_add(1, Ordering::Relaxed);
            trace!(%command, %at, "move throttled");
            return SubmitOutcome::Throttled;
        }

        // Enqueue under the lock so concurrent submitters cannot interleave
        // with an epoch change.
        let job = Job::Send {
            command,
            link,
            epoch: output.epoch,
        };
        if self.jobs.send(job).is_err() {
            self.shared.counters.discarded.fetch_add(1, Ordering::Relaxed);
            return SubmitOutcome::Discarded;
        }
        SubmitOutcome::Queued
    }

    /// Routes future commands to `link`, resets the move throttle and
    /// publishes `status`.
    pub fn enable(&self, link: Arc<SerialLink>, status: ConnectionStatus) {
        let mut output = self.shared.lock_output();
        output.epoch += 1;
        output.link = Some(link);
        output.throttle.reset();
        debug!(epoch = output.epoch, "output enabled");
        self.shared.status.publish(status);
    }

    /// Stops output and publishes `status`.  Commands still queued are
    /// discarded by the worker.
    pub fn disable(&self, status: ConnectionStatus) {
        let mut output = self.shared.lock_output();
        output.epoch += 1;
        output.link = None;
        debug!(epoch = output.epoch, "output disabled");
        self.shared.status.publish(status);
    }

    /// `true` while commands are being forwarded to a link.
    pub fn is_enabled(&self) -> bool {
        self.shared.lock_output().link.is_some()
    }

    /// Waits until every command submitted before this call was handled.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.jobs.send(Job::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    /// Current counter values.
    pub fn stats(&self) -> SchedulerStats {
        let c = &self.shared.counters;
        SchedulerStats {
            sent: c.sent.load(Ordering::Relaxed),
            throttled: c.throttled.load(Ordering::Relaxed),
            discarded: c.discarded.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
        }
    }
}

async fn run_worker(shared: Arc<Shared>, mut rx: mpsc::UnboundedReceiver<Job>) {
    while let Some(job) = rx.recv().await {
        let (command, link, epoch) = match job {
            Job::Flush(done) => {
                let _ = done.send(());
                continue;
            }
            Job::Send {
                command,
                link,
                epoch,
            } => (command, link, epoch),
        };

        if !shared.is_current(epoch) {
            shared.counters.discarded.fetch_add(1, Ordering::Relaxed);
            trace!(%command, "stale command discarded");
            continue;
        }

        match link.write(command.encode_line().as_bytes()).await {
            Ok(()) => {
                shared.counters.sent.fetch_add(1, Ordering::Relaxed);
                trace!(%command, "sent");
            }
            Err(LinkError::WriteFailed(e)) => {
                shared.counters.failed.fetch_add(1, Ordering::Relaxed);
                if shared.fail_output(epoch) {
                    error!(error = %e, peer = %link.peer(), "write failed; output disabled");
                } else {
                    debug!(error = %e, "write failed on a link that was already replaced");
                }
            }
            Err(e) => {
                // Closed underneath us by a disconnect.
                shared.counters.discarded.fetch_add(1, Ordering::Relaxed);
                debug!(error = %e, %command, "command discarded");
            }
        }
    }
    debug!("send worker stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
