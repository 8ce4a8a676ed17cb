//! Fixed-cadence snapshot polling.
//!
//! One task, one tick at a time:
//!
//! ```text
//! ┌──── stop requested? ──yes──> exit with PollReport
//! │            │ no
//! │      wait for tick (or stop)
//! │            │
//! │      fetch (bounded by fetch_timeout)
//! │        │ err            │ ok
//! │   link: Unreachable   shape ok? ──no──> warn, discard
//! │        │                │ yes
//! │        │          window ← tail, history ← delta, render
//! └────────┴────────────────┘
//! ```
//!
//! Fetch failures never end the loop. The stop flag is checked at the top of
//! every iteration and while waiting for the next tick; an in-flight fetch
//! always finishes (or times out) first.

use std::time::{Duration, Instant};

use relay_core::config::ClientConfig;
use relay_core::HistoryPolicy;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::buffer::{ClientBuffer, HistoryDelta, LiveWindow};
use crate::error::{ClientError, Result};
use crate::source::SnapshotSource;

/// Consumes the live window after each applied snapshot.
pub trait Renderer: Send {
    /// Draw (or otherwise consume) the current window.
    fn render(&mut self, window: &LiveWindow);
}

impl<F> Renderer for F
where
    F: FnMut(&LiveWindow) + Send,
{
    fn render(&mut self, window: &LiveWindow) {
        self(window);
    }
}

/// Renderer that reports the newest readings through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRenderer;

impl Renderer for LogRenderer {
    fn render(&mut self, window: &LiveWindow) {
        let motion = window.motion().latest();
        let audio = window.audio().latest();
        debug!(
            motion_len = window.motion().len(),
            audio_len = window.audio().len(),
            latest_time = ?motion.map(|s| s.time),
            ax = ?motion.map(|s| s.ax),
            ay = ?motion.map(|s| s.ay),
            az = ?motion.map(|s| s.az),
            db = ?audio.map(|s| s.db),
            "Live window updated"
        );
    }
}

/// Poll loop settings.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Time between ticks
    pub interval: Duration,
    /// Upper bound on one fetch
    pub fetch_timeout: Duration,
    /// Live window capacity per channel
    pub window_capacity: usize,
    /// History accumulation; `None` disables history
    pub history: Option<HistoryPolicy>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for PollConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            interval: config.poll_interval,
            fetch_timeout: config.fetch_timeout,
            window_capacity: config.window_capacity,
            history: config.history.then_some(config.history_policy),
        }
    }
}

/// Reachability of the ingest service as seen by the loop.
#[derive(Debug, Clone, Default)]
pub enum LinkState {
    /// No fetch has completed yet.
    #[default]
    Disconnected,

    /// Last fetch succeeded.
    Connected {
        /// When the current run of successes began
        since: Instant,
    },

    /// Last fetch failed.
    Unreachable {
        /// Failed fetches in a row
        consecutive_failures: u32,
        /// Most recent error
        last_error: String,
    },
}

impl LinkState {
    /// Returns true if the last fetch succeeded.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    /// Returns a short status label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connected { .. } => "Connected",
            Self::Unreachable { .. } => "Unreachable",
        }
    }
}

impl PartialEq for LinkState {
    fn eq(&self, other: &Self) -> bool {
        // Instants are not compared
        match (self, other) {
            (Self::Disconnected, Self::Disconnected) => true,
            (Self::Connected { .. }, Self::Connected { .. }) => true,
            (
                Self::Unreachable {
                    consecutive_failures: a,
                    ..
                },
                Self::Unreachable {
                    consecutive_failures: b,
                    ..
                },
            ) => a == b,
            _ => false,
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Snapshot applied and rendered.
    Applied {
        /// Motion samples in the live window
        motion: usize,
        /// Audio samples in the live window
        audio: usize,
        /// Rows appended to history, if enabled
        history_added: Option<HistoryDelta>,
    },
    /// Fetch failed or timed out; buffers untouched.
    TransportFailed,
    /// Snapshot had misaligned channels; buffers untouched.
    ShapeMismatch,
}

/// Counters over the lifetime of a loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    /// Ticks executed
    pub ticks: u64,
    /// Snapshots applied
    pub applied: u64,
    /// Fetches that failed or timed out
    pub transport_failures: u64,
    /// Snapshots discarded for misaligned channels
    pub shape_mismatches: u64,
}

/// Final state handed back when the loop stops.
#[derive(Debug)]
pub struct PollReport {
    /// Live window and session history at exit
    pub buffer: ClientBuffer,
    /// Lifetime counters
    pub stats: PollStats,
    /// Link state at exit
    pub link: LinkState,
}

/// The polling consumer.
pub struct PollLoop<S, R> {
    source: S,
    renderer: R,
    config: PollConfig,
    buffer: ClientBuffer,
    stats: PollStats,
    link: LinkState,
}

impl<S, R> PollLoop<S, R>
where
    S: SnapshotSource,
    R: Renderer,
{
    /// Create a loop with empty buffers.
    pub fn new(source: S, renderer: R, config: PollConfig) -> Self {
        let buffer = match config.history {
            Some(policy) => ClientBuffer::with_history(config.window_capacity, policy),
            None => ClientBuffer::new(config.window_capacity),
        };
        Self {
            source,
            renderer,
            config,
            buffer,
            stats: PollStats::default(),
            link: LinkState::Disconnected,
        }
    }

    /// Current buffers.
    #[must_use]
    pub fn buffer(&self) -> &ClientBuffer {
        &self.buffer
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> PollStats {
        self.stats
    }

    /// Current link state.
    #[must_use]
    pub fn link(&self) -> &LinkState {
        &self.link
    }

    /// Run a single fetch/validate/apply/render cycle.
    pub async fn tick(&mut self) -> TickOutcome {
        self.stats.ticks += 1;

        let fetched = match tokio::time::timeout(self.config.fetch_timeout, self.source.fetch()).await
        {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout(self.config.fetch_timeout)),
        };

        let payload = match fetched {
            Ok(payload) => payload,
            Err(e) => {
                self.mark_unreachable(&e);
                return TickOutcome::TransportFailed;
            }
        };
        self.mark_reachable();

        match self.buffer.apply(&payload) {
            Ok(outcome) => {
                self.stats.applied += 1;
                self.renderer.render(self.buffer.window());
                TickOutcome::Applied {
                    motion: outcome.motion_in_window,
                    audio: outcome.audio_in_window,
                    history_added: outcome.history,
                }
            }
            Err(e) => {
                self.stats.shape_mismatches += 1;
                warn!(error = %e, "Snapshot channels have unequal length; skipping this update");
                TickOutcome::ShapeMismatch
            }
        }
    }

    fn mark_unreachable(&mut self, error: &ClientError) {
        self.stats.transport_failures += 1;

        let consecutive_failures = match &self.link {
            LinkState::Unreachable {
                consecutive_failures,
                ..
            } => consecutive_failures + 1,
            _ => 1,
        };

        if consecutive_failures == 1 {
            warn!(
                source = %self.source.describe(),
                error = %error,
                "Cannot reach ingest service; will keep retrying"
            );
        } else {
            debug!(consecutive_failures, error = %error, "Ingest service still unreachable");
        }

        self.link = LinkState::Unreachable {
            consecutive_failures,
            last_error: error.to_string(),
        };
    }

    fn mark_reachable(&mut self) {
        match &self.link {
            LinkState::Connected { .. } => return,
            LinkState::Unreachable {
                consecutive_failures,
                ..
            } => info!(
                source = %self.source.describe(),
                failed_attempts = consecutive_failures,
                "Ingest service reachable again"
            ),
            LinkState::Disconnected => {
                info!(source = %self.source.describe(), "Connected to ingest service");
            }
        }
        self.link = LinkState::Connected {
            since: Instant::now(),
        };
    }

    /// Tick at the configured cadence until `stop` becomes `true` or its
    /// sender is dropped.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> PollReport {
        let period = self.config.interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            source = %self.source.describe(),
            interval = ?period,
            window = self.config.window_capacity,
            history = ?self.config.history,
            "Poll loop started"
        );

        loop {
            if *stop.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            self.tick().await;
        }

        info!(
            ticks = self.stats.ticks,
            applied = self.stats.applied,
            transport_failures = self.stats.transport_failures,
            shape_mismatches = self.stats.shape_mismatches,
            "Poll loop stopped"
        );

        PollReport {
            buffer: self.buffer,
            stats: self.stats,
            link: self.link,
        }
    }
}

impl<S, R> PollLoop<S, R>
where
    S: SnapshotSource + 'static,
    R: Renderer + 'static,
{
    /// Run the loop on its own task.
    #[must_use]
    pub fn spawn(self) -> PollHandle {
        let (stop, rx) = watch::channel(false);
        let task = tokio::spawn(self.run(rx));
        PollHandle { stop, task }
    }
}

/// Handle to a spawned [`PollLoop`].
#[derive(Debug)]
pub struct PollHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<PollReport>,
}

impl PollHandle {
    /// Request stop, wait for the current tick to finish, and return the
    /// final buffers.
    pub async fn stop(self) -> Result<PollReport> {
        // Fails only if the task already exited.
        let _ = self.stop.send(true);
        self.task
            .await
            .map_err(|e| ClientError::Task(e.to_string()))
    }
}
