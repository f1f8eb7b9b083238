//! Per-pair polling orchestrator.
//!
//! A [`Monitor`] owns one origin/destination pair. Each tick reads the
//! current [`QueryConfig`], fetches raw records on a separate task, runs the
//! pipeline and publishes a [`SensorOutput`]. Failures never escape a tick:
//! they flip `available` to false and leave the last good value in place.
//!
//! [`MonitorHandle`] drives a monitor from a timer.

mod handle;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

use crate::pipeline::{self, Attributes, QueryConfig};
use crate::source::{ConnectionSource, RawConnection, SourceError, SourceQuery};

pub use handle::MonitorHandle;

/// Default overall time allowed for one tick.
pub const DEFAULT_TICK_TIMEOUT: Duration = Duration::from_secs(30);

/// Default time between ticks.
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(120);

/// Timing options for a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorOptions {
    /// Give up on a tick after this long.
    pub tick_timeout: Duration,
    /// Time between ticks when driven by a [`MonitorHandle`].
    pub scan_interval: Duration,
}

impl MonitorOptions {
    pub fn with_tick_timeout(mut self, timeout: Duration) -> Self {
        self.tick_timeout = timeout;
        self
    }

    pub fn with_scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval;
        self
    }
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            tick_timeout: DEFAULT_TICK_TIMEOUT,
            scan_interval: DEFAULT_SCAN_INTERVAL,
        }
    }
}

/// Where a monitor is in its poll cycle.
///
/// `Success` and `Failed` are the resting states after a tick; both accept
/// the next tick exactly like `Idle`. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Fetching,
    Success,
    Failed,
    /// The task driving the monitor has ended.
    Stopped,
}

/// What the host sees for one monitored pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorOutput {
    pub name: String,
    pub unique_id: String,

    /// Primary value; `None` until the first successful tick.
    pub value: Option<String>,

    /// Attributes of the last successful tick.
    pub attributes: Option<Attributes>,

    /// Whether the last tick succeeded.
    pub available: bool,
}

impl SensorOutput {
    fn initial(config: &QueryConfig) -> Self {
        Self {
            name: config.name(),
            unique_id: config.unique_id(),
            value: None,
            attributes: None,
            available: false,
        }
    }
}

/// Why a tick failed.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("tick timed out after {0:?}")]
    Timeout(Duration),

    #[error("fetch task ended abnormally: {0}")]
    Aborted(String),
}

/// Result of a single tick.
#[derive(Debug)]
pub enum TickOutcome {
    /// A new value was published.
    Success,
    /// The tick failed; the previous value was kept.
    Failed(TickError),
    /// The previous fetch is still running; nothing changed.
    Skipped,
}

impl TickOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TickOutcome::Success)
    }
}

/// Published state of a monitor, shared with whatever drives it.
struct Status {
    output: watch::Sender<SensorOutput>,
    phase: watch::Sender<Phase>,
}

impl Status {
    fn new(config: &QueryConfig) -> Self {
        Self {
            output: watch::channel(SensorOutput::initial(config)).0,
            phase: watch::channel(Phase::Idle).0,
        }
    }

    fn set_phase(&self, phase: Phase) {
        self.phase.send_if_modified(|current| {
            let changed = *current != phase;
            *current = phase;
            changed
        });
    }

    /// Flip `available` off, keeping the last value. Notifies only on change.
    fn mark_unavailable(&self) {
        self.output.send_if_modified(|output| {
            let was_available = output.available;
            output.available = false;
            was_available
        });
    }
}

/// Clears the in-flight flag when the fetch task ends, however it ends.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Orchestrator for one origin/destination pair.
pub struct Monitor<S: ConnectionSource> {
    source: Arc<S>,
    config: watch::Receiver<QueryConfig>,
    status: Arc<Status>,
    options: MonitorOptions,
    in_flight: Arc<AtomicBool>,
    fetch_task: Option<AbortHandle>,
}

impl<S: ConnectionSource> Monitor<S> {
    /// Create a monitor reading its configuration from `config`.
    pub fn new(source: S, config: watch::Receiver<QueryConfig>, options: MonitorOptions) -> Self {
        let status = Arc::new(Status::new(&config.borrow()));

        Self {
            source: Arc::new(source),
            config,
            status,
            options,
            in_flight: Arc::new(AtomicBool::new(false)),
            fetch_task: None,
        }
    }

    pub fn phase(&self) -> Phase {
        *self.status.phase.borrow()
    }

    /// Receive every phase change.
    pub fn subscribe_phase(&self) -> watch::Receiver<Phase> {
        self.status.phase.subscribe()
    }

    /// Whether a fetch task is still running.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Latest published output.
    pub fn output(&self) -> SensorOutput {
        self.status.output.borrow().clone()
    }

    /// Receive every published output.
    pub fn subscribe(&self) -> watch::Receiver<SensorOutput> {
        self.status.output.subscribe()
    }

    /// Run one poll now.
    pub async fn tick(&mut self) -> TickOutcome {
        self.tick_at(Local::now()).await
    }

    /// Run one poll as if the wall-clock time were `now`.
    pub async fn tick_at(&mut self, now: DateTime<Local>) -> TickOutcome {
        if self.is_in_flight() {
            debug!(phase = ?self.phase(), "previous fetch still running, skipping tick");
            return TickOutcome::Skipped;
        }

        let config = self.config.borrow_and_update().clone();
        let pair = config.unique_id();
        let reference_time = config.reference_time(now.naive_local());

        self.status.set_phase(Phase::Fetching);
        debug!(%pair, %reference_time, "fetching connections");

        match self.fetch(config.source_query(reference_time)).await {
            Ok(raw) => {
                let eval = pipeline::run(raw, &config, reference_time, now);
                info!(
                    %pair,
                    value = %eval.value,
                    kept = eval.kept,
                    received = eval.received,
                    "updated"
                );

                // Observers of the new output must already see the new phase
                self.status.set_phase(Phase::Success);
                self.status.output.send_replace(SensorOutput {
                    name: config.name(),
                    unique_id: pair,
                    value: Some(eval.value),
                    attributes: Some(eval.attributes),
                    available: true,
                });
                TickOutcome::Success
            }
            Err(e) => {
                match &e {
                    TickError::Source(source) if source.is_setup_fatal() => {
                        error!(%pair, error = %e, "source rejected request")
                    }
                    _ => warn!(%pair, error = %e, "tick failed, keeping previous value"),
                }

                self.status.set_phase(Phase::Failed);
                self.status.mark_unavailable();
                TickOutcome::Failed(e)
            }
        }
    }

    /// Run the source fetch on its own task, bounded by the tick timeout.
    ///
    /// On timeout the task is left running; the in-flight flag stays set
    /// until it finishes.
    async fn fetch(&mut self, query: SourceQuery) -> Result<Vec<RawConnection>, TickError> {
        self.in_flight.store(true, Ordering::SeqCst);
        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        let source = Arc::clone(&self.source);

        let task = tokio::spawn(async move {
            let _guard = guard;
            source.fetch(&query).await
        });
        self.fetch_task = Some(task.abort_handle());

        match tokio::time::timeout(self.options.tick_timeout, task).await {
            Ok(Ok(result)) => Ok(result?),
            Ok(Err(join_error)) => Err(TickError::Aborted(join_error.to_string())),
            Err(_) => Err(TickError::Timeout(self.options.tick_timeout)),
        }
    }
}

impl<S: ConnectionSource> Drop for Monitor<S> {
    fn drop(&mut self) {
        if let Some(task) = self.fetch_task.take() {
            task.abort();
        }
    }
}
