//! Timer-driven monitor task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::{Monitor, MonitorOptions, Phase, SensorOutput, Status};
use crate::pipeline::{QueryConfig, QueryOptions};
use crate::source::{ConnectionSource, SourceError};

/// Shortest allowed scan interval.
const MIN_SCAN_INTERVAL: Duration = Duration::from_millis(10);

/// A running monitor, ticking on a fixed interval.
///
/// The pair is fixed for the handle's lifetime; only its options can change.
/// Dropping the handle stops the timer and aborts any in-flight fetch.
pub struct MonitorHandle {
    unique_id: String,
    config: watch::Sender<QueryConfig>,
    output: watch::Receiver<SensorOutput>,
    phase: watch::Receiver<Phase>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Validate the source for this pair, then start polling.
    ///
    /// Setup-fatal errors (rejected credentials, missing configuration) are
    /// returned and no monitor is started. Any other validation failure is
    /// logged and polling starts anyway; the first tick will retry.
    pub async fn start<S: ConnectionSource>(
        source: S,
        config: QueryConfig,
        options: MonitorOptions,
    ) -> Result<Self, SourceError> {
        let pair = config.unique_id();

        match source.validate(&config.origin).await {
            Ok(()) => debug!(%pair, "source validated"),
            Err(e) if e.is_setup_fatal() => {
                error!(%pair, error = %e, "cannot set up monitor");
                return Err(e);
            }
            Err(e) => warn!(%pair, error = %e, "source validation failed, starting anyway"),
        }

        Ok(Self::spawn(source, config, options))
    }

    /// Start polling without validating the source.
    ///
    /// The first tick runs immediately.
    pub fn spawn<S: ConnectionSource>(source: S, config: QueryConfig, options: MonitorOptions) -> Self {
        let unique_id = config.unique_id();
        let (config_tx, config_rx) = watch::channel(config);
        let mut monitor = Monitor::new(source, config_rx, options);
        let output = monitor.subscribe();
        let phase = monitor.subscribe_phase();
        let status = Arc::clone(&monitor.status);

        let period = options.scan_interval.max(MIN_SCAN_INTERVAL);
        info!(pair = %unique_id, interval = ?period, "starting monitor");

        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                monitor.tick().await;
            }
        });
        let task = supervise(unique_id.clone(), ticker, status);

        Self {
            unique_id,
            config: config_tx,
            output,
            phase,
            task,
        }
    }

    /// Identifier of the monitored pair.
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Latest published output.
    pub fn output(&self) -> SensorOutput {
        self.output.borrow().clone()
    }

    /// Receive every published output.
    pub fn subscribe(&self) -> watch::Receiver<SensorOutput> {
        self.output.clone()
    }

    /// Replace the query options; the next tick picks them up.
    pub fn update_options(&self, options: QueryOptions) {
        debug!(pair = %self.unique_id, ?options, "options updated");
        self.config
            .send_modify(|config| *config = config.clone().with_options(options));
    }

    /// Current query configuration.
    pub fn config(&self) -> QueryConfig {
        self.config.borrow().clone()
    }

    /// Whether the monitor's task is still running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop polling and abort any in-flight fetch.
    pub fn shutdown(self) {
        info!(pair = %self.unique_id, "stopping monitor");
        // Drop does the work
    }

    /// Where the monitor is in its poll cycle.
    pub fn phase(&self) -> Phase {
        if self.task.is_finished() {
            return Phase::Stopped;
        }
        *self.phase.borrow()
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Aborts the wrapped task when dropped.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Wait on the ticker task and publish its end.
///
/// The ticker only finishes on its own by panicking. When that happens the
/// output goes unavailable and the phase becomes [`Phase::Stopped`].
/// Aborting the returned task aborts the ticker with it.
fn supervise(pair: String, ticker: JoinHandle<()>, status: Arc<Status>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let _abort = AbortOnDrop(ticker.abort_handle());
        match ticker.await {
            Ok(()) => warn!(%pair, "monitor task ended"),
            Err(e) => error!(%pair, error = %e, "monitor task died"),
        }
        status.set_phase(Phase::Stopped);
        status.mark_unavailable();
    })
}
