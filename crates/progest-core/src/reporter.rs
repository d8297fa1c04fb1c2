//! Background reporter: ticks the estimator every interval and emits to a sink.
//!
//! The reporter only starts when the sizing pass has produced evidence, reporting
//! is enabled, and the run is not a dry run. Shutdown is cooperative: a stop flag
//! checked at the top of every iteration, with a notification so a sleeping loop
//! wakes up instead of waiting out the interval. The last thing a running
//! reporter emits is a 100% completion report.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::config::ProgressConfig;
use crate::error::ProgressError;
use crate::estimator::Estimator;
use crate::evidence::LiveSizes;
use crate::sink::ProgressSink;

/// Lifecycle of a reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterState {
    Idle,
    Running,
    Stopped,
}

/// One-shot stop flag shared between the reporter task and its owner.
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Later calls are no-ops.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            // notify_one stores a permit if the loop is not parked yet.
            self.notify.notify_one();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    async fn notified(&self) {
        self.notify.notified().await;
    }
}

/// Drives periodic progress reports for one transfer operation.
pub struct Reporter {
    estimator: Arc<Estimator>,
    live: Arc<dyn LiveSizes>,
    sink: Arc<dyn ProgressSink>,
    interval: Duration,
    enabled: bool,
    dry_run: bool,
    stop: Arc<StopSignal>,
    state: Arc<Mutex<ReporterState>>,
    start_requested: bool,
    handle: Option<JoinHandle<()>>,
}

impl Reporter {
    pub fn new(
        estimator: Arc<Estimator>,
        live: Arc<dyn LiveSizes>,
        sink: Arc<dyn ProgressSink>,
        cfg: &ProgressConfig,
    ) -> Self {
        Self {
            estimator,
            live,
            sink,
            interval: cfg.interval().max(Duration::from_millis(1)),
            enabled: cfg.enabled,
            dry_run: cfg.dry_run,
            stop: Arc::new(StopSignal::new()),
            state: Arc::new(Mutex::new(ReporterState::Idle)),
            start_requested: false,
            handle: None,
        }
    }

    pub fn state(&self) -> ReporterState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Handle that stops the reporter from elsewhere (e.g. the transfer path).
    pub fn stop_signal(&self) -> Arc<StopSignal> {
        Arc::clone(&self.stop)
    }

    /// Spawn the reporting task on the current tokio runtime.
    ///
    /// Returns `Ok(false)` and stays `Idle` for good when evidence is missing,
    /// reporting is disabled, or this is a dry run.
    pub fn start(&mut self) -> Result<bool, ProgressError> {
        if self.start_requested {
            return Err(ProgressError::ReporterAlreadyStarted);
        }
        self.start_requested = true;

        if self.dry_run || !self.enabled || !self.estimator.has_evidence() {
            tracing::debug!(
                dry_run = self.dry_run,
                enabled = self.enabled,
                has_evidence = self.estimator.has_evidence(),
                "progress reporter not started"
            );
            return Ok(false);
        }

        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = ReporterState::Running;
        let estimator = Arc::clone(&self.estimator);
        let live = Arc::clone(&self.live);
        let sink = Arc::clone(&self.sink);
        let stop = Arc::clone(&self.stop);
        let state = Arc::clone(&self.state);
        let interval = self.interval;
        self.handle = Some(tokio::spawn(async move {
            run_report_loop(estimator, live, sink, stop, interval).await;
            *state.lock().unwrap_or_else(|e| e.into_inner()) = ReporterState::Stopped;
        }));
        tracing::debug!(interval_ms = interval.as_millis() as u64, "progress reporter started");
        Ok(true)
    }

    /// Signal stop and wait for the final report to be emitted.
    pub async fn stop(&mut self) {
        self.stop.stop();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!("progress reporter task failed: {}", e);
                *self.state.lock().unwrap_or_else(|e| e.into_inner()) = ReporterState::Stopped;
            }
        }
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        self.stop.stop();
    }
}

async fn run_report_loop(
    estimator: Arc<Estimator>,
    live: Arc<dyn LiveSizes>,
    sink: Arc<dyn ProgressSink>,
    stop: Arc<StopSignal>,
    interval: Duration,
) {
    while !stop.is_stopped() {
        if let Some(report) = estimator.tick(live.live_totals()) {
            sink.emit(&report);
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = stop.notified() => {}
        }
    }
    sink.emit(&estimator.final_report());
    tracing::debug!(
        total_bytes = estimator.total_bytes_written(),
        "progress reporter stopped"
    );
}
