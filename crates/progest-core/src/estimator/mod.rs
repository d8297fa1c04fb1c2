//! Live completion / ETA / throughput estimator.
//!
//! Two actors share one `Estimator`: the transfer path reports cumulative byte
//! counts through `record_bytes_written` (hot, lock-free), and the reporter calls
//! `tick` once per interval to recompute the estimate under a mutex.
//!
//! Completion is estimated from two ratios tracked with Welford's online
//! mean/variance: how many raw delta bytes each changed file byte produces, and
//! how many bytes go on the wire per raw delta byte. Their product, padded by
//! both standard deviations, scaled by the share of changed data processed so
//! far, approximates the fraction done. The ETA projects elapsed time onto a
//! `(1 - x) / x` curve.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};
use crate::config::ProgressConfig;
use crate::error::ProgressError;
use crate::evidence::{saturating_add, Evidence, LiveTotals};
use crate::report::Report;
use crate::stats::{RateWindow, RunningRatio};

/// `last_activity` value before any byte was seen or any tick ran.
const NO_ACTIVITY: u64 = u64::MAX;

/// Knobs the estimator reads; usually derived from `ProgressConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimatorOptions {
    /// When false, `tick` never produces a report.
    pub enabled: bool,
    /// Reporting interval; twice this is the stall threshold unless the floor is larger.
    pub interval: Duration,
    pub stall_floor: Duration,
    /// Capacity of the throughput sample window.
    pub rate_window: usize,
}

impl EstimatorOptions {
    pub fn from_config(cfg: &ProgressConfig) -> Self {
        Self {
            enabled: cfg.enabled,
            interval: cfg.interval(),
            stall_floor: Duration::from_secs(cfg.stall_floor_secs),
            rate_window: cfg.rate_window,
        }
    }

    /// Idle time beyond which a tick reports a stall: `max(stall_floor, 2 * interval)`.
    /// Idle time is compared at full `Duration` precision, so 5.4s idle against a
    /// 5s threshold is a stall; it is not truncated to whole seconds first.
    pub fn stall_threshold(&self) -> Duration {
        self.stall_floor.max(self.interval * 2)
    }
}

impl Default for EstimatorOptions {
    fn default() -> Self {
        Self::from_config(&ProgressConfig::default())
    }
}

/// Read-only copy of the estimator's statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatorSnapshot {
    pub has_evidence: bool,
    pub sample_count: u64,
    pub change_ratio_mean: f64,
    pub change_sigma: f64,
    pub compress_ratio_mean: f64,
    pub compress_sigma: f64,
    pub progress_fraction: f64,
    pub eta_seconds: u64,
    pub total_bytes: u64,
    pub throughput_bps: f64,
    pub rate_samples: usize,
    pub accumulated_elapsed: Duration,
}

/// Everything `tick` reads and writes. Guarded by a single mutex.
#[derive(Debug)]
struct TickState {
    sample_count: u64,
    change: RunningRatio,
    compress: RunningRatio,
    progress: f64,
    eta_seconds: u64,
    bytes_at_last_tick: u64,
    last_sample_time: Option<Instant>,
    start_time: Option<Instant>,
    accumulated_elapsed: Duration,
    throughput_bps: f64,
    rates: RateWindow,
}

impl TickState {
    fn new(rate_window: usize) -> Self {
        Self {
            sample_count: 0,
            change: RunningRatio::new(),
            compress: RunningRatio::new(),
            progress: 0.0,
            eta_seconds: 0,
            bytes_at_last_tick: 0,
            last_sample_time: None,
            start_time: None,
            accumulated_elapsed: Duration::ZERO,
            throughput_bps: 0.0,
            rates: RateWindow::new(rate_window),
        }
    }

    fn report(&self, total_bytes: u64, elapsed_seconds: u64, stalled: bool) -> Report {
        Report {
            percent_complete: 100.0 * self.progress,
            eta_seconds: self.eta_seconds,
            total_bytes,
            elapsed_seconds,
            speed_bytes_per_sec: self.throughput_bps,
            stalled,
        }
    }
}

/// Progress estimator for one transfer operation. Construct a new one per operation.
pub struct Estimator {
    options: EstimatorOptions,
    clock: Arc<dyn Clock>,
    origin: Instant,
    evidence: OnceLock<Evidence>,
    // Hot path: written by the transfer thread without taking the lock.
    last_sample_bytes: AtomicU64,
    cumulative_bytes: AtomicU64,
    last_activity: AtomicU64,
    state: Mutex<TickState>,
}

impl std::fmt::Debug for Estimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Estimator")
            .field("options", &self.options)
            .field("evidence", &self.evidence.get())
            .field("cumulative_bytes", &self.total_bytes_written())
            .finish_non_exhaustive()
    }
}

impl Estimator {
    pub fn new(options: EstimatorOptions, clock: Arc<dyn Clock>) -> Self {
        let origin = clock.now();
        Self {
            options,
            clock,
            origin,
            evidence: OnceLock::new(),
            last_sample_bytes: AtomicU64::new(0),
            cumulative_bytes: AtomicU64::new(0),
            last_activity: AtomicU64::new(NO_ACTIVITY),
            state: Mutex::new(TickState::new(options.rate_window)),
        }
    }

    /// Estimator on the monotonic system clock.
    pub fn with_system_clock(options: EstimatorOptions) -> Self {
        Self::new(options, Arc::new(SystemClock))
    }

    pub fn options(&self) -> &EstimatorOptions {
        &self.options
    }

    /// Record the cumulative byte count of the current unit of work (e.g. volume).
    ///
    /// Only forward movement counts; a smaller value (a new volume starting at
    /// zero) re-bases the sample without adding bytes. Never blocks on the tick lock.
    pub fn record_bytes_written(&self, cumulative_bytes: u64) {
        let previous = self
            .last_sample_bytes
            .swap(cumulative_bytes, Ordering::AcqRel);
        let delta = cumulative_bytes.saturating_sub(previous);
        if delta > 0 {
            saturating_add(&self.cumulative_bytes, delta);
            let now = self.nanos_since_origin(self.clock.now());
            self.last_activity.store(now, Ordering::Release);
        }
    }

    /// Callback in the transfer collaborator's `(bytecount, totalbytes)` shape.
    /// The second argument is not used.
    pub fn transfer_callback(self: &Arc<Self>) -> impl Fn(u64, u64) + Send + Sync + 'static {
        let estimator = Arc::clone(self);
        move |bytecount, _total| estimator.record_bytes_written(bytecount)
    }

    /// Store the sizing pass result. Write-once: a second call keeps the first value.
    pub fn set_evidence(&self, new_bytes: u64, changed_bytes: u64) -> Result<(), ProgressError> {
        let evidence = Evidence::new(new_bytes, changed_bytes);
        self.evidence
            .set(evidence)
            .map_err(|_| ProgressError::EvidenceAlreadySet)?;
        tracing::debug!(new_bytes, changed_bytes, "size evidence collected");
        Ok(())
    }

    /// True once the sizing pass has reported; nothing is estimated before that.
    pub fn has_evidence(&self) -> bool {
        self.evidence.get().is_some()
    }

    pub fn evidence(&self) -> Option<Evidence> {
        self.evidence.get().copied()
    }

    /// Bytes transferred so far across all units of work.
    pub fn total_bytes_written(&self) -> u64 {
        self.cumulative_bytes.load(Ordering::Acquire)
    }

    /// Current smoothed throughput in bytes per second.
    pub fn speed(&self) -> f64 {
        self.lock_state().throughput_bps
    }

    /// Whole seconds since the first tick; 0 before it.
    pub fn total_elapsed_seconds(&self) -> u64 {
        let now = self.clock.now();
        self.lock_state()
            .start_time
            .map(|start| now.saturating_duration_since(start).as_secs())
            .unwrap_or(0)
    }

    /// The 100% / zero-ETA report emitted when the transfer finishes.
    pub fn final_report(&self) -> Report {
        let now = self.clock.now();
        let st = self.lock_state();
        let elapsed_seconds = st
            .start_time
            .map(|start| now.saturating_duration_since(start).as_secs())
            .unwrap_or(0);
        Report::completed(self.total_bytes_written(), elapsed_seconds, st.throughput_bps)
    }

    pub fn snapshot(&self) -> EstimatorSnapshot {
        let st = self.lock_state();
        EstimatorSnapshot {
            has_evidence: self.has_evidence(),
            sample_count: st.sample_count,
            change_ratio_mean: st.change.mean(),
            change_sigma: st.change.sigma(),
            compress_ratio_mean: st.compress.mean(),
            compress_sigma: st.compress.sigma(),
            progress_fraction: st.progress,
            eta_seconds: st.eta_seconds,
            total_bytes: self.total_bytes_written(),
            throughput_bps: st.throughput_bps,
            rate_samples: st.rates.len(),
            accumulated_elapsed: st.accumulated_elapsed,
        }
    }

    /// Recompute the estimate from the live totals and return a report, if there
    /// is anything to show. Called once per reporting interval.
    pub fn tick(&self, live: LiveTotals) -> Option<Report> {
        if !self.options.enabled {
            return None;
        }
        let evidence = *self.evidence.get()?;

        let now = self.clock.now();
        let mut st = self.lock_state();

        let elapsed = st
            .last_sample_time
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or_default();
        st.last_sample_time = Some(now);
        let start = *st.start_time.get_or_insert(now);
        let elapsed_seconds = now.saturating_duration_since(start).as_secs();
        let total_bytes = self.total_bytes_written();

        // Inactivity: report frozen values and keep the statistics untouched.
        let now_nanos = self.nanos_since_origin(now);
        let last_activity = match self.last_activity.compare_exchange(
            NO_ACTIVITY,
            now_nanos,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => now_nanos,
            Err(seen) => seen,
        };
        let idle = Duration::from_nanos(now_nanos.saturating_sub(last_activity));
        if idle > self.options.stall_threshold() {
            tracing::debug!(idle_secs = idle.as_secs(), total_bytes, "transfer stalled");
            return Some(st.report(total_bytes, elapsed_seconds, true));
        }

        let evidence_total = evidence.total();
        if live.changed_plus_new == 0 || evidence_total == 0 {
            return None;
        }

        st.sample_count += 1;

        let changes = live.changed_plus_new as f64;
        let change_sigma = st.change.push(live.raw_delta_size as f64 / changes);
        let compress_sigma = if live.raw_delta_size > 0 {
            st.compress
                .push(total_bytes as f64 / live.raw_delta_size as f64)
        } else {
            st.compress.sigma()
        };

        // Product of the two ratio means plus both deviations: optimistic on purpose.
        let estimate = (st.change.mean() * st.compress.mean() + change_sigma + compress_sigma)
            * changes
            / evidence_total as f64;
        let estimate = if estimate.is_nan() {
            0.0
        } else {
            estimate.clamp(0.0, 1.0)
        };
        if estimate > st.progress {
            st.progress = estimate;
        }

        st.accumulated_elapsed += elapsed;
        let projection = if st.progress > 0.0 {
            (1.0 - st.progress) / st.progress
        } else {
            1.0
        };
        st.eta_seconds = (projection * st.accumulated_elapsed.as_secs_f64()) as u64;

        if !elapsed.is_zero() {
            let sent = total_bytes.saturating_sub(st.bytes_at_last_tick);
            st.rates.push(sent as f64 / elapsed.as_secs_f64());
        }
        st.bytes_at_last_tick = total_bytes;
        st.throughput_bps = st.rates.ema();

        let report = st.report(total_bytes, elapsed_seconds, false);
        tracing::trace!(
            step = st.sample_count,
            progress = st.progress,
            change_mean = st.change.mean(),
            compress_mean = st.compress.mean(),
            "progress recomputed"
        );
        Some(report)
    }

    fn lock_state(&self) -> MutexGuard<'_, TickState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn nanos_since_origin(&self, at: Instant) -> u64 {
        let nanos = at.saturating_duration_since(self.origin).as_nanos();
        // Keep clear of the NO_ACTIVITY sentinel.
        u64::try_from(nanos).unwrap_or(NO_ACTIVITY - 1).min(NO_ACTIVITY - 1)
    }
}
