//! `progest simulate` – drive a synthetic two-pass transfer through the estimator.
//!
//! The sizing pass reports new/changed byte totals up front; the live pass then
//! walks the data in chunks, turning each chunk into raw delta bytes and then
//! wire bytes at the configured ratios, sent at a fixed rate in fixed-size volumes.

use anyhow::{ensure, Context, Result};
use clap::Args;
use progest_core::config::ProgressConfig;
use progest_core::{
    ChannelSink, Estimator, EstimatorOptions, LiveSizes, Report, Reporter, SharedLiveTotals,
    TracingSink,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Args)]
pub struct SimulateArgs {
    /// Bytes in new files found by the sizing pass.
    #[arg(long, default_value_t = 16 * 1024 * 1024, value_name = "BYTES")]
    pub new_bytes: u64,
    /// Bytes in changed files found by the sizing pass.
    #[arg(long, default_value_t = 48 * 1024 * 1024, value_name = "BYTES")]
    pub changed_bytes: u64,
    /// Raw delta bytes produced per changed/new file byte.
    #[arg(long, default_value_t = 0.5)]
    pub delta_ratio: f64,
    /// Wire bytes per raw delta byte (compression + encryption).
    #[arg(long, default_value_t = 0.6)]
    pub compress_ratio: f64,
    /// Transfer rate in wire bytes per second.
    #[arg(long, default_value_t = 4 * 1024 * 1024, value_name = "BYTES")]
    pub rate: u64,
    /// File bytes processed per step.
    #[arg(long, default_value_t = 256 * 1024, value_name = "BYTES")]
    pub chunk: u64,
    /// Wire bytes per volume; the transfer byte count restarts with each volume.
    #[arg(long, default_value_t = 8 * 1024 * 1024, value_name = "BYTES")]
    pub volume: u64,
    /// Pause the transfer for this many seconds halfway through.
    #[arg(long, value_name = "SECS")]
    pub pause_secs: Option<u64>,
}

impl SimulateArgs {
    fn validate(&self) -> Result<()> {
        ensure!(self.rate > 0, "--rate must be greater than zero");
        ensure!(self.chunk > 0, "--chunk must be greater than zero");
        ensure!(self.volume > 0, "--volume must be greater than zero");
        ensure!(
            self.delta_ratio > 0.0 && self.compress_ratio > 0.0,
            "ratios must be greater than zero"
        );
        Ok(())
    }
}

pub async fn run_simulate(cfg: &ProgressConfig, args: &SimulateArgs) -> Result<()> {
    args.validate()?;

    let estimator = Arc::new(Estimator::with_system_clock(EstimatorOptions::from_config(
        cfg,
    )));
    let live = Arc::new(SharedLiveTotals::new());

    estimator
        .set_evidence(args.new_bytes, args.changed_bytes)
        .context("record sizing pass")?;
    let total_changes = args.new_bytes.saturating_add(args.changed_bytes);
    tracing::info!(
        new_bytes = args.new_bytes,
        changed_bytes = args.changed_bytes,
        "sizing pass complete"
    );

    let (report_tx, mut report_rx) = tokio::sync::mpsc::channel::<Report>(16);
    let display = TracingSink::new(cfg.format);
    let display_handle = tokio::spawn(async move {
        use progest_core::ProgressSink;
        while let Some(report) = report_rx.recv().await {
            display.emit(&report);
            println!("{}", display.render(&report));
        }
    });

    let mut reporter = Reporter::new(
        Arc::clone(&estimator),
        Arc::clone(&live) as Arc<dyn LiveSizes>,
        Arc::new(ChannelSink::new(report_tx)),
        cfg,
    );
    if !reporter.start()? {
        println!("progress reporting is off (disabled, dry run, or no evidence)");
    }

    let callback = estimator.transfer_callback();
    let mut processed = 0u64;
    let mut in_volume = 0u64;
    let mut volumes = 1u32;
    let mut paused = false;
    while processed < total_changes {
        let step = args.chunk.min(total_changes - processed);
        processed += step;
        live.add_changed_plus_new(step);

        let raw = (step as f64 * args.delta_ratio) as u64;
        live.add_raw_delta(raw);
        let wire = (raw as f64 * args.compress_ratio) as u64;

        if in_volume > 0 && in_volume.saturating_add(wire) > args.volume {
            in_volume = 0;
            volumes += 1;
            callback(0, args.volume);
            tracing::debug!(volume = volumes, "starting new volume");
        }
        in_volume += wire;
        callback(in_volume, args.volume);

        tokio::time::sleep(Duration::from_secs_f64(wire as f64 / args.rate as f64)).await;

        if let Some(secs) = args.pause_secs {
            if !paused && processed >= total_changes / 2 {
                paused = true;
                tracing::info!(secs, "pausing transfer");
                tokio::time::sleep(Duration::from_secs(secs)).await;
            }
        }
    }

    reporter.stop().await;
    drop(reporter);
    display_handle.await.context("report display join")?;

    tracing::info!(
        bytes = estimator.total_bytes_written(),
        volumes,
        elapsed_secs = estimator.total_elapsed_seconds(),
        "simulated transfer finished"
    );
    Ok(())
}
