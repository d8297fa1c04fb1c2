//! Integration test: a simulated two-pass transfer feeding the estimator from
//! a producer thread/task while the reporter ticks concurrently.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use progest_core::clock::ManualClock;
use progest_core::config::ProgressConfig;
use progest_core::{
    ChannelSink, Estimator, EstimatorOptions, LiveTotals, Report, Reporter, ReporterState,
    SharedLiveTotals,
};

const VOLUME: u64 = 64 * 1024;

#[test]
fn concurrent_producer_and_ticker_agree_on_totals() {
    let clock = ManualClock::new();
    let est = Arc::new(Estimator::new(
        EstimatorOptions::default(),
        Arc::new(clock.clone()),
    ));
    est.set_evidence(1_000_000, 3_000_000).unwrap();

    let producer = {
        let est = Arc::clone(&est);
        thread::spawn(move || {
            let mut sent = 0u64;
            for _ in 0..8 {
                // Each volume counts from zero again.
                let mut in_volume = 0u64;
                est.record_bytes_written(in_volume);
                while in_volume < VOLUME {
                    in_volume += 512;
                    sent += 512;
                    est.record_bytes_written(in_volume);
                }
            }
            sent
        })
    };

    let mut last_progress = 0.0;
    let mut changes = 0u64;
    while !producer.is_finished() {
        clock.advance(Duration::from_millis(250));
        changes += 10_000;
        est.tick(LiveTotals {
            raw_delta_size: changes / 2,
            changed_plus_new: changes,
        });
        let p = est.snapshot().progress_fraction;
        assert!(p >= last_progress);
        last_progress = p;
        thread::yield_now();
    }

    let sent = producer.join().unwrap();
    assert_eq!(sent, 8 * VOLUME);
    assert_eq!(est.total_bytes_written(), sent);
}

#[tokio::test(start_paused = true)]
async fn reporter_follows_a_simulated_transfer_to_completion() {
    let cfg = ProgressConfig {
        interval_secs: 1,
        ..ProgressConfig::default()
    };
    let clock = ManualClock::new();
    let est = Arc::new(Estimator::new(
        EstimatorOptions::from_config(&cfg),
        Arc::new(clock.clone()),
    ));
    let live = Arc::new(SharedLiveTotals::new());

    // Evidence pass: 2 MB of new and changed data.
    est.set_evidence(500_000, 1_500_000).unwrap();

    let (tx, mut rx) = tokio::sync::mpsc::channel::<Report>(256);
    let mut reporter = Reporter::new(
        Arc::clone(&est),
        Arc::clone(&live) as Arc<dyn progest_core::LiveSizes>,
        Arc::new(ChannelSink::new(tx)),
        &cfg,
    );

    // Live pass: 20 KB of changed data per 100ms, deltas at 40%, wire bytes at 50% of deltas.
    let callback = est.transfer_callback();
    let mut cumulative = 0u64;
    let mut processed = 0u64;
    let step = 20_000u64;
    processed += step;
    live.add_changed_plus_new(step);
    live.add_raw_delta(step * 4 / 10);
    cumulative += step / 5;
    callback(cumulative, 0);

    assert!(reporter.start().unwrap());

    while processed < 2_000_000 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        clock.advance(Duration::from_millis(100));
        processed += step;
        live.add_changed_plus_new(step);
        live.add_raw_delta(step * 4 / 10);
        cumulative += step / 5;
        callback(cumulative, 0);
    }

    reporter.stop().await;
    assert_eq!(reporter.state(), ReporterState::Stopped);

    let mut reports = Vec::new();
    while let Ok(r) = rx.try_recv() {
        reports.push(r);
    }
    assert!(reports.len() >= 5, "got {} reports", reports.len());
    for pair in reports.windows(2) {
        assert!(pair[1].percent_complete >= pair[0].percent_complete);
        assert!(pair[1].total_bytes >= pair[0].total_bytes);
    }
    assert!(reports.iter().all(|r| !r.stalled));

    let last = reports.last().unwrap();
    assert_eq!(last.percent_complete, 100.0);
    assert_eq!(last.eta_seconds, 0);
    assert_eq!(last.total_bytes, cumulative);

    // Steady 40 KB/s on the wire once the window has filled up a bit.
    let before_last = &reports[reports.len() - 2];
    assert!(
        (before_last.speed_bytes_per_sec - 40_000.0).abs() < 4_000.0,
        "speed {}",
        before_last.speed_bytes_per_sec
    );
}
