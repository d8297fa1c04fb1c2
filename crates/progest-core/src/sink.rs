//! Destinations for progress reports. Emission is best-effort and never blocks.

use tokio::sync::mpsc;

use crate::config::ReportFormat;
use crate::report::Report;

/// Receives reports from the reporter. Implementations must not block.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, report: &Report);
}

/// Writes each report as a structured `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink {
    format: ReportFormat,
}

impl TracingSink {
    pub fn new(format: ReportFormat) -> Self {
        Self { format }
    }

    /// The message line carried by the event.
    pub fn render(&self, report: &Report) -> String {
        match self.format {
            ReportFormat::Text => report.to_string(),
            ReportFormat::Json => serde_json::to_string(report).unwrap_or_else(|e| {
                tracing::warn!("could not serialize progress report: {}", e);
                report.to_string()
            }),
        }
    }
}

impl ProgressSink for TracingSink {
    fn emit(&self, report: &Report) {
        tracing::info!(
            target: "progest::progress",
            percent = report.percent_complete,
            eta_secs = report.eta_seconds,
            bytes = report.total_bytes,
            elapsed_secs = report.elapsed_seconds,
            speed = report.speed_bytes_per_sec,
            stalled = report.stalled,
            "{}",
            self.render(report)
        );
    }
}

/// Forwards reports to a channel; drops them when the receiver lags or is gone.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Report>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Report>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, report: &Report) {
        if self.tx.try_send(*report).is_err() {
            tracing::trace!("progress report dropped");
        }
    }
}
