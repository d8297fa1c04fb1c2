//! Error type for the progress estimator library.

use thiserror::Error;

/// Errors surfaced by configuration validation and one-shot lifecycle calls.
///
/// The estimation path itself never fails: degenerate ticks simply produce no report.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgressError {
    /// The reporting interval must be at least one second.
    #[error("reporting interval must be greater than zero")]
    InvalidInterval,
    /// The throughput window needs room for at least one sample.
    #[error("rate window must hold at least one sample")]
    InvalidRateWindow,
    /// Evidence is write-once per transfer operation.
    #[error("size evidence was already collected for this operation")]
    EvidenceAlreadySet,
    /// A reporter drives a single background task for its lifetime.
    #[error("progress reporter was already started")]
    ReporterAlreadyStarted,
}
