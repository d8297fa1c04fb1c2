pub mod config;
pub mod logging;

pub mod clock;
pub mod error;
pub mod estimator;
pub mod evidence;
pub mod report;
pub mod reporter;
pub mod sink;
pub mod stats;

pub use error::ProgressError;
pub use estimator::{Estimator, EstimatorOptions, EstimatorSnapshot};
pub use evidence::{Evidence, LiveSizes, LiveTotals, SharedLiveTotals};
pub use report::Report;
pub use reporter::{Reporter, ReporterState, StopSignal};
pub use sink::{ChannelSink, ProgressSink, TracingSink};
