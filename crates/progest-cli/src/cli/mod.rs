//! CLI for the progest transfer progress estimator.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use progest_core::config::{self, ProgressConfig, ReportFormat};
use std::path::PathBuf;

use commands::{run_show_config, run_simulate, SimulateArgs};

/// Top-level CLI for progest.
#[derive(Debug, Parser)]
#[command(name = "progest")]
#[command(about = "progest: live progress, ETA and throughput for transfers of uncertain size", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub overrides: ConfigOverrides,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// Command-line overrides applied on top of the config file.
#[derive(Debug, Default, Args)]
pub struct ConfigOverrides {
    /// Read configuration from this file instead of the XDG config path.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Turn progress reporting off.
    #[arg(long, global = true)]
    pub no_progress: bool,
    /// Seconds between progress reports.
    #[arg(long, global = true, value_name = "SECS")]
    pub interval: Option<u32>,
    /// Dry run: the progress reporter never starts.
    #[arg(long, global = true)]
    pub dry_run: bool,
    /// Report line format.
    #[arg(long, global = true, value_enum)]
    pub format: Option<FormatArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Text => ReportFormat::Text,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

impl ConfigOverrides {
    pub fn apply(&self, cfg: &mut ProgressConfig) {
        if self.no_progress {
            cfg.enabled = false;
        }
        if let Some(interval) = self.interval {
            cfg.interval_secs = interval;
        }
        if self.dry_run {
            cfg.dry_run = true;
        }
        if let Some(format) = self.format {
            cfg.format = format.into();
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run a synthetic two-pass transfer and report its progress.
    Simulate(SimulateArgs),

    /// Show the resolved configuration.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let (mut cfg, source) = match &cli.overrides.config {
            Some(path) => (config::load_from_path(path)?, path.clone()),
            None => (config::load_or_init()?, config::config_path()?),
        };
        cli.overrides.apply(&mut cfg);
        cfg.validate()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Simulate(args) => run_simulate(&cfg, &args).await?,
            CliCommand::Config => run_show_config(&cfg, &source)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
