//! `progest config` – print the resolved configuration.

use anyhow::{Context, Result};
use progest_core::config::ProgressConfig;
use std::path::Path;

pub fn run_show_config(cfg: &ProgressConfig, source: &Path) -> Result<()> {
    let toml = toml::to_string_pretty(cfg).context("serialize config")?;
    println!("# {}", source.display());
    print!("{}", toml);
    Ok(())
}
