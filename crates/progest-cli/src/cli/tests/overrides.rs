use super::*;
use crate::cli::FormatArg;
use progest_core::config::{ProgressConfig, ReportFormat};

#[test]
fn global_flags_after_subcommand() {
    let cli = parse(&[
        "progest",
        "simulate",
        "--interval",
        "1",
        "--format",
        "json",
        "--no-progress",
    ]);
    assert_eq!(cli.overrides.interval, Some(1));
    assert_eq!(cli.overrides.format, Some(FormatArg::Json));
    assert!(cli.overrides.no_progress);
    assert!(!cli.overrides.dry_run);
}

#[test]
fn overrides_apply_on_top_of_config() {
    let cli = parse(&["progest", "--dry-run", "--interval", "9", "config"]);
    let mut cfg = ProgressConfig::default();
    cli.overrides.apply(&mut cfg);
    assert!(cfg.dry_run);
    assert!(cfg.enabled);
    assert_eq!(cfg.interval_secs, 9);
    assert_eq!(cfg.format, ReportFormat::Text);
}

#[test]
fn no_overrides_leave_config_alone() {
    let cli = parse(&["progest", "config"]);
    let mut cfg = ProgressConfig {
        interval_secs: 4,
        format: ReportFormat::Json,
        ..ProgressConfig::default()
    };
    cli.overrides.apply(&mut cfg);
    assert_eq!(cfg.interval_secs, 4);
    assert_eq!(cfg.format, ReportFormat::Json);
}

#[test]
fn zero_interval_parses_but_fails_validation() {
    let cli = parse(&["progest", "--interval", "0", "config"]);
    let mut cfg = ProgressConfig::default();
    cli.overrides.apply(&mut cfg);
    assert!(cfg.validate().is_err());
}
