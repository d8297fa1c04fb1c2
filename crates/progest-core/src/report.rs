//! Progress report handed to the display sink, and its human-readable rendering.

use serde::Serialize;
use std::fmt;

/// One progress observation: completion, ETA, bytes sent, elapsed time and speed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Report {
    /// Estimated completion in [0, 100].
    pub percent_complete: f64,
    /// Projected seconds remaining.
    pub eta_seconds: u64,
    /// Bytes actually transferred so far.
    pub total_bytes: u64,
    /// Whole seconds since the first report.
    pub elapsed_seconds: u64,
    /// Smoothed throughput in bytes per second.
    pub speed_bytes_per_sec: f64,
    /// No byte-count activity for longer than the stall threshold.
    pub stalled: bool,
}

impl Report {
    /// Completion sentinel emitted once when the transfer finishes.
    pub fn completed(total_bytes: u64, elapsed_seconds: u64, speed_bytes_per_sec: f64) -> Self {
        Self {
            percent_complete: 100.0,
            eta_seconds: 0,
            total_bytes,
            elapsed_seconds,
            speed_bytes_per_sec,
            stalled: false,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}/s] {:.1}% ETA {}",
            format_bytes(self.total_bytes),
            format_clock(self.elapsed_seconds),
            format_bytes(self.speed_bytes_per_sec.max(0.0) as u64),
            self.percent_complete,
            format_eta(self.eta_seconds),
        )?;
        if self.stalled {
            write!(f, " (stalled)")?;
        }
        Ok(())
    }
}

/// Format bytes with binary units.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// `HH:MM:SS`; hours grow past two digits for very long runs.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Compact remaining-time string such as `1h2m5s`, `4m0s` or `12s`.
pub fn format_eta(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
    if h > 0 {
        format!("{h}h{m}m{s}s")
    } else if m > 0 {
        format!("{m}m{s}s")
    } else {
        format!("{s}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(1_048_576), "1.0 MiB");
        assert_eq!(format_bytes(1_099_511_627_776), "1.0 TiB");
    }

    #[test]
    fn test_format_times() {
        assert_eq!(format_clock(3725), "01:02:05");
        assert_eq!(format_eta(3725), "1h2m5s");
        assert_eq!(format_eta(240), "4m0s");
        assert_eq!(format_eta(12), "12s");
    }

    #[test]
    fn completed_sentinel() {
        let r = Report::completed(10, 4, 2.5);
        assert_eq!(r.percent_complete, 100.0);
        assert_eq!(r.eta_seconds, 0);
        assert!(!r.stalled);
    }

    #[test]
    fn display_marks_stall() {
        let r = Report {
            percent_complete: 42.0,
            eta_seconds: 90,
            total_bytes: 2048,
            elapsed_seconds: 61,
            speed_bytes_per_sec: 1024.0,
            stalled: true,
        };
        assert_eq!(
            r.to_string(),
            "2.0 KiB 00:01:01 [1.0 KiB/s] 42.0% ETA 1m30s (stalled)"
        );
    }
}
