//! Free disk space monitoring

use chrono::{DateTime, Duration, Utc};
use std::path::Path;
use sysinfo::Disks;
use vigil_telemetry::Severity;

/// Outcome of one disk check
#[derive(Debug, Clone, PartialEq)]
pub enum DiskStatus {
    Healthy { free_gb: f64 },
    Low { severity: Severity, free_gb: f64 },
    /// Query failed; classification skipped this cycle
    Unknown,
}

/// Two-threshold classifier over free gigabytes. No hysteresis: the monitor
/// re-fires every interval while the condition holds.
pub fn classify_free_space(free_gb: f64, warn_gb: f64, critical_gb: f64) -> DiskStatus {
    if free_gb < critical_gb {
        DiskStatus::Low {
            severity: Severity::Critical,
            free_gb,
        }
    } else if free_gb < warn_gb {
        DiskStatus::Low {
            severity: Severity::Warn,
            free_gb,
        }
    } else {
        DiskStatus::Healthy { free_gb }
    }
}

/// Polls root filesystem free space on its own interval, independent of log
/// growth.
pub struct DiskMonitor {
    interval: Duration,
    warn_gb: f64,
    critical_gb: f64,
    last_check: Option<DateTime<Utc>>,
}

impl DiskMonitor {
    pub fn new(interval: Duration, warn_gb: f64, critical_gb: f64) -> Self {
        Self {
            interval,
            warn_gb,
            critical_gb,
            last_check: None,
        }
    }

    /// True when enough time has passed since the last check (always true on
    /// the first call)
    pub fn due(&self, now: DateTime<Utc>) -> bool {
        match self.last_check {
            Some(last) => now.signed_duration_since(last) >= self.interval,
            None => true,
        }
    }

    /// Query free space and classify it
    pub fn check(&mut self, now: DateTime<Utc>) -> DiskStatus {
        self.last_check = Some(now);
        match root_free_gb() {
            Some(free_gb) => classify_free_space(free_gb, self.warn_gb, self.critical_gb),
            None => DiskStatus::Unknown,
        }
    }
}

fn root_free_gb() -> Option<f64> {
    let disks = Disks::new_with_refreshed_list();
    let root = disks
        .list()
        .iter()
        .find(|disk| disk.mount_point() == Path::new("/"))
        .or_else(|| disks.list().first())?;

    Some(root.available_space() as f64 / 1_000_000_000.0)
}
