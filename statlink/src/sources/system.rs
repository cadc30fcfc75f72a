//! Built-in host metrics.
//!
//! CPU, RAM and disk utilization need no external sensor source, so
//! they stay available even when everything else is down. CPU load is
//! a delta over `/proc/stat` jiffies between polls; the first sample
//! after startup reports zero.

use std::fs;
use std::path::PathBuf;

use nix::sys::statvfs::statvfs;
use statlink_common::metric::{CatalogEntry, SensorCategory, SensorKey, SystemMetricKind};

use super::SourceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CpuTimes {
    busy: u64,
    total: u64,
}

/// RAM usage snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RamInfo {
    pub percent: f64,
    pub used_gb: f64,
}

/// Reader for the built-in host metrics.
pub struct SystemMetrics {
    proc_root: PathBuf,
    disk_path: PathBuf,
    prev_cpu: Option<CpuTimes>,
}

impl SystemMetrics {
    pub fn new() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
            disk_path: PathBuf::from("/"),
            prev_cpu: None,
        }
    }

    /// Alternate proc root and disk mount, for tests.
    pub fn with_roots(proc_root: impl Into<PathBuf>, disk_path: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            disk_path: disk_path.into(),
            prev_cpu: None,
        }
    }

    /// Whole-machine CPU utilization since the previous call.
    pub fn cpu_percent(&mut self) -> Result<f64, SourceError> {
        let stat = fs::read_to_string(self.proc_root.join("stat"))?;
        let current = parse_cpu_line(&stat).ok_or_else(|| SourceError::Parse {
            what: "/proc/stat cpu line".to_string(),
        })?;
        let percent = match self.prev_cpu {
            Some(prev) if current.total > prev.total => {
                let busy = current.busy.saturating_sub(prev.busy) as f64;
                let total = (current.total - prev.total) as f64;
                (busy / total * 100.0).clamp(0.0, 100.0)
            }
            _ => 0.0,
        };
        self.prev_cpu = Some(current);
        Ok(percent)
    }

    pub fn ram(&self) -> Result<RamInfo, SourceError> {
        let meminfo = fs::read_to_string(self.proc_root.join("meminfo"))?;
        parse_meminfo(&meminfo).ok_or_else(|| SourceError::Parse {
            what: "/proc/meminfo".to_string(),
        })
    }

    /// Utilization of the filesystem holding `disk_path`.
    pub fn disk_percent(&self) -> Result<f64, SourceError> {
        let vfs = statvfs(&self.disk_path).map_err(|errno| SourceError::Unreachable {
            endpoint: self.disk_path.display().to_string(),
            detail: errno.to_string(),
        })?;
        let total = vfs.blocks() as f64;
        if total == 0.0 {
            return Err(SourceError::Parse {
                what: format!("statvfs on {} reports zero blocks", self.disk_path.display()),
            });
        }
        let used = total - vfs.blocks_available() as f64;
        Ok((used / total * 100.0).clamp(0.0, 100.0))
    }

    /// Read one metric by kind.
    pub fn read(&mut self, kind: SystemMetricKind) -> Result<f64, SourceError> {
        match kind {
            SystemMetricKind::CpuPercent => self.cpu_percent(),
            SystemMetricKind::RamPercent => Ok(self.ram()?.percent),
            SystemMetricKind::RamUsedGb => Ok(self.ram()?.used_gb),
            SystemMetricKind::DiskPercent => self.disk_percent(),
        }
    }

    /// The four fixed catalog entries these metrics contribute.
    pub fn catalog_entries(&mut self) -> Vec<CatalogEntry> {
        let entry = |kind, short: &str, label: &str, category, unit: &str, value: f64| {
            CatalogEntry {
                key: SensorKey::System { metric: kind },
                short_name: short.to_string(),
                label: label.to_string(),
                device: "System".to_string(),
                category,
                unit: unit.to_string(),
                value,
            }
        };
        let ram = self.ram().ok();
        vec![
            entry(
                SystemMetricKind::CpuPercent,
                "CPU",
                "Total CPU Usage",
                SensorCategory::Load,
                "%",
                self.cpu_percent().unwrap_or(0.0),
            ),
            entry(
                SystemMetricKind::RamPercent,
                "RAM",
                "Memory Usage",
                SensorCategory::Load,
                "%",
                ram.map(|r| r.percent).unwrap_or(0.0),
            ),
            entry(
                SystemMetricKind::RamUsedGb,
                "RAM_GB",
                "Memory Used",
                SensorCategory::Load,
                "GB",
                ram.map(|r| r.used_gb).unwrap_or(0.0),
            ),
            entry(
                SystemMetricKind::DiskPercent,
                "DISK",
                "Disk Usage",
                SensorCategory::Load,
                "%",
                self.disk_percent().unwrap_or(0.0),
            ),
        ]
    }
}

impl Default for SystemMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_cpu_line(stat: &str) -> Option<CpuTimes> {
    let line = stat.lines().find(|l| l.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .filter_map(|f| f.parse().ok())
        .collect();
    if fields.len() < 4 {
        return None;
    }
    let total: u64 = fields.iter().sum();
    // Fields 3 and 4 are idle and iowait.
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    Some(CpuTimes {
        busy: total - idle,
        total,
    })
}

fn parse_meminfo(meminfo: &str) -> Option<RamInfo> {
    let field = |name: &str| -> Option<u64> {
        meminfo
            .lines()
            .find(|l| l.starts_with(name))?
            .split_whitespace()
            .nth(1)?
            .parse()
            .ok()
    };
    let total_kb = field("MemTotal:")?;
    let available_kb = field("MemAvailable:")?;
    if total_kb == 0 {
        return None;
    }
    let used_kb = total_kb.saturating_sub(available_kb);
    Some(RamInfo {
        percent: used_kb as f64 / total_kb as f64 * 100.0,
        used_gb: used_kb as f64 / (1024.0 * 1024.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const STAT_T0: &str = "cpu  1000 0 500 8000 200 0 50 0 0 0\ncpu0 500 0 250 4000 100 0 25 0 0 0\n";
    const STAT_T1: &str = "cpu  1600 0 800 8400 200 0 50 0 0 0\ncpu0 800 0 400 4200 100 0 25 0 0 0\n";

    const MEMINFO: &str = "MemTotal:       16384000 kB\n\
                           MemFree:         2048000 kB\n\
                           MemAvailable:    8192000 kB\n\
                           Buffers:          512000 kB\n";

    #[test]
    fn cpu_delta_between_samples() {
        let t0 = parse_cpu_line(STAT_T0).unwrap();
        let t1 = parse_cpu_line(STAT_T1).unwrap();
        // Busy went 1550 -> 2450, total 9750 -> 11050.
        assert_eq!(t0.busy, 1550);
        assert_eq!(t1.total - t0.total, 1300);

        let busy = (t1.busy - t0.busy) as f64;
        let total = (t1.total - t0.total) as f64;
        let pct = busy / total * 100.0;
        assert!((pct - 69.23).abs() < 0.01);
    }

    #[test]
    fn first_cpu_sample_reports_zero() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("stat"), STAT_T0).unwrap();

        let mut sys = SystemMetrics::with_roots(dir.path(), "/");
        assert_eq!(sys.cpu_percent().unwrap(), 0.0);

        fs::write(dir.path().join("stat"), STAT_T1).unwrap();
        let pct = sys.cpu_percent().unwrap();
        assert!(pct > 0.0 && pct <= 100.0);
    }

    #[test]
    fn meminfo_percent_and_gigabytes() {
        let ram = parse_meminfo(MEMINFO).unwrap();
        assert!((ram.percent - 50.0).abs() < 0.01);
        assert!((ram.used_gb - 7.8125).abs() < 0.001);
    }

    #[test]
    fn meminfo_without_available_is_rejected() {
        assert!(parse_meminfo("MemTotal: 1000 kB\n").is_none());
    }

    #[test]
    fn disk_percent_on_root_is_sane() {
        let sys = SystemMetrics::new();
        let pct = sys.disk_percent().unwrap();
        assert!((0.0..=100.0).contains(&pct));
    }

    #[test]
    fn catalog_contributes_four_fixed_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("stat"), STAT_T0).unwrap();
        fs::write(dir.path().join("meminfo"), MEMINFO).unwrap();

        let mut sys = SystemMetrics::with_roots(dir.path(), "/");
        let entries = sys.catalog_entries();
        let names: Vec<_> = entries.iter().map(|e| e.short_name.as_str()).collect();
        assert_eq!(names, vec!["CPU", "RAM", "RAM_GB", "DISK"]);
        assert!(entries.iter().all(|e| e.category == SensorCategory::Load));
    }
}
