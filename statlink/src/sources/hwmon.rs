//! Local query provider over the kernel hwmon class.
//!
//! Enumerates `/sys/class/hwmon/hwmon*` channels into records addressed
//! by a stable slash path, `/{chip}/{instance}/{prefix}/{channel}`.
//! A host without loaded hwmon drivers exposes the class directory but
//! zero channels; that counts as a probe failure, not an empty success,
//! so the selector moves on to the next source.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use statlink_common::metric::SensorCategory;
use tracing::debug;

use super::SourceError;

/// One enumerated hwmon channel.
#[derive(Debug, Clone)]
pub struct QueryRecord {
    /// Stable identifier, `/{chip}/{instance}/{prefix}/{channel}`.
    pub path: String,
    pub label: String,
    /// Chip name as the driver reports it ("k10temp", "nvme"...).
    pub device: String,
    pub category: SensorCategory,
    pub unit: &'static str,
    pub value: f64,
}

struct Channel {
    file: PathBuf,
    scale: f64,
}

/// Enumerator and reader for hwmon sysfs channels.
pub struct HwmonProvider {
    root: PathBuf,
    index: HashMap<String, Channel>,
}

impl HwmonProvider {
    pub fn new() -> Self {
        Self::with_root("/sys/class/hwmon")
    }

    /// Use an alternate class root (tests build one under a tempdir).
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index: HashMap::new(),
        }
    }

    /// Enumerate every readable channel.
    ///
    /// Errors with [`SourceError::Empty`] when the class exists but no
    /// channel is readable.
    pub fn probe(&mut self) -> Result<Vec<QueryRecord>, SourceError> {
        if !self.root.is_dir() {
            return Err(SourceError::Unreachable {
                endpoint: self.root.display().to_string(),
                detail: "hwmon class not present".to_string(),
            });
        }

        self.index.clear();
        let mut records = Vec::new();
        let mut instances: HashMap<String, u32> = HashMap::new();

        let mut dirs: Vec<PathBuf> = fs::read_dir(&self.root)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .collect();
        dirs.sort();

        for dir in dirs {
            let chip = match fs::read_to_string(dir.join("name")) {
                Ok(name) => name.trim().to_string(),
                Err(_) => continue,
            };
            let instance = {
                let n = instances.entry(chip.clone()).or_insert(0);
                let current = *n;
                *n += 1;
                current
            };
            self.scan_chip(&dir, &chip, instance, &mut records);
        }

        if records.is_empty() {
            return Err(SourceError::Empty {
                what: format!("hwmon class at {}", self.root.display()),
            });
        }
        debug!(count = records.len(), "hwmon probe complete");
        Ok(records)
    }

    fn scan_chip(&mut self, dir: &Path, chip: &str, instance: u32, out: &mut Vec<QueryRecord>) {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(_) => return,
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Some((prefix, channel)) = split_channel_input(name) else {
                continue;
            };
            let Some((category, unit, scale)) = channel_kind(prefix) else {
                continue;
            };
            let Ok(raw) = read_channel(&entry.path(), scale) else {
                continue;
            };

            let label_file = dir.join(format!("{prefix}{channel}_label"));
            let label = fs::read_to_string(&label_file)
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|_| format!("{chip} {prefix}{channel}"));

            let path = format!("/{chip}/{instance}/{prefix}/{channel}");
            self.index.insert(
                path.clone(),
                Channel {
                    file: entry.path(),
                    scale,
                },
            );
            out.push(QueryRecord {
                path,
                label,
                device: chip.to_string(),
                category,
                unit,
                value: raw,
            });
        }
    }

    /// Read one channel by its slash path. The path must have appeared
    /// in the last probe.
    pub fn read_value(&self, path: &str) -> Result<f64, SourceError> {
        let channel = self.index.get(path).ok_or_else(|| SourceError::Missing {
            id: path.to_string(),
        })?;
        read_channel(&channel.file, channel.scale)
    }
}

impl Default for HwmonProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn read_channel(file: &Path, scale: f64) -> Result<f64, SourceError> {
    let raw = fs::read_to_string(file)?;
    let v: f64 = raw.trim().parse().map_err(|_| SourceError::Parse {
        what: format!("{}: {:?}", file.display(), raw.trim()),
    })?;
    Ok(v * scale)
}

/// Split a `<prefix><n>_input` file name into its parts.
fn split_channel_input(name: &str) -> Option<(&str, u32)> {
    let stem = name.strip_suffix("_input")?;
    let digits_at = stem.find(|c: char| c.is_ascii_digit())?;
    let (prefix, digits) = stem.split_at(digits_at);
    Some((prefix, digits.parse().ok()?))
}

/// Category, display unit and raw-value scale for an hwmon prefix.
fn channel_kind(prefix: &str) -> Option<(SensorCategory, &'static str, f64)> {
    match prefix {
        "temp" => Some((SensorCategory::Temperature, "C", 1e-3)),
        "in" => Some((SensorCategory::Voltage, "V", 1e-3)),
        "fan" => Some((SensorCategory::Fan, "RPM", 1.0)),
        "curr" => Some((SensorCategory::Current, "A", 1e-3)),
        "power" => Some((SensorCategory::Power, "W", 1e-6)),
        "freq" => Some((SensorCategory::Clock, "MHz", 1e-6)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_chip(root: &Path, dir: &str, name: &str, files: &[(&str, &str)]) {
        let chip_dir = root.join(dir);
        fs::create_dir_all(&chip_dir).unwrap();
        fs::write(chip_dir.join("name"), format!("{name}\n")).unwrap();
        for (file, contents) in files {
            fs::write(chip_dir.join(file), contents).unwrap();
        }
    }

    #[test]
    fn probe_enumerates_channels() {
        let dir = tempfile::tempdir().unwrap();
        write_chip(
            dir.path(),
            "hwmon0",
            "k10temp",
            &[("temp1_input", "62500\n"), ("temp1_label", "Tctl\n")],
        );
        write_chip(dir.path(), "hwmon1", "nvme", &[("temp1_input", "41850\n")]);

        let mut provider = HwmonProvider::with_root(dir.path());
        let mut records = provider.probe().unwrap();
        records.sort_by(|a, b| a.path.cmp(&b.path));

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].path, "/k10temp/0/temp/1");
        assert_eq!(records[0].label, "Tctl");
        assert_eq!(records[0].value, 62.5);
        assert_eq!(records[0].unit, "C");
        assert_eq!(records[1].device, "nvme");
        assert_eq!(records[1].value, 41.85);
    }

    #[test]
    fn duplicate_chips_get_instance_numbers() {
        let dir = tempfile::tempdir().unwrap();
        write_chip(dir.path(), "hwmon0", "nvme", &[("temp1_input", "40000\n")]);
        write_chip(dir.path(), "hwmon1", "nvme", &[("temp1_input", "45000\n")]);

        let mut provider = HwmonProvider::with_root(dir.path());
        let mut paths: Vec<_> = provider
            .probe()
            .unwrap()
            .into_iter()
            .map(|r| r.path)
            .collect();
        paths.sort();
        assert_eq!(paths, vec!["/nvme/0/temp/1", "/nvme/1/temp/1"]);
    }

    #[test]
    fn present_but_empty_class_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = HwmonProvider::with_root(dir.path());
        assert!(matches!(
            provider.probe().unwrap_err(),
            SourceError::Empty { .. }
        ));
    }

    #[test]
    fn missing_class_is_unreachable() {
        let mut provider = HwmonProvider::with_root("/nonexistent/hwmon");
        assert!(matches!(
            provider.probe().unwrap_err(),
            SourceError::Unreachable { .. }
        ));
    }

    #[test]
    fn read_value_uses_the_probe_index() {
        let dir = tempfile::tempdir().unwrap();
        write_chip(dir.path(), "hwmon0", "k10temp", &[("temp1_input", "50000\n")]);

        let mut provider = HwmonProvider::with_root(dir.path());
        provider.probe().unwrap();

        assert_eq!(provider.read_value("/k10temp/0/temp/1").unwrap(), 50.0);
        assert!(matches!(
            provider.read_value("/k10temp/0/temp/9").unwrap_err(),
            SourceError::Missing { .. }
        ));
    }

    #[test]
    fn scales_follow_hwmon_conventions() {
        assert_eq!(channel_kind("power").unwrap().2, 1e-6);
        assert_eq!(channel_kind("fan").unwrap().2, 1.0);
        assert!(channel_kind("pwm").is_none());
    }
}
