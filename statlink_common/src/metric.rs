//! Sensor identity and catalog types.
//!
//! A sensor is addressed by a [`SensorKey`]: a closed, source-tagged
//! variant that replaces the loose string dispatch older monitor builds
//! used ("hwinfo_reading_id", "wmi_path", ...). Adding a source means
//! adding a variant here and handling it everywhere the compiler points.

use serde::{Deserialize, Serialize};

/// Which acquisition backend a sensor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    /// Built-in system metrics (procfs, statvfs). Always available.
    System,
    /// The producer's shared-memory sensor segment.
    Shm,
    /// The local query provider (hwmon enumeration).
    Query,
    /// The HTTP/JSON tree endpoint.
    Rest,
}

impl SourceTag {
    /// Human-readable name used in logs and the discovery dump.
    pub fn label(self) -> &'static str {
        match self {
            SourceTag::System => "system",
            SourceTag::Shm => "shared memory",
            SourceTag::Query => "query provider",
            SourceTag::Rest => "rest endpoint",
        }
    }
}

/// One of the four built-in host metrics that need no external source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemMetricKind {
    /// Whole-machine CPU utilization in percent.
    CpuPercent,
    /// RAM utilization in percent.
    RamPercent,
    /// RAM in use, gigabytes.
    RamUsedGb,
    /// Root filesystem utilization in percent.
    DiskPercent,
}

/// Stable address of one sensor reading, tagged by its source.
///
/// Serialized internally-tagged so a configured metric carries its
/// routing information inline:
///
/// ```json
/// { "source": "shm", "reading_id": 134217730 }
/// { "source": "rest", "sensor_id": "/amdcpu/0/temperature/2" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SensorKey {
    /// Built-in host metric.
    System { metric: SystemMetricKind },
    /// Reading id inside the shared-memory segment.
    Shm { reading_id: u32 },
    /// Slash path of a query-provider channel, e.g. `/k10temp/0/temp/1`.
    Query { path: String },
    /// Sensor id of a node in the REST tree.
    Rest { sensor_id: String },
}

impl SensorKey {
    pub fn source(&self) -> SourceTag {
        match self {
            SensorKey::System { .. } => SourceTag::System,
            SensorKey::Shm { .. } => SourceTag::Shm,
            SensorKey::Query { .. } => SourceTag::Query,
            SensorKey::Rest { .. } => SourceTag::Rest,
        }
    }
}

/// Physical quantity a sensor measures. Drives name suffixes and the
/// discovery dump grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorCategory {
    Temperature,
    Voltage,
    Fan,
    Current,
    Power,
    Clock,
    Load,
    /// Cumulative or absolute data volume (GB read, VRAM committed...).
    Data,
    /// Rate-of-transfer readings (network up/down, disk I/O).
    Throughput,
    Other,
}

impl std::fmt::Display for SensorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SensorCategory::Temperature => "temperature",
            SensorCategory::Voltage => "voltage",
            SensorCategory::Fan => "fan",
            SensorCategory::Current => "current",
            SensorCategory::Power => "power",
            SensorCategory::Clock => "clock",
            SensorCategory::Load => "load",
            SensorCategory::Data => "data",
            SensorCategory::Throughput => "throughput",
            SensorCategory::Other => "other",
        };
        f.write_str(s)
    }
}

/// One discovered sensor as presented to the configuration GUI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Routing key for later polling.
    #[serde(flatten)]
    pub key: SensorKey,
    /// Generated short name, unique within the session, at most
    /// [`SHORT_NAME_MAX`](crate::consts::SHORT_NAME_MAX) characters.
    pub short_name: String,
    /// Original sensor label as the source reports it.
    pub label: String,
    /// Owning device name ("AMD Ryzen 9 5900X", "nvme0"...).
    pub device: String,
    pub category: SensorCategory,
    /// Normalized display unit, at most 4 characters.
    pub unit: String,
    /// Value sampled at discovery time, for preview in the GUI.
    pub value: f64,
}

/// One metric slot the user configured for emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfiguredMetric {
    /// Display slot id, 1-based, unique per config.
    pub id: u8,
    /// Generated short name from the catalog.
    pub name: String,
    pub unit: String,
    #[serde(flatten)]
    pub key: SensorKey,
    /// User override for the display name, same length budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_label: Option<String>,
    /// Links an upload metric to its download companion so the display
    /// can render them as one row. Opaque to the daemon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub companion_id: Option<u8>,
}

impl ConfiguredMetric {
    /// Name to put on the wire: the custom label when set and
    /// non-blank, the generated short name otherwise.
    pub fn display_name(&self) -> &str {
        self.custom_label
            .as_deref()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or(&self.name)
    }
}
