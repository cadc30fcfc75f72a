//! Sensor catalog construction.
//!
//! Sources report labels like "GPU Memory Junction Temperature"; the
//! display renders ten fixed-width characters. This module owns the
//! whole mapping: category assignment, unit normalization, short-name
//! generation and session-wide uniqueness.
//!
//! Naming is deterministic: the same label, device and category always
//! produce the same short name, so a saved config keeps matching what
//! discovery shows.

use std::collections::HashSet;

use statlink_common::consts::SHORT_NAME_MAX;
use statlink_common::metric::{CatalogEntry, SensorCategory, SensorKey};
use statlink_shm::ReadingKind;

/// Keyword table mapping device names to short prefixes.
const DEVICE_PREFIXES: &[(&str, &str)] = &[
    ("cpu", "CPU"),
    ("ryzen", "CPU"),
    ("core i", "CPU"),
    ("gpu", "GPU"),
    ("nvidia", "GPU"),
    ("geforce", "GPU"),
    ("radeon", "GPU"),
    ("nvme", "NVM"),
    ("ssd", "SSD"),
    ("hdd", "HDD"),
    ("motherboard", "MB"),
    ("mainboard", "MB"),
    ("lpc", "MB"),
    ("ethernet", "NET"),
    ("wi-fi", "NET"),
    ("wifi", "NET"),
    ("network", "NET"),
    ("nic", "NET"),
    ("memory", "RAM"),
    ("dimm", "RAM"),
];

/// Prefix for a device name, if any keyword matches.
pub fn device_prefix(device: &str) -> Option<&'static str> {
    let d = device.to_lowercase();
    DEVICE_PREFIXES
        .iter()
        .find(|(kw, _)| d.contains(kw))
        .map(|(_, p)| *p)
}

/// Category of a shared-memory reading kind.
pub fn category_for_kind(kind: ReadingKind) -> SensorCategory {
    match kind {
        ReadingKind::Temperature => SensorCategory::Temperature,
        ReadingKind::Voltage => SensorCategory::Voltage,
        ReadingKind::Fan => SensorCategory::Fan,
        ReadingKind::Current => SensorCategory::Current,
        ReadingKind::Power => SensorCategory::Power,
        ReadingKind::Clock => SensorCategory::Clock,
        ReadingKind::Usage => SensorCategory::Load,
        ReadingKind::None | ReadingKind::Other => SensorCategory::Other,
    }
}

/// Category of a REST tree `Type` string.
pub fn category_for_type(kind: &str) -> SensorCategory {
    match kind.to_lowercase().as_str() {
        "temperature" => SensorCategory::Temperature,
        "voltage" => SensorCategory::Voltage,
        "fan" => SensorCategory::Fan,
        "current" => SensorCategory::Current,
        "power" => SensorCategory::Power,
        "clock" => SensorCategory::Clock,
        "load" | "level" => SensorCategory::Load,
        "data" | "smalldata" => SensorCategory::Data,
        "throughput" => SensorCategory::Throughput,
        _ => SensorCategory::Other,
    }
}

/// Fix up upstream mis-tagging: memory and VRAM usage readings arrive
/// in the generic data bucket but describe utilization.
pub fn reclassify(category: SensorCategory, label: &str, context: &str) -> SensorCategory {
    if category == SensorCategory::Data {
        let l = label.to_lowercase();
        let c = context.to_lowercase();
        if l.contains("memory") || l.contains("vram") || c.contains("memory") || c.contains("ram")
        {
            return SensorCategory::Load;
        }
    }
    category
}

/// Normalize a source unit to at most 4 display characters.
pub fn normalize_unit(raw: &str) -> String {
    let unit = match raw.trim() {
        "\u{b0}C" => "C",
        "\u{b0}F" => "F",
        "Yes/No" => "",
        other => other,
    };
    unit.chars().take(4).collect()
}

/// Generate a short name for a labelled reading.
///
/// Category-specific rules fire first (core numbers, rails, fan
/// numbers); anything unmatched falls back to a scrubbed, prefixed,
/// truncated form of the label. Always 1..=10 characters.
pub fn short_name(device: &str, label: &str, category: SensorCategory) -> String {
    let l = label.to_lowercase();
    let prefix = device_prefix(device);

    // Frame counters show up under several categories.
    if l.contains("framerate") || l.contains("fps") {
        return "FPS".to_string();
    }

    let named = match category {
        SensorCategory::Temperature => temperature_name(&l, prefix),
        SensorCategory::Voltage => voltage_name(&l),
        SensorCategory::Fan => fan_name(&l),
        SensorCategory::Load => load_name(&l, prefix),
        SensorCategory::Power => power_name(&l, prefix),
        SensorCategory::Clock => clock_name(&l, prefix),
        _ => None,
    };

    named.unwrap_or_else(|| fallback_name(prefix, label))
}

/// Generate a short name from a slash-path identifier, as the query and
/// REST providers report them (`/gpu-nvidia/0/temperature/2`).
///
/// Network rate readings are addressed purely by numeric sub-index
/// upstream, and the two families disagree on direction order:
/// throughput counts upload first, data volume counts download first.
pub fn short_name_for_path(path: &str, label: &str, category: SensorCategory) -> String {
    let device_seg = path.split('/').find(|s| !s.is_empty()).unwrap_or("");
    let sub_index: Option<u32> = path.rsplit('/').next().and_then(|s| s.parse().ok());

    if device_prefix(device_seg) == Some("NET") {
        match (category, sub_index) {
            (SensorCategory::Throughput, Some(0)) => return "NET_UP".to_string(),
            (SensorCategory::Throughput, Some(1)) => return "NET_DOWN".to_string(),
            (SensorCategory::Data, Some(0)) => return "NET_DL".to_string(),
            (SensorCategory::Data, Some(1)) => return "NET_UL".to_string(),
            _ => {}
        }
    }

    let device = if device_prefix(device_seg).is_some() {
        device_seg
    } else {
        ""
    };
    short_name(device, label, category)
}

fn digits_after(l: &str, keyword: &str) -> Option<u32> {
    let rest = &l[l.find(keyword)? + keyword.len()..];
    let digits: String = rest
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn first_digits(l: &str) -> Option<u32> {
    let digits: String = l
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn temperature_name(l: &str, prefix: Option<&str>) -> Option<String> {
    if l.contains("hot spot") || l.contains("hotspot") {
        return Some("GPU_HOT".to_string());
    }
    if let Some(n) = digits_after(l, "core") {
        let p = prefix.unwrap_or("CPU");
        return Some(format!("{p}_C{n}"));
    }
    if l.contains("tctl") || l.contains("tdie") || l.contains("package") || l.contains("cpu") {
        return Some("CPU".to_string());
    }
    if l.contains("gpu") {
        return Some("GPU".to_string());
    }
    if l.contains("vrm") {
        return Some("VRM".to_string());
    }
    None
}

fn voltage_name(l: &str) -> Option<String> {
    if l.contains("vcore") || l == "core" {
        return Some("VCORE".to_string());
    }
    if l.contains("+12") || l.contains("12v") {
        return Some("12V".to_string());
    }
    if l.contains("3.3") || l.contains("3,3") {
        return Some("3V3".to_string());
    }
    if l.contains("+5") || l.contains("5v") {
        return Some("5V".to_string());
    }
    if l.contains("soc") {
        return Some("VSOC".to_string());
    }
    if l.contains("vddcr") {
        return Some("VDDCR".to_string());
    }
    if l.contains("dimm") || l.contains("dram") {
        return Some("VDIMM".to_string());
    }
    None
}

fn fan_name(l: &str) -> Option<String> {
    if l.contains("pump") {
        return Some("PUMP".to_string());
    }
    let n = first_digits(l);
    let num = n.map(|n| n.to_string()).unwrap_or_default();
    if l.contains("cpu") {
        return Some("CPU_FAN".to_string());
    }
    if l.contains("gpu") {
        return Some(format!("GPU_FAN{num}"));
    }
    if l.contains("chassis") {
        return Some(format!("CHS_FAN{num}"));
    }
    if l.contains("system") {
        return Some(format!("SYS_FAN{num}"));
    }
    if l.contains("fan") {
        return Some(format!("FAN{num}"));
    }
    None
}

fn load_name(l: &str, prefix: Option<&str>) -> Option<String> {
    if l.contains("gpu") && (l.contains("memory") || l.contains("vram")) {
        return Some("GPU_MEM".to_string());
    }
    if l.contains("gpu") && l.contains("video") {
        return Some("GPU_VID".to_string());
    }
    if l.contains("gpu") {
        return Some("GPU_CORE".to_string());
    }
    if l.contains("vram") {
        return Some("VRAM".to_string());
    }
    if l.contains("memory") || l.contains("ram") {
        return Some("RAM".to_string());
    }
    if l.contains("total cpu") || l == "cpu usage" || l.contains("cpu") {
        return Some("CPU".to_string());
    }
    if prefix == Some("GPU") {
        return Some("GPU_CORE".to_string());
    }
    None
}

fn power_name(l: &str, prefix: Option<&str>) -> Option<String> {
    if l.contains("gpu") || prefix == Some("GPU") {
        return Some("GPU_PWR".to_string());
    }
    if l.contains("cpu") || l.contains("package") || prefix == Some("CPU") {
        return Some("CPU_PWR".to_string());
    }
    None
}

fn clock_name(l: &str, prefix: Option<&str>) -> Option<String> {
    let gpu = l.contains("gpu") || prefix == Some("GPU");
    if gpu && l.contains("memory") {
        return Some("MEM_CLK".to_string());
    }
    if gpu {
        return Some("GPU_CLK".to_string());
    }
    if l.contains("cpu") || l.contains("core") || prefix == Some("CPU") {
        return Some("CPU_CLK".to_string());
    }
    if l.contains("memory") || l.contains("dram") {
        return Some("MEM_CLK".to_string());
    }
    None
}

fn fallback_name(prefix: Option<&str>, label: &str) -> String {
    let combined = match prefix {
        Some(p) if !label.to_uppercase().starts_with(p) => format!("{p} {label}"),
        _ => label.to_string(),
    };
    scrub(&combined)
}

/// Scrub a free-form label into the display charset and length.
fn scrub(label: &str) -> String {
    let upper = label.to_uppercase().replace(['/', '\\', '-'], " ");
    let mut s: String = upper.split_whitespace().collect::<Vec<_>>().join("_");
    s.retain(|c| c.is_ascii_alphanumeric() || c == '_');
    if s.chars().count() > SHORT_NAME_MAX {
        // Dropping separators buys room before the hard cut.
        s.retain(|c| c != '_');
    }
    s.truncate(SHORT_NAME_MAX);
    if s.is_empty() {
        s.push_str("SENSOR");
    }
    s
}

/// Accumulates catalog entries, keeping short names unique per session.
#[derive(Default)]
pub struct CatalogBuilder {
    used: HashSet<String>,
    entries: Vec<CatalogEntry>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, resolving short-name collisions with a numeric
    /// suffix. The suffixed name still fits the display bound.
    #[allow(clippy::too_many_arguments)]
    pub fn push(
        &mut self,
        key: SensorKey,
        short_name: String,
        label: String,
        device: String,
        category: SensorCategory,
        unit: String,
        value: f64,
    ) {
        let short_name = self.unique(short_name);
        self.used.insert(short_name.clone());
        self.entries.push(CatalogEntry {
            key,
            short_name,
            label,
            device,
            category,
            unit,
            value,
        });
    }

    fn unique(&self, candidate: String) -> String {
        if !self.used.contains(&candidate) {
            return candidate;
        }
        for n in 2u32.. {
            let suffix = n.to_string();
            let keep = SHORT_NAME_MAX - suffix.len();
            let base: String = candidate.chars().take(keep).collect();
            let next = format!("{base}{suffix}");
            if !self.used.contains(&next) {
                return next;
            }
        }
        unreachable!("collision counter exhausted");
    }

    pub fn finish(self) -> Vec<CatalogEntry> {
        self.entries
    }
}
