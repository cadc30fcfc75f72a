//! Sensor discovery.
//!
//! One call enumerates everything configurable: the four built-in
//! system metrics plus whatever the best available external source
//! reports. The result is a complete catalog with session-unique short
//! names and the tag of the source that produced it. Discovery never
//! fails; with every external source dark it degrades to the system
//! entries and logs the troubleshooting checklist once.

use statlink_common::config::MonitorConfig;
use statlink_common::metric::{CatalogEntry, SensorKey, SourceTag};
use statlink_shm::{Reading, ReadingKind, SensorDevice, SnapshotReader};
use tracing::{debug, info};

use crate::catalog::{
    category_for_kind, category_for_type, normalize_unit, reclassify, short_name,
    short_name_for_path, CatalogBuilder,
};
use crate::sources::hwmon::{HwmonProvider, QueryRecord};
use crate::sources::log_source_checklist;
use crate::sources::rest::{RestProvider, RestSensor};
use crate::sources::system::SystemMetrics;

/// Discovery outcome handed to the GUI and the poller setup.
pub struct Discovery {
    pub entries: Vec<CatalogEntry>,
    /// Source that contributed the external entries.
    pub source: SourceTag,
    /// False when only system metrics are available.
    pub source_available: bool,
}

/// Enumerate all available sensors.
pub async fn discover(config: &MonitorConfig) -> Discovery {
    let mut builder = CatalogBuilder::new();
    let mut system = SystemMetrics::new();
    for entry in system.catalog_entries() {
        builder.push(
            entry.key,
            entry.short_name,
            entry.label,
            entry.device,
            entry.category,
            entry.unit,
            entry.value,
        );
    }

    match SnapshotReader::attach(&config.segment_name) {
        Ok(reader) => match reader.read_sensors().and_then(|s| {
            let r = reader.read_readings()?;
            Ok((s, r))
        }) {
            Ok((sensors, readings)) => {
                collect_shm_entries(&mut builder, &sensors, &readings);
                info!(readings = readings.len(), "discovery served by shared memory");
                return Discovery {
                    entries: builder.finish(),
                    source: SourceTag::Shm,
                    source_available: true,
                };
            }
            Err(e) => debug!(error = %e, "shared memory attach succeeded but read failed"),
        },
        Err(e) => debug!(error = %e, "shared memory unavailable for discovery"),
    }

    let mut provider = HwmonProvider::new();
    match provider.probe() {
        Ok(records) => {
            collect_query_entries(&mut builder, &records);
            info!(channels = records.len(), "discovery served by query provider");
            return Discovery {
                entries: builder.finish(),
                source: SourceTag::Query,
                source_available: true,
            };
        }
        Err(e) => debug!(error = %e, "query provider unavailable for discovery"),
    }

    match RestProvider::new(&config.rest_host, config.rest_port) {
        Ok(provider) => match provider.probe().await {
            Ok(sensors) => {
                collect_rest_entries(&mut builder, &sensors);
                info!(sensors = sensors.len(), "discovery served by rest endpoint");
                return Discovery {
                    entries: builder.finish(),
                    source: SourceTag::Rest,
                    source_available: true,
                };
            }
            Err(e) => debug!(error = %e, "rest endpoint unavailable for discovery"),
        },
        Err(e) => debug!(error = %e, "rest client setup failed"),
    }

    log_source_checklist(&config.segment_name, &config.rest_host, config.rest_port);
    Discovery {
        entries: builder.finish(),
        source: SourceTag::System,
        source_available: false,
    }
}

/// Catalog entries for shared-memory readings. `None`-kind rows are
/// placeholders the producer keeps for layout stability; skip them.
pub fn collect_shm_entries(
    builder: &mut CatalogBuilder,
    sensors: &[SensorDevice],
    readings: &[Reading],
) {
    for reading in readings {
        if reading.kind == ReadingKind::None {
            continue;
        }
        let device = sensors
            .get(reading.sensor_index as usize)
            .map(|s| s.name.clone())
            .unwrap_or_default();
        let category = reclassify(category_for_kind(reading.kind), &reading.label, &device);
        let name = short_name(&device, &reading.label, category);
        builder.push(
            SensorKey::Shm {
                reading_id: reading.id,
            },
            name,
            reading.label.clone(),
            device,
            category,
            normalize_unit(&reading.unit),
            reading.value,
        );
    }
}

/// Catalog entries for query-provider channels.
pub fn collect_query_entries(builder: &mut CatalogBuilder, records: &[QueryRecord]) {
    for record in records {
        let category = reclassify(record.category, &record.label, &record.path);
        let name = short_name_for_path(&record.path, &record.label, category);
        builder.push(
            SensorKey::Query {
                path: record.path.clone(),
            },
            name,
            record.label.clone(),
            record.device.clone(),
            category,
            record.unit.to_string(),
            record.value,
        );
    }
}

/// Catalog entries for REST tree leaves.
pub fn collect_rest_entries(builder: &mut CatalogBuilder, sensors: &[RestSensor]) {
    for sensor in sensors {
        let category = reclassify(
            category_for_type(&sensor.kind),
            &sensor.label,
            &sensor.sensor_id,
        );
        let name = short_name_for_path(&sensor.sensor_id, &sensor.label, category);
        builder.push(
            SensorKey::Rest {
                sensor_id: sensor.sensor_id.clone(),
            },
            name,
            sensor.label.clone(),
            sensor.sensor_id.clone(),
            category,
            normalize_unit(&sensor.unit),
            sensor.value,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statlink_common::consts::SHORT_NAME_MAX;
    use statlink_common::metric::SensorCategory;

    fn reading(id: u32, kind: ReadingKind, sensor_index: u32, label: &str, unit: &str) -> Reading {
        Reading {
            kind,
            sensor_index,
            id,
            label: label.to_string(),
            unit: unit.to_string(),
            value: 42.0,
            value_min: 0.0,
            value_max: 100.0,
            value_avg: 42.0,
        }
    }

    #[test]
    fn shm_entries_carry_device_and_category() {
        let sensors = vec![
            SensorDevice {
                id: 1,
                instance: 0,
                name: "AMD Ryzen 9 5900X".to_string(),
            },
            SensorDevice {
                id: 2,
                instance: 0,
                name: "NVIDIA GeForce RTX 3080".to_string(),
            },
        ];
        let readings = vec![
            reading(10, ReadingKind::Temperature, 0, "Core 0", "\u{b0}C"),
            reading(11, ReadingKind::Temperature, 1, "GPU Temperature", "\u{b0}C"),
            reading(12, ReadingKind::None, 0, "placeholder", ""),
        ];

        let mut builder = CatalogBuilder::new();
        collect_shm_entries(&mut builder, &sensors, &readings);
        let entries = builder.finish();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].short_name, "CPU_C0");
        assert_eq!(entries[0].unit, "C");
        assert_eq!(entries[0].category, SensorCategory::Temperature);
        assert_eq!(entries[1].device, "NVIDIA GeForce RTX 3080");
        assert!(matches!(entries[1].key, SensorKey::Shm { reading_id: 11 }));
    }

    #[test]
    fn shm_entry_with_out_of_range_sensor_index_still_lands() {
        let readings = vec![reading(10, ReadingKind::Fan, 9, "Fan #1", "RPM")];
        let mut builder = CatalogBuilder::new();
        collect_shm_entries(&mut builder, &[], &readings);
        let entries = builder.finish();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].device, "");
        assert_eq!(entries[0].short_name, "FAN1");
    }

    #[test]
    fn rest_entries_reclassify_memory_data() {
        let sensors = vec![
            RestSensor {
                sensor_id: "/ram/data/0".to_string(),
                label: "Memory Used".to_string(),
                kind: "Data".to_string(),
                value: 11.2,
                unit: "GB".to_string(),
            },
            RestSensor {
                sensor_id: "/nic/0/data/1".to_string(),
                label: "Data Uploaded".to_string(),
                kind: "Data".to_string(),
                value: 3.1,
                unit: "GB".to_string(),
            },
        ];

        let mut builder = CatalogBuilder::new();
        collect_rest_entries(&mut builder, &sensors);
        let entries = builder.finish();

        assert_eq!(entries[0].category, SensorCategory::Load);
        assert_eq!(entries[1].category, SensorCategory::Data);
        assert_eq!(entries[1].short_name, "NET_UL");
    }

    #[test]
    fn all_entries_are_unique_and_bounded() {
        let sensors: Vec<RestSensor> = (0..30)
            .map(|i| RestSensor {
                sensor_id: format!("/gpu-nvidia/0/temperature/{i}"),
                label: "GPU Core".to_string(),
                kind: "Temperature".to_string(),
                value: 1.0,
                unit: "\u{b0}C".to_string(),
            })
            .collect();

        let mut builder = CatalogBuilder::new();
        collect_rest_entries(&mut builder, &sensors);
        let entries = builder.finish();

        let mut seen = std::collections::HashSet::new();
        for e in &entries {
            assert!(e.short_name.chars().count() <= SHORT_NAME_MAX);
            assert!(seen.insert(e.short_name.clone()), "duplicate {}", e.short_name);
        }
    }
}
