//! Common re-exports for StatLink crates.

pub use crate::config::{ConfigError, MonitorConfig};
pub use crate::metric::{
    CatalogEntry, ConfiguredMetric, SensorCategory, SensorKey, SourceTag, SystemMetricKind,
};
pub use crate::packet::{LinkStatus, MetricEntry, MetricPacket};
