//! Acquisition sources and failover.
//!
//! Three external sources can serve sensor values, tried in a fixed
//! order: the shared-memory segment, the local query provider, the
//! HTTP/JSON tree endpoint. When all three are down the daemon keeps
//! running on built-in system metrics alone and retries on the health
//! monitor's backoff schedule.

pub mod hwmon;
pub mod rest;
pub mod system;

use statlink_common::config::MonitorConfig;
use statlink_common::metric::{ConfiguredMetric, SensorKey, SourceTag};
use statlink_shm::{ShmError, SnapshotReader};
use thiserror::Error;
use tracing::{debug, info, warn};

use hwmon::HwmonProvider;
use rest::RestProvider;
use system::SystemMetrics;

/// Errors from probing or reading an external source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source surface is not there at all.
    #[error("source unreachable at {endpoint}: {detail}")]
    Unreachable { endpoint: String, detail: String },

    /// The source answered but reported zero sensors. Treated as a
    /// failure: a monitoring backend with nothing to monitor is broken,
    /// not idle.
    #[error("source reachable but empty: {what}")]
    Empty { what: String },

    /// A previously discovered sensor is gone.
    #[error("sensor no longer present: {id}")]
    Missing { id: String },

    /// The source returned bytes we could not interpret.
    #[error("unparseable source data: {what}")]
    Parse { what: String },

    /// HTTP transport failure (includes the 3s request timeout).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Filesystem-level failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from reading one configured metric.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The metric's sensor is absent from a healthy source.
    #[error("metric sensor missing: {id}")]
    Missing { id: String },

    /// Shared-memory failure.
    #[error(transparent)]
    Shm(#[from] ShmError),

    /// Provider failure.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// No source is attached for this metric's key.
    #[error("no active source for {tag:?}")]
    NotAttached { tag: SourceTag },
}

/// Per-metric value access, abstracted for the poll loop.
pub trait MetricValueSource {
    /// Read one configured metric, rounded for the wire.
    async fn read_value(&mut self, metric: &ConfiguredMetric) -> Result<i64, ReadError>;

    /// Try to (re)establish an external source. Returns true when one
    /// came up.
    async fn try_reconnect(&mut self) -> bool;

    /// Tag of the currently attached source.
    fn active_source(&self) -> SourceTag;
}

/// The real source stack: shared memory, query provider, REST endpoint
/// and the always-on system metrics.
pub struct MetricSource {
    segment_name: String,
    rest_host: String,
    rest_port: u16,
    shm: Option<SnapshotReader>,
    query: Option<HwmonProvider>,
    rest: Option<RestProvider>,
    system: SystemMetrics,
    active: SourceTag,
}

impl MetricSource {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            segment_name: config.segment_name.clone(),
            rest_host: config.rest_host.clone(),
            rest_port: config.rest_port,
            shm: None,
            query: None,
            rest: None,
            system: SystemMetrics::new(),
            active: SourceTag::System,
        }
    }

    pub fn system(&mut self) -> &mut SystemMetrics {
        &mut self.system
    }

    fn detach_external(&mut self) {
        self.shm = None;
        self.query = None;
        self.rest = None;
        self.active = SourceTag::System;
    }

    async fn attach_any(&mut self) -> bool {
        self.detach_external();

        match SnapshotReader::attach(&self.segment_name) {
            Ok(reader) => {
                info!(segment = %self.segment_name, "attached shared-memory source");
                self.shm = Some(reader);
                self.active = SourceTag::Shm;
                return true;
            }
            Err(e) => debug!(segment = %self.segment_name, error = %e, "shared memory unavailable"),
        }

        let mut provider = HwmonProvider::new();
        match provider.probe() {
            Ok(records) => {
                info!(channels = records.len(), "attached query provider");
                self.query = Some(provider);
                self.active = SourceTag::Query;
                return true;
            }
            Err(e) => debug!(error = %e, "query provider unavailable"),
        }

        match RestProvider::new(&self.rest_host, self.rest_port) {
            Ok(provider) => match provider.probe().await {
                Ok(sensors) => {
                    info!(
                        endpoint = %format!("{}:{}", self.rest_host, self.rest_port),
                        sensors = sensors.len(),
                        "attached rest source"
                    );
                    self.rest = Some(provider);
                    self.active = SourceTag::Rest;
                    return true;
                }
                Err(e) => debug!(error = %e, "rest endpoint unavailable"),
            },
            Err(e) => debug!(error = %e, "rest client setup failed"),
        }

        false
    }

}

/// One ordered diagnostic checklist for a fully dark source stack.
/// Logged once per outage, not per poll.
pub fn log_source_checklist(segment_name: &str, rest_host: &str, rest_port: u16) {
    warn!("no sensor source available; running on system metrics only");
    warn!("  1. is the hardware monitor application running?");
    warn!("  2. is its shared-memory export enabled? (expected segment '/dev/shm/{segment_name}')");
    warn!("  3. are hwmon kernel drivers loaded? (ls /sys/class/hwmon)");
    warn!("  4. is the web server endpoint enabled and listening on {rest_host}:{rest_port}?");
    warn!("  5. is a firewall blocking local HTTP on that port?");
}

impl MetricValueSource for MetricSource {
    async fn read_value(&mut self, metric: &ConfiguredMetric) -> Result<i64, ReadError> {
        let value = match &metric.key {
            SensorKey::System { metric: kind } => self.system.read(*kind)?,
            SensorKey::Shm { reading_id } => {
                let reader = self.shm.as_ref().ok_or(ReadError::NotAttached {
                    tag: SourceTag::Shm,
                })?;
                reader
                    .reading_value(*reading_id)?
                    .ok_or_else(|| ReadError::Missing {
                        id: reading_id.to_string(),
                    })?
            }
            SensorKey::Query { path } => {
                let provider = self.query.as_ref().ok_or(ReadError::NotAttached {
                    tag: SourceTag::Query,
                })?;
                provider.read_value(path)?
            }
            SensorKey::Rest { sensor_id } => {
                let provider = self.rest.as_ref().ok_or(ReadError::NotAttached {
                    tag: SourceTag::Rest,
                })?;
                provider.read_value(sensor_id).await?
            }
        };
        Ok(value.round() as i64)
    }

    async fn try_reconnect(&mut self) -> bool {
        self.attach_any().await
    }

    fn active_source(&self) -> SourceTag {
        self.active
    }
}
