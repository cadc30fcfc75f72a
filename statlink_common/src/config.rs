//! Monitor configuration.
//!
//! The configuration file is JSON, written by the companion GUI and
//! consumed read-only here. Loading is a strict pipeline: read, parse,
//! validate. A config that parses but violates a limit (too many
//! metrics, duplicate slot ids) is rejected up front rather than
//! producing a payload the display client will truncate.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_REST_HOST, DEFAULT_REST_PORT, DEFAULT_SEGMENT_NAME, DEFAULT_UDP_PORT,
    DEFAULT_UPDATE_INTERVAL_S, MAX_METRICS, SHORT_NAME_MAX,
};
use crate::metric::ConfiguredMetric;

/// Errors produced while loading or validating the monitor config.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {reason}")]
    Validation { reason: String },
}

fn default_version() -> String {
    "2.0".to_string()
}

fn default_udp_port() -> u16 {
    DEFAULT_UDP_PORT
}

fn default_interval() -> f64 {
    DEFAULT_UPDATE_INTERVAL_S
}

fn default_rest_host() -> String {
    DEFAULT_REST_HOST.to_string()
}

fn default_rest_port() -> u16 {
    DEFAULT_REST_PORT
}

fn default_segment_name() -> String {
    DEFAULT_SEGMENT_NAME.to_string()
}

/// Top-level monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_version")]
    pub version: String,
    /// Display client address (hostname or IP).
    pub host: String,
    #[serde(default = "default_udp_port")]
    pub udp_port: u16,
    /// Poll/emit cadence in seconds.
    #[serde(default = "default_interval")]
    pub update_interval_s: f64,
    #[serde(default = "default_rest_host")]
    pub rest_host: String,
    #[serde(default = "default_rest_port")]
    pub rest_port: u16,
    #[serde(default = "default_segment_name")]
    pub segment_name: String,
    #[serde(default)]
    pub metrics: Vec<ConfiguredMetric>,
}

impl MonitorConfig {
    /// Read, parse and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: MonitorConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check limits the parser cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Validation {
                reason: "host must not be empty".to_string(),
            });
        }
        if self.udp_port == 0 {
            return Err(ConfigError::Validation {
                reason: "udp_port must not be 0".to_string(),
            });
        }
        if !(self.update_interval_s >= 1.0 && self.update_interval_s <= 60.0) {
            return Err(ConfigError::Validation {
                reason: format!(
                    "update_interval_s {} outside [1.0, 60.0]",
                    self.update_interval_s
                ),
            });
        }
        if self.metrics.len() > MAX_METRICS {
            return Err(ConfigError::Validation {
                reason: format!(
                    "{} metrics configured, display accepts at most {MAX_METRICS}",
                    self.metrics.len()
                ),
            });
        }
        let mut seen = std::collections::HashSet::new();
        for m in &self.metrics {
            if m.id == 0 {
                return Err(ConfigError::Validation {
                    reason: "metric ids start at 1".to_string(),
                });
            }
            if m.name.trim().is_empty() {
                return Err(ConfigError::Validation {
                    reason: format!("metric {} has an empty name", m.id),
                });
            }
            if let Some(label) = &m.custom_label
                && label.chars().count() > SHORT_NAME_MAX
            {
                return Err(ConfigError::Validation {
                    reason: format!(
                        "metric {} label {label:?} exceeds {SHORT_NAME_MAX} characters",
                        m.id
                    ),
                });
            }
            if !seen.insert(m.id) {
                return Err(ConfigError::Validation {
                    reason: format!("duplicate metric id {}", m.id),
                });
            }
        }
        Ok(())
    }

    /// Poll cadence as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.update_interval_s)
    }
}
