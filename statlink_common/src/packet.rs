//! UDP wire payload.
//!
//! Every poll tick produces exactly one [`MetricPacket`], serialized as
//! JSON and sent to the display client. The client firmware renders the
//! link state from `status` and greys the clock when `timestamp` is
//! empty, so a packet goes out even when every source is down.

use serde::{Deserialize, Serialize};

use crate::consts::PAYLOAD_VERSION;

/// Overall link state as the display client understands it.
///
/// The numeric codes are part of the firmware contract and must never
/// be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LinkStatus {
    /// All configured metrics were read fresh this tick.
    Ok = 1,
    /// The source answered but a majority of metrics came from cache.
    ApiError = 2,
    /// No sensor source is reachable; system metrics only.
    SourceNotRunning = 3,
    /// Startup grace: discovery has not completed yet.
    SourceStarting = 4,
    /// State could not be classified.
    Unknown = 5,
}

impl LinkStatus {
    /// Wire code carried in the payload `status` field.
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// One metric row on the display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEntry {
    pub id: u8,
    pub name: String,
    pub value: i64,
    pub unit: String,
}

/// The versioned JSON payload sent over UDP each tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricPacket {
    pub version: String,
    /// [`LinkStatus`] wire code.
    pub status: u8,
    /// Local wall clock as `HH:MM`, or empty when not a single metric
    /// was read fresh this tick.
    pub timestamp: String,
    pub metrics: Vec<MetricEntry>,
}

impl MetricPacket {
    pub fn new(status: LinkStatus, timestamp: String, metrics: Vec<MetricEntry>) -> Self {
        Self {
            version: PAYLOAD_VERSION.to_string(),
            status: status.code(),
            timestamp,
            metrics,
        }
    }
}

/// Local wall clock formatted for the payload timestamp field.
pub fn local_clock() -> String {
    chrono::Local::now().format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_firmware_contract() {
        assert_eq!(LinkStatus::Ok.code(), 1);
        assert_eq!(LinkStatus::ApiError.code(), 2);
        assert_eq!(LinkStatus::SourceNotRunning.code(), 3);
        assert_eq!(LinkStatus::SourceStarting.code(), 4);
        assert_eq!(LinkStatus::Unknown.code(), 5);
    }

    #[test]
    fn packet_serializes_expected_shape() {
        let pkt = MetricPacket::new(
            LinkStatus::Ok,
            "14:05".to_string(),
            vec![MetricEntry {
                id: 1,
                name: "CPU".to_string(),
                value: 42,
                unit: "%".to_string(),
            }],
        );
        let json = serde_json::to_value(&pkt).unwrap();
        assert_eq!(json["version"], "2.0");
        assert_eq!(json["status"], 1);
        assert_eq!(json["timestamp"], "14:05");
        assert_eq!(json["metrics"][0]["id"], 1);
        assert_eq!(json["metrics"][0]["name"], "CPU");
        assert_eq!(json["metrics"][0]["value"], 42);
        assert_eq!(json["metrics"][0]["unit"], "%");
    }

    #[test]
    fn empty_timestamp_survives_round_trip() {
        let pkt = MetricPacket::new(LinkStatus::SourceNotRunning, String::new(), vec![]);
        let json = serde_json::to_string(&pkt).unwrap();
        let back: MetricPacket = serde_json::from_str(&json).unwrap();
        assert_eq!(back.timestamp, "");
        assert_eq!(back.status, 3);
        assert!(back.metrics.is_empty());
    }

    #[test]
    fn local_clock_is_hh_mm() {
        let ts = local_clock();
        assert_eq!(ts.len(), 5);
        assert_eq!(ts.as_bytes()[2], b':');
    }
}
