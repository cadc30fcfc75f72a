//! UDP telemetry emission.
//!
//! Exactly one packet per tick, no matter what the sources did. Send
//! failures are logged and swallowed: UDP to a display that may be
//! powered off is best-effort by definition, and a dead display must
//! not stall acquisition.

use statlink_common::packet::{LinkStatus, MetricPacket};
use tokio::net::UdpSocket;
use tracing::{debug, warn};

/// Classify the tick for the display's status indicator.
///
/// Freshness only counts reads from this tick; cached substitutions are
/// stale. A minority of stale metrics still reads as `Ok`, matching how
/// the display uses the indicator (is the link usable, not is it
/// perfect).
pub fn overall_status(started: bool, source_healthy: bool, fresh: usize, stale: usize) -> LinkStatus {
    if !started {
        return LinkStatus::SourceStarting;
    }
    if !source_healthy {
        return LinkStatus::SourceNotRunning;
    }
    if stale > fresh {
        return LinkStatus::ApiError;
    }
    LinkStatus::Ok
}

/// Sends metric packets to the display client.
pub struct TelemetryEmitter {
    socket: UdpSocket,
    destination: String,
}

impl TelemetryEmitter {
    /// Bind an ephemeral local socket aimed at `host:port`.
    pub async fn bind(host: &str, port: u16) -> std::io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        Ok(Self {
            socket,
            destination: format!("{host}:{port}"),
        })
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Serialize and send one packet. Never fails the caller.
    pub async fn send(&self, packet: &MetricPacket) {
        let payload = match serde_json::to_vec(packet) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "metric packet failed to serialize");
                return;
            }
        };
        match self.socket.send_to(&payload, &self.destination).await {
            Ok(sent) => {
                debug!(bytes = sent, status = packet.status, "packet sent");
            }
            Err(e) => {
                warn!(error = %e, destination = %self.destination, "packet send failed");
            }
        }
    }
}
