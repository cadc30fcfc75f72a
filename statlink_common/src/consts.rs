//! System-wide constants for the StatLink workspace.
//!
//! Single source of truth for all numeric limits, timing parameters
//! and default paths. Imported by all crates, no duplication permitted.

/// Default name of the producer's sensor segment under `/dev/shm`.
pub const DEFAULT_SEGMENT_NAME: &str = "hwinfo_sens_sm2";

/// Default name of the producer's advisory lock file under `/dev/shm`.
pub const DEFAULT_LOCK_NAME: &str = "hwinfo_sens_sm2.lock";

/// Maximum number of metrics a display client accepts per payload.
pub const MAX_METRICS: usize = 20;

/// Hard upper bound on generated short metric names (display columns).
pub const SHORT_NAME_MAX: usize = 10;

/// Bound on waiting for the producer's lock before the poll is skipped.
pub const LOCK_TIMEOUT_MS: u64 = 500;

/// HTTP request timeout for the REST tree endpoint.
pub const HTTP_TIMEOUT_S: u64 = 3;

/// Upper bound on a single source read before the poll gives up on it.
pub const READ_TIMEOUT_MS: u64 = 2000;

/// Consecutive failed polls before the source is declared unhealthy.
pub const FAILURE_THRESHOLD: u32 = 2;

/// Initial reconnect backoff once a source is unhealthy.
pub const BACKOFF_FLOOR_S: u64 = 3;

/// Backoff ceiling; delays double up to this value.
pub const BACKOFF_CAP_S: u64 = 30;

/// Minimum spacing between repeated unhealthy-source warnings.
pub const WARN_WINDOW_S: u64 = 30;

/// Payload schema version carried in every UDP packet.
pub const PAYLOAD_VERSION: &str = "2.0";

/// Default UDP port the display client listens on.
pub const DEFAULT_UDP_PORT: u16 = 4210;

/// Default poll/emit interval in seconds.
pub const DEFAULT_UPDATE_INTERVAL_S: f64 = 3.0;

/// Default REST endpoint of the fallback HTTP/JSON tree provider.
pub const DEFAULT_REST_HOST: &str = "127.0.0.1";

/// Default port of the fallback HTTP/JSON tree provider.
pub const DEFAULT_REST_PORT: u16 = 8085;

/// Default monitor configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "statlink_config.json";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_consistent() {
        assert!(MAX_METRICS > 0 && MAX_METRICS <= 64);
        assert!(SHORT_NAME_MAX >= 4);
        assert!(LOCK_TIMEOUT_MS > 0);
        assert!(FAILURE_THRESHOLD >= 1);
        assert!(BACKOFF_FLOOR_S <= BACKOFF_CAP_S);
        assert!(DEFAULT_UPDATE_INTERVAL_S > 0.0);
    }

    #[test]
    fn timeouts_fit_inside_one_poll() {
        // A lock miss plus one source read must resolve within the
        // default poll interval, or ticks start piling up.
        let worst_ms = LOCK_TIMEOUT_MS + READ_TIMEOUT_MS;
        assert!((worst_ms as f64) / 1000.0 < DEFAULT_UPDATE_INTERVAL_S);
    }
}
