//! Source health tracking and reconnect backoff.
//!
//! A single failed poll is noise (producer mid-update, lock held a
//! beat too long); two in a row means the source is gone. Once
//! unhealthy, reconnect attempts are spaced by a doubling delay so a
//! dead source costs a few probes a minute, not one per tick. Warnings
//! are rate-limited the same way alerts are: at most one per window.

use std::time::{Duration, Instant};

use statlink_common::consts::{BACKOFF_CAP_S, BACKOFF_FLOOR_S, FAILURE_THRESHOLD, WARN_WINDOW_S};

/// Tracks consecutive failures for one source and schedules retries.
pub struct HealthMonitor {
    failures: u32,
    healthy: bool,
    delay: Duration,
    last_warning: Option<Instant>,
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self {
            failures: 0,
            healthy: true,
            delay: Duration::from_secs(BACKOFF_FLOOR_S),
            last_warning: None,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }

    /// Delay to wait before the next reconnect attempt.
    pub fn retry_delay(&self) -> Duration {
        self.delay
    }

    /// Record a successful poll. Returns true when this ends an
    /// unhealthy stretch, so the caller can log recovery exactly once.
    pub fn record_success(&mut self) -> bool {
        let recovered = !self.healthy;
        self.failures = 0;
        self.healthy = true;
        self.delay = Duration::from_secs(BACKOFF_FLOOR_S);
        self.last_warning = None;
        recovered
    }

    /// Record a failed poll, advancing the backoff schedule once the
    /// failure threshold is crossed.
    pub fn record_failure(&mut self) {
        self.failures += 1;
        if self.failures < FAILURE_THRESHOLD {
            return;
        }
        if self.healthy {
            self.healthy = false;
            self.delay = Duration::from_secs(BACKOFF_FLOOR_S);
        } else {
            self.delay = (self.delay * 2).min(Duration::from_secs(BACKOFF_CAP_S));
        }
    }

    /// Whether an unhealthy-source warning is due now.
    pub fn should_warn(&mut self) -> bool {
        self.should_warn_at(Instant::now())
    }

    fn should_warn_at(&mut self, now: Instant) -> bool {
        if self.healthy {
            return false;
        }
        let window = Duration::from_secs(WARN_WINDOW_S);
        match self.last_warning {
            Some(last) if now.duration_since(last) < window => false,
            _ => {
                self.last_warning = Some(now);
                true
            }
        }
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new()
    }
}
