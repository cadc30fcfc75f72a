//! The poll/emit loop.
//!
//! Each tick reads every configured metric, refreshes the cache,
//! classifies the tick and hands exactly one packet to the emitter.
//! External reads are gated by the health monitor: while the source is
//! unhealthy they are skipped entirely and a reconnect is attempted on
//! the backoff schedule instead. System metrics are never gated.

use std::time::Duration;

use statlink_common::consts::READ_TIMEOUT_MS;
use statlink_common::metric::{ConfiguredMetric, SourceTag};
use statlink_common::packet::{local_clock, LinkStatus, MetricEntry, MetricPacket};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cache::ValueCache;
use crate::emitter::{overall_status, TelemetryEmitter};
use crate::health::HealthMonitor;
use crate::sources::MetricValueSource;

/// What one tick produced, for the emitter and any observer.
pub struct TickReport {
    pub packet: MetricPacket,
    pub status: LinkStatus,
    pub source: SourceTag,
    pub fresh: usize,
    pub stale: usize,
}

/// Observer invoked after every tick (the configuration GUI hooks in
/// here for its live status view).
pub type TickObserver = Box<dyn Fn(&TickReport) + Send>;

/// Drives one source stack against one configured metric list.
pub struct Poller<S: MetricValueSource> {
    source: S,
    metrics: Vec<ConfiguredMetric>,
    health: HealthMonitor,
    cache: ValueCache,
    started: bool,
    retry_at: Option<Instant>,
    read_timeout: Duration,
}

impl<S: MetricValueSource> Poller<S> {
    /// `source_available` reflects the discovery outcome: a degraded
    /// start (external metrics configured but no source found) begins
    /// unhealthy so the first packets already read SourceNotRunning.
    pub fn new(source: S, metrics: Vec<ConfiguredMetric>, source_available: bool) -> Self {
        let mut health = HealthMonitor::new();
        let wants_external = metrics
            .iter()
            .any(|m| m.key.source() != SourceTag::System);
        if !source_available && wants_external {
            while health.is_healthy() {
                health.record_failure();
            }
        }
        Self {
            source,
            metrics,
            health,
            cache: ValueCache::new(),
            started: true,
            retry_at: None,
            read_timeout: Duration::from_millis(READ_TIMEOUT_MS),
        }
    }

    /// Build a poller that reports SourceStarting until
    /// [`mark_started`](Self::mark_started) is called.
    pub fn new_starting(source: S, metrics: Vec<ConfiguredMetric>) -> Self {
        let mut poller = Self::new(source, metrics, true);
        poller.started = false;
        poller
    }

    /// Attach whatever backend is available before the loop starts.
    /// Returns whether one came up.
    pub async fn attach_source(&mut self) -> bool {
        self.source.try_reconnect().await
    }

    /// Discovery has completed; leave the startup grace status.
    pub fn mark_started(&mut self, source_available: bool) {
        self.started = true;
        if !source_available {
            while self.health.is_healthy() {
                self.health.record_failure();
            }
        }
    }

    pub fn health(&self) -> &HealthMonitor {
        &self.health
    }

    /// Run one poll cycle and assemble the packet.
    pub async fn tick(&mut self) -> TickReport {
        self.maybe_reconnect().await;

        // No external reads during the startup grace; discovery has
        // not chosen a backend yet.
        let attempt_external = self.started && self.health.is_healthy();
        let read_timeout = self.read_timeout;
        let metrics = self.metrics.clone();

        let mut entries = Vec::with_capacity(metrics.len());
        let mut fresh = 0usize;
        let mut stale = 0usize;
        let mut external_attempted = false;
        let mut external_ok = false;

        for metric in &metrics {
            let external = metric.key.source() != SourceTag::System;
            let value = if external && !attempt_external {
                None
            } else {
                if external {
                    external_attempted = true;
                }
                match tokio::time::timeout(read_timeout, self.source.read_value(metric)).await {
                    Ok(Ok(v)) => Some(v),
                    Ok(Err(e)) => {
                        debug!(metric = %metric.name, error = %e, "metric read failed");
                        None
                    }
                    Err(_) => {
                        debug!(
                            metric = %metric.name,
                            timeout_ms = read_timeout.as_millis() as u64,
                            "metric read timed out"
                        );
                        None
                    }
                }
            };

            let wire_value = match value {
                Some(v) => {
                    self.cache.put(metric.id, v);
                    fresh += 1;
                    if external {
                        external_ok = true;
                    }
                    v
                }
                None => {
                    stale += 1;
                    self.cache.get_or_default(metric.id)
                }
            };
            entries.push(MetricEntry {
                id: metric.id,
                name: metric.display_name().to_string(),
                value: wire_value,
                unit: metric.unit.clone(),
            });
        }

        if external_attempted {
            self.account_external(external_ok);
        }

        if !entries.is_empty() {
            let preview: Vec<String> = entries
                .iter()
                .take(4)
                .map(|e| format!("{}:{}{}", e.name, e.value, e.unit))
                .collect();
            debug!(fresh, stale, "tick {}", preview.join(" "));
        }

        let status = overall_status(self.started, self.health.is_healthy(), fresh, stale);
        let timestamp = if fresh > 0 { local_clock() } else { String::new() };
        TickReport {
            packet: MetricPacket::new(status, timestamp, entries),
            status,
            source: self.source.active_source(),
            fresh,
            stale,
        }
    }

    /// When unhealthy and the backoff delay has elapsed, try to bring
    /// a source back before reading.
    async fn maybe_reconnect(&mut self) {
        if self.health.is_healthy() {
            return;
        }
        let now = Instant::now();
        if self.retry_at.is_some_and(|at| now < at) {
            return;
        }
        if self.source.try_reconnect().await {
            self.retry_at = None;
            if self.health.record_success() {
                info!(source = self.source.active_source().label(), "sensor source restored");
            }
        } else {
            self.health.record_failure();
            self.schedule_retry(now);
        }
    }

    fn account_external(&mut self, external_ok: bool) {
        if external_ok {
            self.retry_at = None;
            if self.health.record_success() {
                info!(source = self.source.active_source().label(), "sensor source restored");
            }
        } else {
            self.health.record_failure();
            if !self.health.is_healthy() {
                self.schedule_retry(Instant::now());
            }
        }
    }

    fn schedule_retry(&mut self, now: Instant) {
        let delay = self.health.retry_delay();
        self.retry_at = Some(now + delay);
        if self.health.should_warn() {
            warn!(
                consecutive_failures = self.health.consecutive_failures(),
                retry_in_s = delay.as_secs(),
                "sensor source unhealthy, backing off"
            );
        }
    }

    /// Tick on `interval` until the stop channel flips, emitting one
    /// packet per tick.
    pub async fn run(
        mut self,
        interval: Duration,
        emitter: TelemetryEmitter,
        mut stop: watch::Receiver<bool>,
        observer: Option<TickObserver>,
    ) {
        // A read must resolve inside the tick it belongs to.
        self.read_timeout = self.read_timeout.min(interval.mul_f64(0.8));
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            interval_s = interval.as_secs_f64(),
            destination = emitter.destination(),
            "poll loop started"
        );
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.tick().await;
                    emitter.send(&report.packet).await;
                    if let Some(observe) = &observer {
                        observe(&report);
                    }
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        info!("poll loop stopping");
                        break;
                    }
                }
            }
        }
    }
}
