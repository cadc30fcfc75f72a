//! End-to-end poll loop tests: scripted source, real emitter, real UDP
//! receiver.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use statlink::emitter::TelemetryEmitter;
use statlink::poller::Poller;
use statlink::sources::{MetricValueSource, ReadError};
use statlink_common::prelude::{
    ConfiguredMetric, MetricPacket, SensorKey, SourceTag, SystemMetricKind,
};
use tokio::net::UdpSocket;
use tokio::sync::watch;

struct SteadySource {
    value: i64,
}

impl MetricValueSource for SteadySource {
    async fn read_value(&mut self, _metric: &ConfiguredMetric) -> Result<i64, ReadError> {
        Ok(self.value)
    }

    async fn try_reconnect(&mut self) -> bool {
        true
    }

    fn active_source(&self) -> SourceTag {
        SourceTag::Query
    }
}

fn metrics() -> Vec<ConfiguredMetric> {
    vec![
        ConfiguredMetric {
            id: 1,
            name: "CPU".to_string(),
            unit: "%".to_string(),
            key: SensorKey::System {
                metric: SystemMetricKind::CpuPercent,
            },
            custom_label: None,
            companion_id: None,
        },
        ConfiguredMetric {
            id: 2,
            name: "CPUC0".to_string(),
            unit: "C".to_string(),
            key: SensorKey::Query {
                path: "/k10temp/0/temp/1".to_string(),
            },
            custom_label: None,
            companion_id: None,
        },
    ]
}

#[tokio::test]
async fn loop_emits_valid_packets_until_stopped() {
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = receiver.local_addr().unwrap().port();

    let emitter = TelemetryEmitter::bind("127.0.0.1", port).await.unwrap();
    let poller = Poller::new(SteadySource { value: 42 }, metrics(), true);

    let ticks = Arc::new(AtomicUsize::new(0));
    let tick_counter = ticks.clone();
    let (stop_tx, stop_rx) = watch::channel(false);
    let handle = tokio::spawn(poller.run(
        Duration::from_millis(20),
        emitter,
        stop_rx,
        Some(Box::new(move |_report| {
            tick_counter.fetch_add(1, Ordering::SeqCst);
        })),
    ));

    let mut buf = [0u8; 4096];
    for _ in 0..3 {
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
            .await
            .expect("packet within deadline")
            .unwrap();
        let packet: MetricPacket = serde_json::from_slice(&buf[..len]).unwrap();
        assert_eq!(packet.version, "2.0");
        assert_eq!(packet.status, 1);
        assert_eq!(packet.metrics.len(), 2);
        assert_eq!(packet.metrics[0].id, 1);
        assert_eq!(packet.metrics[1].value, 42);
        assert_eq!(packet.timestamp.len(), 5);
    }

    stop_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("loop exits after stop")
        .unwrap();
    assert!(ticks.load(Ordering::SeqCst) >= 3);
}
