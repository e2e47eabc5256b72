//! Prometheus metrics for the stream client
//!
//! Registered once in the default registry so the `/metrics` handler can
//! gather them alongside everything else.

use std::sync::OnceLock;

use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts};
use tracing::warn;

/// Counters and gauges shared by the connection and the series store
pub struct Metrics {
    pub ticks_applied: IntCounter,
    /// Labelled by reason: "stale" or "interim"
    pub ticks_discarded: IntCounterVec,
    pub frames_rejected: IntCounter,
    pub reconnect_attempts: IntCounter,
    pub history_fetch_failures: IntCounter,
    pub connection_live: IntGauge,
    pub series_len: IntGauge,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Global metrics handle
pub fn metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::register)
}

impl Metrics {
    fn register() -> Self {
        let metrics = Self {
            ticks_applied: counter("aether_ticks_applied_total", "Ticks appended to the series"),
            ticks_discarded: IntCounterVec::new(
                Opts::new("aether_ticks_discarded_total", "Ticks dropped before reaching the series"),
                &["reason"],
            )
            .expect("static metric definition"),
            frames_rejected: counter(
                "aether_frames_rejected_total",
                "Stream frames that failed to parse",
            ),
            reconnect_attempts: counter(
                "aether_reconnect_attempts_total",
                "Reconnect timers armed after a disconnect",
            ),
            history_fetch_failures: counter(
                "aether_history_fetch_failures_total",
                "History snapshot requests that failed",
            ),
            connection_live: gauge(
                "aether_connections_live",
                "Stream connections currently in the Connected state",
            ),
            series_len: gauge("aether_series_len", "Ticks currently retained"),
        };

        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(metrics.ticks_applied.clone()),
            Box::new(metrics.ticks_discarded.clone()),
            Box::new(metrics.frames_rejected.clone()),
            Box::new(metrics.reconnect_attempts.clone()),
            Box::new(metrics.history_fetch_failures.clone()),
            Box::new(metrics.connection_live.clone()),
            Box::new(metrics.series_len.clone()),
        ];
        for collector in collectors {
            if let Err(e) = prometheus::register(collector) {
                warn!(error = %e, "Failed to register metric");
            }
        }

        metrics
    }
}

fn counter(name: &str, help: &str) -> IntCounter {
    IntCounter::new(name, help).expect("static metric definition")
}

fn gauge(name: &str, help: &str) -> IntGauge {
    IntGauge::new(name, help).expect("static metric definition")
}

/// Render the default registry in the Prometheus text format
pub fn render() -> String {
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
