// src/health.rs
//! Source health reporting. Fire-and-forget: fetchers call in, nobody
//! waits on the answer. Metrics live in memory only; persistence is a
//! separate system's problem.

use once_cell::sync::OnceCell;

use metrics::{counter, describe_counter, describe_histogram, histogram};

pub trait HealthMonitor: Send + Sync {
    fn record_success(&self, source: &str, latency_ms: u64, count: usize);
    fn record_failure(&self, source: &str, error: &str);
}

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "source_fetch_success_total",
            "Successful source fetches, labeled by source."
        );
        describe_counter!(
            "source_fetch_failure_total",
            "Failed or timed-out source fetches, labeled by source."
        );
        describe_counter!(
            "source_articles_total",
            "Articles produced by successful fetches, labeled by source."
        );
        describe_histogram!("source_fetch_latency_ms", "Per-source fetch latency.");
    });
}

/// Default monitor: tracing + Prometheus counters via the `metrics` facade.
#[derive(Debug, Default)]
pub struct MetricsHealthMonitor;

impl HealthMonitor for MetricsHealthMonitor {
    fn record_success(&self, source: &str, latency_ms: u64, count: usize) {
        ensure_metrics_described();
        counter!("source_fetch_success_total", "source" => source.to_string()).increment(1);
        counter!("source_articles_total", "source" => source.to_string())
            .increment(count as u64);
        histogram!("source_fetch_latency_ms").record(latency_ms as f64);
        tracing::debug!(target: "health", source, latency_ms, count, "source fetch ok");
    }

    fn record_failure(&self, source: &str, error: &str) {
        ensure_metrics_described();
        counter!("source_fetch_failure_total", "source" => source.to_string()).increment(1);
        tracing::warn!(target: "health", source, error, "source fetch failed");
    }
}
