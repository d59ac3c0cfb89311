//! Prometheus metrics for orchestrator observability.

use metrics::{counter, histogram};

/// Initialize metrics exporter (Prometheus).
pub fn init_metrics() {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    if let Err(e) = builder.install() {
        tracing::warn!("Failed to install Prometheus exporter: {}", e);
    }
}

/// Record a webhook received event.
pub fn webhook_received(event_type: &str) {
    counter!("ci_webhooks_received_total", "event" => event_type.to_string()).increment(1);
}

/// Record a completed build by terminal state.
pub fn build_completed(status: &str) {
    counter!("ci_builds_total", "status" => status.to_string()).increment(1);
}

/// Record build duration.
pub fn build_duration(duration_ms: u64) {
    histogram!("ci_build_duration_ms").record(duration_ms as f64);
}

/// Record stage duration.
pub fn stage_duration(stage_name: &str, duration_ms: u64) {
    histogram!("ci_stage_duration_ms", "stage" => stage_name.to_string()).record(duration_ms as f64);
}

/// Record a failed commit-status report.
pub fn status_report_failed(state: &str) {
    counter!("ci_status_report_failures_total", "state" => state.to_string()).increment(1);
}
