//! Metrics collection and exposition.
//!
//! # Metrics
//! - `nginx_manager_manifests_applied_total` (counter): by outcome (deployed, rejected)
//! - `nginx_manager_activation_failures_total` (counter): by stage (validate, reload)
//! - `nginx_manager_site_probes_total` (counter): by result (active, inactive)
//! - `nginx_manager_reverse_sync_created_total` (counter): manifests written by reverse discovery
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op, so tests need no setup
//! - Labels are static strings only

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::discovery::Liveness;

/// Start the Prometheus exporter on `addr`. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_manifest_applied(outcome: &'static str) {
    metrics::counter!("nginx_manager_manifests_applied_total", "outcome" => outcome).increment(1);
}

pub fn record_activation_failure(stage: &'static str) {
    metrics::counter!("nginx_manager_activation_failures_total", "stage" => stage).increment(1);
}

pub fn record_probe(liveness: Liveness) {
    let result = if liveness.is_active() { "active" } else { "inactive" };
    metrics::counter!("nginx_manager_site_probes_total", "result" => result).increment(1);
}

pub fn record_reverse_sync_created() {
    metrics::counter!("nginx_manager_reverse_sync_created_total").increment(1);
}
