//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define router metrics (decisions, modelled latency, fleet state)
//! - Expose Prometheus-compatible metrics endpoint
//! - Track per-backend and aggregate metrics
//!
//! # Metrics
//! - `router_requests_total` (counter): routing calls by outcome
//! - `router_decision_latency_ms` (histogram): modelled final latency of selected backends
//! - `router_sla_misses_total` (counter): routed requests whose latency exceeds the SLA
//! - `router_backend_load` (gauge): current load per backend
//! - `router_backend_status` (gauge): 0=healthy, 1=degraded, 2=down
//! - `router_fluctuation_changes_total` (counter): backends changed by fluctuation ticks
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op, so tests need no setup
//! - Labels for backend and outcome only

use std::net::SocketAddr;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};

use crate::registry::Backend;
use crate::routing::RoutingResult;

const LATENCY_BUCKETS_MS: [f64; 12] = [
    10.0, 25.0, 50.0, 75.0, 100.0, 150.0, 200.0, 300.0, 400.0, 600.0, 800.0, 1200.0,
];

fn describe_metrics() {
    describe_counter!("router_requests_total", "Routing calls by outcome");
    describe_histogram!(
        "router_decision_latency_ms",
        "Modelled final latency of selected backends in milliseconds"
    );
    describe_counter!(
        "router_sla_misses_total",
        "Routed requests whose modelled latency exceeds the SLA"
    );
    describe_gauge!("router_backend_load", "Current load per backend in percent");
    describe_gauge!(
        "router_backend_status",
        "Backend status (0=healthy, 1=degraded, 2=down)"
    );
    describe_counter!(
        "router_fluctuation_changes_total",
        "Backends changed by fluctuation ticks"
    );
}

/// Install the Prometheus exporter with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(Matcher::Suffix("_ms".to_string()), &LATENCY_BUCKETS_MS)?
        .install()?;
    describe_metrics();
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record the outcome of one routing call.
pub fn record_routing(result: &RoutingResult) {
    counter!("router_requests_total", "outcome" => result.outcome()).increment(1);

    if let Some(latency) = result.decision.final_latency_ms() {
        histogram!("router_decision_latency_ms").record(latency);
        if !result.sla_met {
            counter!("router_sla_misses_total").increment(1);
        }
    }
}

/// Publish one backend's load and status gauges.
pub fn record_backend_state(backend: &Backend) {
    gauge!("router_backend_load", "backend" => backend.id.clone()).set(backend.current_load);
    gauge!("router_backend_status", "backend" => backend.id.clone())
        .set(backend.status as u8 as f64);
}

/// Count backends changed by one fluctuation tick.
pub fn record_fluctuation(changed: usize) {
    counter!("router_fluctuation_changes_total").increment(changed as u64);
}
