//! Metrics collection and exposition.
//!
//! # Metrics
//! - `router_navigation_events_total` (counter): bus publications by event
//! - `router_history_changes_total` (counter): history updates by kind (push, traverse)
//! - `router_route_changes_total` (counter): route-change notifications delivered
//! - `router_transitions_started_total` (counter): batches created
//! - `router_transitions_failed_total` (counter): batches whose finished signal rejected
//! - `router_callbacks_executed_total` (counter): update callbacks awaited
//! - `router_pending_transitions` (gauge): current + next batch count
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Exposition only when `observability.metrics_enabled` is set

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::navigation::EventName;

/// Install the Prometheus recorder with an HTTP scrape endpoint.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);

    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install Prometheus recorder"),
    }
}

pub fn record_navigation_event(event: EventName) {
    metrics::counter!("router_navigation_events_total", "event" => event.to_string()).increment(1);
}

pub fn record_history_change(kind: &'static str) {
    metrics::counter!("router_history_changes_total", "kind" => kind).increment(1);
}

pub fn record_route_changes(count: usize) {
    if count > 0 {
        metrics::counter!("router_route_changes_total").increment(count as u64);
    }
}

pub fn record_transition_started() {
    metrics::counter!("router_transitions_started_total").increment(1);
}

pub fn record_transition_failed() {
    metrics::counter!("router_transitions_failed_total").increment(1);
}

pub fn record_callback_executed() {
    metrics::counter!("router_callbacks_executed_total").increment(1);
}

pub fn record_pending_transitions(count: usize) {
    metrics::gauge!("router_pending_transitions").set(count as f64);
}
