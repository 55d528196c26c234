//! Prometheus metrics for the matchmaking service
//!
//! Labels carry only index kind, outcome, and role class, never query
//! text or user data.

use std::time::Duration;

use metrics::{counter, gauge, histogram};

use crate::index::IndexKind;

pub const OUTCOME_OK: &str = "ok";
pub const OUTCOME_CLIENT_ERROR: &str = "client_error";
pub const OUTCOME_SERVER_ERROR: &str = "server_error";

pub const STATUS_OK: &str = "ok";
pub const STATUS_FAILED: &str = "failed";

pub const ASSIGN_ASSIGNED: &str = "assigned";
pub const ASSIGN_UNASSIGNED: &str = "unassigned";

pub fn record_suggest_request(kind: IndexKind, outcome: &str, duration: Duration) {
    counter!("suggest_requests_total", "kind" => kind.to_string(), "outcome" => outcome.to_string())
        .increment(1);
    histogram!("suggest_request_duration_seconds", "kind" => kind.to_string(), "outcome" => outcome.to_string())
        .record(duration.as_secs_f64());
}

pub fn record_rebuild(kind: IndexKind, status: &str, duration: Duration) {
    counter!("index_rebuild_total", "kind" => kind.to_string(), "status" => status.to_string())
        .increment(1);
    histogram!("index_rebuild_duration_seconds", "kind" => kind.to_string(), "status" => status.to_string())
        .record(duration.as_secs_f64());
}

pub fn set_index_entries(kind: IndexKind, entries: usize) {
    gauge!("suggest_index_entries", "kind" => kind.to_string()).set(entries as f64);
}

pub fn set_index_ready(kind: IndexKind, ready: bool) {
    gauge!("suggest_index_ready", "kind" => kind.to_string()).set(if ready { 1.0 } else { 0.0 });
}

pub fn record_registration(role: &str) {
    counter!("registrations_total", "role" => role.to_string()).increment(1);
}

pub fn record_assignment(outcome: &str) {
    counter!("mentor_assignments_total", "outcome" => outcome.to_string()).increment(1);
}

pub fn init_prometheus_recorder() -> metrics_exporter_prometheus::PrometheusHandle {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    builder
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}
