//! Metric names, bucket layouts, and exporter bring-up.
//!
//! Counters, histograms, and gauges are declared behind stable name
//! constants via the `metrics` facade, with a real Prometheus exporter
//! installed at startup rather than left as documentation-only.

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

use crate::circuit_breaker::CircuitState;

pub const REQUEST_LATENCY_SECONDS: &str = "guardrail_request_latency_seconds";
pub const REQUEST_TOTAL: &str = "guardrail_request_total";
pub const IN_FLIGHT_REQUESTS: &str = "guardrail_in_flight_requests";
pub const MODEL_CALL_LATENCY_SECONDS: &str = "guardrail_model_call_latency_seconds";
pub const MODEL_CALL_RETRIES_TOTAL: &str = "guardrail_model_call_retries_total";
pub const CIRCUIT_BREAKER_STATE: &str = "guardrail_circuit_breaker_state";

const REQUEST_LATENCY_BUCKETS: &[f64] = &[0.01, 0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.5];
const MODEL_CALL_LATENCY_BUCKETS: &[f64] =
    &[0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 1.0];

/// Installs the process-wide Prometheus recorder and pre-initialises every
/// metric whose label set is known at startup, so `GET /metrics` reports
/// zero-valued series for configured backends rather than omitting them
/// until first traffic.
pub fn install(backend_names: impl Iterator<Item = String>) -> PrometheusHandle {
    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(REQUEST_LATENCY_SECONDS.to_string()),
            REQUEST_LATENCY_BUCKETS,
        )
        .expect("static bucket list is always valid")
        .set_buckets_for_metric(
            Matcher::Full(MODEL_CALL_LATENCY_SECONDS.to_string()),
            MODEL_CALL_LATENCY_BUCKETS,
        )
        .expect("static bucket list is always valid");

    let handle = builder.install_recorder().expect("failed to install Prometheus recorder");

    metrics::describe_histogram!(REQUEST_LATENCY_SECONDS, "End-to-end /v1/validate latency");
    metrics::describe_counter!(REQUEST_TOTAL, "Validation outcomes by status and flagged");
    metrics::describe_gauge!(IN_FLIGHT_REQUESTS, "Validation requests currently in flight");
    metrics::describe_histogram!(MODEL_CALL_LATENCY_SECONDS, "Per-backend call latency");
    metrics::describe_counter!(MODEL_CALL_RETRIES_TOTAL, "Per-backend retry attempts");
    metrics::describe_gauge!(CIRCUIT_BREAKER_STATE, "Per-backend circuit breaker state");

    for name in backend_names {
        metrics::gauge!(CIRCUIT_BREAKER_STATE, "model_name" => name.clone()).set(0.0);
        metrics::histogram!(MODEL_CALL_LATENCY_SECONDS, "model_name" => name).record(0.0);
    }

    handle
}

/// Mirrors a breaker's current state into the `guardrail_circuit_breaker_state`
/// gauge. Called after every transition-bearing operation.
pub fn record_circuit_state(backend_name: &str, state: CircuitState) {
    let value = state as u8 as f64;
    metrics::gauge!(CIRCUIT_BREAKER_STATE, "model_name" => backend_name.to_string()).set(value);
}
