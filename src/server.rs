//! Application state and router wiring.
//!
//! A small `Clone`-able state struct holding `Arc`s to shared resources,
//! passed to `Router::with_state` so every handler gets a cheap clone of the
//! same orchestrator and metrics handle.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::handlers;
use crate::orchestrator::Orchestrator;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub metrics_handle: Arc<PrometheusHandle>,
}

/// Builds the full router for the external HTTP surface plus the ambient
/// `GET /` probe.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/v1/validate", post(handlers::validate))
        .route("/v1/health", get(handlers::health))
        .route("/v1/ready", get(handlers::ready))
        .route("/metrics", get(handlers::metrics))
        .route("/debug/circuit-breakers", get(handlers::debug_circuit_breakers))
        .route(
            "/debug/circuit-breakers/:name/close",
            post(handlers::debug_force_close),
        )
        .route(
            "/debug/circuit-breakers/:name/open",
            post(handlers::debug_force_open),
        )
        .with_state(state)
}
