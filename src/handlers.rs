//! Axum handlers for the gateway's external HTTP surface.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::circuit_breaker::CircuitState;
use crate::schema::ValidateRequest;
use crate::server::AppState;

/// `POST /v1/validate`.
pub async fn validate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ValidateRequest>,
) -> Response {
    let api_key = headers.get("X-API-Key").and_then(|v| v.to_str().ok());
    if api_key.map(str::is_empty).unwrap_or(true) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "missing or empty X-API-Key header"})),
        )
            .into_response();
    }

    if let Err(message) = request.validate() {
        return (StatusCode::BAD_REQUEST, Json(json!({"detail": message}))).into_response();
    }

    let enabled_count = state.orchestrator.backend_names().count();
    let result = state
        .orchestrator
        .validate(request.text, None, request.request_id)
        .await;

    match result {
        Ok(verdict) => {
            if enabled_count > 0 && verdict.model_results.is_empty() {
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({
                        "detail": "all model services unavailable",
                        "request_id": verdict.request_id,
                        "failed_models": verdict.failed_models,
                    })),
                )
                    .into_response()
            } else {
                (StatusCode::OK, Json(verdict)).into_response()
            }
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": err.to_string()})),
        )
            .into_response(),
    }
}

/// `GET /v1/health`. Always healthy; this process being able to answer HTTP
/// at all is the only thing liveness asserts.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "healthy"}))
}

/// `GET /v1/ready`. Ready iff no breaker has been created yet, or at least
/// one configured backend's breaker currently admits requests.
pub async fn ready(State(state): State<AppState>) -> Response {
    let snapshots = state.orchestrator.breakers().snapshot_all();
    if snapshots.is_empty() {
        return (StatusCode::OK, Json(json!({"status": "ready", "backends": []}))).into_response();
    }
    let available: Vec<&str> = snapshots
        .iter()
        .filter(|s| s.state != CircuitState::Open)
        .map(|s| s.backend.as_str())
        .collect();
    if available.is_empty() {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "not_ready", "backends": []})),
        )
            .into_response()
    } else {
        (
            StatusCode::OK,
            Json(json!({"status": "ready", "backends": available})),
        )
            .into_response()
    }
}

/// `GET /metrics`. Prometheus exposition text rendered from the process-wide
/// recorder installed in `main`.
pub async fn metrics(State(state): State<AppState>) -> Response {
    let body = state.metrics_handle.render();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        body,
    )
        .into_response()
}

/// `GET /debug/circuit-breakers`.
pub async fn debug_circuit_breakers(State(state): State<AppState>) -> Json<serde_json::Value> {
    let snapshots = state.orchestrator.breakers().snapshot_all();
    Json(json!({ "breakers": snapshots }))
}

/// `POST /debug/circuit-breakers/{name}/close`.
pub async fn debug_force_close(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Json<serde_json::Value> {
    state.orchestrator.breakers().with(&name, |b| b.force_close());
    crate::metrics::record_circuit_state(&name, CircuitState::Closed);
    Json(json!({"backend": name, "state": "closed"}))
}

/// `POST /debug/circuit-breakers/{name}/open`.
pub async fn debug_force_open(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Json<serde_json::Value> {
    state.orchestrator.breakers().with(&name, |b| b.force_open());
    crate::metrics::record_circuit_state(&name, CircuitState::Open);
    Json(json!({"backend": name, "state": "open"}))
}

/// Root service identity probe, for humans poking at the gateway directly.
pub async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "service": "guardrail-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
