//! Single-backend call: circuit breaker gate, HTTP call, bounded retry,
//! breaker accounting, latency instrumentation.
//!
//! Retries are fixed-wait and bounded by a plain attempt counter rather than
//! an exponential backoff curve or a retry budget: only a timeout or connect
//! failure is retried, up to a configured attempt ceiling. HTTP-status and
//! parse errors are deterministic and are never retried.

use std::time::Instant;

use crate::circuit_breaker::{CircuitBreakerRegistry, Outcome};
use crate::config::{BackendDescriptor, RetryPolicy};
use crate::error::BackendError;
use crate::schema::{ModelPrediction, ModelResult, PredictRequest};

/// Result of calling one backend, including wall-clock latency as observed
/// by the gateway (not the backend's self-reported `latency_ms`).
pub struct CallOutcome {
    pub backend: String,
    pub result: Result<ModelResult, BackendError>,
    pub latency_ms: u64,
}

/// Calls `backend`'s `/predict` with `text`, gated by `breakers`, retrying
/// transient failures up to `retry.max_attempts` times with a fixed wait
/// between attempts.
pub async fn call_backend(
    client: &reqwest::Client,
    base_url: &str,
    backend: &BackendDescriptor,
    breakers: &CircuitBreakerRegistry,
    retry: RetryPolicy,
    text: &str,
    request_id: &str,
) -> CallOutcome {
    let started = Instant::now();

    let admitted = breakers.with(&backend.name, |b| b.allow_request());
    if !admitted {
        return CallOutcome {
            backend: backend.name.clone(),
            result: Err(BackendError::BreakerOpen(backend.name.clone())),
            latency_ms: started.elapsed().as_millis() as u64,
        };
    }

    let max_attempts = if retry.enabled { retry.max_attempts.max(1) } else { 1 };
    let mut last_err = None;

    for attempt in 1..=max_attempts {
        match try_once(client, base_url, backend, text, request_id).await {
            Ok(prediction) => {
                let state = breakers.with(&backend.name, |b| {
                    b.on_result(Outcome::Success);
                    b.state_sync()
                });
                crate::metrics::record_circuit_state(&backend.name, state);
                metrics::histogram!(
                    crate::metrics::MODEL_CALL_LATENCY_SECONDS,
                    "model_name" => backend.name.clone(),
                )
                .record(started.elapsed().as_secs_f64());
                return CallOutcome {
                    backend: backend.name.clone(),
                    result: Ok(prediction.into()),
                    latency_ms: started.elapsed().as_millis() as u64,
                };
            }
            Err(err) => {
                let retryable = err.is_transient() && attempt < max_attempts;
                if retryable {
                    tracing::warn!(
                        backend = %backend.name,
                        attempt,
                        error = %err,
                        "retrying transient backend error"
                    );
                    metrics::counter!(
                        crate::metrics::MODEL_CALL_RETRIES_TOTAL,
                        "model_name" => backend.name.clone(),
                        "retry_number" => attempt.to_string(),
                    )
                    .increment(1);
                    tokio::time::sleep(retry.wait).await;
                    last_err = Some(err);
                    continue;
                }
                last_err = Some(err);
                break;
            }
        }
    }

    let err = last_err.expect("loop always sets last_err before exiting without success");
    let state = breakers.with(&backend.name, |b| {
        b.on_result(Outcome::Failure);
        b.state_sync()
    });
    crate::metrics::record_circuit_state(&backend.name, state);
    metrics::histogram!(
        crate::metrics::MODEL_CALL_LATENCY_SECONDS,
        "model_name" => backend.name.clone(),
    )
    .record(started.elapsed().as_secs_f64());
    CallOutcome {
        backend: backend.name.clone(),
        result: Err(err),
        latency_ms: started.elapsed().as_millis() as u64,
    }
}

async fn try_once(
    client: &reqwest::Client,
    base_url: &str,
    backend: &BackendDescriptor,
    text: &str,
    request_id: &str,
) -> Result<ModelPrediction, BackendError> {
    let url = format!("{}/predict", base_url.trim_end_matches('/'));
    let body = PredictRequest { text, request_id };

    let response = client.post(&url).json(&body).send().await.map_err(|e| {
        if e.is_timeout() {
            BackendError::Timeout(backend.name.clone())
        } else if e.is_connect() {
            BackendError::ConnectError(backend.name.clone(), e.to_string())
        } else {
            BackendError::Unexpected(backend.name.clone(), e.to_string())
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(BackendError::HttpStatus(backend.name.clone(), status.as_u16()));
    }

    let prediction: ModelPrediction = response
        .json()
        .await
        .map_err(|e| BackendError::Parse(backend.name.clone(), e.to_string()))?;

    if !prediction.is_valid() {
        return Err(BackendError::Parse(
            backend.name.clone(),
            format!("score {} outside [0,1]", prediction.score),
        ));
    }

    Ok(prediction)
}
