//! Fan-out orchestration: dispatch to every enabled backend in parallel,
//! wait for all of them, and assemble the aggregated verdict.
//!
//! Each backend call runs in its own spawned task rather than as a bare
//! joined future, so a panic inside one call is caught as a `JoinError`
//! instead of unwinding the whole request, and is folded into
//! `failed_models` like any other per-backend failure.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::aggregation::{aggregate, flag_reasons, AggregationStrategy};
use crate::backend_caller::call_backend;
use crate::circuit_breaker::CircuitBreakerRegistry;
use crate::client_pool::ClientPool;
use crate::config::{BackendDescriptor, RetryPolicy};
use crate::error::GatewayError;
use crate::schema::ValidateResponse;

/// Everything the orchestrator needs to dispatch and aggregate one request.
/// Held behind an `Arc` in [`crate::server::AppState`] and shared across
/// every handler invocation.
pub struct Orchestrator {
    backends: Vec<BackendDescriptor>,
    client_pool: ClientPool,
    breakers: CircuitBreakerRegistry,
    retry: RetryPolicy,
    strategy: AggregationStrategy,
    in_flight: AtomicI64,
}

impl Orchestrator {
    pub fn new(
        backends: Vec<BackendDescriptor>,
        client_pool: ClientPool,
        breakers: CircuitBreakerRegistry,
        retry: RetryPolicy,
        strategy: AggregationStrategy,
    ) -> Self {
        Self {
            backends,
            client_pool,
            breakers,
            retry,
            strategy,
            in_flight: AtomicI64::new(0),
        }
    }

    /// Current value of the in-flight gauge, exposed for the graceful-drain
    /// shutdown loop in `main`.
    pub fn in_flight_count(&self) -> i64 {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn breakers(&self) -> &CircuitBreakerRegistry {
        &self.breakers
    }

    pub fn backend_names(&self) -> impl Iterator<Item = &str> {
        self.backends.iter().map(|b| b.name.as_str())
    }

    /// Runs one validation: fans out to `enabled_backends` (or every
    /// configured backend if `None`), waits for all outcomes, and returns the
    /// aggregated verdict. The only failure mode is an unknown backend name
    /// in an explicit `enabled_backends` override.
    pub async fn validate(
        self: &Arc<Self>,
        text: String,
        enabled_backends: Option<Vec<String>>,
        request_id: Option<String>,
    ) -> Result<ValidateResponse, GatewayError> {
        let request_id = request_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        let targets: Vec<BackendDescriptor> = match enabled_backends {
            None => self.backends.clone(),
            Some(names) => {
                let mut resolved = Vec::with_capacity(names.len());
                for name in names {
                    let descriptor = self
                        .backends
                        .iter()
                        .find(|b| b.name == name)
                        .ok_or_else(|| GatewayError::UnknownBackend(name.clone()))?;
                    resolved.push(descriptor.clone());
                }
                resolved
            }
        };

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        metrics::gauge!(crate::metrics::IN_FLIGHT_REQUESTS).set(self.in_flight_count() as f64);
        let started = Instant::now();

        let mut tasks = Vec::with_capacity(targets.len());
        for target in &targets {
            let this = Arc::clone(self);
            let target = target.clone();
            let text = text.clone();
            let request_id = request_id.clone();
            let name = target.name.clone();
            let handle = tokio::spawn(async move {
                let client = this
                    .client_pool
                    .client_for(&target.name)
                    .expect("target backends are drawn from configured descriptors")
                    .clone();
                let base_url = this
                    .client_pool
                    .base_url_for(&target.name)
                    .expect("target backends are drawn from configured descriptors")
                    .to_string();
                call_backend(
                    &client,
                    &base_url,
                    &target,
                    &this.breakers,
                    this.retry,
                    &text,
                    &request_id,
                )
                .await
            });
            tasks.push((name, handle));
        }

        let mut model_results = BTreeMap::new();
        let mut failed_models = Vec::new();
        let mut successes: Vec<(String, crate::schema::ModelResult)> = Vec::new();

        let (names, handles): (Vec<String>, Vec<_>) = tasks.into_iter().unzip();
        let joined = futures::future::join_all(handles).await;
        for (name, result) in names.into_iter().zip(joined) {
            match result {
                Ok(outcome) => match outcome.result {
                    Ok(result) => {
                        successes.push((outcome.backend.clone(), result.clone()));
                        model_results.insert(outcome.backend, result);
                    }
                    Err(_) => failed_models.push(outcome.backend),
                },
                Err(join_err) => {
                    tracing::error!(backend = %name, error = %join_err, "backend call task panicked");
                    failed_models.push(name);
                }
            }
        }
        failed_models.sort();

        let ordered: Vec<(&str, &crate::schema::ModelResult)> = targets
            .iter()
            .filter_map(|t| {
                successes
                    .iter()
                    .find(|(name, _)| name == &t.name)
                    .map(|(name, result)| (name.as_str(), result))
            })
            .collect();

        let flagged = aggregate(self.strategy, &ordered);
        let reasons = flag_reasons(&ordered);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        metrics::gauge!(crate::metrics::IN_FLIGHT_REQUESTS).set(self.in_flight_count() as f64);
        let latency_ms = started.elapsed().as_millis() as u64;

        let partial_failure = !failed_models.is_empty();
        let status = if model_results.is_empty() && !targets.is_empty() {
            "error"
        } else if partial_failure {
            "partial"
        } else {
            "success"
        };
        metrics::histogram!(crate::metrics::REQUEST_LATENCY_SECONDS)
            .record(started.elapsed().as_secs_f64());
        metrics::counter!(
            crate::metrics::REQUEST_TOTAL,
            "status" => status,
            "flagged" => flagged.to_string(),
        )
        .increment(1);

        Ok(ValidateResponse {
            request_id,
            flagged,
            flag_reasons: reasons,
            model_results,
            partial_failure,
            failed_models,
            latency_ms,
        })
    }
}
