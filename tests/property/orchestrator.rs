//! Property test: for any mix of succeeding, failing, and panicking backend
//! calls, the orchestrator's two result sets exactly partition the request's
//! enabled backends — every backend lands in `model_results` xor
//! `failed_models`, never both, never neither.

use std::sync::Arc;
use std::time::Duration;

use guardrail_gateway::aggregation::AggregationStrategy;
use guardrail_gateway::circuit_breaker::CircuitBreakerRegistry;
use guardrail_gateway::client_pool::ClientPool;
use guardrail_gateway::config::{BackendDescriptor, CircuitBreakerPolicy, RetryPolicy};
use guardrail_gateway::orchestrator::Orchestrator;
use proptest::prelude::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Outcome {
    Success,
    Failure,
    Panic,
}

fn outcome() -> impl Strategy<Value = Outcome> {
    prop_oneof![
        Just(Outcome::Success),
        Just(Outcome::Failure),
        Just(Outcome::Panic),
    ]
}

fn outcomes() -> impl Strategy<Value = Vec<Outcome>> {
    proptest::collection::vec(outcome(), 0..6)
}

fn cb_policy() -> CircuitBreakerPolicy {
    CircuitBreakerPolicy {
        failure_threshold: 100,
        recovery_timeout: Duration::from_secs(3600),
        success_threshold: 3,
    }
}

fn no_retry() -> RetryPolicy {
    RetryPolicy {
        enabled: false,
        max_attempts: 1,
        wait: Duration::from_millis(1),
    }
}

fn descriptor(name: String, base_url: String) -> BackendDescriptor {
    BackendDescriptor {
        name,
        base_url,
        connect_timeout: Duration::from_millis(100),
        request_timeout: Duration::from_millis(150),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn result_sets_exactly_partition_enabled_backends(outcomes in outcomes()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let mut all_backends = Vec::with_capacity(outcomes.len());
            // Only non-panic backends get a client in the pool. A backend
            // whose name is absent from the pool hits the `.expect(..)` on
            // `client_pool.client_for` inside the orchestrator's spawned
            // task, which panics that task — the same path a real bug in a
            // backend client would take.
            let mut poolable_backends = Vec::new();
            let mut servers = Vec::new();

            for (i, outcome) in outcomes.iter().enumerate() {
                let name = format!("backend-{i}");
                match outcome {
                    Outcome::Success => {
                        let server = MockServer::start().await;
                        Mock::given(method("POST"))
                            .and(path("/predict"))
                            .respond_with(ResponseTemplate::new(200).set_body_json(
                                serde_json::json!({
                                    "flagged": false, "score": 0.1, "details": [], "latency_ms": 1
                                }),
                            ))
                            .mount(&server)
                            .await;
                        let d = descriptor(name.clone(), server.uri());
                        all_backends.push(d.clone());
                        poolable_backends.push(d);
                        servers.push(server);
                    }
                    Outcome::Failure => {
                        let d = descriptor(name.clone(), "http://127.0.0.1:1".to_string());
                        all_backends.push(d.clone());
                        poolable_backends.push(d);
                    }
                    Outcome::Panic => {
                        let d = descriptor(name.clone(), "http://127.0.0.1:1".to_string());
                        all_backends.push(d);
                        // Deliberately not added to poolable_backends.
                    }
                }
            }

            let pool = ClientPool::new(&poolable_backends, 20);
            let breakers = CircuitBreakerRegistry::with_backends(
                cb_policy(),
                all_backends.iter().map(|b| b.name.as_str()),
            );
            let orchestrator = Arc::new(Orchestrator::new(
                all_backends.clone(),
                pool,
                breakers,
                no_retry(),
                AggregationStrategy::AnyFlag,
            ));

            let verdict = orchestrator
                .validate("hello".to_string(), None, None)
                .await
                .unwrap();

            prop_assert_eq!(
                verdict.model_results.len() + verdict.failed_models.len(),
                all_backends.len()
            );
            for name in verdict.model_results.keys() {
                prop_assert!(!verdict.failed_models.contains(name));
            }

            Ok(())
        })?;
    }
}
