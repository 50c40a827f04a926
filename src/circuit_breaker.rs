//! Per-backend circuit breaker.
//!
//! A consecutive-count state machine: `failure_threshold` consecutive
//! failures opens the breaker, `recovery_timeout` lets it probe again in
//! `HalfOpen`, and `success_threshold` consecutive probe successes closes
//! it. State lives behind an `AtomicU8` for lock-free reads off the hot
//! path; the counters that actually decide transitions sit behind a mutex
//! held only across the transition itself, never across I/O.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};

use crate::config::CircuitBreakerPolicy;

/// The three states a breaker can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl CircuitState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            _ => CircuitState::HalfOpen,
        }
    }
}

struct Counters {
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<Instant>,
}

/// A single backend's breaker. `state_sync()` is safe to call from the hot
/// path without contending the mutex; every transition still happens under
/// the lock so concurrent callers agree on counts.
pub struct Breaker {
    state: AtomicU8,
    counters: Mutex<Counters>,
    policy: CircuitBreakerPolicy,
}

/// Outcome fed into [`Breaker::on_result`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Breaker {
    pub fn new(policy: CircuitBreakerPolicy) -> Self {
        Self {
            state: AtomicU8::new(CircuitState::Closed as u8),
            counters: Mutex::new(Counters {
                consecutive_failures: 0,
                consecutive_successes: 0,
                opened_at: None,
            }),
            policy,
        }
    }

    /// Lock-free snapshot of the current state, observed from `AtomicU8` with
    /// `Acquire` ordering so it's never stale relative to a just-completed
    /// transition.
    pub fn state_sync(&self) -> CircuitState {
        CircuitState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether a call should be let through right now. An `Open` breaker past
    /// its recovery timeout transitions itself to `HalfOpen` and admits the
    /// call as a probe.
    pub fn allow_request(&self) -> bool {
        match self.state_sync() {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let mut counters = self.counters.lock().unwrap();
                match counters.opened_at {
                    Some(opened_at) if opened_at.elapsed() >= self.policy.recovery_timeout => {
                        counters.consecutive_successes = 0;
                        counters.consecutive_failures = 0;
                        self.state.store(CircuitState::HalfOpen as u8, Ordering::Release);
                        true
                    }
                    _ => false,
                }
            }
        }
    }

    /// Records the outcome of a call that [`Self::allow_request`] admitted.
    pub fn on_result(&self, outcome: Outcome) {
        let mut counters = self.counters.lock().unwrap();
        match (self.state_sync(), outcome) {
            (CircuitState::Closed, Outcome::Success) => {
                counters.consecutive_failures = 0;
            }
            (CircuitState::Closed, Outcome::Failure) => {
                counters.consecutive_failures += 1;
                if counters.consecutive_failures >= self.policy.failure_threshold {
                    counters.opened_at = Some(Instant::now());
                    self.state.store(CircuitState::Open as u8, Ordering::Release);
                }
            }
            (CircuitState::HalfOpen, Outcome::Success) => {
                counters.consecutive_successes += 1;
                if counters.consecutive_successes >= self.policy.success_threshold {
                    counters.consecutive_failures = 0;
                    counters.consecutive_successes = 0;
                    counters.opened_at = None;
                    self.state.store(CircuitState::Closed as u8, Ordering::Release);
                }
            }
            (CircuitState::HalfOpen, Outcome::Failure) => {
                counters.consecutive_failures = 0;
                counters.consecutive_successes = 0;
                counters.opened_at = Some(Instant::now());
                self.state.store(CircuitState::Open as u8, Ordering::Release);
            }
            (CircuitState::Open, _) => {
                // A probe result racing an external force_open/force_close; nothing to do.
            }
        }
    }

    /// Administrative override, exposed via `POST /debug/circuit-breakers/{name}/open`.
    pub fn force_open(&self) {
        let mut counters = self.counters.lock().unwrap();
        counters.opened_at = Some(Instant::now());
        self.state.store(CircuitState::Open as u8, Ordering::Release);
    }

    /// Administrative override, exposed via `POST /debug/circuit-breakers/{name}/close`.
    pub fn force_close(&self) {
        let mut counters = self.counters.lock().unwrap();
        counters.consecutive_failures = 0;
        counters.consecutive_successes = 0;
        counters.opened_at = None;
        self.state.store(CircuitState::Closed as u8, Ordering::Release);
    }

    /// The full status snapshot: state, counters, and last-failure age, for
    /// the debug surface and tests.
    pub fn status(&self, name: &str) -> CircuitSnapshot {
        let state = self.state_sync();
        let counters = self.counters.lock().unwrap();
        let seconds_until_retry = match (state, counters.opened_at) {
            (CircuitState::Open, Some(opened_at)) => Some(
                self.policy
                    .recovery_timeout
                    .saturating_sub(opened_at.elapsed())
                    .as_secs_f64(),
            ),
            _ => None,
        };
        CircuitSnapshot {
            backend: name.to_string(),
            state,
            failure_count: counters.consecutive_failures,
            success_count: counters.consecutive_successes,
            last_failure_seconds_ago: counters.opened_at.map(|t| t.elapsed().as_secs_f64()),
            seconds_until_retry,
        }
    }
}

/// Point-in-time view of one backend's breaker, for `GET /debug/circuit-breakers`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CircuitSnapshot {
    pub backend: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub last_failure_seconds_ago: Option<f64>,
    pub seconds_until_retry: Option<f64>,
}

/// Lazily-populated, process-lifetime map of backend name to [`Breaker`].
///
/// A short write lock creates an entry the first time a backend name is
/// seen; reads thereafter never contend each other.
pub struct CircuitBreakerRegistry {
    breakers: RwLock<HashMap<String, Breaker>>,
    policy: CircuitBreakerPolicy,
}

impl CircuitBreakerRegistry {
    pub fn new(policy: CircuitBreakerPolicy) -> Self {
        Self {
            breakers: RwLock::new(HashMap::new()),
            policy,
        }
    }

    /// Pre-creates breakers for the given backend names so `GET
    /// /debug/circuit-breakers` reports them even before first traffic.
    pub fn with_backends<'a>(policy: CircuitBreakerPolicy, names: impl Iterator<Item = &'a str>) -> Self {
        let registry = Self::new(policy);
        for name in names {
            registry.get_or_create(name);
        }
        registry
    }

    fn get_or_create(&self, name: &str) {
        if self.breakers.read().unwrap().contains_key(name) {
            return;
        }
        let mut guard = self.breakers.write().unwrap();
        guard
            .entry(name.to_string())
            .or_insert_with(|| Breaker::new(self.policy));
    }

    /// Runs `f` with the named backend's breaker, creating it on first use.
    pub fn with<R>(&self, name: &str, f: impl FnOnce(&Breaker) -> R) -> R {
        self.get_or_create(name);
        let guard = self.breakers.read().unwrap();
        f(guard.get(name).expect("just created"))
    }

    /// A snapshot of every backend currently tracked, sorted by name for
    /// deterministic `GET /debug/circuit-breakers` output.
    pub fn snapshot_all(&self) -> Vec<CircuitSnapshot> {
        let guard = self.breakers.read().unwrap();
        let mut snapshots: Vec<_> = guard
            .iter()
            .map(|(name, breaker)| breaker.status(name))
            .collect();
        snapshots.sort_by(|a, b| a.backend.cmp(&b.backend));
        snapshots
    }
}
