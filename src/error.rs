//! Error taxonomy for the gateway.
//!
//! Every [`BackendError`] variant is absorbed by
//! [`crate::backend_caller::call_backend`] into a [`crate::backend_caller::CallOutcome`]
//! and never escapes the orchestrator as a thrown failure. [`GatewayError`]
//! covers the entry point's own, much narrower, failure mode.

use thiserror::Error;

/// Errors a single backend call can terminate with.
#[derive(Debug, Error, Clone)]
pub enum BackendError {
    /// The circuit breaker rejected the call; zero RTT, not counted against
    /// the breaker that produced it.
    #[error("circuit breaker open for backend {0}")]
    BreakerOpen(String),

    /// Connect or read deadline exceeded.
    #[error("timeout calling backend {0}")]
    Timeout(String),

    /// Socket- or DNS-level failure.
    #[error("connection error calling backend {0}: {1}")]
    ConnectError(String, String),

    /// Backend replied with a non-2xx status.
    #[error("backend {0} returned HTTP {1}")]
    HttpStatus(String, u16),

    /// Reply violated the prediction contract (including score out of range).
    #[error("backend {0} returned an invalid prediction: {1}")]
    Parse(String, String),

    /// Any other failure mode.
    #[error("unexpected error calling backend {0}: {1}")]
    Unexpected(String, String),
}

impl BackendError {
    /// Transient errors are eligible for the bounded retry in
    /// [`crate::backend_caller::call_backend`]; everything else is deterministic
    /// and must not be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Timeout(_) | BackendError::ConnectError(_, _))
    }

    /// A short machine-readable kind, used as the error-kind tag in logs and
    /// in the human-readable outcome message.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::BreakerOpen(_) => "breaker_open",
            BackendError::Timeout(_) => "timeout",
            BackendError::ConnectError(_, _) => "connect_error",
            BackendError::HttpStatus(_, _) => "http_status",
            BackendError::Parse(_, _) => "parse",
            BackendError::Unexpected(_, _) => "unexpected",
        }
    }
}

/// Errors the validation entry point itself can fail with. Backend failures
/// are never represented here — they are accounted for in the aggregated
/// verdict instead (see [`crate::orchestrator::Orchestrator::validate`]).
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The orchestrator was asked to dispatch to a backend name that isn't
    /// in the configured descriptor set. A misconfiguration, not a runtime
    /// fault; surfaces as a 500.
    #[error("unknown backend: {0}")]
    UnknownBackend(String),
}
