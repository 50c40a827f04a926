//! Environment-variable configuration.
//!
//! `Config::from_env` returns a `Result` rather than panicking on a bad
//! value, so a malformed environment surfaces as a clean non-zero exit with
//! a logged reason instead of an unwinding panic mid-startup.

use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// The four backends wired up by default, in the order `flag_reasons` and
/// `enabled_backends` enumerate them unless a request overrides the set.
pub const DEFAULT_BACKEND_NAMES: [&str; 4] =
    ["prompt-guard", "pii-detect", "hate-detect", "content-class"];

/// Immutable, configured-once description of one backend.
#[derive(Debug, Clone)]
pub struct BackendDescriptor {
    pub name: String,
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

/// Circuit breaker policy knobs, shared by every backend's breaker.
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerPolicy {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub success_threshold: u32,
}

/// Retry policy knobs.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub enabled: bool,
    pub max_attempts: u32,
    pub wait: Duration,
}

/// Fully resolved application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub backends: Vec<BackendDescriptor>,
    pub circuit_breaker: CircuitBreakerPolicy,
    pub retry: RetryPolicy,
    /// Per-backend idle-keep-alive cap, fed straight into
    /// `reqwest::ClientBuilder::pool_max_idle_per_host`. `reqwest` has no
    /// builder knob for a hard total-connection ceiling, only an idle-per-
    /// host one — see DESIGN.md.
    pub max_idle_per_backend: usize,
}

/// Failure to build a [`Config`] from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },
}

impl Config {
    /// Builds configuration from environment variables; unknown variables
    /// are ignored.
    ///
    /// `HOST`, `PORT`, `MODEL_{NAME}_URL` (per [`DEFAULT_BACKEND_NAMES`],
    /// name uppercased and hyphens turned into underscores),
    /// `MODEL_TIMEOUT_SECONDS`, `MODEL_CONNECT_TIMEOUT`,
    /// `CB_FAILURE_THRESHOLD`, `CB_RECOVERY_TIMEOUT`, `CB_SUCCESS_THRESHOLD`,
    /// `RETRY_ENABLED`, `RETRY_MAX_ATTEMPTS`, `RETRY_WAIT_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env: HashMap<String, String> = std::env::vars()
            .map(|(k, v)| (k.to_uppercase(), v))
            .collect();
        Self::from_map(&env)
    }

    /// Testable core of [`Self::from_env`]; takes an already-uppercased
    /// variable map so tests don't need to mutate process environment.
    pub fn from_map(env: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let host = env.get("HOST").cloned().unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or_default(env, "PORT", 8000u16)?;

        let request_timeout_secs = parse_or_default(env, "MODEL_TIMEOUT_SECONDS", 0.08f64)?;
        let connect_timeout_secs = parse_or_default(env, "MODEL_CONNECT_TIMEOUT", 0.02f64)?;
        let request_timeout = Duration::from_secs_f64(request_timeout_secs);
        let connect_timeout = Duration::from_secs_f64(connect_timeout_secs);

        let mut backends = Vec::with_capacity(DEFAULT_BACKEND_NAMES.len());
        for name in DEFAULT_BACKEND_NAMES {
            let var = format!("MODEL_{}_URL", name.to_uppercase().replace('-', "_"));
            let base_url = env
                .get(&var)
                .cloned()
                .unwrap_or_else(|| format!("http://{name}:8000"));
            backends.push(BackendDescriptor {
                name: name.to_string(),
                base_url,
                connect_timeout,
                request_timeout,
            });
        }

        let circuit_breaker = CircuitBreakerPolicy {
            failure_threshold: parse_or_default(env, "CB_FAILURE_THRESHOLD", 5u32)?,
            recovery_timeout: Duration::from_secs_f64(parse_or_default(
                env,
                "CB_RECOVERY_TIMEOUT",
                30.0f64,
            )?),
            success_threshold: parse_or_default(env, "CB_SUCCESS_THRESHOLD", 3u32)?,
        };

        let retry = RetryPolicy {
            enabled: parse_or_default(env, "RETRY_ENABLED", true)?,
            max_attempts: parse_or_default(env, "RETRY_MAX_ATTEMPTS", 2u32)?,
            wait: Duration::from_millis(parse_or_default(env, "RETRY_WAIT_MS", 10u64)?),
        };

        Ok(Config {
            host,
            port,
            backends,
            circuit_breaker,
            retry,
            max_idle_per_backend: 20,
        })
    }
}

fn parse_or_default<T>(
    env: &HashMap<String, String>,
    var: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env.get(var) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            var: var.to_string(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_name_exactly_four_backends() {
        let cfg = Config::from_map(&HashMap::new()).unwrap();
        let names: Vec<_> = cfg.backends.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, DEFAULT_BACKEND_NAMES);
        assert_eq!(cfg.circuit_breaker.failure_threshold, 5);
        assert_eq!(cfg.circuit_breaker.success_threshold, 3);
        assert_eq!(cfg.circuit_breaker.recovery_timeout, Duration::from_secs(30));
        assert!(cfg.retry.enabled);
        assert_eq!(cfg.retry.max_attempts, 2);
        assert_eq!(cfg.retry.wait, Duration::from_millis(10));
    }

    #[test]
    fn model_url_env_var_naming_uppercases_and_replaces_hyphens() {
        let mut env = HashMap::new();
        env.insert("MODEL_PROMPT_GUARD_URL".to_string(), "http://pg:9000".to_string());
        let cfg = Config::from_map(&env).unwrap();
        let pg = cfg.backends.iter().find(|b| b.name == "prompt-guard").unwrap();
        assert_eq!(pg.base_url, "http://pg:9000");
    }

    #[test]
    fn invalid_numeric_value_is_rejected() {
        let mut env = HashMap::new();
        env.insert("PORT".to_string(), "not-a-number".to_string());
        let err = Config::from_map(&env).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var, .. } if var == "PORT"));
    }
}
