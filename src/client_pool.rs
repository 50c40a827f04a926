//! Per-backend HTTP client pool.
//!
//! One `reqwest::Client` per backend, built once at startup rather than
//! per-call, so connection pooling and TLS session resumption carry across
//! requests instead of being thrown away each time.

use std::collections::HashMap;
use std::time::Duration;

use crate::config::BackendDescriptor;

/// One `reqwest::Client` per backend, built once at startup so connection
/// pooling and TLS session resumption work across requests instead of
/// per-call.
pub struct ClientPool {
    clients: HashMap<String, reqwest::Client>,
    base_urls: HashMap<String, String>,
}

impl ClientPool {
    /// Builds a client for every descriptor. A malformed timeout value can't
    /// reach here — [`crate::config::Config::from_env`] already validated it
    /// — so this never fails.
    pub fn new(backends: &[BackendDescriptor], max_idle_per_backend: usize) -> Self {
        let mut clients = HashMap::with_capacity(backends.len());
        let mut base_urls = HashMap::with_capacity(backends.len());
        for backend in backends {
            let client = reqwest::Client::builder()
                .connect_timeout(backend.connect_timeout)
                .timeout(backend.request_timeout)
                .pool_max_idle_per_host(max_idle_per_backend)
                .pool_idle_timeout(Duration::from_secs(90))
                .build()
                .expect("static client configuration is always valid");
            clients.insert(backend.name.clone(), client);
            base_urls.insert(backend.name.clone(), backend.base_url.clone());
        }
        Self { clients, base_urls }
    }

    /// The client configured for `name`, if it is a known backend.
    pub fn client_for(&self, name: &str) -> Option<&reqwest::Client> {
        self.clients.get(name)
    }

    /// The configured base URL for `name`, if it is a known backend.
    pub fn base_url_for(&self, name: &str) -> Option<&str> {
        self.base_urls.get(name).map(String::as_str)
    }

    /// Names of every backend this pool has a client for.
    pub fn backend_names(&self) -> impl Iterator<Item = &str> {
        self.clients.keys().map(String::as_str)
    }
}
