//! Binary entrypoint: configuration, logging, metrics exporter, and the
//! graceful-drain shutdown sequence.
//!
//! On shutdown signal, stops accepting new connections and polls the
//! in-flight request gauge at a short interval until it drains to zero or a
//! bounded wait elapses, whichever comes first, then exits. Tracing is set
//! up from `tracing_subscriber::EnvFilter`, reading `RUST_LOG` and
//! defaulting to `info`.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use guardrail_gateway::aggregation::AggregationStrategy;
use guardrail_gateway::circuit_breaker::CircuitBreakerRegistry;
use guardrail_gateway::client_pool::ClientPool;
use guardrail_gateway::config::Config;
use guardrail_gateway::orchestrator::Orchestrator;
use guardrail_gateway::server::{router, AppState};

const DRAIN_MAX_WAIT: Duration = Duration::from_secs(5);
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let metrics_handle = guardrail_gateway::metrics::install(
        config.backends.iter().map(|b| b.name.clone()),
    );

    let client_pool = ClientPool::new(&config.backends, config.max_idle_per_backend);
    let breakers = CircuitBreakerRegistry::with_backends(
        config.circuit_breaker,
        config.backends.iter().map(|b| b.name.as_str()),
    );
    let orchestrator = Arc::new(Orchestrator::new(
        config.backends.clone(),
        client_pool,
        breakers,
        config.retry,
        AggregationStrategy::AnyFlag,
    ));

    let state = AppState {
        orchestrator: Arc::clone(&orchestrator),
        metrics_handle: Arc::new(metrics_handle),
    };

    let app = router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, addr, "failed to bind listening socket");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(addr, "guardrail gateway listening");

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    if let Err(err) = server.await {
        tracing::error!(error = %err, "server exited with error");
        return ExitCode::FAILURE;
    }

    drain(&orchestrator).await;
    ExitCode::SUCCESS
}

/// Resolves when either SIGINT or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received, draining in-flight requests");
}

/// Waits for in-flight validations to finish, up to [`DRAIN_MAX_WAIT`],
/// polling every [`DRAIN_POLL_INTERVAL`].
async fn drain(orchestrator: &Arc<Orchestrator>) {
    let deadline = tokio::time::Instant::now() + DRAIN_MAX_WAIT;
    loop {
        let in_flight = orchestrator.in_flight_count();
        if in_flight <= 0 {
            break;
        }
        if tokio::time::Instant::now() >= deadline {
            tracing::warn!(in_flight, "drain deadline exceeded, exiting with requests still in flight");
            break;
        }
        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
    }
}
