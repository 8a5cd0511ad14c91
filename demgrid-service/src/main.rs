//! demgrid Service - HTTP microservice for elevation grid queries.
//!
//! Loads one elevation grid into memory at startup and answers lookups
//! against it until shut down.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DEMGRID_CONFIG` | YAML configuration file | `config/config.yaml` |
//! | `PORT` / `DEMGRID_PORT` | HTTP server port | 8080 |
//! | `DEMGRID_DATA_PATH` | Grid data file | `data/elevation.bin` |
//! | `DEMGRID_HEADER_PATH` | Grid header file | `<data path>.header` |
//! | `DEMGRID_BASE_DIR` | Base for relative paths | executable directory |
//! | `DEMGRID_CACHE_SIZE` | Maximum cached results | 1000000 |
//! | `DEMGRID_CACHE_TTL_SECS` | Cached result lifetime | None |
//! | `DEMGRID_MAX_BATCH_SIZE` | Largest batch request | 1000 |
//! | `DEMGRID_WORKER_THREADS` | Runtime worker threads | CPU cores |
//! | `RUST_LOG` | Log level (e.g., "info", "debug") | "info" |
//!
//! ## Endpoints
//!
//! - `GET /elevation?lat=X&lon=Y` - Get elevation at coordinates
//! - `POST /elevation/batch` - Batch elevation query
//! - `GET /health` - Health check
//! - `GET /stats` - Cache statistics
//! - `GET /docs` - OpenAPI documentation (Swagger UI)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use demgrid_service::{
    config::{executable_dir, DEFAULT_CONFIG_PATH},
    router, AppState, ServiceConfig,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "demgrid_service=info,demgrid=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("DEMGRID_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = ServiceConfig::load(&config_path)?;

    let mut runtime = tokio::runtime::Builder::new_multi_thread();
    runtime.enable_all();
    if let Some(threads) = config.server.runtime_worker_threads() {
        runtime.worker_threads(threads);
    }

    runtime.build()?.block_on(serve(config, config_path))
}

async fn serve(
    config: ServiceConfig,
    config_path: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let builder = config.service_builder(&executable_dir());
    tracing::info!(
        config = %config_path.display(),
        data_path = %builder.data_file().display(),
        header_path = %builder.header_file().display(),
        cache_capacity = config.cache.capacity,
        cache_ttl_secs = ?config.cache.ttl_secs,
        "Loading elevation data"
    );

    let service = match tokio::task::spawn_blocking(move || builder.build()).await? {
        Ok(service) => service,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize elevation service");
            return Err(e.into());
        }
    };

    let state = Arc::new(AppState {
        service,
        max_batch_size: config.server.max_batch_size,
    });

    if config.server.metrics_interval_secs > 0 {
        tokio::spawn(log_metrics(
            Arc::clone(&state),
            Duration::from_secs(config.server.metrics_interval_secs),
        ));
    }

    let app = router(Arc::clone(&state)).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(config.server.request_timeout()))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
    );

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        threads = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        "Listening on http://{}",
        addr
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
    });

    tokio::select! {
        result = &mut server => {
            result??;
            return Ok(());
        }
        _ = shutdown_signal() => {}
    }

    tracing::info!("Server is shutting down...");
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(config.server.shutdown_timeout(), server).await {
        Ok(result) => result??,
        Err(_) => tracing::warn!(
            timeout_secs = config.server.shutdown_timeout_secs,
            "Graceful shutdown timed out, dropping open connections"
        ),
    }

    tracing::info!(
        total_requests = state.service.total_requests(),
        "Server stopped"
    );

    Ok(())
}

/// Periodically log a health snapshot.
async fn log_metrics(state: Arc<AppState>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let health = state.service.health();
        tracing::info!(
            status = %health.status,
            memory_mb = health.memory_mb,
            threads = health.threads,
            uptime_s = health.uptime_seconds as u64,
            requests = health.total_requests,
            "Metrics"
        );
    }
}

/// Resolve when SIGINT or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
