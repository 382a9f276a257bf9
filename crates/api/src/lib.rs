//! Sensor Station API Server
//!
//! Accepts environmental readings over HTTP, stores them through the
//! reading store, and serves the most recent window for the dashboard.

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use storage::ReadingStore;
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

pub mod error;
pub mod routes;
pub mod settings;

pub use error::ApiError;
pub use settings::{LoggingSettings, Settings};

/// Number of readings served by `/readings` unless configured otherwise
pub const DEFAULT_WINDOW: usize = 100;

/// Application state shared across handlers
pub struct AppState {
    /// Reading store, opened and initialized before the server starts
    pub store: ReadingStore,
    /// Size of the retrieval window
    pub window: usize,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
    /// Prometheus handle, if a recorder was installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state around an initialized store
    pub fn new(store: ReadingStore) -> Self {
        Self {
            store,
            window: DEFAULT_WINDOW,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
            metrics: None,
        }
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn with_metrics(mut self, metrics: Option<PrometheusHandle>) -> Self {
        self.metrics = metrics;
        self
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: String,
    pub uptime_seconds: u64,
    /// Stored reading count, absent when the store cannot be queried
    pub readings: Option<u64>,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/",
            get(routes::dashboard::index).post(routes::ingest::receive_reading),
        )
        .route("/readings", get(routes::readings::get_readings))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(CatchPanicLayer::custom(error::handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let readings = state.store.count().await.ok();
    let (status_code, status) = match readings {
        Some(_) => (StatusCode::OK, "healthy"),
        None => (StatusCode::SERVICE_UNAVAILABLE, "degraded"),
    };

    let response = HealthResponse {
        status,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        readings,
    };

    (status_code, Json(response))
}

/// Prometheus exposition handler
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Initialize logging
pub fn init_logging(settings: &LoggingSettings) -> anyhow::Result<()> {
    let level: Level = settings
        .level
        .parse()
        .with_context(|| format!("invalid log level {:?}", settings.level))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let result = if settings.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.context("failed to set tracing subscriber")?;

    Ok(())
}

/// Serve the router on an already bound listener until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let app = create_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Open the store, initialize the schema, and run the server.
///
/// Any failure before the listener is bound is fatal; the server never
/// accepts traffic against an uninitialized store.
pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    let store = ReadingStore::open(&settings.database.store_options())
        .await
        .context("failed to open reading store")?;
    store
        .initialize()
        .await
        .context("failed to initialize reading store")?;

    let metrics = if settings.metrics.enabled {
        Some(
            PrometheusBuilder::new()
                .install_recorder()
                .context("failed to install metrics recorder")?,
        )
    } else {
        None
    };

    let state = Arc::new(
        AppState::new(store.clone())
            .with_window(settings.retrieval.window)
            .with_metrics(metrics),
    );

    let addr = settings.server.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Starting API server on {}", addr);

    serve(listener, state, shutdown_signal()).await?;

    store.close().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested, draining in-flight requests"),
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await
        }
    }
}
