use crate::handlers;
use axum::{Router, routing::get};
use std::future::Future;
use std::sync::Arc;
use tracing::info;
use vitrine_core::config::ServerConfig;
use vitrine_exposition::MetricsHandler;
use vitrine_observability::HandlerMetrics;

/// Shared state for the HTTP surface.
pub struct AdminState {
    pub handler: MetricsHandler,
    /// Scrape counters; `None` leaves the endpoint uninstrumented.
    pub metrics: Option<HandlerMetrics>,
    pub metrics_path: String,
}

impl AdminState {
    pub fn new(handler: MetricsHandler, metrics_path: impl Into<String>) -> Self {
        Self {
            handler,
            metrics: None,
            metrics_path: metrics_path.into(),
        }
    }

    pub fn with_metrics(mut self, metrics: HandlerMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

/// Build the Axum router: the scrape endpoint plus `/health`.
pub fn build_admin_router(state: Arc<AdminState>) -> Router {
    Router::new()
        .route(&state.metrics_path, get(handlers::metrics::scrape))
        .route("/health", get(handlers::health::health_check))
        .with_state(state)
}

/// Serve until `shutdown` resolves, then drain in-flight scrapes.
pub async fn start_admin(
    config: ServerConfig,
    state: Arc<AdminState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = build_admin_router(state);

    info!(addr = %config.addr, path = %config.metrics_path, "Starting metrics endpoint");

    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Metrics endpoint stopped");
    Ok(())
}
