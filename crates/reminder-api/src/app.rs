//! Application builder: wires router, middleware, and state into an Axum
//! app, and serves it.

use axum::Router;
use axum::middleware as axum_middleware;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use reminder_core::config::ServerConfig;
use reminder_core::error::{AppError, ErrorKind};

use crate::middleware::cors::build_cors_layer;
use crate::middleware::logging::request_logging;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState, config: &ServerConfig) -> Router {
    build_router(state)
        .layer(build_cors_layer(config))
        .layer(TraceLayer::new_for_http())
        .layer(axum_middleware::from_fn(request_logging))
}

/// Binds the configured address.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, AppError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        AppError::with_source(ErrorKind::Internal, format!("Failed to bind {addr}"), e)
    })?;
    tracing::info!(addr = %addr, "HTTP server listening");
    Ok(listener)
}

/// Serves `app` on `listener` until `shutdown` turns true.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), AppError> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow_and_update() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
            tracing::info!("HTTP server draining connections");
        })
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Internal, "HTTP server error", e))
}
