//! HTTP transport for the background service using Axum
//!
//! Lets page hosts and UI surfaces outside the process exchange protocol
//! messages with the background service.

pub mod error;
pub mod handler;

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::background::BackgroundService;
use crate::config::HttpConfig;
use handler::{
    handle_events, handle_health, handle_message, handle_tab_complete, handle_tab_removed,
    AppState,
};

/// Bridge routes with permissive CORS
///
/// # Endpoints
/// - POST /message
/// - POST /tabs/{tab_id}/complete
/// - DELETE /tabs/{tab_id}
/// - GET /events
/// - GET /health
pub fn router(service: Arc<BackgroundService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/message", post(handle_message))
        .route("/tabs/{tab_id}/complete", post(handle_tab_complete))
        .route("/tabs/{tab_id}", delete(handle_tab_removed))
        .route("/events", get(handle_events))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { service })
}

/// Serves the bridge until Ctrl+C
pub async fn start_http_server(
    config: HttpConfig,
    service: Arc<BackgroundService>,
) -> anyhow::Result<()> {
    let app = router(service);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!("HTTP bridge listening on {}", config.addr);
    tracing::info!("Endpoint: POST http://{}/message", config.addr);

    // Create graceful shutdown handler
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    // Spawn shutdown signal handler
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received shutdown signal (Ctrl+C)");
                let _ = shutdown_tx.send(());
            }
            Err(err) => {
                tracing::error!("Failed to listen for shutdown signal: {}", err);
            }
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            tracing::info!("Shutting down HTTP bridge...");
        })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
