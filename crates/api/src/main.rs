//! HireFlow API server binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use hireflow_common::config::AppConfig;
use hireflow_notifier::{Mailer, NotificationQueue, QueueConfig};

use hireflow_api::routes::create_router;
use hireflow_api::state::AppState;

/// Largest accepted request body (batch announcements included).
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("hireflow_api=debug,hireflow_notifier=debug,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting HireFlow API server...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Build the notification queue
    let mailer = Mailer::from_config(&config)?;
    let queue_config = QueueConfig::from_app_config(&config)?;
    let queue = Arc::new(NotificationQueue::new(queue_config, mailer)?);

    // Build application state
    let state = AppState::new(Arc::clone(&queue), config.clone());

    // Build router
    let app = create_router(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    queue.start();

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Received shutdown signal, stopping gracefully...");
        })
        .await?;

    // Let an in-flight send finish before exiting
    queue.shutdown().await;

    let leftover = queue.status();
    if leftover.total > 0 {
        tracing::warn!(
            pending = leftover.pending,
            failed = leftover.failed,
            "Undelivered notifications dropped at shutdown"
        );
    }

    tracing::info!("HireFlow API server stopped.");
    Ok(())
}
