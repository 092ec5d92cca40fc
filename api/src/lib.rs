//! HTTP surface of the review service.
//!
//! `POST /webhook` receives vendor events (signature-verified, acked before
//! the pipeline runs); `GET /health` answers liveness probes. Startup fails
//! with a non-zero exit for unrecoverable configuration problems: a missing
//! credential for the selected platform or an invalid index storage config.

mod core;
mod error_handler;
mod routes;
mod webhook;

use std::sync::Arc;

use ai_llm_service::{LlmConfig, ProviderChain};
use axum::{
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use code_indexer::{IndexManager, IndexerConfig};
use tokio::signal;
use tracing::info;

use crate::core::app_state::{AppConfig, AppState};
use crate::error_handler::{AppError, AppResult};
use crate::routes::{health_route::health, webhook_route::webhook};

pub async fn start() -> AppResult<()> {
    // Strict config read; missing platform credentials abort startup.
    let config = Arc::new(AppConfig::from_env()?);

    let llm_cfg = LlmConfig::from_env().map_err(|e| AppError::Startup(e.to_string()))?;
    let chain =
        Arc::new(ProviderChain::from_config(&llm_cfg).map_err(|e| AppError::Startup(e.to_string()))?);

    // Invalid storage config is unrecoverable when indexing is requested.
    let index = if config.enable_indexing {
        let idx_cfg = IndexerConfig::from_env().map_err(|e| AppError::Startup(e.to_string()))?;
        let manager =
            IndexManager::from_config(&idx_cfg).map_err(|e| AppError::Startup(e.to_string()))?;
        info!("code indexing enabled");
        Some(Arc::new(manager))
    } else {
        None
    };

    let state = Arc::new(AppState {
        config: config.clone(),
        chain,
        index,
        max_chunk_tokens: llm_cfg.chunk_max_tokens(),
    });

    let app = Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .fallback(handler_404)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.address)
        .await
        .map_err(AppError::Bind)?;
    info!("listening on {}", config.address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    Ok(())
}

/// Graceful shutdown on Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        // If even listening for Ctrl+C fails, just log to stderr.
        eprintln!("failed to listen for shutdown signal: {e}");
    }
}

/// Fallback handler for unmatched routes.
async fn handler_404() -> impl IntoResponse {
    AppError::NotFound
}
