//! HTTP server for the analysis API.
//!
//! Serves `POST /analyze` and `GET /health` on the configured port.

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::emotion::EmotionClassifier;
use crate::facial::{self, FacialClassifier};
use crate::fusion::FusionEngine;
use crate::speech;

use super::handlers;

/// Maximum accepted request body
pub const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Shared state for the analysis server
#[derive(Clone)]
pub struct AppState {
    pub facial: Arc<dyn EmotionClassifier>,
    pub speech: Arc<dyn EmotionClassifier>,
    pub fusion: Arc<FusionEngine>,
    pub diagnostics: bool,
    pub facial_backend: String,
    pub speech_backend: String,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        facial: Arc<dyn EmotionClassifier>,
        speech: Arc<dyn EmotionClassifier>,
        fusion: FusionEngine,
    ) -> Self {
        Self {
            facial,
            speech,
            fusion: Arc::new(fusion),
            diagnostics: false,
            facial_backend: "custom".to_string(),
            speech_backend: "custom".to_string(),
            started_at: Instant::now(),
        }
    }

    /// Build both classifiers and the fusion engine from `config`.
    ///
    /// The facial backend is loaded here; the speech model loads on first use.
    pub fn from_config(config: &Config) -> Self {
        let facial = FacialClassifier::new(
            facial::backend_from_config(&config.facial),
            config.facial.concerning_threshold,
        );
        let speech = speech::classifier_from_config(&config.speech);

        let facial_backend = facial.backend_name().to_string();
        let speech_backend = speech.backend_name().to_string();

        Self {
            facial_backend,
            speech_backend,
            diagnostics: config.diagnostics,
            ..Self::new(
                Arc::new(facial),
                Arc::new(speech),
                FusionEngine::new(config.fusion.clone()),
            )
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: bool) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

/// Build the router with body limit and permissive CORS
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/analyze", post(handlers::analyze))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Serve until Ctrl+C
pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind analysis server to {}", addr))?;
    info!("Analysis server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Analysis server error")?;

    info!("Analysis server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
    }
}
