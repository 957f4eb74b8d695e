//! Persona chat - research-study chat assistant
//!
//! Serves a single conversation with a selectable persona, backed by a
//! Gemini-style completion endpoint.

mod api;
mod config;
mod llm;
mod persona;
mod session;

use api::{create_router, AppState};
use config::{AppConfig, ConfigError};
use llm::{CompletionClient, GeminiClient, LoggingClient};
use session::SessionController;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "persona_chat=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = AppConfig::from_env().inspect_err(|e| {
        tracing::error!(category = ConfigError::CATEGORY, error = %e, "Invalid configuration");
    })?;
    tracing::info!(config = ?config, "Configuration loaded");

    let registry = Arc::new(config.load_registry().inspect_err(|e| {
        tracing::error!(
            category = ConfigError::CATEGORY,
            error = %e,
            "Failed to load persona catalog"
        );
    })?);
    tracing::info!(
        personas = registry.list().len(),
        default = ?registry.info().default_persona,
        allow_switching = registry.info().allow_switching,
        "Persona catalog loaded"
    );

    // Completion client
    let gemini = GeminiClient::new(
        config.api_key.clone(),
        &config.model,
        &config.base_url,
        config.timeout,
    )?;
    let client: Arc<dyn CompletionClient> = Arc::new(LoggingClient::new(Arc::new(gemini)));

    // Session
    let controller = SessionController::new(
        registry,
        config.session_context(),
        client,
        config.latency,
    );
    let state = AppState::new(controller);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new().gzip(true).br(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(model = %config.model, "Persona chat server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
