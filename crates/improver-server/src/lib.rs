//! Protocol Improver Server
//!
//! HTTP API for uploading laboratory protocols, reviewing them with an LLM
//! and downloading revised versions.

#![warn(missing_docs)]

pub mod config;
pub mod handlers;
pub mod storage;

use config::ServerConfig;
use handlers::{create_router, AppState};
use improver_analyzer::ProtocolAnalyzer;
use improver_llm::{AnthropicProvider, LlmError, SharedProvider};
use improver_store::InMemoryStore;
use std::sync::Arc;
use storage::FileStorage;
use tokio::net::TcpListener;
use tracing::info;

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Model provider could not be set up
    #[error("Provider error: {0}")]
    Provider(#[from] LlmError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Build the application state for a validated configuration
///
/// Creates the upload and output directories and connects the provider.
pub fn build_state(config: &ServerConfig) -> Result<AppState, ServerError> {
    config.prepare_directories()?;

    let provider: SharedProvider = Arc::new(AnthropicProvider::with_timeout(
        config.provider.base_url.clone(),
        config.provider.api_key.clone(),
        config.analyzer.model_timeout(),
    )?);

    let analyzer = ProtocolAnalyzer::new(provider, InMemoryStore::new(), config.analyzer.clone());

    Ok(AppState {
        analyzer: Arc::new(analyzer),
        storage: Arc::new(FileStorage::new(
            config.upload_dir.clone(),
            config.output_dir.clone(),
        )),
        max_file_size_bytes: config.max_file_size_bytes(),
        preview_chars: config.preview_chars,
    })
}

/// Start the HTTP server
///
/// Builds the application state and serves until the process is stopped.
pub async fn start_server(config: ServerConfig) -> Result<(), ServerError> {
    info!("Starting Protocol Improver API");
    info!("Bind address: {}", config.bind_addr());
    info!("Model: {}", config.analyzer.model);
    info!(
        "Upload dir: {}, output dir: {}",
        config.upload_dir.display(),
        config.output_dir.display()
    );
    info!("Max upload size: {}MB", config.max_file_size_mb);

    let state = build_state(&config)?;
    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Server listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::Server(e.to_string()))?;

    Ok(())
}
