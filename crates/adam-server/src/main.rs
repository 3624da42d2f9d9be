// ============================================================================
// adam-server - HTTP entry point for the Adam memory agent
// ============================================================================
// Startup order: .env → logging → config → memory (embeddings + vector
// store, seeded if empty) → language model → optional whisper → serve.
// ============================================================================

use adam_core::{
    create_language_model, memory, AdamConfig, PipelineSettings, RagPipeline, Transcriber,
};
use adam_server::{create_router, AppState};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Could not load .env file: {}", e);
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("adam_server=debug".parse()?)
                .add_directive("adam_core=debug".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    info!("Starting Adam memory agent");

    let config = AdamConfig::from_env().context("Invalid configuration")?;

    let memory = memory::open_memory(&config)
        .await
        .context("Failed to initialize memory system")?;
    info!(
        "Memory ready (store: {:?}, collection: {}, embeddings: {})",
        config.store,
        config.collection,
        memory.embedding_model()
    );

    let llm = create_language_model(&config)?;
    info!(
        "Language model: {} via {}",
        llm.model_name(),
        llm.provider_name()
    );

    let transcriber = load_transcriber(&config);

    let pipeline = RagPipeline::new(
        Arc::new(memory),
        llm,
        transcriber,
        PipelineSettings::from(&config),
    );
    let app = create_router(AppState::new(pipeline), config.max_upload_bytes);

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server stopped with error")?;

    info!("Adam stopped");
    Ok(())
}

#[cfg(feature = "native-audio")]
fn load_transcriber(config: &AdamConfig) -> Option<Arc<dyn Transcriber>> {
    match adam_core::WhisperTranscriber::load(&config.whisper_model_path, &config.whisper_language) {
        Ok(whisper) => Some(Arc::new(whisper)),
        Err(e) => {
            warn!("Speech-to-text disabled: {} - /stt-rag will answer 503", e);
            None
        }
    }
}

#[cfg(not(feature = "native-audio"))]
fn load_transcriber(_config: &AdamConfig) -> Option<Arc<dyn Transcriber>> {
    warn!("Built without native-audio - /stt-rag will answer 503");
    None
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
