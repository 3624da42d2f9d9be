//! ============================================================================
//! LLM Module - Clients for the locally hosted language model
//! ============================================================================
//! One async interface, two ways to reach the model:
//! - OllamaClient: Ollama HTTP API (`/api/generate`, non-streaming)
//! - CommandModel: a local command fed the prompt on stdin (`ollama run`)
//!
//! Both enforce a timeout. An empty answer is an error, not a valid reply.
//! ============================================================================

mod command;
mod ollama;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AdamConfig, LlmBackend};

pub use command::CommandModel;
pub use ollama::OllamaClient;

/// Ways a generation call can fail
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Language model returned an empty response")]
    Empty,

    #[error("Language model timed out after {0:?}")]
    Timeout(Duration),

    #[error("Language model failed: {0}")]
    Failed(String),
}

/// Common interface for language model backends
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a complete (non-streamed) answer for `prompt`
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Get the provider name (for logging/health)
    fn provider_name(&self) -> &'static str;

    /// Get the model name being used
    fn model_name(&self) -> &str;
}

/// Trim the raw output; whitespace-only output counts as no answer
pub(crate) fn finish_output(raw: &str) -> Result<String, GenerationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(GenerationError::Empty);
    }
    Ok(trimmed.to_string())
}

/// Build the language model client selected by the config
pub fn create_language_model(config: &AdamConfig) -> anyhow::Result<Arc<dyn LanguageModel>> {
    match config.llm_backend {
        LlmBackend::Http => Ok(Arc::new(OllamaClient::new(
            &config.ollama_url,
            &config.llm_model,
            config.llm_timeout(),
        )?)),
        LlmBackend::Command => Ok(Arc::new(CommandModel::new(
            &config.llm_command,
            vec!["run".to_string(), config.llm_model.clone()],
            &config.llm_model,
            config.llm_timeout(),
        ))),
    }
}
