//! ============================================================================
//! Configuration - Environment-driven settings for Adam
//! ============================================================================
//! All settings come from environment variables (a `.env` file is loaded by
//! the binaries via dotenvy before this runs). Every field has a default so
//! the service starts against a stock local Ollama + Qdrant setup.
//! ============================================================================

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Which vector store backs the memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Qdrant over gRPC (persistent)
    Qdrant,
    /// Process-local store, lost on exit
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "qdrant" => Ok(StoreBackend::Qdrant),
            "memory" | "in-memory" | "in_memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Unknown store backend: {}", s)),
        }
    }
}

/// How the language model is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmBackend {
    /// Ollama HTTP API (`/api/generate`)
    Http,
    /// Local command fed on stdin (`ollama run <model>`)
    Command,
}

impl std::str::FromStr for LlmBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" | "ollama" => Ok(LlmBackend::Http),
            "command" | "cli" | "process" => Ok(LlmBackend::Command),
            _ => Err(format!("Unknown LLM backend: {}", s)),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdamConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreBackend,
    pub qdrant_url: String,
    pub collection: String,
    pub embedding_url: String,
    pub embedding_model: String,
    pub embedding_api_key: Option<String>,
    pub whisper_model_path: String,
    pub whisper_language: String,
    pub llm_backend: LlmBackend,
    pub ollama_url: String,
    pub llm_model: String,
    pub llm_command: String,
    pub llm_timeout_secs: u64,
    /// Number of memories pulled into each prompt
    pub context_results: u64,
    /// Store every answered query as a new memory
    pub persist_queries: bool,
    pub max_upload_bytes: usize,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            store: StoreBackend::Qdrant,
            qdrant_url: "http://localhost:6334".to_string(),
            collection: "adam_memories".to_string(),
            embedding_url: "http://localhost:11434/v1".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            embedding_api_key: None,
            whisper_model_path: "model/whisper/ggml-base.en.bin".to_string(),
            whisper_language: "en".to_string(),
            llm_backend: LlmBackend::Http,
            ollama_url: "http://localhost:11434".to_string(),
            llm_model: "llama3".to_string(),
            llm_command: "ollama".to_string(),
            llm_timeout_secs: 120,
            context_results: 3,
            persist_queries: true,
            max_upload_bytes: 64 * 1024 * 1024,
        }
    }
}

impl AdamConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    /// Unset keys keep their defaults; malformed values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("ADAM_HOST") {
            config.host = v;
        }
        if let Some(v) = get("ADAM_PORT") {
            config.port = parse_value("ADAM_PORT", &v)?;
        }
        if let Some(v) = get("ADAM_STORE") {
            config.store = v.parse().map_err(|e: String| anyhow!("ADAM_STORE: {}", e))?;
        }
        if let Some(v) = get("QDRANT_URL") {
            config.qdrant_url = v;
        }
        if let Some(v) = get("ADAM_COLLECTION") {
            config.collection = v;
        }
        if let Some(v) = get("ADAM_EMBEDDING_URL") {
            config.embedding_url = v;
        }
        if let Some(v) = get("ADAM_EMBEDDING_MODEL") {
            config.embedding_model = v;
        }
        config.embedding_api_key = get("ADAM_EMBEDDING_API_KEY");
        if let Some(v) = get("ADAM_WHISPER_MODEL") {
            config.whisper_model_path = v;
        }
        if let Some(v) = get("ADAM_WHISPER_LANGUAGE") {
            config.whisper_language = v;
        }
        if let Some(v) = get("ADAM_LLM_BACKEND") {
            config.llm_backend = v
                .parse()
                .map_err(|e: String| anyhow!("ADAM_LLM_BACKEND: {}", e))?;
        }
        if let Some(v) = get("ADAM_OLLAMA_URL") {
            config.ollama_url = v;
        }
        if let Some(v) = get("ADAM_LLM_MODEL") {
            config.llm_model = v;
        }
        if let Some(v) = get("ADAM_LLM_COMMAND") {
            config.llm_command = v;
        }
        if let Some(v) = get("ADAM_LLM_TIMEOUT_SECS") {
            config.llm_timeout_secs = parse_value("ADAM_LLM_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("ADAM_CONTEXT_RESULTS") {
            config.context_results = parse_value("ADAM_CONTEXT_RESULTS", &v)?;
        }
        if let Some(v) = get("ADAM_PERSIST_QUERIES") {
            config.persist_queries = parse_bool("ADAM_PERSIST_QUERIES", &v)?;
        }
        if let Some(v) = get("ADAM_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse_value("ADAM_MAX_UPLOAD_BYTES", &v)?;
        }

        Ok(config)
    }

    /// Socket address the HTTP service binds to
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse::<SocketAddr>()
            .map_err(|e| anyhow!("Invalid bind address {}:{}: {}", self.host, self.port, e))
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| anyhow!("Invalid value for {}: '{}' ({})", key, value, e))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!("Invalid boolean for {}: '{}'", key, value)),
    }
}
