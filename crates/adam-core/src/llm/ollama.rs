//! Ollama HTTP client (`POST /api/generate`, `stream: false`).

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{finish_output, GenerationError, LanguageModel};

/// Ollama API client for a locally served model
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    model_name: String,
    timeout: Duration,
    http_client: Client,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize, Debug)]
struct OllamaResponse {
    response: String,
    #[serde(default)]
    total_duration: Option<u64>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Deserialize, Debug)]
struct OllamaError {
    error: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model_name: &str, timeout: Duration) -> anyhow::Result<Self> {
        if base_url.trim().is_empty() {
            return Err(anyhow!("Ollama base URL cannot be empty"));
        }

        let http_client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model_name: model_name.to_string(),
            timeout,
            http_client,
        })
    }

    fn api_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    fn request_error(&self, e: reqwest::Error) -> GenerationError {
        if e.is_timeout() {
            GenerationError::Timeout(self.timeout)
        } else {
            GenerationError::Failed(format!("Ollama request failed: {}", e))
        }
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        debug!(
            "Generating with Ollama model {} ({} prompt chars)",
            self.model_name,
            prompt.len()
        );

        let request = OllamaRequest {
            model: &self.model_name,
            prompt,
            stream: false,
        };

        let response = self
            .http_client
            .post(self.api_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.request_error(e))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<OllamaError>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(GenerationError::Failed(format!(
                "Ollama API error ({}): {}",
                status, detail
            )));
        }

        let parsed: OllamaResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::Failed(format!("Failed to parse Ollama response: {}", e)))?;

        if let (Some(total), Some(eval_count)) = (parsed.total_duration, parsed.eval_count) {
            debug!(
                "Ollama performance: total_duration={}ms, eval_tokens={}",
                total / 1_000_000,
                eval_count
            );
        }

        finish_output(&parsed.response)
    }

    fn provider_name(&self) -> &'static str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
