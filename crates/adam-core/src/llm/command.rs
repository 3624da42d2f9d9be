//! Language model reached through a local command (e.g. `ollama run llama3`).
//! The prompt goes in on stdin; the full stdout is the answer.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{finish_output, GenerationError, LanguageModel};

/// One-shot process per prompt, killed if it outlives the timeout
#[derive(Debug, Clone)]
pub struct CommandModel {
    program: String,
    args: Vec<String>,
    model_name: String,
    timeout: Duration,
}

impl CommandModel {
    pub fn new(program: &str, args: Vec<String>, model_name: &str, timeout: Duration) -> Self {
        Self {
            program: program.to_string(),
            args,
            model_name: model_name.to_string(),
            timeout,
        }
    }

    async fn run(&self, prompt: &str) -> Result<std::process::Output, GenerationError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| GenerationError::Failed(format!("Failed to spawn {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            let input = prompt.as_bytes().to_vec();
            // Feed stdin concurrently so a chatty child cannot deadlock on a full pipe
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&input).await {
                    warn!("Failed to write prompt to model stdin: {}", e);
                }
            });
        }

        child
            .wait_with_output()
            .await
            .map_err(|e| GenerationError::Failed(format!("Failed to wait for {}: {}", self.program, e)))
    }
}

#[async_trait]
impl LanguageModel for CommandModel {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        debug!(
            "Running {} {:?} ({} prompt chars)",
            self.program,
            self.args,
            prompt.len()
        );

        // Dropping the timed-out future drops the child, which kills it
        let output = tokio::time::timeout(self.timeout, self.run(prompt))
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GenerationError::Failed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        finish_output(&String::from_utf8_lossy(&output.stdout))
    }

    fn provider_name(&self) -> &'static str {
        "command"
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
