//! ============================================================================
//! RAG Pipeline - Per-request orchestration
//! ============================================================================
//! Sequences one request end to end, strictly in order:
//!   (transcribe) → retrieve → build prompt → generate → persist query
//! plus the two-pass bulk import of conversation exports.
//!
//! The pipeline owns no globals: the memory, model and transcriber are
//! handed in at construction and shared behind `Arc`s.
//! ============================================================================

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::AdamConfig;
use crate::conversations::ConversationExport;
use crate::llm::{GenerationError, LanguageModel};
use crate::memory::{MemoryManager, MemorySource};
use crate::prompt::build_prompt;
use crate::stt::Transcriber;

/// Progress is logged every this many imported fragments
pub const PROGRESS_INTERVAL: u64 = 100;

/// Errors surfaced by the pipeline
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Query must not be empty")]
    EmptyQuery,

    #[error("Speech-to-text is not configured")]
    SttUnavailable,

    #[error("Transcription failed: {0}")]
    Transcription(anyhow::Error),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Tunables for the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Number of memories retrieved as context
    pub context_results: u64,
    /// Whether answered queries are stored as memories
    pub persist_queries: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            context_results: 3,
            persist_queries: true,
        }
    }
}

impl From<&AdamConfig> for PipelineSettings {
    fn from(config: &AdamConfig) -> Self {
        Self {
            context_results: config.context_results,
            persist_queries: config.persist_queries,
        }
    }
}

/// Result of a spoken query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechAnswer {
    pub transcription: String,
    pub response: String,
}

/// Outcome of a bulk conversation import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    pub loaded: u64,
    pub total: u64,
    pub percent: f64,
}

impl LoadReport {
    fn new(loaded: u64, total: u64) -> Self {
        let percent = if total == 0 {
            100.0
        } else {
            loaded as f64 / total as f64 * 100.0
        };
        Self {
            loaded,
            total,
            percent,
        }
    }
}

/// Retrieval-augmented answering over the shared services
pub struct RagPipeline {
    memory: Arc<MemoryManager>,
    llm: Arc<dyn LanguageModel>,
    transcriber: Option<Arc<dyn Transcriber>>,
    settings: PipelineSettings,
}

impl RagPipeline {
    pub fn new(
        memory: Arc<MemoryManager>,
        llm: Arc<dyn LanguageModel>,
        transcriber: Option<Arc<dyn Transcriber>>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            memory,
            llm,
            transcriber,
            settings,
        }
    }

    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    pub fn llm(&self) -> &dyn LanguageModel {
        self.llm.as_ref()
    }

    pub fn has_transcriber(&self) -> bool {
        self.transcriber.is_some()
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Answer a text query with retrieved context
    pub async fn answer(&self, query: &str) -> Result<String, PipelineError> {
        if query.trim().is_empty() {
            return Err(PipelineError::EmptyQuery);
        }

        let context = self
            .memory
            .retrieve(query, self.settings.context_results)
            .await?;
        debug!("Retrieved {} context documents", context.len());

        let prompt = build_prompt(query, &context);
        let response = self.llm.generate(&prompt).await?;

        if self.settings.persist_queries {
            self.memory.add_memory(query).await?;
        }

        info!(
            "Answered query ({} chars) with {} chars",
            query.len(),
            response.len()
        );
        Ok(response)
    }

    /// Transcribe uploaded audio, then answer the transcription
    pub async fn answer_audio(&self, audio: &[u8]) -> Result<SpeechAnswer, PipelineError> {
        let transcriber = self
            .transcriber
            .clone()
            .ok_or(PipelineError::SttUnavailable)?;

        let transcription = transcribe_bytes(transcriber, audio.to_vec()).await?;
        info!("Transcription: {}", transcription);

        let response = self.answer(&transcription).await?;
        Ok(SpeechAnswer {
            transcription,
            response,
        })
    }

    /// Store every fragment of an export as a memory.
    /// Counts first so progress can be reported as a percentage.
    pub async fn load_conversations(
        &self,
        export: &ConversationExport,
    ) -> Result<LoadReport, PipelineError> {
        let total = export.count_fragments() as u64;
        info!(
            "Importing {} fragments from {} conversations",
            total,
            export.conversations.len()
        );

        let mut loaded = 0u64;
        for fragment in export.fragments() {
            self.memory
                .add_memory_with_source(fragment, MemorySource::Import)
                .await?;
            loaded += 1;

            if total > 0 && loaded % PROGRESS_INTERVAL == 0 {
                info!(
                    "Progress: {:.2}% ({}/{})",
                    loaded as f64 / total as f64 * 100.0,
                    loaded,
                    total
                );
            }
        }

        let report = LoadReport::new(loaded, total);
        info!("Import finished: {}/{} fragments", report.loaded, report.total);
        Ok(report)
    }
}

/// Write `audio` to a scoped temp file and transcribe it on the blocking pool.
/// The file is removed when the task ends, whatever the outcome.
async fn transcribe_bytes(
    transcriber: Arc<dyn Transcriber>,
    audio: Vec<u8>,
) -> Result<String, PipelineError> {
    let text = tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
        let mut file = tempfile::Builder::new()
            .prefix("adam-stt-")
            .suffix(".wav")
            .tempfile()?;
        file.write_all(&audio)?;
        file.flush()?;

        transcriber.transcribe(file.path())
    })
    .await
    .map_err(|e| PipelineError::Transcription(anyhow::anyhow!("Transcription task failed: {}", e)))?
    .map_err(PipelineError::Transcription)?;

    if text.trim().is_empty() {
        warn!("Transcription produced no text");
    }
    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryStore, VectorStore, WordHashEmbedder, BOOTSTRAP_DOCUMENT};
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    /// Records prompts and replies with a fixed answer
    struct RecordingModel {
        reply: Result<String, ()>,
        prompts: Mutex<Vec<String>>,
    }

    impl RecordingModel {
        fn answering(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(vec![]),
            }
        }

        fn empty() -> Self {
            Self {
                reply: Err(()),
                prompts: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for RecordingModel {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().map_err(|_| GenerationError::Empty)
        }

        fn provider_name(&self) -> &'static str {
            "recording"
        }

        fn model_name(&self) -> &str {
            "test"
        }
    }

    /// Returns a fixed transcription and remembers which file it read
    struct FixedTranscriber {
        text: Result<String, String>,
        seen: Mutex<Option<PathBuf>>,
    }

    impl Transcriber for FixedTranscriber {
        fn transcribe(&self, path: &Path) -> Result<String> {
            assert!(path.exists());
            *self.seen.lock().unwrap() = Some(path.to_path_buf());
            self.text.clone().map_err(|e| anyhow!(e))
        }
    }

    async fn pipeline_with(
        model: Arc<RecordingModel>,
        transcriber: Option<Arc<dyn Transcriber>>,
        settings: PipelineSettings,
    ) -> (RagPipeline, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::default());
        let memory = MemoryManager::open(Arc::new(WordHashEmbedder), store.clone())
            .await
            .unwrap();
        (
            RagPipeline::new(Arc::new(memory), model, transcriber, settings),
            store,
        )
    }

    #[tokio::test]
    async fn test_answer_on_fresh_store_uses_bootstrap_context() {
        let model = Arc::new(RecordingModel::answering("Paris."));
        let (pipeline, _) = pipeline_with(model.clone(), None, PipelineSettings::default()).await;

        let answer = pipeline.answer("What is the capital of France?").await.unwrap();
        assert_eq!(answer, "Paris.");

        let prompts = model.prompts.lock().unwrap();
        assert_eq!(
            prompts[0],
            format!(
                "[User Question]: What is the capital of France? [Relevant Info]: {} [Answer]:",
                BOOTSTRAP_DOCUMENT
            )
        );
    }

    #[tokio::test]
    async fn test_answer_persists_query() {
        let model = Arc::new(RecordingModel::answering("Paris."));
        let (pipeline, store) = pipeline_with(model, None, PipelineSettings::default()).await;

        pipeline.answer("What is the capital of France?").await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);

        let docs = pipeline.memory().retrieve("capital of France", 3).await.unwrap();
        assert!(docs.contains(&"What is the capital of France?".to_string()));
    }

    #[tokio::test]
    async fn test_answer_without_persisting() {
        let model = Arc::new(RecordingModel::answering("ok"));
        let settings = PipelineSettings {
            context_results: 3,
            persist_queries: false,
        };
        let (pipeline, store) = pipeline_with(model, None, settings).await;

        pipeline.answer("hello").await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_generation_is_error_and_not_persisted() {
        let model = Arc::new(RecordingModel::empty());
        let (pipeline, store) = pipeline_with(model, None, PipelineSettings::default()).await;

        let err = pipeline.answer("hello").await.unwrap_err();
        assert!(matches!(err, PipelineError::Generation(GenerationError::Empty)));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_blank_query_rejected() {
        let model = Arc::new(RecordingModel::answering("x"));
        let (pipeline, _) = pipeline_with(model.clone(), None, PipelineSettings::default()).await;

        assert!(matches!(pipeline.answer("   ").await, Err(PipelineError::EmptyQuery)));
        assert!(model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_answer_audio() {
        let model = Arc::new(RecordingModel::answering("Paris."));
        let transcriber = Arc::new(FixedTranscriber {
            text: Ok(" What is the capital of France? ".to_string()),
            seen: Mutex::new(None),
        });
        let (pipeline, _) = pipeline_with(
            model,
            Some(transcriber.clone() as Arc<dyn Transcriber>),
            PipelineSettings::default(),
        )
        .await;

        let answer = pipeline.answer_audio(b"RIFF....").await.unwrap();
        assert_eq!(answer.transcription, "What is the capital of France?");
        assert_eq!(answer.response, "Paris.");

        let seen = transcriber.seen.lock().unwrap().clone().unwrap();
        assert!(!seen.exists(), "temp audio file should be removed");
    }

    #[tokio::test]
    async fn test_temp_file_removed_on_transcription_failure() {
        let model = Arc::new(RecordingModel::answering("x"));
        let transcriber = Arc::new(FixedTranscriber {
            text: Err("cannot decode".to_string()),
            seen: Mutex::new(None),
        });
        let (pipeline, _) = pipeline_with(
            model,
            Some(transcriber.clone() as Arc<dyn Transcriber>),
            PipelineSettings::default(),
        )
        .await;

        let err = pipeline.answer_audio(b"garbage").await.unwrap_err();
        assert!(matches!(err, PipelineError::Transcription(_)));

        let seen = transcriber.seen.lock().unwrap().clone().unwrap();
        assert!(!seen.exists());
    }

    #[tokio::test]
    async fn test_answer_audio_without_transcriber() {
        let model = Arc::new(RecordingModel::answering("x"));
        let (pipeline, _) = pipeline_with(model, None, PipelineSettings::default()).await;
        assert!(matches!(
            pipeline.answer_audio(b"x").await,
            Err(PipelineError::SttUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_load_conversations() {
        let model = Arc::new(RecordingModel::answering("x"));
        let (pipeline, store) = pipeline_with(model, None, PipelineSettings::default()).await;

        let export = ConversationExport::from_slice(
            br#"[
                {"mapping": {"a": {"message": {"content": {"parts": ["one", " ", "two"]}}}}},
                {"title": "no mapping"},
                {"mapping": {"b": {"message": {"content": {"parts": [{"x": 1}, "three"]}}}}}
            ]"#,
        )
        .unwrap();

        let report = pipeline.load_conversations(&export).await.unwrap();
        assert_eq!(report, LoadReport { loaded: 3, total: 3, percent: 100.0 });
        assert_eq!(store.count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_load_many_fragments() {
        let model = Arc::new(RecordingModel::answering("x"));
        let (pipeline, _) = pipeline_with(model, None, PipelineSettings::default()).await;

        let parts: Vec<String> = (0..250).map(|i| format!("fragment {}", i)).collect();
        let json = serde_json::json!([{ "mapping": { "m": { "message": { "content": { "parts": parts } } } } }]);
        let export: ConversationExport = serde_json::from_value(json).unwrap();

        let report = pipeline.load_conversations(&export).await.unwrap();
        assert_eq!(report.loaded, 250);
        assert_eq!(report.percent, 100.0);
    }

    #[test]
    fn test_load_report_empty_is_complete() {
        assert_eq!(LoadReport::new(0, 0).percent, 100.0);
        assert_eq!(LoadReport::new(1, 4).percent, 25.0);
    }
}
