//! ============================================================================
//! ADAM-CORE: Adam's Brain
//! ============================================================================
//! Everything behind the HTTP surface of the memory agent:
//! - Vector memory (embeddings + Qdrant) with bootstrap seeding
//! - Local whisper-rs transcription of uploaded audio
//! - Language model clients (Ollama HTTP or local command) with timeouts
//! - The RAG pipeline and bulk conversation import
//! ============================================================================

pub mod config;
pub mod conversations;
pub mod llm;
pub mod memory;
pub mod pipeline;
pub mod prompt;
pub mod stt;

// Re-export main types for convenience
pub use config::{AdamConfig, LlmBackend, StoreBackend};
pub use conversations::{ConversationError, ConversationExport};
pub use llm::{create_language_model, GenerationError, LanguageModel};
pub use memory::{Embedder, MemoryEntry, MemoryManager, MemorySource, VectorStore};
pub use pipeline::{LoadReport, PipelineError, PipelineSettings, RagPipeline, SpeechAnswer};
pub use stt::Transcriber;

#[cfg(feature = "native-audio")]
pub use stt::WhisperTranscriber;
