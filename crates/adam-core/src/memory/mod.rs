//! ============================================================================
//! Memory Module - Persistent vector memory for Adam
//! ============================================================================
//! Every answered query and every imported conversation fragment becomes a
//! memory: its text plus the embedding of that text, stored under a fresh id.
//!
//! ## Architecture
//! ```text
//! text ──► Embedder ──► vector ──► VectorStore (Qdrant | in-memory)
//!                                        │
//! query ─► Embedder ─► nearest-neighbour search ─► top-N documents
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use adam_core::memory::{EmbeddingService, MemoryManager, QdrantStore};
//!
//! let embeddings = Arc::new(EmbeddingService::from_config(&config));
//! let store = Arc::new(QdrantStore::connect(&config.qdrant_url, &config.collection)?);
//! let memory = MemoryManager::open(embeddings, store).await?;
//!
//! memory.add_memory("The user lives in Lyon").await?;
//! let context = memory.retrieve("where do I live", 3).await?;
//! ```
//! ============================================================================

mod embeddings;
mod in_memory;
mod manager;
mod store;
#[cfg(any(test, feature = "test-util"))]
mod testing;
mod types;

use anyhow::Result;
use std::sync::Arc;

use crate::config::{AdamConfig, StoreBackend};

pub use embeddings::{Embedder, EmbeddingService};
pub use in_memory::{cosine_similarity, InMemoryStore};
pub use manager::{MemoryManager, BOOTSTRAP_DOCUMENT, BOOTSTRAP_ID};
pub use store::{QdrantStore, VectorStore, COLLECTION_NAME};
pub use types::{MemoryEntry, MemorySource, MemoryStats, ScoredMemory};

#[cfg(any(test, feature = "test-util"))]
pub use testing::{WordHashEmbedder, WORD_HASH_DIM};

/// Build the vector store selected by the config
pub fn create_vector_store(config: &AdamConfig) -> Result<Arc<dyn VectorStore>> {
    match config.store {
        StoreBackend::Qdrant => Ok(Arc::new(QdrantStore::connect(
            &config.qdrant_url,
            &config.collection,
        )?)),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory vector store - memories are lost on exit");
            Ok(Arc::new(InMemoryStore::new(&config.collection)))
        }
    }
}

/// Build the memory manager described by the config (embeddings + store)
pub async fn open_memory(config: &AdamConfig) -> Result<MemoryManager> {
    let embeddings: Arc<dyn Embedder> = Arc::new(EmbeddingService::from_config(config));
    let store = create_vector_store(config)?;
    MemoryManager::open(embeddings, store).await
}
