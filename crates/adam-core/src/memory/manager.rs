//! ============================================================================
//! Memory Manager - Orchestrates memory storage and retrieval
//! ============================================================================
//! High-level API over an embedder and a vector store: add memories, fetch
//! the documents nearest to a query, and seed a fresh store.
//! ============================================================================

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::embeddings::Embedder;
use super::store::VectorStore;
use super::types::{MemoryEntry, MemorySource, MemoryStats, ScoredMemory};

/// Document written into an empty store so retrieval always has context
pub const BOOTSTRAP_DOCUMENT: &str = "You are adam and AI chatbot agent for me. \
You have to help me with questions about several areas.";

/// Fixed id of the bootstrap document
pub const BOOTSTRAP_ID: Uuid = Uuid::from_u128(1);

/// Memory manager combining store and embeddings
pub struct MemoryManager {
    store: Arc<dyn VectorStore>,
    embeddings: Arc<dyn Embedder>,
}

impl MemoryManager {
    /// Open the memory: probe the embedding dimension, make sure the
    /// collection exists and seed it if it is empty.
    pub async fn open(embeddings: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Result<Self> {
        let seed_embedding = embeddings.embed_single(BOOTSTRAP_DOCUMENT).await?;
        debug!(
            "Embedding model {} produces {} dimensions",
            embeddings.model(),
            seed_embedding.len()
        );

        store.ensure_collection(seed_embedding.len()).await?;

        if store.count().await? == 0 {
            let seed = MemoryEntry::new(BOOTSTRAP_DOCUMENT.to_string(), MemorySource::Seed)
                .with_id(BOOTSTRAP_ID)
                .with_embedding(seed_embedding);
            store.insert(&seed).await?;
            info!("Seeded empty collection {} with bootstrap memory", store.collection());
        }

        Ok(Self { store, embeddings })
    }

    /// Store `text` as a new query memory
    pub async fn add_memory(&self, text: &str) -> Result<MemoryEntry> {
        self.add_memory_with_source(text, MemorySource::Query).await
    }

    /// Store `text` under a fresh id. Identical text always yields a new entry.
    pub async fn add_memory_with_source(
        &self,
        text: &str,
        source: MemorySource,
    ) -> Result<MemoryEntry> {
        let embedding = self.embeddings.embed_single(text).await?;

        let entry = MemoryEntry::new(text.to_string(), source).with_embedding(embedding);
        self.store.insert(&entry).await?;

        debug!("Stored memory {} ({})", entry.id, source);
        Ok(MemoryEntry {
            embedding: vec![],
            ..entry
        })
    }

    /// Documents nearest to `query`, nearest first, at most `n`
    pub async fn retrieve(&self, query: &str, n: u64) -> Result<Vec<String>> {
        Ok(self
            .search(query, n)
            .await?
            .into_iter()
            .map(|m| m.entry.document)
            .collect())
    }

    /// Scored memories nearest to `query`, nearest first, at most `n`
    pub async fn search(&self, query: &str, n: u64) -> Result<Vec<ScoredMemory>> {
        if n == 0 {
            return Ok(vec![]);
        }

        debug!("Searching memories with query: {}", query);
        let query_embedding = self.embeddings.embed_single(query).await?;

        let mut hits = self.store.search(query_embedding, n).await?;
        hits.truncate(n as usize);
        Ok(hits)
    }

    /// Up to `n` stored memories, newest first
    pub async fn list(&self, n: u64) -> Result<Vec<MemoryEntry>> {
        self.store.list(n).await
    }

    /// Get memory store stats
    pub async fn stats(&self) -> Result<MemoryStats> {
        Ok(MemoryStats {
            points_count: self.store.count().await?,
            collection: self.store.collection().to_string(),
            embedding_model: self.embeddings.model().to_string(),
        })
    }

    /// Check if the memory system is healthy
    pub async fn health_check(&self) -> Result<bool> {
        self.store.health_check().await
    }

    /// Name of the embedding model in use
    pub fn embedding_model(&self) -> &str {
        self.embeddings.model()
    }
}
