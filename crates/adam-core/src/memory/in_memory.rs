//! ============================================================================
//! In-Memory Store - Process-local vector store
//! ============================================================================
//! Exact brute-force cosine ranking over every stored entry. Nothing is
//! persisted; used for tests and for running without a Qdrant instance.
//! ============================================================================

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::VectorStore;
use super::types::{MemoryEntry, ScoredMemory};

/// Vector store that keeps everything in a `Vec` behind a lock
pub struct InMemoryStore {
    collection: String,
    entries: RwLock<Vec<MemoryEntry>>,
    dim: RwLock<Option<usize>>,
}

impl InMemoryStore {
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            entries: RwLock::new(Vec::new()),
            dim: RwLock::new(None),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(super::store::COLLECTION_NAME)
    }
}

/// Cosine similarity of two equal-length vectors; `0.0` if either has zero norm
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn ensure_collection(&self, dim: usize) -> Result<()> {
        let mut current = self.dim.write().await;
        match *current {
            Some(existing) if existing != dim => Err(anyhow!(
                "Collection {} has dimension {}, got {}",
                self.collection,
                existing,
                dim
            )),
            _ => {
                *current = Some(dim);
                Ok(())
            }
        }
    }

    async fn insert(&self, entry: &MemoryEntry) -> Result<()> {
        if entry.embedding.is_empty() {
            return Err(anyhow!("Cannot store memory without embedding"));
        }
        if let Some(dim) = *self.dim.read().await {
            if entry.embedding.len() != dim {
                return Err(anyhow!(
                    "Embedding dimension mismatch: expected {}, got {}",
                    dim,
                    entry.embedding.len()
                ));
            }
        }

        self.entries.write().await.push(entry.clone());
        Ok(())
    }

    async fn search(&self, vector: Vec<f32>, limit: u64) -> Result<Vec<ScoredMemory>> {
        let entries = self.entries.read().await;

        let mut scored: Vec<ScoredMemory> = entries
            .iter()
            .map(|entry| ScoredMemory {
                score: cosine_similarity(&vector, &entry.embedding),
                entry: MemoryEntry {
                    embedding: vec![],
                    ..entry.clone()
                },
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit as usize);
        Ok(scored)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.entries.read().await.len() as u64)
    }

    async fn list(&self, limit: u64) -> Result<Vec<MemoryEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .rev()
            .take(limit as usize)
            .map(|entry| MemoryEntry {
                embedding: vec![],
                ..entry.clone()
            })
            .collect())
    }

    fn collection(&self) -> &str {
        &self.collection
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::MemorySource;

    fn entry(doc: &str, v: Vec<f32>) -> MemoryEntry {
        MemoryEntry::new(doc.to_string(), MemorySource::Manual).with_embedding(v)
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_search_orders_nearest_first() {
        let store = InMemoryStore::default();
        store.ensure_collection(2).await.unwrap();
        store.insert(&entry("east", vec![1.0, 0.0])).await.unwrap();
        store.insert(&entry("north", vec![0.0, 1.0])).await.unwrap();
        store.insert(&entry("northeast", vec![1.0, 1.0])).await.unwrap();

        let hits = store.search(vec![0.9, 0.1], 3).await.unwrap();
        let docs: Vec<_> = hits.iter().map(|h| h.entry.document.as_str()).collect();
        assert_eq!(docs, vec!["east", "northeast", "north"]);
        assert!(hits[0].entry.embedding.is_empty());
    }

    #[tokio::test]
    async fn test_search_limit() {
        let store = InMemoryStore::default();
        for i in 0..5 {
            store.insert(&entry(&format!("doc {}", i), vec![1.0, i as f32])).await.unwrap();
        }
        assert_eq!(store.search(vec![1.0, 0.0], 2).await.unwrap().len(), 2);
        assert_eq!(store.search(vec![1.0, 0.0], 10).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_dimension_checks() {
        let store = InMemoryStore::default();
        store.ensure_collection(3).await.unwrap();
        assert!(store.ensure_collection(4).await.is_err());
        assert!(store.insert(&entry("short", vec![1.0])).await.is_err());
        assert!(store.insert(&entry("empty", vec![])).await.is_err());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let store = InMemoryStore::default();
        store.insert(&entry("first", vec![1.0])).await.unwrap();
        store.insert(&entry("second", vec![1.0])).await.unwrap();
        let listed = store.list(1).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].document, "second");
    }
}
