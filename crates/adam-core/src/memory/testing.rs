//! Deterministic embedder for tests: no model, no network.

use anyhow::Result;
use async_trait::async_trait;

use super::embeddings::Embedder;

/// Number of hash buckets (vector dimension)
pub const WORD_HASH_DIM: usize = 256;

/// Bag-of-words hashing embedder: texts sharing words get nearby vectors
#[derive(Debug, Clone, Copy, Default)]
pub struct WordHashEmbedder;

impl WordHashEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; WORD_HASH_DIM];
        for word in text.to_lowercase().split(|c: char| !c.is_alphanumeric()) {
            if word.is_empty() {
                continue;
            }
            let h = word
                .bytes()
                .fold(7usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
            v[h % WORD_HASH_DIM] += 1.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for WordHashEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn model(&self) -> &str {
        "word-hash"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::cosine_similarity;

    #[test]
    fn test_shared_words_are_closer() {
        let query = WordHashEmbedder::vector("capital of France");
        let near = WordHashEmbedder::vector("What is the capital of France?");
        let far = WordHashEmbedder::vector("banana smoothie recipe");
        assert!(cosine_similarity(&query, &near) > cosine_similarity(&query, &far));
    }

    #[tokio::test]
    async fn test_embed_is_deterministic_and_case_insensitive() {
        let out = WordHashEmbedder
            .embed(vec!["Hello World".to_string(), "hello world".to_string()])
            .await
            .unwrap();
        assert_eq!(out[0], out[1]);
        assert_eq!(out[0].len(), WORD_HASH_DIM);
    }
}
