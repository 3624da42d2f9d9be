//! ============================================================================
//! Memory Types - Data structures for the vector memory
//! ============================================================================

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single memory entry stored in the vector database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique identifier for this memory
    pub id: Uuid,
    /// The stored document text
    pub document: String,
    /// Where the memory came from
    pub source: MemorySource,
    /// Vector embedding (not serialized to clients)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
    /// Unix timestamp when memory was created
    pub created_at: i64,
}

impl MemoryEntry {
    /// Create a new memory entry with a fresh id
    pub fn new(document: String, source: MemorySource) -> Self {
        Self {
            id: Uuid::new_v4(),
            document,
            source,
            embedding: Vec::new(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Create a memory with a pre-computed embedding
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    /// Replace the generated id (used for the bootstrap document)
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }
}

/// Origin of a memory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemorySource {
    /// Bootstrap document written on first start
    Seed,
    /// A user query answered by the pipeline
    Query,
    /// A fragment from a bulk conversation import
    Import,
    /// Added by hand through the admin CLI
    Manual,
}

impl MemorySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemorySource::Seed => "seed",
            MemorySource::Query => "query",
            MemorySource::Import => "import",
            MemorySource::Manual => "manual",
        }
    }
}

impl std::fmt::Display for MemorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemorySource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "seed" => Ok(MemorySource::Seed),
            "query" => Ok(MemorySource::Query),
            "import" => Ok(MemorySource::Import),
            "manual" => Ok(MemorySource::Manual),
            _ => Err(format!("Unknown memory source: {}", s)),
        }
    }
}

/// A memory returned from a similarity search, with its score
/// (cosine similarity, higher is nearer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMemory {
    pub entry: MemoryEntry,
    pub score: f32,
}

/// Collection statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStats {
    pub points_count: u64,
    pub collection: String,
    pub embedding_model: String,
}
