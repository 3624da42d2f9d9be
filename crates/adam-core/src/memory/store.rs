//! ============================================================================
//! Memory Store - Qdrant vector database operations
//! ============================================================================
//! Stores and retrieves memories using vector similarity search. The
//! `VectorStore` trait is the seam between the memory manager and whatever
//! database holds the (embedding, document, id) triples.
//! ============================================================================

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, CountPointsBuilder, CreateCollectionBuilder,
    CreateFieldIndexCollectionBuilder, Direction, Distance, FieldType, OrderByBuilder, PointId,
    PointStruct, ScrollPointsBuilder, SearchPointsBuilder, UpsertPointsBuilder, Value,
    VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::types::{MemoryEntry, MemorySource, ScoredMemory};

/// Default collection name for memories
pub const COLLECTION_NAME: &str = "adam_memories";

/// Payload field holding the unix creation time; indexed for ordered listing
const CREATED_AT_FIELD: &str = "created_at";

/// Nearest-neighbour store over (embedding, document, id) triples
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the backing collection for vectors of `dim` if it does not exist
    async fn ensure_collection(&self, dim: usize) -> Result<()>;

    /// Insert one entry. The entry must carry its embedding.
    async fn insert(&self, entry: &MemoryEntry) -> Result<()>;

    /// Up to `limit` entries nearest to `vector`, nearest first
    async fn search(&self, vector: Vec<f32>, limit: u64) -> Result<Vec<ScoredMemory>>;

    /// Number of stored entries
    async fn count(&self) -> Result<u64>;

    /// Up to `limit` stored entries, newest first (no similarity ranking)
    async fn list(&self, limit: u64) -> Result<Vec<MemoryEntry>>;

    /// Name of the collection/namespace in use
    fn collection(&self) -> &str;

    /// Check if the store is reachable
    async fn health_check(&self) -> Result<bool>;
}

/// Memory store backed by Qdrant vector database
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
}

impl QdrantStore {
    /// Connect to Qdrant (gRPC endpoint, usually port 6334)
    pub fn connect(url: &str, collection: &str) -> Result<Self> {
        debug!("Connecting to Qdrant at {}", url);

        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| anyhow!("Failed to create Qdrant client: {}", e))?;

        Ok(Self {
            client,
            collection: collection.to_string(),
        })
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(&self, dim: usize) -> Result<()> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| anyhow!("Failed to check collection existence: {}", e))?;

        if !exists {
            info!("Creating collection: {} (dim {})", self.collection, dim);

            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection)
                        .vectors_config(VectorParamsBuilder::new(dim as u64, Distance::Cosine)),
                )
                .await
                .map_err(|e| anyhow!("Failed to create collection: {}", e))?;

            info!("Collection {} created successfully", self.collection);
        } else {
            debug!("Collection {} already exists", self.collection);
        }

        // Ordered scrolls need a range index; re-creating an existing one is a no-op
        self.client
            .create_field_index(
                CreateFieldIndexCollectionBuilder::new(
                    &self.collection,
                    CREATED_AT_FIELD,
                    FieldType::Integer,
                )
                .wait(true),
            )
            .await
            .map_err(|e| anyhow!("Failed to index {}: {}", CREATED_AT_FIELD, e))?;

        Ok(())
    }

    async fn insert(&self, entry: &MemoryEntry) -> Result<()> {
        if entry.embedding.is_empty() {
            return Err(anyhow!("Cannot store memory without embedding"));
        }

        debug!("Storing memory {} ({})", entry.id, entry.source);

        let payload: HashMap<String, Value> = [
            ("document".to_string(), Value::from(entry.document.clone())),
            ("source".to_string(), Value::from(entry.source.to_string())),
            (CREATED_AT_FIELD.to_string(), Value::from(entry.created_at)),
        ]
        .into_iter()
        .collect();

        let point = PointStruct::new(entry.id.to_string(), entry.embedding.clone(), payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]).wait(true))
            .await
            .map_err(|e| anyhow!("Failed to insert memory: {}", e))?;

        Ok(())
    }

    async fn search(&self, vector: Vec<f32>, limit: u64) -> Result<Vec<ScoredMemory>> {
        debug!("Searching {} (limit: {})", self.collection, limit);

        let search_result = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, vector, limit).with_payload(true),
            )
            .await
            .map_err(|e| anyhow!("Failed to search memories: {}", e))?;

        // Qdrant returns cosine hits by descending score already
        let memories: Vec<ScoredMemory> = search_result
            .result
            .into_iter()
            .filter_map(|point| {
                let entry = entry_from_point(point.id?, &point.payload)?;
                Some(ScoredMemory {
                    entry,
                    score: point.score,
                })
            })
            .collect();

        debug!("Found {} matching memories", memories.len());
        Ok(memories)
    }

    async fn count(&self) -> Result<u64> {
        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await
            .map_err(|e| anyhow!("Failed to count memories: {}", e))?;

        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    async fn list(&self, limit: u64) -> Result<Vec<MemoryEntry>> {
        if limit == 0 {
            return Ok(vec![]);
        }

        let scroll_result = self
            .client
            .scroll(
                ScrollPointsBuilder::new(&self.collection)
                    .limit(scroll_limit(limit))
                    .order_by(
                        OrderByBuilder::new(CREATED_AT_FIELD).direction(Direction::Desc as i32),
                    )
                    .with_payload(true),
            )
            .await
            .map_err(|e| anyhow!("Failed to scroll memories: {}", e))?;

        // Already newest first; the stable sort only settles equal timestamps
        let mut entries: Vec<MemoryEntry> = scroll_result
            .result
            .into_iter()
            .filter_map(|point| entry_from_point(point.id?, &point.payload))
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(entries)
    }

    fn collection(&self) -> &str {
        &self.collection
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.health_check().await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!("Qdrant health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

/// Qdrant page sizes are u32; larger requests are clamped, not wrapped
fn scroll_limit(limit: u64) -> u32 {
    u32::try_from(limit).unwrap_or(u32::MAX)
}

fn entry_from_point(point_id: PointId, payload: &HashMap<String, Value>) -> Option<MemoryEntry> {
    Some(MemoryEntry {
        id: extract_uuid_from_point_id(point_id)?,
        document: get_string(payload, "document")?,
        source: get_string(payload, "source")
            .and_then(|s| s.parse().ok())
            .unwrap_or(MemorySource::Query),
        embedding: vec![], // Not returned with payloads
        created_at: get_i64(payload, CREATED_AT_FIELD).unwrap_or(0),
    })
}

// Helper to extract UUID from PointId
fn extract_uuid_from_point_id(point_id: PointId) -> Option<Uuid> {
    match point_id.point_id_options? {
        PointIdOptions::Uuid(uuid_str) => Uuid::parse_str(&uuid_str).ok(),
        PointIdOptions::Num(_) => None, // We use UUID strings, not numeric IDs
    }
}

fn get_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
    payload.get(key).and_then(|v| v.as_str().map(|s| s.to_string()))
}

fn get_i64(payload: &HashMap<String, Value>, key: &str) -> Option<i64> {
    payload.get(key).and_then(|v| v.as_integer())
}
