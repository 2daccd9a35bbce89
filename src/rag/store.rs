//! Abstract interface for the vector store.
//!
//! Units live in named collections; every collection is bound to the
//! embedding model that produced its vectors so that queries are never
//! compared against vectors from another model.

use async_trait::async_trait;

use crate::core::errors::ApiError;

/// A stored unit with metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredChunk {
    /// Unique chunk identifier.
    pub chunk_id: String,
    /// The text content of the chunk.
    pub content: String,
    /// Collection that owns this chunk.
    pub collection: String,
    /// Optional metadata (JSON).
    pub metadata: Option<serde_json::Value>,
}

/// Result of a similarity search.
#[derive(Debug, Clone)]
pub struct ChunkSearchResult {
    pub chunk: StoredChunk,
    /// Similarity score (higher = better).
    pub score: f32,
}

#[async_trait]
pub trait RagStore: Send + Sync {
    /// Get-or-create a collection bound to `embedding_model`.
    ///
    /// Fails when the collection already exists with a different model.
    async fn create_collection(&self, name: &str, embedding_model: &str) -> Result<(), ApiError>;

    /// Swap the collection's contents for `items` and (re)bind its embedding
    /// model, all in one transaction. Returns the number of chunks written.
    async fn replace_collection(
        &self,
        name: &str,
        embedding_model: &str,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<usize, ApiError>;

    /// Embedding model of an existing collection, `None` if it does not exist.
    async fn collection_model(&self, name: &str) -> Result<Option<String>, ApiError>;

    /// Insert chunks with their embeddings in one transaction; a chunk whose
    /// id already exists is overwritten. Returns the number of chunks written.
    async fn insert_batch(
        &self,
        collection: &str,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<usize, ApiError>;

    /// Chunks most similar to the query embedding, best first.
    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError>;

    /// Number of chunks in the collection.
    async fn count(&self, collection: &str) -> Result<usize, ApiError>;
}
