//! Vector store: similarity search over embedded document chunks.
//!
//! ARCHITECTURE
//! ============
//! Chunks are embedded by an [`Embedder`] and stored in a hosted index behind
//! the [`VectorStore`] trait. Retrieval embeds the question, queries the index
//! with an optional `document_type` filter, and drops matches below the
//! similarity threshold. Vector IDs are `{document_id}_{chunk_index}`, so
//! re-indexing a document overwrites its previous vectors in place.

pub mod pinecone;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::ErrorCode;
use crate::llm::Embedder;
use crate::llm::types::LlmError;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum VectorError {
    #[error("missing vector config: env var {0} not set")]
    MissingConfig(&'static str),
    #[error("vector request failed: {0}")]
    Request(String),
    #[error("vector response error: status {status}")]
    Response { status: u16, body: String },
    #[error("vector response parse failed: {0}")]
    Parse(String),
    #[error("embedding failed: {0}")]
    Embedding(#[from] LlmError),
}

impl ErrorCode for VectorError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingConfig(_) => "E_VECTOR_CONFIG",
            Self::Request(_) => "E_VECTOR_REQUEST",
            Self::Response { .. } => "E_VECTOR_RESPONSE",
            Self::Parse(_) => "E_VECTOR_PARSE",
            Self::Embedding(_) => "E_EMBEDDING",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Request(_) | Self::Response { status: 429 | 500..=599, .. } => true,
            Self::Embedding(e) => e.retryable(),
            _ => false,
        }
    }
}

// =============================================================================
// TYPES
// =============================================================================

/// Metadata stored next to every chunk vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub document_id: String,
    pub chunk_index: usize,
    pub content: String,
    pub title: String,
    pub document_type: String,
    pub source: String,
    pub authors: Vec<String>,
    pub publication_date: String,
    pub keywords: Vec<String>,
    pub start_position: usize,
    pub end_position: usize,
    pub processed_at: String,
}

/// One vector to upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// One similarity-search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub metadata: Value,
    pub content: String,
    pub source: String,
    pub document_type: String,
    pub title: String,
}

impl VectorMatch {
    /// Build a match, lifting the commonly used fields out of `metadata`.
    #[must_use]
    pub fn from_metadata(id: String, score: f32, metadata: Value) -> Self {
        let field = |key: &str| {
            metadata
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            content: field("content"),
            source: field("source"),
            document_type: field("document_type"),
            title: field("title"),
            id,
            score,
            metadata,
        }
    }

    /// The `document_id` this chunk belongs to, if recorded.
    #[must_use]
    pub fn document_id(&self) -> Option<&str> {
        self.metadata.get("document_id").and_then(Value::as_str)
    }
}

/// Index statistics for the configured namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexStats {
    pub total_vectors: u64,
    pub namespace_vectors: u64,
    pub dimension: u64,
    pub index_fullness: f64,
    pub namespace: String,
}

/// Metadata filter passed through to the index.
pub type Filter = Map<String, Value>;

// =============================================================================
// TRAIT
// =============================================================================

#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite vectors.
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize, VectorError>;

    /// Nearest neighbours of `vector`, best first.
    async fn query(&self, vector: &[f32], top_k: usize, filter: Option<&Filter>) -> Result<Vec<VectorMatch>, VectorError>;

    /// Delete vectors by ID. Unknown IDs are ignored. Callers keep each call
    /// within [`DELETE_BATCH_SIZE`] IDs.
    async fn delete(&self, ids: &[String]) -> Result<(), VectorError>;

    async fn stats(&self) -> Result<IndexStats, VectorError>;
}

// =============================================================================
// RETRIEVAL
// =============================================================================

/// Build the `document_type` filter, or `None` for an unrestricted search.
#[must_use]
pub fn document_type_filter(document_types: &[String]) -> Option<Filter> {
    if document_types.is_empty() {
        return None;
    }
    let mut filter = Filter::new();
    filter.insert("document_type".into(), json!({ "$in": document_types }));
    Some(filter)
}

/// Embed `query`, search the index, and keep matches scoring at least `threshold`.
///
/// # Errors
///
/// Returns an error if embedding or the index query fails.
pub async fn search_medical_knowledge(
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    query: &str,
    max_results: usize,
    document_types: &[String],
    threshold: f32,
) -> Result<Vec<VectorMatch>, VectorError> {
    let mut vectors = embedder.embed(&[query.to_string()]).await?;
    let Some(vector) = vectors.pop() else {
        return Err(VectorError::Parse("embedder returned no vector".into()));
    };
    let filter = document_type_filter(document_types);
    let matches = store
        .query(&vector, max_results, filter.as_ref())
        .await?;
    let total = matches.len();
    let kept: Vec<VectorMatch> = matches
        .into_iter()
        .filter(|m| m.score >= threshold)
        .collect();
    tracing::info!(total, kept = kept.len(), threshold, "vector: knowledge search");
    Ok(kept)
}

/// Largest ID list a single delete request may carry.
pub const DELETE_BATCH_SIZE: usize = 1000;

/// Delete `ids` in requests of at most [`DELETE_BATCH_SIZE`].
///
/// # Errors
///
/// The first failing batch; earlier batches stay deleted.
pub async fn delete_in_batches(store: &dyn VectorStore, ids: &[String]) -> Result<(), VectorError> {
    for batch in ids.chunks(DELETE_BATCH_SIZE) {
        store.delete(batch).await?;
    }
    Ok(())
}

/// Vector IDs for every chunk of a document.
#[must_use]
pub fn chunk_vector_ids(document_id: &str, chunk_count: usize) -> Vec<String> {
    (0..chunk_count)
        .map(|i| format!("{document_id}_{i}"))
        .collect()
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
