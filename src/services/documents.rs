//! Medical document ingestion and lookup.
//!
//! DESIGN
//! ======
//! Upload stores the extracted text first and indexes it second, so a
//! document always exists once the request returns. Indexing runs
//! chunk → embed → upsert → chunk rows → `processed = true`; any failure
//! along the way is logged and leaves `processed = false` for a later
//! reprocess. Vector IDs are `{document_id}_{chunk_index}`, and the chunk
//! rows record them so delete and reprocess know what to remove.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::llm::types::LlmError;
use crate::services::audit::{self, AuditEvent, ClientInfo};
use crate::services::chunker::{self, Chunk};
use crate::services::page::{Page, PageParams};
use crate::state::AppState;
use crate::vector::{self, ChunkMetadata, IndexStats, VectorError, VectorMatch, VectorRecord, VectorStore};

pub const ALLOWED_EXTENSIONS: &[&str] = &[".pdf", ".txt", ".md"];
pub const MIN_CONTENT_CHARS: usize = 100;
pub const TITLE_MAX_CHARS: usize = 500;
pub const QUERY_MAX_CHARS: usize = 500;
pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const MAX_SEARCH_LIMIT: usize = 50;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("File type not allowed. Allowed types: .pdf, .txt, .md")]
    UnsupportedType,
    #[error("Failed to extract text from PDF")]
    PdfExtraction,
    #[error("File is not valid UTF-8 text")]
    InvalidEncoding,
    #[error("File too large. Maximum size is {limit} bytes")]
    TooLarge { limit: usize },
    #[error("Document content is too short or empty")]
    TooShort,
    #[error("Title must be between 1 and 500 characters")]
    InvalidTitle,
    #[error("Query must be between 1 and 500 characters")]
    InvalidQuery,
    #[error("Limit must be between 1 and 50")]
    InvalidLimit,
    #[error("Document not found")]
    NotFound,
    #[error("Vector search is not configured")]
    Unavailable,
    #[error("embedding failed: {0}")]
    Embedding(#[from] LlmError),
    #[error(transparent)]
    Vector(#[from] VectorError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl crate::error::ErrorCode for DocumentError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedType => "E_FILE_TYPE",
            Self::PdfExtraction => "E_PDF_EXTRACTION",
            Self::InvalidEncoding => "E_FILE_ENCODING",
            Self::TooLarge { .. } => "E_FILE_TOO_LARGE",
            Self::TooShort => "E_CONTENT_TOO_SHORT",
            Self::InvalidTitle => "E_INVALID_TITLE",
            Self::InvalidQuery => "E_INVALID_QUERY",
            Self::InvalidLimit => "E_INVALID_LIMIT",
            Self::NotFound => "E_DOCUMENT_NOT_FOUND",
            Self::Unavailable => "E_VECTOR_UNAVAILABLE",
            Self::Embedding(_) => "E_EMBEDDING",
            Self::Vector(_) => "E_VECTOR",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Embedding(e) => e.retryable(),
            Self::Vector(e) => e.retryable(),
            Self::Database(_) => true,
            _ => false,
        }
    }
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    MedicalGuideline,
    DrugInfo,
    ResearchPaper,
    ClinicalTrial,
    Textbook,
}

impl DocumentType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MedicalGuideline => "medical_guideline",
            Self::DrugInfo => "drug_info",
            Self::ResearchPaper => "research_paper",
            Self::ClinicalTrial => "clinical_trial",
            Self::Textbook => "textbook",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "medical_guideline" => Some(Self::MedicalGuideline),
            "drug_info" => Some(Self::DrugInfo),
            "research_paper" => Some(Self::ResearchPaper),
            "clinical_trial" => Some(Self::ClinicalTrial),
            "textbook" => Some(Self::Textbook),
            _ => None,
        }
    }
}

/// A `medical_documents` row without its body text.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub authors: Vec<String>,
    pub source: Option<String>,
    pub document_type: DocumentType,
    #[serde(rename = "abstract")]
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    pub word_count: i32,
    pub processed: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub publication_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Upload metadata accompanying the file.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDocument {
    pub title: String,
    pub document_type: DocumentType,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentSearch {
    pub query: String,
    #[serde(default)]
    pub document_types: Vec<DocumentType>,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentStats {
    pub total_documents: i64,
    pub processed_documents: i64,
    pub processing_rate: f64,
    pub document_types: BTreeMap<String, i64>,
    pub total_chunks: i64,
    /// `None` when no vector index is configured or it cannot be reached.
    pub vector_database: Option<IndexStats>,
}

// =============================================================================
// EXTRACTION
// =============================================================================

/// Plain text of an uploaded file, chosen by extension (case-insensitive).
///
/// PDF parsing runs on the blocking pool.
///
/// # Errors
///
/// Unsupported extension, invalid UTF-8, or an unreadable PDF.
pub async fn extract_text(filename: &str, bytes: &[u8]) -> Result<String, DocumentError> {
    let lower = filename.to_ascii_lowercase();
    match ALLOWED_EXTENSIONS.iter().find(|ext| lower.ends_with(*ext)) {
        Some(&".pdf") => {
            let owned = bytes.to_vec();
            extract_blocking(filename, move || pdf_extract::extract_text_from_mem(&owned)).await
        }
        Some(_) => String::from_utf8(bytes.to_vec()).map_err(|_| DocumentError::InvalidEncoding),
        None => Err(DocumentError::UnsupportedType),
    }
}

/// Run a CPU-bound extractor off the async workers. Extractor errors and
/// panics both become `PdfExtraction`.
async fn extract_blocking<F, E>(filename: &str, extract: F) -> Result<String, DocumentError>
where
    F: FnOnce() -> Result<String, E> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    match tokio::task::spawn_blocking(extract).await {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, filename, "documents: pdf extraction failed");
            Err(DocumentError::PdfExtraction)
        }
        Err(e) => {
            tracing::error!(error = %e, filename, "documents: pdf extraction task aborted");
            Err(DocumentError::PdfExtraction)
        }
    }
}

#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Size and title checks that run before any extraction work.
///
/// # Errors
///
/// `TooLarge` over `max_file_size`, `InvalidTitle` for a blank or overlong title.
pub fn validate_upload(input: &NewDocument, size: usize, max_file_size: usize) -> Result<(), DocumentError> {
    if size > max_file_size {
        return Err(DocumentError::TooLarge { limit: max_file_size });
    }
    let title = input.title.trim();
    if title.is_empty() || title.chars().count() > TITLE_MAX_CHARS {
        return Err(DocumentError::InvalidTitle);
    }
    Ok(())
}

/// Extracted text, or `TooShort` when fewer than [`MIN_CONTENT_CHARS`] remain after trimming.
///
/// # Errors
///
/// Any [`extract_text`] error, or `TooShort`.
pub async fn extract_content(filename: &str, bytes: &[u8]) -> Result<String, DocumentError> {
    let text = extract_text(filename, bytes).await?;
    if text.trim().chars().count() < MIN_CONTENT_CHARS {
        return Err(DocumentError::TooShort);
    }
    Ok(text)
}

// =============================================================================
// INDEXING
// =============================================================================

/// Pair each chunk with its embedding and the document's metadata.
#[must_use]
pub fn build_records(doc: &Document, chunks: &[Chunk], embeddings: Vec<Vec<f32>>, processed_at: &str) -> Vec<VectorRecord> {
    let doc_id = doc.id.to_string();
    let publication_date = doc
        .publication_date
        .and_then(|d| d.format(&Rfc3339).ok())
        .unwrap_or_default();
    let ids = vector::chunk_vector_ids(&doc_id, chunks.len());
    chunks
        .iter()
        .zip(embeddings)
        .zip(ids)
        .map(|((chunk, values), id)| VectorRecord {
            id,
            values,
            metadata: ChunkMetadata {
                document_id: doc_id.clone(),
                chunk_index: chunk.chunk_index,
                content: chunk.content.clone(),
                title: doc.title.clone(),
                document_type: doc.document_type.as_str().to_owned(),
                source: doc.source.clone().unwrap_or_default(),
                authors: doc.authors.clone(),
                publication_date: publication_date.clone(),
                keywords: doc.keywords.clone(),
                start_position: chunk.start_position,
                end_position: chunk.end_position,
                processed_at: processed_at.to_owned(),
            },
        })
        .collect()
}

/// Chunk, embed and index one document, then mark it processed.
///
/// Returns the number of chunks indexed.
///
/// # Errors
///
/// `Unavailable` without an embedder or vector store; otherwise any
/// embedding, index, or database failure.
pub async fn process(state: &AppState, doc: &Document) -> Result<usize, DocumentError> {
    let (Some(embedder), Some(store)) = (state.embedder.as_deref(), state.vectors.as_deref()) else {
        return Err(DocumentError::Unavailable);
    };

    let content: String = sqlx::query("SELECT content FROM medical_documents WHERE id = $1")
        .bind(doc.id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(DocumentError::NotFound)?
        .get("content");

    let chunks = chunker::chunk_document(&content, state.settings.chunk_size, state.settings.chunk_overlap);
    if chunks.is_empty() {
        tracing::warn!(document_id = %doc.id, "documents: no chunks produced");
        return Ok(0);
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let embeddings = embedder.embed(&texts).await?;
    if embeddings.len() != chunks.len() {
        return Err(VectorError::Parse(format!("expected {} embeddings, got {}", chunks.len(), embeddings.len())).into());
    }

    let processed_at = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
    let records = build_records(doc, &chunks, embeddings, &processed_at);
    upsert_then(store, &records, store_chunks(state, doc, &chunks, &records, embedder.embedding_model())).await?;

    tracing::info!(document_id = %doc.id, chunks = chunks.len(), "documents: processed");
    Ok(chunks.len())
}

/// Upsert `records`, then run `commit`. If `commit` fails the vectors just
/// written are deleted again so the index never holds chunks without rows.
async fn upsert_then<F>(store: &dyn VectorStore, records: &[VectorRecord], commit: F) -> Result<(), DocumentError>
where
    F: Future<Output = Result<(), DocumentError>>,
{
    store.upsert(records).await?;
    if let Err(e) = commit.await {
        let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        if let Err(cleanup) = vector::delete_in_batches(store, &ids).await {
            tracing::error!(error = %cleanup, count = ids.len(), "documents: upserted vectors left in index");
        }
        return Err(e);
    }
    Ok(())
}

/// Record chunk rows and flag the document processed, in one transaction.
async fn store_chunks(
    state: &AppState,
    doc: &Document,
    chunks: &[Chunk],
    records: &[VectorRecord],
    embedding_model: &str,
) -> Result<(), DocumentError> {
    let mut tx = state.pool.begin().await?;
    for (chunk, record) in chunks.iter().zip(records) {
        sqlx::query(
            r"INSERT INTO document_chunks (document_id, content, chunk_index, vector_id, start_position, end_position)
              VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(doc.id)
        .bind(&chunk.content)
        .bind(i32::try_from(chunk.chunk_index).unwrap_or(i32::MAX))
        .bind(&record.id)
        .bind(i32::try_from(chunk.start_position).unwrap_or(i32::MAX))
        .bind(i32::try_from(chunk.end_position).unwrap_or(i32::MAX))
        .execute(&mut *tx)
        .await?;
    }
    sqlx::query("UPDATE medical_documents SET processed = TRUE, embedding_model = $2, updated_at = now() WHERE id = $1")
        .bind(doc.id)
        .bind(embedding_model)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

/// [`process`], logging instead of failing.
async fn process_logged(state: &AppState, doc: &Document) {
    if let Err(e) = process(state, doc).await {
        tracing::error!(document_id = %doc.id, error = %e, "documents: processing failed");
    }
}

/// Remove a document's vectors and chunk rows and clear `processed`.
///
/// Chunk rows are the only record of which vectors exist, so they are kept
/// whenever the vectors could not be removed.
async fn clear_index(state: &AppState, id: Uuid) -> Result<(), DocumentError> {
    let vector_ids: Vec<String> = sqlx::query(
        "SELECT vector_id FROM document_chunks WHERE document_id = $1 AND vector_id IS NOT NULL ORDER BY chunk_index",
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?
    .iter()
    .map(|r| r.get("vector_id"))
    .collect();

    if !vector_ids.is_empty() {
        let Some(store) = state.vectors.as_deref() else {
            tracing::warn!(document_id = %id, "documents: cannot remove vectors, store not configured");
            return Err(DocumentError::Unavailable);
        };
        if let Err(e) = vector::delete_in_batches(store, &vector_ids).await {
            tracing::warn!(document_id = %id, error = %e, "documents: vector delete failed; chunk rows kept");
            return Err(e.into());
        }
    }

    let mut tx = state.pool.begin().await?;
    sqlx::query("DELETE FROM document_chunks WHERE document_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE medical_documents SET processed = FALSE, updated_at = now() WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

// =============================================================================
// QUERIES
// =============================================================================

const DOCUMENT_COLUMNS: &str =
    "id, title, authors, source, document_type, abstract, keywords, word_count, processed, publication_date, created_at";

fn document_from_row(row: &PgRow) -> Document {
    let document_type: String = row.get("document_type");
    let Json(authors): Json<Vec<String>> = row.get("authors");
    let Json(keywords): Json<Vec<String>> = row.get("keywords");
    Document {
        id: row.get("id"),
        title: row.get("title"),
        authors,
        source: row.get("source"),
        document_type: DocumentType::parse(&document_type).unwrap_or(DocumentType::MedicalGuideline),
        summary: row.get("abstract"),
        keywords,
        word_count: row.get("word_count"),
        processed: row.get("processed"),
        publication_date: row.get("publication_date"),
        created_at: row.get("created_at"),
    }
}

/// Store a validated upload and index it.
///
/// The returned document reflects the outcome of indexing: `processed` is
/// false if any indexing step failed.
///
/// # Errors
///
/// Validation or extraction errors, or a failed insert. Indexing errors are
/// logged, not returned.
pub async fn upload(
    state: &AppState,
    admin_id: Uuid,
    input: NewDocument,
    filename: &str,
    bytes: &[u8],
    client: &ClientInfo,
) -> Result<Document, DocumentError> {
    validate_upload(&input, bytes.len(), state.settings.max_file_size)?;
    let content = extract_content(filename, bytes).await?;
    let words = i32::try_from(word_count(&content)).unwrap_or(i32::MAX);

    let sql = format!(
        r"INSERT INTO medical_documents (title, authors, source, document_type, content, keywords, word_count)
          VALUES ($1, $2, $3, $4, $5, $6, $7)
          RETURNING {DOCUMENT_COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(input.title.trim())
        .bind(Json(&input.authors))
        .bind(input.source.as_deref())
        .bind(input.document_type.as_str())
        .bind(&content)
        .bind(Json(&input.keywords))
        .bind(words)
        .fetch_one(&state.pool)
        .await?;
    let doc = document_from_row(&row);
    tracing::info!(document_id = %doc.id, filename, word_count = words, "documents: uploaded");

    process_logged(state, &doc).await;

    audit::record_detached(
        &state.pool,
        AuditEvent::new("document_upload", "document")
            .user(admin_id)
            .resource_id(doc.id)
            .client(client)
            .metadata(json!({ "filename": filename, "size": bytes.len() })),
    );
    get(&state.pool, doc.id).await
}

/// # Errors
///
/// `NotFound` or a database error.
pub async fn get(pool: &PgPool, id: Uuid) -> Result<Document, DocumentError> {
    let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM medical_documents WHERE id = $1");
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(document_from_row).ok_or(DocumentError::NotFound)
}

/// Page through documents, newest first, optionally of one type.
///
/// # Errors
///
/// Returns a database error if either query fails.
pub async fn list(pool: &PgPool, params: PageParams, document_type: Option<DocumentType>) -> Result<Page<Document>, DocumentError> {
    let type_filter = document_type.map(DocumentType::as_str);
    let total: i64 = sqlx::query("SELECT COUNT(*) AS n FROM medical_documents WHERE ($1::text IS NULL OR document_type = $1)")
        .bind(type_filter)
        .fetch_one(pool)
        .await?
        .get("n");
    let sql = format!(
        "SELECT {DOCUMENT_COLUMNS} FROM medical_documents
         WHERE ($1::text IS NULL OR document_type = $1)
         ORDER BY created_at DESC, id LIMIT $2 OFFSET $3"
    );
    let rows = sqlx::query(&sql)
        .bind(type_filter)
        .bind(params.size)
        .bind(params.offset())
        .fetch_all(pool)
        .await?;
    let items = rows.iter().map(document_from_row).collect();
    Ok(Page::new(items, total, params))
}

/// Document IDs in first-seen order. Matches without a parseable ID are skipped.
#[must_use]
pub fn unique_document_ids(matches: &[VectorMatch]) -> Vec<Uuid> {
    let mut ids = Vec::new();
    for id in matches.iter().filter_map(|m| m.document_id()?.parse::<Uuid>().ok()) {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// # Errors
///
/// `InvalidQuery` / `InvalidLimit` for out-of-range input.
pub fn validate_search(search: &DocumentSearch) -> Result<(), DocumentError> {
    let len = search.query.trim().chars().count();
    if len == 0 || len > QUERY_MAX_CHARS {
        return Err(DocumentError::InvalidQuery);
    }
    if !(1..=MAX_SEARCH_LIMIT).contains(&search.limit) {
        return Err(DocumentError::InvalidLimit);
    }
    Ok(())
}

/// Semantic search: the documents behind the best-matching chunks, most relevant first.
///
/// # Errors
///
/// Validation errors, `Unavailable` without a vector store, or a search or database failure.
pub async fn search(state: &AppState, search: &DocumentSearch) -> Result<Vec<Document>, DocumentError> {
    validate_search(search)?;
    let (Some(embedder), Some(store)) = (state.embedder.as_deref(), state.vectors.as_deref()) else {
        return Err(DocumentError::Unavailable);
    };
    let types: Vec<String> = search.document_types.iter().map(|t| t.as_str().to_owned()).collect();
    let matches = vector::search_medical_knowledge(
        store,
        embedder,
        search.query.trim(),
        search.limit,
        &types,
        state.settings.similarity_threshold,
    )
    .await?;

    let ids = unique_document_ids(&matches);
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM medical_documents WHERE id = ANY($1)");
    let rows = sqlx::query(&sql).bind(&ids).fetch_all(&state.pool).await?;
    let mut found: Vec<Document> = rows.iter().map(document_from_row).collect();
    found.sort_by_key(|d| ids.iter().position(|id| *id == d.id));
    Ok(found)
}

/// Delete a document with its chunks and vectors.
///
/// # Errors
///
/// `NotFound`, `Unavailable` or a vector error when the document's vectors
/// cannot be removed (nothing is deleted then), or a database error.
pub async fn delete(state: &AppState, id: Uuid, admin_id: Uuid, client: &ClientInfo) -> Result<(), DocumentError> {
    let doc = get(&state.pool, id).await?;
    clear_index(state, id).await?;
    sqlx::query("DELETE FROM medical_documents WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;
    audit::record_detached(
        &state.pool,
        AuditEvent::new("document_delete", "document")
            .user(admin_id)
            .resource_id(id)
            .client(client)
            .metadata(json!({ "title": doc.title })),
    );
    tracing::info!(document_id = %id, "documents: deleted");
    Ok(())
}

/// Drop the existing index entries and index the stored text again.
///
/// # Errors
///
/// `NotFound`, a failure removing the old vectors, or a database error.
/// Indexing errors are logged and show up as `processed = false` on the
/// returned document.
pub async fn reprocess(state: &AppState, id: Uuid) -> Result<Document, DocumentError> {
    let doc = get(&state.pool, id).await?;
    clear_index(state, id).await?;
    process_logged(state, &doc).await;
    get(&state.pool, id).await
}

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn processing_rate(processed: i64, total: i64) -> f64 {
    if total > 0 { processed as f64 / total as f64 } else { 0.0 }
}

/// Collection counts plus index statistics.
///
/// # Errors
///
/// Returns a database error if a count query fails.
pub async fn stats(state: &AppState) -> Result<DocumentStats, DocumentError> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS total, COUNT(*) FILTER (WHERE processed) AS processed FROM medical_documents",
    )
    .fetch_one(&state.pool)
    .await?;
    let total_documents: i64 = row.get("total");
    let processed_documents: i64 = row.get("processed");

    let document_types = sqlx::query("SELECT document_type, COUNT(*) AS n FROM medical_documents GROUP BY document_type")
        .fetch_all(&state.pool)
        .await?
        .iter()
        .map(|r| (r.get::<String, _>("document_type"), r.get::<i64, _>("n")))
        .collect();

    let total_chunks: i64 = sqlx::query("SELECT COUNT(*) AS n FROM document_chunks")
        .fetch_one(&state.pool)
        .await?
        .get("n");

    let vector_database = match state.vectors.as_deref() {
        Some(store) => store
            .stats()
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "documents: index stats unavailable"))
            .ok(),
        None => None,
    };

    Ok(DocumentStats {
        total_documents,
        processed_documents,
        processing_rate: processing_rate(processed_documents, total_documents),
        document_types,
        total_chunks,
        vector_database,
    })
}

#[cfg(test)]
#[path = "documents_test.rs"]
mod tests;
