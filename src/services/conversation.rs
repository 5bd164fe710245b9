//! Conversation and message persistence.
//!
//! Every query is scoped by owner: a conversation that exists but belongs to
//! someone else is indistinguishable from one that does not exist. Deleted
//! conversations are soft-deleted (`status = 'deleted'`) and hidden from
//! every read path.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use time::macros::format_description;
use uuid::Uuid;

pub const TITLE_MAX_CHARS: usize = 100;
pub const DEFAULT_LIST_LIMIT: i64 = 20;
pub const DEFAULT_MESSAGE_LIMIT: i64 = 50;
pub const DEFAULT_SEARCH_LIMIT: i64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    #[error("Conversation not found")]
    NotFound,
    #[error("Message not found")]
    MessageNotFound,
    #[error("Rating must be between 1 and 5")]
    InvalidRating,
    #[error("Use DELETE to remove a conversation")]
    InvalidStatus,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl crate::error::ErrorCode for ConversationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound => "E_CONVERSATION_NOT_FOUND",
            Self::MessageNotFound => "E_MESSAGE_NOT_FOUND",
            Self::InvalidRating => "E_INVALID_RATING",
            Self::InvalidStatus => "E_INVALID_STATUS",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Active,
    Archived,
    Deleted,
}

impl ConversationStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "archived" => Some(Self::Archived),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub id: Uuid,
    pub title: String,
    pub summary: Option<String>,
    pub status: ConversationStatus,
    pub primary_concern: Option<String>,
    pub symptoms: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub message_count: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewConversation {
    pub title: Option<String>,
    pub primary_concern: Option<String>,
    pub symptoms: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationUpdate {
    pub title: Option<String>,
    pub status: Option<ConversationStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub content: String,
    pub message_type: String,
    pub is_from_user: bool,
    pub confidence_score: Option<f64>,
    pub retrieved_sources: Vec<Value>,
    pub medical_entities: Vec<String>,
    pub user_rating: Option<i32>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A user question and the assistant's answer, stored together.
#[derive(Debug, Clone, Default)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
    pub sources: Vec<Value>,
    pub entities: Vec<String>,
    pub confidence: f64,
    pub processing_time: f64,
    pub tokens_used: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub conversation_id: Uuid,
    pub title: String,
    pub primary_concern: Option<String>,
    pub symptoms: Vec<String>,
    pub status: ConversationStatus,
    pub message_count: i64,
    pub avg_confidence: Option<f64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationStats {
    pub total_conversations: i64,
    pub active_conversations: i64,
    pub total_messages: i64,
    pub avg_messages_per_conversation: f64,
}

// =============================================================================
// PURE HELPERS
// =============================================================================

/// Explicit title, else the first 100 chars of the concern, else a timestamped default.
#[must_use]
pub fn resolve_title(title: Option<&str>, primary_concern: Option<&str>, now: OffsetDateTime) -> String {
    if let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) {
        return title.to_owned();
    }
    if let Some(concern) = primary_concern.map(str::trim).filter(|c| !c.is_empty()) {
        return concern.chars().take(TITLE_MAX_CHARS).collect();
    }
    let stamp = now
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_default();
    format!("Medical Consultation - {stamp}")
}

/// Messages per conversation rounded to two places; 0 with no conversations.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn average_per_conversation(total_messages: i64, total_conversations: i64) -> f64 {
    if total_conversations <= 0 {
        return 0.0;
    }
    let avg = total_messages as f64 / total_conversations as f64;
    (avg * 100.0).round() / 100.0
}

// =============================================================================
// QUERIES
// =============================================================================

const CONVERSATION_SELECT: &str = "SELECT c.id, c.title, c.summary, c.status, c.primary_concern, c.symptoms, \
     c.created_at, c.updated_at, \
     (SELECT COUNT(*) FROM messages m WHERE m.conversation_id = c.id) AS message_count \
     FROM conversations c";

fn conversation_from_row(row: &PgRow) -> Conversation {
    let status: String = row.get("status");
    let Json(symptoms): Json<Vec<String>> = row.get("symptoms");
    Conversation {
        id: row.get("id"),
        title: row.get("title"),
        summary: row.get("summary"),
        status: ConversationStatus::parse(&status).unwrap_or(ConversationStatus::Active),
        primary_concern: row.get("primary_concern"),
        symptoms,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        message_count: row.get("message_count"),
    }
}

fn message_from_row(row: &PgRow) -> Message {
    let Json(retrieved_sources): Json<Vec<Value>> = row.get("retrieved_sources");
    let Json(medical_entities): Json<Vec<String>> = row.get("medical_entities");
    Message {
        id: row.get("id"),
        conversation_id: row.get("conversation_id"),
        content: row.get("content"),
        message_type: row.get("message_type"),
        is_from_user: row.get("is_from_user"),
        confidence_score: row.get("confidence_score"),
        retrieved_sources,
        medical_entities,
        user_rating: row.get("user_rating"),
        created_at: row.get("created_at"),
    }
}

/// Open a conversation for `user_id`.
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn create(pool: &PgPool, user_id: Uuid, input: NewConversation) -> Result<Conversation, ConversationError> {
    let title = resolve_title(input.title.as_deref(), input.primary_concern.as_deref(), OffsetDateTime::now_utc());
    let id: Uuid = sqlx::query(
        r"INSERT INTO conversations (user_id, title, primary_concern, symptoms)
          VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(user_id)
    .bind(&title)
    .bind(&input.primary_concern)
    .bind(Json(input.symptoms.unwrap_or_default()))
    .fetch_one(pool)
    .await?
    .get("id");
    tracing::info!(%user_id, conversation_id = %id, "conversation: created");
    get(pool, id, user_id).await
}

/// A conversation owned by `user_id` that is not deleted.
///
/// # Errors
///
/// [`ConversationError::NotFound`] otherwise.
pub async fn get(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<Conversation, ConversationError> {
    let sql = format!("{CONVERSATION_SELECT} WHERE c.id = $1 AND c.user_id = $2 AND c.status <> 'deleted'");
    let row = sqlx::query(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ConversationError::NotFound)?;
    Ok(conversation_from_row(&row))
}

/// Most recently updated first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list(pool: &PgPool, user_id: Uuid, skip: i64, limit: i64) -> Result<Vec<Conversation>, ConversationError> {
    let sql = format!(
        "{CONVERSATION_SELECT} WHERE c.user_id = $1 AND c.status <> 'deleted' \
         ORDER BY c.updated_at DESC OFFSET $2 LIMIT $3"
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .bind(skip.max(0))
        .bind(limit.max(0))
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(conversation_from_row).collect())
}

/// Oldest first. Verifies ownership before reading.
///
/// # Errors
///
/// [`ConversationError::NotFound`] or a database error.
pub async fn messages(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
    skip: i64,
    limit: i64,
) -> Result<Vec<Message>, ConversationError> {
    get(pool, id, user_id).await?;
    let rows = sqlx::query(
        r"SELECT id, conversation_id, content, message_type, is_from_user, confidence_score,
                 retrieved_sources, medical_entities, user_rating, created_at
          FROM messages WHERE conversation_id = $1
          ORDER BY created_at, is_from_user DESC OFFSET $2 LIMIT $3",
    )
    .bind(id)
    .bind(skip.max(0))
    .bind(limit.max(0))
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(message_from_row).collect())
}

/// Store a question/answer pair and bump `updated_at`, atomically.
///
/// # Errors
///
/// [`ConversationError::NotFound`] or a database error.
pub async fn add_exchange(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
    exchange: &Exchange,
) -> Result<(), ConversationError> {
    let mut tx = pool.begin().await?;

    let touched = sqlx::query(
        "UPDATE conversations SET updated_at = now() WHERE id = $1 AND user_id = $2 AND status <> 'deleted'",
    )
    .bind(id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;
    if touched.rows_affected() == 0 {
        return Err(ConversationError::NotFound);
    }

    sqlx::query("INSERT INTO messages (conversation_id, content, is_from_user) VALUES ($1, $2, TRUE)")
        .bind(id)
        .bind(&exchange.question)
        .execute(&mut *tx)
        .await?;
    sqlx::query(
        r"INSERT INTO messages (conversation_id, content, is_from_user, confidence_score,
                                retrieved_sources, medical_entities, processing_time, tokens_used, created_at)
          VALUES ($1, $2, FALSE, $3, $4, $5, $6, $7, clock_timestamp())",
    )
    .bind(id)
    .bind(&exchange.answer)
    .bind(exchange.confidence)
    .bind(Json(&exchange.sources))
    .bind(Json(&exchange.entities))
    .bind(exchange.processing_time)
    .bind(exchange.tokens_used)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Rate an assistant message in one of the caller's conversations.
///
/// # Errors
///
/// [`ConversationError::InvalidRating`] outside 1..=5, [`ConversationError::MessageNotFound`]
/// for unknown, foreign, or user-authored messages.
pub async fn add_feedback(
    pool: &PgPool,
    message_id: Uuid,
    user_id: Uuid,
    rating: i32,
    feedback: Option<&str>,
) -> Result<(), ConversationError> {
    if !(1..=5).contains(&rating) {
        return Err(ConversationError::InvalidRating);
    }
    let result = sqlx::query(
        r"UPDATE messages m SET user_rating = $3, user_feedback = $4
          FROM conversations c
          WHERE m.id = $1 AND m.conversation_id = c.id AND c.user_id = $2 AND c.status <> 'deleted'
            AND NOT m.is_from_user",
    )
    .bind(message_id)
    .bind(user_id)
    .bind(rating)
    .bind(feedback)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ConversationError::MessageNotFound);
    }
    Ok(())
}

/// Change title and/or status. Deletion goes through [`soft_delete`].
///
/// # Errors
///
/// [`ConversationError::InvalidStatus`] for `deleted`, [`ConversationError::NotFound`],
/// or a database error.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
    changes: ConversationUpdate,
) -> Result<Conversation, ConversationError> {
    if changes.status == Some(ConversationStatus::Deleted) {
        return Err(ConversationError::InvalidStatus);
    }
    let result = sqlx::query(
        r"UPDATE conversations SET title = COALESCE($3, title), status = COALESCE($4, status), updated_at = now()
          WHERE id = $1 AND user_id = $2 AND status <> 'deleted'",
    )
    .bind(id)
    .bind(user_id)
    .bind(changes.title)
    .bind(changes.status.map(ConversationStatus::as_str))
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ConversationError::NotFound);
    }
    get(pool, id, user_id).await
}

/// Soft delete.
///
/// # Errors
///
/// [`ConversationError::NotFound`] or a database error.
pub async fn soft_delete(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<(), ConversationError> {
    let result = sqlx::query(
        "UPDATE conversations SET status = 'deleted', updated_at = now() WHERE id = $1 AND user_id = $2 AND status <> 'deleted'",
    )
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ConversationError::NotFound);
    }
    tracing::info!(%user_id, conversation_id = %id, "conversation: deleted");
    Ok(())
}

/// Message count and mean assistant confidence for one conversation.
///
/// # Errors
///
/// [`ConversationError::NotFound`] or a database error.
pub async fn summary(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<ConversationSummary, ConversationError> {
    let conversation = get(pool, id, user_id).await?;
    let avg_confidence: Option<f64> = sqlx::query(
        "SELECT AVG(confidence_score) AS avg FROM messages WHERE conversation_id = $1 AND NOT is_from_user",
    )
    .bind(id)
    .fetch_one(pool)
    .await?
    .get("avg");
    Ok(ConversationSummary {
        conversation_id: conversation.id,
        title: conversation.title,
        primary_concern: conversation.primary_concern,
        symptoms: conversation.symptoms,
        status: conversation.status,
        message_count: conversation.message_count,
        avg_confidence,
        created_at: conversation.created_at,
        updated_at: conversation.updated_at,
    })
}

/// Case-insensitive title search.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn search(pool: &PgPool, user_id: Uuid, query: &str, limit: i64) -> Result<Vec<Conversation>, ConversationError> {
    let pattern = format!("%{}%", escape_like(query));
    let sql = format!(
        "{CONVERSATION_SELECT} WHERE c.user_id = $1 AND c.status <> 'deleted' AND c.title ILIKE $2 \
         ORDER BY c.updated_at DESC LIMIT $3"
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .bind(pattern)
        .bind(limit.max(0))
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(conversation_from_row).collect())
}

/// Escape `ILIKE` wildcards so user input matches literally.
#[must_use]
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Per-user totals over non-deleted conversations.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn stats(pool: &PgPool, user_id: Uuid) -> Result<ConversationStats, sqlx::Error> {
    let row = sqlx::query(
        r"SELECT
            (SELECT COUNT(*) FROM conversations WHERE user_id = $1 AND status <> 'deleted') AS total,
            (SELECT COUNT(*) FROM conversations WHERE user_id = $1 AND status = 'active') AS active,
            (SELECT COUNT(*) FROM messages m JOIN conversations c ON c.id = m.conversation_id
              WHERE c.user_id = $1 AND c.status <> 'deleted') AS messages",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    let total_conversations: i64 = row.get("total");
    let total_messages: i64 = row.get("messages");
    Ok(ConversationStats {
        total_conversations,
        active_conversations: row.get("active"),
        total_messages,
        avg_messages_per_conversation: average_per_conversation(total_messages, total_conversations),
    })
}

#[cfg(test)]
#[path = "conversation_test.rs"]
mod tests;
