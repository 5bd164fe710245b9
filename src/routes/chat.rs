//! Chat routes: medical questions, conversations, feedback, and symptom triage.
//!
//! DESIGN
//! ======
//! `/chat/query` and `/chat/symptoms/analyze` are the only routes that reach
//! the model, so they are the only ones charged against the per-user rate
//! limit. Answers are returned before the exchange is persisted; storage
//! failures are logged, never surfaced to the caller.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use super::auth::AuthUser;
use crate::error::ApiError;
use crate::services::conversation::{
    self, Conversation, ConversationError, ConversationStats, ConversationSummary, ConversationUpdate, Exchange, Message,
    NewConversation,
};
use crate::services::rag::{self, MedicalResponse, SymptomAnalysis, UserContext};
use crate::services::triage::{self, EmergencyInfo};
use crate::services::users::User;
use crate::state::AppState;

pub const QUESTION_MAX_CHARS: usize = 1000;

pub(crate) fn conversation_error(err: ConversationError, context: &'static str) -> ApiError {
    match err {
        ConversationError::NotFound => ApiError::not_found("Conversation not found"),
        ConversationError::MessageNotFound => ApiError::not_found("Message not found or access denied"),
        ConversationError::InvalidRating | ConversationError::InvalidStatus => ApiError::bad_request(err.to_string()),
        ConversationError::Database(_) => ApiError::internal(&err, context),
    }
}

fn unprocessable(message: &str) -> ApiError {
    ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, message)
}

// =============================================================================
// REQUEST BODIES
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct MedicalQuery {
    pub question: String,
    /// Extra context merged over the caller's stored medical history.
    pub context: Option<Value>,
    pub conversation_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub rating: i32,
    pub feedback: Option<String>,
}

/// Either a bare list or `{"symptoms": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SymptomsBody {
    List(Vec<String>),
    Wrapped { symptoms: Vec<String> },
}

impl SymptomsBody {
    fn into_symptoms(self) -> Vec<String> {
        match self {
            Self::List(symptoms) | Self::Wrapped { symptoms } => symptoms,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_list_limit")]
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_message_limit")]
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default = "default_search_limit")]
    pub limit: i64,
}

fn default_list_limit() -> i64 {
    conversation::DEFAULT_LIST_LIMIT
}

fn default_message_limit() -> i64 {
    conversation::DEFAULT_MESSAGE_LIMIT
}

fn default_search_limit() -> i64 {
    conversation::DEFAULT_SEARCH_LIMIT
}

// =============================================================================
// HELPERS
// =============================================================================

/// Trimmed question, or 422 when empty or longer than [`QUESTION_MAX_CHARS`].
pub(crate) fn validate_question(question: &str) -> Result<&str, ApiError> {
    let trimmed = question.trim();
    if trimmed.is_empty() || trimmed.chars().count() > QUESTION_MAX_CHARS {
        return Err(unprocessable("question must be between 1 and 1000 characters"));
    }
    Ok(trimmed)
}

/// The caller's stored history with any request-supplied keys laid over it.
pub(crate) fn user_context(user: &User, extra: Option<&Value>) -> UserContext {
    let mut merged = user.medical_context();
    if let (Some(base), Some(Value::Object(extra))) = (merged.as_object_mut(), extra) {
        for (key, value) in extra {
            base.insert(key.clone(), value.clone());
        }
    }
    serde_json::from_value(merged).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "chat: ignoring malformed request context");
        UserContext {
            medical_conditions: user.medical_conditions.clone(),
            medications: user.medications.clone(),
            allergies: user.allergies.clone(),
        }
    })
}

/// Non-empty trimmed symptoms, or 400 when none remain.
pub(crate) fn clean_symptoms(symptoms: Vec<String>) -> Result<Vec<String>, ApiError> {
    let cleaned: Vec<String> = symptoms
        .into_iter()
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect();
    if cleaned.is_empty() {
        return Err(ApiError::bad_request("At least one symptom must be provided"));
    }
    Ok(cleaned)
}

pub(crate) fn exchange_for(question: &str, response: &MedicalResponse) -> Exchange {
    Exchange {
        question: question.to_owned(),
        answer: response.answer.clone(),
        sources: response.sources.clone(),
        entities: response.medical_entities.clone(),
        confidence: response.confidence,
        processing_time: response.processing_time,
        tokens_used: response.tokens_used.and_then(|t| i32::try_from(t).ok()),
    }
}

fn persist_exchange(state: &AppState, conversation_id: Uuid, user_id: Uuid, exchange: Exchange) {
    let pool = state.pool.clone();
    tokio::spawn(async move {
        if let Err(e) = conversation::add_exchange(&pool, conversation_id, user_id, &exchange).await {
            tracing::warn!(error = %e, %conversation_id, "chat: failed to store exchange");
        }
    });
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `POST /chat/query`
pub async fn query(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<MedicalQuery>,
) -> Result<Json<MedicalResponse>, ApiError> {
    let question = validate_question(&body.question)?;
    state.rate_limiter.check_and_record(auth.user.id)?;
    tracing::debug!(
        user_id = %auth.user.id,
        question = %triage::mask_sensitive_data(question),
        remaining = state.rate_limiter.remaining(auth.user.id),
        "chat: question received"
    );

    let ctx = user_context(&auth.user, body.context.as_ref());
    let response = rag::generate_medical_response(&state, question, &ctx).await;
    tracing::info!(user_id = %auth.user.id, confidence = response.confidence, "chat: question answered");

    if let Some(conversation_id) = body.conversation_id {
        persist_exchange(&state, conversation_id, auth.user.id, exchange_for(question, &response));
    }
    Ok(Json(response))
}

pub async fn create_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<NewConversation>,
) -> Result<Json<Conversation>, ApiError> {
    let conversation = conversation::create(&state.pool, auth.user.id, body)
        .await
        .map_err(|e| conversation_error(e, "Failed to create conversation"))?;
    Ok(Json(conversation))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    let conversations = conversation::list(&state.pool, auth.user.id, params.skip, params.limit)
        .await
        .map_err(|e| conversation_error(e, "Failed to retrieve conversations"))?;
    Ok(Json(conversations))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Conversation>, ApiError> {
    let conversation = conversation::get(&state.pool, id, auth.user.id)
        .await
        .map_err(|e| conversation_error(e, "Failed to retrieve conversation"))?;
    Ok(Json(conversation))
}

pub async fn update_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ConversationUpdate>,
) -> Result<Json<Conversation>, ApiError> {
    let conversation = conversation::update(&state.pool, id, auth.user.id, body)
        .await
        .map_err(|e| conversation_error(e, "Failed to update conversation"))?;
    Ok(Json(conversation))
}

pub async fn delete_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    conversation::soft_delete(&state.pool, id, auth.user.id)
        .await
        .map_err(|e| conversation_error(e, "Failed to delete conversation"))?;
    Ok(Json(json!({ "message": "Conversation deleted successfully" })))
}

pub async fn conversation_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Query(params): Query<MessagesQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let messages = conversation::messages(&state.pool, id, auth.user.id, params.skip, params.limit)
        .await
        .map_err(|e| conversation_error(e, "Failed to retrieve messages"))?;
    Ok(Json(messages))
}

pub async fn conversation_summary(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ConversationSummary>, ApiError> {
    let summary = conversation::summary(&state.pool, id, auth.user.id)
        .await
        .map_err(|e| conversation_error(e, "Failed to summarize conversation"))?;
    Ok(Json(summary))
}

pub async fn search_conversations(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    let q = params.q.trim();
    if q.is_empty() {
        return Err(unprocessable("q must not be empty"));
    }
    let results = conversation::search(&state.pool, auth.user.id, q, params.limit)
        .await
        .map_err(|e| conversation_error(e, "Failed to search conversations"))?;
    Ok(Json(results))
}

pub async fn stats(State(state): State<AppState>, auth: AuthUser) -> Result<Json<ConversationStats>, ApiError> {
    let stats = conversation::stats(&state.pool, auth.user.id)
        .await
        .map_err(|e| conversation_error(e.into(), "Failed to retrieve statistics"))?;
    Ok(Json(stats))
}

/// `POST /chat/messages/{id}/feedback`
pub async fn feedback(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(message_id): Path<Uuid>,
    Json(body): Json<FeedbackRequest>,
) -> Result<Json<Value>, ApiError> {
    conversation::add_feedback(&state.pool, message_id, auth.user.id, body.rating, body.feedback.as_deref())
        .await
        .map_err(|e| conversation_error(e, "Failed to submit feedback"))?;
    Ok(Json(json!({ "message": "Feedback submitted successfully" })))
}

/// `POST /chat/symptoms/analyze`
pub async fn analyze_symptoms(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<SymptomsBody>,
) -> Result<Json<SymptomAnalysis>, ApiError> {
    let symptoms = clean_symptoms(body.into_symptoms())?;
    state.rate_limiter.check_and_record(auth.user.id)?;

    let ctx = user_context(&auth.user, None);
    let analysis = rag::analyze_symptoms(&state, &symptoms, &ctx).await;
    tracing::info!(
        user_id = %auth.user.id,
        symptoms = symptoms.len(),
        urgency = analysis.urgency_level.as_str(),
        "chat: symptoms analyzed"
    );
    Ok(Json(analysis))
}

/// `GET /chat/emergency` is public.
pub async fn emergency() -> Json<EmergencyInfo> {
    Json(triage::emergency_info())
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
