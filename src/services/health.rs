//! Liveness, dependency checks, and usage statistics.
//!
//! DESIGN
//! ======
//! Only the database is load-bearing: without it the public check fails with
//! 503. The vector index and the LLM are optional at start-up, so their
//! absence or failure marks the service `degraded` rather than down.
//! Redis is reported as `not_configured` because no Redis client is linked.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::Serialize;
use sqlx::Row;
use time::OffsetDateTime;

use crate::db::{self, PoolStats};
use crate::llm::types::ChatRequest;
use crate::services::audit;
use crate::state::AppState;
use crate::vector::{self, IndexStats, VectorError};

pub const HEALTHY: &str = "healthy";
pub const DEGRADED: &str = "degraded";
pub const UNHEALTHY: &str = "unhealthy";
pub const NOT_CONFIGURED: &str = "not_configured";

const VECTOR_CHECK_QUERY: &str = "test query";
const AI_CHECK_PROMPT: &str = "headache fever";

#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("Service unavailable")]
    Database(#[from] sqlx::Error),
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("Vector database health check failed")]
    Vector(#[from] VectorError),
}

impl crate::error::ErrorCode for HealthError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Database(_) => "E_DATABASE",
            Self::NotConfigured(_) => "E_NOT_CONFIGURED",
            Self::Vector(_) => "E_VECTOR",
        }
    }

    fn retryable(&self) -> bool {
        !matches!(self, Self::NotConfigured(_))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// =============================================================================
// BASIC CHECK
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub version: String,
    pub services: BTreeMap<&'static str, &'static str>,
}

/// `healthy` only when every service is; anything else is `degraded`.
#[must_use]
pub fn overall_status(services: &BTreeMap<&'static str, &'static str>) -> &'static str {
    if services.values().all(|s| *s == HEALTHY) { HEALTHY } else { DEGRADED }
}

async fn vector_status(state: &AppState) -> &'static str {
    let Some(store) = state.vectors.as_deref() else {
        return NOT_CONFIGURED;
    };
    match store.stats().await {
        Ok(_) => HEALTHY,
        Err(e) => {
            tracing::warn!(error = %e, "health: vector index unreachable");
            UNHEALTHY
        }
    }
}

/// Public health check.
///
/// # Errors
///
/// `Database` when the database cannot be reached.
pub async fn check(state: &AppState) -> Result<HealthCheck, HealthError> {
    db::ping(&state.pool).await.inspect_err(|e| tracing::error!(error = %e, "health: database unreachable"))?;

    let mut services = BTreeMap::new();
    services.insert("database", HEALTHY);
    services.insert("vector_db", vector_status(state).await);
    services.insert("ai_service", if state.llm.is_some() { HEALTHY } else { NOT_CONFIGURED });

    Ok(HealthCheck {
        status: overall_status(&services),
        timestamp: OffsetDateTime::now_utc(),
        version: state.settings.app_version.clone(),
        services,
    })
}

// =============================================================================
// DETAILED
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct RecordCounts {
    pub total_users: i64,
    pub active_users: i64,
    pub total_conversations: i64,
    pub total_messages: i64,
    pub total_documents: i64,
    pub processed_documents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AiConfig {
    pub configured: bool,
    pub model: String,
    pub auxiliary_model: String,
    pub embedding_model: String,
    pub chunk_size: usize,
    pub similarity_threshold: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RateLimitConfig {
    pub requests_per_window: usize,
    pub window_seconds: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigEcho {
    pub debug_mode: bool,
    pub cors_origins: Vec<String>,
    pub rate_limiting: RateLimitConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailedHealth {
    pub status: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub version: String,
    pub uptime_seconds: u64,
    pub database: RecordCounts,
    pub vector_database: Option<IndexStats>,
    pub ai_service: AiConfig,
    pub configuration: ConfigEcho,
}

#[must_use]
pub fn ai_config(state: &AppState) -> AiConfig {
    let s = &state.settings;
    AiConfig {
        configured: state.llm.is_some(),
        model: s.openai_model.clone(),
        auxiliary_model: s.auxiliary_model.clone(),
        embedding_model: s.embedding_model.clone(),
        chunk_size: s.chunk_size,
        similarity_threshold: s.similarity_threshold,
    }
}

#[must_use]
pub fn config_echo(state: &AppState) -> ConfigEcho {
    let s = &state.settings;
    ConfigEcho {
        debug_mode: s.debug,
        cors_origins: s.cors_origins.clone(),
        rate_limiting: RateLimitConfig {
            requests_per_window: s.rate_limit_requests,
            window_seconds: s.rate_limit_window.as_secs(),
        },
    }
}

async fn record_counts(state: &AppState) -> Result<RecordCounts, sqlx::Error> {
    let row = sqlx::query(
        r"SELECT
            (SELECT COUNT(*) FROM users) AS total_users,
            (SELECT COUNT(*) FROM users WHERE is_active) AS active_users,
            (SELECT COUNT(*) FROM conversations) AS total_conversations,
            (SELECT COUNT(*) FROM messages) AS total_messages,
            (SELECT COUNT(*) FROM medical_documents) AS total_documents,
            (SELECT COUNT(*) FROM medical_documents WHERE processed) AS processed_documents",
    )
    .fetch_one(&state.pool)
    .await?;
    Ok(RecordCounts {
        total_users: row.get("total_users"),
        active_users: row.get("active_users"),
        total_conversations: row.get("total_conversations"),
        total_messages: row.get("total_messages"),
        total_documents: row.get("total_documents"),
        processed_documents: row.get("processed_documents"),
    })
}

/// Record counts, index statistics, AI configuration and a configuration echo.
///
/// # Errors
///
/// `Database` if the count query fails.
pub async fn detailed(state: &AppState) -> Result<DetailedHealth, HealthError> {
    let database = record_counts(state).await?;
    let vector_database = match state.vectors.as_deref() {
        Some(store) => store.stats().await.inspect_err(|e| tracing::warn!(error = %e, "health: index stats failed")).ok(),
        None => None,
    };
    let status = if state.llm.is_some() && vector_database.is_some() { HEALTHY } else { DEGRADED };
    Ok(DetailedHealth {
        status,
        timestamp: OffsetDateTime::now_utc(),
        version: state.settings.app_version.clone(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        database,
        vector_database,
        ai_service: ai_config(state),
        configuration: config_echo(state),
    })
}

// =============================================================================
// USAGE
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct UsageStats {
    pub total_users: i64,
    pub active_conversations: i64,
    pub messages_today: i64,
    /// Mean recorded AI latency in seconds; 0 before any AI request.
    pub avg_response_time: f64,
    pub system_health: &'static str,
}

/// # Errors
///
/// `Database` if a query fails.
pub async fn usage_stats(state: &AppState) -> Result<UsageStats, HealthError> {
    let row = sqlx::query(
        r"SELECT
            (SELECT COUNT(*) FROM users) AS total_users,
            (SELECT COUNT(*) FROM conversations WHERE status = 'active') AS active_conversations,
            (SELECT COUNT(*) FROM messages WHERE created_at >= date_trunc('day', now())) AS messages_today",
    )
    .fetch_one(&state.pool)
    .await?;
    let avg = audit::average_metric(&state.pool, audit::AI_RESPONSE_TIME).await?;
    Ok(UsageStats {
        total_users: row.get("total_users"),
        active_conversations: row.get("active_conversations"),
        messages_today: row.get("messages_today"),
        avg_response_time: round2(avg),
        system_health: HEALTHY,
    })
}

// =============================================================================
// DEPENDENCY CHECKS
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseHealth {
    pub status: &'static str,
    pub connection_time_ms: f64,
    pub database_size: String,
    pub active_connections: i64,
    pub pool: PoolStats,
}

/// # Errors
///
/// `Database` if the ping or catalog queries fail.
pub async fn database(state: &AppState) -> Result<DatabaseHealth, HealthError> {
    let connection_time_ms = db::ping(&state.pool).await?;
    let (database_size, active_connections) = db::server_info(&state.pool).await?;
    Ok(DatabaseHealth {
        status: HEALTHY,
        connection_time_ms: round2(connection_time_ms),
        database_size,
        active_connections,
        pool: db::pool_stats(&state.pool),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchCheck {
    pub query: &'static str,
    pub results_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct VectorHealth {
    pub status: &'static str,
    pub response_time_ms: f64,
    pub search_time_ms: f64,
    pub index_stats: IndexStats,
    pub search_test: SearchCheck,
}

/// Index statistics plus a one-result test query.
///
/// # Errors
///
/// `NotConfigured` without an index or embedder, `Vector` if either call fails.
pub async fn vector_db(state: &AppState) -> Result<VectorHealth, HealthError> {
    let (Some(store), Some(embedder)) = (state.vectors.as_deref(), state.embedder.as_deref()) else {
        return Err(HealthError::NotConfigured("Vector database"));
    };
    let started = Instant::now();
    let index_stats = store.stats().await?;
    let response_time_ms = started.elapsed().as_secs_f64() * 1000.0;

    let started = Instant::now();
    let results = vector::search_medical_knowledge(store, embedder, VECTOR_CHECK_QUERY, 1, &[], 0.0).await?;
    let search_time_ms = started.elapsed().as_secs_f64() * 1000.0;

    Ok(VectorHealth {
        status: HEALTHY,
        response_time_ms: round2(response_time_ms),
        search_time_ms: round2(search_time_ms),
        index_stats,
        search_test: SearchCheck { query: VECTOR_CHECK_QUERY, results_count: results.len() },
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelConfig {
    pub openai_model: String,
    pub auxiliary_model: String,
    pub embedding_model: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AiHealth {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<f64>,
    pub model_config: ModelConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One small completion on the auxiliary model. Failures are reported in the
/// body rather than as an error status.
pub async fn ai_service(state: &AppState) -> AiHealth {
    let s = &state.settings;
    let model_config = ModelConfig {
        openai_model: s.openai_model.clone(),
        auxiliary_model: s.auxiliary_model.clone(),
        embedding_model: s.embedding_model.clone(),
    };
    let Some(llm) = state.llm.as_deref() else {
        return AiHealth { status: NOT_CONFIGURED, response_time_ms: None, model_config, model: None, error: None };
    };

    let request = ChatRequest::single(
        "You are a medical entity extraction system. Extract only medical terms.",
        format!("Return the medical terms in \"{AI_CHECK_PROMPT}\" as a comma-separated list."),
        0.0,
        20,
    )
    .with_model(s.auxiliary_model.clone());
    let started = Instant::now();
    let outcome = llm.chat(&request).await;
    let response_time_ms = Some(round2(started.elapsed().as_secs_f64() * 1000.0));
    match outcome {
        Ok(response) => AiHealth {
            status: HEALTHY,
            response_time_ms,
            model_config,
            model: Some(response.model),
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "health: ai check failed");
            AiHealth { status: UNHEALTHY, response_time_ms, model_config, model: None, error: Some(e.to_string()) }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RedisHealth {
    pub status: &'static str,
    pub url: String,
    pub message: &'static str,
}

#[must_use]
pub fn redis(state: &AppState) -> RedisHealth {
    RedisHealth {
        status: NOT_CONFIGURED,
        url: state.settings.redis_url.clone(),
        message: "No Redis client is linked",
    }
}

#[cfg(test)]
#[path = "health_test.rs"]
mod tests;
