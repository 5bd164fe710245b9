//! Health routes. `/health` is public; every check under `/health/*` is admin-only.

use axum::extract::State;
use axum::response::Json;

use super::auth::AdminUser;
use crate::error::{ApiError, ErrorCode};
use crate::services::health::{
    self, AiHealth, DatabaseHealth, DetailedHealth, HealthCheck, HealthError, RedisHealth, UsageStats, VectorHealth,
};
use crate::state::AppState;

/// Every health failure is a 503; `context` replaces storage error detail.
pub(crate) fn health_error(err: HealthError, context: &'static str) -> ApiError {
    tracing::error!(code = err.error_code(), error = %err, "health check failed");
    match err {
        HealthError::Database(_) => ApiError::unavailable(context),
        HealthError::NotConfigured(_) | HealthError::Vector(_) => ApiError::unavailable(err.to_string()),
    }
}

pub async fn check(State(state): State<AppState>) -> Result<Json<HealthCheck>, ApiError> {
    let report = health::check(&state)
        .await
        .map_err(|e| health_error(e, "Service unavailable"))?;
    Ok(Json(report))
}

pub async fn detailed(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<DetailedHealth>, ApiError> {
    let report = health::detailed(&state)
        .await
        .map_err(|e| health_error(e, "Detailed health check failed"))?;
    Ok(Json(report))
}

pub async fn stats(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<UsageStats>, ApiError> {
    let stats = health::usage_stats(&state)
        .await
        .map_err(|e| health_error(e, "Failed to retrieve system statistics"))?;
    Ok(Json(stats))
}

pub async fn database(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<DatabaseHealth>, ApiError> {
    let report = health::database(&state)
        .await
        .map_err(|e| health_error(e, "Database health check failed"))?;
    Ok(Json(report))
}

pub async fn vector_db(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<VectorHealth>, ApiError> {
    let report = health::vector_db(&state)
        .await
        .map_err(|e| health_error(e, "Vector database health check failed"))?;
    Ok(Json(report))
}

pub async fn ai_service(State(state): State<AppState>, _admin: AdminUser) -> Json<AiHealth> {
    Json(health::ai_service(&state).await)
}

pub async fn redis(State(state): State<AppState>, _admin: AdminUser) -> Json<RedisHealth> {
    Json(health::redis(&state))
}

#[cfg(test)]
#[path = "health_test.rs"]
mod tests;
