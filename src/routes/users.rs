//! Account routes: registration, the caller's own profile, and admin user management.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde_json::{Value, json};
use uuid::Uuid;

use super::auth::{AdminUser, AuthUser, UNEXPECTED};
use crate::error::ApiError;
use crate::services::page::{Page, PageParams};
use crate::services::session;
use crate::services::users::{self, NewUser, ProfileUpdate, UserError, UserProfile, UserResponse, UserStats};
use crate::state::AppState;

pub(crate) fn user_error(err: UserError, context: &'static str) -> ApiError {
    match err {
        UserError::EmailTaken
        | UserError::UsernameTaken
        | UserError::InvalidEmail
        | UserError::InvalidUsername
        | UserError::WeakPassword => ApiError::bad_request(err.to_string()),
        UserError::NotFound => ApiError::not_found(err.to_string()),
        UserError::Hash(_) | UserError::Database(_) => ApiError::internal(&err, context),
    }
}

fn database_error(err: sqlx::Error, context: &'static str) -> ApiError {
    user_error(UserError::Database(err), context)
}

/// Path ids arrive as strings so a malformed one is a 400, not a routing miss.
pub(crate) fn parse_user_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("Invalid user ID format"))
}

pub(crate) fn page_params(params: PageParams) -> Result<PageParams, ApiError> {
    params.validated().ok_or_else(|| {
        ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "page must be at least 1 and size between 1 and 100")
    })
}

pub async fn register(State(state): State<AppState>, Json(body): Json<NewUser>) -> Result<Json<UserResponse>, ApiError> {
    let user = users::register(&state.pool, body).await.map_err(|e| user_error(e, "Failed to create user"))?;
    tracing::info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(Json(user.response()))
}

pub async fn me(auth: AuthUser) -> Json<UserProfile> {
    Json(auth.user.profile())
}

pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = users::update_profile(&state.pool, auth.user.id, body)
        .await
        .map_err(|e| user_error(e, "Failed to update user profile"))?;
    Ok(Json(user.profile()))
}

/// Soft delete: the account is deactivated and every session ends.
pub async fn delete_me(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Value>, ApiError> {
    deactivate(&state, auth.user.id).await?;
    Ok(Json(json!({ "message": "User account deleted successfully" })))
}

pub async fn my_stats(State(state): State<AppState>, auth: AuthUser) -> Result<Json<UserStats>, ApiError> {
    let stats = users::user_stats(&state.pool, &auth.user)
        .await
        .map_err(|e| user_error(e, "Failed to retrieve user statistics"))?;
    Ok(Json(stats))
}

// =============================================================================
// ADMIN
// =============================================================================

pub async fn list(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<UserResponse>>, ApiError> {
    let page = users::list_users(&state.pool, page_params(params)?)
        .await
        .map_err(|e| user_error(e, "Failed to retrieve users"))?;
    Ok(Json(page))
}

pub async fn get(State(state): State<AppState>, _admin: AdminUser, Path(id): Path<String>) -> Result<Json<UserProfile>, ApiError> {
    let id = parse_user_id(&id)?;
    let user = users::find_by_id(&state.pool, id)
        .await
        .map_err(|e| database_error(e, UNEXPECTED))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(user.profile()))
}

async fn deactivate(state: &AppState, user_id: Uuid) -> Result<(), ApiError> {
    users::set_active(&state.pool, user_id, false)
        .await
        .map_err(|e| user_error(e, "Failed to deactivate user"))?;
    let ended = session::deactivate_user_sessions(&state.pool, user_id)
        .await
        .map_err(|e| database_error(e, "Failed to deactivate user"))?;
    tracing::info!(%user_id, sessions = ended, "user deactivated");
    Ok(())
}

pub async fn deactivate_user(State(state): State<AppState>, _admin: AdminUser, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    deactivate(&state, parse_user_id(&id)?).await?;
    Ok(Json(json!({ "message": "User account deactivated successfully" })))
}

pub async fn activate_user(State(state): State<AppState>, _admin: AdminUser, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let user_id = parse_user_id(&id)?;
    users::set_active(&state.pool, user_id, true)
        .await
        .map_err(|e| user_error(e, "Failed to activate user"))?;
    tracing::info!(%user_id, "user activated");
    Ok(Json(json!({ "message": "User account activated successfully" })))
}

#[cfg(test)]
#[path = "users_test.rs"]
mod tests;
