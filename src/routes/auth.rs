//! Auth routes and the bearer-token extractors every other route relies on.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRef, FromRequest, FromRequestParts, Request, State};
use axum::http::header::{CONTENT_TYPE, USER_AGENT, WWW_AUTHENTICATE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::{Form, RequestPartsExt};
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::services::audit::ClientInfo;
use crate::services::auth::{self as auth_svc, AuthError, Claims, TokenResponse};
use crate::services::users::{Role, User};
use crate::state::AppState;

pub(crate) const UNEXPECTED: &str = "An unexpected error occurred";

pub(crate) fn auth_error(err: AuthError) -> ApiError {
    match err {
        AuthError::InvalidCredentials => ApiError::bad_request(err.to_string()),
        AuthError::InvalidToken | AuthError::InvalidRefreshToken | AuthError::Inactive => {
            ApiError::unauthorized(err.to_string())
        }
        AuthError::Hash(_) | AuthError::Encode(_) | AuthError::Database(_) => ApiError::internal(&err, UNEXPECTED),
    }
}

// =============================================================================
// CLIENT INFO
// =============================================================================

/// First hop of `X-Forwarded-For`, falling back to `X-Real-IP`.
pub(crate) fn client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    forwarded
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()).map(str::trim))
        .map(str::to_owned)
}

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|ConnectInfo(addr)| addr.ip().to_string());
        Ok(Self {
            ip_address: client_ip(&parts.headers).or(peer),
            user_agent: parts.headers.get(USER_AGENT).and_then(|v| v.to_str().ok()).map(str::to_owned),
        })
    }
}

// =============================================================================
// EXTRACTORS
// =============================================================================

/// Caller authenticated by `Authorization: Bearer <access token>`.
pub struct AuthUser {
    pub user: User,
    pub claims: Claims,
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| ApiError::unauthorized("Not authenticated"))?;

        let app_state = AppState::from_ref(state);
        let (user, claims) = auth_svc::resolve_access_token(&app_state.pool, &app_state.settings, bearer.token())
            .await
            .map_err(auth_error)?;
        Ok(Self { user, claims })
    }
}

/// `Ok` when `user` holds one of `allowed`, else 403 with `message`.
pub(crate) fn require_role(user: &User, allowed: &[Role], message: &'static str) -> Result<(), ApiError> {
    if allowed.contains(&user.role) { Ok(()) } else { Err(ApiError::forbidden(message)) }
}

pub struct AdminUser(pub User);

impl<S> FromRequestParts<S> for AdminUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser { user, .. } = AuthUser::from_request_parts(parts, state).await?;
        require_role(&user, &[Role::Admin], "Not enough permissions")?;
        Ok(Self(user))
    }
}

/// Doctor or admin.
pub struct DoctorUser(pub User);

impl<S> FromRequestParts<S> for DoctorUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser { user, .. } = AuthUser::from_request_parts(parts, state).await?;
        require_role(&user, &[Role::Doctor, Role::Admin], "Doctor privileges required")?;
        Ok(Self(user))
    }
}

/// The caller if a valid bearer token is present; never rejects.
pub struct OptionalUser(pub Option<User>);

impl<S> FromRequestParts<S> for OptionalUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(AuthUser::from_request_parts(parts, state).await.ok().map(|a| a.user)))
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

/// Login credentials from a JSON body or an OAuth2 password form.
async fn login_credentials(req: Request) -> Result<LoginRequest, ApiError> {
    let invalid = |message: String| ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, message);
    if is_json(req.headers()) {
        let Json(body) = Json::<LoginRequest>::from_request(req, &()).await.map_err(|e| invalid(e.body_text()))?;
        Ok(body)
    } else {
        let Form(body) = Form::<LoginRequest>::from_request(req, &()).await.map_err(|e| invalid(e.body_text()))?;
        Ok(body)
    }
}

/// Bad credentials stay a 400 but still advertise the bearer scheme.
fn login_error(err: AuthError) -> Response {
    let challenge = matches!(err, AuthError::InvalidCredentials);
    let mut response = auth_error(err).into_response();
    if challenge {
        response.headers_mut().insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }
    response
}

/// `POST /auth/login`: exchange credentials for a token pair.
pub async fn login(State(state): State<AppState>, client: ClientInfo, req: Request) -> Result<Json<TokenResponse>, Response> {
    let credentials = login_credentials(req).await.map_err(IntoResponse::into_response)?;
    let tokens = auth_svc::login(&state.pool, &state.settings, credentials.username.trim(), &credentials.password, &client)
        .await
        .map_err(login_error)?;
    Ok(Json(tokens))
}

/// `POST /auth/refresh`: rotate the token pair.
pub async fn refresh(State(state): State<AppState>, Json(body): Json<RefreshRequest>) -> Result<Json<TokenResponse>, ApiError> {
    let tokens = auth_svc::refresh(&state.pool, &state.settings, &body.refresh_token)
        .await
        .map_err(auth_error)?;
    Ok(Json(tokens))
}

/// `POST /auth/logout`: end the caller's session.
pub async fn logout(State(state): State<AppState>, auth: AuthUser, client: ClientInfo) -> Result<Json<Value>, ApiError> {
    auth_svc::logout(&state.pool, auth.user.id, &auth.claims.sid, &client)
        .await
        .map_err(auth_error)?;
    Ok(Json(json!({ "message": "Successfully logged out" })))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
