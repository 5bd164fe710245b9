//! Password authentication and JWT session tokens.
//!
//! DESIGN
//! ======
//! Access and refresh tokens are HS256 JWTs signed with `SECRET_KEY`. Both
//! carry `sid`, a random session ID whose hash is the `user_sessions` key.
//! Access tokens are checked against that row on every request, so logout
//! (which deactivates the row) revokes them before `exp`.
//!
//! Refreshing rotates both tokens and the `sid`; the old refresh token stops
//! matching any row and cannot be replayed.
//!
//! bcrypt is CPU-bound and runs on the blocking pool.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::config::Settings;
use crate::services::audit::{self, AuditEvent, ClientInfo};
use crate::services::session::{self, NewSession};
use crate::services::users::{self, User};

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Incorrect username or password")]
    InvalidCredentials,
    #[error("Could not validate credentials")]
    InvalidToken,
    #[error("Invalid refresh token")]
    InvalidRefreshToken,
    #[error("User account is disabled")]
    Inactive,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("token encoding failed: {0}")]
    Encode(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl crate::error::ErrorCode for AuthError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "E_INVALID_CREDENTIALS",
            Self::InvalidToken => "E_INVALID_TOKEN",
            Self::InvalidRefreshToken => "E_INVALID_REFRESH_TOKEN",
            Self::Inactive => "E_ACCOUNT_DISABLED",
            Self::Hash(_) => "E_PASSWORD_HASH",
            Self::Encode(_) => "E_TOKEN_ENCODE",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

// =============================================================================
// PASSWORDS
// =============================================================================

#[must_use]
pub fn is_strong_enough(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
}

/// bcrypt-hash `password` at the default cost.
///
/// # Errors
///
/// Returns [`AuthError::Hash`] if hashing fails or the blocking task panics.
pub async fn hash_password(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| AuthError::Hash(e.to_string()))?
        .map_err(|e| AuthError::Hash(e.to_string()))
}

/// Constant-time bcrypt check. Malformed hashes verify as false.
pub async fn verify_password(password: String, hashed: String) -> bool {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hashed).unwrap_or(false))
        .await
        .unwrap_or(false)
}

// =============================================================================
// TOKENS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub sid: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(rename = "type")]
    pub token_type: TokenType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Freshly minted token pair plus what the session row needs.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub response: TokenResponse,
    pub session_id: String,
    pub refresh_expires_at: OffsetDateTime,
}

/// Sign `claims` with HS256.
///
/// # Errors
///
/// Returns [`AuthError::Encode`] if signing fails.
pub fn encode_token(secret: &str, claims: &Claims) -> Result<String, AuthError> {
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AuthError::Encode(e.to_string()))
}

/// Verify signature and expiry, and require `expected` as the token type.
///
/// # Errors
///
/// Returns [`AuthError::InvalidToken`] for any decode or type mismatch.
pub fn decode_token(secret: &str, token: &str, expected: TokenType) -> Result<Claims, AuthError> {
    let validation = Validation::new(Algorithm::HS256);
    let data = jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| {
            tracing::debug!(error = %e, "auth: token rejected");
            AuthError::InvalidToken
        })?;
    if data.claims.token_type != expected {
        return Err(AuthError::InvalidToken);
    }
    Ok(data.claims)
}

/// Mint an access/refresh pair for a new session ID.
///
/// # Errors
///
/// Returns [`AuthError::Encode`] if signing fails.
pub fn issue_tokens(settings: &Settings, user_id: Uuid) -> Result<IssuedTokens, AuthError> {
    let now = OffsetDateTime::now_utc();
    let session_id = session::generate_token();
    let access_ttl = Duration::minutes(settings.access_token_expire_minutes);
    let refresh_expires_at = now + Duration::days(settings.refresh_token_expire_days);

    let access = Claims {
        sub: user_id,
        sid: session_id.clone(),
        exp: (now + access_ttl).unix_timestamp(),
        iat: now.unix_timestamp(),
        token_type: TokenType::Access,
    };
    let refresh = Claims {
        exp: refresh_expires_at.unix_timestamp(),
        token_type: TokenType::Refresh,
        ..access.clone()
    };

    Ok(IssuedTokens {
        response: TokenResponse {
            access_token: encode_token(&settings.secret_key, &access)?,
            refresh_token: encode_token(&settings.secret_key, &refresh)?,
            token_type: "bearer".to_owned(),
            expires_in: access_ttl.whole_seconds(),
        },
        session_id,
        refresh_expires_at,
    })
}

// =============================================================================
// FLOWS
// =============================================================================

/// Match by username, then by email; require a correct password and an active account.
///
/// # Errors
///
/// [`AuthError::InvalidCredentials`] for any mismatch, or a database error.
pub async fn authenticate_user(pool: &PgPool, username_or_email: &str, password: &str) -> Result<User, AuthError> {
    let user = match users::find_by_username(pool, username_or_email).await? {
        Some(user) => Some(user),
        None => users::find_by_email(pool, username_or_email).await?,
    };
    let Some(user) = user else {
        return Err(AuthError::InvalidCredentials);
    };
    if !verify_password(password.to_owned(), user.hashed_password.clone()).await {
        return Err(AuthError::InvalidCredentials);
    }
    if !user.is_active {
        tracing::warn!(user_id = %user.id, "auth: login attempt on disabled account");
        return Err(AuthError::InvalidCredentials);
    }
    users::touch_last_login(pool, user.id).await?;
    Ok(user)
}

/// Authenticate, open a session, and return the token pair.
///
/// # Errors
///
/// Credential, signing, or database errors.
pub async fn login(
    pool: &PgPool,
    settings: &Settings,
    username_or_email: &str,
    password: &str,
    client: &ClientInfo,
) -> Result<TokenResponse, AuthError> {
    let user = authenticate_user(pool, username_or_email, password).await?;
    let issued = issue_tokens(settings, user.id)?;
    session::create_session(
        pool,
        &NewSession {
            user_id: user.id,
            session_id: &issued.session_id,
            refresh_token: &issued.response.refresh_token,
            ip_address: client.ip_address.as_deref(),
            user_agent: client.user_agent.as_deref(),
            expires_at: issued.refresh_expires_at,
        },
    )
    .await?;

    audit::record_detached(pool, AuditEvent::new("login", "session").user(user.id).client(client));
    tracing::info!(user_id = %user.id, "auth: login");
    Ok(issued.response)
}

/// Exchange a refresh token for a new pair, rotating the session.
///
/// # Errors
///
/// [`AuthError::InvalidRefreshToken`] if the token is bad, revoked, or expired;
/// [`AuthError::Inactive`] if the account was disabled since login.
pub async fn refresh(pool: &PgPool, settings: &Settings, refresh_token: &str) -> Result<TokenResponse, AuthError> {
    let claims = decode_token(&settings.secret_key, refresh_token, TokenType::Refresh)
        .map_err(|_| AuthError::InvalidRefreshToken)?;
    let active = session::find_by_refresh_token(pool, refresh_token)
        .await?
        .filter(|s| s.user_id == claims.sub)
        .ok_or(AuthError::InvalidRefreshToken)?;

    let user = users::find_by_id(pool, active.user_id)
        .await?
        .ok_or(AuthError::InvalidRefreshToken)?;
    if !user.is_active {
        session::deactivate_user_sessions(pool, user.id).await?;
        return Err(AuthError::Inactive);
    }

    let issued = issue_tokens(settings, user.id)?;
    let rotated = session::rotate_session(
        pool,
        active.id,
        refresh_token,
        &issued.session_id,
        &issued.response.refresh_token,
        issued.refresh_expires_at,
    )
    .await?;
    if !rotated {
        tracing::warn!(user_id = %user.id, "auth: refresh token replayed");
        return Err(AuthError::InvalidRefreshToken);
    }
    tracing::info!(user_id = %user.id, "auth: tokens refreshed");
    Ok(issued.response)
}

/// Deactivate the caller's session.
///
/// # Errors
///
/// Returns a database error if the update fails.
pub async fn logout(pool: &PgPool, user_id: Uuid, session_id: &str, client: &ClientInfo) -> Result<(), AuthError> {
    let found = session::deactivate_session(pool, session_id).await?;
    audit::record_detached(pool, AuditEvent::new("logout", "session").user(user_id).client(client));
    tracing::info!(%user_id, found, "auth: logout");
    Ok(())
}

/// Resolve a bearer access token to its user.
///
/// # Errors
///
/// [`AuthError::InvalidToken`] for bad, expired, or revoked tokens;
/// [`AuthError::Inactive`] for disabled accounts.
pub async fn resolve_access_token(pool: &PgPool, settings: &Settings, token: &str) -> Result<(User, Claims), AuthError> {
    let claims = decode_token(&settings.secret_key, token, TokenType::Access)?;
    if !session::touch_session(pool, &claims.sid).await? {
        return Err(AuthError::InvalidToken);
    }
    let user = users::find_by_id(pool, claims.sub)
        .await?
        .ok_or(AuthError::InvalidToken)?;
    if !user.is_active {
        return Err(AuthError::Inactive);
    }
    Ok((user, claims))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
