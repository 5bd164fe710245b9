//! Login session bookkeeping.
//!
//! ARCHITECTURE
//! ============
//! Every login creates one `user_sessions` row. Access tokens carry a random
//! session ID (`sid`) and refresh tokens are opaque JWTs; the table stores
//! only SHA-256 hashes of both, so a leaked table cannot be replayed.
//!
//! TRADE-OFFS
//! ==========
//! Checking the session on every authenticated request costs one indexed
//! lookup, but it is what lets logout revoke a still-unexpired access token.

use std::fmt::Write;

use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// SHA-256 of `token`, hex-encoded. This is what the table stores.
#[must_use]
pub fn hash_token(token: &str) -> String {
    bytes_to_hex(&Sha256::digest(token.as_bytes()))
}

/// Fields for a fresh session row. Tokens are raw; they are hashed on insert.
#[derive(Debug, Clone)]
pub struct NewSession<'a> {
    pub user_id: Uuid,
    pub session_id: &'a str,
    pub refresh_token: &'a str,
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
    pub expires_at: OffsetDateTime,
}

/// An active session located by its refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub id: Uuid,
    pub user_id: Uuid,
}

/// Insert a session row and return its primary key.
pub async fn create_session(pool: &PgPool, session: &NewSession<'_>) -> Result<Uuid, sqlx::Error> {
    let row = sqlx::query(
        r"INSERT INTO user_sessions (user_id, session_token, refresh_token_hash, ip_address, user_agent, expires_at)
          VALUES ($1, $2, $3, $4, $5, $6)
          RETURNING id",
    )
    .bind(session.user_id)
    .bind(hash_token(session.session_id))
    .bind(hash_token(session.refresh_token))
    .bind(session.ip_address)
    .bind(session.user_agent)
    .bind(session.expires_at)
    .fetch_one(pool)
    .await?;
    Ok(row.get("id"))
}

/// True if the session is active and unexpired. Touches `last_activity`.
pub async fn touch_session(pool: &PgPool, session_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r"UPDATE user_sessions SET last_activity = now()
          WHERE session_token = $1 AND is_active AND expires_at > now()",
    )
    .bind(hash_token(session_id))
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Find the active, unexpired session that issued `refresh_token`.
pub async fn find_by_refresh_token(pool: &PgPool, refresh_token: &str) -> Result<Option<ActiveSession>, sqlx::Error> {
    let row = sqlx::query(
        r"SELECT id, user_id FROM user_sessions
          WHERE refresh_token_hash = $1 AND is_active AND expires_at > now()",
    )
    .bind(hash_token(refresh_token))
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| ActiveSession { id: r.get("id"), user_id: r.get("user_id") }))
}

/// Replace both token hashes on an existing session, but only while it still
/// holds `old_refresh_token`. Returns false when another refresh won the race
/// or the session was revoked in between.
pub async fn rotate_session(
    pool: &PgPool,
    id: Uuid,
    old_refresh_token: &str,
    session_id: &str,
    refresh_token: &str,
    expires_at: OffsetDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r"UPDATE user_sessions
          SET session_token = $3, refresh_token_hash = $4, expires_at = $5, last_activity = now()
          WHERE id = $1 AND refresh_token_hash = $2 AND is_active",
    )
    .bind(id)
    .bind(hash_token(old_refresh_token))
    .bind(hash_token(session_id))
    .bind(hash_token(refresh_token))
    .bind(expires_at)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Deactivate a session. Returns whether an active session was found.
pub async fn deactivate_session(pool: &PgPool, session_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE user_sessions SET is_active = FALSE WHERE session_token = $1 AND is_active")
        .bind(hash_token(session_id))
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Deactivate every session belonging to a user.
pub async fn deactivate_user_sessions(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE user_sessions SET is_active = FALSE WHERE user_id = $1 AND is_active")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
