//! User accounts: registration, profile, admin management.
//!
//! DESIGN
//! ======
//! Rows are mapped by hand from `PgRow` so the JSONB medical lists decode
//! through `sqlx::types::Json`. Deactivation is a soft delete: the row stays
//! and `is_active = false` locks the account out at the extractor.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::services::auth;
use crate::services::conversation;
use crate::services::page::{Page, PageParams};

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 50;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("Email already registered")]
    EmailTaken,
    #[error("Username already taken")]
    UsernameTaken,
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Username must be between 3 and 50 characters")]
    InvalidUsername,
    #[error("Password must be at least 8 characters")]
    WeakPassword,
    #[error("User not found")]
    NotFound,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl crate::error::ErrorCode for UserError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmailTaken => "E_EMAIL_TAKEN",
            Self::UsernameTaken => "E_USERNAME_TAKEN",
            Self::InvalidEmail => "E_INVALID_EMAIL",
            Self::InvalidUsername => "E_INVALID_USERNAME",
            Self::WeakPassword => "E_WEAK_PASSWORD",
            Self::NotFound => "E_USER_NOT_FOUND",
            Self::Hash(_) => "E_PASSWORD_HASH",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Doctor => "doctor",
            Self::Admin => "admin",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "patient" => Some(Self::Patient),
            "doctor" => Some(Self::Doctor),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Full `users` row. The password hash never serializes.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub hashed_password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub medical_conditions: Vec<String>,
    pub medications: Vec<String>,
    pub allergies: Vec<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_verified: bool,
    pub data_sharing_consent: bool,
    pub marketing_consent: bool,
    pub created_at: OffsetDateTime,
    pub last_login: Option<OffsetDateTime>,
}

/// Public account view.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_verified: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
}

/// Account view plus the caller's own medical history.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: UserResponse,
    pub phone_number: Option<String>,
    pub data_sharing_consent: bool,
    pub marketing_consent: bool,
    pub medical_conditions: Vec<String>,
    pub medications: Vec<String>,
    pub allergies: Vec<String>,
}

impl User {
    #[must_use]
    pub fn response(&self) -> UserResponse {
        UserResponse {
            id: self.id,
            email: self.email.clone(),
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            role: self.role,
            is_active: self.is_active,
            is_verified: self.is_verified,
            created_at: self.created_at,
            last_login: self.last_login,
        }
    }

    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            user: self.response(),
            phone_number: self.phone_number.clone(),
            data_sharing_consent: self.data_sharing_consent,
            marketing_consent: self.marketing_consent,
            medical_conditions: self.medical_conditions.clone(),
            medications: self.medications.clone(),
            allergies: self.allergies.clone(),
        }
    }

    /// Context handed to the answer pipeline.
    #[must_use]
    pub fn medical_context(&self) -> serde_json::Value {
        serde_json::json!({
            "medical_conditions": self.medical_conditions,
            "medications": self.medications,
            "allergies": self.allergies,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    #[serde(default)]
    pub data_sharing_consent: bool,
    #[serde(default)]
    pub marketing_consent: bool,
}

/// Partial profile update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub data_sharing_consent: Option<bool>,
    pub marketing_consent: Option<bool>,
    pub medical_conditions: Option<Vec<String>>,
    pub medications: Option<Vec<String>>,
    pub allergies: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub member_since: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
    #[serde(flatten)]
    pub conversations: conversation::ConversationStats,
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Minimal structural email check: one `@`, non-empty local part, dotted domain.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}

/// Check registration input before touching the database.
///
/// # Errors
///
/// Returns the first validation failure.
pub fn validate_new_user(input: &NewUser) -> Result<(), UserError> {
    if !is_valid_email(&input.email) {
        return Err(UserError::InvalidEmail);
    }
    let username_len = input.username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&username_len) {
        return Err(UserError::InvalidUsername);
    }
    if !auth::is_strong_enough(&input.password) {
        return Err(UserError::WeakPassword);
    }
    Ok(())
}

// =============================================================================
// QUERIES
// =============================================================================

const USER_COLUMNS: &str = "id, email, username, hashed_password, first_name, last_name, phone_number, \
     medical_conditions, medications, allergies, role, is_active, is_verified, data_sharing_consent, \
     marketing_consent, created_at, last_login";

fn user_from_row(row: &PgRow) -> User {
    let role: String = row.get("role");
    let Json(medical_conditions): Json<Vec<String>> = row.get("medical_conditions");
    let Json(medications): Json<Vec<String>> = row.get("medications");
    let Json(allergies): Json<Vec<String>> = row.get("allergies");
    User {
        id: row.get("id"),
        email: row.get("email"),
        username: row.get("username"),
        hashed_password: row.get("hashed_password"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        phone_number: row.get("phone_number"),
        medical_conditions,
        medications,
        allergies,
        role: Role::parse(&role).unwrap_or(Role::Patient),
        is_active: row.get("is_active"),
        is_verified: row.get("is_verified"),
        data_sharing_consent: row.get("data_sharing_consent"),
        marketing_consent: row.get("marketing_consent"),
        created_at: row.get("created_at"),
        last_login: row.get("last_login"),
    }
}

async fn find_where(pool: &PgPool, column: &str, value: &str) -> Result<Option<User>, sqlx::Error> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
    let row = sqlx::query(&sql).bind(value).fetch_optional(pool).await?;
    Ok(row.as_ref().map(user_from_row))
}

pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<User>, sqlx::Error> {
    find_where(pool, "username", username).await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    find_where(pool, "email", email).await
}

pub async fn find_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let row = sqlx::query(&sql).bind(user_id).fetch_optional(pool).await?;
    Ok(row.as_ref().map(user_from_row))
}

/// Create an account.
///
/// # Errors
///
/// Validation failures, duplicate email/username, or database errors.
pub async fn register(pool: &PgPool, input: NewUser) -> Result<User, UserError> {
    validate_new_user(&input)?;
    if find_by_email(pool, &input.email).await?.is_some() {
        return Err(UserError::EmailTaken);
    }
    if find_by_username(pool, &input.username).await?.is_some() {
        return Err(UserError::UsernameTaken);
    }

    let hashed = auth::hash_password(input.password.clone())
        .await
        .map_err(|e| UserError::Hash(e.to_string()))?;

    let sql = format!(
        "INSERT INTO users (email, username, hashed_password, first_name, last_name, phone_number, \
         data_sharing_consent, marketing_consent) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {USER_COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(&input.email)
        .bind(&input.username)
        .bind(&hashed)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.phone_number)
        .bind(input.data_sharing_consent)
        .bind(input.marketing_consent)
        .fetch_one(pool)
        .await?;
    let user = user_from_row(&row);
    tracing::info!(user_id = %user.id, "users: registered");
    Ok(user)
}

/// Apply a partial profile update and return the new row.
///
/// # Errors
///
/// `NotFound` if the user vanished, or a database error.
pub async fn update_profile(pool: &PgPool, user_id: Uuid, update: ProfileUpdate) -> Result<User, UserError> {
    let sql = format!(
        "UPDATE users SET
            first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            phone_number = COALESCE($4, phone_number),
            data_sharing_consent = COALESCE($5, data_sharing_consent),
            marketing_consent = COALESCE($6, marketing_consent),
            medical_conditions = COALESCE($7, medical_conditions),
            medications = COALESCE($8, medications),
            allergies = COALESCE($9, allergies),
            updated_at = now()
         WHERE id = $1
         RETURNING {USER_COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(user_id)
        .bind(update.first_name)
        .bind(update.last_name)
        .bind(update.phone_number)
        .bind(update.data_sharing_consent)
        .bind(update.marketing_consent)
        .bind(update.medical_conditions.map(Json))
        .bind(update.medications.map(Json))
        .bind(update.allergies.map(Json))
        .fetch_optional(pool)
        .await?
        .ok_or(UserError::NotFound)?;
    Ok(user_from_row(&row))
}

/// Set `is_active`.
///
/// # Errors
///
/// `NotFound` for an unknown ID, or a database error.
pub async fn set_active(pool: &PgPool, user_id: Uuid, active: bool) -> Result<(), UserError> {
    let result = sqlx::query("UPDATE users SET is_active = $2, updated_at = now() WHERE id = $1")
        .bind(user_id)
        .bind(active)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(UserError::NotFound);
    }
    tracing::info!(%user_id, active, "users: activation changed");
    Ok(())
}

pub async fn touch_last_login(pool: &PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Page through every account, oldest first.
///
/// # Errors
///
/// Returns a database error if either query fails.
pub async fn list_users(pool: &PgPool, params: PageParams) -> Result<Page<UserResponse>, UserError> {
    let total: i64 = sqlx::query("SELECT COUNT(*) AS n FROM users")
        .fetch_one(pool)
        .await?
        .get("n");
    let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at, id LIMIT $1 OFFSET $2");
    let rows = sqlx::query(&sql)
        .bind(params.size)
        .bind(params.offset())
        .fetch_all(pool)
        .await?;
    let items = rows.iter().map(|r| user_from_row(r).response()).collect();
    Ok(Page::new(items, total, params))
}

/// Membership dates plus conversation activity.
///
/// # Errors
///
/// Returns a database error if the stats query fails.
pub async fn user_stats(pool: &PgPool, user: &User) -> Result<UserStats, UserError> {
    let conversations = conversation::stats(pool, user.id).await?;
    Ok(UserStats {
        user_id: user.id,
        member_since: user.created_at,
        last_login: user.last_login,
        conversations,
    })
}

#[cfg(test)]
#[path = "users_test.rs"]
mod tests;
