//! Application settings parsed from environment variables.
//!
//! DESIGN
//! ======
//! `.env` is loaded by `main` through `dotenvy`; everything here reads plain
//! variables. Parsing goes through a lookup closure so tests can feed a map
//! instead of mutating the process environment.

use std::time::Duration;

pub const DEFAULT_APP_NAME: &str = "Vaidya Medical Chatbot";
pub const DEFAULT_APP_VERSION: &str = "1.0.0";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_API_V1_STR: &str = "/api/v1";
pub const DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 30;
pub const DEFAULT_REFRESH_TOKEN_EXPIRE_DAYS: i64 = 7;
pub const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:3000,http://localhost:8000,https://localhost:3000,https://localhost:8000";
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4-turbo-preview";
pub const DEFAULT_AUXILIARY_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_PINECONE_INDEX_NAME: &str = "vaidya-medical-knowledge";
pub const DEFAULT_PINECONE_NAMESPACE: &str = "medical-docs";
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 32;
pub const DEFAULT_MAX_RETRIEVAL_RESULTS: usize = 5;
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.7;
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
pub const DEFAULT_RATE_LIMIT_REQUESTS: usize = 100;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 3600;
pub const DEFAULT_WS_PING_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

pub const MEDICAL_DISCLAIMER: &str = "This information is for educational purposes only and should not replace \
professional medical advice, diagnosis, or treatment. Always consult with a qualified healthcare provider for \
medical concerns.";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl crate::error::ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Missing(_) => "E_CONFIG_MISSING",
            Self::Invalid { .. } => "E_CONFIG_INVALID",
        }
    }
}

/// Typed runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub app_name: String,
    pub app_version: String,
    pub debug: bool,
    pub host: String,
    pub port: u16,
    pub api_v1_str: String,

    pub secret_key: String,
    pub access_token_expire_minutes: i64,
    pub refresh_token_expire_days: i64,
    pub cors_origins: Vec<String>,

    pub database_url: String,
    pub db_max_connections: u32,
    pub redis_url: String,

    pub openai_model: String,
    pub auxiliary_model: String,
    pub embedding_model: String,
    pub pinecone_index_name: String,
    pub pinecone_namespace: String,

    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embedding_batch_size: usize,
    pub max_retrieval_results: usize,
    pub similarity_threshold: f32,
    pub max_file_size: usize,

    pub rate_limit_requests: usize,
    pub rate_limit_window: Duration,
    pub ws_ping_interval: Duration,
    pub log_level: String,
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value is out of range.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let string_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        let settings = Self {
            app_name: string_or("APP_NAME", DEFAULT_APP_NAME),
            app_version: string_or("APP_VERSION", DEFAULT_APP_VERSION),
            debug: lookup("DEBUG").and_then(|v| parse_bool(&v)).unwrap_or(false),
            host: string_or("HOST", DEFAULT_HOST),
            port: parse_or(&lookup, "PORT", DEFAULT_PORT),
            api_v1_str: string_or("API_V1_STR", DEFAULT_API_V1_STR)
                .trim_end_matches('/')
                .to_owned(),

            secret_key: required("SECRET_KEY")?,
            access_token_expire_minutes: parse_or(
                &lookup,
                "ACCESS_TOKEN_EXPIRE_MINUTES",
                DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES,
            ),
            refresh_token_expire_days: parse_or(&lookup, "REFRESH_TOKEN_EXPIRE_DAYS", DEFAULT_REFRESH_TOKEN_EXPIRE_DAYS),
            cors_origins: parse_origins(&string_or("BACKEND_CORS_ORIGINS", DEFAULT_CORS_ORIGINS)),

            database_url: required("DATABASE_URL")?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            redis_url: string_or("REDIS_URL", DEFAULT_REDIS_URL),

            openai_model: string_or("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            auxiliary_model: string_or("OPENAI_AUXILIARY_MODEL", DEFAULT_AUXILIARY_MODEL),
            embedding_model: string_or("EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            pinecone_index_name: string_or("PINECONE_INDEX_NAME", DEFAULT_PINECONE_INDEX_NAME),
            pinecone_namespace: string_or("PINECONE_NAMESPACE", DEFAULT_PINECONE_NAMESPACE),

            chunk_size: parse_or(&lookup, "CHUNK_SIZE", DEFAULT_CHUNK_SIZE),
            chunk_overlap: parse_or(&lookup, "CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP),
            embedding_batch_size: parse_or(&lookup, "EMBEDDING_BATCH_SIZE", DEFAULT_EMBEDDING_BATCH_SIZE).max(1),
            max_retrieval_results: parse_or(&lookup, "MAX_RETRIEVAL_RESULTS", DEFAULT_MAX_RETRIEVAL_RESULTS),
            similarity_threshold: parse_or(&lookup, "SIMILARITY_THRESHOLD", DEFAULT_SIMILARITY_THRESHOLD),
            max_file_size: parse_or(&lookup, "MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE),

            rate_limit_requests: parse_or(&lookup, "RATE_LIMIT_REQUESTS", DEFAULT_RATE_LIMIT_REQUESTS),
            rate_limit_window: Duration::from_secs(parse_or(
                &lookup,
                "RATE_LIMIT_WINDOW",
                DEFAULT_RATE_LIMIT_WINDOW_SECS,
            )),
            ws_ping_interval: Duration::from_secs(parse_or(&lookup, "WS_PING_INTERVAL", DEFAULT_WS_PING_INTERVAL_SECS)),
            log_level: string_or("LOG_LEVEL", DEFAULT_LOG_LEVEL).to_ascii_lowercase(),
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.api_v1_str.starts_with('/') || self.api_v1_str.len() < 2 {
            return Err(ConfigError::Invalid {
                key: "API_V1_STR",
                reason: format!("{:?} must be a non-root path such as /api/v1", self.api_v1_str),
            });
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "DB_MAX_CONNECTIONS",
                reason: "the pool needs at least one connection".to_owned(),
            });
        }
        if self.chunk_size == 0 || self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::Invalid {
                key: "CHUNK_OVERLAP",
                reason: format!("overlap {} must be below chunk size {}", self.chunk_overlap, self.chunk_size),
            });
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::Invalid {
                key: "SIMILARITY_THRESHOLD",
                reason: format!("{} is outside [0, 1]", self.similarity_threshold),
            });
        }
        Ok(())
    }

    /// Socket address string for the listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|o| o.trim_end_matches('/').to_owned())
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
