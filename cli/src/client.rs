//! HTTP client for the Vaidya REST API.
//!
//! DESIGN
//! ======
//! Requests are described by a [`Payload`] rather than a `reqwest` builder so
//! they can be rebuilt for the single replay after a token refresh. A 401
//! triggers exactly one `/auth/refresh`; a failed refresh or a second 401
//! clears the stored credentials and surfaces [`ClientError::Unauthorized`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::token_store::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, StoreError, TokenStore, USER_DATA_KEY};

/// Largest file `upload_document` will send.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("not authenticated; run `vaidya-cli login`")]
    Unauthorized,
    #[error("file is {size} bytes; the limit is {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },
    #[error("server returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("missing expected field `{0}`")]
    MissingField(&'static str),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("file read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Selects the request timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub fn timeout(self) -> Duration {
        match self {
            Self::Development => Duration::from_secs(30),
            Self::Production => Duration::from_secs(60),
        }
    }
}

/// A replayable request body.
#[derive(Debug, Clone)]
pub enum Payload {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
    Upload {
        filename: String,
        bytes: Vec<u8>,
        fields: Vec<(String, String)>,
    },
}

impl Payload {
    fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Self::Empty => request,
            Self::Json(body) => request.json(body),
            Self::Form(fields) => request.form(fields),
            Self::Upload { filename, bytes, fields } => {
                let mut form = Form::new().part("file", Part::bytes(bytes.clone()).file_name(filename.clone()));
                for (name, value) in fields {
                    form = form.text(name.clone(), value.clone());
                }
                request.multipart(form)
            }
        }
    }
}

/// Message from the server's error envelope, falling back to the raw body.
#[must_use]
pub fn error_message(body: &Value) -> String {
    ["message", "detail"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map_or_else(|| body.to_string(), ToOwned::to_owned)
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns an error if `base_url` is not http(s) or the HTTP client cannot be built.
    pub fn new(base_url: &str, environment: Environment, store: Arc<dyn TokenStore>) -> Result<Self, ClientError> {
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidBaseUrl(base_url.to_owned()));
        }
        let http = reqwest::Client::builder().timeout(environment.timeout()).build()?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned(), store })
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_once(&self, method: &Method, path: &str, payload: &Payload) -> Result<reqwest::Response, ClientError> {
        let mut request = self.http.request(method.clone(), self.url(path));
        if let Some(token) = self.store.get(ACCESS_TOKEN_KEY) {
            request = request.bearer_auth(token);
        }
        Ok(payload.apply(request).send().await?)
    }

    async fn parse(response: reqwest::Response) -> Result<Value, ClientError> {
        let status = response.status();
        let text = response.text().await?;
        let body = if text.trim().is_empty() { Value::Null } else { serde_json::from_str(&text).unwrap_or(Value::String(text)) };
        if status.is_success() {
            Ok(body)
        } else {
            Err(ClientError::Api { status: status.as_u16(), message: error_message(&body) })
        }
    }

    fn unauthorized(&self) -> ClientError {
        if let Err(e) = self.store.clear_auth() {
            return e.into();
        }
        ClientError::Unauthorized
    }

    /// Send a request, refreshing the token pair and replaying once on 401.
    ///
    /// # Errors
    ///
    /// [`ClientError::Unauthorized`] when refresh is impossible or the replay is
    /// also rejected; [`ClientError::Api`] for other non-2xx responses.
    pub async fn request(&self, method: Method, path: &str, payload: Payload) -> Result<Value, ClientError> {
        let response = self.send_once(&method, path, &payload).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::parse(response).await;
        }
        if self.refresh().await.is_err() {
            return Err(self.unauthorized());
        }
        let replay = self.send_once(&method, path, &payload).await?;
        if replay.status() == StatusCode::UNAUTHORIZED {
            return Err(self.unauthorized());
        }
        Self::parse(replay).await
    }

    fn store_tokens(&self, tokens: &Value) -> Result<(), ClientError> {
        let access = tokens.get("access_token").and_then(Value::as_str).ok_or(ClientError::MissingField("access_token"))?;
        let refresh = tokens
            .get("refresh_token")
            .and_then(Value::as_str)
            .ok_or(ClientError::MissingField("refresh_token"))?;
        self.store.set(ACCESS_TOKEN_KEY, access)?;
        self.store.set(REFRESH_TOKEN_KEY, refresh)?;
        Ok(())
    }

    // =========================================================================
    // AUTH
    // =========================================================================

    /// Exchange credentials for tokens and cache the caller's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the credentials or the store fails.
    pub async fn login(&self, username: &str, password: &str) -> Result<Value, ClientError> {
        let form = Payload::Form(vec![
            ("username".to_owned(), username.to_owned()),
            ("password".to_owned(), password.to_owned()),
        ]);
        let tokens = Self::parse(self.send_once(&Method::POST, "/auth/login", &form).await?).await?;
        self.store_tokens(&tokens)?;
        let me = self.me().await?;
        self.store.set(USER_DATA_KEY, &me.to_string())?;
        Ok(me)
    }

    /// Rotate the stored token pair.
    ///
    /// # Errors
    ///
    /// [`ClientError::Unauthorized`] without a stored refresh token; otherwise
    /// the server's rejection.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let refresh_token = self.store.get(REFRESH_TOKEN_KEY).ok_or(ClientError::Unauthorized)?;
        let body = Payload::Json(json!({ "refresh_token": refresh_token }));
        let tokens = Self::parse(self.send_once(&Method::POST, "/auth/refresh", &body).await?).await?;
        self.store_tokens(&tokens)
    }

    /// End the server session, then clear local credentials whatever the outcome.
    ///
    /// # Errors
    ///
    /// [`ClientError::Store`] when the credentials could not be cleared.
    /// Otherwise the server error (non-2xx included), reported after clearing.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let server = if self.store.get(ACCESS_TOKEN_KEY).is_some() {
            self.end_session().await
        } else {
            Ok(())
        };
        self.store.clear_auth()?;
        server
    }

    async fn end_session(&self) -> Result<(), ClientError> {
        let response = self.send_once(&Method::POST, "/auth/logout", &Payload::Empty).await?;
        Self::parse(response).await.map(|_| ())
    }

    /// # Errors
    ///
    /// Returns the server's validation error.
    pub async fn register(&self, user: Value) -> Result<Value, ClientError> {
        self.request(Method::POST, "/users/register", Payload::Json(user)).await
    }

    /// # Errors
    ///
    /// [`ClientError::Unauthorized`] when not signed in.
    pub async fn me(&self) -> Result<Value, ClientError> {
        self.request(Method::GET, "/users/me", Payload::Empty).await
    }

    // =========================================================================
    // CHAT
    // =========================================================================

    /// # Errors
    ///
    /// Returns the server error, including 429 when rate limited.
    pub async fn ask(&self, question: &str, conversation_id: Option<Uuid>) -> Result<Value, ClientError> {
        let body = json!({ "question": question, "conversation_id": conversation_id });
        self.request(Method::POST, "/chat/query", Payload::Json(body)).await
    }

    /// # Errors
    ///
    /// Returns the server error.
    pub async fn conversations(&self) -> Result<Value, ClientError> {
        self.request(Method::GET, "/chat/conversations", Payload::Empty).await
    }

    /// # Errors
    ///
    /// Returns the server error.
    pub async fn create_conversation(&self, title: Option<&str>, primary_concern: Option<&str>) -> Result<Value, ClientError> {
        let body = json!({ "title": title, "primary_concern": primary_concern });
        self.request(Method::POST, "/chat/conversations", Payload::Json(body)).await
    }

    /// # Errors
    ///
    /// Returns the server error, including 400 for an empty list.
    pub async fn analyze_symptoms(&self, symptoms: &[String]) -> Result<Value, ClientError> {
        self.request(Method::POST, "/chat/symptoms/analyze", Payload::Json(json!(symptoms))).await
    }

    /// # Errors
    ///
    /// Returns the server error.
    pub async fn emergency(&self) -> Result<Value, ClientError> {
        self.request(Method::GET, "/chat/emergency", Payload::Empty).await
    }

    // =========================================================================
    // DOCUMENTS
    // =========================================================================

    /// # Errors
    ///
    /// Returns the server error.
    pub async fn documents(&self, page: u32, size: u32) -> Result<Value, ClientError> {
        self.request(Method::GET, &format!("/documents/?page={page}&size={size}"), Payload::Empty).await
    }

    /// # Errors
    ///
    /// Returns the server error.
    pub async fn search_documents(&self, query: &str, limit: u32) -> Result<Value, ClientError> {
        let body = json!({ "query": query, "limit": limit });
        self.request(Method::POST, "/documents/search", Payload::Json(body)).await
    }

    /// Upload a document. Files over [`MAX_UPLOAD_BYTES`] are rejected before
    /// any request is made.
    ///
    /// # Errors
    ///
    /// [`ClientError::FileTooLarge`], a read failure, or the server error.
    pub async fn upload_document(&self, path: &Path, title: &str, document_type: &str) -> Result<Value, ClientError> {
        let size = tokio::fs::metadata(path).await?.len();
        if size > MAX_UPLOAD_BYTES {
            return Err(ClientError::FileTooLarge { size, limit: MAX_UPLOAD_BYTES });
        }
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map_or_else(|| "upload".to_owned(), |n| n.to_string_lossy().into_owned());
        let payload = Payload::Upload {
            filename,
            bytes,
            fields: vec![
                ("title".to_owned(), title.to_owned()),
                ("document_type".to_owned(), document_type.to_owned()),
            ],
        };
        self.request(Method::POST, "/documents/upload", payload).await
    }

    /// `ws://` or `wss://` URL of the chat relay for `client_id`.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidBaseUrl`] when the base URL is not http(s).
    pub fn ws_url(&self, client_id: &str) -> Result<String, ClientError> {
        ws_url(&self.base_url, client_id, self.store.get(ACCESS_TOKEN_KEY).as_deref())
    }
}

/// The relay lives at the server root, outside the versioned API prefix.
///
/// # Errors
///
/// [`ClientError::InvalidBaseUrl`] when `base_url` is not http(s).
pub fn ws_url(base_url: &str, client_id: &str, token: Option<&str>) -> Result<String, ClientError> {
    let (scheme, rest) = if let Some(rest) = base_url.strip_prefix("http://") {
        ("ws", rest)
    } else if let Some(rest) = base_url.strip_prefix("https://") {
        ("wss", rest)
    } else {
        return Err(ClientError::InvalidBaseUrl(base_url.to_owned()));
    };
    let host = rest.split('/').next().unwrap_or(rest);
    let mut url = format!("{scheme}://{host}/ws/chat/{client_id}");
    if let Some(token) = token {
        url.push_str("?token=");
        url.push_str(token);
    }
    Ok(url)
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
