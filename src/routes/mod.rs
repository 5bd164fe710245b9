//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Unversioned routes (`/`, `/health`, `/disclaimer`, `/system/info`) and the
//! chat websocket live at the root; the REST API is nested under the
//! configured `API_V1_STR` prefix. Every response passes through the request
//! context middleware, which stamps `X-Request-ID` and `X-Process-Time`.

pub mod auth;
pub mod chat;
pub mod documents;
pub mod health;
pub mod meta;
pub mod users;
pub mod ws;

use std::time::Instant;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Request};
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post, put};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::Settings;
use crate::error::ApiError;
use crate::state::AppState;

const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
const PROCESS_TIME: HeaderName = HeaderName::from_static("x-process-time");

/// Multipart framing allowance on top of `MAX_FILE_SIZE`.
const UPLOAD_OVERHEAD: usize = 64 * 1024;

/// Versioned REST API, mounted under `API_V1_STR`.
fn api_routes(settings: &Settings) -> Router<AppState> {
    let upload_limit = DefaultBodyLimit::max(settings.max_file_size.saturating_add(UPLOAD_OVERHEAD));

    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/users/register", post(users::register))
        .route("/users/me", get(users::me).put(users::update_me).delete(users::delete_me))
        .route("/users/me/stats", get(users::my_stats))
        .route("/users", get(users::list))
        .route("/users/", get(users::list))
        .route("/users/{id}", get(users::get))
        .route("/users/{id}/deactivate", put(users::deactivate_user))
        .route("/users/{id}/activate", put(users::activate_user))
        .route("/chat/query", post(chat::query))
        .route("/chat/conversations", get(chat::list_conversations).post(chat::create_conversation))
        .route("/chat/conversations/search", get(chat::search_conversations))
        .route(
            "/chat/conversations/{id}",
            get(chat::get_conversation)
                .put(chat::update_conversation)
                .delete(chat::delete_conversation),
        )
        .route("/chat/conversations/{id}/messages", get(chat::conversation_messages))
        .route("/chat/conversations/{id}/summary", get(chat::conversation_summary))
        .route("/chat/stats", get(chat::stats))
        .route("/chat/messages/{id}/feedback", post(chat::feedback))
        .route("/chat/symptoms/analyze", post(chat::analyze_symptoms))
        .route("/chat/emergency", get(chat::emergency))
        .route("/documents/upload", post(documents::upload).layer(upload_limit))
        .route("/documents", get(documents::list))
        .route("/documents/", get(documents::list))
        .route("/documents/search", post(documents::search))
        .route("/documents/stats/summary", get(documents::stats))
        .route("/documents/{id}", get(documents::get).delete(documents::delete))
        .route("/documents/{id}/reprocess", post(documents::reprocess))
        .route("/health", get(health::check))
        .route("/health/", get(health::check))
        .route("/health/detailed", get(health::detailed))
        .route("/health/stats", get(health::stats))
        .route("/health/database", get(health::database))
        .route("/health/vector-db", get(health::vector_db))
        .route("/health/ai-service", get(health::ai_service))
        .route("/health/redis", get(health::redis))
}

/// `*` allows any origin without credentials; otherwise the listed origins
/// are allowed with credentials.
pub(crate) fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .expose_headers([REQUEST_ID, PROCESS_TIME]);
    if origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any).allow_headers(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "cors: ignoring invalid origin");
                None
            }
        })
        .collect();
    base.allow_origin(allowed)
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
        .allow_credentials(true)
}

/// Stamp a request ID and the handling time on every response.
async fn request_context(req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let started = Instant::now();

    let mut response = crate::error::REQUEST_ID.scope(request_id.clone(), next.run(req)).await;

    let elapsed = started.elapsed().as_secs_f64();
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.insert(REQUEST_ID, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("{elapsed:.4}")) {
        headers.insert(PROCESS_TIME, value);
    }
    tracing::info!(%request_id, %method, %path, status = response.status().as_u16(), elapsed, "request handled");
    response
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}

/// Full application router.
pub fn app(state: AppState) -> Router {
    let settings = state.settings.clone();
    let api = api_routes(&settings);

    let router = Router::new()
        .route("/", get(meta::root))
        .route("/health", get(health::check))
        .route("/disclaimer", get(meta::disclaimer))
        .route("/system/info", get(meta::system_info))
        .route("/ws/chat/{client_id}", get(ws::handle_ws))
        .nest(&settings.api_v1_str, api);

    router
        .fallback(not_found)
        .layer(middleware::from_fn(request_context))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&settings.cors_origins))
        .with_state(state)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
