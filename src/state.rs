//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the database pool, typed settings, the optional AI providers,
//! the per-user rate limiter, and the live WebSocket connection registry.
//! Providers are `Option` because the server starts without them: missing
//! credentials degrade AI features instead of aborting start-up.

use std::sync::Arc;
use std::time::Instant;

use sqlx::PgPool;

use crate::config::Settings;
use crate::llm::{Embedder, LlmChat};
use crate::rate_limit::RateLimiter;
use crate::services::connections::ConnectionManager;
use crate::vector::VectorStore;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub settings: Arc<Settings>,
    /// Chat completion provider. `None` if `OPENAI_API_KEY` is not configured.
    pub llm: Option<Arc<dyn LlmChat>>,
    pub embedder: Option<Arc<dyn Embedder>>,
    /// Vector index. `None` if `PINECONE_API_KEY` is not configured.
    pub vectors: Option<Arc<dyn VectorStore>>,
    pub rate_limiter: RateLimiter,
    pub connections: ConnectionManager,
    pub started_at: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(pool: PgPool, settings: Settings) -> Self {
        let rate_limiter = RateLimiter::new(settings.rate_limit_requests, settings.rate_limit_window);
        Self {
            pool,
            settings: Arc::new(settings),
            llm: None,
            embedder: None,
            vectors: None,
            rate_limiter,
            connections: ConnectionManager::new(),
            started_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn with_llm(mut self, llm: Arc<dyn LlmChat>) -> Self {
        self.llm = Some(llm);
        self
    }

    #[must_use]
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    #[must_use]
    pub fn with_vectors(mut self, vectors: Arc<dyn VectorStore>) -> Self {
        self.vectors = Some(vectors);
        self
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
#[path = "state_helpers_test.rs"]
pub mod test_helpers;

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
