//! LLM: `OpenAI` adapter for generation and embeddings.
//!
//! DESIGN
//! ======
//! `LlmClient` owns one HTTP client and serves both traits the RAG pipeline
//! depends on: [`LlmChat`] for completions and [`Embedder`] for retrieval
//! vectors. Handlers only ever see the traits, so tests swap in mocks.

pub mod config;
pub mod openai;
pub mod types;

use config::LlmConfig;
pub use types::{Embedder, LlmChat};
use types::{ChatRequest, ChatResponse, LlmError};

// =============================================================================
// CLIENT
// =============================================================================

/// Concrete LLM client configured from the environment.
pub struct LlmClient {
    inner: openai::OpenAiClient,
    model: String,
    embedding_model: String,
    batch_size: usize,
}

impl LlmClient {
    /// Build an LLM client from environment variables and app settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the HTTP client fails.
    pub fn from_env(settings: &crate::config::Settings) -> Result<Self, LlmError> {
        let config = LlmConfig::from_env(settings)?;
        Self::from_config(config)
    }

    /// Build an LLM client from a parsed typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: LlmConfig) -> Result<Self, LlmError> {
        let inner = openai::OpenAiClient::new(config.api_key, config.base_url, config.timeouts)?;
        Ok(Self {
            inner,
            model: config.model,
            embedding_model: config.embedding_model,
            batch_size: config.embedding_batch_size.max(1),
        })
    }
}

#[async_trait::async_trait]
impl LlmChat for LlmClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        let model = request.model.as_deref().unwrap_or(&self.model);
        self.inner.chat_completions(model, request).await
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait::async_trait]
impl Embedder for LlmClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let vectors = self
                .inner
                .embeddings(&self.embedding_model, batch)
                .await?;
            out.extend(vectors);
        }
        Ok(out)
    }

    fn embedding_model(&self) -> &str {
        &self.embedding_model
    }
}
