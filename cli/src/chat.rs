//! Interactive chat session: local transcript plus calls to `/chat/query`.
//!
//! LIFECYCLE
//! =========
//! 1. `ChatSession::new` starts empty; `load_history` restores a saved transcript.
//! 2. `send` appends the user message, asks the server, and appends the reply.
//!    Failures become an assistant apology so the transcript stays readable.
//! 3. `save_history` writes the transcript under `vaidya_chat_history`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::client::{ApiClient, ClientError};
use crate::token_store::{CHAT_HISTORY_KEY, StoreError, TokenStore};

pub const APOLOGY: &str = "I'm sorry, I encountered an error processing your request. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub content: String,
    pub is_from_user: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(rename = "type")]
    pub kind: MessageKind,
}

impl ChatMessage {
    fn new(kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            is_from_user: kind == MessageKind::User,
            timestamp: OffsetDateTime::now_utc(),
            confidence: None,
            sources: Vec::new(),
            kind,
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageKind::User, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageKind::Assistant, content)
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageKind::System, content)
    }

    /// Build the assistant message from a `/chat/query` response body.
    #[must_use]
    pub fn from_response(body: &Value) -> Self {
        let mut message = Self::assistant(body.get("answer").and_then(Value::as_str).unwrap_or(APOLOGY));
        message.confidence = body.get("confidence").and_then(Value::as_f64);
        message.sources = body
            .get("sources")
            .and_then(Value::as_array)
            .map(|sources| {
                sources
                    .iter()
                    .filter_map(|s| s.get("title").and_then(Value::as_str).or_else(|| s.as_str()))
                    .map(ToOwned::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        message
    }
}

pub struct ChatSession<'a> {
    client: &'a ApiClient,
    conversation_id: Option<Uuid>,
    messages: Vec<ChatMessage>,
}

impl<'a> ChatSession<'a> {
    #[must_use]
    pub fn new(client: &'a ApiClient, conversation_id: Option<Uuid>) -> Self {
        Self { client, conversation_id, messages: Vec::new() }
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn conversation_id(&self) -> Option<Uuid> {
        self.conversation_id
    }

    /// Send `text` and return the reply. Blank input is ignored and returns `None`.
    ///
    /// [`ClientError::Unauthorized`] is returned so the caller can prompt for
    /// login; every other failure is recorded as an apology.
    ///
    /// # Errors
    ///
    /// Only [`ClientError::Unauthorized`].
    pub async fn send(&mut self, text: &str) -> Result<Option<&ChatMessage>, ClientError> {
        let question = text.trim();
        if question.is_empty() {
            return Ok(None);
        }
        self.messages.push(ChatMessage::user(question));

        let reply = match self.client.ask(question, self.conversation_id).await {
            Ok(body) => ChatMessage::from_response(&body),
            Err(ClientError::Unauthorized) => return Err(ClientError::Unauthorized),
            Err(_) => ChatMessage::assistant(APOLOGY),
        };
        self.messages.push(reply);
        Ok(self.messages.last())
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn save_history(&self, store: &dyn TokenStore) -> Result<(), StoreError> {
        store.set(CHAT_HISTORY_KEY, &serde_json::to_string(&self.messages)?)
    }

    /// Replace the transcript with the saved one. A missing or unreadable entry
    /// leaves the session empty.
    pub fn load_history(&mut self, store: &dyn TokenStore) {
        self.messages = store
            .get(CHAT_HISTORY_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
    }
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
