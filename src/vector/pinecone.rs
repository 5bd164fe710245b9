//! Pinecone data-plane client over REST.
//!
//! The index host is taken from `PINECONE_INDEX_HOST` when set; otherwise it
//! is resolved once at start-up from the control plane by index name.

use std::time::Duration;

use serde::Serialize;
use serde_json::{Value, json};

use super::{Filter, IndexStats, VectorError, VectorMatch, VectorRecord, VectorStore};

pub const DEFAULT_CONTROL_PLANE_URL: &str = "https://api.pinecone.io";
pub const PINECONE_API_VERSION: &str = "2024-07";
pub const UPSERT_BATCH_SIZE: usize = 100;
const REQUEST_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PineconeConfig {
    pub api_key: String,
    pub index_name: String,
    pub index_host: Option<String>,
    pub environment: Option<String>,
    pub namespace: String,
}

impl PineconeConfig {
    /// Read Pinecone settings from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::MissingConfig`] when `PINECONE_API_KEY` is absent.
    pub fn from_env(settings: &crate::config::Settings) -> Result<Self, VectorError> {
        Self::from_lookup(settings, |key| std::env::var(key).ok())
    }

    /// # Errors
    ///
    /// Returns [`VectorError::MissingConfig`] when `PINECONE_API_KEY` is absent.
    pub fn from_lookup(
        settings: &crate::config::Settings,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, VectorError> {
        let api_key = lookup("PINECONE_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or(VectorError::MissingConfig("PINECONE_API_KEY"))?;
        Ok(Self {
            api_key,
            index_name: settings.pinecone_index_name.clone(),
            index_host: lookup("PINECONE_INDEX_HOST")
                .filter(|h| !h.trim().is_empty())
                .map(|h| normalize_host(&h)),
            environment: lookup("PINECONE_ENVIRONMENT").filter(|e| !e.trim().is_empty()),
            namespace: settings.pinecone_namespace.clone(),
        })
    }
}

pub struct PineconeClient {
    http: reqwest::Client,
    api_key: String,
    host: String,
    namespace: String,
}

impl PineconeClient {
    /// Build a client, resolving the index host if it was not configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or host resolution fails.
    pub async fn connect(config: PineconeConfig) -> Result<Self, VectorError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| VectorError::Request(e.to_string()))?;

        let host = match config.index_host {
            Some(host) => host,
            None => resolve_host(&http, &config.api_key, DEFAULT_CONTROL_PLANE_URL, &config.index_name).await?,
        };
        tracing::info!(%host, namespace = %config.namespace, "pinecone: index resolved");
        Ok(Self { http, api_key: config.api_key, host, namespace: config.namespace })
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> Result<Value, VectorError> {
        let url = format!("{}{}", self.host, path);
        let response = self
            .http
            .post(url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| VectorError::Request(e.to_string()))?;
        read_json(response).await
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value, VectorError> {
    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|e| VectorError::Request(e.to_string()))?;
    if !(200..300).contains(&status) {
        return Err(VectorError::Response { status, body: text });
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| VectorError::Parse(e.to_string()))
}

async fn resolve_host(
    http: &reqwest::Client,
    api_key: &str,
    control_plane: &str,
    index_name: &str,
) -> Result<String, VectorError> {
    let response = http
        .get(format!("{control_plane}/indexes/{index_name}"))
        .header("Api-Key", api_key)
        .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
        .send()
        .await
        .map_err(|e| VectorError::Request(e.to_string()))?;
    let body = read_json(response).await?;
    let host = body
        .get("host")
        .and_then(Value::as_str)
        .ok_or_else(|| VectorError::Parse("index description has no host".into()))?;
    Ok(normalize_host(host))
}

fn normalize_host(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

// =============================================================================
// WIRE FORMAT
// =============================================================================

pub(crate) fn upsert_body(records: &[VectorRecord], namespace: &str) -> Value {
    let vectors: Vec<Value> = records
        .iter()
        .map(|r| json!({ "id": r.id, "values": r.values, "metadata": r.metadata }))
        .collect();
    json!({ "vectors": vectors, "namespace": namespace })
}

pub(crate) fn query_body(vector: &[f32], top_k: usize, filter: Option<&Filter>, namespace: &str) -> Value {
    let mut body = json!({
        "vector": vector,
        "topK": top_k,
        "includeMetadata": true,
        "includeValues": false,
        "namespace": namespace,
    });
    if let Some(filter) = filter {
        body["filter"] = Value::Object(filter.clone());
    }
    body
}

pub(crate) fn parse_query_response(body: &Value) -> Result<Vec<VectorMatch>, VectorError> {
    let Some(matches) = body.get("matches").and_then(Value::as_array) else {
        return Err(VectorError::Parse("missing matches".into()));
    };
    matches
        .iter()
        .map(|m| {
            let id = m
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| VectorError::Parse("match without id".into()))?;
            #[allow(clippy::cast_possible_truncation)]
            let score = m.get("score").and_then(Value::as_f64).unwrap_or(0.0) as f32;
            let metadata = m.get("metadata").cloned().unwrap_or(Value::Null);
            Ok(VectorMatch::from_metadata(id.to_string(), score, metadata))
        })
        .collect()
}

pub(crate) fn parse_stats_response(body: &Value, namespace: &str) -> IndexStats {
    let u64_at = |v: &Value, key: &str| v.get(key).and_then(Value::as_u64).unwrap_or(0);
    let namespace_vectors = body
        .get("namespaces")
        .and_then(|n| n.get(namespace))
        .map_or(0, |ns| u64_at(ns, "vectorCount"));
    IndexStats {
        total_vectors: u64_at(body, "totalVectorCount"),
        namespace_vectors,
        dimension: u64_at(body, "dimension"),
        index_fullness: body
            .get("indexFullness")
            .and_then(Value::as_f64)
            .unwrap_or(0.0),
        namespace: namespace.to_string(),
    }
}

// =============================================================================
// TRAIT IMPL
// =============================================================================

#[async_trait::async_trait]
impl VectorStore for PineconeClient {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize, VectorError> {
        let mut upserted = 0;
        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            let body = upsert_body(batch, &self.namespace);
            let resp = self.post("/vectors/upsert", &body).await?;
            let count = resp
                .get("upsertedCount")
                .and_then(Value::as_u64)
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or(batch.len());
            upserted += count;
        }
        tracing::info!(upserted, namespace = %self.namespace, "pinecone: upsert");
        Ok(upserted)
    }

    async fn query(&self, vector: &[f32], top_k: usize, filter: Option<&Filter>) -> Result<Vec<VectorMatch>, VectorError> {
        let body = query_body(vector, top_k, filter, &self.namespace);
        let resp = self.post("/query", &body).await?;
        parse_query_response(&resp)
    }

    async fn delete(&self, ids: &[String]) -> Result<(), VectorError> {
        if ids.is_empty() {
            return Ok(());
        }
        let body = json!({ "ids": ids, "namespace": self.namespace });
        self.post("/vectors/delete", &body).await?;
        tracing::info!(count = ids.len(), namespace = %self.namespace, "pinecone: delete");
        Ok(())
    }

    async fn stats(&self) -> Result<IndexStats, VectorError> {
        let resp = self.post("/describe_index_stats", &json!({})).await?;
        Ok(parse_stats_response(&resp, &self.namespace))
    }
}

#[cfg(test)]
#[path = "pinecone_test.rs"]
mod tests;
