//! Audit trail and operational metrics.
//!
//! Both tables are append-only. Writes happen off the request path via
//! `tokio::spawn`; a failed write is logged and otherwise ignored so an audit
//! outage never fails a login or upload.

use serde_json::Value;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Caller address and agent, lifted from request headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// One row of `audit_logs`.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub user_id: Option<Uuid>,
    pub action: &'static str,
    pub resource: &'static str,
    pub resource_id: Option<String>,
    pub client: ClientInfo,
    pub metadata: Value,
}

impl AuditEvent {
    #[must_use]
    pub fn new(action: &'static str, resource: &'static str) -> Self {
        Self {
            user_id: None,
            action,
            resource,
            resource_id: None,
            client: ClientInfo::default(),
            metadata: Value::Object(serde_json::Map::new()),
        }
    }

    #[must_use]
    pub fn user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    #[must_use]
    pub fn resource_id(mut self, id: impl ToString) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    #[must_use]
    pub fn client(mut self, client: &ClientInfo) -> Self {
        self.client = client.clone();
        self
    }

    #[must_use]
    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Insert an audit row.
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn record(pool: &PgPool, event: &AuditEvent) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"INSERT INTO audit_logs (user_id, action, resource, resource_id, ip_address, user_agent, metadata)
          VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(event.user_id)
    .bind(event.action)
    .bind(event.resource)
    .bind(event.resource_id.as_deref())
    .bind(event.client.ip_address.as_deref())
    .bind(event.client.user_agent.as_deref())
    .bind(&event.metadata)
    .execute(pool)
    .await?;
    Ok(())
}

/// Fire-and-forget [`record`].
pub fn record_detached(pool: &PgPool, event: AuditEvent) {
    let pool = pool.clone();
    tokio::spawn(async move {
        if let Err(e) = record(&pool, &event).await {
            tracing::warn!(error = %e, action = event.action, "audit: write failed");
        }
    });
}

// =============================================================================
// METRICS
// =============================================================================

/// Metric name for end-to-end AI response latency, in seconds.
pub const AI_RESPONSE_TIME: &str = "ai_response_time";

/// Insert a metric sample.
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn record_metric(pool: &PgPool, name: &str, value: f64, unit: &str) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO system_metrics (metric_name, metric_value, metric_unit) VALUES ($1, $2, $3)")
        .bind(name)
        .bind(value)
        .bind(unit)
        .execute(pool)
        .await?;
    Ok(())
}

/// Fire-and-forget [`record_metric`].
pub fn record_metric_detached(pool: &PgPool, name: &'static str, value: f64, unit: &'static str) {
    let pool = pool.clone();
    tokio::spawn(async move {
        if let Err(e) = record_metric(&pool, name, value, unit).await {
            tracing::warn!(error = %e, metric = name, "metrics: write failed");
        }
    });
}

/// Mean of all samples for `name`, or 0 when there are none.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn average_metric(pool: &PgPool, name: &str) -> Result<f64, sqlx::Error> {
    let row = sqlx::query("SELECT AVG(metric_value) AS avg FROM system_metrics WHERE metric_name = $1")
        .bind(name)
        .fetch_one(pool)
        .await?;
    let avg: Option<f64> = row.get("avg");
    Ok(avg.unwrap_or(0.0))
}

#[cfg(test)]
#[path = "audit_test.rs"]
mod tests;
