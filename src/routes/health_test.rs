use super::*;
use axum::http::StatusCode;
use serde_json::Value;

use crate::state::test_helpers::{spawn_app, test_app_state};

#[test]
fn database_failures_use_context_message() {
    let err = health_error(HealthError::Database(sqlx::Error::PoolTimedOut), "Database health check failed");
    assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(err.message, "Database health check failed");
}

#[test]
fn missing_vector_store_is_unavailable() {
    let err = health_error(HealthError::NotConfigured("Vector database"), "ignored");
    assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(err.message, "Vector database is not configured");
}

#[tokio::test]
async fn public_check_is_503_without_database() {
    let addr = spawn_app(test_app_state()).await;
    for path in ["/health", "/api/v1/health/"] {
        let response = reqwest::get(format!("http://{addr}{path}")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE, "{path}");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["message"], "Service unavailable");
    }
}

#[tokio::test]
async fn checks_are_admin_only() {
    let addr = spawn_app(test_app_state()).await;
    for path in ["detailed", "stats", "database", "vector-db", "ai-service", "redis"] {
        let response = reqwest::get(format!("http://{addr}/api/v1/health/{path}")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED, "{path}");
    }
}
