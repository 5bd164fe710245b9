use super::*;
use std::sync::Arc;

use crate::state::test_helpers::{
    MockLlm, MockVectorStore, test_app_state, test_app_state_with_ai, test_settings_with,
};

#[test]
fn all_healthy_is_healthy() {
    let services = BTreeMap::from([("database", HEALTHY), ("vector_db", HEALTHY), ("ai_service", HEALTHY)]);
    assert_eq!(overall_status(&services), HEALTHY);
}

#[test]
fn any_other_state_degrades() {
    let services = BTreeMap::from([("database", HEALTHY), ("vector_db", NOT_CONFIGURED)]);
    assert_eq!(overall_status(&services), DEGRADED);
    let services = BTreeMap::from([("database", HEALTHY), ("vector_db", UNHEALTHY)]);
    assert_eq!(overall_status(&services), DEGRADED);
}

#[test]
fn rounding_keeps_two_places() {
    assert!((round2(1.23456) - 1.23).abs() < f64::EPSILON);
    assert!((round2(2.499) - 2.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn check_fails_without_database() {
    let state = test_app_state();
    let err = check(&state).await.unwrap_err();
    assert!(matches!(err, HealthError::Database(_)));
    assert_eq!(err.to_string(), "Service unavailable");
}

#[tokio::test]
async fn vector_status_reflects_store() {
    assert_eq!(vector_status(&test_app_state()).await, NOT_CONFIGURED);
    let ok = test_app_state_with_ai(Arc::new(MockLlm::default()), Arc::new(MockVectorStore::default()));
    assert_eq!(vector_status(&ok).await, HEALTHY);
    let down = test_app_state_with_ai(Arc::new(MockLlm::default()), Arc::new(MockVectorStore::failing()));
    assert_eq!(vector_status(&down).await, UNHEALTHY);
}

#[tokio::test]
async fn config_echo_mirrors_settings() {
    let state = crate::state::test_helpers::test_app_state_with(test_settings_with(&[
        ("DEBUG", "true"),
        ("RATE_LIMIT_REQUESTS", "7"),
        ("RATE_LIMIT_WINDOW", "60"),
    ]));
    let echo = config_echo(&state);
    assert!(echo.debug_mode);
    assert_eq!(echo.rate_limiting.requests_per_window, 7);
    assert_eq!(echo.rate_limiting.window_seconds, 60);
    assert!(!ai_config(&state).configured);
}

#[tokio::test]
async fn vector_check_requires_configuration() {
    let err = vector_db(&test_app_state()).await.unwrap_err();
    assert_eq!(err.to_string(), "Vector database is not configured");
}

#[tokio::test]
async fn vector_check_reports_stats_and_search() {
    let store = Arc::new(MockVectorStore::with_matches(vec![crate::state::test_helpers::vector_match("d_0", 0.2, "d")]));
    let state = test_app_state_with_ai(Arc::new(MockLlm::default()), store.clone());
    let health = vector_db(&state).await.unwrap();
    assert_eq!(health.status, HEALTHY);
    assert_eq!(health.search_test.results_count, 1);
    assert_eq!(store.last_query().map(|(k, _)| k), Some(1));
}

#[tokio::test]
async fn ai_check_states() {
    let missing = ai_service(&test_app_state()).await;
    assert_eq!(missing.status, NOT_CONFIGURED);
    assert!(missing.response_time_ms.is_none());

    let llm = Arc::new(MockLlm::default());
    let state = test_app_state_with_ai(llm.clone(), Arc::new(MockVectorStore::default()));
    let ok = ai_service(&state).await;
    assert_eq!(ok.status, HEALTHY);
    assert_eq!(ok.model.as_deref(), Some(state.settings.auxiliary_model.as_str()));
    assert_eq!(llm.requests()[0].max_tokens, 20);

    let failing = test_app_state_with_ai(Arc::new(MockLlm::failing()), Arc::new(MockVectorStore::default()));
    let down = ai_service(&failing).await;
    assert_eq!(down.status, UNHEALTHY);
    assert!(down.error.is_some());
}

#[tokio::test]
async fn redis_is_not_configured() {
    let state = crate::state::test_helpers::test_app_state_with(test_settings_with(&[("REDIS_URL", "redis://cache:6379")]));
    let health = redis(&state);
    assert_eq!(health.status, NOT_CONFIGURED);
    assert_eq!(health.url, "redis://cache:6379");
}
