use super::*;
use super::test_helpers::{MockEmbedder, MockLlm, MockVectorStore, test_app_state, test_settings_with};

#[tokio::test]
async fn new_state_has_no_providers() {
    let state = test_app_state();
    assert!(state.llm.is_none());
    assert!(state.embedder.is_none());
    assert!(state.vectors.is_none());
    assert_eq!(state.connections.count().await, 0);
}

#[tokio::test]
async fn rate_limiter_follows_settings() {
    let state = test_helpers::test_app_state_with(test_settings_with(&[("RATE_LIMIT_REQUESTS", "2")]));
    let user = uuid::Uuid::new_v4();
    assert_eq!(state.rate_limiter.remaining(user), 2);
    state.rate_limiter.check_and_record(user).unwrap();
    state.rate_limiter.check_and_record(user).unwrap();
    assert!(state.rate_limiter.check_and_record(user).is_err());
}

#[tokio::test]
async fn builders_attach_providers() {
    let state = test_app_state()
        .with_llm(Arc::new(MockLlm::default()))
        .with_embedder(Arc::new(MockEmbedder::default()))
        .with_vectors(Arc::new(MockVectorStore::default()));
    assert_eq!(state.llm.as_ref().map(|l| l.model().to_owned()).as_deref(), Some("mock"));
    assert!(state.embedder.is_some());
    assert!(state.vectors.is_some());
}

#[tokio::test]
async fn clones_share_connections() {
    let state = test_app_state();
    let clone = state.clone();
    let (tx, _rx) = tokio::sync::mpsc::channel(1);
    clone.connections.connect("c1", tx).await;
    assert_eq!(state.connections.count().await, 1);
}
