use super::*;
use time::macros::datetime;

#[test]
fn title_prefers_explicit_title() {
    let now = datetime!(2024-03-05 09:07 UTC);
    assert_eq!(resolve_title(Some("  Knee pain "), Some("ignored"), now), "Knee pain");
}

#[test]
fn title_falls_back_to_truncated_concern() {
    let now = datetime!(2024-03-05 09:07 UTC);
    let concern = "a".repeat(150);
    assert_eq!(resolve_title(None, Some(&concern), now).len(), TITLE_MAX_CHARS);
    assert_eq!(resolve_title(Some("   "), Some("Headaches"), now), "Headaches");
}

#[test]
fn title_defaults_to_timestamp() {
    let now = datetime!(2024-03-05 09:07 UTC);
    assert_eq!(resolve_title(None, None, now), "Medical Consultation - 2024-03-05 09:07");
}

#[test]
fn average_is_rounded_and_safe() {
    assert!((average_per_conversation(10, 3) - 3.33).abs() < 1e-9);
    assert!((average_per_conversation(5, 0)).abs() < f64::EPSILON);
}

#[test]
fn like_wildcards_are_escaped() {
    assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    assert_eq!(escape_like("plain"), "plain");
}

#[test]
fn status_parses_and_serializes() {
    assert_eq!(ConversationStatus::parse("archived"), Some(ConversationStatus::Archived));
    assert_eq!(ConversationStatus::parse("gone"), None);
    let update: ConversationUpdate = serde_json::from_str(r#"{"status":"archived"}"#).unwrap();
    assert_eq!(update.status, Some(ConversationStatus::Archived));
    assert!(update.title.is_none());
}

#[tokio::test]
async fn feedback_rating_checked_before_db() {
    let state = crate::state::test_helpers::test_app_state();
    let result = add_feedback(&state.pool, Uuid::nil(), Uuid::nil(), 6, None).await;
    assert!(matches!(result, Err(ConversationError::InvalidRating)));
    let result = add_feedback(&state.pool, Uuid::nil(), Uuid::nil(), 0, None).await;
    assert!(matches!(result, Err(ConversationError::InvalidRating)));
}

#[tokio::test]
async fn update_refuses_deleted_status() {
    let state = crate::state::test_helpers::test_app_state();
    let changes = ConversationUpdate { title: None, status: Some(ConversationStatus::Deleted) };
    let result = update(&state.pool, Uuid::nil(), Uuid::nil(), changes).await;
    assert!(matches!(result, Err(ConversationError::InvalidStatus)));
}

// =============================================================================
// Live database
// =============================================================================

#[cfg(feature = "live-db-tests")]
async fn seed_user(pool: &PgPool, name: &str) -> Uuid {
    sqlx::query("INSERT INTO users (email, username, hashed_password) VALUES ($1, $2, 'x') RETURNING id")
        .bind(format!("{name}@example.com"))
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("seed user")
        .get("id")
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn conversation_lifecycle() {
    let pool = crate::state::test_helpers::integration_pool().await;
    let owner = seed_user(&pool, "owner").await;
    let other = seed_user(&pool, "other").await;

    let conv = create(
        &pool,
        owner,
        NewConversation { title: None, primary_concern: Some("Persistent cough".into()), symptoms: Some(vec!["cough".into()]) },
    )
    .await
    .expect("create");
    assert_eq!(conv.title, "Persistent cough");
    assert_eq!(conv.message_count, 0);
    assert!(matches!(get(&pool, conv.id, other).await, Err(ConversationError::NotFound)));

    let exchange = Exchange {
        question: "Why do I cough?".into(),
        answer: "Several reasons; consult a doctor.".into(),
        confidence: 0.8,
        entities: vec!["cough".into()],
        ..Exchange::default()
    };
    add_exchange(&pool, conv.id, owner, &exchange).await.expect("exchange");
    assert!(matches!(add_exchange(&pool, conv.id, other, &exchange).await, Err(ConversationError::NotFound)));

    let msgs = messages(&pool, conv.id, owner, 0, 50).await.expect("messages");
    assert_eq!(msgs.len(), 2);
    assert!(msgs[0].is_from_user);
    assert!(!msgs[1].is_from_user);

    assert!(matches!(
        add_feedback(&pool, msgs[0].id, owner, 5, None).await,
        Err(ConversationError::MessageNotFound)
    ));
    add_feedback(&pool, msgs[1].id, owner, 4, Some("helpful")).await.expect("feedback");

    let summary = summary(&pool, conv.id, owner).await.expect("summary");
    assert_eq!(summary.message_count, 2);
    assert!((summary.avg_confidence.unwrap_or_default() - 0.8).abs() < 1e-9);

    assert_eq!(search(&pool, owner, "COUGH", 10).await.expect("search").len(), 1);
    assert!(search(&pool, owner, "%", 10).await.expect("search").is_empty());

    let s = stats(&pool, owner).await.expect("stats");
    assert_eq!((s.total_conversations, s.active_conversations, s.total_messages), (1, 1, 2));

    soft_delete(&pool, conv.id, owner).await.expect("delete");
    assert!(list(&pool, owner, 0, 20).await.expect("list").is_empty());
    assert!(matches!(soft_delete(&pool, conv.id, owner).await, Err(ConversationError::NotFound)));
    assert!(matches!(
        add_feedback(&pool, msgs[1].id, owner, 2, Some("late")).await,
        Err(ConversationError::MessageNotFound)
    ));
}
