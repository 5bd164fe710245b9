use super::*;
use crate::state::test_helpers::{spawn_app, test_app_state};

#[test]
fn validation_failures_are_bad_requests() {
    for err in [
        UserError::EmailTaken,
        UserError::UsernameTaken,
        UserError::InvalidEmail,
        UserError::InvalidUsername,
        UserError::WeakPassword,
    ] {
        let message = err.to_string();
        let api = user_error(err, "ctx");
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.message, message);
    }
}

#[test]
fn missing_user_is_not_found_and_storage_is_internal() {
    assert_eq!(user_error(UserError::NotFound, "ctx").status, StatusCode::NOT_FOUND);
    let api = user_error(UserError::Database(sqlx::Error::PoolTimedOut), "Failed to create user");
    assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(api.message, "Failed to create user");
}

#[test]
fn user_ids_must_be_uuids() {
    assert!(parse_user_id("7d444840-9dc0-11d1-b245-5ffdce74fad2").is_ok());
    let err = parse_user_id("42").unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
    assert_eq!(err.message, "Invalid user ID format");
}

#[test]
fn page_params_are_bounded() {
    assert!(page_params(PageParams { page: 1, size: 100 }).is_ok());
    assert_eq!(page_params(PageParams { page: 0, size: 10 }).unwrap_err().status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(page_params(PageParams { page: 1, size: 101 }).is_err());
}

#[tokio::test]
async fn admin_routes_require_a_token() {
    let addr = spawn_app(test_app_state()).await;
    let response = reqwest::get(format!("http://{addr}/api/v1/users/")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn registration_rejects_malformed_body() {
    let addr = spawn_app(test_app_state()).await;
    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/v1/users/register"))
        .json(&json!({ "email": "asha@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
}

// =============================================================================
// Live database
// =============================================================================

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn register_login_profile_and_delete() {
    use crate::state::test_helpers::{integration_pool, test_settings};

    let pool = integration_pool().await;
    let addr = spawn_app(AppState::new(pool, test_settings())).await;
    let client = reqwest::Client::new();
    let base = format!("http://{addr}/api/v1");

    let registered = client
        .post(format!("{base}/users/register"))
        .json(&json!({ "email": "asha@example.com", "username": "asha", "password": "correct-horse" }))
        .send()
        .await
        .unwrap();
    assert_eq!(registered.status(), reqwest::StatusCode::OK);

    let duplicate = client
        .post(format!("{base}/users/register"))
        .json(&json!({ "email": "asha@example.com", "username": "asha2", "password": "correct-horse" }))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), reqwest::StatusCode::BAD_REQUEST);

    let tokens: Value = client
        .post(format!("{base}/auth/login"))
        .form(&[("username", "asha"), ("password", "correct-horse")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let access = tokens["access_token"].as_str().unwrap().to_owned();

    let updated: Value = client
        .put(format!("{base}/users/me"))
        .bearer_auth(&access)
        .json(&json!({ "allergies": ["penicillin"] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["allergies"], json!(["penicillin"]));

    let forbidden = client.get(format!("{base}/users/")).bearer_auth(&access).send().await.unwrap();
    assert_eq!(forbidden.status(), reqwest::StatusCode::FORBIDDEN);

    let deleted: Value = client
        .delete(format!("{base}/users/me"))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(deleted["message"], "User account deleted successfully");

    let after = client.get(format!("{base}/users/me")).bearer_auth(&access).send().await.unwrap();
    assert_eq!(after.status(), reqwest::StatusCode::UNAUTHORIZED);
}
