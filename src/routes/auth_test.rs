use super::*;
use crate::services::users::Role;
use crate::state::test_helpers::{sample_user, spawn_app, test_app_state};

fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        map.insert(*name, HeaderValue::from_str(value).unwrap());
    }
    map
}

// =============================================================================
// client_ip
// =============================================================================

#[test]
fn forwarded_for_uses_first_hop() {
    let h = headers(&[("x-forwarded-for", " 203.0.113.7 , 10.0.0.1"), ("x-real-ip", "10.0.0.2")]);
    assert_eq!(client_ip(&h).as_deref(), Some("203.0.113.7"));
}

#[test]
fn real_ip_is_the_fallback() {
    assert_eq!(client_ip(&headers(&[("x-real-ip", "10.0.0.2")])).as_deref(), Some("10.0.0.2"));
    assert_eq!(client_ip(&headers(&[("x-forwarded-for", "")])), None);
    assert_eq!(client_ip(&HeaderMap::new()), None);
}

// =============================================================================
// roles and error mapping
// =============================================================================

#[test]
fn admin_only_routes_reject_other_roles() {
    let admin = sample_user(Role::Admin);
    let doctor = sample_user(Role::Doctor);
    assert!(require_role(&admin, &[Role::Admin], "Not enough permissions").is_ok());
    let err = require_role(&doctor, &[Role::Admin], "Not enough permissions").unwrap_err();
    assert_eq!(err.status, StatusCode::FORBIDDEN);
    assert_eq!(err.message, "Not enough permissions");
}

#[test]
fn doctor_routes_admit_doctors_and_admins() {
    let allowed = [Role::Doctor, Role::Admin];
    assert!(require_role(&sample_user(Role::Doctor), &allowed, "Doctor privileges required").is_ok());
    assert!(require_role(&sample_user(Role::Admin), &allowed, "Doctor privileges required").is_ok());
    let err = require_role(&sample_user(Role::Patient), &allowed, "Doctor privileges required").unwrap_err();
    assert_eq!(err.message, "Doctor privileges required");
}

#[test]
fn auth_errors_map_to_statuses() {
    assert_eq!(auth_error(AuthError::InvalidCredentials).status, StatusCode::BAD_REQUEST);
    assert_eq!(auth_error(AuthError::InvalidToken).status, StatusCode::UNAUTHORIZED);
    assert_eq!(auth_error(AuthError::InvalidRefreshToken).status, StatusCode::UNAUTHORIZED);
    let inactive = auth_error(AuthError::Inactive);
    assert_eq!(inactive.status, StatusCode::UNAUTHORIZED);
    assert_eq!(inactive.message, "User account is disabled");
    let hash = auth_error(AuthError::Hash("boom".into()));
    assert_eq!(hash.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(hash.message, UNEXPECTED);
}

#[test]
fn bad_credentials_advertise_bearer_scheme() {
    let response = login_error(AuthError::InvalidCredentials);
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers().get(WWW_AUTHENTICATE).unwrap(), "Bearer");
    let response = login_error(AuthError::Hash("x".into()));
    assert!(response.headers().get(WWW_AUTHENTICATE).is_none());
}

#[test]
fn json_content_type_detection() {
    assert!(is_json(&headers(&[("content-type", "application/json; charset=utf-8")])));
    assert!(!is_json(&headers(&[("content-type", "application/x-www-form-urlencoded")])));
    assert!(!is_json(&HeaderMap::new()));
}

// =============================================================================
// Extractors over HTTP
// =============================================================================

#[tokio::test]
async fn missing_bearer_token_is_unauthorized() {
    let addr = spawn_app(test_app_state()).await;
    let response = reqwest::get(format!("http://{addr}/api/v1/users/me")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers().get("www-authenticate").unwrap(), "Bearer");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Not authenticated");
    assert_eq!(body["error"], "HTTP_ERROR");
}

#[tokio::test]
async fn malformed_token_fails_validation() {
    let addr = spawn_app(test_app_state()).await;
    let response = reqwest::Client::new()
        .get(format!("http://{addr}/api/v1/users/me"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Could not validate credentials");
}

#[tokio::test]
async fn login_requires_both_fields() {
    let addr = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();

    let json_response = client
        .post(format!("http://{addr}/api/v1/auth/login"))
        .json(&json!({ "username": "asha" }))
        .send()
        .await
        .unwrap();
    assert_eq!(json_response.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);

    let form_response = client
        .post(format!("http://{addr}/api/v1/auth/login"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("username=asha")
        .send()
        .await
        .unwrap();
    assert_eq!(form_response.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
}
