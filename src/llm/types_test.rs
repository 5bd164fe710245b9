use super::*;
use crate::error::ErrorCode;

#[test]
fn retryable_for_transport_and_server_errors() {
    assert!(LlmError::ApiRequest("timeout".into()).retryable());
    assert!(LlmError::ApiResponse { status: 429, body: String::new() }.retryable());
    assert!(LlmError::ApiResponse { status: 503, body: String::new() }.retryable());
}

#[test]
fn not_retryable_for_client_errors() {
    assert!(!LlmError::ApiResponse { status: 400, body: String::new() }.retryable());
    assert!(!LlmError::ApiParse("bad".into()).retryable());
    assert!(!LlmError::MissingApiKey { var: "OPENAI_API_KEY".into() }.retryable());
}

#[test]
fn error_codes_are_stable() {
    assert_eq!(LlmError::ConfigParse(String::new()).error_code(), "E_CONFIG_PARSE");
    assert_eq!(LlmError::HttpClientBuild(String::new()).error_code(), "E_HTTP_CLIENT_BUILD");
}

#[test]
fn single_request_builder() {
    let req = ChatRequest::single("sys", "hello", 0.3, 1000)
        .with_model("gpt-3.5-turbo")
        .with_penalties(0.1, 0.2);
    assert_eq!(req.system, "sys");
    assert_eq!(req.messages, vec![Message::user("hello")]);
    assert_eq!(req.model.as_deref(), Some("gpt-3.5-turbo"));
    assert_eq!(req.presence_penalty, Some(0.1));
    assert_eq!(req.frequency_penalty, Some(0.2));
    assert_eq!(req.max_tokens, 1000);
}

#[test]
fn message_roles() {
    assert_eq!(Message::user("q").role, "user");
    assert_eq!(Message::assistant("a").role, "assistant");
}
