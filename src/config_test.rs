use std::collections::HashMap;

use super::*;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| map.get(key).cloned()
}

const REQUIRED: &[(&str, &str)] = &[("SECRET_KEY", "s3cret"), ("DATABASE_URL", "postgres://localhost/vaidya")];

#[test]
fn defaults_apply_when_only_required_vars_set() {
    let settings = Settings::from_lookup(lookup_from(REQUIRED)).unwrap();
    assert_eq!(settings.app_name, DEFAULT_APP_NAME);
    assert_eq!(settings.port, DEFAULT_PORT);
    assert_eq!(settings.api_v1_str, "/api/v1");
    assert_eq!(settings.access_token_expire_minutes, 30);
    assert_eq!(settings.refresh_token_expire_days, 7);
    assert_eq!(settings.openai_model, "gpt-4-turbo-preview");
    assert_eq!(settings.embedding_model, "text-embedding-3-small");
    assert_eq!(settings.db_max_connections, DEFAULT_DB_MAX_CONNECTIONS);
    assert_eq!(settings.chunk_size, 1000);
    assert_eq!(settings.chunk_overlap, 200);
    assert_eq!(settings.max_file_size, 10 * 1024 * 1024);
    assert_eq!(settings.rate_limit_requests, 100);
    assert_eq!(settings.rate_limit_window, Duration::from_secs(3600));
    assert_eq!(settings.cors_origins.len(), 4);
    assert!(!settings.debug);
}

#[test]
fn missing_secret_key_is_an_error() {
    let err = Settings::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://x")])).unwrap_err();
    assert_eq!(err, ConfigError::Missing("SECRET_KEY"));
}

#[test]
fn blank_database_url_counts_as_missing() {
    let err = Settings::from_lookup(lookup_from(&[("SECRET_KEY", "k"), ("DATABASE_URL", "  ")])).unwrap_err();
    assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
}

#[test]
fn overrides_are_parsed() {
    let mut pairs = REQUIRED.to_vec();
    pairs.extend_from_slice(&[
        ("DEBUG", "yes"),
        ("PORT", "9001"),
        ("API_V1_STR", "/api/v2/"),
        ("BACKEND_CORS_ORIGINS", "https://vaidya.example/, http://localhost:5173"),
        ("SIMILARITY_THRESHOLD", "0.55"),
        ("LOG_LEVEL", "DEBUG"),
    ]);
    let settings = Settings::from_lookup(lookup_from(&pairs)).unwrap();
    assert!(settings.debug);
    assert_eq!(settings.port, 9001);
    assert_eq!(settings.api_v1_str, "/api/v2");
    assert_eq!(settings.cors_origins, vec!["https://vaidya.example", "http://localhost:5173"]);
    assert!((settings.similarity_threshold - 0.55).abs() < f32::EPSILON);
    assert_eq!(settings.log_level, "debug");
}

#[test]
fn unparsable_numbers_fall_back_to_defaults() {
    let mut pairs = REQUIRED.to_vec();
    pairs.push(("PORT", "eighty"));
    let settings = Settings::from_lookup(lookup_from(&pairs)).unwrap();
    assert_eq!(settings.port, DEFAULT_PORT);
}

#[test]
fn db_max_connections_is_read_from_settings() {
    let mut pairs = REQUIRED.to_vec();
    pairs.push(("DB_MAX_CONNECTIONS", " 12 "));
    assert_eq!(Settings::from_lookup(lookup_from(&pairs)).unwrap().db_max_connections, 12);
}

#[test]
fn zero_db_connections_is_rejected() {
    let mut pairs = REQUIRED.to_vec();
    pairs.push(("DB_MAX_CONNECTIONS", "0"));
    let err = Settings::from_lookup(lookup_from(&pairs)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: "DB_MAX_CONNECTIONS", .. }));
}

#[test]
fn overlap_must_be_below_chunk_size() {
    let mut pairs = REQUIRED.to_vec();
    pairs.extend_from_slice(&[("CHUNK_SIZE", "100"), ("CHUNK_OVERLAP", "100")]);
    let err = Settings::from_lookup(lookup_from(&pairs)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: "CHUNK_OVERLAP", .. }));
}

#[test]
fn threshold_outside_unit_interval_is_rejected() {
    let mut pairs = REQUIRED.to_vec();
    pairs.push(("SIMILARITY_THRESHOLD", "1.5"));
    assert!(Settings::from_lookup(lookup_from(&pairs)).is_err());
}

#[test]
fn api_prefix_must_be_a_sub_path() {
    for prefix in ["/", "api/v1"] {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("API_V1_STR", prefix));
        let err = Settings::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "API_V1_STR", .. }), "{prefix}");
    }
}

#[test]
fn parse_bool_accepts_common_spellings() {
    assert_eq!(parse_bool("TRUE"), Some(true));
    assert_eq!(parse_bool(" off "), Some(false));
    assert_eq!(parse_bool("maybe"), None);
}
