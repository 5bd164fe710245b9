use super::*;
use crate::state::test_helpers::test_settings;
use crate::vector::ChunkMetadata;

#[test]
fn config_requires_api_key() {
    let err = PineconeConfig::from_lookup(&test_settings(), |_| None).unwrap_err();
    assert!(matches!(err, VectorError::MissingConfig("PINECONE_API_KEY")));
}

#[test]
fn config_normalizes_host_and_reads_settings() {
    let settings = test_settings();
    let cfg = PineconeConfig::from_lookup(&settings, |key| match key {
        "PINECONE_API_KEY" => Some("pc-key".into()),
        "PINECONE_INDEX_HOST" => Some("vaidya-abc123.svc.us-east-1.pinecone.io/".into()),
        "PINECONE_ENVIRONMENT" => Some("us-east-1".into()),
        _ => None,
    })
    .unwrap();
    assert_eq!(cfg.index_host.as_deref(), Some("https://vaidya-abc123.svc.us-east-1.pinecone.io"));
    assert_eq!(cfg.index_name, settings.pinecone_index_name);
    assert_eq!(cfg.namespace, settings.pinecone_namespace);
    assert_eq!(cfg.environment.as_deref(), Some("us-east-1"));
}

#[test]
fn explicit_scheme_is_kept() {
    assert_eq!(normalize_host("http://localhost:5080"), "http://localhost:5080");
}

#[test]
fn upsert_body_carries_namespace_and_metadata() {
    let record = VectorRecord {
        id: "doc_0".into(),
        values: vec![0.1, 0.2],
        metadata: ChunkMetadata { document_id: "doc".into(), title: "Asthma".into(), ..ChunkMetadata::default() },
    };
    let body = upsert_body(&[record], "medical-docs");
    assert_eq!(body["namespace"], "medical-docs");
    assert_eq!(body["vectors"][0]["id"], "doc_0");
    assert_eq!(body["vectors"][0]["metadata"]["title"], "Asthma");
    assert_eq!(body["vectors"][0]["metadata"]["document_id"], "doc");
}

#[test]
fn query_body_omits_filter_when_absent() {
    let body = query_body(&[1.0], 5, None, "ns");
    assert_eq!(body["topK"], 5);
    assert_eq!(body["includeMetadata"], true);
    assert!(body.get("filter").is_none());
}

#[test]
fn query_body_includes_filter() {
    let filter = crate::vector::document_type_filter(&["textbook".into()]).unwrap();
    let body = query_body(&[1.0], 2, Some(&filter), "ns");
    assert_eq!(body["filter"]["document_type"]["$in"][0], "textbook");
}

#[test]
fn query_response_is_parsed_into_matches() {
    let body = json!({
        "matches": [
            { "id": "d_0", "score": 0.88, "metadata": { "content": "text", "title": "T", "document_id": "d" } },
            { "id": "d_1", "score": 0.5 }
        ],
        "namespace": "ns"
    });
    let matches = parse_query_response(&body).unwrap();
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].content, "text");
    assert_eq!(matches[0].document_id(), Some("d"));
    assert!((matches[1].score - 0.5).abs() < f32::EPSILON);
    assert!(matches[1].title.is_empty());
}

#[test]
fn query_response_without_matches_is_error() {
    assert!(matches!(parse_query_response(&json!({})), Err(VectorError::Parse(_))));
}

#[test]
fn stats_response_reads_namespace_count() {
    let body = json!({
        "namespaces": { "medical-docs": { "vectorCount": 42 }, "other": { "vectorCount": 8 } },
        "dimension": 1536,
        "indexFullness": 0.1,
        "totalVectorCount": 50
    });
    let stats = parse_stats_response(&body, "medical-docs");
    assert_eq!(stats.total_vectors, 50);
    assert_eq!(stats.namespace_vectors, 42);
    assert_eq!(stats.dimension, 1536);
    assert_eq!(stats.namespace, "medical-docs");
}

#[test]
fn stats_for_missing_namespace_is_zero() {
    let stats = parse_stats_response(&json!({ "totalVectorCount": 3 }), "medical-docs");
    assert_eq!(stats.namespace_vectors, 0);
    assert_eq!(stats.total_vectors, 3);
}
