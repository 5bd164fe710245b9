use super::*;
use std::sync::Arc;

use crate::state::test_helpers::{MockLlm, MockVectorStore, test_app_state, test_app_state_with_ai, vector_match};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

// =============================================================================
// prompt formatting
// =============================================================================

#[test]
fn context_without_docs_is_fixed_note() {
    assert_eq!(format_context(&[]), NO_CONTEXT);
}

#[test]
fn context_numbers_sources() {
    let docs = vec![vector_match("d1_0", 0.9, "d1"), vector_match("d2_0", 0.8, "d2")];
    assert_eq!(
        format_context(&docs),
        "Source 1: Guideline d1 (WHO)\nContent: Clinical guidance from d1.\n\n\
         Source 2: Guideline d2 (WHO)\nContent: Clinical guidance from d2."
    );
}

#[test]
fn history_lists_only_present_fields() {
    assert_eq!(format_history(&UserContext::default()), NO_HISTORY);
    let ctx = UserContext { medications: strings(&["metformin", "aspirin"]), ..UserContext::default() };
    assert_eq!(format_history(&ctx), "Current medications: metformin, aspirin");
}

#[test]
fn user_context_deserializes_partially() {
    let ctx: UserContext = serde_json::from_str(r#"{"allergies":["latex"]}"#).unwrap();
    assert_eq!(ctx.allergies, vec!["latex"]);
    assert!(ctx.medications.is_empty());
}

// =============================================================================
// parsing and scoring
// =============================================================================

#[test]
fn entities_split_on_commas() {
    assert_eq!(parse_entities(" fever, , cough "), vec!["fever", "cough"]);
    assert!(parse_entities("None").is_empty());
    assert!(parse_entities("  none ").is_empty());
}

#[test]
fn follow_ups_strip_numbering_and_cap_at_three() {
    let text = "1. What is the fever pattern?\n2) no question\n- How long has it lasted?\nStatement.\n3. Why now?\n4. Extra?";
    assert_eq!(
        parse_follow_ups(text),
        vec!["What is the fever pattern?", "How long has it lasted?", "Why now?"]
    );
}

#[test]
fn follow_ups_keep_each_line_whole() {
    let text = "1. Have you had a fever? When did it start?\n2. Any cough?\n3. Do you smoke?";
    assert_eq!(
        parse_follow_ups(text),
        vec!["Have you had a fever? When did it start?", "Any cough?", "Do you smoke?"]
    );
}

#[test]
fn confidence_without_docs_short_answer() {
    let score = confidence(&[], "Rest well.");
    assert!((score - 0.152).abs() < 1e-9, "got {score}");
}

#[test]
fn confidence_with_docs_and_consult_advice() {
    let answer = format!("{} please consult a doctor", "word ".repeat(60));
    let score = confidence(&[0.8, 1.0], &answer);
    assert!((score - 0.9).abs() < 1e-6, "got {score}");
}

#[test]
fn confidence_is_clamped() {
    assert!((confidence(&[0.1], "short") - 0.1).abs() < 1e-9);
    let long = format!("{} consult", "word ".repeat(400));
    assert!(confidence(&[1.0], &long) <= 0.95);
}

#[test]
fn source_json_carries_score() {
    let source = source_json(&vector_match("d1_0", 0.5, "d1"));
    assert_eq!(source["document_id"], "d1");
    assert!((source["score"].as_f64().unwrap() - 0.5).abs() < 1e-6);
}

// =============================================================================
// generate_medical_response
// =============================================================================

#[tokio::test]
async fn no_llm_returns_fallback() {
    let state = test_app_state();
    let response = generate_medical_response(&state, "What is a fever?", &UserContext::default()).await;
    assert_eq!(response.answer, FALLBACK_ANSWER);
    assert!(response.confidence.abs() < f64::EPSILON);
    assert!(response.sources.is_empty());
    assert_eq!(response.disclaimer, MEDICAL_DISCLAIMER);
}

#[tokio::test]
async fn full_pipeline_uses_retrieval_and_aux_calls() {
    let llm = Arc::new(MockLlm::with_replies(&[
        "  Rest and hydrate. Consult a doctor if it persists.  ",
        "fever, headache",
        "1. How high is the fever?\n2. Any rash?",
    ]));
    let store = Arc::new(MockVectorStore::with_matches(vec![vector_match("d1_0", 0.85, "d1")]));
    let state = test_app_state_with_ai(llm.clone(), store.clone());
    let ctx = UserContext { allergies: strings(&["penicillin"]), ..UserContext::default() };

    let response = generate_medical_response(&state, "I have a fever and headache", &ctx).await;

    assert_eq!(response.answer, "Rest and hydrate. Consult a doctor if it persists.");
    assert_eq!(response.medical_entities, vec!["fever", "headache"]);
    assert_eq!(response.follow_up_questions, vec!["How high is the fever?", "Any rash?"]);
    assert_eq!(response.sources.len(), 1);
    assert!((response.confidence - 0.68).abs() < 1e-6, "got {}", response.confidence);
    assert!(response.emergency.is_none());

    let requests = llm.requests();
    assert_eq!(requests.len(), 3);
    let main = &requests[0];
    assert_eq!(main.system, ANSWER_SYSTEM);
    assert_eq!(main.model.as_deref(), Some(state.settings.openai_model.as_str()));
    assert!((main.temperature - 0.3).abs() < f32::EPSILON);
    assert_eq!(main.max_tokens, 1000);
    assert_eq!(main.presence_penalty, Some(0.1));
    assert!(main.messages[0].content.contains("Source 1: Guideline d1 (WHO)"));
    assert!(main.messages[0].content.contains("Known allergies: penicillin"));
    assert_eq!(requests[1].model.as_deref(), Some(state.settings.auxiliary_model.as_str()));
    assert_eq!(requests[1].max_tokens, 200);
    assert_eq!(requests[2].max_tokens, 300);

    assert_eq!(store.last_query().map(|(k, _)| k), Some(state.settings.max_retrieval_results));
}

#[tokio::test]
async fn llm_failure_returns_fallback_with_emergency() {
    let llm = Arc::new(MockLlm::failing());
    let state = test_app_state_with_ai(llm, Arc::new(MockVectorStore::default()));
    let response = generate_medical_response(&state, "sudden chest pain", &UserContext::default()).await;
    assert_eq!(response.answer, FALLBACK_ANSWER);
    assert!(response.confidence.abs() < f64::EPSILON);
    let emergency = response.emergency.expect("emergency guidance");
    assert_eq!(emergency.urgency, UrgencyLevel::Emergency);
}

#[tokio::test]
async fn retrieval_failure_still_answers() {
    let llm = Arc::new(MockLlm::with_replies(&["Answer."]));
    let state = test_app_state_with_ai(llm.clone(), Arc::new(MockVectorStore::failing()));
    let response = generate_medical_response(&state, "What is asthma?", &UserContext::default()).await;
    assert_eq!(response.answer, "Answer.");
    assert!(response.sources.is_empty());
    assert!(llm.requests()[0].messages[0].content.contains(NO_CONTEXT));
}

#[tokio::test]
async fn low_scoring_matches_are_dropped() {
    let llm = Arc::new(MockLlm::default());
    let store = Arc::new(MockVectorStore::with_matches(vec![vector_match("d1_0", 0.5, "d1")]));
    let state = test_app_state_with_ai(llm, store);
    let response = generate_medical_response(&state, "What is asthma?", &UserContext::default()).await;
    assert!(response.sources.is_empty());
}

// =============================================================================
// analyze_symptoms
// =============================================================================

#[tokio::test]
async fn symptoms_without_llm_keep_rule_based_fields() {
    let state = test_app_state();
    let analysis = analyze_symptoms(&state, &strings(&["chest pain", "shortness of breath"]), &UserContext::default()).await;
    assert_eq!(analysis.urgency_level, UrgencyLevel::Emergency);
    assert!(analysis.red_flags.contains(&"chest pain"));
    assert!(analysis.recommendations.contains(&"Immediate medical attention required"));
    assert!(analysis.recommendations.contains(&"Seek immediate emergency medical attention"));
    assert_eq!(analysis.analysis, FALLBACK_ANALYSIS);
    assert!(analysis.confidence.abs() < f64::EPSILON);
    assert!(analysis.emergency.is_some());
}

#[tokio::test]
async fn symptoms_with_llm_use_narrative() {
    let llm = Arc::new(MockLlm::with_replies(&["Likely a tension headache. Consult your doctor."]));
    let store = Arc::new(MockVectorStore::with_matches(vec![vector_match("d1_0", 0.9, "d1")]));
    let state = test_app_state_with_ai(llm.clone(), store);
    let ctx = UserContext { medical_conditions: strings(&["hypertension"]), ..UserContext::default() };

    let analysis = analyze_symptoms(&state, &strings(&["<b>headache</b>", "  ", "dizziness"]), &ctx).await;

    assert_eq!(analysis.symptoms, vec!["headache", "dizziness"]);
    assert_eq!(analysis.analysis, "Likely a tension headache. Consult your doctor.");
    assert_eq!(analysis.sources.len(), 1);
    assert!(analysis.confidence > 0.0);

    let request = &llm.requests()[0];
    assert_eq!(request.system, SYMPTOM_SYSTEM);
    assert_eq!(request.max_tokens, 800);
    assert!((request.temperature - 0.2).abs() < f32::EPSILON);
    assert!(request.messages[0].content.contains("headache, dizziness"));
    assert!(request.messages[0].content.contains("Medical conditions: hypertension"));
}
