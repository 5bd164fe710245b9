//! Retrieval-augmented medical answers.
//!
//! DESIGN
//! ======
//! A question flows through: knowledge retrieval, prompt assembly, the main
//! chat completion, then two cheap auxiliary completions (entity extraction
//! and follow-up questions) and a heuristic confidence score.
//!
//! Only the main completion is load-bearing. Retrieval failure degrades to an
//! empty context, auxiliary failures degrade to empty lists, and a main
//! completion failure (or no configured LLM) yields a fixed apology with
//! confidence 0. Callers therefore always get a well-formed response.
//!
//! Symptom analysis runs the rule-based triage first so urgency, red flags
//! and recommendations are present even when the LLM is unavailable.

use std::fmt::Write;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::MEDICAL_DISCLAIMER;
use crate::llm::LlmChat;
use crate::llm::types::ChatRequest;
use crate::services::audit;
use crate::services::triage::{self, EmergencyResponse, UrgencyLevel};
use crate::state::AppState;
use crate::vector::{self, VectorMatch};

pub const FALLBACK_ANSWER: &str = "I apologize, but I'm unable to process your medical question at the moment. \
     Please consult with a healthcare professional for medical advice.";
pub const FALLBACK_ANALYSIS: &str =
    "I'm unable to analyze these symptoms at the moment. Please consult with a healthcare professional.";

const NO_CONTEXT: &str = "No specific medical literature found for this query.";
const NO_HISTORY: &str = "No medical history provided.";

const ANSWER_SYSTEM: &str = "You are Vaidya, a knowledgeable and empathetic AI medical assistant.";
const ENTITY_SYSTEM: &str = "You are a medical entity extraction system. Extract only medical terms.";
const FOLLOW_UP_SYSTEM: &str = "Generate helpful medical follow-up questions.";
const SYMPTOM_SYSTEM: &str = "You are a medical AI providing symptom analysis for educational purposes.";

const MAX_FOLLOW_UPS: usize = 3;

// =============================================================================
// TYPES
// =============================================================================

/// The caller's stored medical history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserContext {
    pub medical_conditions: Vec<String>,
    pub medications: Vec<String>,
    pub allergies: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MedicalResponse {
    pub answer: String,
    pub confidence: f64,
    pub sources: Vec<Value>,
    pub medical_entities: Vec<String>,
    pub disclaimer: &'static str,
    pub follow_up_questions: Vec<String>,
    pub processing_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
    /// Present when the question itself reads as an emergency.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency: Option<EmergencyResponse>,
}

impl MedicalResponse {
    fn fallback(processing_time: f64) -> Self {
        Self {
            answer: FALLBACK_ANSWER.to_owned(),
            confidence: 0.0,
            sources: Vec::new(),
            medical_entities: Vec::new(),
            disclaimer: MEDICAL_DISCLAIMER,
            follow_up_questions: Vec::new(),
            processing_time,
            tokens_used: None,
            emergency: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SymptomAnalysis {
    pub symptoms: Vec<String>,
    pub possible_conditions: Vec<&'static str>,
    pub recommendations: Vec<&'static str>,
    pub urgency_level: UrgencyLevel,
    pub red_flags: Vec<&'static str>,
    pub analysis: String,
    pub confidence: f64,
    pub sources: Vec<Value>,
    pub disclaimer: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency: Option<EmergencyResponse>,
}

// =============================================================================
// PROMPTS
// =============================================================================

/// Numbered source blocks, or a fixed note when nothing was retrieved.
#[must_use]
pub fn format_context(docs: &[VectorMatch]) -> String {
    if docs.is_empty() {
        return NO_CONTEXT.to_owned();
    }
    let mut out = String::new();
    for (i, doc) in docs.iter().enumerate() {
        let title = if doc.title.is_empty() { "Unknown" } else { doc.title.as_str() };
        let _ = write!(out, "Source {}: {title}", i + 1);
        if !doc.source.is_empty() {
            let _ = write!(out, " ({})", doc.source);
        }
        let _ = writeln!(out, "\nContent: {}\n", doc.content);
    }
    out.trim_end().to_owned()
}

#[must_use]
pub fn format_history(ctx: &UserContext) -> String {
    let mut parts = Vec::new();
    if !ctx.medical_conditions.is_empty() {
        parts.push(format!("Medical conditions: {}", ctx.medical_conditions.join(", ")));
    }
    if !ctx.medications.is_empty() {
        parts.push(format!("Current medications: {}", ctx.medications.join(", ")));
    }
    if !ctx.allergies.is_empty() {
        parts.push(format!("Known allergies: {}", ctx.allergies.join(", ")));
    }
    if parts.is_empty() { NO_HISTORY.to_owned() } else { parts.join("\n") }
}

pub(crate) fn answer_prompt(question: &str, context: &str, history: &str) -> String {
    format!(
        "You are Vaidya, an AI medical assistant designed to provide accurate, helpful, and empathetic medical \
         information. You have access to authoritative medical literature and guidelines.

MEDICAL CONTEXT:
{context}

USER'S MEDICAL HISTORY:
{history}

USER'S QUESTION:
<user_input>{question}</user_input>

INSTRUCTIONS:
1. Provide accurate, evidence-based medical information
2. Use the provided context from medical literature
3. Consider the user's medical history if relevant
4. Be empathetic and supportive
5. Suggest when to seek professional medical care
6. Provide clear, understandable explanations

RESPONSE FORMAT:
- Answer the user's question directly and clearly
- Reference specific medical sources when applicable
- Suggest follow-up questions or next steps

IMPORTANT: This is for educational purposes only. Always recommend consulting with healthcare professionals \
for medical decisions.

Response:"
    )
}

pub(crate) fn symptom_prompt(symptoms: &str, context: &str, history: &str) -> String {
    format!(
        "You are analyzing symptoms to provide educational information about possible conditions.

SYMPTOMS REPORTED:
<user_input>{symptoms}</user_input>

MEDICAL LITERATURE CONTEXT:
{context}

USER'S MEDICAL HISTORY:
{history}

Provide a structured analysis including:
1. Possible conditions (with confidence levels)
2. Recommended actions
3. Urgency level (low/medium/high/emergency)
4. When to seek immediate care
5. General health recommendations

Remember: This is educational information only, not a medical diagnosis."
    )
}

// =============================================================================
// PARSING AND SCORING
// =============================================================================

/// Comma-separated entity list; "None" means empty.
#[must_use]
pub fn parse_entities(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("none") {
        return Vec::new();
    }
    text.split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Question lines from the reply, numbering stripped, at most three. Each
/// line is kept whole.
#[must_use]
pub fn parse_follow_ups(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.trim().trim_matches(|c: char| c.is_ascii_digit() || matches!(c, '.' | '-' | ' ')))
        .filter(|q| q.contains('?'))
        .map(ToOwned::to_owned)
        .take(MAX_FOLLOW_UPS)
        .collect()
}

/// Retrieval quality scaled by answer length and whether it advises consulting.
#[must_use]
pub fn confidence(doc_scores: &[f32], answer: &str) -> f64 {
    let base = if doc_scores.is_empty() {
        0.2
    } else {
        let sum: f64 = doc_scores.iter().map(|s| f64::from(*s)).sum();
        #[allow(clippy::cast_precision_loss)]
        let mean = sum / doc_scores.len() as f64;
        mean.min(0.9)
    };
    let words = answer.split_whitespace().count();
    let length_factor = if words < 50 {
        0.8
    } else if words > 300 {
        0.9
    } else {
        1.0
    };
    let disclaimer_factor = if answer.to_lowercase().contains("consult") { 1.0 } else { 0.95 };
    (base * length_factor * disclaimer_factor).clamp(0.1, 0.95)
}

/// Match metadata plus its similarity score, as returned to clients.
#[must_use]
pub fn source_json(doc: &VectorMatch) -> Value {
    let mut source = match &doc.metadata {
        Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    source.insert("score".into(), Value::from(f64::from(doc.score)));
    Value::Object(source)
}

// =============================================================================
// PIPELINE
// =============================================================================

/// Search the knowledge base. Any failure or missing backend yields no documents.
pub async fn retrieve(state: &AppState, query: &str) -> Vec<VectorMatch> {
    let (Some(store), Some(embedder)) = (state.vectors.as_deref(), state.embedder.as_deref()) else {
        return Vec::new();
    };
    match vector::search_medical_knowledge(
        store,
        embedder,
        query,
        state.settings.max_retrieval_results,
        &[],
        state.settings.similarity_threshold,
    )
    .await
    {
        Ok(docs) => docs,
        Err(e) => {
            warn!(error = %e, "rag: retrieval failed; answering without context");
            Vec::new()
        }
    }
}

async fn extract_entities(llm: &dyn LlmChat, model: &str, text: &str) -> Vec<String> {
    let prompt = format!(
        "Extract medical entities (symptoms, conditions, medications, anatomy) from this text:\n\n\"{text}\"\n\n\
         Return only the medical terms as a comma-separated list, or \"None\" if no medical entities found."
    );
    let request = ChatRequest::single(ENTITY_SYSTEM, prompt, 0.1, 200).with_model(model);
    match llm.chat(&request).await {
        Ok(response) => parse_entities(&response.text),
        Err(e) => {
            warn!(error = %e, "rag: entity extraction failed");
            Vec::new()
        }
    }
}

async fn follow_up_questions(llm: &dyn LlmChat, model: &str, question: &str, answer: &str) -> Vec<String> {
    let prompt = format!(
        "Based on this medical question and answer, suggest 3 relevant follow-up questions:\n\n\
         Question: {question}\nAnswer: {answer}\n\n\
         Generate questions that would help the user understand their condition better or provide more specific guidance."
    );
    let request = ChatRequest::single(FOLLOW_UP_SYSTEM, prompt, 0.4, 300).with_model(model);
    match llm.chat(&request).await {
        Ok(response) => parse_follow_ups(&response.text),
        Err(e) => {
            warn!(error = %e, "rag: follow-up generation failed");
            Vec::new()
        }
    }
}

fn emergency_for(text: &str) -> Option<EmergencyResponse> {
    (triage::urgency_level(text) == UrgencyLevel::Emergency).then(triage::emergency_response)
}

/// Answer a medical question. Never fails; see the module docs for degradation.
pub async fn generate_medical_response(state: &AppState, question: &str, ctx: &UserContext) -> MedicalResponse {
    let started = Instant::now();
    let emergency = emergency_for(question);
    let Some(llm) = state.llm.as_deref() else {
        warn!("rag: no LLM configured; returning fallback answer");
        return MedicalResponse { emergency, ..MedicalResponse::fallback(0.0) };
    };

    let docs = retrieve(state, question).await;
    let prompt = answer_prompt(question, &format_context(&docs), &format_history(ctx));
    let request = ChatRequest::single(ANSWER_SYSTEM, prompt, 0.3, 1000)
        .with_model(&state.settings.openai_model)
        .with_penalties(0.1, 0.1);

    let response = match llm.chat(&request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "rag: answer generation failed");
            let elapsed = started.elapsed().as_secs_f64();
            return MedicalResponse { emergency, ..MedicalResponse::fallback(elapsed) };
        }
    };
    let answer = response.text.trim().to_owned();

    let aux_model = state.settings.auxiliary_model.as_str();
    let medical_entities = extract_entities(llm, aux_model, question).await;
    let follow_up_questions = follow_up_questions(llm, aux_model, question, &answer).await;

    let scores: Vec<f32> = docs.iter().map(|d| d.score).collect();
    let confidence = confidence(&scores, &answer);
    let processing_time = started.elapsed().as_secs_f64();
    audit::record_metric_detached(&state.pool, audit::AI_RESPONSE_TIME, processing_time, "seconds");

    info!(
        sources = docs.len(),
        confidence,
        processing_time,
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        "rag: answer generated"
    );

    MedicalResponse {
        answer,
        confidence,
        sources: docs.iter().map(source_json).collect(),
        medical_entities,
        disclaimer: MEDICAL_DISCLAIMER,
        follow_up_questions,
        processing_time,
        tokens_used: Some(response.input_tokens + response.output_tokens),
        emergency,
    }
}

/// Rule-based triage plus a retrieval-grounded LLM narrative.
pub async fn analyze_symptoms(state: &AppState, symptoms: &[String], ctx: &UserContext) -> SymptomAnalysis {
    let started = Instant::now();
    let cleaned: Vec<String> = symptoms
        .iter()
        .map(|s| triage::sanitize_input(s))
        .filter(|s| !s.is_empty())
        .collect();
    let report = triage::analyze(&cleaned, &ctx.medications, &ctx.medical_conditions);

    let mut recommendations = report.recommendations.clone();
    for rec in &report.follow_up_recommendations {
        if !recommendations.contains(rec) {
            recommendations.push(*rec);
        }
    }

    let joined = cleaned.join(", ");
    let docs = retrieve(state, &format!("symptoms: {joined}")).await;

    let narrative = match state.llm.as_deref() {
        Some(llm) => {
            let prompt = symptom_prompt(&joined, &format_context(&docs), &format_history(ctx));
            let request = ChatRequest::single(SYMPTOM_SYSTEM, prompt, 0.2, 800).with_model(&state.settings.openai_model);
            match llm.chat(&request).await {
                Ok(response) => Some(response.text.trim().to_owned()),
                Err(e) => {
                    tracing::error!(error = %e, "rag: symptom analysis failed");
                    None
                }
            }
        }
        None => None,
    };

    let (analysis, confidence, sources) = match narrative {
        Some(text) => {
            let scores: Vec<f32> = docs.iter().map(|d| d.score).collect();
            let score = confidence(&scores, &text);
            (text, score, docs.iter().map(source_json).collect())
        }
        None => (FALLBACK_ANALYSIS.to_owned(), 0.0, Vec::new()),
    };

    let processing_time = started.elapsed().as_secs_f64();
    audit::record_metric_detached(&state.pool, audit::AI_RESPONSE_TIME, processing_time, "seconds");
    info!(
        symptoms = cleaned.len(),
        urgency = report.urgency_level.as_str(),
        red_flags = report.red_flags.len(),
        "rag: symptoms analyzed"
    );

    SymptomAnalysis {
        emergency: (report.urgency_level == UrgencyLevel::Emergency).then(triage::emergency_response),
        symptoms: cleaned,
        possible_conditions: report.associated_conditions,
        recommendations,
        urgency_level: report.urgency_level,
        red_flags: report.red_flags,
        analysis,
        confidence,
        sources,
        disclaimer: MEDICAL_DISCLAIMER,
    }
}

#[cfg(test)]
#[path = "rag_test.rs"]
mod tests;
