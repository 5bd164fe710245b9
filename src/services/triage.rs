//! Rule-based symptom triage.
//!
//! DESIGN
//! ======
//! Pure keyword analysis with no I/O. Every check lowercases its input and
//! matches substrings against fixed tables, so results are deterministic and
//! cheap enough to run on every symptom request before the LLM is consulted.
//! The LLM narrative is layered on top by the RAG service; when the model is
//! unavailable these rule-based fields are the whole answer.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    Low,
    Medium,
    High,
    Emergency,
}

impl UrgencyLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Emergency => "emergency",
        }
    }

    fn base_severity(self) -> f32 {
        match self {
            Self::Low => 0.2,
            Self::Medium => 0.4,
            Self::High => 0.7,
            Self::Emergency => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymptomCategory {
    Cardiovascular,
    Respiratory,
    Neurological,
    Gastrointestinal,
    Musculoskeletal,
    Dermatological,
    Psychiatric,
    Infectious,
    General,
}

/// A keyword hit in free text, with byte offsets into the lowercased input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MedicalEntity {
    pub text: String,
    pub label: &'static str,
    pub confidence: f32,
    pub start_pos: usize,
    pub end_pos: usize,
    pub category: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrugInteraction {
    pub drug_a: String,
    pub drug_b: String,
    pub interaction_type: &'static str,
    pub severity: &'static str,
    pub description: &'static str,
    pub recommendations: Vec<&'static str>,
    pub clinical_significance: &'static str,
}

/// Full rule-based analysis of a symptom report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriageReport {
    pub symptoms: Vec<String>,
    pub urgency_level: UrgencyLevel,
    pub category: SymptomCategory,
    pub severity_score: f32,
    pub duration_mentioned: bool,
    pub temporal_patterns: Vec<String>,
    pub associated_conditions: Vec<&'static str>,
    pub red_flags: Vec<&'static str>,
    pub recommendations: Vec<&'static str>,
    pub entities: Vec<MedicalEntity>,
    pub drug_interactions: Vec<DrugInteraction>,
    pub risk_factors: Vec<String>,
    pub contraindications: Vec<&'static str>,
    pub follow_up_recommendations: Vec<&'static str>,
    pub confidence: f32,
}

// =============================================================================
// KEYWORD TABLES
// =============================================================================

const EMERGENCY_INDICATORS: &[&str] = &[
    "chest pain",
    "heart attack",
    "stroke",
    "unconscious",
    "severe bleeding",
    "can't breathe",
    "choking",
    "severe allergic reaction",
    "overdose",
];

const HIGH_URGENCY: &[&str] = &[
    "severe pain",
    "high fever",
    "vomiting blood",
    "difficulty breathing",
    "severe headache",
    "sudden weakness",
    "confusion",
];

const MEDIUM_URGENCY: &[&str] = &["fever", "persistent cough", "moderate pain", "rash", "nausea", "dizziness", "fatigue"];

const CATEGORY_PATTERNS: &[(SymptomCategory, &[&str])] = &[
    (
        SymptomCategory::Cardiovascular,
        &[
            "chest pain",
            "heart attack",
            "palpitations",
            "shortness of breath",
            "dizziness",
            "fainting",
            "high blood pressure",
            "low blood pressure",
            "irregular heartbeat",
            "chest tightness",
        ],
    ),
    (
        SymptomCategory::Respiratory,
        &[
            "cough",
            "wheeze",
            "difficulty breathing",
            "chest congestion",
            "asthma",
            "bronchitis",
            "pneumonia",
            "sore throat",
            "runny nose",
        ],
    ),
    (
        SymptomCategory::Neurological,
        &[
            "headache",
            "migraine",
            "seizure",
            "confusion",
            "memory loss",
            "tremor",
            "weakness",
            "stroke",
            "numbness",
            "tingling",
            "vision problems",
        ],
    ),
    (
        SymptomCategory::Gastrointestinal,
        &[
            "nausea",
            "vomiting",
            "diarrhea",
            "constipation",
            "stomach pain",
            "heartburn",
            "bloating",
            "gas",
            "loss of appetite",
            "weight loss",
            "blood in stool",
        ],
    ),
    (
        SymptomCategory::Musculoskeletal,
        &[
            "joint pain",
            "muscle pain",
            "back pain",
            "stiffness",
            "swelling",
            "arthritis",
            "fracture",
            "sprain",
            "strain",
            "limited mobility",
        ],
    ),
    (
        SymptomCategory::Dermatological,
        &[
            "rash",
            "itching",
            "redness",
            "skin lesion",
            "moles",
            "acne",
            "eczema",
            "psoriasis",
            "hives",
            "bruising",
            "wound",
            "burn",
        ],
    ),
    (
        SymptomCategory::Psychiatric,
        &[
            "anxiety",
            "depression",
            "mood swings",
            "panic attacks",
            "insomnia",
            "stress",
            "hallucinations",
            "delusions",
            "suicidal thoughts",
            "substance abuse",
        ],
    ),
    (
        SymptomCategory::Infectious,
        &[
            "fever",
            "chills",
            "sweating",
            "fatigue",
            "malaise",
            "body aches",
            "infection",
            "flu",
            "cold",
            "viral",
            "bacterial",
            "fungal",
            "parasitic",
        ],
    ),
];

pub const RED_FLAGS: &[&str] = &[
    "chest pain",
    "difficulty breathing",
    "severe headache",
    "sudden weakness",
    "unconscious",
    "severe bleeding",
    "suicide",
    "overdose",
    "heart attack",
    "stroke",
    "severe allergic reaction",
    "choking",
    "severe burn",
];

const SEVERITY_KEYWORDS: &[(&str, f32)] =
    &[("mild", 0.1), ("moderate", 0.3), ("severe", 0.7), ("excruciating", 0.9), ("unbearable", 1.0)];

const TEMPORAL_KEYWORDS: &[(&str, &str)] = &[
    ("acute", "sudden onset"),
    ("chronic", "long-term"),
    ("intermittent", "comes and goes"),
    ("persistent", "continuous"),
    ("recurring", "repeated episodes"),
    ("progressive", "worsening over time"),
    ("sudden", "acute onset"),
    ("gradual", "slow progression"),
];

const DURATION_UNITS: &[&str] = &["minute", "hour", "day", "week", "month", "year"];

const DURATION_WORDS: &[&str] = &["since", "for", "lasting", "ongoing", "chronic", "acute"];

const CONDITION_PATTERNS: &[(&str, &[&str])] = &[
    ("hypertension", &["high blood pressure", "headache", "dizziness"]),
    ("diabetes", &["frequent urination", "excessive thirst", "fatigue"]),
    ("migraine", &["severe headache", "nausea", "light sensitivity"]),
    ("asthma", &["wheezing", "shortness of breath", "chest tightness"]),
    ("arthritis", &["joint pain", "stiffness", "swelling"]),
    ("depression", &["sadness", "fatigue", "sleep problems"]),
    ("anxiety", &["worry", "panic", "rapid heartbeat"]),
];

const CATEGORY_RECOMMENDATIONS: &[(SymptomCategory, &[&str])] = &[
    (
        SymptomCategory::Cardiovascular,
        &[
            "Monitor blood pressure regularly",
            "Avoid strenuous activity if chest pain",
            "Keep nitroglycerin available if prescribed",
        ],
    ),
    (
        SymptomCategory::Respiratory,
        &["Use inhaler as prescribed", "Avoid respiratory irritants", "Monitor oxygen levels if available"],
    ),
    (
        SymptomCategory::Neurological,
        &[
            "Avoid driving if dizzy or confused",
            "Keep seizure medications available",
            "Monitor for changes in symptoms",
        ],
    ),
];

struct InteractionRule {
    drug_a: &'static str,
    drug_b: &'static str,
    severity: &'static str,
    description: &'static str,
    recommendations: &'static [&'static str],
}

const DRUG_INTERACTIONS: &[InteractionRule] = &[
    InteractionRule {
        drug_a: "warfarin",
        drug_b: "aspirin",
        severity: "major",
        description: "Increased bleeding risk",
        recommendations: &["Monitor INR closely", "Consider dose adjustment"],
    },
    InteractionRule {
        drug_a: "metformin",
        drug_b: "alcohol",
        severity: "moderate",
        description: "Increased risk of lactic acidosis",
        recommendations: &["Limit alcohol consumption", "Monitor for symptoms"],
    },
];

const CONTRAINDICATION_RULES: &[(&str, &[&str])] = &[
    ("warfarin", &["pregnancy", "severe liver disease", "active bleeding"]),
    ("aspirin", &["allergy to aspirin", "active bleeding", "severe asthma"]),
    ("metformin", &["kidney disease", "liver disease", "heart failure"]),
];

const ABBREVIATIONS: &[(&str, &str)] = &[
    ("bp", "blood pressure"),
    ("hr", "heart rate"),
    ("temp", "temperature"),
    ("rr", "respiratory rate"),
    ("o2", "oxygen"),
    ("dx", "diagnosis"),
    ("tx", "treatment"),
    ("hx", "history"),
    ("sx", "symptoms"),
    ("rx", "prescription"),
];

const HIGH_RISK_CONDITIONS: &[&str] =
    &["diabetes", "hypertension", "heart disease", "stroke", "cancer", "kidney disease", "liver disease"];

const ENTITY_PATTERNS: &[(&str, &[&str])] = &[
    (
        "SYMPTOM",
        &[
            "pain",
            "ache",
            "soreness",
            "discomfort",
            "burning",
            "stinging",
            "throbbing",
            "fever",
            "chills",
            "sweating",
            "nausea",
            "vomiting",
            "diarrhea",
            "constipation",
            "headache",
            "dizziness",
            "fatigue",
            "weakness",
            "numbness",
            "tingling",
            "cough",
            "wheeze",
            "shortness of breath",
            "chest tightness",
            "rash",
            "itching",
            "swelling",
            "redness",
            "bruising",
        ],
    ),
    (
        "BODY_PART",
        &[
            "head", "neck", "chest", "back", "stomach", "abdomen", "arm", "leg", "hand", "foot", "heart", "lung",
            "liver", "kidney", "brain", "muscle", "joint", "skin", "eye", "ear",
        ],
    ),
    ("SEVERITY", &["mild", "moderate", "severe", "excruciating", "unbearable", "slight", "getting worse", "improving"]),
];

const ENTITY_CATEGORIES: &[(&str, &[&str])] = &[
    ("symptom", &["pain", "ache", "fever", "nausea", "cough"]),
    ("body_part", &["head", "chest", "back", "stomach", "arm", "leg"]),
    ("duration", &["minute", "hour", "day", "week", "month", "year"]),
    ("severity", &["mild", "moderate", "severe", "acute", "chronic"]),
];

// =============================================================================
// INPUT CLEANUP
// =============================================================================

/// Strip markup and control characters, then trim.
///
/// A `<` only opens a tag when followed by a letter, `/` or `!`, so
/// comparisons such as "BP < 140" survive.
#[must_use]
pub fn sanitize_input(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for (i, &c) in chars.iter().enumerate() {
        if in_tag {
            in_tag = c != '>';
            continue;
        }
        let opens_tag = c == '<'
            && chars
                .get(i + 1)
                .is_some_and(|n| n.is_ascii_alphabetic() || matches!(n, '/' | '!'));
        if opens_tag {
            in_tag = true;
        } else if !is_control(c) {
            out.push(c);
        }
    }
    out.trim().to_owned()
}

fn is_control(c: char) -> bool {
    matches!(c as u32, 0x00..=0x1f | 0x7f..=0x9f)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Replace whole-word clinical abbreviations (case-insensitive).
#[must_use]
pub fn expand_abbreviations(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word = String::new();
    let flush = |word: &mut String, out: &mut String| {
        let lower = word.to_lowercase();
        match ABBREVIATIONS.iter().find(|(abbr, _)| *abbr == lower) {
            Some((_, full)) => out.push_str(full),
            None => out.push_str(word),
        }
        word.clear();
    };
    for c in text.chars() {
        if is_word_char(c) {
            word.push(c);
        } else {
            flush(&mut word, &mut out);
            out.push(c);
        }
    }
    flush(&mut word, &mut out);
    out
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// First matching tier wins: emergency, then high, then medium.
#[must_use]
pub fn urgency_level(text: &str) -> UrgencyLevel {
    let lower = text.to_lowercase();
    let hit = |list: &[&str]| list.iter().any(|k| lower.contains(k));
    if hit(EMERGENCY_INDICATORS) {
        UrgencyLevel::Emergency
    } else if hit(HIGH_URGENCY) {
        UrgencyLevel::High
    } else if hit(MEDIUM_URGENCY) {
        UrgencyLevel::Medium
    } else {
        UrgencyLevel::Low
    }
}

#[must_use]
pub fn categorize(text: &str) -> SymptomCategory {
    let lower = text.to_lowercase();
    CATEGORY_PATTERNS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map_or(SymptomCategory::General, |(category, _)| *category)
}

#[must_use]
pub fn red_flags(text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    RED_FLAGS.iter().copied().filter(|f| lower.contains(f)).collect()
}

/// Split a free-text report into individual symptoms on `,` `;` and the
/// words "and", "also", "plus". Fragments of two characters or fewer are dropped.
#[must_use]
pub fn symptom_list(text: &str) -> Vec<String> {
    let mut items = Vec::new();
    for part in text.split([',', ';']) {
        let mut current: Vec<&str> = Vec::new();
        for word in part.split_whitespace() {
            if matches!(word.to_lowercase().as_str(), "and" | "also" | "plus") {
                items.push(current.join(" "));
                current.clear();
            } else {
                current.push(word);
            }
        }
        items.push(current.join(" "));
    }
    items
        .into_iter()
        .filter(|s| s.chars().count() > 2)
        .collect()
}

#[must_use]
pub fn severity_score(text: &str) -> f32 {
    let lower = text.to_lowercase();
    let mut score = urgency_level(&lower).base_severity();
    for (keyword, value) in SEVERITY_KEYWORDS {
        if lower.contains(keyword) {
            score = score.max(*value);
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let count = symptom_list(text).len() as f32;
    score += (count * 0.05).min(0.2);
    #[allow(clippy::cast_precision_loss)]
    let flags = red_flags(&lower).len() as f32;
    score += flags * 0.2;
    score.min(1.0)
}

/// `(number, unit)` pairs such as "3 days" or "2hours".
fn durations(lower: &str) -> Vec<(String, &'static str)> {
    let bytes = lower.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        let number = &lower[start..i];
        let mut j = i;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if let Some(unit) = DURATION_UNITS.iter().find(|u| lower[j..].starts_with(*u)) {
            out.push((number.to_owned(), *unit));
            i = j + unit.len();
        }
    }
    out
}

#[must_use]
pub fn temporal_patterns(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut patterns: Vec<String> = TEMPORAL_KEYWORDS
        .iter()
        .filter(|(k, _)| lower.contains(k))
        .map(|(_, p)| (*p).to_owned())
        .collect();
    patterns.extend(
        durations(&lower)
            .into_iter()
            .map(|(n, unit)| format!("{n} {unit}(s) duration")),
    );
    patterns
}

#[must_use]
pub fn duration_mentioned(text: &str) -> bool {
    let lower = text.to_lowercase();
    !durations(&lower).is_empty() || DURATION_WORDS.iter().any(|w| lower.contains(w))
}

/// Conditions with at least two of their indicative symptoms present.
#[must_use]
pub fn associated_conditions(text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    CONDITION_PATTERNS
        .iter()
        .filter(|(_, patterns)| patterns.iter().filter(|p| lower.contains(*p)).count() >= 2)
        .map(|(condition, _)| *condition)
        .collect()
}

/// Keyword entities, in table order then position order.
#[must_use]
pub fn extract_entities(text: &str) -> Vec<MedicalEntity> {
    let lower = text.to_lowercase();
    let mut entities = Vec::new();
    for &(label, keywords) in ENTITY_PATTERNS {
        for keyword in keywords {
            for (start, matched) in lower.match_indices(*keyword) {
                entities.push(MedicalEntity {
                    text: matched.to_owned(),
                    label,
                    confidence: 0.7,
                    start_pos: start,
                    end_pos: start + matched.len(),
                    category: entity_category(matched),
                });
            }
        }
    }
    entities
}

fn entity_category(entity: &str) -> Option<&'static str> {
    let lower = entity.to_lowercase();
    ENTITY_CATEGORIES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(category, _)| *category)
}

// =============================================================================
// RECOMMENDATIONS
// =============================================================================

#[must_use]
pub fn symptom_recommendations(category: SymptomCategory, red_flags: &[&str]) -> Vec<&'static str> {
    let mut recs: Vec<&'static str> = CATEGORY_RECOMMENDATIONS
        .iter()
        .find(|(c, _)| *c == category)
        .map(|(_, r)| r.to_vec())
        .unwrap_or_default();
    if !red_flags.is_empty() {
        recs.push("Immediate medical attention required");
        recs.push("Do not delay seeking care");
    }
    recs
}

#[must_use]
pub fn follow_up_recommendations(
    urgency: UrgencyLevel,
    has_interactions: bool,
    has_risk_factors: bool,
) -> Vec<&'static str> {
    let mut recs = match urgency {
        UrgencyLevel::Emergency => {
            vec!["Seek immediate emergency medical attention", "Call emergency services if symptoms worsen"]
        }
        UrgencyLevel::High => vec!["Consult healthcare provider within 24 hours", "Monitor symptoms closely"],
        UrgencyLevel::Medium => vec!["Schedule appointment with healthcare provider", "Keep symptom diary"],
        UrgencyLevel::Low => vec!["Monitor symptoms and consult if they persist"],
    };
    if has_interactions {
        recs.push("Discuss medication interactions with pharmacist");
        recs.push("Review all medications with healthcare provider");
    }
    if has_risk_factors {
        recs.push("Discuss risk factors with healthcare provider");
        recs.push("Consider preventive measures");
    }
    recs.extend([
        "Follow up with healthcare provider as needed",
        "Maintain detailed symptom records",
        "Adhere to prescribed medications",
        "Practice healthy lifestyle habits",
    ]);
    recs
}

// =============================================================================
// MEDICATIONS AND HISTORY
// =============================================================================

/// Known interactions between every pair of medications, either order.
#[must_use]
pub fn drug_interactions(medications: &[String]) -> Vec<DrugInteraction> {
    let meds: Vec<String> = medications.iter().map(|m| m.trim().to_lowercase()).collect();
    let mut out = Vec::new();
    for (i, a) in meds.iter().enumerate() {
        for b in &meds[i + 1..] {
            let rule = DRUG_INTERACTIONS
                .iter()
                .find(|r| (r.drug_a == a.as_str() && r.drug_b == b.as_str()) || (r.drug_a == b.as_str() && r.drug_b == a.as_str()));
            if let Some(rule) = rule {
                out.push(DrugInteraction {
                    drug_a: a.clone(),
                    drug_b: b.clone(),
                    interaction_type: "drug-drug",
                    severity: rule.severity,
                    description: rule.description,
                    recommendations: rule.recommendations.to_vec(),
                    clinical_significance: "Monitor closely",
                });
            }
        }
    }
    out
}

/// Contraindications for any medication naming a known drug, deduplicated.
#[must_use]
pub fn contraindications(medications: &[String]) -> Vec<&'static str> {
    let mut found = BTreeSet::new();
    for med in medications {
        let lower = med.to_lowercase();
        for (drug, contras) in CONTRAINDICATION_RULES {
            if lower.contains(drug) {
                found.extend(contras.iter().copied());
            }
        }
    }
    found.into_iter().collect()
}

#[must_use]
pub fn risk_factors(urgency: UrgencyLevel, red_flags: &[&str], history: &[String]) -> Vec<String> {
    let mut factors = Vec::new();
    if urgency == UrgencyLevel::High {
        factors.push("High urgency symptoms".to_owned());
    }
    if !red_flags.is_empty() {
        factors.push("Red flag symptoms present".to_owned());
    }
    let history: Vec<String> = history.iter().map(|h| h.to_lowercase()).collect();
    for condition in HIGH_RISK_CONDITIONS {
        if history.iter().any(|h| h.contains(condition)) {
            factors.push(format!("History of {condition}"));
        }
    }
    factors
}

/// Confidence in the rule-based analysis: more evidence, more confidence.
#[must_use]
pub fn confidence(entity_count: usize, has_temporal: bool, has_red_flags: bool, has_interactions: bool) -> f32 {
    #[allow(clippy::cast_precision_loss)]
    let mut score = 0.7 + (entity_count as f32 * 0.05).min(0.2);
    if has_temporal {
        score += 0.1;
    }
    if has_red_flags {
        score += 0.1;
    }
    if has_interactions {
        score += 0.05;
    }
    score.min(1.0)
}

// =============================================================================
// ANALYSIS
// =============================================================================

#[must_use]
pub fn analyze(symptoms: &[String], medications: &[String], history: &[String]) -> TriageReport {
    let raw = symptoms.join(", ");
    let text = expand_abbreviations(&sanitize_input(&raw));

    let urgency_level = urgency_level(&text);
    let category = categorize(&text);
    let red_flags = red_flags(&text);
    let temporal_patterns = temporal_patterns(&text);
    let entities = extract_entities(&text);
    let drug_interactions = drug_interactions(medications);
    let risk_factors = risk_factors(urgency_level, &red_flags, history);
    let follow_up_recommendations =
        follow_up_recommendations(urgency_level, !drug_interactions.is_empty(), !risk_factors.is_empty());
    let confidence = confidence(
        entities.len(),
        !temporal_patterns.is_empty(),
        !red_flags.is_empty(),
        !drug_interactions.is_empty(),
    );

    TriageReport {
        symptoms: symptom_list(&text),
        urgency_level,
        category,
        severity_score: severity_score(&text),
        duration_mentioned: duration_mentioned(&text),
        associated_conditions: associated_conditions(&text),
        recommendations: symptom_recommendations(category, &red_flags),
        contraindications: contraindications(medications),
        temporal_patterns,
        red_flags,
        entities,
        drug_interactions,
        risk_factors,
        follow_up_recommendations,
        confidence,
    }
}

// =============================================================================
// LOG MASKING
// =============================================================================

/// Replace email addresses, SSNs, and phone numbers with placeholders.
#[must_use]
pub fn mask_sensitive_data(text: &str) -> String {
    let emails_masked: Vec<String> = text
        .split(' ')
        .map(|word| {
            let trimmed = word.trim_matches(|c: char| matches!(c, ',' | ';' | ':' | '(' | ')' | '<' | '>' | '"'));
            if looks_like_email(trimmed.trim_end_matches('.')) {
                word.replace(trimmed.trim_end_matches('.'), "[EMAIL_MASKED]")
            } else {
                word.to_owned()
            }
        })
        .collect();
    mask_numbers(&emails_masked.join(" "))
}

fn looks_like_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '%' | '+' | '-'));
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'));
    local_ok && host_ok && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
}

fn is_ssn(span: &str) -> bool {
    let parts: Vec<&str> = span.split('-').collect();
    parts.len() == 3
        && [3, 2, 4]
            .iter()
            .zip(&parts)
            .all(|(len, p)| p.len() == *len && p.chars().all(|c| c.is_ascii_digit()))
}

/// Mask runs of digits and phone separators: SSN shape first, then 7, 10 or 11 digit phones.
fn mask_numbers(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let starts_run = chars[i].is_ascii_digit() || matches!(chars[i], '+' | '(');
        let prev_is_word = i > 0 && is_word_char(chars[i - 1]);
        if !starts_run || prev_is_word {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let mut end = i;
        let mut last_digit = None;
        while end < chars.len() && (chars[end].is_ascii_digit() || matches!(chars[end], '(' | ')' | '-' | '.' | ' ' | '+')) {
            if chars[end].is_ascii_digit() {
                last_digit = Some(end);
            }
            end += 1;
        }
        let Some(last) = last_digit else {
            out.push(chars[i]);
            i += 1;
            continue;
        };
        let span: String = chars[i..=last].iter().collect();
        let digits = span.chars().filter(char::is_ascii_digit).count();
        let next_is_word = chars.get(last + 1).is_some_and(|c| is_word_char(*c));
        if !next_is_word && is_ssn(&span) {
            out.push_str("[SSN_MASKED]");
        } else if !next_is_word && matches!(digits, 7 | 10 | 11) {
            out.push_str("[PHONE_MASKED]");
        } else {
            out.push_str(&span);
        }
        i = last + 1;
    }
    out
}

// =============================================================================
// EMERGENCY REFERENCE DATA
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct EmergencyContacts {
    pub us: &'static str,
    pub uk: &'static str,
    pub eu: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poison_control_us: Option<&'static str>,
}

/// Banner attached to answers whose question reads as an emergency.
#[derive(Debug, Clone, Serialize)]
pub struct EmergencyResponse {
    pub message: &'static str,
    pub urgency: UrgencyLevel,
    pub action_required: &'static str,
    pub emergency_contacts: EmergencyContacts,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmergencyInfo {
    pub emergency_contacts: EmergencyContacts,
    pub red_flag_symptoms: &'static [&'static str],
    pub when_to_seek_immediate_care: &'static [&'static str],
    pub disclaimer: &'static str,
}

const EMERGENCY_MESSAGE: &str = "EMERGENCY DETECTED\n\nBased on your symptoms, you may need immediate medical \
attention. Please contact emergency services or visit the nearest emergency room immediately.\n\nEmergency \
Numbers:\n- US: 911\n- UK: 999\n- EU: 112\n\nIf you're experiencing a medical emergency, do not rely on this \
chatbot. Seek immediate professional medical help.";

const RED_FLAG_SYMPTOMS: &[&str] = &[
    "Severe chest pain or pressure",
    "Difficulty breathing or shortness of breath",
    "Signs of stroke (face drooping, arm weakness, speech difficulty)",
    "Severe allergic reaction (anaphylaxis)",
    "Severe bleeding that won't stop",
    "Severe abdominal pain",
    "High fever with neck stiffness",
    "Loss of consciousness",
    "Severe burns",
    "Thoughts of self-harm or suicide",
];

const WHEN_TO_SEEK_CARE: &[&str] = &[
    "Any life-threatening symptoms",
    "Severe pain that isn't improving",
    "High fever in infants under 3 months",
    "Severe dehydration",
    "Severe mental health crisis",
];

pub const EMERGENCY_DISCLAIMER: &str = "If you are experiencing a medical emergency, call emergency services \
immediately. Do not rely on this AI system for emergency medical advice.";

#[must_use]
pub fn emergency_response() -> EmergencyResponse {
    EmergencyResponse {
        message: EMERGENCY_MESSAGE,
        urgency: UrgencyLevel::Emergency,
        action_required: "immediate_medical_attention",
        emergency_contacts: EmergencyContacts { us: "911", uk: "999", eu: "112", poison_control_us: None },
    }
}

#[must_use]
pub fn emergency_info() -> EmergencyInfo {
    EmergencyInfo {
        emergency_contacts: EmergencyContacts {
            us: "911",
            uk: "999",
            eu: "112",
            poison_control_us: Some("1-800-222-1222"),
        },
        red_flag_symptoms: RED_FLAG_SYMPTOMS,
        when_to_seek_immediate_care: WHEN_TO_SEEK_CARE,
        disclaimer: EMERGENCY_DISCLAIMER,
    }
}

#[cfg(test)]
#[path = "triage_test.rs"]
mod tests;
