use super::*;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

// =============================================================================
// sanitize_input / expand_abbreviations
// =============================================================================

#[test]
fn sanitize_strips_tags_and_controls() {
    assert_eq!(sanitize_input("  <b>headache</b>\u{0}\n "), "headache");
    assert_eq!(sanitize_input("<script>alert(1)</script>fever"), "alert(1)fever");
}

#[test]
fn sanitize_keeps_comparisons() {
    assert_eq!(sanitize_input("BP < 140 today"), "BP < 140 today");
}

#[test]
fn abbreviations_expand_whole_words_only() {
    assert_eq!(expand_abbreviations("High BP and hx of asthma"), "High blood pressure and history of asthma");
    assert_eq!(expand_abbreviations("bpm stays"), "bpm stays");
    assert_eq!(expand_abbreviations("low O2, temp high"), "low oxygen, temperature high");
}

// =============================================================================
// urgency / category / red flags
// =============================================================================

#[test]
fn urgency_tiers_in_order() {
    assert_eq!(urgency_level("crushing CHEST PAIN"), UrgencyLevel::Emergency);
    assert_eq!(urgency_level("high fever since yesterday"), UrgencyLevel::High);
    assert_eq!(urgency_level("mild fever"), UrgencyLevel::Medium);
    assert_eq!(urgency_level("itchy elbow"), UrgencyLevel::Low);
}

#[test]
fn emergency_beats_lower_tiers() {
    assert_eq!(urgency_level("fever and chest pain"), UrgencyLevel::Emergency);
}

#[test]
fn category_first_match_wins() {
    assert_eq!(categorize("shortness of breath"), SymptomCategory::Cardiovascular);
    assert_eq!(categorize("dry cough"), SymptomCategory::Respiratory);
    assert_eq!(categorize("bad migraine"), SymptomCategory::Neurological);
    assert_eq!(categorize("a stubbed toe"), SymptomCategory::General);
}

#[test]
fn red_flags_are_listed_in_table_order() {
    assert_eq!(red_flags("stroke symptoms and chest pain"), vec!["chest pain", "stroke"]);
    assert!(red_flags("sore throat").is_empty());
}

// =============================================================================
// symptom list / severity / temporal
// =============================================================================

#[test]
fn symptom_list_splits_on_separators_and_words() {
    assert_eq!(
        symptom_list("headache, nausea; dizziness and back pain plus fatigue"),
        vec!["headache", "nausea", "dizziness", "back pain", "fatigue"]
    );
}

#[test]
fn symptom_list_keeps_words_containing_and() {
    assert_eq!(symptom_list("hand swelling"), vec!["hand swelling"]);
}

#[test]
fn symptom_list_drops_short_fragments() {
    assert_eq!(symptom_list("ok, cough"), vec!["cough"]);
}

#[test]
fn severity_low_single_symptom() {
    let score = severity_score("itchy elbow");
    assert!((score - 0.25).abs() < 1e-6, "got {score}");
}

#[test]
fn severity_keyword_raises_floor() {
    let score = severity_score("excruciating knee");
    assert!((score - 0.95).abs() < 1e-6, "got {score}");
}

#[test]
fn severity_is_capped() {
    assert!((severity_score("chest pain, stroke, choking") - 1.0).abs() < f32::EPSILON);
}

#[test]
fn temporal_keywords_and_durations() {
    let patterns = temporal_patterns("Sudden headache for 3 days, intermittent");
    assert!(patterns.contains(&"acute onset".to_owned()));
    assert!(patterns.contains(&"comes and goes".to_owned()));
    assert!(patterns.contains(&"3 day(s) duration".to_owned()));
}

#[test]
fn duration_without_space_is_found() {
    assert_eq!(temporal_patterns("pain 2hours"), vec!["2 hour(s) duration"]);
}

#[test]
fn duration_mentioned_by_number_or_word() {
    assert!(duration_mentioned("cough 2 weeks"));
    assert!(duration_mentioned("ongoing cough"));
    assert!(!duration_mentioned("cough"));
}

#[test]
fn conditions_need_two_indicators() {
    assert_eq!(associated_conditions("joint pain and stiffness"), vec!["arthritis"]);
    assert!(associated_conditions("joint pain").is_empty());
}

#[test]
fn entities_carry_labels_and_offsets() {
    let entities = extract_entities("mild chest pain");
    let pain = entities.iter().find(|e| e.text == "pain").unwrap();
    assert_eq!(pain.label, "SYMPTOM");
    assert_eq!(pain.start_pos, 11);
    assert_eq!(pain.end_pos, 15);
    assert_eq!(pain.category, Some("symptom"));
    assert!(entities.iter().any(|e| e.label == "BODY_PART" && e.text == "chest"));
    assert!(entities.iter().any(|e| e.label == "SEVERITY" && e.text == "mild"));
}

// =============================================================================
// medications and history
// =============================================================================

#[test]
fn interactions_match_either_order() {
    let found = drug_interactions(&strings(&["Aspirin", "Warfarin"]));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].severity, "major");
    assert_eq!(found[0].description, "Increased bleeding risk");
    assert_eq!(found[0].drug_a, "aspirin");
}

#[test]
fn no_interactions_for_unrelated_drugs() {
    assert!(drug_interactions(&strings(&["ibuprofen", "metformin"])).is_empty());
}

#[test]
fn contraindications_are_deduplicated() {
    let found = contraindications(&strings(&["warfarin 5mg", "aspirin"]));
    assert_eq!(found.iter().filter(|c| **c == "active bleeding").count(), 1);
    assert!(found.contains(&"pregnancy"));
    assert!(found.contains(&"severe asthma"));
}

#[test]
fn risk_factors_from_urgency_flags_and_history() {
    let factors = risk_factors(UrgencyLevel::High, &["chest pain"], &strings(&["Type 2 Diabetes"]));
    assert_eq!(factors, vec!["High urgency symptoms", "Red flag symptoms present", "History of diabetes"]);
}

#[test]
fn follow_ups_end_with_general_advice() {
    let recs = follow_up_recommendations(UrgencyLevel::Low, false, false);
    assert_eq!(recs[0], "Monitor symptoms and consult if they persist");
    assert_eq!(recs.last(), Some(&"Practice healthy lifestyle habits"));
    assert_eq!(recs.len(), 5);
}

#[test]
fn follow_ups_include_interaction_advice() {
    let recs = follow_up_recommendations(UrgencyLevel::Emergency, true, true);
    assert!(recs.contains(&"Seek immediate emergency medical attention"));
    assert!(recs.contains(&"Discuss medication interactions with pharmacist"));
    assert!(recs.contains(&"Consider preventive measures"));
}

#[test]
fn confidence_is_capped() {
    assert!((confidence(0, false, false, false) - 0.7).abs() < 1e-6);
    assert!((confidence(10, true, true, true) - 1.0).abs() < f32::EPSILON);
}

// =============================================================================
// analyze
// =============================================================================

#[test]
fn analyze_aggregates_everything() {
    let report = analyze(
        &strings(&["chest pain", "shortness of breath for 2 hours"]),
        &strings(&["warfarin", "aspirin"]),
        &strings(&["hypertension"]),
    );
    assert_eq!(report.urgency_level, UrgencyLevel::Emergency);
    assert_eq!(report.category, SymptomCategory::Cardiovascular);
    assert_eq!(report.red_flags, vec!["chest pain"]);
    assert!(report.duration_mentioned);
    assert!(report.temporal_patterns.contains(&"2 hour(s) duration".to_owned()));
    assert_eq!(report.drug_interactions.len(), 1);
    assert!(report.risk_factors.contains(&"History of hypertension".to_owned()));
    assert!(report.recommendations.contains(&"Immediate medical attention required"));
    assert!(report.follow_up_recommendations.contains(&"Seek immediate emergency medical attention"));
    assert!(report.confidence > 0.9);
    assert!((report.severity_score - 1.0).abs() < f32::EPSILON);
}

#[test]
fn analyze_expands_abbreviations_before_matching() {
    let report = analyze(&strings(&["high bp", "headache", "dizziness"]), &[], &[]);
    assert!(report.associated_conditions.contains(&"hypertension"));
}

// =============================================================================
// masking / emergency data
// =============================================================================

#[test]
fn masks_email_phone_and_ssn() {
    let masked = mask_sensitive_data("mail jane.doe@example.com or call 555-123-4567, ssn 123-45-6789.");
    assert_eq!(masked, "mail [EMAIL_MASKED] or call [PHONE_MASKED], ssn [SSN_MASKED].");
}

#[test]
fn masking_leaves_short_numbers_alone() {
    assert_eq!(mask_sensitive_data("fever of 39 for 3 days"), "fever of 39 for 3 days");
}

#[test]
fn masks_spaced_phone_numbers() {
    assert_eq!(mask_sensitive_data("reach me at (555) 123 4567 today"), "reach me at [PHONE_MASKED] today");
}

#[test]
fn emergency_info_lists_reference_data() {
    let info = emergency_info();
    assert_eq!(info.red_flag_symptoms.len(), 10);
    assert_eq!(info.when_to_seek_immediate_care.len(), 5);
    assert_eq!(info.emergency_contacts.poison_control_us, Some("1-800-222-1222"));
    assert!(emergency_response().message.contains("911"));
    assert_eq!(emergency_response().urgency, UrgencyLevel::Emergency);
}
