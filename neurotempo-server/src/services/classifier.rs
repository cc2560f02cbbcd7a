//! Mental-state classification prompt and reply interpretation
//!
//! A reply is first read as a JSON object (`mentalState`, `confidence`,
//! `analysis`). When that fails for any reason, a keyword scan of the raw
//! text decides the state. The keyword path always produces a result.

use crate::models::MentalStateKind;
use crate::services::json_extract::extract_json_object_strict;
use serde_json::Value;

/// Instruction sent ahead of every analyzed input
pub const CLASSIFICATION_PROMPT: &str = "You are a healthcare professional. \
Analyze the following input for any signs of distress, mental health conditions, or stress. \
Respond with a JSON object containing 'mentalState' (one of: 'Relaxed', 'Focused', 'Creative', 'Balanced', 'Distressed'), \
'confidence' (a number from 0-100), and 'analysis' (your detailed observations and recommendations).";

pub const DEFAULT_CONFIDENCE: u8 = 50;
pub const DEFAULT_DESCRIPTION: &str = "No analysis available";

/// Fallback descriptions keep this many characters of the raw reply
pub const DESCRIPTION_CHAR_LIMIT: usize = 200;

/// Keyword groups in precedence order
const KEYWORD_RULES: &[(&[&str], MentalStateKind, u8)] = &[
    (&["stress", "anxiety", "distress"], MentalStateKind::Distressed, 75),
    (&["calm", "relax"], MentalStateKind::Relaxed, 80),
    (&["focus", "concentrat"], MentalStateKind::Focused, 70),
    (&["creativ", "imagin"], MentalStateKind::Creative, 65),
];

/// Which path produced a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsePath {
    Structured,
    Keyword,
}

/// Interpreted reply, before it is timestamped into a `MentalState`
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub kind: MentalStateKind,
    pub confidence: u8,
    pub description: String,
    pub analysis: String,
    pub path: ParsePath,
}

/// Full prompt for an analyze call
pub fn build_prompt(text: Option<&str>) -> String {
    match text.map(str::trim).filter(|t| !t.is_empty()) {
        Some(text) => format!("{}\n\nUser's text: {}", CLASSIFICATION_PROMPT, text),
        None => CLASSIFICATION_PROMPT.to_string(),
    }
}

/// Number or numeric string, rounded and clamped to 0-100
fn parse_confidence(value: Option<&Value>) -> u8 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    match raw {
        Some(v) if v.is_finite() => v.round().clamp(0.0, 100.0) as u8,
        _ => DEFAULT_CONFIDENCE,
    }
}

/// Structured path; `None` unless the fenced body or the whole reply is a JSON object
pub fn parse_structured(reply: &str) -> Option<Classification> {
    let object = extract_json_object_strict(reply)?;

    let kind = object
        .get("mentalState")
        .and_then(Value::as_str)
        .map(MentalStateKind::from_label)
        .unwrap_or(MentalStateKind::Unknown);
    let confidence = parse_confidence(object.get("confidence"));
    let analysis = object.get("analysis").and_then(Value::as_str);

    Some(Classification {
        kind,
        confidence,
        description: analysis.unwrap_or(DEFAULT_DESCRIPTION).to_string(),
        analysis: analysis.unwrap_or_default().to_string(),
        path: ParsePath::Structured,
    })
}

/// First `DESCRIPTION_CHAR_LIMIT` characters plus `...`
pub fn truncate_description(text: &str) -> String {
    let mut truncated: String = text.chars().take(DESCRIPTION_CHAR_LIMIT).collect();
    truncated.push_str("...");
    truncated
}

/// Keyword path over the raw reply
pub fn classify_by_keywords(reply: &str) -> Classification {
    let lowered = reply.to_lowercase();
    let (kind, confidence) = KEYWORD_RULES
        .iter()
        .find(|(keywords, _, _)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(_, kind, confidence)| (*kind, *confidence))
        .unwrap_or((MentalStateKind::Balanced, DEFAULT_CONFIDENCE));

    Classification {
        kind,
        confidence,
        description: truncate_description(reply),
        analysis: reply.to_string(),
        path: ParsePath::Keyword,
    }
}

/// Structured path with keyword fallback
pub fn classify_reply(reply: &str) -> Classification {
    parse_structured(reply).unwrap_or_else(|| classify_by_keywords(reply))
}
