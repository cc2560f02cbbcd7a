//! Mental-state classification results

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classified affect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MentalStateKind {
    Relaxed,
    Focused,
    Creative,
    Balanced,
    Distressed,
    Unknown,
}

impl MentalStateKind {
    /// Parse a label from the generative model, case-insensitively
    ///
    /// Anything outside the known vocabulary is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "relaxed" => MentalStateKind::Relaxed,
            "focused" => MentalStateKind::Focused,
            "creative" => MentalStateKind::Creative,
            "balanced" => MentalStateKind::Balanced,
            "distressed" => MentalStateKind::Distressed,
            _ => MentalStateKind::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MentalStateKind::Relaxed => "Relaxed",
            MentalStateKind::Focused => "Focused",
            MentalStateKind::Creative => "Creative",
            MentalStateKind::Balanced => "Balanced",
            MentalStateKind::Distressed => "Distressed",
            MentalStateKind::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for MentalStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentalState {
    #[serde(rename = "type")]
    pub kind: MentalStateKind,
    /// 0-100
    pub confidence: u8,
    pub description: String,
    /// ISO-8601
    pub timestamp: String,
}

/// Reply to an analyze request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub mental_state: Option<MentalState>,
    pub analysis: String,
    pub confidence: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label() {
        assert_eq!(MentalStateKind::from_label("Relaxed"), MentalStateKind::Relaxed);
        assert_eq!(MentalStateKind::from_label(" focused "), MentalStateKind::Focused);
        assert_eq!(MentalStateKind::from_label("DISTRESSED"), MentalStateKind::Distressed);
        assert_eq!(MentalStateKind::from_label("euphoric"), MentalStateKind::Unknown);
        assert_eq!(MentalStateKind::from_label(""), MentalStateKind::Unknown);
    }

    #[test]
    fn test_analysis_result_wire_shape() {
        let result = AnalysisResult {
            mental_state: Some(MentalState {
                kind: MentalStateKind::Creative,
                confidence: 65,
                description: "playful".to_string(),
                timestamp: "2026-01-01T00:00:00.000Z".to_string(),
            }),
            analysis: "playful".to_string(),
            confidence: 65,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["mentalState"]["type"], "Creative");
        assert_eq!(json["mentalState"]["confidence"], 65);
        assert_eq!(json["analysis"], "playful");
        assert_eq!(json["confidence"], 65);
    }
}
