//! Legacy beta/gamma stress assessment

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StressLevel {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StressType {
    #[serde(rename = "High mental workload / Anxiety")]
    HighWorkload,
    #[serde(rename = "Relaxed / Low stress")]
    Relaxed,
}

/// Ratio of summed beta to summed gamma power, classified
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StressAssessment {
    /// Unrounded internally; three decimals on the wire
    #[serde(serialize_with = "round_3dp")]
    pub stress_score: f64,
    pub stress_level: StressLevel,
    pub stress_type: StressType,
    pub beta_sum: f64,
    pub gamma_sum: f64,
}

fn round_3dp<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64((value * 1000.0).round() / 1000.0)
}
