//! Calmness and stress scoring
//!
//! Two named strategies with different aggregation conventions:
//! - Ratio: summed beta over summed gamma, classified into a stress level
//! - Calmness: weighted alpha and theta over beta, from normalized means
//!
//! Every returned number is finite.

use crate::models::{BandPowers, StressAssessment, StressLevel, StressType};
use crate::services::feature_extractor::ChannelSums;

/// Division guard for both ratio and calmness scores
pub const EPSILON: f64 = 1e-6;

/// Default alpha weight in the calmness numerator
pub const ALPHA_WEIGHT: f64 = 1.2;

/// Default theta weight in the calmness numerator
pub const THETA_WEIGHT: f64 = 0.8;

/// Ratio below this is `Low`
pub const LOW_STRESS_THRESHOLD: f64 = 0.8;

/// Ratio below this (and not Low) is `Moderate`
pub const MODERATE_STRESS_THRESHOLD: f64 = 1.5;

/// Replace NaN and infinities with 0.0
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Calmness numerator weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalmnessWeights {
    pub alpha: f64,
    pub theta: f64,
}

impl Default for CalmnessWeights {
    fn default() -> Self {
        Self {
            alpha: ALPHA_WEIGHT,
            theta: THETA_WEIGHT,
        }
    }
}

/// `(w_a * alpha + w_t * theta) / (beta + EPSILON)` over normalized means
pub fn calmness_score(normalized: &BandPowers, weights: &CalmnessWeights) -> f64 {
    let numerator = weights.alpha * normalized.alpha + weights.theta * normalized.theta;
    finite_or_zero(numerator / (normalized.beta + EPSILON))
}

/// `beta_sum / (gamma_sum + EPSILON)`
pub fn stress_ratio(beta_sum: f64, gamma_sum: f64) -> f64 {
    finite_or_zero(beta_sum / (gamma_sum + EPSILON))
}

pub fn classify_stress_level(score: f64) -> StressLevel {
    if score < LOW_STRESS_THRESHOLD {
        StressLevel::Low
    } else if score < MODERATE_STRESS_THRESHOLD {
        StressLevel::Moderate
    } else {
        StressLevel::High
    }
}

pub fn classify_stress_type(beta_sum: f64, gamma_sum: f64) -> StressType {
    if beta_sum > gamma_sum {
        StressType::HighWorkload
    } else {
        StressType::Relaxed
    }
}

/// Full ratio-strategy assessment
pub fn assess_stress(sums: &ChannelSums) -> StressAssessment {
    let beta_sum = finite_or_zero(sums.beta_sum);
    let gamma_sum = finite_or_zero(sums.gamma_sum);
    let stress_score = stress_ratio(beta_sum, gamma_sum);

    StressAssessment {
        stress_score,
        stress_level: classify_stress_level(stress_score),
        stress_type: classify_stress_type(beta_sum, gamma_sum),
        beta_sum,
        gamma_sum,
    }
}
