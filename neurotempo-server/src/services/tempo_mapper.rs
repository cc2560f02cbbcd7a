//! Score to tempo mapping
//!
//! Both mappings are logistic, monotonic increasing in their input and
//! clamped to their documented BPM domain.

use crate::models::{Band, BandPowers, Bpm};
use crate::services::score_engine::finite_or_zero;
use neurotempo_common::config::TempoStrategyName;

/// Weighted z-score domain
pub const ZSCORE_BPM_MIN: f64 = 60.0;
pub const ZSCORE_BPM_MAX: f64 = 180.0;

/// Calmness-sigmoid domain
pub const CALMNESS_BPM_MIN: f64 = 50.0;
pub const CALMNESS_BPM_MAX: f64 = 130.0;

/// Baseline value used for every band when no calibration exists
pub const DEFAULT_BASELINE: f64 = 20.0;

/// Calmness value mapped to the midpoint of the calmness domain
pub const CALMNESS_MIDPOINT: f64 = 1.0;

/// Tempo mapping selected by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TempoStrategy {
    #[default]
    CalmnessSigmoid,
    WeightedZscore,
}

impl From<TempoStrategyName> for TempoStrategy {
    fn from(name: TempoStrategyName) -> Self {
        match name {
            TempoStrategyName::CalmnessSigmoid => TempoStrategy::CalmnessSigmoid,
            TempoStrategyName::WeightedZscore => TempoStrategy::WeightedZscore,
        }
    }
}

/// Per-band weights of the z-score combination
///
/// Alpha is negative: more alpha means lower arousal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandWeights(pub BandPowers);

impl Default for BandWeights {
    fn default() -> Self {
        Self(BandPowers {
            delta: 0.2,
            theta: 0.2,
            alpha: -0.3,
            beta: 0.3,
            gamma: 0.2,
        })
    }
}

/// Per-band calibration baseline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline(pub BandPowers);

impl Default for Baseline {
    fn default() -> Self {
        Self(BandPowers::uniform(DEFAULT_BASELINE))
    }
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Weighted sum of `(value - baseline) / (baseline or 1)` over all bands
pub fn weighted_score(bands: &BandPowers, baseline: &Baseline, weights: &BandWeights) -> f64 {
    let score: f64 = Band::ALL
        .iter()
        .map(|&band| {
            let base = baseline.0.get(band);
            let divisor = if base == 0.0 { 1.0 } else { base };
            let z = (finite_or_zero(bands.get(band)) - base) / divisor;
            weights.0.get(band) * z
        })
        .sum();
    finite_or_zero(score)
}

/// Unrounded `60 + 120 / (1 + e^-score)`
pub fn zscore_bpm_raw(score: f64) -> f64 {
    let span = ZSCORE_BPM_MAX - ZSCORE_BPM_MIN;
    let bpm = ZSCORE_BPM_MIN + span * logistic(finite_or_zero(score));
    bpm.clamp(ZSCORE_BPM_MIN, ZSCORE_BPM_MAX)
}

/// Weighted z-score mapping, rounded to whole BPM
pub fn weighted_zscore_bpm(bands: &BandPowers, baseline: &Baseline, weights: &BandWeights) -> Bpm {
    let bpm = zscore_bpm_raw(weighted_score(bands, baseline, weights)).round();
    Bpm::Whole(bpm as u32)
}

/// Unrounded `50 + 80 / (1 + e^-(calmness - 1))`
pub fn calmness_bpm_raw(calmness: f64) -> f64 {
    let span = CALMNESS_BPM_MAX - CALMNESS_BPM_MIN;
    let scaled = logistic(finite_or_zero(calmness) - CALMNESS_MIDPOINT);
    (CALMNESS_BPM_MIN + span * scaled).clamp(CALMNESS_BPM_MIN, CALMNESS_BPM_MAX)
}

/// Calmness-sigmoid mapping, rounded to two decimals
pub fn calmness_sigmoid_bpm(calmness: f64) -> Bpm {
    Bpm::Fractional((calmness_bpm_raw(calmness) * 100.0).round() / 100.0)
}
