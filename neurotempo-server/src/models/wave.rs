//! EEG band powers and the per-request wave summary

use serde::{Deserialize, Deserializer, Serialize};

/// Named EEG frequency band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    Delta,
    Theta,
    Alpha,
    Beta,
    Gamma,
}

impl Band {
    pub const ALL: [Band; 5] = [Band::Delta, Band::Theta, Band::Alpha, Band::Beta, Band::Gamma];

    /// Lowercase band name as it appears in column headers
    pub fn name(self) -> &'static str {
        match self {
            Band::Delta => "delta",
            Band::Theta => "theta",
            Band::Alpha => "alpha",
            Band::Beta => "beta",
            Band::Gamma => "gamma",
        }
    }
}

/// One value per band
///
/// Every band is always present; a band missing from the input, or sent as
/// `null`, deserializes to 0.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandPowers {
    #[serde(default, deserialize_with = "null_as_zero")]
    pub delta: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub theta: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub alpha: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub beta: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub gamma: f64,
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

impl BandPowers {
    /// Same value for every band
    pub fn uniform(value: f64) -> Self {
        Self {
            delta: value,
            theta: value,
            alpha: value,
            beta: value,
            gamma: value,
        }
    }

    pub fn get(&self, band: Band) -> f64 {
        match band {
            Band::Delta => self.delta,
            Band::Theta => self.theta,
            Band::Alpha => self.alpha,
            Band::Beta => self.beta,
            Band::Gamma => self.gamma,
        }
    }

    pub fn set(&mut self, band: Band, value: f64) {
        match band {
            Band::Delta => self.delta = value,
            Band::Theta => self.theta = value,
            Band::Alpha => self.alpha = value,
            Band::Beta => self.beta = value,
            Band::Gamma => self.gamma = value,
        }
    }
}

/// Per-band means plus the derived calmness score
///
/// `alpha_mean`, `beta_mean` and `theta_mean` are within [0, 1]. All fields
/// are finite. Built once per recommendation and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveSummary {
    pub alpha_mean: f64,
    pub beta_mean: f64,
    pub theta_mean: f64,
    pub delta_mean: f64,
    pub gamma_mean: f64,
    pub calmness_score: f64,
}

impl WaveSummary {
    /// Assemble from already-normalized band means
    pub fn from_normalized(bands: &BandPowers, calmness_score: f64) -> Self {
        Self {
            alpha_mean: bands.alpha,
            beta_mean: bands.beta,
            theta_mean: bands.theta,
            delta_mean: bands.delta,
            gamma_mean: bands.gamma,
            calmness_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_bands_deserialize_to_zero() {
        let bands: BandPowers = serde_json::from_str(r#"{"alpha": 0.4}"#).unwrap();
        assert_eq!(bands.alpha, 0.4);
        assert_eq!(bands.delta, 0.0);
        assert_eq!(bands.gamma, 0.0);
    }

    #[test]
    fn test_null_bands_deserialize_to_zero() {
        let bands: BandPowers =
            serde_json::from_str(r#"{"alpha": null, "beta": 20, "gamma": null}"#).unwrap();
        assert_eq!(bands.alpha, 0.0);
        assert_eq!(bands.beta, 20.0);
        assert_eq!(bands.gamma, 0.0);
    }

    #[test]
    fn test_get_set_cover_all_bands() {
        let mut bands = BandPowers::default();
        for (i, band) in Band::ALL.iter().enumerate() {
            bands.set(*band, i as f64);
        }
        for (i, band) in Band::ALL.iter().enumerate() {
            assert_eq!(bands.get(*band), i as f64);
        }
    }

    #[test]
    fn test_wave_summary_wire_names() {
        let summary = WaveSummary::from_normalized(&BandPowers::uniform(0.5), 2.0);
        let json = serde_json::to_value(summary).unwrap();
        for key in [
            "alpha_mean",
            "beta_mean",
            "theta_mean",
            "delta_mean",
            "gamma_mean",
            "calmness_score",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
    }
}
