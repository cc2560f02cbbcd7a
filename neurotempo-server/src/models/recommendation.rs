//! Recommendation result and song suggestions

use super::WaveSummary;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Target tempo
///
/// The weighted z-score mapping yields whole BPM, the calmness-sigmoid
/// mapping keeps two decimals. Serialized as a plain JSON number either way.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bpm {
    Whole(u32),
    Fractional(f64),
}

impl Bpm {
    pub fn value(self) -> f64 {
        match self {
            Bpm::Whole(v) => f64::from(v),
            Bpm::Fractional(v) => v,
        }
    }
}

impl fmt::Display for Bpm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bpm::Whole(v) => write!(f, "{}", v),
            Bpm::Fractional(v) => write!(f, "{:.2}", v),
        }
    }
}

/// One suggested song
///
/// Fields the generative service left out stay `None` and are omitted from
/// the response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Song {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_bpm",
        skip_serializing_if = "Option::is_none"
    )]
    pub bpm: Option<Bpm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
}

/// Accept `95`, `95.5` or `"95"`; anything else becomes absent
fn lenient_bpm<'de, D>(deserializer: D) -> Result<Option<Bpm>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => number_to_bpm(n.as_f64()?),
        Value::String(s) => number_to_bpm(s.trim().parse::<f64>().ok()?),
        _ => None,
    }))
}

fn number_to_bpm(raw: f64) -> Option<Bpm> {
    if !raw.is_finite() || raw <= 0.0 {
        return None;
    }
    if raw.fract() == 0.0 && raw <= f64::from(u32::MAX) {
        Some(Bpm::Whole(raw as u32))
    } else {
        Some(Bpm::Fractional(raw))
    }
}

/// Full recommendation payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub bpm: Bpm,
    pub genre: String,
    pub wave_data: WaveSummary,
    pub songs: Vec<Song>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bpm_serializes_as_plain_number() {
        assert_eq!(serde_json::to_string(&Bpm::Whole(120)).unwrap(), "120");
        assert_eq!(serde_json::to_string(&Bpm::Fractional(92.41)).unwrap(), "92.41");
        assert_eq!(Bpm::Fractional(92.4).to_string(), "92.40");
    }

    #[test]
    fn test_song_missing_fields_stay_absent() {
        let song: Song = serde_json::from_str(r#"{"title": "Weightless"}"#).unwrap();
        assert_eq!(song.title.as_deref(), Some("Weightless"));
        assert!(song.artist.is_none());

        let json = serde_json::to_value(&song).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_song_bpm_is_lenient() {
        let song: Song = serde_json::from_str(r#"{"bpm": "88"}"#).unwrap();
        assert_eq!(song.bpm, Some(Bpm::Whole(88)));

        let song: Song = serde_json::from_str(r#"{"bpm": 87.5}"#).unwrap();
        assert_eq!(song.bpm, Some(Bpm::Fractional(87.5)));

        let song: Song = serde_json::from_str(r#"{"bpm": "slow"}"#).unwrap();
        assert!(song.bpm.is_none());

        let song: Song = serde_json::from_str(r#"{"bpm": null}"#).unwrap();
        assert!(song.bpm.is_none());
    }
}
