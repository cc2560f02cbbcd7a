//! Genre and song prompts, and strict parsing of their replies

use crate::models::{Bpm, Song, WaveSummary};
use crate::services::json_extract::extract_json;
use serde_json::Value;

/// Ask for a single genre matching the tempo and band profile
pub fn genre_prompt(bpm: Bpm, wave: &WaveSummary) -> String {
    format!(
        "A listener's EEG recording shows these normalized band powers: \
         alpha {:.3}, beta {:.3}, theta {:.3}, delta {:.3}, gamma {:.3} \
         (calmness score {:.3}). The target tempo is {} BPM. \
         Name exactly one music genre that suits this state and tempo. \
         Reply with the genre name only, no extra words.",
        wave.alpha_mean,
        wave.beta_mean,
        wave.theta_mean,
        wave.delta_mean,
        wave.gamma_mean,
        wave.calmness_score,
        bpm
    )
}

/// First non-empty line with labels, quotes, emphasis and a final period removed
pub fn parse_genre(reply: &str) -> Option<String> {
    let line = reply.lines().map(str::trim).find(|l| !l.is_empty())?;
    let line = match line.split_once(':') {
        Some((label, rest)) if label.trim().eq_ignore_ascii_case("genre") => rest.trim(),
        _ => line,
    };
    let genre = line
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '*' | '`' | '.') || c.is_whitespace())
        .to_string();
    (!genre.is_empty()).then_some(genre)
}

/// Ask for a batch of songs as a JSON array
///
/// `exclude` lists songs already suggested by earlier batches.
pub fn songs_prompt(bpm: Bpm, genre: &str, count: usize, exclude: &[Song]) -> String {
    let mut prompt = format!(
        "List {} popular {} songs with a tempo around {} BPM. \
         Respond with only a JSON array of objects with the keys \
         \"title\", \"artist\", \"album\", \"bpm\" and \"genre\". \
         Leave out any key you are not sure about instead of guessing.",
        count, genre, bpm
    );

    let seen: Vec<String> = exclude
        .iter()
        .filter_map(|s| match (&s.title, &s.artist) {
            (Some(title), Some(artist)) => Some(format!("{} by {}", title, artist)),
            (Some(title), None) => Some(title.clone()),
            _ => None,
        })
        .collect();
    if !seen.is_empty() {
        prompt.push_str(" Do not repeat any of these: ");
        prompt.push_str(&seen.join("; "));
        prompt.push('.');
    }
    prompt
}

/// Song list from a reply; `Err` carries the reason for diagnostics
///
/// Accepts a JSON array of song objects or an object with a `songs` array,
/// fenced or bare.
pub fn parse_songs(reply: &str) -> Result<Vec<Song>, String> {
    let value = extract_json(reply).ok_or_else(|| "reply contains no JSON".to_string())?;
    let array = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("songs") {
            Some(Value::Array(items)) => items,
            _ => return Err("JSON object has no \"songs\" array".to_string()),
        },
        _ => return Err("JSON is neither an array nor an object".to_string()),
    };

    array
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            if !item.is_object() {
                return Err(format!("entry {} is not an object", i));
            }
            serde_json::from_value::<Song>(item).map_err(|e| format!("entry {}: {}", i, e))
        })
        .collect()
}
