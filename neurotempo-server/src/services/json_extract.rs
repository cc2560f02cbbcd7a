//! Pull a JSON value out of free-form model output
//!
//! Models wrap JSON in Markdown fences, prepend prose, or both. Lookup order:
//! 1. Body of the first ```` ```json ```` fence, else of the first bare ```` ``` ```` fence
//! 2. The whole trimmed reply
//! 3. The first `{` or `[` from which a complete JSON value parses
//!
//! The strict variants stop after step 2, so prose that merely mentions a
//! JSON snippet is not mistaken for a structured reply.
//!
//! Returns `None` instead of an error so callers can branch to a fallback.

use serde_json::Value;

/// Body between an opening marker and the next closing fence
fn fenced_body<'a>(text: &'a str, opening: &str) -> Option<&'a str> {
    let start = text.find(opening)? + opening.len();
    let rest = &text[start..];
    let end = rest.find("```").unwrap_or(rest.len());
    Some(rest[..end].trim())
}

/// First fenced block, preferring a `json`-tagged one
pub fn fenced_block(text: &str) -> Option<&str> {
    fenced_body(text, "```json")
        .or_else(|| fenced_body(text, "```JSON"))
        .or_else(|| fenced_body(text, "```"))
}

/// First complete JSON value starting at any `{` or `[`
fn first_embedded_value(text: &str) -> Option<Value> {
    text.char_indices()
        .filter(|(_, c)| *c == '{' || *c == '[')
        .find_map(|(i, _)| {
            serde_json::Deserializer::from_str(&text[i..])
                .into_iter::<Value>()
                .next()
                .and_then(Result::ok)
        })
}

/// Fenced body, else the whole trimmed reply
pub fn extract_json_strict(text: &str) -> Option<Value> {
    if let Some(body) = fenced_block(text) {
        if let Ok(value) = serde_json::from_str(body) {
            return Some(value);
        }
    }

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

/// Extract the first fenced, bare or embedded JSON value
pub fn extract_json(text: &str) -> Option<Value> {
    extract_json_strict(text).or_else(|| first_embedded_value(text.trim()))
}

fn into_object(value: Value) -> Option<serde_json::Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Extract a JSON object, ignoring arrays and scalars
pub fn extract_json_object(text: &str) -> Option<serde_json::Map<String, Value>> {
    extract_json(text).and_then(into_object)
}

/// Strict object extraction: no search inside surrounding prose
pub fn extract_json_object_strict(text: &str) -> Option<serde_json::Map<String, Value>> {
    extract_json_strict(text).and_then(into_object)
}
