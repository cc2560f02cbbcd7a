//! Provider key resolution for neurotempo-server
//!
//! Keys resolve Database → ENV → TOML. A key found in more than one place is
//! logged as a warning and the highest tier wins.

use neurotempo_common::config::TomlConfig;
use neurotempo_common::{Error, Result};
use sqlx::{Pool, Sqlite};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const YOUTUBE_API_KEY_ENV: &str = "YOUTUBE_API_KEY";

/// Where a resolved key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Database,
    Environment,
    Toml,
}

impl KeySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeySource::Database => "database",
            KeySource::Environment => "environment",
            KeySource::Toml => "TOML",
        }
    }
}

/// Pick the first valid key in priority order
///
/// Warns when several tiers carry a valid key.
pub fn pick_key(
    label: &str,
    db_key: Option<String>,
    env_key: Option<String>,
    toml_key: Option<String>,
) -> Option<(String, KeySource)> {
    let candidates: Vec<(String, KeySource)> = [
        (db_key, KeySource::Database),
        (env_key, KeySource::Environment),
        (toml_key, KeySource::Toml),
    ]
    .into_iter()
    .filter_map(|(key, source)| key.filter(|k| is_valid_key(k)).map(|k| (k, source)))
    .collect();

    if candidates.len() > 1 {
        let sources: Vec<&str> = candidates.iter().map(|(_, s)| s.as_str()).collect();
        warn!(
            "{} found in multiple sources: {}. Using {} (highest priority).",
            label,
            sources.join(", "),
            sources[0]
        );
    }

    let picked = candidates.into_iter().next();
    match &picked {
        Some((_, source)) => info!("{} loaded from {}", label, source.as_str()),
        None => warn!("{} not configured", label),
    }
    picked
}

/// Resolve the Gemini API key; `None` leaves gateway calls unconfigured
pub async fn resolve_gemini_api_key(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
) -> Result<Option<String>> {
    let db_key = crate::db::settings::get_gemini_api_key(db).await?;
    let env_key = std::env::var(GEMINI_API_KEY_ENV).ok();
    Ok(pick_key("Gemini API key", db_key, env_key, toml_config.gemini_api_key.clone())
        .map(|(key, _)| key))
}

/// Resolve the YouTube Data API key; `None` selects placeholder lookups
pub async fn resolve_youtube_api_key(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
) -> Result<Option<String>> {
    let db_key = crate::db::settings::get_youtube_api_key(db).await?;
    let env_key = std::env::var(YOUTUBE_API_KEY_ENV).ok();
    Ok(pick_key("YouTube API key", db_key, env_key, toml_config.youtube_api_key.clone())
        .map(|(key, _)| key))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Copy settings into the TOML file
///
/// HashMap keys: "gemini_api_key", "youtube_api_key". A failed write is
/// logged and swallowed since the database already holds the value.
pub async fn sync_settings_to_toml(
    settings: HashMap<String, String>,
    toml_path: &Path,
) -> Result<()> {
    let mut config: TomlConfig = if toml_path.exists() {
        let content = std::fs::read_to_string(toml_path)
            .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?
    } else {
        TomlConfig::default()
    };

    if let Some(key) = settings.get(crate::db::settings::GEMINI_API_KEY) {
        config.gemini_api_key = Some(key.clone());
    }
    if let Some(key) = settings.get(crate::db::settings::YOUTUBE_API_KEY) {
        config.youtube_api_key = Some(key.clone());
    }

    match neurotempo_common::config::write_toml_config(&config, toml_path) {
        Ok(()) => {
            info!("Settings synced to TOML: {}", toml_path.display());
            Ok(())
        }
        Err(e) => {
            warn!("TOML write failed (database write succeeded): {}", e);
            Ok(())
        }
    }
}
