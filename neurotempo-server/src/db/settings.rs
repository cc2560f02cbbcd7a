//! Settings database operations
//!
//! Key/value accessors over the `settings` table.

use neurotempo_common::{Error, Result};
use sqlx::{Pool, Sqlite};

pub const GEMINI_API_KEY: &str = "gemini_api_key";
pub const YOUTUBE_API_KEY: &str = "youtube_api_key";

/// Get Gemini API key from database
pub async fn get_gemini_api_key(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, GEMINI_API_KEY).await
}

pub async fn set_gemini_api_key(db: &Pool<Sqlite>, key: String) -> Result<()> {
    set_setting(db, GEMINI_API_KEY, key).await
}

/// Get YouTube Data API key from database
pub async fn get_youtube_api_key(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, YOUTUBE_API_KEY).await
}

pub async fn set_youtube_api_key(db: &Pool<Sqlite>, key: String) -> Result<()> {
    set_setting(db, YOUTUBE_API_KEY, key).await
}

/// Generic setting getter
///
/// NULL values read as unset.
pub async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row.and_then(|(value,)| value) {
        Some(value) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting {} failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Generic setting setter (upsert)
pub async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}
