//! YouTube Data API video lookup for recommended songs
//!
//! Without a key the client answers with a fixed placeholder video so the UI
//! keeps working in development.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

pub const YOUTUBE_SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";
pub const FALLBACK_VIDEO_ID: &str = "dQw4w9WgXcQ";
const FALLBACK_NOTE: &str = "Using fallback mode - no YouTube API key provided";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum YoutubeError {
    #[error("No YouTube video found for this song")]
    NotFound,

    #[error("Network error: {0}")]
    Request(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Lookup result as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoLookup {
    pub video_id: String,
    pub video_url: String,
    pub embed_url: String,
    pub title: String,
    pub thumbnail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl VideoLookup {
    fn for_id(video_id: &str, title: String, thumbnail: String) -> Self {
        Self {
            video_id: video_id.to_string(),
            video_url: format!("https://www.youtube.com/watch?v={}", video_id),
            embed_url: format!("https://www.youtube.com/embed/{}", video_id),
            title,
            thumbnail,
            note: None,
        }
    }

    /// Placeholder used when no key is configured
    pub fn fallback(title: &str, artist: &str) -> Self {
        let mut lookup = Self::for_id(
            FALLBACK_VIDEO_ID,
            format!("{} by {}", title, artist),
            format!("https://img.youtube.com/vi/{}/hqdefault.jpg", FALLBACK_VIDEO_ID),
        );
        lookup.note = Some(FALLBACK_NOTE.to_string());
        lookup
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

pub struct YoutubeClient {
    http_client: reqwest::Client,
    search_url: String,
    api_key: RwLock<Option<String>>,
}

impl YoutubeClient {
    pub fn new(api_key: Option<String>) -> Result<Self, YoutubeError> {
        Self::with_search_url(api_key, YOUTUBE_SEARCH_URL)
    }

    /// Client against a non-default search endpoint
    pub fn with_search_url(api_key: Option<String>, search_url: &str) -> Result<Self, YoutubeError> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| YoutubeError::Request(e.to_string()))?;

        Ok(Self {
            http_client,
            search_url: search_url.to_string(),
            api_key: RwLock::new(api_key.filter(|k| !k.trim().is_empty())),
        })
    }

    pub async fn set_api_key(&self, api_key: Option<String>) {
        let key = api_key.filter(|k| !k.trim().is_empty());
        info!(configured = key.is_some(), "YouTube API key updated");
        *self.api_key.write().await = key;
    }

    pub async fn is_configured(&self) -> bool {
        self.api_key.read().await.is_some()
    }

    /// Best matching official video for a song
    pub async fn lookup(&self, title: &str, artist: &str) -> Result<VideoLookup, YoutubeError> {
        let Some(api_key) = self.api_key.read().await.clone() else {
            debug!(title, artist, "No YouTube key, returning placeholder");
            return Ok(VideoLookup::fallback(title, artist));
        };

        let query = format!("{} {} official music video", title, artist);
        let response = self
            .http_client
            .get(&self.search_url)
            .query(&[
                ("q", query.as_str()),
                ("part", "snippet"),
                ("maxResults", "1"),
                ("type", "video"),
                ("key", api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| YoutubeError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(YoutubeError::Api(status.as_u16(), body));
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| YoutubeError::Parse(e.to_string()))?;

        let item = search.items.into_iter().next().ok_or(YoutubeError::NotFound)?;
        let video_id = item.id.video_id.ok_or(YoutubeError::NotFound)?;
        let thumbnail = item
            .snippet
            .thumbnails
            .high
            .or(item.snippet.thumbnails.default)
            .map(|t| t.url)
            .unwrap_or_else(|| format!("https://img.youtube.com/vi/{}/hqdefault.jpg", video_id));

        debug!(video_id = %video_id, "YouTube video found");
        Ok(VideoLookup::for_id(&video_id, item.snippet.title, thumbnail))
    }
}
