pub mod wire;

use std::time::Duration;

use async_trait::async_trait;
use domain::{PlaylistOutcome, VideoRecord};
use serde_json::Value;
use tracing::{debug, info};
use wire::{ErrorEnvelope, PlaylistItemListResponse};

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com";
pub const PLAYLIST_ITEMS_PATH: &str = "/youtube/v3/playlistItems";

/// Fixed page size; no pagination is followed
pub const MAX_RESULTS: u32 = 20;
pub const PART: &str = "snippet";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid playlist query: {0}")]
    InvalidQuery(&'static str),

    #[error("request to playlist upstream failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("playlist upstream answered {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("malformed playlist payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Identifies the playlist to fetch and the credentials to fetch it with
#[derive(Debug, Clone)]
pub struct PlaylistQuery {
    pub playlist_id: String,
    pub api_key: String,
}

impl PlaylistQuery {
    pub fn new(playlist_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            playlist_id: playlist_id.into(),
            api_key: api_key.into(),
        }
    }

    fn validate(&self) -> Result<(), FetchError> {
        if self.playlist_id.trim().is_empty() {
            return Err(FetchError::InvalidQuery("playlist id must not be empty"));
        }
        if self.api_key.trim().is_empty() {
            return Err(FetchError::InvalidQuery("api key must not be empty"));
        }
        Ok(())
    }
}

/// Source of playlist page data
/// This allows the page service to run against the real API or any other backend
#[async_trait]
pub trait PlaylistFetcher: Send + Sync {
    /// Perform one fetch; `NotFound` when the upstream yields no usable payload
    async fn fetch(&self) -> Result<PlaylistOutcome, FetchError>;
}

/// Fetches a playlist from the YouTube Data API
pub struct YouTubeFetcher {
    http: reqwest::Client,
    api_base: String,
    query: PlaylistQuery,
}

impl YouTubeFetcher {
    pub fn new(api_base: impl Into<String>, query: PlaylistQuery) -> Result<Self, FetchError> {
        query.validate()?;
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            query,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.api_base, PLAYLIST_ITEMS_PATH)
    }
}

#[async_trait]
impl PlaylistFetcher for YouTubeFetcher {
    async fn fetch(&self) -> Result<PlaylistOutcome, FetchError> {
        let max_results = MAX_RESULTS.to_string();
        let response = self
            .http
            .get(self.endpoint())
            .query(&[
                ("part", PART),
                ("maxResults", max_results.as_str()),
                ("playlistId", self.query.playlist_id.as_str()),
                ("key", self.query.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(FetchError::Upstream {
                status: status.as_u16(),
                message: upstream_message(&body),
            });
        }

        let outcome = classify_body(&body)?;
        match &outcome {
            PlaylistOutcome::Found(snapshot) => info!(
                playlist_id = %self.query.playlist_id,
                items = snapshot.len(),
                "fetched playlist"
            ),
            PlaylistOutcome::NotFound => info!(
                playlist_id = %self.query.playlist_id,
                "playlist upstream returned no usable payload"
            ),
        }
        Ok(outcome)
    }
}

/// Turn a successful upstream body into a page outcome
///
/// An empty body or a falsy JSON value (`null`, `false`, `0`, `""`) means not
/// found, as does a list without items. Anything that is not JSON is an error.
pub fn classify_body(body: &[u8]) -> Result<PlaylistOutcome, FetchError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        debug!("empty playlist body");
        return Ok(PlaylistOutcome::NotFound);
    }

    let value: Value = serde_json::from_slice(body)?;
    if is_falsy(&value) || !value.is_object() {
        return Ok(PlaylistOutcome::NotFound);
    }

    let list: PlaylistItemListResponse = serde_json::from_value(value)?;
    let records = list
        .items
        .unwrap_or_default()
        .into_iter()
        .map(VideoRecord::from)
        .collect();
    Ok(PlaylistOutcome::from_records(records))
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn upstream_message(body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => String::from_utf8_lossy(body).trim().chars().take(200).collect(),
    }
}
