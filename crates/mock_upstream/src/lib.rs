//! Stand-in for the YouTube `playlistItems` endpoint, plus a small control API
//! for shaping its answers during development and tests.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use playlist_fetcher::wire::{
    ErrorBody, ErrorDetail, ErrorEnvelope, PageInfo, PlaylistItem, PlaylistItemListResponse,
    PlaylistItemSnippet, ResourceId, Thumbnail, Thumbnails,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

pub const SEEDED_PLAYLIST_ID: &str = "PL-mock-1";

const DEFAULT_MAX_RESULTS: u32 = 5;
const MAX_MAX_RESULTS: u32 = 50;

#[derive(Debug, Default)]
struct MockPlaylist {
    items: Vec<PlaylistItem>,
    null_body: bool,
}

/// In-memory playlists served by the mock
#[derive(Default)]
pub struct MockPlaylists {
    playlists: RwLock<HashMap<String, MockPlaylist>>,
}

impl MockPlaylists {
    /// Create a store with the seeded dummy playlist
    pub fn new() -> Self {
        let store = Self::empty();
        store.populate_dummy_data();
        store
    }

    pub fn empty() -> Self {
        Self::default()
    }

    fn populate_dummy_data(&self) {
        let seeds = [
            ("dQw4w9WgXcQ", "Mock Video One", "First mock video in the playlist"),
            ("9bZkp7q19f0", "Mock Video Two", "Second mock video in the playlist"),
            ("kJQP7kiw5Fk", "Mock Video Three", "Third mock video in the playlist"),
        ];
        for (video_id, title, description) in seeds {
            self.add_item(
                SEEDED_PLAYLIST_ID,
                NewPlaylistItem {
                    id: None,
                    title: title.to_string(),
                    description: description.to_string(),
                    channel_title: "Mock Channel".to_string(),
                    video_owner_channel_title: Some("Mock Uploader".to_string()),
                    video_id: video_id.to_string(),
                    thumbnail_url: Some(format!("https://i.ytimg.com/vi/{video_id}/hqdefault.jpg")),
                },
            );
        }
    }

    /// Append an item, creating the playlist if needed; returns the item id
    pub fn add_item(&self, playlist_id: &str, new: NewPlaylistItem) -> String {
        let mut playlists = self
            .playlists
            .write()
            .expect("Failed to acquire write lock on playlists");
        let playlist = playlists.entry(playlist_id.to_string()).or_default();
        let position = playlist.items.len() as u32;
        let id = new
            .id
            .unwrap_or_else(|| format!("{playlist_id}-item-{position}"));

        playlist.items.push(PlaylistItem {
            kind: "youtube#playlistItem".to_string(),
            etag: format!("etag-{id}"),
            id: id.clone(),
            snippet: PlaylistItemSnippet {
                published_at: "2023-01-01T00:00:00Z".to_string(),
                channel_id: "channel-1".to_string(),
                title: new.title,
                description: new.description,
                thumbnails: Thumbnails {
                    high: new.thumbnail_url.map(|url| Thumbnail {
                        url,
                        width: 480,
                        height: 360,
                    }),
                    ..Default::default()
                },
                channel_title: new.channel_title,
                video_owner_channel_title: new.video_owner_channel_title,
                video_owner_channel_id: Some("owner-channel-1".to_string()),
                playlist_id: playlist_id.to_string(),
                position,
                resource_id: ResourceId {
                    kind: "youtube#video".to_string(),
                    video_id: new.video_id,
                },
            },
        });
        id
    }

    pub fn clear(&self, playlist_id: &str) {
        self.playlists
            .write()
            .expect("Failed to acquire write lock on playlists")
            .entry(playlist_id.to_string())
            .or_default()
            .items
            .clear();
    }

    /// Make the endpoint answer this playlist with a JSON `null` body
    pub fn set_null_body(&self, playlist_id: &str, enabled: bool) {
        self.playlists
            .write()
            .expect("Failed to acquire write lock on playlists")
            .entry(playlist_id.to_string())
            .or_default()
            .null_body = enabled;
    }
}

/// Item to append through the control API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlaylistItem {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub channel_title: String,
    #[serde(default)]
    pub video_owner_channel_title: Option<String>,
    pub video_id: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemsParams {
    #[serde(default)]
    pub part: String,
    pub playlist_id: Option<String>,
    pub max_results: Option<u32>,
    pub key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NullBodyRequest {
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub success: bool,
    pub message: String,
}

fn api_error(status: StatusCode, reason: &str, message: &str) -> Response {
    let envelope = ErrorEnvelope {
        error: ErrorBody {
            code: status.as_u16(),
            message: message.to_string(),
            errors: vec![ErrorDetail {
                domain: "youtube.playlistItem".to_string(),
                reason: reason.to_string(),
                message: message.to_string(),
            }],
        },
    };
    (status, Json(envelope)).into_response()
}

async fn playlist_items_list(
    State(store): State<Arc<MockPlaylists>>,
    Query(params): Query<PlaylistItemsParams>,
) -> Response {
    if params.key.as_deref().is_none_or(str::is_empty) {
        return api_error(
            StatusCode::BAD_REQUEST,
            "keyInvalid",
            "API key not valid. Please pass a valid API key.",
        );
    }
    if params.part.trim().is_empty() {
        return api_error(
            StatusCode::BAD_REQUEST,
            "required",
            "Required parameter: part",
        );
    }
    let Some(playlist_id) = params.playlist_id.filter(|id| !id.is_empty()) else {
        return api_error(
            StatusCode::BAD_REQUEST,
            "missingRequiredParameter",
            "No filter selected. Expected one of: id, playlistId",
        );
    };

    let playlists = store
        .playlists
        .read()
        .expect("Failed to acquire read lock on playlists");
    let Some(playlist) = playlists.get(&playlist_id) else {
        return api_error(
            StatusCode::NOT_FOUND,
            "playlistNotFound",
            "The playlist identified with the request's playlistId parameter cannot be found.",
        );
    };

    if playlist.null_body {
        debug!(%playlist_id, "answering with null body");
        return (StatusCode::OK, Json(serde_json::Value::Null)).into_response();
    }

    let max_results = params
        .max_results
        .unwrap_or(DEFAULT_MAX_RESULTS)
        .min(MAX_MAX_RESULTS);
    let items: Vec<PlaylistItem> = playlist
        .items
        .iter()
        .take(max_results as usize)
        .cloned()
        .collect();
    let has_more = playlist.items.len() > items.len();

    let response = PlaylistItemListResponse {
        kind: "youtube#playlistItemListResponse".to_string(),
        etag: format!("etag-{playlist_id}"),
        next_page_token: has_more.then(|| "mock-page-2".to_string()),
        page_info: Some(PageInfo {
            total_results: playlist.items.len() as i32,
            results_per_page: max_results as i32,
        }),
        items: Some(items),
    };

    (StatusCode::OK, Json(response)).into_response()
}

async fn add_playlist_item(
    State(store): State<Arc<MockPlaylists>>,
    Path(playlist_id): Path<String>,
    Json(request): Json<NewPlaylistItem>,
) -> impl IntoResponse {
    let id = store.add_item(&playlist_id, request);
    let response = ControlResponse {
        success: true,
        message: format!("Playlist item '{id}' created successfully"),
    };
    (StatusCode::CREATED, Json(response))
}

async fn clear_playlist_items(
    State(store): State<Arc<MockPlaylists>>,
    Path(playlist_id): Path<String>,
) -> impl IntoResponse {
    store.clear(&playlist_id);
    let response = ControlResponse {
        success: true,
        message: format!("Playlist '{playlist_id}' cleared"),
    };
    (StatusCode::OK, Json(response))
}

async fn set_null_body(
    State(store): State<Arc<MockPlaylists>>,
    Path(playlist_id): Path<String>,
    Json(request): Json<NullBodyRequest>,
) -> impl IntoResponse {
    store.set_null_body(&playlist_id, request.enabled);
    let response = ControlResponse {
        success: true,
        message: format!(
            "Null body {} for playlist '{playlist_id}'",
            if request.enabled { "enabled" } else { "disabled" }
        ),
    };
    (StatusCode::OK, Json(response))
}

/// Create the router for the mock upstream and its control API
pub fn create_router(store: Arc<MockPlaylists>) -> Router {
    Router::new()
        .route(playlist_fetcher::PLAYLIST_ITEMS_PATH, get(playlist_items_list))
        .route(
            "/control/playlists/{playlist_id}/items",
            post(add_playlist_item).delete(clear_playlist_items),
        )
        .route(
            "/control/playlists/{playlist_id}/null_body",
            post(set_null_body),
        )
        .with_state(store)
}
