pub mod render;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use datastore::{CacheStatus, RevalidatePolicy, Served, SnapshotCache};
use domain::{PlaylistOutcome, PlaylistSnapshot};
use futures::future::BoxFuture;
use playback::PlaybackSelector;
use playlist_fetcher::{FetchError, PlaylistFetcher};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

pub const CACHE_HEADER: &str = "x-cache";

/// Shared state for the page routes
#[derive(Clone)]
pub struct AppState {
    cache: Arc<SnapshotCache>,
    fetcher: Arc<dyn PlaylistFetcher>,
}

impl AppState {
    pub fn new(fetcher: Arc<dyn PlaylistFetcher>, policy: RevalidatePolicy) -> Self {
        Self {
            cache: Arc::new(SnapshotCache::new(policy)),
            fetcher,
        }
    }

    async fn load(&self) -> Result<Served, FetchError> {
        let fetcher = Arc::clone(&self.fetcher);
        self.cache
            .get_or_generate(move || -> BoxFuture<'static, Result<PlaylistOutcome, FetchError>> {
                let fetcher = Arc::clone(&fetcher);
                Box::pin(async move { fetcher.fetch().await })
            })
            .await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("failed to generate playlist page: {0}")]
    Fetch(#[from] FetchError),
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        error!(error = %self, "page generation failed");
        (StatusCode::BAD_GATEWAY, "Failed to load playlist").into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    /// Playlist item id of the card that was clicked
    #[serde(default)]
    pub item: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlayerParams {
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub autoplay: bool,
}

/// Props handed to the page: `{ data, revalidate }`
#[derive(Debug, Serialize)]
pub struct PlaylistProps<'a> {
    pub data: &'a PlaylistSnapshot,
    pub revalidate: u64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn with_cache_status(status: CacheStatus, response: impl IntoResponse) -> Response {
    ([(CACHE_HEADER, status.as_str())], response).into_response()
}

fn found(outcome: &PlaylistOutcome) -> Option<Arc<PlaylistSnapshot>> {
    outcome.snapshot().map(Arc::clone)
}

/// Server render pass of the playlist page
async fn page(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Response, PageError> {
    let served = state.load().await?;
    let Some(snapshot) = found(&served.outcome) else {
        return Ok(with_cache_status(
            served.status,
            (StatusCode::NOT_FOUND, Html(render::not_found())),
        ));
    };

    let mut selector = PlaybackSelector::new(snapshot);
    if let Some(item_id) = params.item.as_deref() {
        selector.select_by_item_id(item_id);
    }
    debug!(cache = served.status.as_str(), current = selector.current().video_id(), "rendering page");

    Ok(with_cache_status(served.status, Html(render::page(&mut selector))))
}

/// Client render pass: the player fragment for the current selection
async fn player(
    State(state): State<AppState>,
    Query(params): Query<PlayerParams>,
) -> Result<Response, PageError> {
    let served = state.load().await?;
    let Some(snapshot) = found(&served.outcome) else {
        return Ok(with_cache_status(
            served.status,
            (StatusCode::NOT_FOUND, Html(render::not_found())),
        ));
    };

    let mut selector = PlaybackSelector::new(snapshot);
    selector.mark_ready();
    selector.restore(params.item.as_deref(), params.autoplay);

    let fragment = selector
        .player()
        .map(|config| render::player(&config))
        .unwrap_or_default();
    Ok(with_cache_status(served.status, Html(fragment)))
}

/// Page props as JSON
async fn playlist_props(State(state): State<AppState>) -> Result<Response, PageError> {
    let served = state.load().await?;
    let revalidate = state.cache.policy().revalidate_after.as_secs();

    let response = match served.outcome.snapshot() {
        Some(snapshot) => Json(PlaylistProps {
            data: snapshot,
            revalidate,
        })
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "not_found".to_string(),
            }),
        )
            .into_response(),
    };
    Ok(with_cache_status(served.status, response))
}

/// Create the route table for the playlist page
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(page))
        .route("/player", get(player))
        .route("/api/playlist", get(playlist_props))
        .with_state(state)
}
