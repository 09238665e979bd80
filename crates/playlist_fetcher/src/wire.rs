//! Upstream `playlistItems` resource shapes.
//!
//! Reference: https://developers.google.com/youtube/v3/docs/playlistItems

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemListResponse {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub etag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_info: Option<PageInfo>,
    /// Absent when the upstream answers with something other than a list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<PlaylistItem>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub total_results: i32,
    pub results_per_page: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItem {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub etag: String,
    pub id: String,
    #[serde(default)]
    pub snippet: PlaylistItemSnippet,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaylistItemSnippet {
    pub published_at: String,
    pub channel_id: String,
    pub title: String,
    pub description: String,
    pub thumbnails: Thumbnails,
    pub channel_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_owner_channel_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_owner_channel_id: Option<String>,
    pub playlist_id: String,
    pub position: u32,
    pub resource_id: ResourceId,
}

/// Deleted and private videos come back with no thumbnails at all
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Thumbnails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Thumbnail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medium: Option<Thumbnail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<Thumbnail>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Thumbnail {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceId {
    pub kind: String,
    pub video_id: String,
}

/// Google API error envelope, `{"error": {"code": .., "message": ..}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub domain: String,
    pub reason: String,
    pub message: String,
}

impl From<PlaylistItem> for domain::VideoRecord {
    fn from(item: PlaylistItem) -> Self {
        let snippet = item.snippet;
        let channel_title = snippet
            .video_owner_channel_title
            .filter(|owner| !owner.is_empty())
            .unwrap_or(snippet.channel_title);
        let thumbnail_url = snippet
            .thumbnails
            .high
            .map(|t| t.url)
            .filter(|url| !url.is_empty());

        domain::VideoRecord {
            id: item.id,
            title: snippet.title,
            description: snippet.description,
            channel_title,
            thumbnail_url,
            position: snippet.position,
            resource: domain::ResourceRef {
                kind: snippet.resource_id.kind,
                video_id: snippet.resource_id.video_id,
            },
        }
    }
}
