use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Thumbnail shown when a playlist item carries none (deleted or private videos)
pub const PLACEHOLDER_THUMBNAIL_URL: &str = "https://via.placeholder.com/300";

/// Reference to the video a playlist item points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    pub kind: String,
    pub video_id: String,
}

/// Represents one entry of a fetched playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    /// Playlist item id, unique within one fetch
    pub id: String,
    pub title: String,
    pub description: String,
    pub channel_title: String,
    pub thumbnail_url: Option<String>,
    pub position: u32,
    pub resource: ResourceRef,
}

impl VideoRecord {
    /// The id the embedded player is driven by
    pub fn video_id(&self) -> &str {
        &self.resource.video_id
    }

    /// Thumbnail URL, or the placeholder when the item has none
    pub fn thumbnail_or_placeholder(&self) -> &str {
        match self.thumbnail_url.as_deref() {
            Some(url) if !url.is_empty() => url,
            _ => PLACEHOLDER_THUMBNAIL_URL,
        }
    }
}

/// Ordered, non-empty list of records produced by one generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PlaylistSnapshot {
    records: Vec<VideoRecord>,
}

impl PlaylistSnapshot {
    /// Returns `None` for an empty list; an empty grid is never rendered
    pub fn new(records: Vec<VideoRecord>) -> Option<Self> {
        if records.is_empty() {
            None
        } else {
            Some(Self { records })
        }
    }

    pub fn first(&self) -> &VideoRecord {
        &self.records[0]
    }

    pub fn records(&self) -> &[VideoRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// A snapshot is never empty
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Find the record with playlist item id `item_id`
    pub fn find_by_id(&self, item_id: &str) -> Option<&VideoRecord> {
        self.records.iter().find(|r| r.id == item_id)
    }

    /// Find the first record whose resource points at `video_id`
    pub fn find_by_video_id(&self, video_id: &str) -> Option<&VideoRecord> {
        self.records.iter().find(|r| r.video_id() == video_id)
    }
}

/// Result of generating the playlist page data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistOutcome {
    Found(Arc<PlaylistSnapshot>),
    NotFound,
}

impl PlaylistOutcome {
    pub fn from_records(records: Vec<VideoRecord>) -> Self {
        match PlaylistSnapshot::new(records) {
            Some(snapshot) => Self::Found(Arc::new(snapshot)),
            None => Self::NotFound,
        }
    }

    pub fn snapshot(&self) -> Option<&Arc<PlaylistSnapshot>> {
        match self {
            Self::Found(snapshot) => Some(snapshot),
            Self::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, video_id: &str) -> VideoRecord {
        VideoRecord {
            id: format!("item-{video_id}"),
            title: title.to_string(),
            description: String::new(),
            channel_title: "Mock Channel".to_string(),
            thumbnail_url: None,
            position: 0,
            resource: ResourceRef {
                kind: "youtube#video".to_string(),
                video_id: video_id.to_string(),
            },
        }
    }

    #[test]
    fn empty_snapshot_is_rejected() {
        assert!(PlaylistSnapshot::new(Vec::new()).is_none());
        assert_eq!(PlaylistOutcome::from_records(Vec::new()), PlaylistOutcome::NotFound);
    }

    #[test]
    fn snapshot_keeps_order_and_finds_by_video_id() {
        let snapshot =
            PlaylistSnapshot::new(vec![record("A", "a1"), record("B", "b1"), record("C", "c1")])
                .unwrap();
        assert_eq!(snapshot.first().title, "A");
        let titles: Vec<_> = snapshot.records().iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["A", "B", "C"]);
        assert_eq!(snapshot.find_by_video_id("b1").unwrap().title, "B");
        assert!(snapshot.find_by_video_id("zzz").is_none());
    }

    #[test]
    fn repeated_video_is_told_apart_by_item_id() {
        let mut second = record("A again", "a1");
        second.id = "item-a1-2".to_string();
        let snapshot = PlaylistSnapshot::new(vec![record("A", "a1"), second]).unwrap();
        assert_eq!(snapshot.find_by_video_id("a1").unwrap().title, "A");
        assert_eq!(snapshot.find_by_id("item-a1-2").unwrap().title, "A again");
        assert_eq!(snapshot.find_by_id("item-a1").unwrap().title, "A");
        assert!(snapshot.find_by_id("a1").is_none());
    }

    #[test]
    fn missing_or_blank_thumbnail_falls_back_to_placeholder() {
        let mut r = record("A", "a1");
        assert_eq!(r.thumbnail_or_placeholder(), PLACEHOLDER_THUMBNAIL_URL);
        r.thumbnail_url = Some(String::new());
        assert_eq!(r.thumbnail_or_placeholder(), PLACEHOLDER_THUMBNAIL_URL);
        r.thumbnail_url = Some("https://i.ytimg.com/vi/a1/hqdefault.jpg".to_string());
        assert_eq!(r.thumbnail_or_placeholder(), "https://i.ytimg.com/vi/a1/hqdefault.jpg");
    }

    #[test]
    fn record_serializes_camel_case() {
        let value = serde_json::to_value(record("A", "a1")).unwrap();
        assert_eq!(value["channelTitle"], "Mock Channel");
        assert_eq!(value["resource"]["videoId"], "a1");
        assert!(value["thumbnailUrl"].is_null());
    }
}
