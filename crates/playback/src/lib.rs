use std::sync::Arc;

use domain::{PlaylistSnapshot, VideoRecord};
use serde::Serialize;
use tracing::debug;

/// Scroll offset that brings the player, rendered above the grid, into view
pub const SCROLL_TOP_OFFSET: u32 = 70;

/// Whether components that need a live client context may be constructed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Readiness {
    /// Server render pass, the player is left out
    #[default]
    NotReady,
    /// First client-side pass has happened, the player is rendered
    Ready,
}

/// Side effect requested by a selection, applied by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Effect {
    ScrollToTop { top: u32, smooth: bool },
}

/// What the embedded player is configured with
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerConfig {
    pub video_id: String,
    pub autoplay: bool,
}

/// The "now playing" record plus whether playback should start on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    pub current: VideoRecord,
    pub auto_play: bool,
}

/// Holds the selection for one page view
pub struct PlaybackSelector {
    snapshot: Arc<PlaylistSnapshot>,
    state: SelectionState,
    readiness: Readiness,
    effects: Vec<Effect>,
}

impl PlaybackSelector {
    /// Starts on the first record with auto-play off
    pub fn new(snapshot: Arc<PlaylistSnapshot>) -> Self {
        let state = SelectionState {
            current: snapshot.first().clone(),
            auto_play: false,
        };
        Self {
            snapshot,
            state,
            readiness: Readiness::NotReady,
            effects: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> &PlaylistSnapshot {
        &self.snapshot
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn current(&self) -> &VideoRecord {
        &self.state.current
    }

    pub fn auto_play(&self) -> bool {
        self.state.auto_play
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    pub fn select_video(&mut self, record: &VideoRecord) {
        debug!(video_id = record.video_id(), "video selected");
        self.state.current = record.clone();
        self.state.auto_play = true;
        self.effects.push(Effect::ScrollToTop {
            top: SCROLL_TOP_OFFSET,
            smooth: true,
        });
    }

    /// Select the card with playlist item id `item_id`; unknown ids leave the
    /// selection alone
    pub fn select_by_item_id(&mut self, item_id: &str) -> bool {
        let Some(record) = self.snapshot.find_by_id(item_id).cloned() else {
            debug!(item_id, "ignoring selection of an item outside the playlist");
            return false;
        };
        self.select_video(&record);
        true
    }

    /// Re-apply a selection carried over from an earlier pass of the same view.
    ///
    /// Unlike [`select_video`](Self::select_video) no scroll is queued and
    /// `auto_play` is taken as given.
    pub fn restore(&mut self, item_id: Option<&str>, auto_play: bool) {
        if let Some(item_id) = item_id {
            match self.snapshot.find_by_id(item_id) {
                Some(record) => self.state.current = record.clone(),
                None => debug!(item_id, "ignoring restore of an item outside the playlist"),
            }
        }
        self.state.auto_play = auto_play;
    }

    /// Select the first card playing `video_id`; unknown ids leave the selection alone
    pub fn select_by_video_id(&mut self, video_id: &str) -> bool {
        let Some(record) = self.snapshot.find_by_video_id(video_id).cloned() else {
            debug!(video_id, "ignoring selection of a video outside the playlist");
            return false;
        };
        self.select_video(&record);
        true
    }

    /// One-way transition to `Ready`; returns whether this call made it
    pub fn mark_ready(&mut self) -> bool {
        if self.readiness == Readiness::Ready {
            return false;
        }
        self.readiness = Readiness::Ready;
        true
    }

    /// The player configuration, present only once ready
    pub fn player(&self) -> Option<PlayerConfig> {
        match self.readiness {
            Readiness::NotReady => None,
            Readiness::Ready => Some(PlayerConfig {
                video_id: self.state.current.video_id().to_string(),
                autoplay: self.state.auto_play,
            }),
        }
    }

    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }
}
