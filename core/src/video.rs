use serde::{Deserialize, Serialize};

/// Where a video is hosted, which decides the backend that plays it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VideoSource {
    /// Played through the shared, script-loaded embed player API
    Embedded,
    /// Played from a resource URL by a local media element
    Direct,
    /// A third-party embed reachable only through frame messaging
    CrossDocument,
    /// Anything else the library hands us
    #[serde(other)]
    Unsupported,
}

/// A video record as the surrounding application resolves it.
///
/// The facade only ever reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    /// Identifier of the video inside its hosting backend
    pub source_video_id: String,
    pub title: String,
    pub source: VideoSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_url: Option<String>,
}

impl Video {
    /// Whether two records describe the same playable selection
    pub fn same_selection(&self, other: &Video) -> bool {
        self.id == other.id
            && self.source == other.source
            && self.source_video_id == other.source_video_id
            && self.resource_url == other.resource_url
    }
}

/// Normalized playback state shared by every backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    Playing,
    Paused,
    Ended,
    Buffering,
    Cued,
}

impl PlayerState {
    /// Map an embedded-player state code. `-1` (unstarted) and unknown codes
    /// have no normalized state.
    pub fn from_embed_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Ended),
            1 => Some(Self::Playing),
            2 => Some(Self::Paused),
            3 => Some(Self::Buffering),
            5 => Some(Self::Cued),
            _ => None,
        }
    }

    pub fn embed_code(self) -> i32 {
        match self {
            Self::Ended => 0,
            Self::Playing => 1,
            Self::Paused => 2,
            Self::Buffering => 3,
            Self::Cued => 5,
        }
    }

    /// Playing or about to be
    pub fn is_active(self) -> bool {
        matches!(self, Self::Playing | Self::Buffering)
    }

    /// Playback is stopped, either paused or at the end
    pub fn is_halted(self) -> bool {
        matches!(self, Self::Paused | Self::Ended)
    }
}

/// What `state()` reports: a normalized state, or the idle value of the
/// active backend's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateReport {
    Known(PlayerState),
    /// Embedded-player idle value (code `-1`)
    Unstarted,
    /// Idle value of the direct and cross-document backends
    Unknown,
}

impl StateReport {
    pub fn from_embed_code(code: i32) -> Self {
        match code {
            -1 => Self::Unstarted,
            code => PlayerState::from_embed_code(code)
                .map(Self::Known)
                .unwrap_or(Self::Unknown),
        }
    }

    /// Numeric form in the embedded-player vocabulary
    pub fn code(self) -> i32 {
        match self {
            Self::Known(state) => state.embed_code(),
            Self::Unstarted | Self::Unknown => -1,
        }
    }

    pub fn state(self) -> Option<PlayerState> {
        match self {
            Self::Known(state) => Some(state),
            _ => None,
        }
    }
}
