//! Environment seams the backends are driven through.
//!
//! A browser binding implements these traits on top of the script API, the
//! media element and the frame messaging channel; [`crate::sim`] implements
//! them in-process.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::{broadcast, mpsc};

use crate::error::PlayerError;

/// Callback events raised by an embedded player instance
#[derive(Debug, Clone, PartialEq)]
pub enum EmbedEvent {
    Ready,
    /// Raw numeric state code
    StateChange(i32),
    /// Raw numeric error code
    Error(i32),
}

pub type EmbedEventSender = mpsc::UnboundedSender<EmbedEvent>;

/// Provider of the shared embed script and the players it constructs
pub trait EmbedScriptHost: Send + Sync {
    /// Whether the global player API object already exists
    fn api_available(&self) -> bool;

    /// Inject the script and resolve once its API reports itself loaded
    fn load_script(&self, src: &str) -> BoxFuture<'static, Result<(), PlayerError>>;

    /// Construct a player inside the container `container_id`
    fn create_player(
        &self,
        container_id: &str,
        video_id: &str,
        events: EmbedEventSender,
    ) -> Result<Box<dyn EmbedPlayer>, PlayerError>;
}

/// Imperative surface of a constructed embedded player
pub trait EmbedPlayer: Send {
    fn play_video(&mut self) -> Result<(), PlayerError>;
    fn pause_video(&mut self) -> Result<(), PlayerError>;
    fn seek_to(&mut self, seconds: f64, allow_seek_ahead: bool) -> Result<(), PlayerError>;
    fn current_time(&self) -> Result<f64, PlayerError>;
    /// Raw numeric state code
    fn player_state(&self) -> Result<i32, PlayerError>;
    fn destroy(&mut self);
}

/// Native events of a media element
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    LoadedMetadata { duration: Option<f64> },
    TimeUpdate(f64),
    Play,
    Pause,
    Ended,
    Waiting,
    Error(String),
}

pub type MediaEventSender = mpsc::UnboundedSender<MediaEvent>;

/// Why a media element refused to start playing
#[derive(Debug, Clone, PartialEq)]
pub enum PlayRejection {
    /// Blocked by the autoplay policy
    NotAllowed(String),
    Failed(String),
}

pub trait MediaHost: Send + Sync {
    fn create_element(
        &self,
        src: &str,
        events: MediaEventSender,
    ) -> Result<Box<dyn MediaElement>, PlayerError>;
}

pub trait MediaElement: Send {
    fn play(&mut self) -> Result<(), PlayRejection>;
    fn pause(&mut self);
    fn set_current_time(&mut self, seconds: f64);
    fn current_time(&self) -> f64;
    fn paused(&self) -> bool;
    fn ended(&self) -> bool;
    /// Detach the resource reference
    fn clear_source(&mut self);
    /// Reload the element with its current source
    fn load(&mut self);
}

/// Payload of a message received from a frame
#[derive(Debug, Clone, PartialEq)]
pub enum MessagePayload {
    Text(String),
    Structured(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub origin: String,
    pub data: MessagePayload,
}

impl InboundMessage {
    pub fn text(origin: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            data: MessagePayload::Text(data.into()),
        }
    }

    pub fn structured(origin: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            origin: origin.into(),
            data: MessagePayload::Structured(data),
        }
    }
}

pub type MessageSender = mpsc::UnboundedSender<InboundMessage>;

pub trait FrameHost: Send + Sync {
    /// Create a frame at `src`. Every message the window receives, from any
    /// source, is forwarded to `messages`.
    fn create_frame(
        &self,
        src: &str,
        messages: MessageSender,
    ) -> Result<Box<dyn EmbedFrame>, PlayerError>;
}

pub trait EmbedFrame: Send {
    fn post_message(&mut self, message: &str, target_origin: &str) -> Result<(), PlayerError>;
}

/// Global keyboard shortcuts the facade reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPress {
    SeekBack,
    SeekForward,
}

/// Everything a facade needs from its environment
#[derive(Clone)]
pub struct PlayerHost {
    pub scripts: Arc<dyn EmbedScriptHost>,
    pub media: Arc<dyn MediaHost>,
    pub frames: Arc<dyn FrameHost>,
    pub keys: Option<broadcast::Sender<KeyPress>>,
}

impl PlayerHost {
    pub fn new(
        scripts: Arc<dyn EmbedScriptHost>,
        media: Arc<dyn MediaHost>,
        frames: Arc<dyn FrameHost>,
    ) -> Self {
        Self {
            scripts,
            media,
            frames,
            keys: None,
        }
    }

    pub fn with_keys(mut self, keys: broadcast::Sender<KeyPress>) -> Self {
        self.keys = Some(keys);
        self
    }
}
