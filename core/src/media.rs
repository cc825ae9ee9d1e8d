mod cross_document;
mod direct;
mod embedded;
pub(crate) mod message;
mod script;

use std::sync::Arc;

pub use script::ScriptLoader;

use crate::config::PlayerConfig;
use crate::error::PlayerError;
use crate::host::PlayerHost;
use crate::session::Session;
use crate::video::{StateReport, Video, VideoSource};

use cross_document::CrossDocumentPlayer;
use direct::DirectMediaPlayer;
use embedded::EmbeddedPlayer;

/// What the facade renders for the active selection
#[derive(Debug, Clone, PartialEq)]
pub enum Surface {
    /// Nothing playable is selected
    Placeholder(String),
    /// Container element the embedded player is constructed into
    EmbedContainer { element_id: String },
    MediaElement { src: String },
    Frame { src: String },
}

/// Common control surface of every backend adapter
pub(crate) trait PlayerHandle: Send {
    fn play(&mut self) -> Result<(), PlayerError>;

    fn pause(&mut self) -> Result<(), PlayerError>;

    fn seek(&mut self, seconds: f64, allow_ahead: bool) -> Result<(), PlayerError>;

    /// Current playhead in seconds
    fn current_time(&self) -> Result<f64, PlayerError>;

    fn state(&self) -> Result<StateReport, PlayerError>;

    /// What `state()` reports before the backend is ready
    fn idle_state(&self) -> StateReport;

    fn surface(&self) -> Surface;

    /// Stop every task and listener and release the backend resource.
    /// Must be safe to call more than once.
    fn teardown(&mut self);
}

/// Everything an adapter needs to start
pub(crate) struct AdapterContext {
    pub session: Session,
    pub host: PlayerHost,
    pub config: Arc<PlayerConfig>,
    pub loader: Arc<ScriptLoader>,
}

/// Idle value reported for a source before its adapter is ready
pub(crate) fn idle_state_for(source: VideoSource) -> StateReport {
    match source {
        VideoSource::Embedded => StateReport::Unstarted,
        _ => StateReport::Unknown,
    }
}

/// Create the adapter matching the video's declared source
pub(crate) fn create_player_handle(
    video: &Video,
    ctx: AdapterContext,
) -> Result<Box<dyn PlayerHandle>, PlayerError> {
    match video.source {
        VideoSource::Embedded => Ok(Box::new(EmbeddedPlayer::start(video, ctx))),
        VideoSource::Direct => Ok(Box::new(DirectMediaPlayer::start(video, ctx)?)),
        VideoSource::CrossDocument => Ok(Box::new(CrossDocumentPlayer::start(video, ctx)?)),
        VideoSource::Unsupported => Err(PlayerError::UnsupportedSource {
            video_id: video.id.clone(),
        }),
    }
}
