use std::panic::{AssertUnwindSafe, catch_unwind};

use thiserror::Error;

/// Everything that can go wrong while driving a playback backend.
///
/// Errors never cross the public control surface as `Result`s; they are
/// delivered to the `on_error` callback instead, which is why the type is
/// `Clone`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlayerError {
    /// A direct-media video without a resource URL.
    #[error("video {video_id} has no resource URL to play")]
    MissingResourceUrl { video_id: String },

    /// The video's declared source is not one the facade knows how to drive.
    #[error("unsupported video source for video {video_id}")]
    UnsupportedSource { video_id: String },

    /// The shared embed script could not be loaded.
    #[error("failed to load embed script: {0}")]
    ScriptLoad(String),

    /// The backend refused to construct a player or element.
    #[error("failed to construct {backend} player: {message}")]
    Construction {
        backend: &'static str,
        message: String,
    },

    /// An error reported by the embedded player, carrying its numeric code.
    #[error("embedded player error {code}: {message}")]
    Backend { code: i32, message: String },

    /// An error event raised by a media element.
    #[error("media element error: {0}")]
    Media(String),

    /// A backend method returned an error.
    #[error("{operation} failed: {message}")]
    Command {
        operation: &'static str,
        message: String,
    },

    /// A backend method panicked.
    #[error("{operation} panicked: {message}")]
    Panicked {
        operation: &'static str,
        message: String,
    },
}

impl PlayerError {
    pub fn command(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Command {
            operation,
            message: message.into(),
        }
    }

    /// Whether the error comes from the video record rather than the backend.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingResourceUrl { .. } | Self::UnsupportedSource { .. }
        )
    }
}

/// Run a backend call, turning a panic into [`PlayerError::Panicked`].
pub(crate) fn shielded<T>(
    operation: &'static str,
    call: impl FnOnce() -> Result<T, PlayerError>,
) -> Result<T, PlayerError> {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(PlayerError::Panicked { operation, message })
        }
    }
}
