//! In-process backends.
//!
//! These implement the host traits without a browser: a playhead advances on
//! the tokio clock, so a paused test runtime or the terminal console can drive
//! all three adapters end to end. Each host hands out probes that expose what
//! the facade did to it and let callers inject backend events.

mod embed;
mod frame;
mod media;

use std::sync::Arc;

use tokio::time::Instant;

use crate::host::PlayerHost;

pub use embed::{EmbedProbe, SimEmbedHost};
pub use frame::{FrameProbe, SimFrameHost};
pub use media::{MediaProbe, SimMediaHost};

/// Position of a simulated video, advancing in real (or test) time while
/// playing and stopping at the duration if there is one
#[derive(Debug, Clone)]
pub(crate) struct Playhead {
    position: f64,
    started: Option<Instant>,
    duration: Option<f64>,
}

impl Playhead {
    pub fn new(duration: Option<f64>) -> Self {
        Self {
            position: 0.0,
            started: None,
            duration,
        }
    }

    pub fn position(&self) -> f64 {
        let elapsed = self
            .started
            .map(|at| at.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        let position = self.position + elapsed;
        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    pub fn finished(&self) -> bool {
        self.duration.is_some_and(|d| self.position() >= d)
    }

    pub fn is_playing(&self) -> bool {
        self.started.is_some() && !self.finished()
    }

    pub fn play(&mut self) {
        if self.finished() {
            self.position = 0.0;
            self.started = None;
        }
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    pub fn pause(&mut self) {
        self.position = self.position();
        self.started = None;
    }

    pub fn seek(&mut self, seconds: f64) {
        let seconds = seconds.max(0.0);
        self.position = match self.duration {
            Some(duration) => seconds.min(duration),
            None => seconds,
        };
        if self.started.is_some() {
            self.started = Some(Instant::now());
        }
    }
}

/// One simulated backend of each kind
#[derive(Clone, Default)]
pub struct SimHost {
    pub scripts: SimEmbedHost,
    pub media: SimMediaHost,
    pub frames: SimFrameHost,
}

impl SimHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scripts(mut self, scripts: SimEmbedHost) -> Self {
        self.scripts = scripts;
        self
    }

    pub fn with_media(mut self, media: SimMediaHost) -> Self {
        self.media = media;
        self
    }

    pub fn with_frames(mut self, frames: SimFrameHost) -> Self {
        self.frames = frames;
        self
    }

    pub fn player_host(&self) -> PlayerHost {
        PlayerHost::new(
            Arc::new(self.scripts.clone()),
            Arc::new(self.media.clone()),
            Arc::new(self.frames.clone()),
        )
    }
}
