use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use super::{AdapterContext, PlayerHandle, Surface};
use crate::error::{PlayerError, shielded};
use crate::host::{MediaElement, MediaEvent, PlayRejection};
use crate::session::{Session, StateTracker};
use crate::video::{PlayerState, StateReport, Video};

/// Adapter for a media element pointed straight at the video's resource URL
pub(crate) struct DirectMediaPlayer {
    src: String,
    element: Option<Box<dyn MediaElement>>,
    tasks: JoinSet<()>,
}

impl DirectMediaPlayer {
    pub fn start(video: &Video, ctx: AdapterContext) -> Result<Self, PlayerError> {
        let src = video
            .resource_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| PlayerError::MissingResourceUrl {
                video_id: video.id.clone(),
            })?
            .to_string();

        let (events_tx, events) = mpsc::unbounded_channel();
        let element = shielded("create media element", || {
            ctx.host.media.create_element(&src, events_tx)
        })?;
        info!("Created media element for {}", src);

        let mut tasks = JoinSet::new();
        tasks.spawn(listen(events, ctx.session));

        Ok(Self {
            src,
            element: Some(element),
            tasks,
        })
    }
}

impl PlayerHandle for DirectMediaPlayer {
    fn play(&mut self) -> Result<(), PlayerError> {
        let Some(element) = self.element.as_mut() else {
            return Ok(());
        };
        match element.play() {
            Ok(()) => Ok(()),
            Err(PlayRejection::NotAllowed(reason)) => {
                debug!("Autoplay blocked by the browser: {}", reason);
                Ok(())
            }
            Err(PlayRejection::Failed(reason)) => Err(PlayerError::command("play", reason)),
        }
    }

    fn pause(&mut self) -> Result<(), PlayerError> {
        if let Some(element) = self.element.as_mut() {
            element.pause();
        }
        Ok(())
    }

    fn seek(&mut self, seconds: f64, _allow_ahead: bool) -> Result<(), PlayerError> {
        if let Some(element) = self.element.as_mut() {
            element.set_current_time(seconds);
        }
        Ok(())
    }

    fn current_time(&self) -> Result<f64, PlayerError> {
        Ok(self
            .element
            .as_ref()
            .map(|element| element.current_time())
            .unwrap_or(0.0))
    }

    fn state(&self) -> Result<StateReport, PlayerError> {
        let Some(element) = self.element.as_ref() else {
            return Ok(StateReport::Unknown);
        };
        let state = if element.ended() {
            PlayerState::Ended
        } else if element.paused() {
            PlayerState::Paused
        } else {
            PlayerState::Playing
        };
        Ok(StateReport::Known(state))
    }

    fn idle_state(&self) -> StateReport {
        StateReport::Unknown
    }

    fn surface(&self) -> Surface {
        Surface::MediaElement {
            src: self.src.clone(),
        }
    }

    fn teardown(&mut self) {
        self.tasks.abort_all();
        if let Some(mut element) = self.element.take() {
            info!("Releasing media element for {}", self.src);
            // Empty the element so it stops buffering in the background
            let released = shielded("release media element", || {
                element.pause();
                element.clear_source();
                element.load();
                Ok(())
            });
            if let Err(e) = released {
                warn!("Media element teardown failed: {}", e);
            }
        }
    }
}

impl Drop for DirectMediaPlayer {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn listen(mut events: mpsc::UnboundedReceiver<MediaEvent>, session: Session) {
    let mut tracker = StateTracker::default();
    let mut observe = |state: PlayerState| {
        if session.is_ready() {
            session.emit_all(tracker.observe(state));
        }
    };

    while let Some(event) = events.recv().await {
        match event {
            MediaEvent::LoadedMetadata { duration } => {
                if session.mark_ready() {
                    info!("Media element ready (duration {:?})", duration);
                    session.time_update(0.0);
                }
            }
            MediaEvent::TimeUpdate(seconds) => {
                if session.is_ready() {
                    session.time_update(seconds);
                }
            }
            MediaEvent::Play => observe(PlayerState::Playing),
            MediaEvent::Pause => observe(PlayerState::Paused),
            MediaEvent::Ended => observe(PlayerState::Ended),
            MediaEvent::Waiting => observe(PlayerState::Buffering),
            MediaEvent::Error(message) => {
                error!("Media element error: {}", message);
                session.error(PlayerError::Media(message));
            }
        }
    }
    debug!("Media element event channel closed");
}
