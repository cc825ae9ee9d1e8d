use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use super::message::{self, FrameCommand, FrameSignal};
use super::{AdapterContext, PlayerHandle, Surface};
use crate::error::{PlayerError, shielded};
use crate::host::{EmbedFrame, InboundMessage};
use crate::session::{Session, StateTracker};
use crate::video::{PlayerState, StateReport, Video};

/// What we last heard from, or optimistically assumed about, the frame
#[derive(Debug, Default)]
struct FrameCache {
    time: f64,
    tracker: StateTracker,
}

type SharedCache = Arc<Mutex<FrameCache>>;

/// Adapter for a third-party embed that only talks through frame messages.
///
/// Nothing about the frame can be queried, so time and state are whatever
/// the last inbound message said, or what our own last command implied.
/// Readiness is a best-effort guess: a fixed delay after creation, or an
/// earlier ready-shaped message.
pub(crate) struct CrossDocumentPlayer {
    src: String,
    origin: String,
    frame: Option<Box<dyn EmbedFrame>>,
    cache: SharedCache,
    session: Session,
    tasks: JoinSet<()>,
}

impl CrossDocumentPlayer {
    pub fn start(video: &Video, ctx: AdapterContext) -> Result<Self, PlayerError> {
        let target = video
            .resource_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(&video.source_video_id);
        let src = message::frame_address(&ctx.config.frame_base_url, target).map_err(|e| {
            PlayerError::Construction {
                backend: "cross-document",
                message: format!("invalid frame address {}: {}", ctx.config.frame_base_url, e),
            }
        })?;
        let origin = message::normalize_origin(&ctx.config.frame_origin);

        let (messages_tx, messages) = mpsc::unbounded_channel();
        let frame = shielded("create frame", || ctx.host.frames.create_frame(&src, messages_tx))?;
        info!("Created embed frame at {}", src);

        let cache = SharedCache::default();
        let mut tasks = JoinSet::new();
        tasks.spawn(run(
            messages,
            Arc::clone(&cache),
            ctx.session.clone(),
            origin.clone(),
            ctx.config.frame_ready_delay(),
            ctx.config.frame_fallback_poll(),
        ));

        Ok(Self {
            src,
            origin,
            frame: Some(frame),
            cache,
            session: ctx.session,
            tasks,
        })
    }

    fn post(&mut self, command: FrameCommand) -> Result<bool, PlayerError> {
        let Some(frame) = self.frame.as_mut() else {
            return Ok(false);
        };
        let message = command.to_message();
        debug!("Posting {} to embed frame", message);
        frame.post_message(&message, &self.origin)?;
        Ok(true)
    }

    /// Assume the command took effect; the frame never acknowledges
    fn assume(&self, state: PlayerState) {
        let events = self.cache.lock().tracker.observe(state);
        self.session.emit_all(events);
    }
}

impl PlayerHandle for CrossDocumentPlayer {
    fn play(&mut self) -> Result<(), PlayerError> {
        if self.post(FrameCommand::Play)? {
            self.assume(PlayerState::Playing);
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PlayerError> {
        if self.post(FrameCommand::Pause)? {
            self.assume(PlayerState::Paused);
        }
        Ok(())
    }

    fn seek(&mut self, seconds: f64, _allow_ahead: bool) -> Result<(), PlayerError> {
        if self.post(FrameCommand::Seek(seconds))? {
            self.cache.lock().time = seconds;
            self.session.time_update(seconds);
        }
        Ok(())
    }

    fn current_time(&self) -> Result<f64, PlayerError> {
        Ok(self.cache.lock().time)
    }

    fn state(&self) -> Result<StateReport, PlayerError> {
        Ok(self
            .cache
            .lock()
            .tracker
            .last()
            .map(StateReport::Known)
            .unwrap_or(StateReport::Unknown))
    }

    fn idle_state(&self) -> StateReport {
        StateReport::Unknown
    }

    fn surface(&self) -> Surface {
        Surface::Frame {
            src: self.src.clone(),
        }
    }

    fn teardown(&mut self) {
        self.tasks.abort_all();
        if self.frame.take().is_some() {
            info!("Released embed frame at {}", self.src);
        }
    }
}

impl Drop for CrossDocumentPlayer {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Flip readiness and report whatever state the frame announced while it
/// was still starting up
fn on_ready(
    session: &Session,
    cache: &SharedCache,
    fallback: &mut tokio::time::Interval,
    reason: &str,
) {
    if session.mark_ready() {
        info!("Embed frame ready ({})", reason);
        let announced = cache.lock().tracker.replay();
        session.emit_all(announced);
        fallback.reset();
    }
}

/// Race the ready delay against inbound messages, apply recognized
/// messages to the cache, and keep re-emitting the cached time
async fn run(
    mut messages: mpsc::UnboundedReceiver<InboundMessage>,
    cache: SharedCache,
    session: Session,
    origin: String,
    ready_delay: Duration,
    fallback_every: Duration,
) {
    let ready_timer = tokio::time::sleep(ready_delay);
    tokio::pin!(ready_timer);
    let mut timer_armed = true;
    let mut listening = true;

    let mut fallback = tokio::time::interval(fallback_every);
    fallback.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut ready_timer, if timer_armed => {
                timer_armed = false;
                on_ready(&session, &cache, &mut fallback, "assumed after delay");
            }
            inbound = messages.recv(), if listening => match inbound {
                Some(inbound) if !message::origin_matches(&inbound.origin, &origin) => {
                    debug!("Discarding message from {}", inbound.origin);
                }
                Some(inbound) => {
                    for signal in message::parse(&inbound.data) {
                        match signal {
                            FrameSignal::Ready => {
                                on_ready(&session, &cache, &mut fallback, "announced by frame")
                            }
                            FrameSignal::State(state) => {
                                let events = cache.lock().tracker.observe(state);
                                if session.is_ready() {
                                    session.emit_all(events);
                                }
                            }
                            FrameSignal::Time(seconds) => {
                                cache.lock().time = seconds;
                                if session.is_ready() {
                                    session.time_update(seconds);
                                }
                            }
                        }
                    }
                }
                None => {
                    warn!("Embed frame message channel closed");
                    listening = false;
                }
            },
            _ = fallback.tick(), if session.is_ready() => {
                let seconds = cache.lock().time;
                session.time_update(seconds);
            }
            else => break,
        }
    }
}
