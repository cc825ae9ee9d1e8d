use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use super::{AdapterContext, PlayerHandle, ScriptLoader, Surface};
use crate::error::{PlayerError, shielded};
use crate::host::{EmbedEvent, EmbedPlayer, EmbedScriptHost};
use crate::session::{Session, StateTracker};
use crate::video::{PlayerState, StateReport, Video};

static CONTAINER_SEQ: AtomicU64 = AtomicU64::new(1);

/// A container id never handed out before in this process
fn next_container_id() -> String {
    format!("embed-player-{}", CONTAINER_SEQ.fetch_add(1, Ordering::Relaxed))
}

/// Human readable meaning of an embedded player error code
pub(crate) fn describe_error_code(code: i32) -> &'static str {
    match code {
        2 => "invalid parameter",
        5 => "playback error in the player",
        100 => "video not found or private",
        101 | 150 => "embedding disabled by the video owner",
        _ => "unknown player error",
    }
}

type PlayerSlot = Arc<Mutex<Option<Box<dyn EmbedPlayer>>>>;

/// Adapter for the script-loaded embed player.
///
/// The player is constructed asynchronously once the shared script is
/// available, so every command is a no-op until the slot is filled.
pub(crate) struct EmbeddedPlayer {
    container_id: String,
    player: PlayerSlot,
    tracker: Arc<Mutex<StateTracker>>,
    session: Session,
    confirm_delay: Duration,
    tasks: JoinSet<()>,
}

impl EmbeddedPlayer {
    pub fn start(video: &Video, ctx: AdapterContext) -> Self {
        let container_id = next_container_id();
        let player: PlayerSlot = Arc::new(Mutex::new(None));
        let tracker = Arc::new(Mutex::new(StateTracker::default()));
        info!(
            "Starting embedded player for {} in #{}",
            video.source_video_id, container_id
        );

        let mut tasks = JoinSet::new();
        tasks.spawn(run(
            Startup {
                host: Arc::clone(&ctx.host.scripts),
                loader: Arc::clone(&ctx.loader),
                script_url: ctx.config.embed_script_url.clone(),
                container_id: container_id.clone(),
                video_id: video.source_video_id.clone(),
                poll_interval: ctx.config.poll_interval(),
            },
            Arc::clone(&player),
            Arc::clone(&tracker),
            ctx.session.clone(),
        ));

        Self {
            container_id,
            player,
            tracker,
            session: ctx.session,
            confirm_delay: ctx.config.play_confirm_delay(),
            tasks,
        }
    }

    fn reported_state(player: &dyn EmbedPlayer) -> Result<StateReport, PlayerError> {
        Ok(StateReport::from_embed_code(player.player_state()?))
    }

    /// Re-check shortly after a play command and report the transition if
    /// the backend's own event has not arrived yet
    fn confirm_play(&mut self) {
        while self.tasks.try_join_next().is_some() {}

        let player = Arc::clone(&self.player);
        let tracker = Arc::clone(&self.tracker);
        let session = self.session.clone();
        let delay = self.confirm_delay;
        self.tasks.spawn(async move {
            tokio::time::sleep(delay).await;
            if !session.is_ready() {
                return;
            }
            let state = {
                let slot = player.lock();
                let Some(player) = slot.as_ref() else { return };
                shielded("player state", || Self::reported_state(&**player))
            };
            match state {
                Ok(StateReport::Known(state)) => {
                    let events = tracker.lock().observe(state);
                    session.emit_all(events);
                }
                Ok(_) => {}
                Err(e) => warn!("Play confirmation check failed: {}", e),
            }
        });
    }
}

impl PlayerHandle for EmbeddedPlayer {
    fn play(&mut self) -> Result<(), PlayerError> {
        {
            let mut slot = self.player.lock();
            let Some(player) = slot.as_mut() else {
                return Ok(());
            };
            if let StateReport::Known(state) = Self::reported_state(&**player)? {
                if state.is_active() {
                    debug!("Embedded player already {:?}, not re-issuing play", state);
                    return Ok(());
                }
            }
            player.play_video()?;
        }
        self.confirm_play();
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PlayerError> {
        let mut slot = self.player.lock();
        let Some(player) = slot.as_mut() else {
            return Ok(());
        };
        if let StateReport::Known(state) = Self::reported_state(&**player)? {
            if state.is_halted() {
                debug!("Embedded player already {:?}, not re-issuing pause", state);
                return Ok(());
            }
        }
        player.pause_video()
    }

    fn seek(&mut self, seconds: f64, allow_ahead: bool) -> Result<(), PlayerError> {
        match self.player.lock().as_mut() {
            Some(player) => player.seek_to(seconds, allow_ahead),
            None => Ok(()),
        }
    }

    fn current_time(&self) -> Result<f64, PlayerError> {
        match self.player.lock().as_ref() {
            Some(player) => player.current_time(),
            None => Ok(0.0),
        }
    }

    fn state(&self) -> Result<StateReport, PlayerError> {
        match self.player.lock().as_ref() {
            Some(player) => Self::reported_state(&**player),
            None => Ok(StateReport::Unstarted),
        }
    }

    fn idle_state(&self) -> StateReport {
        StateReport::Unstarted
    }

    fn surface(&self) -> Surface {
        Surface::EmbedContainer {
            element_id: self.container_id.clone(),
        }
    }

    fn teardown(&mut self) {
        self.tasks.abort_all();
        let player = self.player.lock().take();
        if let Some(mut player) = player {
            info!("Destroying embedded player in #{}", self.container_id);
            if let Err(e) = shielded("destroy", || {
                player.destroy();
                Ok(())
            }) {
                warn!("Embedded player teardown failed: {}", e);
            }
        }
    }
}

impl Drop for EmbeddedPlayer {
    fn drop(&mut self) {
        self.teardown();
    }
}

struct Startup {
    host: Arc<dyn EmbedScriptHost>,
    loader: Arc<ScriptLoader>,
    script_url: String,
    container_id: String,
    video_id: String,
    poll_interval: Duration,
}

/// Load the script, construct the player, then forward backend events and
/// poll time once the player reports ready
async fn run(
    startup: Startup,
    slot: PlayerSlot,
    tracker: Arc<Mutex<StateTracker>>,
    session: Session,
) {
    if let Err(e) = startup
        .loader
        .ensure_loaded(Arc::clone(&startup.host), &startup.script_url)
        .await
    {
        error!("Embedded player unavailable: {}", e);
        session.error(e);
        return;
    }
    if !session.is_current() {
        return;
    }

    let (events_tx, mut events) = mpsc::unbounded_channel();
    let created = shielded("create player", || {
        startup
            .host
            .create_player(&startup.container_id, &startup.video_id, events_tx)
    });
    match created {
        Ok(player) => *slot.lock() = Some(player),
        Err(e) => {
            error!("Failed to construct embedded player: {}", e);
            session.error(e);
            return;
        }
    }

    let mut poll = tokio::time::interval(startup.poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut polling = false;
    let mut listening = true;

    loop {
        tokio::select! {
            event = events.recv(), if listening => match event {
                Some(EmbedEvent::Ready) => {
                    if session.mark_ready() {
                        info!("Embedded player #{} ready", startup.container_id);
                        polling = true;
                        poll.reset();
                    }
                }
                Some(EmbedEvent::StateChange(code)) if session.is_ready() => {
                    match StateReport::from_embed_code(code) {
                        StateReport::Known(state) => observe(&tracker, &session, state),
                        other => debug!("Ignoring embedded state code {} ({:?})", code, other),
                    }
                }
                Some(EmbedEvent::StateChange(code)) => {
                    debug!("Embedded state code {} before ready", code);
                }
                Some(EmbedEvent::Error(code)) => {
                    let message = describe_error_code(code).to_string();
                    error!("Embedded player error {}: {}", code, message);
                    session.error(PlayerError::Backend { code, message });
                }
                None => {
                    debug!("Embedded player event channel closed");
                    listening = false;
                }
            },
            _ = poll.tick(), if polling => sample(&slot, &tracker, &session),
            else => break,
        }
    }
}

fn observe(tracker: &Mutex<StateTracker>, session: &Session, state: PlayerState) {
    let events = tracker.lock().observe(state);
    session.emit_all(events);
}

/// One poll tick: forward the current time and feed the state tracker
fn sample(slot: &PlayerSlot, tracker: &Mutex<StateTracker>, session: &Session) {
    let sampled = {
        let guard = slot.lock();
        let Some(player) = guard.as_ref() else { return };
        shielded("poll", || {
            Ok((player.current_time()?, player.player_state()?))
        })
    };

    match sampled {
        Ok((seconds, code)) => {
            session.time_update(seconds);
            if let StateReport::Known(state) = StateReport::from_embed_code(code) {
                observe(tracker, session, state);
            }
        }
        Err(e) => warn!("Embedded player poll failed: {}", e),
    }
}
