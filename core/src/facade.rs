//! The one control surface the rest of the application sees.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use log::{debug, error, info};
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::PlayerConfig;
use crate::error::{PlayerError, shielded};
use crate::host::{KeyPress, PlayerHost};
use crate::media::{
    AdapterContext, PlayerHandle, ScriptLoader, Surface, create_player_handle, idle_state_for,
};
use crate::session::{Envelope, EnvelopeSender, PlayerEvent, Session, SharedLifecycle};
use crate::video::{PlayerState, StateReport, Video};

type Notify = Arc<dyn Fn() + Send + Sync>;

/// Observer callbacks invoked by the facade
#[derive(Clone, Default)]
pub struct PlayerCallbacks {
    on_ready: Option<Notify>,
    on_time_update: Option<Arc<dyn Fn(f64) + Send + Sync>>,
    on_state_change: Option<Arc<dyn Fn(PlayerState) + Send + Sync>>,
    on_play: Option<Notify>,
    on_pause: Option<Notify>,
    on_error: Option<Arc<dyn Fn(PlayerError) + Send + Sync>>,
}

impl PlayerCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_ready(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_ready = Some(Arc::new(f));
        self
    }

    pub fn on_time_update(mut self, f: impl Fn(f64) + Send + Sync + 'static) -> Self {
        self.on_time_update = Some(Arc::new(f));
        self
    }

    pub fn on_state_change(mut self, f: impl Fn(PlayerState) + Send + Sync + 'static) -> Self {
        self.on_state_change = Some(Arc::new(f));
        self
    }

    pub fn on_play(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_play = Some(Arc::new(f));
        self
    }

    pub fn on_pause(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_pause = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(PlayerError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    fn dispatch(&self, event: PlayerEvent) {
        let delivered = catch_unwind(AssertUnwindSafe(|| match event {
            PlayerEvent::Ready => self.on_ready.as_ref().map(|f| f()),
            PlayerEvent::TimeUpdate(seconds) => self.on_time_update.as_ref().map(|f| f(seconds)),
            PlayerEvent::StateChange(state) => self.on_state_change.as_ref().map(|f| f(state)),
            PlayerEvent::Play => self.on_play.as_ref().map(|f| f()),
            PlayerEvent::Pause => self.on_pause.as_ref().map(|f| f()),
            PlayerEvent::Error(e) => self.on_error.as_ref().map(|f| f(e)),
        }));
        if delivered.is_err() {
            error!("A player callback panicked");
        }
    }
}

/// Rendering options; none of them affect control semantics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerProps {
    pub video: Option<Video>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub class_name: Option<String>,
}

impl PlayerProps {
    pub fn with_video(video: Video) -> Self {
        Self {
            video: Some(video),
            ..Default::default()
        }
    }
}

/// Description of what the facade renders
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerView {
    pub surface: Surface,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub class_name: Option<String>,
}

const NO_VIDEO: &str = "Select a video to start playback";
const UNPLAYABLE: &str = "This video cannot be played";

#[derive(Default)]
struct Active {
    props: PlayerProps,
    handle: Option<Box<dyn PlayerHandle>>,
    keys: Option<JoinHandle<()>>,
}

struct Inner {
    host: PlayerHost,
    config: Arc<PlayerConfig>,
    loader: Arc<ScriptLoader>,
    lifecycle: SharedLifecycle,
    events: EnvelopeSender,
    active: Mutex<Active>,
    dispatcher: JoinHandle<()>,
}

/// Uniform control surface over the embedded, direct-media and
/// cross-document backends.
///
/// Commands issued before the active backend is ready are dropped, not
/// queued. No method returns an error or panics because of a backend;
/// failures go to the `on_error` callback.
pub struct VideoPlayer {
    inner: Arc<Inner>,
}

impl VideoPlayer {
    /// Create an idle facade. Must be called from within a tokio runtime.
    pub fn new(host: PlayerHost, config: PlayerConfig, callbacks: PlayerCallbacks) -> Self {
        Self::with_script_loader(host, config, callbacks, ScriptLoader::global())
    }

    /// Like [`VideoPlayer::new`] with an explicit script loader instead of
    /// the process-wide one
    pub fn with_script_loader(
        host: PlayerHost,
        config: PlayerConfig,
        callbacks: PlayerCallbacks,
        loader: Arc<ScriptLoader>,
    ) -> Self {
        let lifecycle = SharedLifecycle::default();
        let (events, rx) = mpsc::unbounded_channel();
        let dispatcher = tokio::spawn(dispatch_events(rx, lifecycle.clone(), callbacks));

        Self {
            inner: Arc::new(Inner {
                host,
                config: Arc::new(config),
                loader,
                lifecycle,
                events,
                active: Mutex::new(Active::default()),
                dispatcher,
            }),
        }
    }

    /// Select a video, or clear the selection with `None`
    pub fn load(&self, video: Option<Video>) {
        let mut props = self.inner.active.lock().props.clone();
        props.video = video;
        self.set_props(props);
    }

    /// Apply new props. Only a change of video reinitializes the backend.
    pub fn set_props(&self, props: PlayerProps) {
        let mut active = self.inner.active.lock();
        let same_video = match (&active.props.video, &props.video) {
            (Some(current), Some(next)) => current.same_selection(next),
            (None, None) => true,
            _ => false,
        };
        active.props = props;
        if !same_video {
            self.inner.reselect(&mut active);
        }
    }

    pub fn unload(&self) {
        self.load(None);
    }

    pub fn play(&self) {
        self.inner.play();
    }

    pub fn pause(&self) {
        self.inner.pause();
    }

    /// Move the playhead. Callers clamp `seconds` to be non-negative.
    pub fn seek(&self, seconds: f64, allow_ahead: bool) {
        self.inner.seek(seconds, allow_ahead);
    }

    /// Pause when playing, play otherwise
    pub fn toggle(&self) {
        match self.state().state() {
            Some(state) if state.is_active() => self.pause(),
            _ => self.play(),
        }
    }

    /// Playhead in seconds; `0.0` until the backend is ready
    pub fn current_time(&self) -> f64 {
        self.inner.current_time()
    }

    pub fn state(&self) -> StateReport {
        self.inner.state()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.lifecycle.is_ready()
    }

    pub fn video(&self) -> Option<Video> {
        self.inner.active.lock().props.video.clone()
    }

    pub fn view(&self) -> PlayerView {
        let active = self.inner.active.lock();
        let surface = match (&active.handle, &active.props.video) {
            (Some(handle), _) => handle.surface(),
            (None, Some(_)) => Surface::Placeholder(UNPLAYABLE.to_string()),
            (None, None) => Surface::Placeholder(NO_VIDEO.to_string()),
        };
        PlayerView {
            surface,
            width: active.props.width,
            height: active.props.height,
            class_name: active.props.class_name.clone(),
        }
    }
}

impl Inner {
    /// Tear down whatever is active, then start the adapter for the
    /// current props. Runs with the active lock held.
    fn reselect(self: &Arc<Self>, active: &mut Active) {
        let generation = self.lifecycle.advance();
        Self::teardown(active);

        let Some(video) = active.props.video.clone() else {
            info!("Video selection cleared");
            return;
        };
        info!(
            "Loading video {} ({:?}) as selection {}",
            video.id, video.source, generation
        );

        let session = Session::new(generation, self.lifecycle.clone(), self.events.clone());
        let ctx = AdapterContext {
            session: session.clone(),
            host: self.host.clone(),
            config: Arc::clone(&self.config),
            loader: Arc::clone(&self.loader),
        };
        match create_player_handle(&video, ctx) {
            Ok(handle) => {
                active.handle = Some(handle);
                active.keys = self.attach_keys(generation);
            }
            Err(e) => {
                error!("Cannot play video {}: {}", video.id, e);
                session.error(e);
            }
        }
    }

    fn teardown(active: &mut Active) {
        if let Some(keys) = active.keys.take() {
            keys.abort();
        }
        if let Some(mut handle) = active.handle.take() {
            debug!("Tearing down previous player");
            handle.teardown();
        }
    }

    fn attach_keys(self: &Arc<Self>, generation: u64) -> Option<JoinHandle<()>> {
        let keys = self.host.keys.as_ref()?.subscribe();
        Some(tokio::spawn(handle_keys(
            keys,
            Arc::downgrade(self),
            generation,
        )))
    }

    fn report(&self, generation: u64, operation: &'static str, e: PlayerError) {
        error!("{} failed: {}", operation, e);
        let _ = self.events.send(Envelope {
            generation,
            event: PlayerEvent::Error(e),
        });
    }

    /// Run `call` against the active handle if it is ready. Errors and
    /// panics are reported through `on_error` and replaced by `fallback`.
    fn with_ready_handle<T>(
        &self,
        operation: &'static str,
        fallback: T,
        call: impl FnOnce(&mut dyn PlayerHandle) -> Result<T, PlayerError>,
    ) -> T {
        let (generation, result) = {
            let mut active = self.active.lock();
            if !self.lifecycle.is_ready() {
                debug!("Dropping {} before the player is ready", operation);
                return fallback;
            }
            let Some(handle) = active.handle.as_mut() else {
                return fallback;
            };
            let generation = self.lifecycle.generation();
            (generation, shielded(operation, || call(handle.as_mut())))
        };

        match result {
            Ok(value) => value,
            Err(e) => {
                self.report(generation, operation, e);
                fallback
            }
        }
    }

    fn play(&self) {
        self.with_ready_handle("play", (), |handle| handle.play());
    }

    fn pause(&self) {
        self.with_ready_handle("pause", (), |handle| handle.pause());
    }

    fn seek(&self, seconds: f64, allow_ahead: bool) {
        self.with_ready_handle("seek", (), |handle| handle.seek(seconds, allow_ahead));
    }

    fn current_time(&self) -> f64 {
        self.with_ready_handle("current time", 0.0, |handle| handle.current_time())
    }

    fn state(&self) -> StateReport {
        let idle = {
            let active = self.active.lock();
            match (&active.handle, &active.props.video) {
                (Some(handle), _) => handle.idle_state(),
                (None, Some(video)) => idle_state_for(video.source),
                (None, None) => StateReport::Unknown,
            }
        };
        self.with_ready_handle("state", idle, |handle| handle.state())
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        Self::teardown(self.active.get_mut());
        self.dispatcher.abort();
    }
}

/// Deliver queued events to the callbacks, skipping any produced by a
/// selection that is no longer current
async fn dispatch_events(
    mut rx: mpsc::UnboundedReceiver<Envelope>,
    lifecycle: SharedLifecycle,
    callbacks: PlayerCallbacks,
) {
    while let Some(Envelope { generation, event }) = rx.recv().await {
        if lifecycle.is_current(generation) {
            callbacks.dispatch(event);
        } else {
            debug!("Dropping {:?} from stale selection {}", event, generation);
        }
    }
}

/// Debounced keyboard seeking for one selection
async fn handle_keys(
    mut keys: broadcast::Receiver<KeyPress>,
    player: Weak<Inner>,
    generation: u64,
) {
    let mut last_handled: Option<Instant> = None;
    loop {
        let key = match keys.recv().await {
            Ok(key) => key,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!("Skipped {} key presses", skipped);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        let Some(inner) = player.upgrade() else { break };
        if !inner.lifecycle.is_current(generation) {
            break;
        }
        if !inner.lifecycle.is_ready() {
            continue;
        }
        let now = Instant::now();
        if last_handled.is_some_and(|at| now.duration_since(at) < inner.config.key_debounce()) {
            debug!("Debounced {:?}", key);
            continue;
        }
        last_handled = Some(now);

        let step = inner.config.key_seek_step;
        let current = inner.current_time();
        let target = match key {
            KeyPress::SeekBack => (current - step).max(0.0),
            KeyPress::SeekForward => current + step,
        };
        debug!("{:?}: seeking from {:.2}s to {:.2}s", key, current, target);
        inner.seek(target, true);
    }
    debug!("Keyboard handler for selection {} stopped", generation);
}

#[cfg(test)]
mod tests;
