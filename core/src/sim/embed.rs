use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use log::debug;
use parking_lot::Mutex;

use super::Playhead;
use crate::error::PlayerError;
use crate::host::{EmbedEvent, EmbedEventSender, EmbedPlayer, EmbedScriptHost};

const UNSTARTED: i32 = -1;
const ENDED: i32 = 0;
const PLAYING: i32 = 1;
const PAUSED: i32 = 2;

#[derive(Debug, Clone)]
struct EmbedSettings {
    api_preloaded: bool,
    load_delay: Duration,
    failing_loads: usize,
    ready_after: Option<Duration>,
    construction_error: Option<String>,
    panic_on_play: bool,
    duration: Option<f64>,
}

impl Default for EmbedSettings {
    fn default() -> Self {
        Self {
            api_preloaded: false,
            load_delay: Duration::from_millis(20),
            failing_loads: 0,
            ready_after: Some(Duration::from_millis(50)),
            construction_error: None,
            panic_on_play: false,
            duration: None,
        }
    }
}

#[derive(Default)]
struct EmbedShared {
    settings: Mutex<EmbedSettings>,
    script_requests: AtomicUsize,
    api_loaded: AtomicBool,
    probes: Mutex<Vec<EmbedProbe>>,
}

/// Simulated provider of the embed script and its players
#[derive(Clone, Default)]
pub struct SimEmbedHost {
    shared: Arc<EmbedShared>,
}

impl SimEmbedHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn configure(self, f: impl FnOnce(&mut EmbedSettings)) -> Self {
        f(&mut self.shared.settings.lock());
        self
    }

    /// Pretend the player API object already exists
    pub fn with_api_preloaded(self) -> Self {
        self.configure(|s| s.api_preloaded = true)
    }

    pub fn with_load_delay(self, delay: Duration) -> Self {
        self.configure(|s| s.load_delay = delay)
    }

    /// Fail the next `count` script loads
    pub fn failing_script_loads(self, count: usize) -> Self {
        self.configure(|s| s.failing_loads = count)
    }

    /// Players report ready this long after construction
    pub fn with_ready_after(self, delay: Duration) -> Self {
        self.configure(|s| s.ready_after = Some(delay))
    }

    /// Players only report ready when a probe fires [`EmbedEvent::Ready`]
    pub fn with_manual_ready(self) -> Self {
        self.configure(|s| s.ready_after = None)
    }

    pub fn failing_construction(self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.configure(|s| s.construction_error = Some(message))
    }

    pub fn panicking_on_play(self) -> Self {
        self.configure(|s| s.panic_on_play = true)
    }

    pub fn with_duration(self, seconds: f64) -> Self {
        self.configure(|s| s.duration = Some(seconds))
    }

    /// How many times the script was requested
    pub fn script_requests(&self) -> usize {
        self.shared.script_requests.load(Ordering::SeqCst)
    }

    /// Every player constructed so far, oldest first
    /// Probes for players that are not destroyed, plus the newest one
    pub fn probes(&self) -> Vec<EmbedProbe> {
        self.shared.probes.lock().clone()
    }

    pub fn last_probe(&self) -> Option<EmbedProbe> {
        self.shared.probes.lock().last().cloned()
    }
}

impl EmbedScriptHost for SimEmbedHost {
    fn api_available(&self) -> bool {
        self.shared.settings.lock().api_preloaded || self.shared.api_loaded.load(Ordering::SeqCst)
    }

    fn load_script(&self, src: &str) -> BoxFuture<'static, Result<(), PlayerError>> {
        self.shared.script_requests.fetch_add(1, Ordering::SeqCst);
        let (delay, fail) = {
            let mut settings = self.shared.settings.lock();
            let fail = settings.failing_loads > 0;
            if fail {
                settings.failing_loads -= 1;
            }
            (settings.load_delay, fail)
        };
        debug!("Simulating script load of {} (fail: {})", src, fail);

        let shared = Arc::clone(&self.shared);
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            if fail {
                return Err(PlayerError::ScriptLoad("network error".to_string()));
            }
            shared.api_loaded.store(true, Ordering::SeqCst);
            Ok(())
        })
    }

    fn create_player(
        &self,
        container_id: &str,
        video_id: &str,
        events: EmbedEventSender,
    ) -> Result<Box<dyn EmbedPlayer>, PlayerError> {
        let settings = self.shared.settings.lock().clone();
        if let Some(message) = settings.construction_error {
            return Err(PlayerError::Construction {
                backend: "embedded",
                message,
            });
        }

        let model = Arc::new(Mutex::new(EmbedModel::new(settings.duration)));
        let probe = EmbedProbe {
            container_id: container_id.to_string(),
            video_id: video_id.to_string(),
            model: Arc::clone(&model),
            events: events.clone(),
        };
        {
            let mut probes = self.shared.probes.lock();
            probes.retain(|probe| !probe.is_destroyed());
            probes.push(probe);
        }

        if let Some(delay) = settings.ready_after {
            let ready = events.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = ready.send(EmbedEvent::Ready);
            });
        }

        Ok(Box::new(SimEmbedPlayer {
            model,
            events,
            panic_on_play: settings.panic_on_play,
        }))
    }
}

#[derive(Debug)]
struct EmbedModel {
    playhead: Playhead,
    code: i32,
    play_calls: usize,
    pause_calls: usize,
    time_queries: usize,
    seeks: Vec<(f64, bool)>,
    destroyed: bool,
}

impl EmbedModel {
    fn new(duration: Option<f64>) -> Self {
        Self {
            playhead: Playhead::new(duration),
            code: UNSTARTED,
            play_calls: 0,
            pause_calls: 0,
            time_queries: 0,
            seeks: Vec::new(),
            destroyed: false,
        }
    }

    fn state_code(&self) -> i32 {
        if self.code == PLAYING && self.playhead.finished() {
            ENDED
        } else {
            self.code
        }
    }
}

struct SimEmbedPlayer {
    model: Arc<Mutex<EmbedModel>>,
    events: EmbedEventSender,
    panic_on_play: bool,
}

impl EmbedPlayer for SimEmbedPlayer {
    fn play_video(&mut self) -> Result<(), PlayerError> {
        if self.panic_on_play {
            panic!("player object is gone");
        }
        let mut model = self.model.lock();
        model.play_calls += 1;
        model.playhead.play();
        model.code = PLAYING;
        let _ = self.events.send(EmbedEvent::StateChange(PLAYING));
        Ok(())
    }

    fn pause_video(&mut self) -> Result<(), PlayerError> {
        let mut model = self.model.lock();
        model.pause_calls += 1;
        model.playhead.pause();
        model.code = PAUSED;
        let _ = self.events.send(EmbedEvent::StateChange(PAUSED));
        Ok(())
    }

    fn seek_to(&mut self, seconds: f64, allow_seek_ahead: bool) -> Result<(), PlayerError> {
        let mut model = self.model.lock();
        model.seeks.push((seconds, allow_seek_ahead));
        model.playhead.seek(seconds);
        Ok(())
    }

    fn current_time(&self) -> Result<f64, PlayerError> {
        let mut model = self.model.lock();
        model.time_queries += 1;
        Ok(model.playhead.position())
    }

    fn player_state(&self) -> Result<i32, PlayerError> {
        Ok(self.model.lock().state_code())
    }

    fn destroy(&mut self) {
        let mut model = self.model.lock();
        model.playhead.pause();
        model.destroyed = true;
    }
}

/// Observation and control handle for one simulated embedded player
#[derive(Clone)]
pub struct EmbedProbe {
    container_id: String,
    video_id: String,
    model: Arc<Mutex<EmbedModel>>,
    events: EmbedEventSender,
}

impl EmbedProbe {
    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    /// Raise a backend event as if the player had
    pub fn fire(&self, event: EmbedEvent) {
        let _ = self.events.send(event);
    }

    /// Force the state code the player reports from now on
    pub fn set_state_code(&self, code: i32) {
        let mut model = self.model.lock();
        match code {
            PLAYING => model.playhead.play(),
            _ => model.playhead.pause(),
        }
        model.code = code;
    }

    pub fn play_calls(&self) -> usize {
        self.model.lock().play_calls
    }

    pub fn pause_calls(&self) -> usize {
        self.model.lock().pause_calls
    }

    pub fn time_queries(&self) -> usize {
        self.model.lock().time_queries
    }

    pub fn seeks(&self) -> Vec<(f64, bool)> {
        self.model.lock().seeks.clone()
    }

    pub fn is_destroyed(&self) -> bool {
        self.model.lock().destroyed
    }
}
