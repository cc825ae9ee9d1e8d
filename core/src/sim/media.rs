use std::sync::Arc;
use std::time::Duration;

use log::debug;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::Playhead;
use crate::error::PlayerError;
use crate::host::{MediaElement, MediaEvent, MediaEventSender, MediaHost, PlayRejection};

#[derive(Debug, Clone)]
struct MediaSettings {
    autoplay_blocked: bool,
    metadata_after: Option<Duration>,
    duration: Option<f64>,
    time_update_every: Duration,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            autoplay_blocked: false,
            metadata_after: Some(Duration::from_millis(30)),
            duration: None,
            time_update_every: Duration::from_millis(250),
        }
    }
}

#[derive(Default)]
struct MediaShared {
    settings: Mutex<MediaSettings>,
    probes: Mutex<Vec<MediaProbe>>,
}

/// Simulated media element factory
#[derive(Clone, Default)]
pub struct SimMediaHost {
    shared: Arc<MediaShared>,
}

impl SimMediaHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn configure(self, f: impl FnOnce(&mut MediaSettings)) -> Self {
        f(&mut self.shared.settings.lock());
        self
    }

    /// Reject every `play()` the way an autoplay policy does
    pub fn with_autoplay_blocked(self) -> Self {
        self.configure(|s| s.autoplay_blocked = true)
    }

    /// Metadata only loads when a probe fires it
    pub fn with_manual_metadata(self) -> Self {
        self.configure(|s| s.metadata_after = None)
    }

    pub fn with_duration(self, seconds: f64) -> Self {
        self.configure(|s| s.duration = Some(seconds))
    }

    /// Probes for elements that still hold a source, plus the newest one
    pub fn probes(&self) -> Vec<MediaProbe> {
        self.shared.probes.lock().clone()
    }

    pub fn last_probe(&self) -> Option<MediaProbe> {
        self.shared.probes.lock().last().cloned()
    }
}

impl MediaHost for SimMediaHost {
    fn create_element(
        &self,
        src: &str,
        events: MediaEventSender,
    ) -> Result<Box<dyn MediaElement>, PlayerError> {
        let settings = self.shared.settings.lock().clone();
        let model = Arc::new(Mutex::new(MediaModel {
            src: Some(src.to_string()),
            playhead: Playhead::new(settings.duration),
            autoplay_blocked: settings.autoplay_blocked,
            play_attempts: 0,
            pause_calls: 0,
            released: false,
        }));
        {
            let mut probes = self.shared.probes.lock();
            probes.retain(|probe| !probe.released());
            probes.push(MediaProbe {
                model: Arc::clone(&model),
                events: events.clone(),
            });
        }

        if let Some(delay) = settings.metadata_after {
            let loaded = events.clone();
            let duration = settings.duration;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = loaded.send(MediaEvent::LoadedMetadata { duration });
            });
        }

        Ok(Box::new(SimMediaElement {
            model,
            events,
            tick: settings.time_update_every,
            ticker: None,
        }))
    }
}

#[derive(Debug)]
struct MediaModel {
    src: Option<String>,
    playhead: Playhead,
    autoplay_blocked: bool,
    play_attempts: usize,
    pause_calls: usize,
    released: bool,
}

struct SimMediaElement {
    model: Arc<Mutex<MediaModel>>,
    events: MediaEventSender,
    tick: Duration,
    ticker: Option<JoinHandle<()>>,
}

impl SimMediaElement {
    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    /// Emit time updates while playing, then `ended` once the playhead
    /// reaches the duration
    fn start_ticker(&mut self) {
        self.stop_ticker();
        let model = Arc::clone(&self.model);
        let events = self.events.clone();
        let tick = self.tick;
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;
            loop {
                interval.tick().await;
                let (position, finished) = {
                    let model = model.lock();
                    (model.playhead.position(), model.playhead.finished())
                };
                let _ = events.send(MediaEvent::TimeUpdate(position));
                if finished {
                    let _ = events.send(MediaEvent::Pause);
                    let _ = events.send(MediaEvent::Ended);
                    break;
                }
            }
        }));
    }
}

impl MediaElement for SimMediaElement {
    fn play(&mut self) -> Result<(), PlayRejection> {
        {
            let mut model = self.model.lock();
            model.play_attempts += 1;
            if model.autoplay_blocked {
                return Err(PlayRejection::NotAllowed(
                    "play() can only be initiated by a user gesture".to_string(),
                ));
            }
            if model.src.is_none() {
                return Err(PlayRejection::Failed("no source".to_string()));
            }
            if model.playhead.is_playing() {
                return Ok(());
            }
            model.playhead.play();
        }
        let _ = self.events.send(MediaEvent::Play);
        self.start_ticker();
        Ok(())
    }

    fn pause(&mut self) {
        let was_playing = {
            let mut model = self.model.lock();
            model.pause_calls += 1;
            let was_playing = model.playhead.is_playing();
            model.playhead.pause();
            was_playing
        };
        self.stop_ticker();
        if was_playing {
            let _ = self.events.send(MediaEvent::Pause);
        }
    }

    fn set_current_time(&mut self, seconds: f64) {
        let position = {
            let mut model = self.model.lock();
            model.playhead.seek(seconds);
            model.playhead.position()
        };
        let _ = self.events.send(MediaEvent::TimeUpdate(position));
    }

    fn current_time(&self) -> f64 {
        self.model.lock().playhead.position()
    }

    fn paused(&self) -> bool {
        !self.model.lock().playhead.is_playing()
    }

    fn ended(&self) -> bool {
        self.model.lock().playhead.finished()
    }

    fn clear_source(&mut self) {
        self.stop_ticker();
        let mut model = self.model.lock();
        model.src = None;
        model.released = true;
    }

    fn load(&mut self) {
        let mut model = self.model.lock();
        if model.src.is_none() {
            debug!("Reloaded media element without a source");
            model.playhead = Playhead::new(None);
        }
    }
}

impl Drop for SimMediaElement {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

/// Observation and control handle for one simulated media element
#[derive(Clone)]
pub struct MediaProbe {
    model: Arc<Mutex<MediaModel>>,
    events: MediaEventSender,
}

impl MediaProbe {
    /// Raise a native event as if the element had
    pub fn fire(&self, event: MediaEvent) {
        let _ = self.events.send(event);
    }

    pub fn src(&self) -> Option<String> {
        self.model.lock().src.clone()
    }

    pub fn play_attempts(&self) -> usize {
        self.model.lock().play_attempts
    }

    pub fn pause_calls(&self) -> usize {
        self.model.lock().pause_calls
    }

    pub fn is_paused(&self) -> bool {
        !self.model.lock().playhead.is_playing()
    }

    /// Whether the element's resource was released
    pub fn released(&self) -> bool {
        self.model.lock().released
    }
}
