use std::sync::Arc;
use std::time::Duration;

use log::debug;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

use super::Playhead;
use crate::error::PlayerError;
use crate::host::{EmbedFrame, FrameHost, InboundMessage, MessageSender};
use crate::media::message::origin_matches;

#[derive(Debug, Clone)]
struct FrameSettings {
    origin: String,
    responsive: bool,
    announce_ready_after: Option<Duration>,
    time_update_every: Option<Duration>,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            origin: "https://app.veo.co".to_string(),
            responsive: false,
            announce_ready_after: None,
            time_update_every: None,
        }
    }
}

#[derive(Default)]
struct FrameShared {
    settings: Mutex<FrameSettings>,
    probes: Mutex<Vec<FrameProbe>>,
}

/// Simulated third-party frame.
///
/// By default it is silent, like an embed that ignores the messaging
/// channel. It can be made to announce readiness, answer commands with
/// state messages and broadcast its playhead.
#[derive(Clone, Default)]
pub struct SimFrameHost {
    shared: Arc<FrameShared>,
}

impl SimFrameHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn configure(self, f: impl FnOnce(&mut FrameSettings)) -> Self {
        f(&mut self.shared.settings.lock());
        self
    }

    /// Origin the frame's messages come from
    pub fn with_origin(self, origin: impl Into<String>) -> Self {
        let origin = origin.into();
        self.configure(|s| s.origin = origin)
    }

    /// Answer play, pause and seek commands with state messages
    pub fn responsive(self) -> Self {
        self.configure(|s| s.responsive = true)
    }

    pub fn announcing_ready_after(self, delay: Duration) -> Self {
        self.configure(|s| s.announce_ready_after = Some(delay))
    }

    pub fn with_time_updates(self, every: Duration) -> Self {
        self.configure(|s| s.time_update_every = Some(every))
    }

    /// Probes for frames that are still attached, plus the newest one
    pub fn probes(&self) -> Vec<FrameProbe> {
        self.shared.probes.lock().clone()
    }

    pub fn last_probe(&self) -> Option<FrameProbe> {
        self.shared.probes.lock().last().cloned()
    }
}

impl FrameHost for SimFrameHost {
    fn create_frame(
        &self,
        src: &str,
        messages: MessageSender,
    ) -> Result<Box<dyn EmbedFrame>, PlayerError> {
        let settings = self.shared.settings.lock().clone();
        let model = Arc::new(Mutex::new(FrameModel {
            playhead: Playhead::new(None),
            posted: Vec::new(),
            released: false,
        }));
        {
            let mut probes = self.shared.probes.lock();
            probes.retain(|probe| !probe.is_released());
            probes.push(FrameProbe {
                src: src.to_string(),
                model: Arc::clone(&model),
                messages: messages.clone(),
            });
        }

        let mut tasks = Vec::new();
        if let Some(delay) = settings.announce_ready_after {
            let ready = messages.clone();
            let origin = settings.origin.clone();
            tasks.push(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = ready.send(InboundMessage::text(origin, r#"{"event":"ready"}"#));
            }));
        }
        if let Some(every) = settings.time_update_every {
            let updates = messages.clone();
            let origin = settings.origin.clone();
            let model = Arc::clone(&model);
            tasks.push(tokio::spawn(async move {
                let mut interval = tokio::time::interval(every);
                loop {
                    interval.tick().await;
                    let (playing, position) = {
                        let model = model.lock();
                        (model.playhead.is_playing(), model.playhead.position())
                    };
                    if playing {
                        let data = json!({"type": "timeupdate", "data": {"currentTime": position}});
                        if updates.send(InboundMessage::structured(origin.clone(), data)).is_err() {
                            break;
                        }
                    }
                }
            }));
        }

        Ok(Box::new(SimFrame {
            settings,
            model,
            messages,
            tasks,
        }))
    }
}

#[derive(Debug)]
struct FrameModel {
    playhead: Playhead,
    posted: Vec<(String, String)>,
    released: bool,
}

struct SimFrame {
    settings: FrameSettings,
    model: Arc<Mutex<FrameModel>>,
    messages: MessageSender,
    tasks: Vec<JoinHandle<()>>,
}

impl SimFrame {
    fn reply(&self, data: Value) {
        let _ = self
            .messages
            .send(InboundMessage::structured(self.settings.origin.clone(), data));
    }

    /// Apply a command the way a cooperative embed would
    fn apply(&self, command: &Value) {
        let method = command.get("method").and_then(Value::as_str);
        let reply = {
            let mut model = self.model.lock();
            match method {
                Some("play") => {
                    model.playhead.play();
                    json!({"event": "playing", "currentTime": model.playhead.position()})
                }
                Some("pause") => {
                    model.playhead.pause();
                    json!({"event": "paused", "currentTime": model.playhead.position()})
                }
                Some("seekTo") => {
                    let seconds = command.get("value").and_then(Value::as_f64).unwrap_or(0.0);
                    model.playhead.seek(seconds);
                    json!({"event": "seeked", "currentTime": model.playhead.position()})
                }
                _ => return,
            }
        };
        if self.settings.responsive {
            self.reply(reply);
        }
    }
}

impl EmbedFrame for SimFrame {
    fn post_message(&mut self, message: &str, target_origin: &str) -> Result<(), PlayerError> {
        self.model
            .lock()
            .posted
            .push((message.to_string(), target_origin.to_string()));

        // A browser silently drops messages addressed to another origin
        if !origin_matches(&self.settings.origin, target_origin) {
            debug!("Frame dropped message addressed to {}", target_origin);
            return Ok(());
        }
        match serde_json::from_str::<Value>(message) {
            Ok(command) => self.apply(&command),
            Err(e) => debug!("Frame ignored unparseable command: {}", e),
        }
        Ok(())
    }
}

impl Drop for SimFrame {
    fn drop(&mut self) {
        self.model.lock().released = true;
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Observation and control handle for one simulated frame
#[derive(Clone)]
pub struct FrameProbe {
    src: String,
    model: Arc<Mutex<FrameModel>>,
    messages: MessageSender,
}

impl FrameProbe {
    pub fn src(&self) -> &str {
        &self.src
    }

    /// Deliver a message to the window as if any document had posted it
    pub fn inject(&self, message: InboundMessage) {
        let _ = self.messages.send(message);
    }

    /// Every `(message, target_origin)` posted to the frame
    pub fn posted(&self) -> Vec<(String, String)> {
        self.model.lock().posted.clone()
    }

    /// Whether the frame was removed from the document
    pub fn is_released(&self) -> bool {
        self.model.lock().released
    }

    /// Where the frame's own playhead is
    pub fn position(&self) -> f64 {
        self.model.lock().playhead.position()
    }
}
