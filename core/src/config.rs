use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Tunables for the playback facade and its backends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Address of the shared embed player script
    pub embed_script_url: String,
    /// How often the embedded player is sampled for time and state (ms)
    pub poll_interval_ms: u64,
    /// Delay before re-checking that a play command took effect (ms)
    pub play_confirm_delay_ms: u64,
    /// Base address of the cross-document embed
    pub frame_base_url: String,
    /// Origin inbound frame messages must come from
    pub frame_origin: String,
    /// Assumed time for the cross-document embed to become ready (ms)
    pub frame_ready_delay_ms: u64,
    /// How often the cached cross-document time is re-emitted (ms)
    pub frame_fallback_poll_ms: u64,
    /// Minimum spacing between handled keyboard seeks (ms)
    pub key_debounce_ms: u64,
    /// Seconds moved by one keyboard seek
    pub key_seek_step: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            embed_script_url: "https://www.youtube.com/iframe_api".to_string(),
            poll_interval_ms: 200,
            play_confirm_delay_ms: 100,
            frame_base_url: "https://app.veo.co/embed/matches/".to_string(),
            frame_origin: "https://app.veo.co".to_string(),
            frame_ready_delay_ms: 3000,
            frame_fallback_poll_ms: 1000,
            key_debounce_ms: 200,
            key_seek_step: 5.0,
        }
    }
}

impl PlayerConfig {
    /// Load a JSON config file; missing keys keep their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid player config in {}", path.display()))?;
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn play_confirm_delay(&self) -> Duration {
        Duration::from_millis(self.play_confirm_delay_ms)
    }

    pub fn frame_ready_delay(&self) -> Duration {
        Duration::from_millis(self.frame_ready_delay_ms)
    }

    pub fn frame_fallback_poll(&self) -> Duration {
        Duration::from_millis(self.frame_fallback_poll_ms.max(1))
    }

    pub fn key_debounce(&self) -> Duration {
        Duration::from_millis(self.key_debounce_ms)
    }
}
