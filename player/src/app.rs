use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent};
use log::{debug, info};
use parking_lot::Mutex;
use player_core::{
    KeyPress, PlayerCallbacks, PlayerConfig, PlayerHost, PlayerState, Video, VideoPlayer,
};
use ratatui::style::Color;
use tokio::sync::broadcast;

use crate::events::event_utils;

const EVENT_LOG_CAPACITY: usize = 200;

/// One line of the on-screen event log
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub message: String,
    pub is_error: bool,
}

/// What the player callbacks have reported so far
#[derive(Debug, Default)]
pub struct PlaybackFeed {
    pub ready: bool,
    pub time: f64,
    pub state: Option<PlayerState>,
    pub log: VecDeque<LogEntry>,
}

impl PlaybackFeed {
    pub fn record(&mut self, message: impl Into<String>, is_error: bool) {
        if self.log.len() == EVENT_LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(LogEntry {
            at: Local::now(),
            message: message.into(),
            is_error,
        });
    }

    fn reset(&mut self) {
        self.ready = false;
        self.time = 0.0;
        self.state = None;
    }
}

pub type SharedFeed = Arc<Mutex<PlaybackFeed>>;

/// Callbacks that mirror every player notification into `feed`.
/// Time updates are too frequent for the log and only update the clock.
pub fn feed_callbacks(feed: &SharedFeed) -> PlayerCallbacks {
    let ready = Arc::clone(feed);
    let time = Arc::clone(feed);
    let state = Arc::clone(feed);
    let play = Arc::clone(feed);
    let pause = Arc::clone(feed);
    let error = Arc::clone(feed);

    PlayerCallbacks::new()
        .on_ready(move || {
            let mut feed = ready.lock();
            feed.ready = true;
            feed.record("ready", false);
        })
        .on_time_update(move |seconds| time.lock().time = seconds)
        .on_state_change(move |s| {
            let mut feed = state.lock();
            feed.state = Some(s);
            feed.record(format!("state changed to {:?}", s), false);
        })
        .on_play(move || play.lock().record("play", false))
        .on_pause(move || pause.lock().record("pause", false))
        .on_error(move |e| error.lock().record(e.to_string(), true))
}

/// Application views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppView {
    /// Video library
    Library,
    /// Active video
    Player,
}

// App state
pub struct App {
    /// Playback facade driving the active video
    pub player: VideoPlayer,
    /// Videos that can be opened
    pub library: Vec<Video>,
    /// Highlighted library entry
    pub selected: usize,
    /// Current application view
    pub view: AppView,
    /// Callback output shared with the player
    pub feed: SharedFeed,
    /// Seek shortcuts, consumed by the player's keyboard handler
    pub keys: broadcast::Sender<KeyPress>,
    /// Status message to display
    pub status_message: Option<(String, Instant, Color)>,
    /// Whether the app should exit
    pub should_quit: bool,
    /// Help dialog visibility
    pub show_help: bool,
    /// Whether command mode is active
    pub command_mode: bool,
    /// Command buffer for command mode
    pub command_buffer: String,
}

impl App {
    /// Must be called from within a tokio runtime
    pub fn new(host: PlayerHost, config: PlayerConfig, library: Vec<Video>) -> Self {
        let (keys, _) = broadcast::channel(32);
        let feed = SharedFeed::default();
        let player = VideoPlayer::new(
            host.with_keys(keys.clone()),
            config,
            feed_callbacks(&feed),
        );

        Self {
            player,
            library,
            selected: 0,
            view: AppView::Library,
            feed,
            keys,
            status_message: None,
            should_quit: false,
            show_help: false,
            command_mode: false,
            command_buffer: String::new(),
        }
    }

    pub fn set_status(&mut self, message: impl Into<String>, color: Color) {
        self.status_message = Some((message.into(), Instant::now(), color));
    }

    /// Find a library entry by id or by its 1-based position
    pub fn find_video(&self, query: &str) -> Option<usize> {
        self.library
            .iter()
            .position(|video| video.id == query)
            .or_else(|| {
                query
                    .parse::<usize>()
                    .ok()
                    .filter(|n| (1..=self.library.len()).contains(n))
                    .map(|n| n - 1)
            })
    }

    /// Open the library entry matching `query`
    pub fn open_video(&mut self, query: &str) -> Result<()> {
        let index = self
            .find_video(query)
            .ok_or_else(|| anyhow!("No video matches '{}'", query))?;
        self.open_index(index);
        Ok(())
    }

    pub fn open_selected(&mut self) {
        if !self.library.is_empty() {
            self.open_index(self.selected);
        }
    }

    fn open_index(&mut self, index: usize) {
        let video = self.library[index].clone();
        info!("Opening {} ({:?})", video.id, video.source);
        self.selected = index;
        {
            let mut feed = self.feed.lock();
            feed.reset();
            feed.record(format!("opened {}", video.title), false);
        }
        self.set_status(format!("Loading {}", video.title), Color::Yellow);
        self.player.load(Some(video));
        self.view = AppView::Player;
    }

    /// Open the entry after (or before) the current one, wrapping around
    pub fn step_video(&mut self, forward: bool) {
        if self.library.is_empty() {
            return;
        }
        let len = self.library.len();
        let index = if forward {
            (self.selected + 1) % len
        } else {
            (self.selected + len - 1) % len
        };
        self.open_index(index);
    }

    /// Unload the active video and go back to the library
    pub fn close_video(&mut self) {
        self.player.unload();
        self.feed.lock().reset();
        self.view = AppView::Library;
        self.set_status("Video closed", Color::Blue);
    }

    /// Forward a seek shortcut to the player's keyboard handler
    pub fn press(&mut self, key: KeyPress) {
        if self.keys.send(key).is_err() {
            debug!("No keyboard handler attached, dropping {:?}", key);
        }
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> Result<()> {
        if self.command_mode {
            match key.code {
                KeyCode::Esc => self.exit_command_mode(),
                KeyCode::Backspace => {
                    self.command_buffer.pop();
                }
                KeyCode::Char(c) => self.command_buffer.push(c),
                _ => {}
            }
            return Ok(());
        }

        if self.show_help {
            self.show_help = false;
            return Ok(());
        }

        match self.view {
            AppView::Library => self.handle_library_key(key),
            AppView::Player => self.handle_player_key(key),
        }
        Ok(())
    }

    fn handle_library_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.library.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Enter => self.open_selected(),
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char('q') => self.should_quit = true,
            _ => {}
        }
    }

    fn handle_player_key(&mut self, key: KeyEvent) {
        if let Some(press) = event_utils::seek_shortcut(&key) {
            self.press(press);
            return;
        }
        match key.code {
            KeyCode::Char(' ') | KeyCode::Char('p') => self.player.toggle(),
            KeyCode::Char('n') => self.step_video(true),
            KeyCode::Char('b') => self.step_video(false),
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Esc | KeyCode::Char('q') => self.close_video(),
            _ => {}
        }
    }

    pub fn is_command_mode(&self) -> bool {
        self.command_mode
    }

    pub fn enter_command_mode(&mut self) {
        self.command_mode = true;
        self.command_buffer.clear();
    }

    pub fn exit_command_mode(&mut self) {
        self.command_mode = false;
    }

    pub fn get_command_buffer(&self) -> &str {
        &self.command_buffer
    }
}
