//! Readiness, generation tracking and event plumbing shared by the adapters.

use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::PlayerError;
use crate::video::PlayerState;

/// Something the facade reports to its observer callbacks
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PlayerEvent {
    Ready,
    TimeUpdate(f64),
    StateChange(PlayerState),
    Play,
    Pause,
    Error(PlayerError),
}

/// An event tagged with the selection that produced it
#[derive(Debug)]
pub(crate) struct Envelope {
    pub generation: u64,
    pub event: PlayerEvent,
}

pub(crate) type EnvelopeSender = mpsc::UnboundedSender<Envelope>;

/// Current selection marker and readiness flag.
///
/// Kept behind one lock so a late readiness signal cannot slip in between a
/// selection change and the reset of the flag.
#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    generation: u64,
    ready: bool,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct SharedLifecycle(Arc<Mutex<Lifecycle>>);

impl SharedLifecycle {
    /// Invalidate the current selection and start a new one
    pub fn advance(&self) -> u64 {
        let mut lifecycle = self.0.lock();
        lifecycle.generation += 1;
        lifecycle.ready = false;
        lifecycle.generation
    }

    pub fn generation(&self) -> u64 {
        self.0.lock().generation
    }

    pub fn is_ready(&self) -> bool {
        self.0.lock().ready
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.0.lock().generation == generation
    }

    fn mark_ready(&self, generation: u64) -> bool {
        let mut lifecycle = self.0.lock();
        if lifecycle.generation != generation || lifecycle.ready {
            return false;
        }
        lifecycle.ready = true;
        true
    }
}

/// One adapter's link back to the facade, valid for a single selection
#[derive(Debug, Clone)]
pub(crate) struct Session {
    generation: u64,
    lifecycle: SharedLifecycle,
    events: EnvelopeSender,
}

impl Session {
    pub fn new(generation: u64, lifecycle: SharedLifecycle, events: EnvelopeSender) -> Self {
        Self {
            generation,
            lifecycle,
            events,
        }
    }

    pub fn is_current(&self) -> bool {
        self.lifecycle.is_current(self.generation)
    }

    /// Ready and still the active selection
    pub fn is_ready(&self) -> bool {
        let lifecycle = self.lifecycle.0.lock();
        lifecycle.generation == self.generation && lifecycle.ready
    }

    /// Flip readiness on for this selection. Returns false when the
    /// selection is stale or was already ready, in which case nothing fires.
    pub fn mark_ready(&self) -> bool {
        if !self.lifecycle.mark_ready(self.generation) {
            debug!("Ignoring readiness for selection {}", self.generation);
            return false;
        }
        self.emit(PlayerEvent::Ready);
        true
    }

    pub fn emit(&self, event: PlayerEvent) {
        if !self.is_current() {
            return;
        }
        let _ = self.events.send(Envelope {
            generation: self.generation,
            event,
        });
    }

    pub fn emit_all(&self, events: Vec<PlayerEvent>) {
        for event in events {
            self.emit(event);
        }
    }

    pub fn time_update(&self, seconds: f64) {
        self.emit(PlayerEvent::TimeUpdate(seconds));
    }

    pub fn error(&self, error: PlayerError) {
        self.emit(PlayerEvent::Error(error));
    }
}

/// Turns sampled states into edge-triggered notifications
#[derive(Debug, Default)]
pub(crate) struct StateTracker {
    last: Option<PlayerState>,
}

impl StateTracker {
    pub fn last(&self) -> Option<PlayerState> {
        self.last
    }

    /// Record a state sample, returning the notifications it causes.
    /// Repeating the previous state causes none.
    pub fn observe(&mut self, state: PlayerState) -> Vec<PlayerEvent> {
        let previous = self.last;
        if previous == Some(state) {
            return Vec::new();
        }
        self.last = Some(state);

        let mut events = vec![PlayerEvent::StateChange(state)];
        if state == PlayerState::Playing {
            events.push(PlayerEvent::Play);
        } else if state.is_halted() && !previous.is_some_and(PlayerState::is_halted) {
            events.push(PlayerEvent::Pause);
        }
        events
    }

    /// The notifications the current state would cause if it were new
    pub fn replay(&self) -> Vec<PlayerEvent> {
        self.last
            .map(|state| StateTracker::default().observe(state))
            .unwrap_or_default()
    }
}
