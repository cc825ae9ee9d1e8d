use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Event utility functions
pub mod event_utils {
    use super::*;
    use player_core::KeyPress;

    /// Check if a key event matches Ctrl+C or Ctrl+Q (terminate)
    pub fn is_terminate_event(event: &Event) -> bool {
        matches!(
            event,
            Event::Key(KeyEvent {
                code: KeyCode::Char('c') | KeyCode::Char('q'),
                modifiers: KeyModifiers::CONTROL,
                ..
            })
        )
    }

    /// Only presses count; some terminals also report releases and repeats
    pub fn is_press(key: &KeyEvent) -> bool {
        key.kind == KeyEventKind::Press
    }

    /// Arrow keys map to the player's seek shortcuts
    pub fn seek_shortcut(key: &KeyEvent) -> Option<KeyPress> {
        match key.code {
            KeyCode::Left => Some(KeyPress::SeekBack),
            KeyCode::Right => Some(KeyPress::SeekForward),
            _ => None,
        }
    }
}
