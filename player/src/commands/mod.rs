use anyhow::{Result, anyhow};
use player_core::KeyPress;
use ratatui::style::Color;

use crate::app::{App, AppView};
use crate::ui::format_duration;

/// Command handler for the application
pub struct CommandHandler;

impl CommandHandler {
    /// Parse and execute a command
    pub fn execute(app: &mut App, command_str: &str) -> Result<()> {
        let parts: Vec<&str> = command_str.trim().splitn(2, ' ').collect();
        let cmd = parts[0].to_lowercase();
        let args = parts.get(1).map(|s| s.trim());

        match cmd.as_str() {
            "seek" | "s" => {
                let args = args.ok_or_else(|| anyhow!("Seek command requires a position argument"))?;
                let position = parse_position(args)?;
                app.player.seek(position, true);
            }
            "back" => app.press(KeyPress::SeekBack),
            "forward" | "fwd" => app.press(KeyPress::SeekForward),
            "play" | "p" => app.player.play(),
            "pause" => app.player.pause(),
            "toggle" | "t" => app.player.toggle(),
            "open" | "o" => match args {
                Some(query) => app.open_video(query)?,
                None => app.open_selected(),
            },
            "next" | "n" => app.step_video(true),
            "prev" | "previous" => app.step_video(false),
            "close" | "unload" => app.close_video(),
            "state" => {
                let state = app.player.state();
                app.set_status(format!("State: {:?} (code {})", state, state.code()), Color::Cyan);
            }
            "time" => {
                let time = app.player.current_time();
                app.set_status(format!("Time: {}", format_duration(time)), Color::Cyan);
            }
            "help" | "h" | "?" => {
                app.show_help = true;
            }
            "quit" | "exit" => {
                if app.view == AppView::Player {
                    app.close_video();
                } else {
                    app.should_quit = true;
                }
            }
            "" => {
                // Empty command, do nothing
            }
            _ => {
                return Err(anyhow!("Unknown command: {}", cmd));
            }
        }

        Ok(())
    }
}

/// Accept plain seconds or `MM:SS` / `HH:MM:SS`. Negative positions clamp
/// to the start.
fn parse_position(text: &str) -> Result<f64> {
    let invalid = || anyhow!("Invalid position: {}", text);
    let mut seconds = 0.0;
    for part in text.split(':') {
        let value: f64 = part.trim().parse().map_err(|_| invalid())?;
        if !value.is_finite() {
            return Err(invalid());
        }
        seconds = seconds * 60.0 + value;
    }
    Ok(seconds.max(0.0))
}

/// Handle a command string entered by the user
pub fn handle_command(app: &mut App, command: &str) -> Result<()> {
    let result = CommandHandler::execute(app, command);

    if result.is_ok() && app.view == AppView::Player && !app.player.is_ready() {
        let first = command.split_whitespace().next().unwrap_or_default();
        if matches!(first, "seek" | "s" | "play" | "p" | "pause" | "toggle" | "t") {
            app.set_status("Player not ready yet, command ignored", Color::Yellow);
        }
    }

    result
}
