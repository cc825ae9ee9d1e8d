use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget, Wrap},
};
use player_core::{PlayerState, StateReport};
use std::time::Duration;
use unicode_width::UnicodeWidthStr;

/// Format duration as HH:MM:SS
pub fn format_duration(duration: f64) -> String {
    let total_seconds = duration.max(0.0).round() as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Short label and colour for a reported state
pub fn state_label(report: StateReport) -> (&'static str, Color) {
    match report {
        StateReport::Known(PlayerState::Playing) => ("▶ playing", Color::Green),
        StateReport::Known(PlayerState::Paused) => ("⏸ paused", Color::Yellow),
        StateReport::Known(PlayerState::Ended) => ("■ ended", Color::Gray),
        StateReport::Known(PlayerState::Buffering) => ("… buffering", Color::Cyan),
        StateReport::Known(PlayerState::Cued) => ("○ cued", Color::Cyan),
        StateReport::Unstarted => ("○ unstarted", Color::DarkGray),
        StateReport::Unknown => ("? unknown", Color::DarkGray),
    }
}

/// Progress bar over the playhead. Without a known duration it only
/// shows the position.
pub struct ProgressBar<'a> {
    position: f64,
    duration: Option<f64>,
    is_paused: bool,
    title: Option<&'a str>,
}

impl<'a> ProgressBar<'a> {
    pub fn new(position: f64, duration: Option<f64>) -> Self {
        Self {
            position,
            duration: duration.filter(|d| *d > 0.0),
            is_paused: false,
            title: None,
        }
    }

    pub fn paused(mut self, is_paused: bool) -> Self {
        self.is_paused = is_paused;
        self
    }

    pub fn title(mut self, title: Option<&'a str>) -> Self {
        self.title = title;
        self
    }
}

impl<'a> Widget for ProgressBar<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (percent, label) = match self.duration {
            Some(duration) => (
                (self.position / duration).clamp(0.0, 1.0),
                format!(
                    "{} / {}",
                    format_duration(self.position),
                    format_duration(duration)
                ),
            ),
            None => (0.0, format_duration(self.position)),
        };

        // Add pause/play indicator to title
        let display_title = match (self.is_paused, self.title) {
            (true, Some(title)) => format!("⏸  {} ", title),
            (false, Some(title)) => format!("▶  {} ", title),
            (true, None) => "⏸  Paused ".to_string(),
            (false, None) => "▶  Playing ".to_string(),
        };

        Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(display_title))
            .gauge_style(
                Style::default()
                    .fg(Color::Blue)
                    .bg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            )
            .percent((percent * 100.0) as u16)
            .label(label)
            .render(area, buf);
    }
}

/// Status message that fades out
pub struct StatusMessage<'a> {
    message: &'a str,
    color: Color,
    age: Duration,
    max_age: Duration,
}

impl<'a> StatusMessage<'a> {
    pub fn new(message: &'a str, color: Color, age: Duration) -> Self {
        Self {
            message,
            color,
            age,
            max_age: Duration::from_secs(3),
        }
    }

    pub fn max_age(mut self, duration: Duration) -> Self {
        self.max_age = duration;
        self
    }
}

impl<'a> Widget for StatusMessage<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.age > self.max_age {
            return;
        }
        let fade_factor = 1.0 - (self.age.as_secs_f32() / self.max_age.as_secs_f32());

        // Errors always stay red
        let color = match (self.color, fade_factor) {
            (Color::Red, _) => Color::Red,
            (_, f) if f > 0.7 => self.color,
            _ => Color::DarkGray,
        };

        let text = Paragraph::new(Text::from(self.message))
            .style(Style::default().fg(color))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color))
                    .style(Style::default().bg(Color::Black)),
            );

        let message_width = self.message.width() as u16 + 4;
        let message_area = Rect {
            x: area.x + (area.width.saturating_sub(message_width)) / 2,
            y: area.y + area.height.saturating_sub(10),
            width: message_width.min(area.width),
            height: 3.min(area.height),
        };

        Clear.render(message_area, buf);
        text.render(message_area, buf);
    }
}

/// Key and command reference
pub struct HelpOverlay;

impl Widget for HelpOverlay {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let heading = Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD);
        let entry = |keys: &'static str, action: &'static str| {
            Line::from(vec![
                Span::styled(format!("  {:<16}", keys), Style::default().fg(Color::Cyan)),
                Span::raw(action),
            ])
        };

        let lines = vec![
            Line::from(Span::styled("Keys", heading)),
            entry("↑/↓, Enter", "choose and open a video"),
            entry("Space, p", "play / pause"),
            entry("←/→", "seek back / forward"),
            entry("n, b", "next / previous video"),
            entry("Esc, q", "close video (quit from library)"),
            entry(":", "command mode"),
            entry("Ctrl+C", "exit"),
            Line::from(""),
            Line::from(Span::styled("Commands", heading)),
            entry(":seek <pos>", "seconds, MM:SS or HH:MM:SS"),
            entry(":play :pause", "control playback"),
            entry(":toggle", "play when idle, pause when playing"),
            entry(":back :forward", "keyboard seek step"),
            entry(":open <id|n>", "open a library entry"),
            entry(":next :prev", "move through the library"),
            entry(":state :time", "show what the player reports"),
            entry(":close", "unload the active video"),
            entry(":quit", "close video, then exit"),
        ];

        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title(" Help (any key to close) ")
                    .title_alignment(Alignment::Center)
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Yellow))
                    .style(Style::default().bg(Color::Black)),
            )
            .render(area, buf);
    }
}
