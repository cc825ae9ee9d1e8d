use crate::app::App;
use crate::ui::components::*;
use player_core::{Surface, VideoSource};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use std::time::Duration;
use unicode_width::UnicodeWidthStr;

fn source_label(source: VideoSource) -> &'static str {
    match source {
        VideoSource::Embedded => "embedded",
        VideoSource::Direct => "direct",
        VideoSource::CrossDocument => "cross-document",
        VideoSource::Unsupported => "unsupported",
    }
}

/// Draw the library view
pub fn draw_library_view(f: &mut Frame, app: &App, area: Rect) {
    f.render_widget(Block::default().style(Style::default().bg(Color::Black)), area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    let title = Paragraph::new(Text::from("Video Console"))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    let items: Vec<ListItem> = app
        .library
        .iter()
        .enumerate()
        .map(|(i, video)| {
            let duration = video
                .duration_seconds
                .map(format_duration)
                .unwrap_or_else(|| "--:--".to_string());
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:>2}. ", i + 1), Style::default().fg(Color::DarkGray)),
                Span::styled(video.title.clone(), Style::default().fg(Color::White)),
                Span::raw("  "),
                Span::styled(
                    format!("[{}]", source_label(video.source)),
                    Style::default().fg(Color::Blue),
                ),
                Span::styled(format!(" {}", duration), Style::default().fg(Color::Gray)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(" Library "))
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(Some(app.selected));
    f.render_stateful_widget(list, chunks[1], &mut state);

    let hints = Paragraph::new("↑/↓ select · Enter open · : command · ? help · q quit")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
    f.render_widget(hints, chunks[2]);
}

/// Describe what the player would render for its surface
fn surface_lines(surface: &Surface) -> Vec<Line<'static>> {
    let label = Style::default().fg(Color::DarkGray);
    match surface {
        Surface::Placeholder(message) => vec![Line::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::Yellow),
        ))],
        Surface::EmbedContainer { element_id } => vec![
            Line::from(Span::styled("embedded player container", label)),
            Line::from(format!("#{}", element_id)),
        ],
        Surface::MediaElement { src } => vec![
            Line::from(Span::styled("media element", label)),
            Line::from(src.clone()),
        ],
        Surface::Frame { src } => vec![
            Line::from(Span::styled("embed frame", label)),
            Line::from(src.clone()),
        ],
    }
}

/// Draw the player view
pub fn draw_player_view(f: &mut Frame, app: &App, area: Rect) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(6), // Surface
            Constraint::Length(3), // Progress
            Constraint::Min(3),    // Event log
        ])
        .split(area);

    let video = app.player.video();
    let view = app.player.view();
    let report = app.player.state();
    let ready = app.player.is_ready();

    let title = video
        .as_ref()
        .map(|v| format!(" {} [{}] ", v.title, source_label(v.source)))
        .unwrap_or_else(|| " No video ".to_string());
    let (state_text, state_color) = state_label(report);
    let readiness = if ready {
        Span::styled("ready", Style::default().fg(Color::Green))
    } else {
        Span::styled("not ready", Style::default().fg(Color::Red))
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled(state_text, Style::default().fg(state_color)),
        Span::raw("  ·  "),
        readiness,
    ]))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .title_alignment(Alignment::Center),
    );
    f.render_widget(header, vertical[0]);

    let surface = Paragraph::new(surface_lines(&view.surface))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Surface "));
    f.render_widget(surface, vertical[1]);

    let is_paused = !report.state().is_some_and(|s| s.is_active());
    let progress = ProgressBar::new(
        app.player.current_time(),
        video.as_ref().and_then(|v| v.duration_seconds),
    )
    .paused(is_paused)
    .title(video.as_ref().map(|v| v.title.as_str()));
    f.render_widget(progress, vertical[2]);

    draw_event_log(f, app, vertical[3]);
}

/// Most recent callback notifications, newest at the bottom
fn draw_event_log(f: &mut Frame, app: &App, area: Rect) {
    let visible = area.height.saturating_sub(2) as usize;
    let feed = app.feed.lock();
    let skip = feed.log.len().saturating_sub(visible);
    let lines: Vec<Line> = feed
        .log
        .iter()
        .skip(skip)
        .map(|entry| {
            let color = if entry.is_error { Color::Red } else { Color::White };
            Line::from(vec![
                Span::styled(
                    entry.at.format("%H:%M:%S%.3f ").to_string(),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(entry.message.clone(), Style::default().fg(color)),
            ])
        })
        .collect();

    let title = format!(" Events · last update {} ", format_duration(feed.time));
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title)),
        area,
    );
}

/// Draw a status message
pub fn draw_status_message(f: &mut Frame, message: &str, color: Color, age: Duration) {
    let status_message = StatusMessage::new(message, color, age).max_age(Duration::from_secs(3));
    f.render_widget(status_message, f.area());
}

/// Draw command prompt
pub fn draw_command_prompt(f: &mut Frame, command: &str) {
    let screen = f.area();
    if screen.height < 3 {
        return;
    }
    let area = Rect::new(0, screen.height - 3, screen.width, 3);
    f.render_widget(Clear, area);

    let prompt_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .style(Style::default().bg(Color::Black));
    let inner_area = prompt_block.inner(area);
    f.render_widget(prompt_block, area);

    let command_para = Paragraph::new(Text::from(format!(":{}", command)))
        .style(
            Style::default()
                .fg(Color::Yellow)
                .bg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Left);
    f.render_widget(command_para, inner_area);

    f.set_cursor_position((inner_area.x + 1 + command.width() as u16, inner_area.y));
}

/// Draw help dialog
pub fn draw_help_dialog(f: &mut Frame) {
    let area = centered_rect(60, 70, f.area());
    f.render_widget(Clear, area);
    f.render_widget(HelpOverlay, area);
}

/// Helper function to create a centered rect using up certain percentage of the available rect
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::demo_library;
    use player_core::PlayerConfig;
    use player_core::sim::SimHost;
    use ratatui::{Terminal, backend::TestBackend};

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_centered_rect_is_inside() {
        let outer = Rect::new(0, 0, 100, 50);
        let inner = centered_rect(60, 70, outer);
        assert_eq!(inner.width, 60);
        assert_eq!(inner.height, 35);
        assert!(inner.x >= outer.x && inner.right() <= outer.right());
    }

    #[tokio::test]
    async fn test_library_and_player_views_render() {
        let mut app = App::new(
            SimHost::new().player_host(),
            PlayerConfig::default(),
            demo_library(),
        );
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();

        terminal.draw(|f| crate::ui::draw_ui(f, &app)).unwrap();
        assert!(screen_text(&terminal).contains("Training session"));

        app.open_video("training").unwrap();
        terminal.draw(|f| crate::ui::draw_ui(f, &app)).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("media element"));
        assert!(text.contains("not ready"));
    }
}
