use crate::app::App;
use crate::ui::components::*;
use playback_core::{EmbeddedPlayer, PlaybackState};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use std::time::{Duration, Instant};

/// Draw the home view: link input, loading line and recent history
pub fn draw_home_view<P: EmbeddedPlayer>(f: &mut Frame, app: &App<P>, area: Rect) {
    f.render_widget(Block::default().style(Style::default().bg(Color::Black)), area);

    let mini = if app.mini_player_visible() { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),    // Title
            Constraint::Length(3),    // Input
            Constraint::Length(1),    // Loading line
            Constraint::Min(3),       // History
            Constraint::Length(mini), // Mini-player
            Constraint::Length(1),    // Status bar
        ])
        .split(area);

    let title = Paragraph::new(Text::from("Background audio for YouTube links"))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title(" PlayBack ")
                .title_alignment(Alignment::Center),
        )
        .style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let (input_text, input_style) = if app.input.is_empty() {
        ("Paste a YouTube URL…", Style::default().fg(Color::DarkGray))
    } else {
        (app.input.as_str(), Style::default().fg(Color::White))
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" ▶ Link ");
    let input_inner = input_block.inner(chunks[1]);
    f.render_widget(Paragraph::new(input_text).style(input_style).block(input_block), chunks[1]);
    if !app.is_command_mode() && !app.show_help {
        f.set_cursor_position((input_inner.x + app.input.chars().count() as u16, input_inner.y));
    }

    if app.is_loading() {
        let spinner = get_spinner_frame(spinner_clock());
        let loading = Paragraph::new(format!("{} Loading…", spinner))
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center);
        f.render_widget(loading, chunks[2]);
    }

    draw_history(f, app, chunks[3]);

    if mini > 0 {
        draw_mini_player(f, app, chunks[4]);
    }

    let status_text = "Enter: Play | ↑/↓: Recent | Ctrl+V: Paste | Tab: Player | : Command | F1: Help | Ctrl+Q: Quit";
    let status = Paragraph::new(Text::from(status_text))
        .style(Style::default().fg(Color::White).bg(Color::DarkGray));
    f.render_widget(status, chunks[5]);
}

fn draw_history<P: EmbeddedPlayer>(f: &mut Frame, app: &App<P>, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Recent ");
    let entries = app.session.history().entries();

    if entries.is_empty() {
        let empty = Paragraph::new("No recent videos")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = entries
        .iter()
        .map(|entry| {
            ListItem::new(Line::from(vec![
                Span::styled(entry.title.clone(), Style::default().fg(Color::White)),
                Span::styled(format!("  {}", entry.author), Style::default().fg(Color::Gray)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::Red).add_modifier(Modifier::BOLD))
        .highlight_symbol("▶ ");

    let mut state = ListState::default();
    state.select(app.history_selected);
    f.render_stateful_widget(list, area, &mut state);
}

/// Compact line with the active video and its state
pub fn draw_mini_player<P: EmbeddedPlayer>(f: &mut Frame, app: &App<P>, area: Rect) {
    let Some(meta) = app.session.active_meta() else {
        return;
    };
    let state = app.engine.state();
    let indicator = match state {
        PlaybackState::Buffering => get_spinner_frame(spinner_clock()),
        PlaybackState::Playing => "⏸",
        _ => "▶",
    };

    let line = Line::from(vec![
        Span::styled(format!(" {} ", indicator), Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
        Span::styled(meta.title.clone(), Style::default().fg(Color::White)),
        Span::styled(format!("  {}", meta.author), Style::default().fg(Color::Gray)),
    ]);
    let mini = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(" Now playing (Space: Play/Pause, Tab: Expand) "),
    );
    f.render_widget(mini, area);
}

/// Draw the player view: video info and the control bar
pub fn draw_player_view<P: EmbeddedPlayer>(f: &mut Frame, app: &App<P>, area: Rect) {
    f.render_widget(Block::default().style(Style::default().bg(Color::Black)), area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(6),    // Video info
            Constraint::Length(3), // Progress
            Constraint::Length(3), // State and volume
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    let snapshot = app.engine.snapshot();

    let info = match (app.session.active_meta(), app.session.active_id()) {
        (Some(meta), Some(id)) => Text::from(vec![
            Line::from(Span::styled(
                meta.title.clone(),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(meta.author.clone(), Style::default().fg(Color::Gray))),
            Line::from(""),
            Line::from(vec![
                Span::styled("Thumbnail: ", Style::default().fg(Color::DarkGray)),
                Span::raw(meta.thumbnail_url.clone()),
            ]),
            Line::from(vec![
                Span::styled("Video id: ", Style::default().fg(Color::DarkGray)),
                Span::raw(id.to_string()),
            ]),
        ]),
        _ => Text::from("Nothing loaded"),
    };
    let info = Paragraph::new(info)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Video "));
    f.render_widget(info, vertical[0]);

    let is_playing = matches!(snapshot.state, PlaybackState::Playing | PlaybackState::Buffering);
    let title = app.session.active_meta().map(|m| m.title.as_str());
    f.render_widget(
        ProgressBar::new(snapshot.position, snapshot.duration)
            .playing(is_playing)
            .title(title),
        vertical[1],
    );

    let controls = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(14)])
        .split(vertical[2]);

    let state_text = if snapshot.state == PlaybackState::Buffering {
        format!("{} {}", get_spinner_frame(spinner_clock()), snapshot.state)
    } else {
        snapshot.state.to_string()
    };
    let state = Paragraph::new(Line::from(vec![
        Span::styled("State: ", Style::default().fg(Color::DarkGray)),
        Span::styled(state_text, Style::default().fg(Color::Yellow)),
        Span::styled(
            format!("   Intent: {:?}", snapshot.intent),
            Style::default().fg(Color::DarkGray),
        ),
    ]))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(state, controls[0]);
    f.render_widget(VolumeIndicator::new(snapshot.volume), controls[1]);

    let status_text = "Space: Play/Pause | ←/→: Seek 10s | +/-: Volume | Esc/b: Back | m: Minimize | : Command";
    let status = Paragraph::new(Text::from(status_text))
        .style(Style::default().fg(Color::White).bg(Color::DarkGray));
    f.render_widget(status, vertical[3]);
}

/// Draw status message with fade effect
pub fn draw_status_message(f: &mut Frame, message: &str, color: Color, age: Duration) {
    let area = f.area();
    let width = message_width(message);
    let message_area = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + area.height.saturating_sub(6), // Show near the bottom
        width: width.min(area.width),
        height: 3.min(area.height),
    };

    let status_message = StatusMessage::new(message, color, age).max_age(Duration::from_secs(4));
    f.render_widget(status_message, message_area);
}

/// Draw command prompt
pub fn draw_command_prompt(f: &mut Frame, command: &str) {
    let area = f.area();
    let prompt_area = Rect::new(0, area.height.saturating_sub(3), area.width, 3.min(area.height));

    let prompt_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .style(Style::default().bg(Color::Black));
    let inner_area = prompt_block.inner(prompt_area);

    f.render_widget(Clear, prompt_area);
    f.render_widget(&prompt_block, prompt_area);

    let command_para = Paragraph::new(Text::from(format!(":{}", command)))
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    f.render_widget(command_para, inner_area);

    f.set_cursor_position((inner_area.x + 1 + command.chars().count() as u16, inner_area.y));
}

/// Draw help dialog
pub fn draw_help_dialog(f: &mut Frame) {
    let area = centered_rect(60, 80, f.area());
    f.render_widget(HelpOverlay, area);
}

/// Helper function to create a centered rect
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

/// Milliseconds for spinner animation, relative to the first call
fn spinner_clock() -> u128 {
    use std::sync::OnceLock;
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_millis()
}
