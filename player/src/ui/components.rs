use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget, Wrap},
};
use std::time::Duration;
use unicode_width::UnicodeWidthStr;

/// Format seconds as m:ss. Minutes are not wrapped into hours.
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let total_seconds = seconds.floor() as u64;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Progress gauge with a play/pause indicator
pub struct ProgressBar<'a> {
    position: f64,
    duration: f64,
    is_playing: bool,
    title: Option<&'a str>,
}

impl<'a> ProgressBar<'a> {
    pub fn new(position: f64, duration: f64) -> Self {
        Self {
            position,
            duration,
            is_playing: false,
            title: None,
        }
    }

    pub fn playing(mut self, is_playing: bool) -> Self {
        self.is_playing = is_playing;
        self
    }

    pub fn title(mut self, title: Option<&'a str>) -> Self {
        self.title = title;
        self
    }
}

impl<'a> Widget for ProgressBar<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let percent = if self.duration > 0.0 {
            (self.position / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let label = format!(
            "{} / {}",
            format_duration(self.position),
            format_duration(self.duration)
        );

        let display_title = match (self.is_playing, self.title) {
            (true, Some(title)) => format!("▶  {} ", title),
            (false, Some(title)) => format!("⏸  {} ", title),
            (true, None) => "▶  Playing ".to_string(),
            (false, None) => "⏸  Paused ".to_string(),
        };

        Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(display_title))
            .gauge_style(
                Style::default()
                    .fg(Color::Red)
                    .bg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            )
            .ratio(percent)
            .label(label)
            .render(area, buf);
    }
}

/// Display a status message with fade effect
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
        // Errors stay until replaced
        let fade_factor = if self.color == Color::Red {
            1.0
        } else if self.age > self.max_age {
            0.0
        } else {
            1.0 - (self.age.as_secs_f32() / self.max_age.as_secs_f32())
        };

        if fade_factor <= 0.0 {
            return;
        }

        let color = if fade_factor > 0.3 {
            self.color
        } else {
            Color::DarkGray
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

        Clear.render(area, buf);
        text.render(area, buf);
    }
}

/// Volume indicator
pub struct VolumeIndicator {
    volume: u8,
}

impl VolumeIndicator {
    pub fn new(volume: u8) -> Self {
        Self {
            volume: volume.min(100),
        }
    }

    fn icon(&self) -> &'static str {
        match self.volume {
            0 => "🔇",
            1..=49 => "🔉",
            _ => "🔊",
        }
    }
}

impl Widget for VolumeIndicator {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(Text::from(format!("{} {}%", self.icon(), self.volume)))
            .style(Style::default().fg(Color::White))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Volume"))
            .render(area, buf);
    }
}

/// Key reference overlay
pub struct HelpOverlay;

impl HelpOverlay {
    fn entry(keys: &'static str, action: &'static str) -> Line<'static> {
        Line::from(vec![
            Span::styled(keys, Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!(" - {}", action)),
        ])
    }
}

impl Widget for HelpOverlay {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let heading = Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
        let help_text = vec![
            Line::from(Span::styled("Keyboard Controls", heading)),
            Line::from(""),
            Self::entry("Enter", "Play link / selected history entry"),
            Self::entry("↑/↓", "Select recent video"),
            Self::entry("Ctrl+V", "Paste link from clipboard"),
            Self::entry("Tab", "Open player"),
            Self::entry("Space", "Play/Pause"),
            Self::entry("←/→", "Seek 10 seconds"),
            Self::entry("+/-", "Volume"),
            Self::entry("Esc/b", "Back to home"),
            Self::entry("m", "Minimize player"),
            Self::entry("Ctrl+Q", "Quit"),
            Line::from(""),
            Line::from(Span::styled("Commands (:)", heading)),
            Line::from(""),
            Self::entry("open <url>", "Play a link"),
            Self::entry("play / pause / toggle", "Playback"),
            Self::entry("seek <s>", "Jump to a position"),
            Self::entry("volume <0-100>", "Set volume"),
            Self::entry("history / clear-history", "Recent videos"),
            Self::entry("home / help / quit", "Navigation"),
        ];

        let help = Paragraph::new(Text::from(help_text))
            .block(Block::default().title("Help").borders(Borders::ALL))
            .style(Style::default().fg(Color::White).bg(Color::Black))
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });

        Clear.render(area, buf);
        help.render(area, buf);
    }
}

/// Width of a status box for `message`, borders included
pub fn message_width(message: &str) -> u16 {
    message.width() as u16 + 4
}

/// Get a spinner frame for loading animations
pub fn get_spinner_frame(duration_ms: u128) -> &'static str {
    const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠚", "⠞", "⠖", "⠦", "⠴", "⠲", "⠳", "⠓"];
    let frame_idx = (duration_ms / 80) % SPINNER_FRAMES.len() as u128;
    SPINNER_FRAMES[frame_idx as usize]
}
