use anyhow::{Result, anyhow};
use playback_core::EmbeddedPlayer;
use ratatui::style::Color;

use crate::app::{App, AppView};

/// Commands accepted in command mode
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    Open(String),
    Play,
    Pause,
    Toggle,
    Seek(f64),
    Volume(u8),
    History,
    ClearHistory,
    Home,
    Help,
    Quit,
}

/// Parse a command line. Returns `None` for an empty line.
pub fn parse(command_str: &str) -> Result<Option<UserCommand>> {
    let parts: Vec<&str> = command_str.trim().splitn(2, ' ').collect();
    let cmd = parts[0].to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).filter(|s| !s.is_empty());

    let command = match cmd.as_str() {
        "" => return Ok(None),
        "open" | "o" => {
            let input = args.ok_or_else(|| anyhow!("Open command requires a URL or video id"))?;
            UserCommand::Open(input.to_string())
        }
        "play" | "p" => UserCommand::Play,
        "pause" => UserCommand::Pause,
        "toggle" | "t" => UserCommand::Toggle,
        "seek" | "s" => {
            let args = args.ok_or_else(|| anyhow!("Seek command requires a position argument"))?;
            match args.parse::<f64>() {
                Ok(position) if position.is_finite() && position >= 0.0 => UserCommand::Seek(position),
                _ => return Err(anyhow!("Invalid position: {}", args)),
            }
        }
        "volume" | "vol" | "v" => {
            let args = args.ok_or_else(|| anyhow!("Volume command requires a level argument (0-100)"))?;
            match args.parse::<u8>() {
                Ok(volume) if volume <= 100 => UserCommand::Volume(volume),
                _ => return Err(anyhow!("Invalid volume: {}", args)),
            }
        }
        "history" | "recent" => UserCommand::History,
        "clear-history" => UserCommand::ClearHistory,
        "home" | "menu" | "main" => UserCommand::Home,
        "help" | "h" | "?" => UserCommand::Help,
        "quit" | "exit" | "q" => UserCommand::Quit,
        _ => return Err(anyhow!("Unknown command: {}", cmd)),
    };
    Ok(Some(command))
}

/// Command handler for the application
pub struct CommandHandler;

impl CommandHandler {
    /// Parse and execute a command
    pub fn execute<P: EmbeddedPlayer>(app: &mut App<P>, command_str: &str) -> Result<()> {
        let Some(command) = parse(command_str)? else {
            return Ok(());
        };
        log::debug!("Executing command {:?}", command);

        match command {
            UserCommand::Open(input) => app.submit(&input),
            UserCommand::Play => app.engine.play(),
            UserCommand::Pause => app.engine.pause(),
            UserCommand::Toggle => app.engine.toggle(),
            UserCommand::Seek(position) => app.engine.seek(position),
            UserCommand::Volume(volume) => {
                app.engine.set_volume(f64::from(volume));
                app.set_status(format!("Volume set to {}", volume), Color::Yellow);
            }
            UserCommand::History => {
                app.go_home();
                if !app.session.history().is_empty() {
                    app.history_selected = Some(0);
                }
            }
            UserCommand::ClearHistory => {
                app.session.clear_history()?;
                app.history_selected = None;
                app.set_status("History cleared", Color::Green);
            }
            UserCommand::Home => {
                if app.view == AppView::Player {
                    app.go_home();
                }
            }
            UserCommand::Help => app.show_help = true,
            UserCommand::Quit => app.should_quit = true,
        }

        Ok(())
    }
}

/// Handle a command string entered by the user
pub fn handle_command<P: EmbeddedPlayer>(app: &mut App<P>, command: &str) -> Result<()> {
    CommandHandler::execute(app, command)
}
