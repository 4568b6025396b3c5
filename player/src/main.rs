use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableFocusChange, EnableFocusChange, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use directories::ProjectDirs;
use log::{debug, error, info, warn};
use playback_core::{PlaybackConfig, PlaybackEngine, Session, YouTubeConfig, YtDlpPlayer};
use ratatui::{Terminal, backend::CrosstermBackend, style::Color};

mod app;
mod commands;
mod platform;
mod ui;

use app::{App, Surface};
use platform::{NullSurface, SystemMediaControls};

/// Longest the loop waits for input before redrawing
const TICK_RATE: Duration = Duration::from_millis(50);

/// Keep YouTube audio playing while the terminal is in the background
#[derive(Parser, Debug)]
#[command(name = "playback", version, about)]
struct Args {
    /// YouTube link or video id to play at startup
    input: Option<String>,

    /// History file (defaults to the platform data directory)
    #[arg(long, value_name = "PATH")]
    history_file: Option<PathBuf>,

    /// oEmbed endpoint used for video metadata
    #[arg(long, value_name = "URL")]
    oembed_endpoint: Option<String>,

    /// Network timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Path to the yt-dlp executable
    #[arg(long, value_name = "PATH")]
    ytdlp_path: Option<String>,

    /// Proxy for yt-dlp and audio downloads (e.g. socks5://127.0.0.1:9050)
    #[arg(long, value_name = "URL")]
    proxy: Option<String>,

    /// Do not register with the OS media controls
    #[arg(long)]
    no_media_controls: bool,

    /// Debug log file
    #[arg(long, value_name = "PATH", default_value = "playback_debug.log")]
    log_file: PathBuf,
}

impl Args {
    fn playback_config(&self) -> PlaybackConfig {
        let mut config = PlaybackConfig::default().with_request_timeout(Duration::from_secs(self.timeout));
        if let Some(endpoint) = &self.oembed_endpoint {
            config = config.with_oembed_endpoint(endpoint.clone());
        }
        if let Some(path) = self.history_file.clone().or_else(default_history_path) {
            config = config.with_history_path(path);
        }
        config
    }

    fn youtube_config(&self) -> YouTubeConfig {
        YouTubeConfig {
            ytdlp_path: self.ytdlp_path.clone(),
            proxy: self.proxy.clone(),
            timeout: self.timeout,
            ..Default::default()
        }
    }
}

fn default_history_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "playback").map(|dirs| dirs.data_dir().join("history.json"))
}

/// Log to a file since the terminal belongs to the UI
fn init_logger(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {:5} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init()
        .context("Failed to install logger")
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableFocusChange);
}

fn create_surface(args: &Args) -> Surface {
    if args.no_media_controls {
        info!("Media controls disabled");
        return Box::new(NullSurface);
    }
    match SystemMediaControls::new() {
        Ok(controls) => Box::new(controls),
        Err(e) => {
            warn!("{:#}", e);
            Box::new(NullSurface)
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(&args.log_file)?;
    info!("Application starting");

    // Set up clean terminal restoration on panic
    let orig_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        restore_terminal();
        error!("PANIC: {}", panic_info);
        orig_hook(panic_info);
    }));

    let config = args.playback_config();
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let session = Session::new(&config).context("Failed to create session")?;
    let player = YtDlpPlayer::new(args.youtube_config(), &config).context("Failed to start audio backend")?;
    let engine = PlaybackEngine::new(player, &config);
    let surface = create_surface(&args);

    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen, EnableFocusChange) {
        let _ = disable_raw_mode();
        return Err(e).context("Failed to setup terminal");
    }
    let mut terminal = match Terminal::new(CrosstermBackend::new(stdout)) {
        Ok(terminal) => terminal,
        Err(e) => {
            restore_terminal();
            return Err(e).context("Failed to create terminal");
        }
    };
    debug!("Terminal setup complete");

    let mut app = App::new(session, engine, surface, &config, runtime.handle().clone());
    app.go_home();
    if let Some(input) = &args.input {
        info!("Opening {} from the command line", input);
        app.submit(input);
    }

    let result = run(&mut terminal, &mut app);

    info!("Shutting down application");
    app.teardown();

    let cleanup_result = (|| -> Result<()> {
        disable_raw_mode().context("Failed to disable raw mode")?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableFocusChange)
            .context("Failed to leave alternate screen")?;
        terminal.show_cursor().context("Failed to show cursor")?;
        Ok(())
    })();
    if let Err(e) = cleanup_result {
        error!("Error during cleanup: {:#}", e);
        eprintln!("Error during cleanup: {:#}", e);
    }

    // Joins the audio thread
    drop(app);
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<YtDlpPlayer>,
) -> Result<()> {
    while !app.should_quit {
        if let Err(e) = terminal.draw(|f| ui::draw_ui(f, app)) {
            // Display hiccups are not fatal
            error!("Terminal draw error: {}", e);
        }

        let timeout = app
            .engine
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .map_or(TICK_RATE, |until| until.min(TICK_RATE));

        if event::poll(timeout).context("Failed to poll terminal events")? {
            match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    debug!("Key {:?} with modifiers {:?}", key.code, key.modifiers);
                    app.handle_key_event(key);
                }
                Ok(Event::FocusGained) => app.handle_focus(true),
                Ok(Event::FocusLost) => app.handle_focus(false),
                Ok(_) => {}
                Err(e) => warn!("Error reading event: {}", e),
            }
        }

        app.tick();

        if let Some(e) = app.engine.player_mut().take_error() {
            warn!("Audio backend: {}", e);
            app.set_status(e.user_message(), Color::Red);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_map_onto_configs() {
        let args = Args::try_parse_from([
            "playback",
            "--history-file",
            "/tmp/history.json",
            "--oembed-endpoint",
            "http://localhost:8080/oembed",
            "--timeout",
            "5",
            "--proxy",
            "socks5://127.0.0.1:9050",
            "--no-media-controls",
            "https://youtu.be/dQw4w9WgXcQ",
        ])
        .unwrap();

        assert_eq!(args.input.as_deref(), Some("https://youtu.be/dQw4w9WgXcQ"));
        assert!(args.no_media_controls);

        let config = args.playback_config();
        assert_eq!(config.history_path, Some(PathBuf::from("/tmp/history.json")));
        assert_eq!(config.oembed_endpoint, "http://localhost:8080/oembed");
        assert_eq!(config.request_timeout, Duration::from_secs(5));

        let youtube = args.youtube_config();
        assert_eq!(youtube.proxy.as_deref(), Some("socks5://127.0.0.1:9050"));
        assert_eq!(youtube.timeout, 5);
    }

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["playback"]).unwrap();
        assert!(args.input.is_none());
        assert_eq!(args.log_file, PathBuf::from("playback_debug.log"));
        assert_eq!(args.playback_config().request_timeout, Duration::from_secs(10));
    }
}
