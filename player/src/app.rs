use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::{debug, info, warn};
use playback_core::{
    CompletedFetch, EmbeddedPlayer, Error, MediaId, PlaybackConfig, PlaybackEngine, PlaybackState,
    Session, SubmitOutcome, TransportBridge, TransportCommand, TransportSurface, VideoMeta, Visibility,
    resolve,
};
use ratatui::style::Color;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::commands;
use crate::platform::clipboard;

pub type Surface = Box<dyn TransportSurface>;

/// Reads clipboard text for paste and prefill
pub type ClipboardReader = fn() -> playback_core::Result<String>;

type FetchResult = (MediaId, playback_core::Result<VideoMeta>);

/// Volume step for `+` / `-`
const VOLUME_STEP: i16 = 5;

/// Application views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppView {
    /// Link input and recent history
    Home,
    /// Video info and playback controls
    Player,
}

// App state
pub struct App<P: EmbeddedPlayer> {
    /// Current application view
    pub view: AppView,
    /// Link input on the home view
    pub input: String,
    /// Highlighted history entry
    pub history_selected: Option<usize>,
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
    /// Set when the player view was left while playing, or minimized
    mini: bool,
    pub session: Session,
    pub engine: PlaybackEngine<P>,
    bridge: TransportBridge<Surface>,
    transport_rx: UnboundedReceiver<TransportCommand>,
    fetch_tx: UnboundedSender<FetchResult>,
    fetch_rx: UnboundedReceiver<FetchResult>,
    runtime: Handle,
    clipboard: ClipboardReader,
    seek_offset: f64,
}

impl<P: EmbeddedPlayer> App<P> {
    /// Create the application and attach the transport handlers
    pub fn new(
        session: Session,
        engine: PlaybackEngine<P>,
        surface: Surface,
        config: &PlaybackConfig,
        runtime: Handle,
    ) -> Self {
        let (mut bridge, transport_rx) = TransportBridge::new(surface, config);
        bridge.attach();
        let (fetch_tx, fetch_rx) = mpsc::unbounded_channel();

        Self {
            view: AppView::Home,
            input: String::new(),
            history_selected: None,
            status_message: None,
            should_quit: false,
            show_help: false,
            command_mode: false,
            command_buffer: String::new(),
            mini: false,
            session,
            engine,
            bridge,
            transport_rx,
            fetch_tx,
            fetch_rx,
            runtime,
            clipboard: clipboard::read_text,
            seek_offset: config.default_seek_offset,
        }
    }

    pub fn with_clipboard(mut self, reader: ClipboardReader) -> Self {
        self.clipboard = reader;
        self
    }

    /// Set a status message with a color
    pub fn set_status(&mut self, message: impl Into<String>, color: Color) {
        let message_string = message.into();
        debug!("Status message: {} ({:?})", message_string, color);
        self.status_message = Some((message_string, Instant::now(), color));
    }

    fn clear_error(&mut self) {
        if matches!(self.status_message, Some((_, _, Color::Red))) {
            self.status_message = None;
        }
    }

    /// Submit free-form input from the link field, a command or the CLI
    pub fn submit(&mut self, input: &str) {
        match self.session.submit(input) {
            Ok(outcome) => self.apply_outcome(outcome),
            Err(e) => {
                debug!("Rejected input {:?}: {}", input, e);
                self.set_status(e.user_message(), Color::Red);
            }
        }
    }

    /// Replay the history entry at `index`
    pub fn select_history(&mut self, index: usize) {
        if let Some(outcome) = self.session.submit_history(index) {
            self.apply_outcome(outcome);
        }
    }

    fn apply_outcome(&mut self, outcome: SubmitOutcome) {
        match outcome {
            SubmitOutcome::AlreadyActive(_) => {
                self.input.clear();
                self.open_player();
            }
            SubmitOutcome::Fetch(id) => {
                self.status_message = None;
                self.spawn_fetch(id);
            }
        }
    }

    fn spawn_fetch(&self, id: MediaId) {
        let fetcher = self.session.fetcher().clone();
        let tx = self.fetch_tx.clone();
        self.runtime.spawn(async move {
            let result = fetcher.fetch(&id).await;
            let _ = tx.send((id, result));
        });
    }

    fn finish_fetch(&mut self, id: MediaId, result: playback_core::Result<VideoMeta>) {
        match self.session.complete_fetch(id, result) {
            Ok(CompletedFetch::Applied(id)) => {
                let title = self
                    .session
                    .active_meta()
                    .map(|meta| meta.title.clone())
                    .unwrap_or_default();
                info!("Playing {} ({})", title, id);
                self.engine.load(id, true);
                self.input.clear();
                self.history_selected = None;
                self.open_player();
                if self.engine.snapshot().ready {
                    self.set_status(format!("Playing: {}", title), Color::Green);
                } else {
                    self.set_status(Error::PlayerUninitialized.user_message(), Color::Yellow);
                }
            }
            Ok(CompletedFetch::Stale) => {}
            Err(e) => {
                warn!("Metadata fetch failed: {}", e);
                self.set_status(e.user_message(), Color::Red);
            }
        }
    }

    /// Drain background results, pump the engine and republish the
    /// transport state. Returns whether anything happened.
    pub fn tick(&mut self) -> bool {
        let mut changed = false;

        while let Ok((id, result)) = self.fetch_rx.try_recv() {
            changed = true;
            self.finish_fetch(id, result);
        }

        while let Ok(command) = self.transport_rx.try_recv() {
            changed = true;
            self.bridge.relay(command, &mut self.engine);
        }

        changed |= self.engine.pump();

        self.bridge.sync_metadata(self.session.active_meta());
        self.bridge.sync(&self.engine.snapshot());
        changed
    }

    /// Terminal focus drives page visibility
    pub fn handle_focus(&mut self, gained: bool) {
        let visibility = if gained {
            Visibility::Visible
        } else {
            Visibility::Hidden
        };
        debug!("Terminal focus {}, visibility {:?}", gained, visibility);
        self.engine.set_visibility(visibility);
    }

    /// Clear the transport handlers before shutdown
    pub fn teardown(&mut self) {
        self.bridge.teardown();
    }

    pub fn is_loading(&self) -> bool {
        self.session.is_loading()
    }

    /// Whether the compact player line is shown on the home view
    pub fn mini_player_visible(&self) -> bool {
        self.view == AppView::Home
            && self.mini
            && self.session.active_meta().is_some()
            && matches!(
                self.engine.state(),
                PlaybackState::Playing | PlaybackState::Paused | PlaybackState::Buffering
            )
    }

    fn open_player(&mut self) {
        self.view = AppView::Player;
        self.mini = false;
    }

    /// Return to the home view and prefill the input from the clipboard
    pub fn go_home(&mut self) {
        self.view = AppView::Home;
        self.prefill_from_clipboard();
    }

    fn prefill_from_clipboard(&mut self) {
        if !self.input.is_empty() {
            return;
        }
        match (self.clipboard)() {
            Ok(text) if resolve(&text).is_some() => {
                self.input = text.trim().to_string();
                self.clear_error();
            }
            Ok(_) => {}
            Err(e) => debug!("Clipboard prefill skipped: {}", e),
        }
    }

    fn paste_clipboard(&mut self) {
        match (self.clipboard)() {
            Ok(text) => {
                self.input = text.trim().to_string();
                self.clear_error();
            }
            Err(e) => debug!("Paste failed: {}", e),
        }
    }

    fn seek_relative(&mut self, delta: f64) {
        let position = self.engine.snapshot().position;
        self.engine.seek((position + delta).max(0.0));
    }

    fn change_volume(&mut self, delta: i16) {
        let volume = (i16::from(self.engine.snapshot().volume) + delta).clamp(0, 100);
        self.engine.set_volume(f64::from(volume));
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
        self.command_buffer.clear();
    }

    pub fn get_command_buffer(&self) -> &str {
        &self.command_buffer
    }

    /// Handle key event
    pub fn handle_key_event(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        // Global quit (Ctrl+C or Ctrl+Q)
        if ctrl && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q')) {
            info!("Quit key pressed");
            self.should_quit = true;
            return;
        }

        if self.is_command_mode() {
            match key.code {
                KeyCode::Char(c) => self.command_buffer.push(c),
                KeyCode::Backspace => {
                    self.command_buffer.pop();
                }
                KeyCode::Esc => self.exit_command_mode(),
                KeyCode::Enter => {
                    let cmd = self.command_buffer.clone();
                    self.exit_command_mode();
                    if let Err(e) = commands::handle_command(self, &cmd) {
                        debug!("Command error: {}", e);
                        self.set_status(format!("Error: {}", e), Color::Red);
                    }
                }
                _ => {}
            }
            return;
        }

        if self.show_help {
            self.show_help = false;
            return;
        }

        if key.code == KeyCode::F(1) {
            self.show_help = true;
            return;
        }

        if ctrl && key.code == KeyCode::Char('v') {
            self.view = AppView::Home;
            self.paste_clipboard();
            return;
        }

        match self.view {
            AppView::Home => self.handle_home_key(key),
            AppView::Player => self.handle_player_key(key),
        }
    }

    fn handle_home_key(&mut self, key: KeyEvent) {
        let history_len = self.session.history().len();

        match key.code {
            KeyCode::Char(':') if self.input.is_empty() => self.enter_command_mode(),
            KeyCode::Char(' ') if self.input.is_empty() && self.mini_player_visible() => {
                self.engine.toggle();
            }
            KeyCode::Char(c) => {
                self.input.push(c);
                self.clear_error();
            }
            KeyCode::Backspace => {
                self.input.pop();
                self.clear_error();
            }
            KeyCode::Enter => {
                if !self.input.trim().is_empty() {
                    let input = self.input.clone();
                    self.submit(&input);
                } else if let Some(index) = self.history_selected {
                    self.select_history(index);
                } else if self.session.active_id().is_some() {
                    self.open_player();
                }
            }
            KeyCode::Down if history_len > 0 => {
                self.history_selected = Some(match self.history_selected {
                    Some(i) => (i + 1).min(history_len - 1),
                    None => 0,
                });
            }
            KeyCode::Up if history_len > 0 => {
                self.history_selected = match self.history_selected {
                    Some(0) | None => None,
                    Some(i) => Some(i - 1),
                };
            }
            KeyCode::Tab if self.session.active_id().is_some() => self.open_player(),
            KeyCode::Esc => {
                if self.input.is_empty() {
                    self.history_selected = None;
                } else {
                    self.input.clear();
                }
                self.clear_error();
            }
            _ => {}
        }
    }

    fn handle_player_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(' ') => self.engine.toggle(),
            KeyCode::Left => self.seek_relative(-self.seek_offset),
            KeyCode::Right => self.seek_relative(self.seek_offset),
            KeyCode::Char('+') | KeyCode::Char('=') => self.change_volume(VOLUME_STEP),
            KeyCode::Char('-') => self.change_volume(-VOLUME_STEP),
            KeyCode::Esc | KeyCode::Char('b') => {
                self.mini = matches!(
                    self.engine.state(),
                    PlaybackState::Playing | PlaybackState::Buffering
                );
                self.go_home();
            }
            KeyCode::Char('m') => {
                self.mini = true;
                self.go_home();
                self.set_status("Player minimized", Color::Blue);
            }
            KeyCode::Char(':') => self.enter_command_mode(),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use playback_core::{HistoryStore, MetadataFetcher, PlayerEvent, RawPlayerState};

    use super::*;
    use crate::platform::NullSurface;

    /// Player that is ready immediately and reports every command back
    #[derive(Default)]
    struct EchoPlayer {
        events: VecDeque<PlayerEvent>,
        state: Option<RawPlayerState>,
        time: f64,
        seeks: Vec<f64>,
        volume: Option<u8>,
    }

    impl EchoPlayer {
        fn report(&mut self, state: RawPlayerState) {
            self.state = Some(state);
            self.events.push_back(PlayerEvent::StateChange(state));
        }
    }

    impl EmbeddedPlayer for EchoPlayer {
        fn load_video_by_id(&mut self, _id: &MediaId) {
            self.report(RawPlayerState::Playing);
        }

        fn cue_video_by_id(&mut self, _id: &MediaId) {
            self.report(RawPlayerState::Cued);
        }

        fn play_video(&mut self) {
            self.report(RawPlayerState::Playing);
        }

        fn pause_video(&mut self) {
            self.report(RawPlayerState::Paused);
        }

        fn seek_to(&mut self, seconds: f64, _allow_seek_ahead: bool) {
            self.time = seconds;
            self.seeks.push(seconds);
        }

        fn set_volume(&mut self, volume: u8) {
            self.volume = Some(volume);
        }

        fn current_time(&self) -> f64 {
            self.time
        }

        fn duration(&self) -> f64 {
            300.0
        }

        fn player_state(&self) -> RawPlayerState {
            self.state.unwrap_or(RawPlayerState::Unstarted)
        }

        fn poll_event(&mut self) -> Option<PlayerEvent> {
            self.events.pop_front()
        }
    }

    fn no_clipboard() -> playback_core::Result<String> {
        Err(Error::ClipboardDenied("denied".to_string()))
    }

    fn link_clipboard() -> playback_core::Result<String> {
        Ok(" https://youtu.be/dQw4w9WgXcQ ".to_string())
    }

    fn app() -> App<EchoPlayer> {
        let config = PlaybackConfig::default().with_oembed_endpoint("http://127.0.0.1:9/oembed");
        let session = Session::with_parts(
            MetadataFetcher::new(&config).unwrap(),
            HistoryStore::in_memory(config.history_limit),
        );
        let mut player = EchoPlayer::default();
        player.events.push_back(PlayerEvent::Ready);
        let engine = PlaybackEngine::new(player, &config);
        let mut app = App::new(session, engine, Box::new(NullSurface), &config, Handle::current())
            .with_clipboard(no_clipboard);
        app.tick();
        app
    }

    fn meta() -> VideoMeta {
        VideoMeta {
            title: "Example".to_string(),
            author: "Chan".to_string(),
            thumbnail_url: "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg".to_string(),
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    /// Submit a link and deliver its metadata as if the fetch finished
    fn play_example(app: &mut App<EchoPlayer>) {
        let SubmitOutcome::Fetch(id) = app.session.submit("https://youtu.be/dQw4w9WgXcQ").unwrap() else {
            panic!("expected a fetch");
        };
        app.fetch_tx.send((id, Ok(meta()))).unwrap();
        app.tick();
        app.tick();
    }

    #[tokio::test]
    async fn invalid_link_shows_error_until_edited() {
        let mut app = app();
        for c in "nonsense".chars() {
            app.handle_key_event(key(KeyCode::Char(c)));
        }
        app.handle_key_event(key(KeyCode::Enter));

        let (message, _, color) = app.status_message.clone().unwrap();
        assert_eq!(message, "Invalid YouTube URL. Try a youtube.com/watch or youtu.be link.");
        assert_eq!(color, Color::Red);
        assert!(!app.is_loading());

        app.handle_key_event(key(KeyCode::Backspace));
        assert!(app.status_message.is_none());
    }

    #[tokio::test]
    async fn fetched_metadata_opens_player_and_records_history() {
        let mut app = app();
        play_example(&mut app);

        assert_eq!(app.view, AppView::Player);
        assert_eq!(app.engine.state(), PlaybackState::Playing);
        assert_eq!(app.session.history().get(0).unwrap().title, "Example");
    }

    #[tokio::test]
    async fn player_keys_drive_the_engine() {
        let mut app = app();
        play_example(&mut app);

        // Position is still 0, so seeking back clamps at the start
        app.handle_key_event(key(KeyCode::Left));
        assert_eq!(app.engine.player().seeks, vec![0.0]);

        app.handle_key_event(key(KeyCode::Right));
        assert_eq!(app.engine.player().seeks, vec![0.0, 10.0]);

        app.handle_key_event(key(KeyCode::Char('-')));
        assert_eq!(app.engine.player().volume, Some(95));

        app.handle_key_event(key(KeyCode::Char(' ')));
        app.tick();
        assert_eq!(app.engine.state(), PlaybackState::Paused);
    }

    #[tokio::test]
    async fn back_shows_mini_player() {
        let mut app = app();
        play_example(&mut app);

        app.handle_key_event(key(KeyCode::Char('b')));
        assert_eq!(app.view, AppView::Home);
        assert!(app.mini_player_visible());

        // Space with an empty input controls the mini-player
        app.handle_key_event(key(KeyCode::Char(' ')));
        app.tick();
        assert_eq!(app.engine.state(), PlaybackState::Paused);

        app.handle_key_event(key(KeyCode::Tab));
        assert_eq!(app.view, AppView::Player);
    }

    #[tokio::test]
    async fn back_while_paused_hides_mini_player() {
        let mut app = app();
        play_example(&mut app);
        app.handle_key_event(key(KeyCode::Char(' ')));
        app.tick();
        assert_eq!(app.engine.state(), PlaybackState::Paused);

        app.handle_key_event(key(KeyCode::Esc));
        assert_eq!(app.view, AppView::Home);
        assert!(!app.mini_player_visible());

        // Minimize keeps it regardless of state
        app.handle_key_event(key(KeyCode::Tab));
        app.handle_key_event(key(KeyCode::Char('m')));
        assert!(app.mini_player_visible());

        // Reopening the player resets it
        app.handle_key_event(key(KeyCode::Tab));
        app.handle_key_event(key(KeyCode::Char(':')));
        for c in "history".chars() {
            app.handle_key_event(key(KeyCode::Char(c)));
        }
        app.handle_key_event(key(KeyCode::Enter));
        assert_eq!(app.view, AppView::Home);
        assert!(!app.mini_player_visible());
    }

    #[tokio::test]
    async fn paste_does_not_show_mini_player() {
        let mut app = app().with_clipboard(link_clipboard);
        play_example(&mut app);

        app.handle_key_event(KeyEvent::new(KeyCode::Char('v'), KeyModifiers::CONTROL));
        assert_eq!(app.view, AppView::Home);
        assert_eq!(app.engine.state(), PlaybackState::Playing);
        assert!(!app.mini_player_visible());
    }

    #[tokio::test]
    async fn focus_loss_hides_the_page() {
        let mut app = app();
        app.handle_focus(false);
        assert_eq!(app.engine.snapshot().visibility, Visibility::Hidden);
        app.handle_focus(true);
        assert_eq!(app.engine.snapshot().visibility, Visibility::Visible);
    }

    #[tokio::test]
    async fn clipboard_prefills_empty_input() {
        let mut app = app().with_clipboard(link_clipboard);
        app.go_home();
        assert_eq!(app.input, "https://youtu.be/dQw4w9WgXcQ");

        app.input = "typed".to_string();
        app.go_home();
        assert_eq!(app.input, "typed");
    }

    #[tokio::test]
    async fn command_mode_runs_commands() {
        let mut app = app();
        play_example(&mut app);

        app.handle_key_event(key(KeyCode::Char(':')));
        assert!(app.is_command_mode());
        for c in "seek 42".chars() {
            app.handle_key_event(key(KeyCode::Char(c)));
        }
        app.handle_key_event(key(KeyCode::Enter));
        assert!(!app.is_command_mode());
        assert_eq!(app.engine.snapshot().position, 42.0);

        app.handle_key_event(key(KeyCode::Char(':')));
        for c in "bogus".chars() {
            app.handle_key_event(key(KeyCode::Char(c)));
        }
        app.handle_key_event(key(KeyCode::Enter));
        assert_eq!(app.status_message.as_ref().unwrap().2, Color::Red);
    }

    #[tokio::test]
    async fn ctrl_q_quits() {
        let mut app = app();
        app.handle_key_event(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }
}
