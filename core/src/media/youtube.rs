//! Audio-only [`EmbeddedPlayer`] built on yt-dlp and rodio.
//!
//! A dedicated audio thread owns the output stream and the sink. The
//! [`YtDlpPlayer`] handle talks to it over channels and reads a shared status
//! for position and state queries.

use std::io::Cursor;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, anyhow};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use rodio::{Decoder, OutputStream, Sink, Source};
use youtube_dl::{YoutubeDl, YoutubeDlOutput};

use super::{EmbeddedPlayer, MediaId, PlayerEvent, RawPlayerState, watch_url};
use crate::config::PlaybackConfig;
use crate::error::{Error, Result};

/// How often the audio thread samples the sink
const TICK: Duration = Duration::from_millis(100);

/// Configuration for the yt-dlp backend
#[derive(Debug, Clone)]
pub struct YouTubeConfig {
    /// Path to the yt-dlp executable (None for auto-detect)
    pub ytdlp_path: Option<String>,
    /// Proxy for yt-dlp and the download (e.g. "socks5://127.0.0.1:9050")
    pub proxy: Option<String>,
    /// Socket timeout in seconds
    pub timeout: u64,
    /// yt-dlp format selector
    pub format: String,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            proxy: None,
            timeout: 30,
            format: "bestaudio[ext=m4a]/bestaudio/best".to_string(),
        }
    }
}

/// Downloads the encoded audio of a video along with its reported duration
type FetchAudio = fn(&MediaId, &YouTubeConfig, &PlaybackConfig) -> anyhow::Result<(Arc<[u8]>, f64)>;

/// What the worker does once the audio of a load arrives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartMode {
    Play,
    Cue,
    /// Paused while buffering
    Pause,
}

/// Stream picked by yt-dlp
#[derive(Debug, Clone, PartialEq)]
struct ResolvedStream {
    url: String,
    /// Duration reported by yt-dlp, 0 when unknown
    duration: f64,
}

#[derive(Debug)]
enum AudioCommand {
    Load {
        generation: u64,
        id: MediaId,
        autoplay: bool,
    },
    Fetched {
        generation: u64,
        audio: Arc<[u8]>,
        duration: f64,
    },
    FetchFailed {
        generation: u64,
        message: String,
    },
    Play,
    Pause,
    Seek(f64),
    Volume(u8),
    Shutdown,
}

#[derive(Debug)]
struct Status {
    state: RawPlayerState,
    position: f64,
    duration: f64,
    last_error: Option<String>,
}

impl Default for Status {
    fn default() -> Self {
        Self {
            state: RawPlayerState::Unstarted,
            position: 0.0,
            duration: 0.0,
            last_error: None,
        }
    }
}

/// Plays the audio track of YouTube videos
pub struct YtDlpPlayer {
    commands: Sender<AudioCommand>,
    events: Receiver<PlayerEvent>,
    status: Arc<Mutex<Status>>,
    generation: u64,
    thread: Option<JoinHandle<()>>,
}

impl YtDlpPlayer {
    /// Spawn the audio thread. `Ready` is reported once the output device
    /// is open.
    pub fn new(config: YouTubeConfig, playback: &PlaybackConfig) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let status = Arc::new(Mutex::new(Status::default()));

        let worker = AudioWorker::new(command_tx.clone(), event_tx, status.clone(), config, playback.clone());

        let thread = thread::Builder::new()
            .name("audio".to_string())
            .spawn(move || worker.run(command_rx))
            .map_err(|e| Error::Backend(format!("failed to spawn audio thread: {e}")))?;

        Ok(Self {
            commands: command_tx,
            events: event_rx,
            status,
            generation: 0,
            thread: Some(thread),
        })
    }

    /// Last backend failure, cleared on read
    pub fn take_error(&mut self) -> Option<Error> {
        self.status.lock().last_error.take().map(Error::Backend)
    }

    fn send(&self, command: AudioCommand) {
        if self.commands.send(command).is_err() {
            warn!("Audio thread is gone, dropping command");
        }
    }

    fn load(&mut self, id: &MediaId, autoplay: bool) {
        self.generation += 1;
        self.send(AudioCommand::Load {
            generation: self.generation,
            id: id.clone(),
            autoplay,
        });
    }
}

impl EmbeddedPlayer for YtDlpPlayer {
    fn load_video_by_id(&mut self, id: &MediaId) {
        self.load(id, true);
    }

    fn cue_video_by_id(&mut self, id: &MediaId) {
        self.load(id, false);
    }

    fn play_video(&mut self) {
        self.send(AudioCommand::Play);
    }

    fn pause_video(&mut self) {
        self.send(AudioCommand::Pause);
    }

    fn seek_to(&mut self, seconds: f64, _allow_seek_ahead: bool) {
        self.send(AudioCommand::Seek(seconds));
    }

    fn set_volume(&mut self, volume: u8) {
        self.send(AudioCommand::Volume(volume));
    }

    fn current_time(&self) -> f64 {
        self.status.lock().position
    }

    fn duration(&self) -> f64 {
        self.status.lock().duration
    }

    fn player_state(&self) -> RawPlayerState {
        self.status.lock().state
    }

    fn poll_event(&mut self) -> Option<PlayerEvent> {
        self.events.try_recv().ok()
    }
}

impl Drop for YtDlpPlayer {
    fn drop(&mut self) {
        let _ = self.commands.send(AudioCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Audio thread panicked");
            }
        }
    }
}

/// State owned by the audio thread
struct AudioWorker {
    commands: Sender<AudioCommand>,
    events: Sender<PlayerEvent>,
    status: Arc<Mutex<Status>>,
    config: YouTubeConfig,
    playback: PlaybackConfig,
    generation: u64,
    /// Encoded audio of the current track, kept for replays after the end
    audio: Option<Arc<[u8]>>,
    start_mode: StartMode,
    pending_seek: Option<f64>,
    fetch: FetchAudio,
}

impl AudioWorker {
    fn new(
        commands: Sender<AudioCommand>,
        events: Sender<PlayerEvent>,
        status: Arc<Mutex<Status>>,
        config: YouTubeConfig,
        playback: PlaybackConfig,
    ) -> Self {
        Self {
            commands,
            events,
            status,
            config,
            playback,
            generation: 0,
            audio: None,
            start_mode: StartMode::Cue,
            pending_seek: None,
            fetch: fetch_audio,
        }
    }

    fn run(mut self, commands: Receiver<AudioCommand>) {
        // The stream must outlive the sink and cannot leave this thread
        let (_stream, handle) = match OutputStream::try_default() {
            Ok(output) => output,
            Err(e) => {
                error!("Failed to open audio output: {}", e);
                self.status.lock().last_error = Some(e.to_string());
                return;
            }
        };
        let sink = match Sink::try_new(&handle) {
            Ok(sink) => sink,
            Err(e) => {
                error!("Failed to create audio sink: {}", e);
                self.status.lock().last_error = Some(e.to_string());
                return;
            }
        };
        sink.pause();

        info!("Audio output ready");
        let _ = self.events.send(PlayerEvent::Ready);

        loop {
            match commands.recv_timeout(TICK) {
                Ok(AudioCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Ok(command) => self.handle(command, &sink),
                Err(RecvTimeoutError::Timeout) => {}
            }
            self.tick(&sink);
        }

        sink.stop();
        debug!("Audio thread stopped");
    }

    fn emit(&self, state: RawPlayerState) {
        self.status.lock().state = state;
        let _ = self.events.send(PlayerEvent::StateChange(state));
    }

    fn handle(&mut self, command: AudioCommand, sink: &Sink) {
        match command {
            AudioCommand::Load {
                generation,
                id,
                autoplay,
            } => {
                info!("Loading audio for {} (autoplay: {})", id, autoplay);
                self.generation = generation;
                self.audio = None;
                self.start_mode = if autoplay { StartMode::Play } else { StartMode::Cue };
                self.pending_seek = None;
                sink.clear();
                {
                    let mut status = self.status.lock();
                    status.position = 0.0;
                    status.duration = 0.0;
                }
                self.emit(RawPlayerState::Unstarted);
                self.emit(RawPlayerState::Buffering);
                self.spawn_fetch(generation, id);
            }
            AudioCommand::Fetched {
                generation,
                audio,
                duration,
            } => {
                if generation != self.generation {
                    debug!("Dropping audio of superseded load {}", generation);
                    return;
                }
                self.start(audio, duration, sink);
            }
            AudioCommand::FetchFailed {
                generation,
                message,
            } => {
                if generation != self.generation {
                    return;
                }
                error!("Failed to load audio: {}", message);
                self.status.lock().last_error = Some(message);
                self.emit(RawPlayerState::Unstarted);
            }
            AudioCommand::Play => {
                self.start_mode = StartMode::Play;
                let Some(audio) = self.audio.clone() else {
                    return;
                };
                if sink.empty() {
                    // Replay after the track ended
                    if let Err(e) = self.append(&audio, sink) {
                        warn!("Failed to restart audio: {}", e);
                        return;
                    }
                }
                sink.play();
                self.emit(RawPlayerState::Playing);
            }
            AudioCommand::Pause => {
                self.start_mode = StartMode::Pause;
                if self.audio.is_some() {
                    sink.pause();
                    self.emit(RawPlayerState::Paused);
                }
            }
            AudioCommand::Seek(seconds) => {
                if self.audio.is_none() {
                    self.pending_seek = Some(seconds);
                    return;
                }
                self.seek(seconds, sink);
            }
            AudioCommand::Volume(volume) => {
                sink.set_volume(f32::from(volume) / 100.0);
            }
            AudioCommand::Shutdown => {}
        }
    }

    fn start(&mut self, audio: Arc<[u8]>, reported_duration: f64, sink: &Sink) {
        let decoded_duration = match self.append(&audio, sink) {
            Ok(duration) => duration,
            Err(e) => {
                error!("Failed to decode audio: {}", e);
                self.status.lock().last_error = Some(e.to_string());
                self.emit(RawPlayerState::Unstarted);
                return;
            }
        };

        let duration = decoded_duration
            .filter(|d| *d > 0.0)
            .unwrap_or(reported_duration);
        self.status.lock().duration = duration;
        self.audio = Some(audio);
        debug!("Audio decoded, duration {:.1}s", duration);

        if let Some(seconds) = self.pending_seek.take() {
            self.seek(seconds, sink);
        }

        match self.start_mode {
            StartMode::Play => {
                sink.play();
                self.emit(RawPlayerState::Playing);
            }
            StartMode::Cue => {
                sink.pause();
                self.emit(RawPlayerState::Cued);
            }
            StartMode::Pause => {
                sink.pause();
                self.emit(RawPlayerState::Paused);
            }
        }
    }

    /// Decode `audio` into the sink, returning the decoder's duration
    fn append(&self, audio: &Arc<[u8]>, sink: &Sink) -> anyhow::Result<Option<f64>> {
        let source = Decoder::new(Cursor::new(audio.clone())).context("Unsupported audio stream")?;
        let duration = source.total_duration().map(|d| d.as_secs_f64());
        sink.append(source);
        Ok(duration)
    }

    fn seek(&self, seconds: f64, sink: &Sink) {
        let target = Duration::from_secs_f64(seconds.max(0.0));
        match sink.try_seek(target) {
            Ok(()) => self.status.lock().position = seconds.max(0.0),
            Err(e) => warn!("Seek to {:.1}s failed: {}", seconds, e),
        }
    }

    fn tick(&mut self, sink: &Sink) {
        if self.audio.is_none() {
            return;
        }
        let state = {
            let mut status = self.status.lock();
            status.position = sink.get_pos().as_secs_f64();
            status.state
        };
        if state == RawPlayerState::Playing && sink.empty() {
            info!("Audio track finished");
            self.start_mode = StartMode::Cue;
            self.status.lock().position = 0.0;
            self.emit(RawPlayerState::Ended);
        }
    }

    fn spawn_fetch(&self, generation: u64, id: MediaId) {
        let commands = self.commands.clone();
        let config = self.config.clone();
        let playback = self.playback.clone();
        let fetch = self.fetch;

        let spawned = thread::Builder::new()
            .name(format!("fetch-{id}"))
            .spawn(move || {
                let command = match fetch(&id, &config, &playback) {
                    Ok((audio, duration)) => AudioCommand::Fetched {
                        generation,
                        audio,
                        duration,
                    },
                    Err(e) => AudioCommand::FetchFailed {
                        generation,
                        message: format!("{e:#}"),
                    },
                };
                let _ = commands.send(command);
            });

        if let Err(e) = spawned {
            let _ = self.commands.send(AudioCommand::FetchFailed {
                generation,
                message: format!("failed to spawn fetch thread: {e}"),
            });
        }
    }
}

/// Resolve and download the audio of `id`
fn fetch_audio(
    id: &MediaId,
    config: &YouTubeConfig,
    playback: &PlaybackConfig,
) -> anyhow::Result<(Arc<[u8]>, f64)> {
    let watch = watch_url(id, playback)?;
    let stream = resolve_stream(watch.as_str(), config)?;
    debug!("Selected stream URL: {}", stream.url);

    let mut builder = reqwest::blocking::Client::builder()
        .connect_timeout(Duration::from_secs(config.timeout));
    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy).context("Invalid proxy")?);
    }
    let client = builder.build().context("Failed to build HTTP client")?;

    let bytes = client
        .get(&stream.url)
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.bytes())
        .context("Failed to download audio stream")?;
    info!("Downloaded {} bytes of audio for {}", bytes.len(), id);

    Ok((Arc::from(bytes.as_ref()), stream.duration))
}

/// Ask yt-dlp for the stream matching the configured format
fn resolve_stream(url: &str, config: &YouTubeConfig) -> anyhow::Result<ResolvedStream> {
    let mut ytdl = YoutubeDl::new(url);
    ytdl.format(&config.format);
    ytdl.socket_timeout(config.timeout.to_string());

    if let Some(proxy) = &config.proxy {
        ytdl.extra_arg("--proxy");
        ytdl.extra_arg(proxy);
    }

    let executable = find_ytdlp_executable(config).ok_or_else(|| {
        anyhow!("yt-dlp not found. Install it (e.g. `pip install yt-dlp`) or pass --ytdlp-path")
    })?;
    ytdl.youtube_dl_path(executable);

    match ytdl.run().context("Failed to retrieve YouTube stream information")? {
        YoutubeDlOutput::SingleVideo(video) => {
            let duration = video
                .duration
                .as_ref()
                .map(duration_seconds)
                .unwrap_or(0.0);
            let url = video
                .url
                .clone()
                .or_else(|| {
                    // Formats are listed worst to best
                    video
                        .formats
                        .as_ref()
                        .and_then(|formats| formats.iter().rev().find_map(|f| f.url.clone()))
                })
                .ok_or_else(|| anyhow!("No streaming URL found for the video"))?;
            Ok(ResolvedStream { url, duration })
        }
        YoutubeDlOutput::Playlist(_) => Err(anyhow!("URL refers to a playlist, not a single video")),
    }
}

fn duration_seconds(value: &serde_json::Value) -> f64 {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(0.0)
}

/// Find a working yt-dlp, falling back to youtube-dl
fn find_ytdlp_executable(config: &YouTubeConfig) -> Option<String> {
    let responds = |program: &str| {
        Command::new(program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    };

    if let Some(path) = &config.ytdlp_path {
        if responds(path) {
            return Some(path.clone());
        }
        warn!("Configured yt-dlp at {} does not run, trying PATH", path);
    }

    if responds("yt-dlp") {
        return Some("yt-dlp".to_string());
    }

    if responds("youtube-dl") {
        info!("Using youtube-dl instead of yt-dlp");
        return Some("youtube-dl".to_string());
    }

    None
}
