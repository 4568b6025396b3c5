//! Projection of the engine onto the OS "now playing" surface, and relay of
//! transport controls back into the engine.
//!
//! Handlers registered on the surface never touch the engine. They enqueue a
//! [`TransportCommand`] and the event loop applies it with
//! [`TransportBridge::relay`], so all engine mutation stays on one thread.

use log::{debug, info};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::config::PlaybackConfig;
use crate::engine::{Clock, EngineSnapshot, PlaybackEngine, PlaybackState};
use crate::media::{EmbeddedPlayer, VideoMeta};

/// Actions the bridge registers handlers for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportAction {
    Play,
    Pause,
    SeekTo,
    SeekBackward,
    SeekForward,
}

impl TransportAction {
    pub const ALL: [TransportAction; 5] = [
        TransportAction::Play,
        TransportAction::Pause,
        TransportAction::SeekTo,
        TransportAction::SeekBackward,
        TransportAction::SeekForward,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TransportAction::Play => "play",
            TransportAction::Pause => "pause",
            TransportAction::SeekTo => "seekto",
            TransportAction::SeekBackward => "seekbackward",
            TransportAction::SeekForward => "seekforward",
        }
    }
}

/// Arguments the host passes along with an action
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActionDetails {
    /// Absolute target for `seekto`
    pub seek_time: Option<f64>,
    /// Offset for relative seeks
    pub seek_offset: Option<f64>,
}

pub type ActionHandler = Box<dyn Fn(ActionDetails) + Send>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artwork {
    pub src: String,
    pub sizes: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlayingMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub artwork: Vec<Artwork>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionState {
    pub duration: f64,
    pub position: f64,
    pub playback_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportPlaybackState {
    None,
    Playing,
    Paused,
}

impl TransportPlaybackState {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportPlaybackState::None => "none",
            TransportPlaybackState::Playing => "playing",
            TransportPlaybackState::Paused => "paused",
        }
    }
}

/// Commands relayed from the transport surface into the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportCommand {
    Play,
    Pause,
    SeekTo(f64),
    /// Relative seek, resolved against the engine position when relayed
    SeekBy(f64),
}

/// OS-level now-playing surface
pub trait TransportSurface {
    fn set_metadata(&mut self, metadata: Option<NowPlayingMetadata>);

    /// Register `handler` for `action`, or clear it with `None`
    fn set_action_handler(&mut self, action: TransportAction, handler: Option<ActionHandler>);

    fn set_position_state(&mut self, state: PositionState);

    fn set_playback_state(&mut self, state: TransportPlaybackState);
}

impl<T: TransportSurface + ?Sized> TransportSurface for Box<T> {
    fn set_metadata(&mut self, metadata: Option<NowPlayingMetadata>) {
        (**self).set_metadata(metadata)
    }

    fn set_action_handler(&mut self, action: TransportAction, handler: Option<ActionHandler>) {
        (**self).set_action_handler(action, handler)
    }

    fn set_position_state(&mut self, state: PositionState) {
        (**self).set_position_state(state)
    }

    fn set_playback_state(&mut self, state: TransportPlaybackState) {
        (**self).set_playback_state(state)
    }
}

/// Keeps a [`TransportSurface`] in sync with the engine
pub struct TransportBridge<S: TransportSurface> {
    surface: S,
    sender: UnboundedSender<TransportCommand>,
    album: String,
    artwork_sizes: String,
    artwork_mime: String,
    default_seek_offset: f64,
    published_meta: Option<VideoMeta>,
    published_position: Option<(f64, f64)>,
    published_state: Option<PlaybackState>,
    attached: bool,
}

impl<S: TransportSurface> TransportBridge<S> {
    /// Create a bridge and the receiving end of its command queue
    pub fn new(surface: S, config: &PlaybackConfig) -> (Self, UnboundedReceiver<TransportCommand>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let bridge = Self {
            surface,
            sender,
            album: config.album.clone(),
            artwork_sizes: config.artwork_sizes.clone(),
            artwork_mime: config.artwork_mime.clone(),
            default_seek_offset: config.default_seek_offset,
            published_meta: None,
            published_position: None,
            published_state: None,
            attached: false,
        };
        (bridge, receiver)
    }

    /// Register the five action handlers
    pub fn attach(&mut self) {
        if self.attached {
            return;
        }
        for action in TransportAction::ALL {
            let handler = self.handler(action);
            self.surface.set_action_handler(action, Some(handler));
        }
        self.attached = true;
        info!("Transport handlers attached");
    }

    /// Clear every handler so the host cannot reach a stale bridge
    pub fn teardown(&mut self) {
        if !self.attached {
            return;
        }
        for action in TransportAction::ALL {
            self.surface.set_action_handler(action, None);
        }
        self.attached = false;
        info!("Transport handlers cleared");
    }

    /// Republish metadata when title, author or thumbnail changed. Nothing is
    /// published until there is a title.
    pub fn sync_metadata(&mut self, meta: Option<&VideoMeta>) {
        let Some(meta) = meta else {
            return;
        };
        if meta.title.is_empty() || self.published_meta.as_ref() == Some(meta) {
            return;
        }

        debug!("Publishing now-playing metadata: {}", meta.title);
        self.surface.set_metadata(Some(NowPlayingMetadata {
            title: meta.title.clone(),
            artist: meta.author.clone(),
            album: self.album.clone(),
            artwork: vec![Artwork {
                src: meta.thumbnail_url.clone(),
                sizes: self.artwork_sizes.clone(),
                mime_type: self.artwork_mime.clone(),
            }],
        }));
        self.published_meta = Some(meta.clone());
    }

    /// Republish position and playback state when they changed
    pub fn sync(&mut self, snapshot: &EngineSnapshot) {
        self.sync_position(snapshot.position, snapshot.duration);
        self.sync_state(snapshot.state);
    }

    fn sync_position(&mut self, position: f64, duration: f64) {
        if duration <= 0.0 || self.published_position == Some((position, duration)) {
            return;
        }
        self.surface.set_position_state(PositionState {
            duration,
            position: position.min(duration),
            playback_rate: 1.0,
        });
        self.published_position = Some((position, duration));
    }

    fn sync_state(&mut self, state: PlaybackState) {
        if self.published_state == Some(state) {
            return;
        }
        self.published_state = Some(state);
        let transport = match state {
            PlaybackState::Playing => TransportPlaybackState::Playing,
            PlaybackState::Paused | PlaybackState::Ended => TransportPlaybackState::Paused,
            _ => return,
        };
        debug!("Publishing playback state {}", transport.as_str());
        self.surface.set_playback_state(transport);
    }

    /// Apply a queued transport command to the engine
    pub fn relay<P: EmbeddedPlayer, C: Clock>(
        &self,
        command: TransportCommand,
        engine: &mut PlaybackEngine<P, C>,
    ) {
        debug!("Transport command: {:?}", command);
        match command {
            TransportCommand::Play => engine.play(),
            TransportCommand::Pause => engine.pause(),
            TransportCommand::SeekTo(seconds) => engine.seek(seconds),
            TransportCommand::SeekBy(delta) => {
                let snapshot = engine.snapshot();
                let mut target = (snapshot.position + delta).max(0.0);
                if snapshot.duration > 0.0 {
                    target = target.min(snapshot.duration);
                }
                engine.seek(target);
            }
        }
    }

    fn handler(&self, action: TransportAction) -> ActionHandler {
        let sender = self.sender.clone();
        let offset = self.default_seek_offset;
        Box::new(move |details: ActionDetails| {
            let command = match action {
                TransportAction::Play => Some(TransportCommand::Play),
                TransportAction::Pause => Some(TransportCommand::Pause),
                TransportAction::SeekTo => details.seek_time.map(TransportCommand::SeekTo),
                TransportAction::SeekBackward => Some(TransportCommand::SeekBy(
                    -details.seek_offset.unwrap_or(offset),
                )),
                TransportAction::SeekForward => Some(TransportCommand::SeekBy(
                    details.seek_offset.unwrap_or(offset),
                )),
            };
            if let Some(command) = command {
                let _ = sender.send(command);
            }
        })
    }
}

impl<S: TransportSurface> Drop for TransportBridge<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}
