//! OS media controls (MPRIS on Linux, SMTC on Windows, Now Playing on macOS)
//! through souvlaki.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Result, anyhow};
use log::{debug, info, warn};
use parking_lot::Mutex;
use playback_core::{
    ActionDetails, ActionHandler, NowPlayingMetadata, PositionState, TransportAction,
    TransportPlaybackState, TransportSurface,
};
use souvlaki::{
    MediaControlEvent, MediaControls, MediaMetadata, MediaPlayback, MediaPosition, PlatformConfig,
    SeekDirection,
};

type Handlers = Arc<Mutex<HashMap<TransportAction, ActionHandler>>>;

/// Transport surface backed by the platform media controls
pub struct SystemMediaControls {
    controls: MediaControls,
    handlers: Handlers,
    /// Last published state, used to resolve toggle requests
    playing: Arc<AtomicBool>,
    metadata: Option<NowPlayingMetadata>,
    position: Option<PositionState>,
    state: TransportPlaybackState,
}

impl SystemMediaControls {
    pub fn new() -> Result<Self> {
        let config = PlatformConfig {
            dbus_name: "playback",
            display_name: "PlayBack",
            hwnd: None,
        };
        let mut controls =
            MediaControls::new(config).map_err(|e| anyhow!("Failed to create media controls: {:?}", e))?;

        let handlers: Handlers = Arc::new(Mutex::new(HashMap::new()));
        let playing = Arc::new(AtomicBool::new(false));

        let dispatch_handlers = handlers.clone();
        let dispatch_playing = playing.clone();
        controls
            .attach(move |event: MediaControlEvent| {
                let Some((action, details)) = translate(event, dispatch_playing.load(Ordering::Relaxed))
                else {
                    return;
                };
                debug!("Media control event: {}", action.as_str());
                if let Some(handler) = dispatch_handlers.lock().get(&action) {
                    handler(details);
                }
            })
            .map_err(|e| anyhow!("Failed to attach media controls event handler: {:?}", e))?;

        info!("Media controls initialized");
        Ok(Self {
            controls,
            handlers,
            playing,
            metadata: None,
            position: None,
            state: TransportPlaybackState::None,
        })
    }

    fn publish_metadata(&mut self) {
        let Some(metadata) = &self.metadata else {
            return;
        };
        let duration = self
            .position
            .map(|p| Duration::from_secs_f64(p.duration.max(0.0)));
        let published = MediaMetadata {
            title: Some(metadata.title.as_str()),
            artist: Some(metadata.artist.as_str()),
            album: Some(metadata.album.as_str()),
            cover_url: metadata.artwork.first().map(|a| a.src.as_str()),
            duration,
        };
        if let Err(e) = self.controls.set_metadata(published) {
            warn!("Failed to publish media metadata: {:?}", e);
        }
    }

    fn publish_playback(&mut self) {
        let progress = self
            .position
            .map(|p| MediaPosition(Duration::from_secs_f64(p.position.max(0.0))));
        let playback = match self.state {
            TransportPlaybackState::Playing => MediaPlayback::Playing { progress },
            TransportPlaybackState::Paused => MediaPlayback::Paused { progress },
            TransportPlaybackState::None => MediaPlayback::Stopped,
        };
        if let Err(e) = self.controls.set_playback(playback) {
            warn!("Failed to publish playback state: {:?}", e);
        }
    }
}

impl TransportSurface for SystemMediaControls {
    fn set_metadata(&mut self, metadata: Option<NowPlayingMetadata>) {
        self.metadata = metadata;
        self.publish_metadata();
    }

    fn set_action_handler(&mut self, action: TransportAction, handler: Option<ActionHandler>) {
        let mut handlers = self.handlers.lock();
        match handler {
            Some(handler) => {
                handlers.insert(action, handler);
            }
            None => {
                handlers.remove(&action);
            }
        }
    }

    fn set_position_state(&mut self, state: PositionState) {
        let duration_changed = self.position.map(|p| p.duration) != Some(state.duration);
        self.position = Some(state);
        if duration_changed {
            self.publish_metadata();
        }
        self.publish_playback();
    }

    fn set_playback_state(&mut self, state: TransportPlaybackState) {
        self.state = state;
        self.playing
            .store(state == TransportPlaybackState::Playing, Ordering::Relaxed);
        self.publish_playback();
    }
}

impl Drop for SystemMediaControls {
    fn drop(&mut self) {
        let _ = self.controls.detach();
    }
}

/// Map a platform event onto one of the registered actions
fn translate(event: MediaControlEvent, playing: bool) -> Option<(TransportAction, ActionDetails)> {
    let none = ActionDetails::default();
    match event {
        MediaControlEvent::Play => Some((TransportAction::Play, none)),
        MediaControlEvent::Pause | MediaControlEvent::Stop => Some((TransportAction::Pause, none)),
        MediaControlEvent::Toggle if playing => Some((TransportAction::Pause, none)),
        MediaControlEvent::Toggle => Some((TransportAction::Play, none)),
        MediaControlEvent::Seek(direction) => Some((seek_action(direction), none)),
        MediaControlEvent::SeekBy(direction, by) => Some((
            seek_action(direction),
            ActionDetails {
                seek_offset: Some(by.as_secs_f64()),
                ..none
            },
        )),
        MediaControlEvent::SetPosition(MediaPosition(position)) => Some((
            TransportAction::SeekTo,
            ActionDetails {
                seek_time: Some(position.as_secs_f64()),
                ..none
            },
        )),
        _ => None,
    }
}

fn seek_action(direction: SeekDirection) -> TransportAction {
    match direction {
        SeekDirection::Forward => TransportAction::SeekForward,
        SeekDirection::Backward => TransportAction::SeekBackward,
    }
}

/// Surface used when media controls are disabled or unavailable
#[derive(Debug, Default)]
pub struct NullSurface;

impl TransportSurface for NullSurface {
    fn set_metadata(&mut self, _metadata: Option<NowPlayingMetadata>) {}

    fn set_action_handler(&mut self, _action: TransportAction, _handler: Option<ActionHandler>) {}

    fn set_position_state(&mut self, _state: PositionState) {}

    fn set_playback_state(&mut self, _state: TransportPlaybackState) {}
}
