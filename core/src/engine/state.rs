use std::fmt;

use crate::media::RawPlayerState;

/// Normalized playback state seen by the rest of the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    Unstarted,
    #[default]
    Idle,
    Buffering,
    Playing,
    Paused,
    Ended,
}

impl PlaybackState {
    /// Fixed raw-to-normalized table
    pub fn from_raw(raw: RawPlayerState) -> Self {
        match raw {
            RawPlayerState::Unstarted => PlaybackState::Unstarted,
            RawPlayerState::Ended => PlaybackState::Ended,
            RawPlayerState::Playing => PlaybackState::Playing,
            RawPlayerState::Paused => PlaybackState::Paused,
            RawPlayerState::Buffering => PlaybackState::Buffering,
            RawPlayerState::Cued => PlaybackState::Idle,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackState::Unstarted => "unstarted",
            PlaybackState::Idle => "idle",
            PlaybackState::Buffering => "buffering",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Ended => "ended",
        }
    }

    /// Whether a session is in progress (used to decide on the mini player)
    pub fn is_active(self) -> bool {
        matches!(
            self,
            PlaybackState::Playing | PlaybackState::Paused | PlaybackState::Buffering
        )
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user's last explicit play/pause directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntendedPlayState {
    Playing,
    #[default]
    Paused,
}

/// Host visibility of the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

impl Visibility {
    pub fn is_hidden(self) -> bool {
        self == Visibility::Hidden
    }
}
