mod id;
mod meta;
mod youtube;

pub use id::{ID_LEN, MediaId, resolve};
pub use meta::{MetadataFetcher, OEmbedResponse, VideoMeta, thumbnail_url, watch_url};
pub use youtube::{YouTubeConfig, YtDlpPlayer};

/// State codes reported by the embedded player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawPlayerState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    /// Code 5, reported once a video is cued
    Cued,
}

impl RawPlayerState {
    /// Decode a raw player code. Unknown codes read as `Cued`, which
    /// normalizes to idle.
    pub fn from_code(code: i32) -> Self {
        match code {
            -1 => RawPlayerState::Unstarted,
            0 => RawPlayerState::Ended,
            1 => RawPlayerState::Playing,
            2 => RawPlayerState::Paused,
            3 => RawPlayerState::Buffering,
            _ => RawPlayerState::Cued,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            RawPlayerState::Unstarted => -1,
            RawPlayerState::Ended => 0,
            RawPlayerState::Playing => 1,
            RawPlayerState::Paused => 2,
            RawPlayerState::Buffering => 3,
            RawPlayerState::Cued => 5,
        }
    }
}

/// Asynchronous notifications from the embedded player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Fired once when the player finished initializing
    Ready,
    /// Fired whenever the player's own state changes
    StateChange(RawPlayerState),
}

/// The embedded media player the engine drives.
///
/// Commands are fire-and-forget; the player reports what actually happened
/// through [`PlayerEvent`]s drained with `poll_event`.
pub trait EmbeddedPlayer {
    /// Load `id` and start playing it
    fn load_video_by_id(&mut self, id: &MediaId);

    /// Load `id` without starting playback
    fn cue_video_by_id(&mut self, id: &MediaId);

    fn play_video(&mut self);

    fn pause_video(&mut self);

    fn seek_to(&mut self, seconds: f64, allow_seek_ahead: bool);

    /// Volume in `0..=100`
    fn set_volume(&mut self, volume: u8);

    /// Current playback position in seconds
    fn current_time(&self) -> f64;

    /// Duration of the loaded media in seconds, 0 when unknown
    fn duration(&self) -> f64;

    fn player_state(&self) -> RawPlayerState;

    /// Next pending event, if any
    fn poll_event(&mut self) -> Option<PlayerEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_codes_decode() {
        for (code, state) in [
            (-1, RawPlayerState::Unstarted),
            (0, RawPlayerState::Ended),
            (1, RawPlayerState::Playing),
            (2, RawPlayerState::Paused),
            (3, RawPlayerState::Buffering),
            (5, RawPlayerState::Cued),
        ] {
            assert_eq!(RawPlayerState::from_code(code), state);
            assert_eq!(state.code(), code);
        }
        assert_eq!(RawPlayerState::from_code(42), RawPlayerState::Cued);
    }
}
