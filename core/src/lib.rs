pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod media;
pub mod session;
pub mod transport;

// Re-exports
pub use config::PlaybackConfig;
pub use engine::{EngineSnapshot, IntendedPlayState, PlaybackEngine, PlaybackState, Visibility};
pub use error::{Error, Result};
pub use history::{HistoryEntry, HistoryStore};
pub use media::{
    EmbeddedPlayer, MediaId, MetadataFetcher, PlayerEvent, RawPlayerState, VideoMeta, YouTubeConfig,
    YtDlpPlayer, resolve,
};
pub use session::{CompletedFetch, Session, SubmitOutcome};
pub use transport::{
    ActionDetails, ActionHandler, NowPlayingMetadata, PositionState, TransportAction,
    TransportBridge, TransportCommand, TransportPlaybackState, TransportSurface,
};
