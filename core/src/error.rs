use thiserror::Error;

/// Errors surfaced by the playback core.
///
/// None of these are fatal. Each one is recovered where it occurs and either
/// shown as a short status message or dropped.
#[derive(Debug, Error)]
pub enum Error {
    /// The input did not contain a recognizable video identifier
    #[error("no video identifier found in {0:?}")]
    InvalidIdentifier(String),

    /// The metadata lookup failed (network, HTTP status or payload)
    #[error("video metadata unavailable: {0}")]
    MetadataUnavailable(String),

    /// The embedded player has not finished initializing
    #[error("player is not initialized yet")]
    PlayerUninitialized,

    /// Reading the clipboard was refused or failed
    #[error("clipboard unavailable: {0}")]
    ClipboardDenied(String),

    /// Reading or writing the history file failed
    #[error("history store error: {0}")]
    History(String),

    /// The audio backend failed
    #[error("player backend error: {0}")]
    Backend(String),
}

impl Error {
    /// Short message suitable for the status line
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::InvalidIdentifier(_) => {
                "Invalid YouTube URL. Try a youtube.com/watch or youtu.be link."
            }
            Error::MetadataUnavailable(_) => {
                "Could not load video info. Check the URL and try again."
            }
            Error::PlayerUninitialized => "Player is still starting up.",
            Error::ClipboardDenied(_) => "Clipboard is not available.",
            Error::History(_) => "Could not save recent history.",
            Error::Backend(_) => "Audio playback failed.",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::History(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
