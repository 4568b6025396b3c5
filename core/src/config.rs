use std::path::PathBuf;
use std::time::Duration;

/// Period of the position readout while playing
pub const POSITION_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Period of the background watchdog while hidden
pub const WATCHDOG_INTERVAL: Duration = Duration::from_millis(500);
/// Delay of the one-shot resume after becoming visible again
pub const RESUME_DELAY: Duration = Duration::from_millis(100);
/// Offset used by relative transport seeks when the host gives none
pub const DEFAULT_SEEK_OFFSET: f64 = 10.0;
/// Maximum number of entries kept in the recent history
pub const HISTORY_LIMIT: usize = 10;

/// Configuration for the playback core
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// oEmbed lookup endpoint
    pub oembed_endpoint: String,
    /// Base of the canonical watch URL, the id goes into `v`
    pub watch_url_base: String,
    /// Thumbnail URL template, `{id}` is replaced by the identifier
    pub thumbnail_template: String,
    /// Timeout for the metadata request
    pub request_timeout: Duration,
    /// Location of the history file (None keeps history in memory only)
    pub history_path: Option<PathBuf>,
    /// Maximum history length
    pub history_limit: usize,
    /// Position poll period
    pub position_poll_interval: Duration,
    /// Background watchdog period
    pub watchdog_interval: Duration,
    /// Deferred resume delay
    pub resume_delay: Duration,
    /// Default relative seek offset in seconds
    pub default_seek_offset: f64,
    /// Album name published on the transport surface
    pub album: String,
    /// Artwork size hint published on the transport surface
    pub artwork_sizes: String,
    /// Artwork MIME type published on the transport surface
    pub artwork_mime: String,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            oembed_endpoint: "https://www.youtube.com/oembed".to_string(),
            watch_url_base: "https://www.youtube.com/watch".to_string(),
            thumbnail_template: "https://i.ytimg.com/vi/{id}/hqdefault.jpg".to_string(),
            request_timeout: Duration::from_secs(10),
            history_path: None,
            history_limit: HISTORY_LIMIT,
            position_poll_interval: POSITION_POLL_INTERVAL,
            watchdog_interval: WATCHDOG_INTERVAL,
            resume_delay: RESUME_DELAY,
            default_seek_offset: DEFAULT_SEEK_OFFSET,
            album: "PlayBack".to_string(),
            artwork_sizes: "480x360".to_string(),
            artwork_mime: "image/jpeg".to_string(),
        }
    }
}

impl PlaybackConfig {
    pub fn with_history_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.history_path = Some(path.into());
        self
    }

    pub fn with_oembed_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.oembed_endpoint = endpoint.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let config = PlaybackConfig::default();
        assert_eq!(config.position_poll_interval, Duration::from_secs(1));
        assert_eq!(config.watchdog_interval, Duration::from_millis(500));
        assert_eq!(config.resume_delay, Duration::from_millis(100));
        assert_eq!(config.history_limit, 10);
        assert_eq!(config.default_seek_offset, 10.0);
        assert!(config.history_path.is_none());
    }

    #[test]
    fn builder_overrides() {
        let config = PlaybackConfig::default()
            .with_history_path("/tmp/history.json")
            .with_oembed_endpoint("http://127.0.0.1:9/oembed")
            .with_request_timeout(Duration::from_secs(2));
        assert_eq!(config.history_path, Some(PathBuf::from("/tmp/history.json")));
        assert_eq!(config.oembed_endpoint, "http://127.0.0.1:9/oembed");
        assert_eq!(config.request_timeout, Duration::from_secs(2));
    }
}
