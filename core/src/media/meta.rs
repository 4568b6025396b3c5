use log::{debug, warn};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::PlaybackConfig;
use crate::error::{Error, Result};
use crate::media::MediaId;

const UNKNOWN_TITLE: &str = "Unknown Title";
const UNKNOWN_AUTHOR: &str = "Unknown Channel";

/// Display metadata for one video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMeta {
    /// Video title
    pub title: String,
    /// Channel name
    pub author: String,
    /// Thumbnail URL, derived from the id
    pub thumbnail_url: String,
}

/// The subset of the oEmbed payload we read
#[derive(Debug, Default, Clone, Deserialize)]
pub struct OEmbedResponse {
    pub title: Option<String>,
    pub author_name: Option<String>,
}

impl VideoMeta {
    /// Build metadata from an oEmbed payload, filling in placeholders
    pub fn from_oembed(id: &MediaId, payload: OEmbedResponse, config: &PlaybackConfig) -> Self {
        Self {
            title: payload.title.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            author: payload
                .author_name
                .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
            thumbnail_url: thumbnail_url(id, config),
        }
    }
}

/// Fixed-resolution thumbnail URL for `id`
pub fn thumbnail_url(id: &MediaId, config: &PlaybackConfig) -> String {
    config.thumbnail_template.replace("{id}", id.as_str())
}

/// Canonical watch URL for `id`
pub fn watch_url(id: &MediaId, config: &PlaybackConfig) -> Result<Url> {
    Url::parse_with_params(&config.watch_url_base, &[("v", id.as_str())])
        .map_err(|e| Error::MetadataUnavailable(format!("bad watch URL base: {e}")))
}

/// Retrieves [`VideoMeta`] from the oEmbed endpoint.
///
/// One attempt per call, no retry. Any failure maps to
/// [`Error::MetadataUnavailable`].
#[derive(Debug, Clone)]
pub struct MetadataFetcher {
    client: reqwest::Client,
    config: PlaybackConfig,
}

impl MetadataFetcher {
    pub fn new(config: &PlaybackConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::MetadataUnavailable(format!("http client: {e}")))?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::Client, config: &PlaybackConfig) -> Self {
        Self {
            client,
            config: config.clone(),
        }
    }

    /// Lookup URL for `id`: `<endpoint>?url=<watch-url>&format=json`
    pub fn lookup_url(&self, id: &MediaId) -> Result<Url> {
        let watch = watch_url(id, &self.config)?;
        Url::parse_with_params(
            &self.config.oembed_endpoint,
            &[("url", watch.as_str()), ("format", "json")],
        )
        .map_err(|e| Error::MetadataUnavailable(format!("bad oEmbed endpoint: {e}")))
    }

    pub async fn fetch(&self, id: &MediaId) -> Result<VideoMeta> {
        let url = self.lookup_url(id)?;
        debug!("Fetching metadata for {} from {}", id, url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::MetadataUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Metadata lookup for {} returned {}", id, status);
            return Err(Error::MetadataUnavailable(format!("HTTP {status}")));
        }

        let payload = response
            .json::<OEmbedResponse>()
            .await
            .map_err(|e| Error::MetadataUnavailable(format!("malformed payload: {e}")))?;

        Ok(VideoMeta::from_oembed(id, payload, &self.config))
    }
}
