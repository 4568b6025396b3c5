use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Length of a YouTube video identifier
pub const ID_LEN: usize = 11;

/// Canonical 11-character YouTube video identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MediaId(String);

impl MediaId {
    /// Accept `token` only if it is exactly an identifier
    pub fn parse(token: &str) -> Option<Self> {
        if token.len() == ID_LEN
            && token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            Some(Self(token.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for MediaId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        MediaId::parse(&value).ok_or_else(|| format!("invalid video id: {value:?}"))
    }
}

impl From<MediaId> for String {
    fn from(id: MediaId) -> Self {
        id.0
    }
}

/// Extract a video identifier from free-form input.
///
/// Accepts a bare identifier, `youtu.be/<id>`, `youtube.com/shorts/<id>`,
/// `youtube.com/embed/<id>` and `youtube.com/watch?v=<id>`. Anything else,
/// including input that is not a URL at all, yields `None`.
pub fn resolve(input: &str) -> Option<MediaId> {
    let trimmed = input.trim();

    if let Some(id) = MediaId::parse(trimmed) {
        return Some(id);
    }

    let parsed = Url::parse(trimmed).ok()?;
    let host = parsed.host_str()?;

    if host == "youtu.be" {
        let first = parsed.path().trim_start_matches('/').split('/').next()?;
        return MediaId::parse(first);
    }

    if host.contains("youtube.com") {
        let path = parsed.path();
        for prefix in ["/shorts/", "/embed/"] {
            if let Some(rest) = path.strip_prefix(prefix) {
                return rest.split('/').next().and_then(MediaId::parse);
            }
        }

        return parsed
            .query_pairs()
            .find(|(key, _)| key == "v")
            .and_then(|(_, value)| MediaId::parse(&value));
    }

    None
}
