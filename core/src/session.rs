use log::{info, warn};

use crate::config::PlaybackConfig;
use crate::error::{Error, Result};
use crate::history::{HistoryEntry, HistoryStore};
use crate::media::{MediaId, MetadataFetcher, VideoMeta, resolve};

/// What the caller should do after a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The id is already playing; just show the player
    AlreadyActive(MediaId),
    /// Fetch metadata for the id, then hand the result to
    /// [`Session::complete_fetch`]
    Fetch(MediaId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletedFetch {
    /// A newer request superseded this one
    Stale,
    /// The id is now active and should be loaded into the engine
    Applied(MediaId),
}

/// Tracks which video is active, which fetch is outstanding, and the history
pub struct Session {
    fetcher: MetadataFetcher,
    history: HistoryStore,
    active: Option<(MediaId, VideoMeta)>,
    pending: Option<MediaId>,
}

impl Session {
    pub fn new(config: &PlaybackConfig) -> Result<Self> {
        let history = match &config.history_path {
            Some(path) => HistoryStore::open(path, config.history_limit),
            None => HistoryStore::in_memory(config.history_limit),
        };
        Ok(Self::with_parts(MetadataFetcher::new(config)?, history))
    }

    pub fn with_parts(fetcher: MetadataFetcher, history: HistoryStore) -> Self {
        Self {
            fetcher,
            history,
            active: None,
            pending: None,
        }
    }

    /// Resolve free-form input and decide whether a fetch is needed
    pub fn submit(&mut self, input: &str) -> Result<SubmitOutcome> {
        let id = resolve(input).ok_or_else(|| Error::InvalidIdentifier(input.trim().to_string()))?;
        Ok(self.submit_id(id))
    }

    /// Re-submit the history entry at `index`
    pub fn submit_history(&mut self, index: usize) -> Option<SubmitOutcome> {
        let id = self.history.get(index)?.id.clone();
        Some(self.submit_id(id))
    }

    pub fn submit_id(&mut self, id: MediaId) -> SubmitOutcome {
        if self.active_id() == Some(&id) {
            return SubmitOutcome::AlreadyActive(id);
        }
        info!("Requesting metadata for {}", id);
        self.pending = Some(id.clone());
        SubmitOutcome::Fetch(id)
    }

    /// Apply the result of a metadata fetch started by [`Session::submit`]
    pub fn complete_fetch(&mut self, id: MediaId, result: Result<VideoMeta>) -> Result<CompletedFetch> {
        if self.pending.as_ref() != Some(&id) {
            info!("Discarding stale metadata for {}", id);
            return Ok(CompletedFetch::Stale);
        }
        self.pending = None;

        let meta = result.map_err(|e| match e {
            Error::MetadataUnavailable(_) => e,
            other => Error::MetadataUnavailable(other.to_string()),
        })?;

        if let Err(e) = self.history.record(HistoryEntry::new(id.clone(), &meta)) {
            warn!("Failed to persist history: {}", e);
        }
        self.active = Some((id.clone(), meta));
        Ok(CompletedFetch::Applied(id))
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn active_id(&self) -> Option<&MediaId> {
        self.active.as_ref().map(|(id, _)| id)
    }

    pub fn active_meta(&self) -> Option<&VideoMeta> {
        self.active.as_ref().map(|(_, meta)| meta)
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn clear_history(&mut self) -> Result<()> {
        self.history.clear()
    }

    /// Handle for running a fetch off the event loop
    pub fn fetcher(&self) -> &MetadataFetcher {
        &self.fetcher
    }
}
