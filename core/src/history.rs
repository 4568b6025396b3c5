use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::media::{MediaId, VideoMeta};

/// One recently played video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "videoId")]
    pub id: MediaId,
    pub title: String,
    #[serde(rename = "thumbnail")]
    pub thumbnail_url: String,
    pub author: String,
}

impl HistoryEntry {
    pub fn new(id: MediaId, meta: &VideoMeta) -> Self {
        Self {
            id,
            title: meta.title.clone(),
            thumbnail_url: meta.thumbnail_url.clone(),
            author: meta.author.clone(),
        }
    }
}

/// Recently played list: newest first, unique by id, bounded.
///
/// Persisted as a single JSON array. Every write replaces the whole file.
#[derive(Debug)]
pub struct HistoryStore {
    path: Option<PathBuf>,
    limit: usize,
    entries: Vec<HistoryEntry>,
}

impl HistoryStore {
    /// Load the history at `path`. A missing or unreadable file yields an
    /// empty history.
    pub fn open(path: impl Into<PathBuf>, limit: usize) -> Self {
        let path = path.into();
        let entries = match Self::read(&path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Ignoring history at {}: {}", path.display(), e);
                Vec::new()
            }
        };

        let mut store = Self {
            path: Some(path),
            limit,
            entries: Vec::new(),
        };
        // Re-apply the invariants in case the file was edited by hand
        for entry in entries.into_iter().rev() {
            store.push_front(entry);
        }
        store
    }

    /// History that is never written to disk
    pub fn in_memory(limit: usize) -> Self {
        Self {
            path: None,
            limit,
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Put `entry` at the front, dropping any older entry with the same id
    /// and evicting the oldest beyond the limit, then persist.
    pub fn record(&mut self, entry: HistoryEntry) -> Result<()> {
        debug!("Recording {} in history", entry.id);
        self.push_front(entry);
        self.save()
    }

    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.save()
    }

    fn push_front(&mut self, entry: HistoryEntry) {
        self.entries.retain(|existing| existing.id != entry.id);
        self.entries.insert(0, entry);
        self.entries.truncate(self.limit);
    }

    fn read(path: &Path) -> Result<Vec<HistoryEntry>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(path).map_err(|e| Error::History(e.to_string()))?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::History(e.to_string()))?;
        }
        let json = serde_json::to_string(&self.entries)?;
        fs::write(path, json).map_err(|e| Error::History(e.to_string()))
    }
}
