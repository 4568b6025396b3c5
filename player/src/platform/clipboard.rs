use playback_core::{Error, Result};

/// Read the system clipboard as text
pub fn read_text() -> Result<String> {
    arboard::Clipboard::new()
        .and_then(|mut clipboard| clipboard.get_text())
        .map_err(|e| Error::ClipboardDenied(e.to_string()))
}
