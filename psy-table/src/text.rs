//! Text normalization and a per-run file cache

use crate::error::{TableError, TableResult};
use std::collections::HashMap;
use tracing::trace;

/// Collapse runs of whitespace to single spaces and trim both ends
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Plain-text file contents keyed by path
///
/// One cache lives for one command invocation so that templates read for
/// every row are loaded from disk once.
#[derive(Debug, Clone, Default)]
pub struct TextCache {
    entries: HashMap<String, String>,
}

impl TextCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents of the file at `path`; an empty path reads as ""
    pub fn read(&mut self, path: &str) -> TableResult<&str> {
        if path.is_empty() {
            return Ok("");
        }
        if !self.entries.contains_key(path) {
            let text = std::fs::read_to_string(path).map_err(|e| TableError::io(path, e))?;
            trace!(path, bytes = text.len(), "cached text file");
            self.entries.insert(path.to_string(), text);
        }
        Ok(self.entries.get(path).map_or("", String::as_str))
    }

    /// Number of cached files
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been cached yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
