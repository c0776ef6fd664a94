//! Bounded, newest-first history of successful optimizations.
//!
//! The capping logic is a pure function over lists; [`HistoryStore`] only
//! reads and rewrites the whole collection in a single JSON file.

use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const HISTORY_CAPACITY: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub id: String,
    pub input: String,
    pub output: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl HistoryEntry {
    pub fn new(input: String, output: String, now: DateTime<Utc>) -> Self {
        let millis = now.timestamp_millis();
        // Millisecond prefix keeps ids time-ordered; the suffix keeps two
        // entries recorded in the same millisecond apart.
        let suffix = Uuid::new_v4().simple().to_string();
        Self {
            id: format!("{}-{}", millis, &suffix[..8]),
            input,
            output,
            timestamp: millis,
        }
    }
}

/// Prepend `entry` and drop the oldest entries beyond `cap`.
pub fn push_capped(existing: Vec<HistoryEntry>, entry: HistoryEntry, cap: usize) -> Vec<HistoryEntry> {
    let mut entries = Vec::with_capacity(cap.min(existing.len() + 1));
    entries.push(entry);
    entries.extend(existing);
    entries.truncate(cap);
    entries
}

/// Decode a stored collection. Corrupt data yields an empty history.
pub fn parse_history(raw: &str) -> Vec<HistoryEntry> {
    match serde_json::from_str::<Vec<HistoryEntry>>(raw) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Discarding unreadable history: {}", e);
            Vec::new()
        }
    }
}

/// JSON-file persistence for the history list.
pub struct HistoryStore {
    path: PathBuf,
    capacity: usize,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            capacity: HISTORY_CAPACITY,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored list; a missing or corrupt file is an empty history.
    pub fn load(&self) -> Vec<HistoryEntry> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let mut entries = parse_history(&raw);
                entries.truncate(self.capacity);
                entries
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                tracing::warn!("Could not read history {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    /// Record a new entry and persist the whole collection.
    pub fn record(&self, existing: Vec<HistoryEntry>, entry: HistoryEntry) -> Result<Vec<HistoryEntry>> {
        let entries = push_capped(existing, entry, self.capacity);
        self.save(&entries)?;
        Ok(entries)
    }

    fn save(&self, entries: &[HistoryEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        tracing::debug!(
            "Saved {} history entries to {}",
            entries.len(),
            self.path.display()
        );
        Ok(())
    }
}
