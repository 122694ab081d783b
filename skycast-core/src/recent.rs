//! Bounded, persisted list of recently selected search results.
//!
//! Most-recent-first, capped at five entries, de-duplicated by coordinate
//! with a small epsilon so re-selecting the same place moves it to the
//! front instead of adding a twin. Persistence is best-effort JSON in the
//! platform data directory; a missing or unreadable file degrades to an
//! empty list.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::model::SearchResult;

const MAX_RECENT: usize = 5;

/// Coordinates closer than this are considered the same place.
const COORD_EPSILON: f64 = 1e-4;

#[derive(Debug)]
pub struct RecentSearches {
    entries: Mutex<Vec<SearchResult>>,
    path: Option<PathBuf>,
}

impl RecentSearches {
    /// In-memory store, nothing persisted.
    pub fn in_memory() -> Self {
        Self { entries: Mutex::new(Vec::new()), path: None }
    }

    /// Store backed by `path`, pre-populated from it when readable.
    pub fn load(path: PathBuf) -> Self {
        let entries = fs::read_to_string(&path)
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok())
            .unwrap_or_default();

        Self { entries: Mutex::new(entries), path: Some(path) }
    }

    /// Record a selected result at the front of the list.
    pub fn record(&self, result: SearchResult) {
        let mut entries = self.entries.lock();
        entries.retain(|existing| !same_place(existing, &result));
        entries.insert(0, result);
        entries.truncate(MAX_RECENT);

        if let Some(path) = &self.path {
            if let Err(err) = persist(path, &entries) {
                tracing::warn!(path = %path.display(), %err, "failed to persist recent searches");
            }
        }
    }

    /// Current entries, most recent first.
    pub fn list(&self) -> Vec<SearchResult> {
        self.entries.lock().clone()
    }
}

fn same_place(a: &SearchResult, b: &SearchResult) -> bool {
    (a.lat - b.lat).abs() < COORD_EPSILON && (a.lon - b.lon).abs() < COORD_EPSILON
}

fn persist(path: &Path, entries: &[SearchResult]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(entries)?;
    fs::write(path, json)?;
    Ok(())
}
