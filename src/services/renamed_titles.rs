//! Reverse lookup from rewritten titles to what the indexer sent
//!
//! Download clients only ever see the rewritten title. When a manager later
//! asks about a grabbed release, this answers which release name the
//! indexer originally published.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

/// One recorded rename
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamedTitle {
    pub original: String,
    pub renamed: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct RenamedTitles {
    entries: RwLock<HashMap<String, RenamedTitle>>,
}

impl RenamedTitles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `original` was published as `renamed`. A later rename to
    /// the same title overwrites the earlier one.
    pub fn record(&self, renamed: &str, original: &str) {
        let entry = RenamedTitle {
            original: original.to_string(),
            renamed: renamed.to_string(),
            recorded_at: Utc::now(),
        };
        self.entries.write().insert(renamed.to_string(), entry);
    }

    pub fn original_title(&self, renamed: &str) -> Option<String> {
        self.entries
            .read()
            .get(renamed.trim())
            .map(|entry| entry.original.clone())
    }

    pub fn get(&self, renamed: &str) -> Option<RenamedTitle> {
        self.entries.read().get(renamed.trim()).cloned()
    }

    /// Snapshot of every recorded rename, oldest first.
    pub fn entries(&self) -> Vec<RenamedTitle> {
        let mut entries: Vec<RenamedTitle> = self.entries.read().values().cloned().collect();
        entries.sort_by_key(|e| e.recorded_at);
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
