//! Catalog sources feeding the title cache
//!
//! A catalog source is whatever knows the managers' media items (an *arr
//! API client, a JSON export). The periodic scheduler lives outside this
//! crate and only calls [`CatalogSync::sync_once`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::media::{MediaItem, MediaItemRecord, MediaType};
use crate::services::text_utils::lookup_key;
use crate::services::title_cache::TitleCache;

/// Supplies media item records for one or more media types.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Name used in logs (e.g. "sonarr", "catalog.json").
    fn name(&self) -> &str;

    /// Whether this source can answer lookups for `media_type`.
    fn serves(&self, media_type: MediaType) -> bool;

    /// Every record the source knows.
    async fn fetch_all(&self) -> Result<Vec<MediaItemRecord>>;

    async fn fetch_by_external_id(
        &self,
        media_type: MediaType,
        external_id: &str,
    ) -> Result<Option<MediaItemRecord>>;

    async fn fetch_by_title(&self, media_type: MediaType, title: &str) -> Result<Option<MediaItemRecord>>;
}

/// Read a JSON array of catalog records.
pub async fn load_records(path: &Path) -> Result<Vec<MediaItemRecord>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;
    let records: Vec<MediaItemRecord> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse catalog {}", path.display()))?;
    Ok(records)
}

/// Catalog backed by a JSON file of [`MediaItemRecord`]s.
///
/// The file is re-read on every call so an exporter can replace it between
/// syncs.
#[derive(Debug, Clone)]
pub struct JsonCatalogSource {
    path: PathBuf,
    name: String,
}

impl JsonCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { path, name }
    }
}

#[async_trait]
impl CatalogSource for JsonCatalogSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn serves(&self, _media_type: MediaType) -> bool {
        true
    }

    async fn fetch_all(&self) -> Result<Vec<MediaItemRecord>> {
        load_records(&self.path).await
    }

    async fn fetch_by_external_id(
        &self,
        media_type: MediaType,
        external_id: &str,
    ) -> Result<Option<MediaItemRecord>> {
        let records = self.fetch_all().await?;
        Ok(records
            .into_iter()
            .find(|r| r.media_type == media_type && r.external_id == external_id))
    }

    async fn fetch_by_title(&self, media_type: MediaType, title: &str) -> Result<Option<MediaItemRecord>> {
        let wanted = lookup_key(title);
        if wanted.is_empty() {
            return Ok(None);
        }

        let records = self.fetch_all().await?;
        Ok(records.into_iter().find(|r| {
            r.media_type == media_type
                && std::iter::once(&r.title)
                    .chain(std::iter::once(&r.expected_title))
                    .chain(r.local_title.iter())
                    .chain(r.aliases.iter())
                    .any(|t| lookup_key(t) == wanted)
        }))
    }
}

/// Outcome of one sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub items_cached: usize,
    pub sources_failed: Vec<String>,
}

/// Pulls every catalog source into the title cache.
pub struct CatalogSync {
    cache: Arc<TitleCache>,
    sources: Vec<Arc<dyn CatalogSource>>,
}

impl CatalogSync {
    pub fn new(cache: Arc<TitleCache>, sources: Vec<Arc<dyn CatalogSource>>) -> Self {
        Self { cache, sources }
    }

    /// Fetch all sources once. A failing source is logged and skipped; the
    /// other sources are still synced.
    pub async fn sync_once(&self) -> SyncReport {
        let mut report = SyncReport::default();

        for source in &self.sources {
            match source.fetch_all().await {
                Ok(records) => {
                    let count = records.len();
                    for record in records {
                        let item = MediaItem::from_record(record);
                        if !item.is_matchable() {
                            debug!(
                                source = %source.name(),
                                external_id = %item.external_id,
                                "Caching item without match variations"
                            );
                        }
                        self.cache.put(item);
                    }
                    report.items_cached += count;
                    info!(source = %source.name(), items = count, "Synced catalog source");
                }
                Err(e) => {
                    warn!(source = %source.name(), error = %e, "Failed to sync catalog source");
                    report.sources_failed.push(source.name().to_string());
                }
            }
        }

        let purged = self.cache.purge_expired();
        if purged > 0 {
            debug!(purged, "Purged expired items after sync");
        }

        report
    }
}
