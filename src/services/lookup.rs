//! Get-or-fetch resolution of media items
//!
//! Searches usually name their item by TVDB id or query text. The cache
//! answers first; on a miss the catalog sources are asked and whatever they
//! return is cached for the next search.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::media::{MediaItem, MediaItemRecord, MediaType};
use crate::services::catalog::CatalogSource;
use crate::services::title_cache::TitleCache;

pub struct SearchItemLookup {
    cache: Arc<TitleCache>,
    sources: Vec<Arc<dyn CatalogSource>>,
}

impl SearchItemLookup {
    pub fn new(cache: Arc<TitleCache>, sources: Vec<Arc<dyn CatalogSource>>) -> Self {
        Self { cache, sources }
    }

    pub async fn get_or_fetch_by_external_id(
        &self,
        media_type: MediaType,
        external_id: &str,
    ) -> Option<Arc<MediaItem>> {
        if let Some(item) = self.cache.get_by_external_id(media_type, external_id) {
            return Some(item);
        }

        for source in self.sources.iter().filter(|s| s.serves(media_type)) {
            match source.fetch_by_external_id(media_type, external_id).await {
                Ok(Some(record)) => return Some(self.cache_record(record)),
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        source = %source.name(),
                        media_type = %media_type,
                        external_id = %external_id,
                        error = %e,
                        "Failed to fetch media item by external id"
                    );
                }
            }
        }

        debug!(media_type = %media_type, external_id = %external_id, "Media item not found");
        None
    }

    pub async fn get_or_fetch_by_title(&self, media_type: MediaType, title: &str) -> Option<Arc<MediaItem>> {
        if let Some(item) = self.cache.get_by_title(media_type, title) {
            return Some(item);
        }

        for source in self.sources.iter().filter(|s| s.serves(media_type)) {
            match source.fetch_by_title(media_type, title).await {
                Ok(Some(record)) => return Some(self.cache_record(record)),
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        source = %source.name(),
                        media_type = %media_type,
                        title = %title,
                        error = %e,
                        "Failed to fetch media item by title"
                    );
                }
            }
        }

        debug!(media_type = %media_type, title = %title, "Media item not found");
        None
    }

    fn cache_record(&self, record: MediaItemRecord) -> Arc<MediaItem> {
        self.cache.put(MediaItem::from_record(record))
    }
}
