//! In-process store of known media items
//!
//! Items are sharded by media type; each shard sits behind its own
//! `parking_lot::RwLock`, so lookups for one media type never wait on a sync
//! writing another, and readers of the same shard only wait for the duration
//! of a single `put`.
//!
//! Every shard holds:
//! - the items themselves, keyed by external id
//! - exact `title:` and `var:` keys (normalized title / match variation)
//! - a prefix index over match variations for fuzzy lookups (tv/movie)
//! - an author index for authored media (book/audio)

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::media::{MediaItem, MediaType};
use crate::services::text_utils::{comparison_key, lookup_key, separators_to_space};

/// Number of leading characters a variation bucket is keyed by
const PREFIX_LEN: usize = 5;

/// Shared cache of media items, injected wherever titles are resolved
#[derive(Debug)]
pub struct TitleCache {
    tv: RwLock<Shard>,
    movie: RwLock<Shard>,
    book: RwLock<Shard>,
    audio: RwLock<Shard>,
    ttl: Option<Duration>,
}

#[derive(Debug, Default)]
struct Shard {
    items: HashMap<String, StoredItem>,
    /// `title:` and `var:` keys to external id
    keys: HashMap<String, String>,
    /// Variation prefix to the variations registered under it
    variation_index: HashMap<String, Vec<VariationEntry>>,
    author_index: Vec<AuthorEntry>,
}

#[derive(Debug)]
struct StoredItem {
    item: Arc<MediaItem>,
    expires_at: Option<Instant>,
    keys: Vec<String>,
    prefixes: Vec<String>,
}

#[derive(Debug, Clone)]
struct VariationEntry {
    variation: String,
    external_id: String,
}

#[derive(Debug, Clone)]
struct AuthorEntry {
    author: String,
    /// Comparison keys of the item's match variations, generation order
    titles: Vec<String>,
    external_id: String,
}

impl AuthorEntry {
    fn representative_len(&self) -> usize {
        self.titles.first().map_or(0, |t| t.chars().count())
    }
}

impl StoredItem {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

impl Default for TitleCache {
    fn default() -> Self {
        Self::new(None)
    }
}

impl TitleCache {
    /// Create an empty cache. Entries expire `ttl` after their last `put`;
    /// `None` keeps them until they are replaced.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            tv: RwLock::new(Shard::default()),
            movie: RwLock::new(Shard::default()),
            book: RwLock::new(Shard::default()),
            audio: RwLock::new(Shard::default()),
            ttl,
        }
    }

    fn shard(&self, media_type: MediaType) -> &RwLock<Shard> {
        match media_type {
            MediaType::Tv => &self.tv,
            MediaType::Movie => &self.movie,
            MediaType::Book => &self.book,
            MediaType::Audio => &self.audio,
        }
    }

    /// Insert an item, replacing every entry of a previous item with the same
    /// `(media_type, external_id)`.
    pub fn put(&self, item: MediaItem) -> Arc<MediaItem> {
        let item = Arc::new(item);
        let expires_at = self.ttl.map(|ttl| Instant::now() + ttl);

        let mut shard = self.shard(item.media_type).write();
        let replaced = shard.remove(&item.external_id);
        shard.insert(Arc::clone(&item), expires_at);

        debug!(
            media_type = %item.media_type,
            external_id = %item.external_id,
            title = %item.title,
            variations = item.match_variations.len(),
            replaced,
            "Cached media item"
        );

        item
    }

    pub fn get_by_external_id(&self, media_type: MediaType, external_id: &str) -> Option<Arc<MediaItem>> {
        let shard = self.shard(media_type).read();
        shard.live_item(external_id, Instant::now())
    }

    /// Exact lookup by normalized title; match variations take precedence
    /// over canonical titles.
    pub fn get_by_title(&self, media_type: MediaType, title: &str) -> Option<Arc<MediaItem>> {
        let key = title_key(title);
        if key.is_empty() {
            return None;
        }

        let shard = self.shard(media_type).read();
        let now = Instant::now();
        [format!("var:{}", key), format!("title:{}", key)]
            .iter()
            .filter_map(|k| shard.keys.get(k))
            .find_map(|external_id| shard.live_item(external_id, now))
    }

    /// Resolve the item a raw release title most likely refers to.
    pub fn find_best_match(&self, media_type: MediaType, raw_title: &str) -> Option<Arc<MediaItem>> {
        let shard = self.shard(media_type).read();
        let found = if media_type.is_authored() {
            shard.best_author_match(&comparison_key(raw_title))
        } else {
            shard.best_variation_match(&title_key(raw_title))
        };

        if found.is_none() {
            trace!(media_type = %media_type, raw_title = %raw_title, "No cached item matches title");
        }
        found
    }

    /// Drop expired items; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        for media_type in MediaType::ALL {
            let mut shard = self.shard(media_type).write();
            let expired: Vec<String> = shard
                .items
                .iter()
                .filter(|(_, stored)| !stored.is_live(now))
                .map(|(id, _)| id.clone())
                .collect();
            for external_id in expired {
                if shard.remove(&external_id) {
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            debug!(removed, "Purged expired media items");
        }
        removed
    }

    /// Number of items stored for a media type, expired ones included.
    pub fn len(&self, media_type: MediaType) -> usize {
        self.shard(media_type).read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        MediaType::ALL.iter().all(|&media_type| self.len(media_type) == 0)
    }
}

impl Shard {
    fn live_item(&self, external_id: &str, now: Instant) -> Option<Arc<MediaItem>> {
        self.items
            .get(external_id)
            .filter(|stored| stored.is_live(now))
            .map(|stored| Arc::clone(&stored.item))
    }

    fn insert(&mut self, item: Arc<MediaItem>, expires_at: Option<Instant>) {
        let external_id = item.external_id.clone();
        let mut keys = Vec::new();
        let mut prefixes = Vec::new();

        let canonical = title_key(&item.title);
        if !canonical.is_empty() {
            keys.push(format!("title:{}", canonical));
        }

        if item.media_type.is_authored() {
            self.index_authors(&item);
        } else {
            for variation in &item.match_variations {
                let variation = title_key(variation);
                if variation.is_empty() {
                    continue;
                }
                keys.push(format!("var:{}", variation));

                let prefix = char_prefix(&variation, PREFIX_LEN).to_string();
                let bucket = self.variation_index.entry(prefix.clone()).or_default();
                if !bucket
                    .iter()
                    .any(|e| e.variation == variation && e.external_id == external_id)
                {
                    bucket.push(VariationEntry {
                        variation,
                        external_id: external_id.clone(),
                    });
                }
                if !prefixes.contains(&prefix) {
                    prefixes.push(prefix);
                }
            }
        }

        for key in &keys {
            self.keys.insert(key.clone(), external_id.clone());
        }

        self.items.insert(
            external_id,
            StoredItem {
                item,
                expires_at,
                keys,
                prefixes,
            },
        );
    }

    fn index_authors(&mut self, item: &MediaItem) {
        let mut seen = HashSet::new();
        let titles: Vec<String> = item
            .match_variations
            .iter()
            .map(|v| comparison_key(v))
            .filter(|k| !k.is_empty() && seen.insert(k.clone()))
            .collect();
        if titles.is_empty() {
            return;
        }

        let mut authors = HashSet::new();
        for author in &item.author_match_variations {
            let author = comparison_key(author);
            if author.is_empty() || !authors.insert(author.clone()) {
                continue;
            }
            self.author_index.push(AuthorEntry {
                author,
                titles: titles.clone(),
                external_id: item.external_id.clone(),
            });
        }
    }

    /// Remove an item and everything indexed for it. Returns whether an item
    /// was present.
    fn remove(&mut self, external_id: &str) -> bool {
        let Some(stored) = self.items.remove(external_id) else {
            return false;
        };

        for key in &stored.keys {
            if self.keys.get(key).is_some_and(|id| id == external_id) {
                self.keys.remove(key);
            }
        }

        for prefix in &stored.prefixes {
            if let Some(bucket) = self.variation_index.get_mut(prefix) {
                bucket.retain(|e| e.external_id != external_id);
                if bucket.is_empty() {
                    self.variation_index.remove(prefix);
                }
            }
        }

        self.author_index.retain(|e| e.external_id != external_id);
        true
    }

    /// Longest match variation that prefixes the title wins; ties go to the
    /// entry seen first.
    fn best_variation_match(&self, normalized: &str) -> Option<Arc<MediaItem>> {
        if normalized.is_empty() {
            return None;
        }

        let now = Instant::now();
        let mut best: Option<(usize, &str)> = None;

        for len in 1..=PREFIX_LEN {
            let prefix = char_prefix(normalized, len);
            if prefix.chars().count() < len {
                break;
            }
            let Some(bucket) = self.variation_index.get(prefix) else {
                continue;
            };

            for entry in bucket {
                if !normalized.starts_with(&entry.variation) {
                    continue;
                }
                let match_len = entry.variation.chars().count();
                if best.is_some_and(|(best_len, _)| match_len <= best_len) {
                    continue;
                }
                if self
                    .items
                    .get(&entry.external_id)
                    .is_some_and(|stored| stored.is_live(now))
                {
                    best = Some((match_len, entry.external_id.as_str()));
                }
            }
        }

        best.and_then(|(_, external_id)| self.live_item(external_id, now))
    }

    fn best_author_match(&self, normalized: &str) -> Option<Arc<MediaItem>> {
        if normalized.is_empty() {
            return None;
        }

        let now = Instant::now();
        let mut candidates: Vec<&AuthorEntry> = self
            .author_index
            .iter()
            .filter(|e| normalized.contains(&e.author))
            .collect();
        candidates.sort_by(|a, b| {
            b.author
                .chars()
                .count()
                .cmp(&a.author.chars().count())
                .then_with(|| b.representative_len().cmp(&a.representative_len()))
        });

        candidates
            .into_iter()
            .filter(|e| e.titles.iter().any(|t| normalized.contains(t.as_str())))
            .find_map(|e| self.live_item(&e.external_id, now))
    }
}

/// Key a title is stored and looked up under.
fn title_key(text: &str) -> String {
    lookup_key(&separators_to_space(text))
}

/// The first `count` characters of `text`, or all of it if shorter.
fn char_prefix(text: &str, count: usize) -> &str {
    match text.char_indices().nth(count) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tv(external_id: &str, title: &str, aliases: &[&str]) -> MediaItem {
        let aliases: Vec<String> = aliases.iter().map(|a| a.to_string()).collect();
        MediaItem::new(1, external_id, title, title, None, None, MediaType::Tv, &aliases)
    }

    fn audio(external_id: &str, author: &str, title: &str) -> MediaItem {
        let expected = format!("{} - {}", author, title);
        MediaItem::new(
            2,
            external_id,
            expected.clone(),
            expected,
            None,
            Some(author.to_string()),
            MediaType::Audio,
            &[],
        )
    }

    #[test]
    fn test_get_by_external_id() {
        let cache = TitleCache::default();
        cache.put(tv("81189", "Breaking Bad", &[]));

        assert_eq!(
            cache
                .get_by_external_id(MediaType::Tv, "81189")
                .map(|i| i.title.clone()),
            Some("Breaking Bad".to_string())
        );
        assert!(cache.get_by_external_id(MediaType::Movie, "81189").is_none());
        assert!(cache.get_by_external_id(MediaType::Tv, "1").is_none());
    }

    #[test]
    fn test_get_by_title_normalizes() {
        let cache = TitleCache::default();
        cache.put(tv("1", "Die Ärzte", &[]));

        assert!(cache.get_by_title(MediaType::Tv, "die.ärzte").is_some());
        assert!(cache.get_by_title(MediaType::Tv, "Die Aerzte").is_some());
        assert!(cache.get_by_title(MediaType::Tv, "Die Ärzte Live").is_none());
        assert!(cache.get_by_title(MediaType::Tv, "").is_none());
    }

    #[test]
    fn test_longest_variation_wins() {
        let cache = TitleCache::default();
        cache.put(tv("short", "Frieren", &[]));
        cache.put(tv("long", "Frieren Beyond Journeys End", &[]));

        let found = cache.find_best_match(MediaType::Tv, "Frieren Beyond Journeys End S01E01");
        assert_eq!(found.map(|i| i.external_id.clone()), Some("long".to_string()));

        let found = cache.find_best_match(MediaType::Tv, "Frieren S01E01");
        assert_eq!(found.map(|i| i.external_id.clone()), Some("short".to_string()));
    }

    #[test]
    fn test_short_variations_are_found() {
        let cache = TitleCache::default();
        cache.put(tv("up", "Up", &[]));

        let found = cache.find_best_match(MediaType::Tv, "Up 2009 German");
        assert_eq!(found.map(|i| i.external_id.clone()), Some("up".to_string()));
    }

    #[test]
    fn test_find_best_match_miss() {
        let cache = TitleCache::default();
        cache.put(tv("1", "Dark", &[]));
        assert!(cache.find_best_match(MediaType::Tv, "Barbarians S01E01").is_none());
        assert!(cache.find_best_match(MediaType::Movie, "Dark S01E01").is_none());
        assert!(cache.find_best_match(MediaType::Tv, "").is_none());
    }

    #[test]
    fn test_put_replaces_previous_entries() {
        let cache = TitleCache::default();
        cache.put(tv("1", "Old Name", &[]));
        cache.put(tv("1", "New Name", &[]));

        assert_eq!(cache.len(MediaType::Tv), 1);
        assert!(cache.find_best_match(MediaType::Tv, "Old Name S01E01").is_none());
        assert!(cache.get_by_title(MediaType::Tv, "Old Name").is_none());
        assert!(cache.find_best_match(MediaType::Tv, "New Name S01E01").is_some());
    }

    #[test]
    fn test_replacement_keeps_shared_keys_of_other_items() {
        let cache = TitleCache::default();
        cache.put(tv("a", "Shared", &[]));
        cache.put(tv("b", "Shared", &[]));
        cache.put(tv("a", "Something Else", &[]));

        let found = cache.get_by_title(MediaType::Tv, "Shared");
        assert_eq!(found.map(|i| i.external_id.clone()), Some("b".to_string()));
    }

    #[test]
    fn test_alias_match() {
        let cache = TitleCache::default();
        cache.put(tv("1", "The Walking Dead", &["Walking Dead Deutsch"]));

        let found = cache.find_best_match(MediaType::Tv, "Walking Dead Deutsch S02E01");
        assert!(found.is_some());
    }

    #[test]
    fn test_author_match() {
        let cache = TitleCache::default();
        cache.put(audio("bestof", "Die Ärzte", "Best Of"));
        cache.put(audio("other", "Die Toten Hosen", "Best Of"));

        let found = cache.find_best_match(MediaType::Audio, "Die_Aerzte-BestOf-2020-WEB");
        assert_eq!(found.map(|i| i.external_id.clone()), Some("bestof".to_string()));

        assert!(cache.find_best_match(MediaType::Audio, "Die Ärzte - Jazz ist anders").is_none());
        assert!(cache.find_best_match(MediaType::Book, "Die Ärzte - Best Of").is_none());
    }

    #[test]
    fn test_author_match_prefers_longer_title() {
        let cache = TitleCache::default();
        cache.put(audio("short", "Die Ärzte", "Best"));
        cache.put(audio("long", "Die Ärzte", "Best Of Live"));

        let found = cache.find_best_match(MediaType::Audio, "Die Aerzte - Best Of Live 2020");
        assert_eq!(found.map(|i| i.external_id.clone()), Some("long".to_string()));
    }

    #[test]
    fn test_expired_items_are_invisible() {
        let cache = TitleCache::new(Some(Duration::ZERO));
        cache.put(tv("1", "Dark", &[]));

        assert!(cache.get_by_external_id(MediaType::Tv, "1").is_none());
        assert!(cache.get_by_title(MediaType::Tv, "Dark").is_none());
        assert!(cache.find_best_match(MediaType::Tv, "Dark S01E01").is_none());

        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_char_prefix() {
        assert_eq!(char_prefix("die ärzte", 5), "die ä");
        assert_eq!(char_prefix("up", 5), "up");
        assert_eq!(char_prefix("", 5), "");
    }
}
