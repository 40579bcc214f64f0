//! Release title rewriting
//!
//! Indexers publish releases under their source-language titles
//! (`Die.Aerzte.S01E01`) while managers expect the title from their own
//! catalog (`Die Ärzte`). The rewriter recognizes the known media item inside
//! each `<item>` title of a feed and replaces the recognized part with the
//! expected title, keeping the release's separators and its trailing quality
//! and group tags.
//!
//! Two heuristics are used:
//! - tv and movie titles must *start* with a match variation
//! - book and audio titles must contain both an author and a title
//!   variation anywhere, compared on comparison keys

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, trace, warn};

use crate::indexer::categories::classify_category;
use crate::indexer::torznab::{FeedDocument, FeedError};
use crate::media::{MediaItem, MediaType};
use crate::services::renamed_titles::RenamedTitles;
use crate::services::text_utils::{
    comparison_key, separators_to_space, strip_accents_keep_umlauts, MappedText, WORD_SEPARATORS,
};
use crate::services::title_cache::TitleCache;

/// Delimiters skipped after an author/title match
const MATCH_DELIMITERS: [char; 4] = [' ', '-', '_', '.'];

/// Suffixes shorter than this are dropped from authored titles
const MIN_AUTHORED_SUFFIX_LEN: usize = 3;

/// Rewrites item titles of indexer feeds
#[derive(Debug, Clone)]
pub struct TitleRewriter {
    cache: Arc<TitleCache>,
    renamed: Option<Arc<RenamedTitles>>,
}

impl TitleRewriter {
    pub fn new(cache: Arc<TitleCache>) -> Self {
        Self {
            cache,
            renamed: None,
        }
    }

    /// Record every rename in `renamed` for reverse lookups.
    pub fn with_renamed_titles(mut self, renamed: Arc<RenamedTitles>) -> Self {
        self.renamed = Some(renamed);
        self
    }

    /// Rewrite every item title of a feed body.
    ///
    /// With `item` set, every item is matched against that media item;
    /// otherwise each item is resolved through the cache. A body that cannot
    /// be parsed is returned unchanged.
    pub fn rewrite_titles(&self, body: &str, item: Option<&MediaItem>) -> String {
        match self.try_rewrite_titles(body, item) {
            Ok(rewritten) => rewritten,
            Err(e) => {
                warn!(error = %e, "Failed to process feed, passing it through unchanged");
                body.to_string()
            }
        }
    }

    /// Like [`rewrite_titles`](Self::rewrite_titles), but surfaces feed errors.
    ///
    /// A feed in which no title changed is returned byte for byte.
    pub fn try_rewrite_titles(&self, body: &str, item: Option<&MediaItem>) -> Result<String, FeedError> {
        let mut document = FeedDocument::parse(body)?;
        if self.rewrite_document(&mut document, item) == 0 {
            return Ok(body.to_string());
        }
        document.to_xml()
    }

    /// Rewrite titles inside a parsed document; returns how many changed.
    pub fn rewrite_document(&self, document: &mut FeedDocument, item: Option<&MediaItem>) -> usize {
        let mut changed = 0;

        for feed_item in document.items_mut() {
            let Some(original) = feed_item.title() else {
                continue;
            };
            let category = feed_item.category();

            if let Some(renamed) = self.rewrite_title(&original, category.as_deref(), item) {
                if feed_item.set_title(&renamed) {
                    if let Some(renamed_titles) = &self.renamed {
                        renamed_titles.record(&renamed, &original);
                    }
                    changed += 1;
                }
            }
        }

        changed
    }

    /// Compute the rewritten form of a single release title.
    ///
    /// Returns `None` when the category is not rewritten, no media item
    /// matches, or the title needs no change.
    pub fn rewrite_title(
        &self,
        original: &str,
        category: Option<&str>,
        item: Option<&MediaItem>,
    ) -> Option<String> {
        let Some(media_type) = category.and_then(classify_category) else {
            trace!(title = %original, category = ?category, "Skipping item with unmapped category");
            return None;
        };

        let normalized = normalize_release_title(original);

        let cached;
        let media_item = match item {
            Some(item) => item,
            None => {
                cached = self.cache.find_best_match(media_type, normalized.as_str());
                match cached.as_deref() {
                    Some(item) => item,
                    None => {
                        debug!(title = %original, media_type = %media_type, "No media item matches title");
                        return None;
                    }
                }
            }
        };

        let renamed = match media_type {
            MediaType::Tv | MediaType::Movie => rewrite_tv_movie_title(media_item, original, &normalized),
            MediaType::Book | MediaType::Audio => rewrite_authored_title(media_item, original),
        }?;

        if renamed == original {
            return None;
        }

        info!(original = %original, renamed = %renamed, "Title changed");
        Some(renamed)
    }
}

/// Replace the leading match variation of a tv/movie release with the
/// expected title.
///
/// `normalized` is the release title with accents (but not umlauts) removed
/// and separators replaced by spaces, see [`normalize_release_title`].
pub fn rewrite_tv_movie_title(item: &MediaItem, original: &str, normalized: &MappedText) -> Option<String> {
    let expected = item.expected_title.as_str();
    if expected.is_empty() {
        return None;
    }

    let mut variations: Vec<&String> = item.match_variations.iter().collect();
    variations.sort_by_key(|v| std::cmp::Reverse(v.chars().count()));

    let separator = first_separator(original);

    for variation in variations {
        if variation.is_empty() || variation == expected {
            continue;
        }

        let Some(found_end) = match_prefix(normalized.as_str(), variation) else {
            continue;
        };

        let match_end = map_normalized_index_to_original(normalized, found_end);
        let suffix = original.get(match_end..).unwrap_or_default();

        // An alias that is a prefix of the expected title only counts when
        // an episode marker follows directly.
        if starts_with_ignore_case(expected, variation) && !is_episode_marker(suffix, separator) {
            warn!(
                original = %original,
                expected = %expected,
                variation = %variation,
                "Not renaming, expected title starts with the matched variation"
            );
            continue;
        }

        let prefix = expected.replace(' ', &separator.to_string());
        let suffix = suffix.trim_start_matches(WORD_SEPARATORS);
        let renamed = if suffix.is_empty() {
            prefix
        } else {
            format!("{}{}{}", prefix, separator, suffix)
        };
        return Some(renamed);
    }

    debug!(title = %original, expected = %expected, "No match variation prefixes title");
    None
}

/// Rebuild a book/audio release as `"{author} - {title}"`, keeping what
/// follows the matched author and title as a bracketed suffix.
pub fn rewrite_authored_title(item: &MediaItem, original: &str) -> Option<String> {
    let author = item.expected_author.as_deref().filter(|a| !a.is_empty())?;
    let normalized = MappedText::new(original, comparison_key);

    let author_match = find_best_match(&item.author_match_variations, &normalized);
    let title_match = find_best_match(&item.match_variations, &normalized);

    let (Some(author_end), Some(title_end)) = (author_match, title_match) else {
        debug!(title = %original, "No match for both author and title");
        return None;
    };

    let mut rest = original.get(author_end.max(title_end)..).unwrap_or_default();
    if let Some(stripped) = rest.strip_prefix(MATCH_DELIMITERS) {
        rest = stripped;
    }

    let suffix = rest.trim_start_matches(MATCH_DELIMITERS).trim();

    let mut renamed = format!("{} - {}", author, item.expected_title);
    if suffix.chars().count() >= MIN_AUTHORED_SUFFIX_LEN {
        renamed.push_str(&format!("-[{}]", suffix));
    }
    Some(renamed)
}

/// Locate the longest variation inside a comparison-normalized title.
///
/// Returns the byte offset in the original title where the match ends; ties
/// on length go to the earliest match.
fn find_best_match(variations: &[String], normalized: &MappedText) -> Option<usize> {
    let mut best: Option<(usize, usize, usize)> = None;

    for variation in variations {
        let key = comparison_key(variation);
        if key.is_empty() {
            continue;
        }
        let Some(start) = normalized.as_str().find(&key) else {
            continue;
        };

        let len = key.len();
        let better = match best {
            None => true,
            Some((best_len, best_start, _)) => len > best_len || (len == best_len && start < best_start),
        };
        if better {
            best = Some((len, start, start + len));
        }
    }

    best.map(|(_, _, end)| map_normalized_index_to_original(normalized, end))
}

/// Release title as the tv/movie heuristic and the cache compare it: accents
/// removed (umlauts kept), `.` and `_` turned into spaces.
pub fn normalize_release_title(original: &str) -> MappedText {
    MappedText::new(original, |cluster| {
        separators_to_space(&strip_accents_keep_umlauts(cluster))
    })
}

/// Translate a byte offset in a normalized title to the byte offset in the
/// original title where the normalized head ends.
///
/// Characters the normalization expanded (`ß` -> `ss`) map to the end of
/// their source character; dropped characters are skipped.
pub fn map_normalized_index_to_original(normalized: &MappedText, index: usize) -> usize {
    normalized.source_end(index)
}

fn first_separator(title: &str) -> char {
    title
        .chars()
        .find(|c| WORD_SEPARATORS.contains(c))
        .unwrap_or(' ')
}

/// Byte length of the head of `normalized` that spells `variation`, ignoring
/// case and treating every word separator as the same character.
fn match_prefix(normalized: &str, variation: &str) -> Option<usize> {
    let mut chars = normalized.char_indices();
    let mut end = 0;
    for expected in variation.chars() {
        let (offset, c) = chars.next()?;
        if !same_char(c, expected) {
            return None;
        }
        end = offset + c.len_utf8();
    }
    Some(end)
}

fn same_char(a: char, b: char) -> bool {
    a == b
        || (WORD_SEPARATORS.contains(&a) && WORD_SEPARATORS.contains(&b))
        || a.to_lowercase().eq(b.to_lowercase())
}

fn is_episode_marker(suffix: &str, separator: char) -> bool {
    static EPISODE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^S\d{1,2}E\d{1,2}").expect("valid episode regex"));
    suffix
        .strip_prefix(separator)
        .is_some_and(|rest| EPISODE.is_match(rest))
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.to_lowercase().starts_with(&prefix.to_lowercase())
}
