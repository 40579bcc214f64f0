//! Media items known to the title engine
//!
//! A [`MediaItem`] is built once from a catalog record and never mutated;
//! its variation sets are generated at construction time.

pub mod variations;

use serde::{Deserialize, Serialize};

use variations::{generate_variations, VariationSet};

/// Classification of content; decides which index and rewrite heuristic apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Tv,
    Movie,
    Book,
    Audio,
}

impl MediaType {
    pub const ALL: [MediaType; 4] = [MediaType::Tv, MediaType::Movie, MediaType::Book, MediaType::Audio];

    /// Books and audio are matched by author + title instead of a title prefix.
    pub fn is_authored(self) -> bool {
        matches!(self, MediaType::Book | MediaType::Audio)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Tv => "tv",
            MediaType::Movie => "movie",
            MediaType::Book => "book",
            MediaType::Audio => "audio",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MediaType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tv" | "series" | "show" => Ok(MediaType::Tv),
            "movie" | "movies" | "film" => Ok(MediaType::Movie),
            "book" | "books" | "ebook" => Ok(MediaType::Book),
            "audio" | "music" => Ok(MediaType::Audio),
            _ => Err(anyhow::anyhow!("Unknown media type: {}", s)),
        }
    }
}

/// Catalog entry as delivered by a manager sync (typed input record).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItemRecord {
    /// The manager's own identifier
    pub arr_id: i64,
    /// TVDB id, or a normalized title for media types without a native id
    pub external_id: String,
    pub title: String,
    pub expected_title: String,
    #[serde(default)]
    pub local_title: Option<String>,
    #[serde(default)]
    pub expected_author: Option<String>,
    pub media_type: MediaType,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// One piece of media and every spelling it may appear under.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaItem {
    pub arr_id: i64,
    pub external_id: String,
    pub title: String,
    pub expected_title: String,
    pub local_title: Option<String>,
    pub expected_author: Option<String>,
    pub media_type: MediaType,
    /// Strings used to query indexers, in generation order
    pub search_variations: Vec<String>,
    /// Strings used to recognize this item inside a release title
    pub match_variations: Vec<String>,
    /// Author spellings (books and audio only)
    pub author_match_variations: Vec<String>,
}

impl MediaItem {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        arr_id: i64,
        external_id: impl Into<String>,
        title: impl Into<String>,
        expected_title: impl Into<String>,
        local_title: Option<String>,
        expected_author: Option<String>,
        media_type: MediaType,
        aliases: &[String],
    ) -> Self {
        let title = title.into();
        let expected_title = expected_title.into();
        let VariationSet {
            search,
            matching,
            author,
            local_title,
        } = generate_variations(
            &title,
            &expected_title,
            local_title.as_deref(),
            expected_author.as_deref(),
            media_type,
            aliases,
        );

        Self {
            arr_id,
            external_id: external_id.into(),
            title,
            expected_title,
            local_title,
            expected_author,
            media_type,
            search_variations: search,
            match_variations: matching,
            author_match_variations: author,
        }
    }

    pub fn from_record(record: MediaItemRecord) -> Self {
        Self::new(
            record.arr_id,
            record.external_id,
            record.title,
            record.expected_title,
            record.local_title,
            record.expected_author,
            record.media_type,
            &record.aliases,
        )
    }

    /// Whether the item has at least one variation to match against.
    pub fn is_matchable(&self) -> bool {
        if self.media_type.is_authored() {
            !self.match_variations.is_empty() && !self.author_match_variations.is_empty()
        } else {
            !self.match_variations.is_empty()
        }
    }
}
