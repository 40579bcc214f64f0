//! Torznab category definitions and media type classification
//!
//! Standard Torznab categories follow the Newznab numbering scheme.
//! Main categories are in thousands (2000, 5000, etc.) and subcategories
//! add tens (2010, 2020, etc.). Indexers report either the numeric id or a
//! display name ("TV/HD", "Audiobook") in an item's `<category>` element.

use crate::media::MediaType;

/// A Torznab category definition
#[derive(Debug, Clone)]
pub struct TorznabCategory {
    pub id: i32,
    pub name: &'static str,
    pub parent_id: Option<i32>,
}

impl TorznabCategory {
    pub const fn new(id: i32, name: &'static str, parent_id: Option<i32>) -> Self {
        Self {
            id,
            name,
            parent_id,
        }
    }

    /// Check if this is a parent category
    pub fn is_parent(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Standard Torznab categories for the media types this engine rewrites
pub static TORZNAB_CATEGORIES: &[TorznabCategory] = &[
    // Movies (2000)
    TorznabCategory::new(2000, "Movies", None),
    TorznabCategory::new(2010, "Movies/Foreign", Some(2000)),
    TorznabCategory::new(2020, "Movies/Other", Some(2000)),
    TorznabCategory::new(2030, "Movies/SD", Some(2000)),
    TorznabCategory::new(2040, "Movies/HD", Some(2000)),
    TorznabCategory::new(2045, "Movies/UHD", Some(2000)),
    TorznabCategory::new(2050, "Movies/BluRay", Some(2000)),
    TorznabCategory::new(2060, "Movies/3D", Some(2000)),
    TorznabCategory::new(2070, "Movies/DVD", Some(2000)),
    TorznabCategory::new(2080, "Movies/WEB-DL", Some(2000)),
    // Audio (3000)
    TorznabCategory::new(3000, "Audio", None),
    TorznabCategory::new(3010, "Audio/MP3", Some(3000)),
    TorznabCategory::new(3020, "Audio/Video", Some(3000)),
    TorznabCategory::new(3030, "Audio/Audiobook", Some(3000)),
    TorznabCategory::new(3040, "Audio/Lossless", Some(3000)),
    TorznabCategory::new(3050, "Audio/Other", Some(3000)),
    TorznabCategory::new(3060, "Audio/Foreign", Some(3000)),
    // TV (5000)
    TorznabCategory::new(5000, "TV", None),
    TorznabCategory::new(5010, "TV/WEB-DL", Some(5000)),
    TorznabCategory::new(5020, "TV/Foreign", Some(5000)),
    TorznabCategory::new(5030, "TV/SD", Some(5000)),
    TorznabCategory::new(5040, "TV/HD", Some(5000)),
    TorznabCategory::new(5045, "TV/UHD", Some(5000)),
    TorznabCategory::new(5050, "TV/Other", Some(5000)),
    TorznabCategory::new(5060, "TV/Sport", Some(5000)),
    TorznabCategory::new(5070, "TV/Anime", Some(5000)),
    TorznabCategory::new(5080, "TV/Documentary", Some(5000)),
    // Books (7000)
    TorznabCategory::new(7000, "Books", None),
    TorznabCategory::new(7010, "Books/Mags", Some(7000)),
    TorznabCategory::new(7020, "Books/EBook", Some(7000)),
    TorznabCategory::new(7030, "Books/Comics", Some(7000)),
    TorznabCategory::new(7040, "Books/Technical", Some(7000)),
    TorznabCategory::new(7050, "Books/Other", Some(7000)),
    TorznabCategory::new(7060, "Books/Foreign", Some(7000)),
];

/// Common category constants for easy reference
pub mod cats {
    pub const MOVIES: i32 = 2000;
    pub const AUDIO: i32 = 3000;
    pub const AUDIO_AUDIOBOOK: i32 = 3030;
    pub const TV: i32 = 5000;
    pub const BOOKS: i32 = 7000;
}

/// Name prefixes checked in order; audiobooks are books even under "Audio".
const NAME_PREFIXES: &[(&str, MediaType)] = &[
    ("EBook", MediaType::Book),
    ("Book", MediaType::Book),
    ("Movies", MediaType::Movie),
    ("TV", MediaType::Tv),
    ("Audiobook", MediaType::Book),
    ("Audio/Audiobook", MediaType::Book),
    ("Audio", MediaType::Audio),
];

/// Get a category by ID
pub fn get_category(id: i32) -> Option<&'static TorznabCategory> {
    TORZNAB_CATEGORIES.iter().find(|c| c.id == id)
}

/// Get the parent category for a given category
pub fn get_parent_category(id: i32) -> Option<&'static TorznabCategory> {
    let cat = get_category(id)?;
    cat.parent_id.and_then(get_category)
}

/// Map a numeric Torznab category to the media type it carries.
pub fn media_type_for_id(id: i32) -> Option<MediaType> {
    if id == cats::AUDIO_AUDIOBOOK {
        return Some(MediaType::Book);
    }

    let cat = get_category(id)?;
    let root = if cat.is_parent() {
        cat.id
    } else {
        get_parent_category(id)?.id
    };

    match root {
        cats::MOVIES => Some(MediaType::Movie),
        cats::TV => Some(MediaType::Tv),
        cats::AUDIO => Some(MediaType::Audio),
        cats::BOOKS => Some(MediaType::Book),
        _ => None,
    }
}

/// Classify the text of an item's `<category>` element.
///
/// Returns `None` for categories this engine does not rewrite; those items
/// are passed through untouched.
pub fn classify_category(category: &str) -> Option<MediaType> {
    let category = category.trim();
    if category.is_empty() {
        return None;
    }

    if let Ok(id) = category.parse::<i32>() {
        return media_type_for_id(id);
    }

    NAME_PREFIXES
        .iter()
        .find(|(prefix, _)| starts_with_ignore_ascii_case(category, prefix))
        .map(|(_, media_type)| *media_type)
}

fn starts_with_ignore_ascii_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.is_char_boundary(prefix.len())
        && text[..prefix.len()].eq_ignore_ascii_case(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_numeric_categories() {
        assert_eq!(classify_category("5000"), Some(MediaType::Tv));
        assert_eq!(classify_category("5040"), Some(MediaType::Tv)); // TV/HD
        assert_eq!(classify_category("2000"), Some(MediaType::Movie));
        assert_eq!(classify_category("7020"), Some(MediaType::Book)); // Books/EBook
        assert_eq!(classify_category("3030"), Some(MediaType::Book)); // Audiobook
        assert_eq!(classify_category("3010"), Some(MediaType::Audio));
        assert_eq!(classify_category("4000"), None); // PC
        assert_eq!(classify_category("100001"), None);
    }

    #[test]
    fn test_classify_named_categories() {
        assert_eq!(classify_category("TV/HD"), Some(MediaType::Tv));
        assert_eq!(classify_category("tv"), Some(MediaType::Tv));
        assert_eq!(classify_category("Movies/UHD"), Some(MediaType::Movie));
        assert_eq!(classify_category("EBook"), Some(MediaType::Book));
        assert_eq!(classify_category("Books/Comics"), Some(MediaType::Book));
        assert_eq!(classify_category("Audiobook"), Some(MediaType::Book));
        assert_eq!(classify_category("Audio/Audiobook"), Some(MediaType::Book));
        assert_eq!(classify_category("Audio/MP3"), Some(MediaType::Audio));
        assert_eq!(classify_category("PC/Games"), None);
        assert_eq!(classify_category(""), None);
    }

    #[test]
    fn test_parent_lookup() {
        assert_eq!(get_parent_category(5070).map(|c| c.id), Some(5000));
        assert!(get_parent_category(5000).is_none());
    }
}
