//! Shared text normalization and comparison utilities
//!
//! Every title that enters the variation generator, the title cache or the
//! rewriter passes through these functions. They are pure, total and
//! idempotent, so the same input always lands on the same key.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Combining diaeresis (U+0308), the mark that turns a/o/u into ä/ö/ü.
const COMBINING_DIAERESIS: char = '\u{0308}';

/// Characters indexers use to separate words in release names.
pub const WORD_SEPARATORS: [char; 3] = ['.', '_', ' '];

const UMLAUTS: [char; 7] = ['ä', 'ö', 'ü', 'Ä', 'Ö', 'Ü', 'ß'];

/// Check whether a string contains a German umlaut or sharp s.
pub fn has_umlauts(text: &str) -> bool {
    text.chars().any(|c| UMLAUTS.contains(&c))
}

/// Remove accents from all letters except the German umlauts.
///
/// `ß` becomes `ss` before decomposition; every combining mark other than the
/// diaeresis is dropped and the result is recomposed (NFC).
///
/// # Example
/// ```ignore
/// assert_eq!(strip_accents_keep_umlauts("Pokémon Größe"), "Pokemon Grösse");
/// ```
pub fn strip_accents_keep_umlauts(text: &str) -> String {
    text.replace('ß', "ss")
        .nfd()
        .filter(|&c| !is_combining_mark(c) || c == COMBINING_DIAERESIS)
        .nfc()
        .collect()
}

/// Remove every accent, umlauts included.
pub fn strip_accents(text: &str) -> String {
    text.replace('ß', "ss")
        .nfd()
        .filter(|&c| !is_combining_mark(c))
        .nfc()
        .collect()
}

/// Transliterate umlauts into their Latin digraphs (Ä -> Ae, ß -> ss).
pub fn umlauts_to_latin(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            'Ä' => result.push_str("Ae"),
            'Ö' => result.push_str("Oe"),
            'Ü' => result.push_str("Ue"),
            'ä' => result.push_str("ae"),
            'ö' => result.push_str("oe"),
            'ü' => result.push_str("ue"),
            'ß' => result.push_str("ss"),
            other => result.push(other),
        }
    }
    result
}

/// Drop the dots from umlauts (ä -> a, Ö -> O) and expand ß to ss.
pub fn strip_umlaut_dots(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + 4);
    for c in text.chars() {
        match c {
            'ä' => result.push('a'),
            'ö' => result.push('o'),
            'ü' => result.push('u'),
            'Ä' => result.push('A'),
            'Ö' => result.push('O'),
            'Ü' => result.push('U'),
            'ß' => result.push_str("ss"),
            other => result.push(other),
        }
    }
    result
}

/// Keep only letters, digits, spaces and hyphens.
///
/// Any Unicode letter counts (`ø`, `Б`, `東`). The umlauts and ß are dropped
/// unless `keep_umlauts` is set. Accented letters should be stripped before
/// calling this.
pub fn strip_special_chars(text: &str, keep_umlauts: bool) -> String {
    text.chars()
        .filter(|&c| {
            (c.is_alphanumeric() && (keep_umlauts || !UMLAUTS.contains(&c))) || c == ' ' || c == '-'
        })
        .collect()
}

/// Collapse any run of whitespace into a single space and trim both ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replace the release-name separators (`.`, `_`) with spaces.
pub fn separators_to_space(text: &str) -> String {
    text.replace(['.', '_'], " ")
}

/// Comparison-grade normalization.
///
/// Only used for equality and substring tests, never for display:
/// `"Die Ärzte - Best Of"` becomes `"diearzte-bestof"`.
pub fn comparison_key(text: &str) -> String {
    let without_dots = strip_umlaut_dots(text);
    let without_accents = strip_accents(&without_dots);
    strip_special_chars(&without_accents, false)
        .chars()
        .filter(|&c| c != ' ')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Key used by the title cache for exact and prefix lookups.
///
/// Accents are removed (umlauts kept), case is folded and whitespace
/// collapsed, so `"Die  Ärzte"` and `"die ärzte"` share a key.
pub fn lookup_key(text: &str) -> String {
    collapse_whitespace(&strip_accents_keep_umlauts(text).to_lowercase())
}

/// Clean a display title into the canonical form variations start from.
///
/// `.` and `:` become spaces, accents (but not umlauts) are removed, anything
/// that is not a letter, digit, space or hyphen is dropped and whitespace is
/// collapsed.
pub fn clean_title(title: &str) -> String {
    let spaced = title.replace(['.', ':'], " ");
    let without_accents = strip_accents_keep_umlauts(&spaced);
    let without_specials = strip_special_chars(&without_accents, true);
    collapse_whitespace(&without_specials)
}

/// A normalized string that remembers where each of its characters came
/// from in the string it was derived from.
///
/// The source is normalized one cluster at a time (a base character plus its
/// combining marks), so expansions such as `ß` -> `ss` and dropped characters
/// keep an exact link back to the source bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedText {
    text: String,
    /// `(offset in text, end offset in source)` per produced character
    origins: Vec<(usize, usize)>,
}

impl MappedText {
    pub fn new(source: &str, normalize: impl Fn(&str) -> String) -> Self {
        let mut mapped = Self::default();

        let mut cluster_start = 0;
        for (offset, c) in source.char_indices() {
            if offset > cluster_start && !is_combining_mark(c) {
                mapped.push_cluster(&normalize(&source[cluster_start..offset]), offset);
                cluster_start = offset;
            }
        }
        if cluster_start < source.len() {
            mapped.push_cluster(&normalize(&source[cluster_start..]), source.len());
        }

        mapped
    }

    fn push_cluster(&mut self, normalized: &str, source_end: usize) {
        for (offset, _) in normalized.char_indices() {
            self.origins.push((self.text.len() + offset, source_end));
        }
        self.text.push_str(normalized);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Byte offset in the source just past the character that produced the
    /// last character of `text[..index]`; 0 for an empty head.
    pub fn source_end(&self, index: usize) -> usize {
        let produced = self.origins.partition_point(|&(offset, _)| offset < index);
        match produced {
            0 => 0,
            n => self.origins[n - 1].1,
        }
    }
}
