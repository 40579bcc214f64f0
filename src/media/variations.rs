//! Title variation generation
//!
//! Indexers are queried with *search* variations (every plausible spelling of
//! the local title) and release titles are recognized with *match* variations
//! (every spelling of the title, its local title and its aliases).

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::MediaType;
use crate::services::text_utils::{
    clean_title, collapse_whitespace, strip_accents, strip_umlaut_dots, umlauts_to_latin,
};

/// Leading articles, longest first so "An " is tried before "A ".
const LEADING_ARTICLES: [&str; 6] = ["Der", "Die", "Das", "The", "An", "A"];

static YEAR_AT_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((\d{4})\)$").expect("valid year regex"));

/// All variation sets generated for one media item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariationSet {
    pub search: Vec<String>,
    pub matching: Vec<String>,
    pub author: Vec<String>,
    /// Local title after year propagation
    pub local_title: Option<String>,
}

/// Generate the spelling variations of a single title.
///
/// Returns an empty list when nothing survives cleaning.
pub fn title_variations(title: &str, media_type: MediaType) -> Vec<String> {
    let mut variations = Vec::new();
    collect_title_variations(title, media_type, &mut variations);
    dedup_case_insensitive(variations)
}

fn collect_title_variations(title: &str, media_type: MediaType, out: &mut Vec<String>) {
    let clean = clean_title(title);
    if clean.is_empty() {
        return;
    }

    out.push(clean.clone());
    out.push(umlauts_to_latin(&clean));
    out.push(strip_umlaut_dots(&clean));
    if media_type.is_authored() {
        out.push(strip_accents(&strip_umlaut_dots(&clean)));
    }

    if clean.contains('-') {
        let without_dash = clean.replace('-', "");
        let dash_as_space = clean.replace('-', " ");
        out.push(umlauts_to_latin(&without_dash));
        out.push(strip_umlaut_dots(&without_dash));
        out.push(umlauts_to_latin(&dash_as_space));
        out.push(strip_umlaut_dots(&dash_as_space));
        out.push(without_dash);
        out.push(dash_as_space);
    }

    // "Die Ärzte" is also released as "Ärzte", "The Office" as "Office"
    for article in LEADING_ARTICLES {
        if let Some(rest) = clean.strip_prefix(article).and_then(|r| r.strip_prefix(' ')) {
            collect_title_variations(rest, media_type, out);
            break;
        }
    }
}

/// Normalize whitespace, drop empty entries and remove case-insensitive
/// duplicates while keeping the first spelling seen.
pub fn dedup_case_insensitive<I>(variations: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    variations
        .into_iter()
        .map(|v| collapse_whitespace(&v))
        .filter(|v| !v.is_empty())
        .filter(|v| seen.insert(v.to_lowercase()))
        .collect()
}

/// Generate search, match and author variations for a media item.
pub fn generate_variations(
    title: &str,
    expected_title: &str,
    local_title: Option<&str>,
    expected_author: Option<&str>,
    media_type: MediaType,
    aliases: &[String],
) -> VariationSet {
    match expected_author.map(str::trim).filter(|a| !a.is_empty()) {
        Some(author) if media_type.is_authored() => {
            authored_variations(expected_title, author, media_type, local_title)
        }
        _ => titled_variations(title, expected_title, local_title, media_type, aliases),
    }
}

fn authored_variations(
    expected_title: &str,
    author: &str,
    media_type: MediaType,
    local_title: Option<&str>,
) -> VariationSet {
    // "Die Ärzte - Best Of Die Ärzte" must not match the author twice
    let title_source = if expected_title.contains(author) {
        let stripped = collapse_whitespace(&expected_title.replace(author, ""));
        let stripped = stripped.trim_matches(|c: char| c == '-' || c.is_whitespace());
        if stripped.is_empty() {
            expected_title.to_string()
        } else {
            stripped.to_string()
        }
    } else {
        expected_title.to_string()
    };

    let matching = title_variations(&title_source, media_type);
    let search = title_variations(&format!("{} {}", author, expected_title), media_type);

    let mut author_variations = title_variations(author, media_type);
    if media_type == MediaType::Book {
        let parts: Vec<&str> = author.split_whitespace().collect();
        if let Some((last_name, first_names)) = parts.split_last() {
            if !first_names.is_empty() {
                let permuted = format!("{}, {}", last_name, first_names.join(" "));
                author_variations.extend(title_variations(&permuted, media_type));
            }
        }
    }

    VariationSet {
        search,
        matching,
        author: dedup_case_insensitive(author_variations),
        local_title: local_title.map(str::to_string),
    }
}

fn titled_variations(
    title: &str,
    expected_title: &str,
    local_title: Option<&str>,
    media_type: MediaType,
    aliases: &[String],
) -> VariationSet {
    let mut local_title = local_title.map(str::to_string);
    let mut aliases = aliases.to_vec();

    // A year-qualified title ("Avatar (2024)") must keep matching when the
    // local title or an alias omits the year.
    if let Some(year) = YEAR_AT_END
        .captures(expected_title.trim_end())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
    {
        if let Some(local) = local_title.as_mut() {
            if !local.contains(&year) {
                *local = format!("{} {}", local, year);
            }
        }
        for alias in aliases.iter_mut() {
            if !alias.contains(&year) {
                *alias = format!("{} {}", alias, year);
            }
        }
    }

    let primary = local_title.as_deref().unwrap_or(title);

    let mut search = title_variations(primary, media_type);
    let mut matching = search.clone();
    if local_title.is_some() {
        matching.extend(title_variations(title, media_type));
    }

    for alias in &aliases {
        matching.extend(title_variations(alias, media_type));
        if alias.contains(':') {
            matching.push(clean_title(&alias.replace(':', " -")));
        }
    }

    // "Stranger Things (DE)" is released as "Stranger Things GERMAN"
    if primary.ends_with("(DE)") {
        let german = collapse_whitespace(&primary.replace("(DE)", " GERMAN"));
        let german_variations = title_variations(&german, media_type);
        search.extend(german_variations.iter().cloned());
        matching.extend(german_variations);
        matching.extend(title_variations(primary.replace("(DE)", "").trim(), media_type));
    }

    // Reality formats share a name across countries: "Good Luck Guys Germany"
    if let Some(base) = strip_suffix_ignore_ascii_case(primary, "germany") {
        let german = collapse_whitespace(&format!("{}GERMAN", base));
        let german_variations = title_variations(&german, media_type);
        search.extend(german_variations.iter().cloned());
        matching.extend(german_variations);
        matching.extend(title_variations(base.trim(), media_type));
    }

    if primary.contains(':') {
        matching.push(clean_title(&primary.replace(':', " -")));
    }

    VariationSet {
        search: dedup_case_insensitive(search),
        matching: dedup_case_insensitive(matching),
        author: Vec::new(),
        local_title,
    }
}

fn strip_suffix_ignore_ascii_case<'a>(text: &'a str, suffix: &str) -> Option<&'a str> {
    let split = text.len().checked_sub(suffix.len())?;
    if !text.is_char_boundary(split) {
        return None;
    }
    let (base, tail) = text.split_at(split);
    tail.eq_ignore_ascii_case(suffix).then_some(base)
}
