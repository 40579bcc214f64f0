//! Integration tests for the title pipeline
//!
//! These tests run complete feeds through the public API:
//! - Catalog items are cached with their variations
//! - Feed items are resolved through the cache and rewritten
//! - Several responses are merged into one feed

use std::sync::Arc;


use umlautarr::indexer::torznab::{AggregatedResult, FeedDocument};
use umlautarr::media::{MediaItem, MediaType};
use umlautarr::services::text_utils::comparison_key;
use umlautarr::services::{RenamedTitles, TitleCache, TitleRewriter};

fn feed(items: &[(&str, &str)]) -> String {
    let items: String = items
        .iter()
        .enumerate()
        .map(|(i, (title, category))| {
            format!(
                "<item><title>{}</title><guid>{}</guid><category>{}</category></item>",
                title, i, category
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><rss version=\"2.0\"><channel><title>Indexer</title>{}</channel></rss>",
        items
    )
}

fn titles(body: &str) -> Vec<String> {
    FeedDocument::parse(body)
        .unwrap()
        .items()
        .filter_map(|item| item.title())
        .collect()
}

fn item(external_id: &str, title: &str, media_type: MediaType, author: Option<&str>, aliases: &[&str]) -> MediaItem {
    let aliases: Vec<String> = aliases.iter().map(|a| a.to_string()).collect();
    MediaItem::new(
        1,
        external_id,
        title,
        title,
        None,
        author.map(str::to_string),
        media_type,
        &aliases,
    )
}

fn rewriter(items: Vec<MediaItem>) -> TitleRewriter {
    let cache = Arc::new(TitleCache::default());
    for item in items {
        cache.put(item);
    }
    TitleRewriter::new(cache)
}

// ============================================================================
// End-to-end Rewrite Scenarios
// ============================================================================

mod scenarios {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_umlaut_title_keeps_release_suffix() {
        let rewriter = rewriter(vec![item("1", "Die Ärzte - Best Of", MediaType::Movie, None, &[])]);
        let body = feed(&[("Die.Aerzte.Best.Of.GERMAN.2020-GROUP", "2000")]);

        let rewritten = titles(&rewriter.rewrite_titles(&body, None));
        let title = &rewritten[0];

        assert!(title.replace('.', " ").starts_with("Die Ärzte - Best Of"), "{}", title);
        assert!(title.ends_with(".GERMAN.2020-GROUP"), "{}", title);
        assert_eq!(title, "Die.Ärzte.-.Best.Of.GERMAN.2020-GROUP");
    }

    #[test]
    fn test_unknown_title_is_left_byte_for_byte() {
        let rewriter = rewriter(vec![item("1", "Dark", MediaType::Tv, None, &[])]);
        let body = feed(&[("Barbarians.S01E01.German.1080p.WEB-GRP", "TV")]);

        assert_eq!(rewriter.rewrite_titles(&body, None), body);
    }

    #[test]
    fn test_alias_prefix_guard() {
        let rewriter = rewriter(vec![item(
            "1",
            "Frieren",
            MediaType::Tv,
            None,
            &["Frieren: Beyond Journey's End"],
        )]);
        let body = feed(&[
            ("Frieren.Beyond.Journeys.End.S01E01", "5000"),
            ("Frierenfest.2020", "5000"),
        ]);

        assert_eq!(
            titles(&rewriter.rewrite_titles(&body, None)),
            vec!["Frieren.S01E01".to_string(), "Frierenfest.2020".to_string()]
        );
    }

    #[test]
    fn test_audio_release_is_rebuilt() {
        let rewriter = rewriter(vec![item("1", "Best Of", MediaType::Audio, Some("Die Ärzte"), &[])]);
        let body = feed(&[("Die_Aerzte-BestOf-2020-WEB", "3000")]);

        assert_eq!(
            titles(&rewriter.rewrite_titles(&body, None)),
            vec!["Die Ärzte - Best Of-[2020-WEB]".to_string()]
        );
    }

    #[test]
    fn test_book_release_is_rebuilt() {
        let rewriter = rewriter(vec![item(
            "1",
            "Der Schwarm",
            MediaType::Book,
            Some("Frank Schätzing"),
            &[],
        )]);
        let body = feed(&[("Frank.Schaetzing.-.Der.Schwarm.German.EPUB", "7020")]);

        assert_eq!(
            titles(&rewriter.rewrite_titles(&body, None)),
            vec!["Frank Schätzing - Der Schwarm-[German.EPUB]".to_string()]
        );
    }

    #[test]
    fn test_titles_beyond_ascii_keep_their_suffix() {
        let rewriter = rewriter(vec![
            item("1", "Großstadtrevier", MediaType::Tv, None, &[]),
            item("2", "Melody A.M.", MediaType::Audio, Some("Røyksopp"), &[]),
            item("3", "Брат", MediaType::Movie, None, &[]),
        ]);
        let body = feed(&[
            ("Großstadtrevier.S01E01.German-GRP", "5000"),
            ("Grossstadtrevier..S01E02.German-GRP", "5000"),
            ("Røyksopp - Melody A.M. 2001 FLAC", "3040"),
            ("Брат.1997.German.DL.1080p", "2000"),
        ]);

        assert_eq!(
            titles(&rewriter.rewrite_titles(&body, None)),
            vec![
                "Großstadtrevier.S01E01.German-GRP".to_string(),
                "Großstadtrevier.S01E02.German-GRP".to_string(),
                "Røyksopp - Melody A.M.-[2001 FLAC]".to_string(),
                "Брат.1997.German.DL.1080p".to_string(),
            ]
        );
    }

    #[test]
    fn test_expected_title_round_trips() {
        let rewriter = rewriter(vec![item("1", "Die Ärzte", MediaType::Tv, None, &[])]);
        let body = feed(&[("Die.Ärzte.S01E01.German", "5000")]);

        assert_eq!(rewriter.rewrite_titles(&body, None), body);
    }

    #[test]
    fn test_mixed_feed_rewrites_each_item_independently() {
        let rewriter = rewriter(vec![
            item("1", "Die Ärzte", MediaType::Tv, None, &[]),
            item("2", "Best Of", MediaType::Audio, Some("Die Ärzte"), &[]),
        ]);
        let body = feed(&[
            ("Die.Aerzte.S02E03.German.720p-GRP", "5040"),
            ("Die.Aerzte.S02E03.German.720p-GRP", "4000"),
            ("Die Aerzte - Best Of (2020) FLAC", "3040"),
            ("Unrelated.Show.S01E01", "5000"),
        ]);

        let rewritten = rewriter.rewrite_titles(&body, None);
        assert_eq!(
            titles(&rewritten),
            vec![
                "Die.Ärzte.S02E03.German.720p-GRP".to_string(),
                "Die.Aerzte.S02E03.German.720p-GRP".to_string(),
                "Die Ärzte - Best Of-[(2020) FLAC]".to_string(),
                "Unrelated.Show.S01E01".to_string(),
            ]
        );
        for guid in 0..4 {
            assert!(rewritten.contains(&format!("<guid>{}</guid>", guid)));
        }
    }

    #[test]
    fn test_explicit_item_overrides_cache() {
        let rewriter = rewriter(Vec::new());
        let searched = item("1", "Die Ärzte", MediaType::Tv, None, &[]);
        let body = feed(&[("Die.Arzte.S01E01", "TV/HD")]);

        assert_eq!(
            titles(&rewriter.rewrite_titles(&body, Some(&searched))),
            vec!["Die.Ärzte.S01E01".to_string()]
        );
    }

    #[test]
    fn test_renames_are_recorded() {
        let cache = Arc::new(TitleCache::default());
        cache.put(item("1", "Die Ärzte", MediaType::Tv, None, &[]));
        let renamed = Arc::new(RenamedTitles::new());
        let rewriter = TitleRewriter::new(cache).with_renamed_titles(Arc::clone(&renamed));

        rewriter.rewrite_titles(&feed(&[("Die.Aerzte.S01E01", "5000")]), None);

        assert_eq!(
            renamed.original_title("Die.Ärzte.S01E01").as_deref(),
            Some("Die.Aerzte.S01E01")
        );
    }
}

// ============================================================================
// Aggregation Tests
// ============================================================================

mod aggregation {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_merging_twice_is_idempotent() {
        let body = feed(&[("A.S01E01", "5000"), ("B.S01E01", "5000")]);

        let mut once = AggregatedResult::new("application/xml", "utf-8");
        once.merge(&body).unwrap();

        let mut twice = AggregatedResult::new("application/xml", "utf-8");
        twice.merge(&body).unwrap();
        twice.merge(&body).unwrap();

        assert_eq!(once.len(), twice.len());
        assert_eq!(once.content(), twice.content());
    }

    #[test]
    fn test_rewritten_variation_responses_collapse() {
        let rewriter = rewriter(vec![item("1", "Die Ärzte", MediaType::Tv, None, &[])]);

        let mut aggregated = AggregatedResult::new("application/xml", "utf-8");
        for body in [
            feed(&[("Die.Aerzte.S01E01", "5000")]),
            feed(&[("Die.Arzte.S01E01", "5000")]),
            feed(&[("Die.Ärzte.S01E01", "5000"), ("Die.Ärzte.S01E02", "5000")]),
        ] {
            aggregated.merge(&rewriter.rewrite_titles(&body, None)).unwrap();
        }

        assert_eq!(
            titles(&aggregated.content()),
            vec!["Die.Ärzte.S01E01".to_string(), "Die.Ärzte.S01E02".to_string()]
        );
    }

    #[test]
    fn test_malformed_response_does_not_abort_aggregation() {
        let mut aggregated = AggregatedResult::new("application/xml", "utf-8");
        aggregated.merge(&feed(&[("A", "5000")])).unwrap();
        assert!(aggregated.merge("<rss><channel><item>").is_err());
        aggregated.merge(&feed(&[("B", "5000")])).unwrap();

        assert_eq!(aggregated.len(), 2);
    }
}

// ============================================================================
// Cache Properties
// ============================================================================

mod cache_properties {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_longest_match_precedence() {
        let cache = TitleCache::default();
        cache.put(item("prefix", "Star", MediaType::Movie, None, &[]));
        cache.put(item("full", "Star Wars", MediaType::Movie, None, &[]));

        let found = cache.find_best_match(MediaType::Movie, "Star Wars 1977 German DL");
        assert_eq!(found.map(|i| i.external_id.clone()), Some("full".to_string()));
    }

    #[test]
    fn test_non_latin_titles_are_found() {
        let cache = TitleCache::default();
        cache.put(item("brat", "Брат", MediaType::Movie, None, &[]));

        let found = cache.find_best_match(MediaType::Movie, "Брат 1997 German DL");
        assert_eq!(found.map(|i| i.external_id.clone()), Some("brat".to_string()));
    }

    #[test]
    fn test_comparison_key_is_idempotent() {
        for title in [
            "Die_Aerzte-BestOf-2020-WEB",
            "Frieren: Beyond Journey's End",
            "Pokémon.Die.Serie.S01E01",
            "ÄÖÜ äöü ß",
        ] {
            let key = comparison_key(title);
            assert_eq!(comparison_key(&key), key);
        }
    }
}
