//! Search fan-out over title variations
//!
//! A manager's search is forwarded to the indexer as-is first. When the
//! searched item is also known under other spellings, the indexer is queried
//! again once per search variation (without id parameters, which would pin
//! the indexer to its own title), and all responses are merged into one feed
//! with rewritten titles.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info, warn};
use url::Url;

use crate::indexer::torznab::{AggregatedResult, FeedResponse, DEFAULT_CHARSET, DEFAULT_CONTENT_TYPE};
use crate::media::{MediaItem, MediaType};
use crate::services::lookup::SearchItemLookup;
use crate::services::title_matcher::TitleRewriter;

/// Query parameters that identify an item by id instead of by title
const ID_PARAMETERS: [&str; 3] = ["tvdbid", "tvmazeid", "imdbid"];

/// Transport that performs indexer requests
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FeedResponse>;
}

pub struct SearchService {
    fetcher: Arc<dyn FeedFetcher>,
    rewriter: TitleRewriter,
    lookup: Option<Arc<SearchItemLookup>>,
    default_content_type: String,
    default_charset: String,
}

impl SearchService {
    pub fn new(fetcher: Arc<dyn FeedFetcher>, rewriter: TitleRewriter) -> Self {
        Self {
            fetcher,
            rewriter,
            lookup: None,
            default_content_type: DEFAULT_CONTENT_TYPE.to_string(),
            default_charset: DEFAULT_CHARSET.to_string(),
        }
    }

    pub fn with_lookup(mut self, lookup: Arc<SearchItemLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Content type and charset used when no response declares them.
    pub fn with_defaults(mut self, content_type: impl Into<String>, charset: impl Into<String>) -> Self {
        self.default_content_type = content_type.into();
        self.default_charset = charset.into();
        self
    }

    /// TV search: resolve the item from `tvdbid` or `q`, then search.
    pub async fn tv_search(&self, url: &Url) -> Result<FeedResponse> {
        let item = self.resolve_item(MediaType::Tv, url).await;
        self.search(url, item.as_deref()).await
    }

    /// Search the indexer at `url`, fanning out over the item's search
    /// variations when it has any besides its expected title.
    pub async fn search(&self, url: &Url, item: Option<&MediaItem>) -> Result<FeedResponse> {
        let initial = self
            .fetcher
            .fetch(url)
            .await
            .with_context(|| format!("Indexer request failed: {}", redact(url)))?;

        let initial_body = self.rewriter.rewrite_titles(&initial.body, item);

        let Some(item) = item.filter(|item| needs_variation_search(item)) else {
            return Ok(FeedResponse {
                body: initial_body,
                ..initial
            });
        };

        let mut queries = item.search_variations.clone();
        if let Some(q) = query_value(url, "q").filter(|q| !q.is_empty()) {
            if !queries.iter().any(|v| v == &q) {
                queries.push(q);
            }
        }

        let urls: Vec<Url> = queries.iter().map(|q| variation_url(url, q)).collect();
        info!(
            expected_title = %item.expected_title,
            variations = urls.len(),
            "Searching indexer with title variations"
        );

        let responses = join_all(urls.iter().map(|u| self.fetcher.fetch(u))).await;

        let mut aggregated = AggregatedResult::new(&self.default_content_type, &self.default_charset);
        for (variation_url, response) in urls.iter().zip(responses) {
            let mut response = match response {
                Ok(response) => response,
                Err(e) => {
                    warn!(url = %redact(variation_url), error = %e, "Variation search failed");
                    continue;
                }
            };

            response.body = self.rewriter.rewrite_titles(&response.body, Some(item));
            if let Err(e) = aggregated.merge_response(&response) {
                warn!(url = %redact(variation_url), error = %e, "Skipping malformed variation response");
            }
        }

        if let Err(e) = aggregated.merge(&initial_body) {
            warn!(error = %e, "Skipping malformed initial response");
        }

        debug!(items = aggregated.len(), "Aggregated variation searches");
        Ok(aggregated.into_response())
    }

    async fn resolve_item(&self, media_type: MediaType, url: &Url) -> Option<Arc<MediaItem>> {
        let lookup = self.lookup.as_ref()?;

        if let Some(tvdb_id) = query_value(url, "tvdbid").filter(|v| !v.is_empty()) {
            return lookup.get_or_fetch_by_external_id(media_type, &tvdb_id).await;
        }
        if let Some(title) = query_value(url, "q").filter(|v| !v.is_empty()) {
            return lookup.get_or_fetch_by_title(media_type, &title).await;
        }
        None
    }
}

/// An item is searched by variation unless its only search variation is its
/// expected title.
fn needs_variation_search(item: &MediaItem) -> bool {
    !item.expected_title.is_empty()
        && !item.search_variations.is_empty()
        && !(item.search_variations.len() == 1 && item.search_variations[0] == item.expected_title)
}

fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// `url` with id parameters removed and `q` set to `query`.
fn variation_url(url: &Url, query: &str) -> Url {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| {
            let key: &str = k;
            key != "q" && !ID_PARAMETERS.contains(&key)
        })
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut url = url.clone();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair("q", query);
    url
}

/// Url without its `apikey` parameter, for logs.
fn redact(url: &Url) -> String {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !k.eq_ignore_ascii_case("apikey"))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}
