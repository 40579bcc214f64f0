//! Umlautarr command line
//!
//! Rewrites the item titles of saved indexer feeds against a media catalog
//! and prints the merged result.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use umlautarr::cli::{CliOptions, USAGE};
use umlautarr::config::Config;
use umlautarr::indexer::torznab::AggregatedResult;
use umlautarr::services::{
    CatalogSource, CatalogSync, JsonCatalogSource, RenamedTitles, TitleCache, TitleRewriter,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Feed output goes to stdout, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "umlautarr=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let options = CliOptions::from_args()?;
    if options.help {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    let cache = Arc::new(TitleCache::new(config.cache_ttl));

    if let Some(catalog) = options.catalog.clone().or(config.catalog_path.clone()) {
        let source: Arc<dyn CatalogSource> = Arc::new(JsonCatalogSource::new(&catalog));
        let report = CatalogSync::new(Arc::clone(&cache), vec![source]).sync_once().await;
        if !report.sources_failed.is_empty() {
            anyhow::bail!("Failed to load catalog {}", catalog.display());
        }
        tracing::info!(items = report.items_cached, "Catalog loaded");
    }

    let mut rewriter = TitleRewriter::new(Arc::clone(&cache));
    let renamed = config
        .enable_changed_title_cache
        .then(|| Arc::new(RenamedTitles::new()));
    if let Some(renamed) = &renamed {
        rewriter = rewriter.with_renamed_titles(Arc::clone(renamed));
    }

    let item = match &options.item {
        Some((media_type, external_id)) => Some(
            cache
                .get_by_external_id(*media_type, external_id)
                .with_context(|| format!("No {} item with external id {} in catalog", media_type, external_id))?,
        ),
        None => None,
    };

    let mut aggregated = AggregatedResult::new(&config.default_content_type, &config.default_charset);
    for path in &options.feeds {
        let body = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read feed {}", path.display()))?;

        let rewritten = rewriter.rewrite_titles(&body, item.as_deref());
        match aggregated.merge(&rewritten) {
            Ok(added) => tracing::info!(feed = %path.display(), added, "Merged feed"),
            Err(e) => tracing::warn!(feed = %path.display(), error = %e, "Skipping malformed feed"),
        }
    }

    if let Some(renamed) = &renamed {
        for entry in renamed.entries() {
            tracing::info!(original = %entry.original, renamed = %entry.renamed, "Recorded rename");
        }
    }

    println!("{}", aggregated.content());
    Ok(())
}
