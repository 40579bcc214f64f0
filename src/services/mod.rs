//! Title engine services

pub mod catalog;
pub mod lookup;
pub mod renamed_titles;
pub mod search;
pub mod text_utils;
pub mod title_cache;
pub mod title_matcher;

pub use catalog::{CatalogSource, CatalogSync, JsonCatalogSource, SyncReport};
pub use lookup::SearchItemLookup;
pub use renamed_titles::{RenamedTitle, RenamedTitles};
pub use search::{FeedFetcher, SearchService};
pub use title_cache::TitleCache;
pub use title_matcher::{map_normalized_index_to_original, TitleRewriter};
