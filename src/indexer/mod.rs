//! Indexer feed formats and category handling

pub mod categories;
pub mod torznab;
