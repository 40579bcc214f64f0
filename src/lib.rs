//! Title normalization, matching and rewriting for indexer feeds
//!
//! Indexers publish German releases under spellings managers do not
//! recognize (`Die.Aerzte`, `Die Arzte`, an English title). This crate keeps
//! a cache of the managers' media items with every plausible spelling, finds
//! the item a release belongs to and rewrites the release title to the one
//! the manager expects.

pub mod cli;
pub mod config;
pub mod indexer;
pub mod media;
pub mod services;
