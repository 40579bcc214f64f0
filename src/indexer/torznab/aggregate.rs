//! Merging of several indexer responses into one feed
//!
//! A search fans out into one indexer query per title variation. The
//! responses overlap heavily, so items are deduplicated by their exact
//! serialized form and kept in order of first appearance.

use std::collections::HashSet;
use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use tracing::debug;

use super::{FeedDocument, FeedError, FeedItem, FeedResponse};

/// Accumulates the items of several feed responses
#[derive(Debug, Clone)]
pub struct AggregatedResult {
    content_type: String,
    encoding: String,
    metadata_from_response: bool,
    seen: HashSet<String>,
    items: Vec<FeedItem>,
}

impl AggregatedResult {
    pub fn new(content_type: impl Into<String>, encoding: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            encoding: encoding.into(),
            metadata_from_response: false,
            seen: HashSet::new(),
            items: Vec::new(),
        }
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[FeedItem] {
        &self.items
    }

    /// Merge the items of a feed body.
    ///
    /// Returns the number of items that were not seen before. A body that
    /// fails to parse leaves the accumulator untouched.
    pub fn merge(&mut self, body: &str) -> Result<usize, FeedError> {
        let document = FeedDocument::parse(body)?;

        let mut added = 0;
        for item in document.into_items() {
            let key = item.to_xml()?;
            if self.seen.insert(key) {
                self.items.push(item);
                added += 1;
            }
        }

        debug!(added, total = self.items.len(), "Merged feed items");
        Ok(added)
    }

    /// Merge a response, adopting its content type and charset if it is the
    /// first response to merge successfully.
    pub fn merge_response(&mut self, response: &FeedResponse) -> Result<usize, FeedError> {
        let added = self.merge(&response.body)?;

        if !self.metadata_from_response {
            if let Some(content_type) = &response.content_type {
                self.content_type = content_type.clone();
            }
            if let Some(charset) = &response.charset {
                self.encoding = charset.clone();
            }
            self.metadata_from_response = true;
        }

        Ok(added)
    }

    /// Serialize the merged feed.
    pub fn content(&self) -> String {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .ok();

        let mut rss = BytesStart::new("rss");
        rss.push_attribute(("version", "2.0"));
        rss.push_attribute(("xmlns:atom", "http://www.w3.org/2005/Atom"));
        rss.push_attribute(("xmlns:torznab", "http://torznab.com/schemas/2015/feed"));
        writer.write_event(Event::Start(rss)).ok();

        writer
            .write_event(Event::Start(BytesStart::new("channel")))
            .ok();

        for item in &self.items {
            item.write_to(&mut writer).ok();
        }

        writer
            .write_event(Event::End(BytesEnd::new("channel")))
            .ok();
        writer.write_event(Event::End(BytesEnd::new("rss"))).ok();

        String::from_utf8(writer.into_inner().into_inner()).unwrap_or_default()
    }

    /// Consume the accumulator into a response carrying the merged feed.
    pub fn into_response(self) -> FeedResponse {
        let body = self.content();
        FeedResponse {
            body,
            content_type: Some(self.content_type),
            charset: Some(self.encoding),
        }
    }
}
