//! Torznab / Newznab feed handling
//!
//! Indexers answer searches with an RSS 2.0 document whose `<item>` elements
//! carry the release `<title>` and `<category>`. This module parses those
//! documents, rewrites item titles in place and merges several responses into
//! one result set.
//!
//! Everything except the `<title>` text of an item is passed through as-is.

pub mod aggregate;
pub mod feed;

pub use aggregate::AggregatedResult;
pub use feed::{FeedDocument, FeedItem};

/// Content type used when an indexer does not declare one
pub const DEFAULT_CONTENT_TYPE: &str = "application/xml";
/// Charset used when an indexer does not declare one
pub const DEFAULT_CHARSET: &str = "utf-8";

/// Errors raised while reading or writing a feed document
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("malformed feed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("feed ended inside an open element")]
    UnexpectedEof,

    #[error("closing tag without matching opening tag")]
    UnmatchedEnd,

    #[error("feed contains no elements")]
    NoRootElement,

    #[error("failed to write feed: {0}")]
    Io(#[from] std::io::Error),

    #[error("feed output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// A raw indexer response as handed over by the transport layer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedResponse {
    pub body: String,
    /// Media type from the `Content-Type` header, without parameters
    pub content_type: Option<String>,
    /// `charset` parameter of the `Content-Type` header
    pub charset: Option<String>,
}

impl FeedResponse {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: None,
            charset: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>, charset: Option<String>) -> Self {
        self.content_type = Some(content_type.into());
        self.charset = charset;
        self
    }

    /// Build the `Content-Type` header value for this response.
    pub fn content_type_header(&self) -> String {
        let content_type = self.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE);
        match self.charset.as_deref() {
            Some(charset) => format!("{}; charset={}", content_type, charset),
            None => content_type.to_string(),
        }
    }
}
