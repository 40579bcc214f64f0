//! Event-level model of an RSS feed
//!
//! The document is kept as the list of quick-xml events it was read from,
//! with each `<item>` element grouped into a [`FeedItem`]. Writing the events
//! back reproduces the document; only titles replaced via
//! [`FeedItem::set_title`] change.

use std::io::Cursor;

use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};

use super::FeedError;

/// A parsed feed document
#[derive(Debug, Clone, Default)]
pub struct FeedDocument {
    nodes: Vec<FeedNode>,
}

#[derive(Debug, Clone)]
enum FeedNode {
    Event(Event<'static>),
    Item(FeedItem),
}

enum ItemAction {
    Pass,
    Open,
    Close,
    Single,
}

/// One `<item>` element and everything inside it
#[derive(Debug, Clone)]
pub struct FeedItem {
    events: Vec<Event<'static>>,
}

impl FeedDocument {
    /// Parse a feed body.
    ///
    /// Fails on malformed XML, on unbalanced elements and on bodies without a
    /// single element.
    pub fn parse(body: &str) -> Result<Self, FeedError> {
        let mut reader = Reader::from_str(body);
        reader.config_mut().trim_text(false);

        let mut nodes = Vec::new();
        let mut current_item: Option<Vec<Event<'static>>> = None;
        let mut depth: usize = 0;
        let mut item_depth: usize = 0;
        let mut saw_element = false;

        loop {
            let event = reader.read_event()?.into_owned();
            let action = match &event {
                Event::Eof => break,
                Event::Start(e) => {
                    saw_element = true;
                    depth += 1;
                    if current_item.is_none() && e.local_name().as_ref() == b"item" {
                        item_depth = depth;
                        ItemAction::Open
                    } else {
                        ItemAction::Pass
                    }
                }
                Event::End(e) => {
                    if depth == 0 {
                        return Err(FeedError::UnmatchedEnd);
                    }
                    let closes_item = current_item.is_some()
                        && depth == item_depth
                        && e.local_name().as_ref() == b"item";
                    depth -= 1;
                    if closes_item {
                        ItemAction::Close
                    } else {
                        ItemAction::Pass
                    }
                }
                Event::Empty(e) => {
                    saw_element = true;
                    if current_item.is_none() && e.local_name().as_ref() == b"item" {
                        ItemAction::Single
                    } else {
                        ItemAction::Pass
                    }
                }
                _ => ItemAction::Pass,
            };

            match action {
                ItemAction::Open => current_item = Some(vec![event]),
                ItemAction::Close => {
                    if let Some(mut events) = current_item.take() {
                        events.push(event);
                        nodes.push(FeedNode::Item(FeedItem { events }));
                    }
                }
                ItemAction::Single => nodes.push(FeedNode::Item(FeedItem { events: vec![event] })),
                ItemAction::Pass => match current_item.as_mut() {
                    Some(events) => events.push(event),
                    None => nodes.push(FeedNode::Event(event)),
                },
            }
        }

        if depth != 0 || current_item.is_some() {
            return Err(FeedError::UnexpectedEof);
        }
        if !saw_element {
            return Err(FeedError::NoRootElement);
        }

        Ok(Self { nodes })
    }

    pub fn items(&self) -> impl Iterator<Item = &FeedItem> {
        self.nodes.iter().filter_map(|node| match node {
            FeedNode::Item(item) => Some(item),
            FeedNode::Event(_) => None,
        })
    }

    pub fn items_mut(&mut self) -> impl Iterator<Item = &mut FeedItem> {
        self.nodes.iter_mut().filter_map(|node| match node {
            FeedNode::Item(item) => Some(item),
            FeedNode::Event(_) => None,
        })
    }

    pub fn into_items(self) -> Vec<FeedItem> {
        self.nodes
            .into_iter()
            .filter_map(|node| match node {
                FeedNode::Item(item) => Some(item),
                FeedNode::Event(_) => None,
            })
            .collect()
    }

    /// Serialize the document back to XML.
    pub fn to_xml(&self) -> Result<String, FeedError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        for node in &self.nodes {
            match node {
                FeedNode::Event(event) => writer.write_event(event.clone())?,
                FeedNode::Item(item) => item.write_to(&mut writer)?,
            }
        }
        Ok(String::from_utf8(writer.into_inner().into_inner())?)
    }
}

impl FeedItem {
    /// Text of the item's `<title>` child, unescaped.
    pub fn title(&self) -> Option<String> {
        self.child_text(b"title")
    }

    /// Text of the item's first `<category>` child.
    pub fn category(&self) -> Option<String> {
        self.child_text(b"category")
    }

    /// Replace the text of the `<title>` child.
    ///
    /// Returns `false` when the item has no `<title>` element with content to
    /// replace.
    pub fn set_title(&mut self, title: &str) -> bool {
        let Some((start, end)) = self.child_span(b"title") else {
            return false;
        };
        self.events.drain(start + 1..end);
        let text = BytesText::from_escaped(partial_escape(title)).into_owned();
        self.events.insert(start + 1, Event::Text(text));
        true
    }

    /// Serialize this item on its own; used as its identity when merging.
    pub fn to_xml(&self) -> Result<String, FeedError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        self.write_to(&mut writer)?;
        Ok(String::from_utf8(writer.into_inner().into_inner())?)
    }

    pub(crate) fn write_to(&self, writer: &mut Writer<Cursor<Vec<u8>>>) -> Result<(), FeedError> {
        for event in &self.events {
            writer.write_event(event.clone())?;
        }
        Ok(())
    }

    fn child_text(&self, name: &[u8]) -> Option<String> {
        let (start, end) = self.child_span(name)?;
        let mut text = String::new();
        for event in &self.events[start + 1..end] {
            match event {
                Event::Text(e) => text.push_str(&e.unescape().unwrap_or_default()),
                Event::CData(e) => text.push_str(&String::from_utf8_lossy(e)),
                _ => {}
            }
        }
        Some(text)
    }

    /// Indices of the start and end events of the first direct child
    /// element called `name`.
    fn child_span(&self, name: &[u8]) -> Option<(usize, usize)> {
        let mut depth: usize = 0;
        let mut open: Option<usize> = None;

        for (index, event) in self.events.iter().enumerate() {
            match event {
                Event::Start(e) => {
                    depth += 1;
                    // depth 1 is the <item> itself
                    if depth == 2 && open.is_none() && e.local_name().as_ref() == name {
                        open = Some(index);
                    }
                }
                Event::End(_) => {
                    if depth == 2 {
                        if let Some(start) = open {
                            return Some((start, index));
                        }
                    }
                    depth = depth.saturating_sub(1);
                }
                _ => {}
            }
        }
        None
    }
}
