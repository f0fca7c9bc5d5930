//! Feed decoding for RSS and Atom documents.

use feed_rs::model::{Entry, Feed as AtomFeed, Link};
use tracing::debug;

use super::types::{FetchError, RawFeedDocument, RawItem};
use crate::TARGET_WEB_REQUEST;

// Named HTML entities that show up in hand-written feeds but are not defined in XML.
const HTML_ENTITIES: [(&str, &str); 9] = [
    ("&nbsp;", "&#160;"),
    ("&ndash;", "&#8211;"),
    ("&mdash;", "&#8212;"),
    ("&lsquo;", "&#8216;"),
    ("&rsquo;", "&#8217;"),
    ("&ldquo;", "&#8220;"),
    ("&rdquo;", "&#8221;"),
    ("&hellip;", "&#8230;"),
    ("&copy;", "&#169;"),
];

/// Decodes a feed body, retrying once on a cleaned-up copy if the first pass fails.
pub fn parse_feed(bytes: &[u8]) -> Result<RawFeedDocument, FetchError> {
    let first_error = match decode(bytes) {
        Ok(document) => return Ok(document),
        Err(err) => err,
    };

    let cleaned = cleanup_xml(&String::from_utf8_lossy(bytes));
    if cleaned.as_bytes() == bytes {
        return Err(first_error);
    }

    debug!(target: TARGET_WEB_REQUEST, "Retrying feed decode after cleanup: {}", first_error);
    decode(cleaned.as_bytes()).map_err(|_| first_error)
}

fn decode(bytes: &[u8]) -> Result<RawFeedDocument, FetchError> {
    match ::rss::Channel::read_from(bytes) {
        Ok(channel) => Ok(RawFeedDocument::from(channel)),
        Err(rss_err) => match feed_rs::parser::parse(bytes) {
            Ok(feed) => {
                debug!(target: TARGET_WEB_REQUEST, "Decoded non-RSS document with feed-rs");
                Ok(RawFeedDocument::from(feed))
            }
            Err(_) => Err(FetchError::Parse(rss_err.to_string())),
        },
    }
}

impl From<::rss::Channel> for RawFeedDocument {
    fn from(channel: ::rss::Channel) -> Self {
        let items = channel
            .items()
            .iter()
            .map(|item| RawItem {
                title: item.title().unwrap_or_default().to_string(),
                link: item.link().unwrap_or_default().to_string(),
                description: item.description().unwrap_or_default().to_string(),
                pub_date: item.pub_date().unwrap_or_default().to_string(),
            })
            .collect();

        RawFeedDocument {
            title: channel.title().to_string(),
            link: channel.link().to_string(),
            description: channel.description().to_string(),
            language: channel.language().unwrap_or_default().to_string(),
            items,
        }
    }
}

impl From<AtomFeed> for RawFeedDocument {
    fn from(feed: AtomFeed) -> Self {
        RawFeedDocument {
            title: feed.title.map(|t| t.content).unwrap_or_default(),
            link: preferred_link(&feed.links),
            description: feed.description.map(|t| t.content).unwrap_or_default(),
            language: feed.language.unwrap_or_default(),
            items: feed.entries.into_iter().map(RawItem::from).collect(),
        }
    }
}

impl From<Entry> for RawItem {
    fn from(entry: Entry) -> Self {
        let description = entry
            .summary
            .map(|t| t.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .unwrap_or_default();

        // Dates are rendered back to text so they go through the same normalizer as RSS.
        RawItem {
            title: entry.title.map(|t| t.content).unwrap_or_default(),
            link: preferred_link(&entry.links),
            description,
            pub_date: entry
                .published
                .or(entry.updated)
                .map(|date| date.to_rfc3339())
                .unwrap_or_default(),
        }
    }
}

fn preferred_link(links: &[Link]) -> String {
    links
        .iter()
        .find(|link| matches!(link.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .map(|link| link.href.clone())
        .unwrap_or_default()
}

/// Strips a byte order mark and anything before the root element, maps common
/// HTML entities to numeric references and drops characters XML forbids.
pub fn cleanup_xml(xml: &str) -> String {
    let trimmed = xml.trim_start_matches('\u{FEFF}').trim();

    let start = ["<?xml", "<rss", "<feed", "<rdf:RDF"]
        .iter()
        .filter_map(|marker| trimmed.find(marker))
        .min()
        .unwrap_or(0);

    let mut cleaned = trimmed[start..].to_string();
    for (entity, numeric) in HTML_ENTITIES {
        cleaned = cleaned.replace(entity, numeric);
    }

    cleaned.chars().filter(|&c| is_xml_char(c)).collect()
}

fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}
