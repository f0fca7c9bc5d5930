//! RSS feed retrieval and decoding.
//!
//! This module fetches feed documents over HTTP, decodes them into
//! [`RawFeedDocument`]s and normalizes their publication dates.

mod client;
mod dates;
mod parser;
mod types;

pub use self::client::{create_http_client, HttpFeedFetcher};
pub use self::dates::{DateLayout, DateNormalizer, DEFAULT_LAYOUTS};
pub use self::parser::{cleanup_xml, parse_feed};
pub use self::types::*;
