//! Type definitions for the RSS module.

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use tokio::time::Duration;

/// Client-level timeout applied to every feed request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const USER_AGENT: &str = concat!("rssagg/", env!("CARGO_PKG_VERSION"));

/// A decoded feed document, held in memory only long enough to ingest its items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFeedDocument {
    pub title: String,
    pub link: String,
    pub description: String,
    pub language: String,
    pub items: Vec<RawItem>,
}

/// One entry of a feed exactly as published; `pub_date` is not yet parsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: String,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("request timed out after {} seconds", .0.as_secs_f32())]
    Timeout(Duration),

    #[error("unexpected HTTP status {0}")]
    Status(StatusCode),

    #[error("failed to parse feed: {0}")]
    Parse(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Retrieves and decodes a feed by URL.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<RawFeedDocument, FetchError>;
}
