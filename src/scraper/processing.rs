//! Ingestion of a single feed.

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::db::FeedStore;
use crate::models::{Feed, Post};
use crate::rss::{DateNormalizer, FeedFetcher, RawItem};
use crate::TARGET_SCRAPER;

/// What happened to one feed during a cycle. Failures are reported here and in
/// the logs; they are never propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeOutcome {
    SkippedEmptyUrl,
    MarkFailed,
    FetchFailed,
    Completed(ItemCounts),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemCounts {
    pub created: usize,
    pub duplicates: usize,
    pub failed: usize,
    /// Items whose publish date fell back to the ingestion time.
    pub undated: usize,
}

/// Marks `feed` as fetched, downloads it and stores every item not seen before.
///
/// The fetch timestamp is written before the download so that a feed that
/// keeps failing still moves to the back of the queue.
pub async fn scrape_feed(
    store: &dyn FeedStore,
    fetcher: &dyn FeedFetcher,
    normalizer: &DateNormalizer,
    feed: &Feed,
) -> ScrapeOutcome {
    if feed.url.is_empty() {
        warn!(target: TARGET_SCRAPER, "Skipping feed {} ({}): empty URL", feed.id, feed.name);
        return ScrapeOutcome::SkippedEmptyUrl;
    }

    if let Err(err) = store.mark_feed_as_fetched(feed.id, Utc::now()).await {
        error!(target: TARGET_SCRAPER, "Error marking feed {} as fetched: {}", feed.url, err);
        return ScrapeOutcome::MarkFailed;
    }

    let document = match fetcher.fetch(&feed.url).await {
        Ok(document) => document,
        Err(err) => {
            error!(target: TARGET_SCRAPER, "Error fetching feed {}: {}", feed.url, err);
            return ScrapeOutcome::FetchFailed;
        }
    };

    debug!(target: TARGET_SCRAPER, "Feed {} returned {} items", feed.url, document.items.len());

    let mut counts = ItemCounts::default();
    for item in document.items {
        store_item(store, normalizer, feed, item, &mut counts).await;
    }

    if counts.undated > 0 {
        warn!(
            target: TARGET_SCRAPER,
            "{} items from {} had unparseable publish dates; used ingestion time",
            counts.undated,
            feed.url
        );
    }

    if counts.created > 0 {
        info!(target: TARGET_SCRAPER, "Collected {} new posts from {}", counts.created, feed.url);
    } else {
        debug!(target: TARGET_SCRAPER, "No new posts from {}", feed.url);
    }

    ScrapeOutcome::Completed(counts)
}

async fn store_item(
    store: &dyn FeedStore,
    normalizer: &DateNormalizer,
    feed: &Feed,
    item: RawItem,
    counts: &mut ItemCounts,
) {
    let now = Utc::now();
    let published_at = match normalizer.parse(&item.pub_date) {
        Some(date) => date,
        None => {
            debug!(target: TARGET_SCRAPER, "Unparseable pub date {:?} for {}", item.pub_date, item.link);
            counts.undated += 1;
            now
        }
    };

    // Stored as published; only an empty description becomes absent.
    let post = Post {
        id: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
        title: item.title,
        description: (!item.description.is_empty()).then_some(item.description),
        published_at,
        url: item.link,
        feed_id: feed.id,
    };
    let url = post.url.clone();

    match store.create_post(post).await {
        Ok(_) => counts.created += 1,
        Err(err) if err.is_duplicate_key() => {
            // Already ingested in an earlier cycle, or another item with the same link.
            counts.duplicates += 1;
        }
        Err(err) => {
            error!(target: TARGET_SCRAPER, "Error creating post {} from {}: {}", url, feed.url, err);
            counts.failed += 1;
        }
    }
}
