//! The periodic scraping loop.

use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

use super::processing::{scrape_feed, ScrapeOutcome};
use crate::config::ScraperConfig;
use crate::db::FeedStore;
use crate::rss::{DateNormalizer, FeedFetcher};
use crate::TARGET_SCRAPER;

/// Totals for one cycle, used for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub dispatched: usize,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub posts_created: usize,
    pub duplicates: usize,
}

impl CycleSummary {
    fn record(&mut self, outcome: ScrapeOutcome) {
        match outcome {
            ScrapeOutcome::SkippedEmptyUrl => self.skipped += 1,
            ScrapeOutcome::MarkFailed | ScrapeOutcome::FetchFailed => self.failed += 1,
            ScrapeOutcome::Completed(counts) => {
                self.completed += 1;
                self.posts_created += counts.created;
                self.duplicates += counts.duplicates;
            }
        }
    }
}

/// Polls due feeds in batches of `concurrency`, one task per feed, and waits
/// for the whole batch before the next tick.
pub struct Scraper {
    store: Arc<dyn FeedStore>,
    fetcher: Arc<dyn FeedFetcher>,
    normalizer: Arc<DateNormalizer>,
    config: ScraperConfig,
}

impl Scraper {
    pub fn new(
        store: Arc<dyn FeedStore>,
        fetcher: Arc<dyn FeedFetcher>,
        config: ScraperConfig,
    ) -> Self {
        Scraper {
            store,
            fetcher,
            normalizer: Arc::new(DateNormalizer::default()),
            config,
        }
    }

    pub fn with_normalizer(mut self, normalizer: DateNormalizer) -> Self {
        self.normalizer = Arc::new(normalizer);
        self
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Runs cycles until `shutdown` turns true or its sender goes away. The
    /// first cycle starts immediately. Shutdown is only observed between
    /// cycles; a batch in flight always runs to completion.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            target: TARGET_SCRAPER,
            "Scraping on {} workers every {:?}",
            self.config.concurrency(),
            self.config.poll_interval()
        );

        let mut ticker = time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            self.run_cycle().await;
        }

        info!(target: TARGET_SCRAPER, "Scraper stopped");
    }

    /// Fetches one batch of due feeds and waits for every worker to finish.
    pub async fn run_cycle(&self) -> CycleSummary {
        let limit = self.config.concurrency();

        let mut feeds = match self.store.get_next_feeds_to_fetch(limit).await {
            Ok(feeds) => feeds,
            Err(err) => {
                error!(target: TARGET_SCRAPER, "Failed to load feeds to fetch, skipping cycle: {}", err);
                return CycleSummary::default();
            }
        };

        if feeds.is_empty() {
            debug!(target: TARGET_SCRAPER, "No feeds to fetch");
            return CycleSummary::default();
        }
        // The batch size is the concurrency bound, whatever the store returned.
        feeds.truncate(limit);

        let handles: Vec<_> = feeds
            .into_iter()
            .map(|feed| {
                let store = Arc::clone(&self.store);
                let fetcher = Arc::clone(&self.fetcher);
                let normalizer = Arc::clone(&self.normalizer);
                tokio::spawn(async move {
                    scrape_feed(store.as_ref(), fetcher.as_ref(), &normalizer, &feed).await
                })
            })
            .collect();

        let mut summary = CycleSummary {
            dispatched: handles.len(),
            ..CycleSummary::default()
        };

        for result in join_all(handles).await {
            match result {
                Ok(outcome) => summary.record(outcome),
                Err(err) => {
                    error!(target: TARGET_SCRAPER, "Feed worker aborted: {}", err);
                    summary.failed += 1;
                }
            }
        }

        info!(
            target: TARGET_SCRAPER,
            "Cycle finished: {} feeds, {} completed, {} failed, {} skipped, {} new posts",
            summary.dispatched,
            summary.completed,
            summary.failed,
            summary.skipped,
            summary.posts_created
        );

        summary
    }
}
