//! Feed scraping: the periodic scheduler and the per-feed ingestion worker.

mod processing;
mod worker_loop;


pub use self::processing::{scrape_feed, ItemCounts, ScrapeOutcome};
pub use self::worker_loop::{CycleSummary, Scraper};
