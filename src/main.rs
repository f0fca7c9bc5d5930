use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

use rssagg::config::{ScraperConfig, DEFAULT_CONCURRENCY, DEFAULT_POLL_INTERVAL};
use rssagg::db::Database;
use rssagg::logging::configure_logging;
use rssagg::rss::HttpFeedFetcher;
use rssagg::scraper::Scraper;
use rssagg::TARGET_SCRAPER;

#[derive(Parser)]
#[clap(name = "rssagg", about = "Periodically scrape RSS feeds into SQLite")]
struct Cli {
    /// Path to the SQLite database
    #[clap(long, env = "DATABASE_PATH", default_value = "rssagg.db")]
    database: String,

    /// Number of feeds fetched per cycle
    #[clap(long, env = "SCRAPER_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Seconds between the start of two cycles
    #[clap(long, env = "SCRAPER_INTERVAL_SECS", default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
    interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    configure_logging();

    let cli = Cli::parse();

    let config = ScraperConfig::new(cli.concurrency, Duration::from_secs(cli.interval_secs))
        .context("Invalid scraper configuration")?;

    let db = Database::new(&cli.database)
        .await
        .with_context(|| format!("Failed to open database {}", cli.database))?;

    let fetcher = HttpFeedFetcher::new().context("Failed to build HTTP client")?;

    let scraper = Scraper::new(Arc::new(db), Arc::new(fetcher), config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(err) = signal::ctrl_c().await {
            // Keep the sender alive; dropping it would stop the scraper.
            error!(target: TARGET_SCRAPER, "Failed to listen for ctrl-c: {}", err);
            std::future::pending::<()>().await;
        }
        info!(target: TARGET_SCRAPER, "Shutdown requested, finishing current cycle");
        let _ = shutdown_tx.send(true);
    });

    info!(
        target: TARGET_SCRAPER,
        "Starting rssagg with database {} ({} feeds per cycle)",
        cli.database,
        scraper.config().concurrency()
    );
    scraper.run(shutdown_rx).await;

    Ok(())
}
