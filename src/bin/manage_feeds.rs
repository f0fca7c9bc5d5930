use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use url::Url;
use uuid::Uuid;

use rssagg::db::Database;
use rssagg::logging::configure_logging;

#[derive(Parser)]
#[clap(name = "feed-manager", about = "Manage the feeds the scraper polls")]
struct Cli {
    /// Path to the SQLite database
    #[clap(long, env = "DATABASE_PATH", default_value = "rssagg.db")]
    database: String,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new feed
    Add {
        /// Display name of the feed
        #[clap(required = true)]
        name: String,

        /// Feed URL (http or https)
        #[clap(required = true)]
        url: String,

        /// Owning user
        #[clap(short, long)]
        user_id: Option<Uuid>,
    },

    /// List all feeds
    List,

    /// Show the newest posts of a feed
    Posts {
        /// Feed ID
        #[clap(required = true)]
        feed_id: Uuid,

        /// Number of posts to show
        #[clap(short, long, default_value = "10")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    configure_logging();

    let args = Cli::parse();

    let db = Database::new(&args.database)
        .await
        .with_context(|| format!("Failed to open database {}", args.database))?;

    match args.command {
        Commands::Add { name, url, user_id } => add_feed(&db, &name, &url, user_id).await?,
        Commands::List => list_feeds(&db).await?,
        Commands::Posts { feed_id, limit } => list_posts(&db, feed_id, limit).await?,
    }

    Ok(())
}

fn validate_feed_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("Invalid feed URL: {}", raw))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("Unsupported URL scheme '{}', expected http or https", url.scheme());
    }
    Ok(url)
}

async fn add_feed(db: &Database, name: &str, url: &str, user_id: Option<Uuid>) -> Result<()> {
    let url = validate_feed_url(url)?;

    match db.create_feed(name.trim(), url.as_str(), user_id).await {
        Ok(feed) => println!("{}", serde_json::to_string_pretty(&feed)?),
        Err(err) if err.is_duplicate_key() => bail!("A feed with URL {} already exists", url),
        Err(err) => return Err(err).context("Failed to add feed"),
    }

    Ok(())
}

async fn list_feeds(db: &Database) -> Result<()> {
    let feeds = db.list_feeds().await.context("Failed to list feeds")?;
    println!("{}", serde_json::to_string_pretty(&feeds)?);
    Ok(())
}

async fn list_posts(db: &Database, feed_id: Uuid, limit: usize) -> Result<()> {
    let feed = db
        .get_feed(feed_id)
        .await
        .with_context(|| format!("Unknown feed {}", feed_id))?;
    let posts = db.get_posts_for_feed(feed.id, limit).await?;
    let total = db.count_posts_for_feed(feed.id).await?;

    eprintln!("{} ({}): showing {} of {} posts", feed.name, feed.url, posts.len(), total);
    println!("{}", serde_json::to_string_pretty(&posts)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_feed_url() {
        assert!(validate_feed_url("https://example.com/rss").is_ok());
        assert!(validate_feed_url(" http://example.com/feed.xml ").is_ok());
        assert!(validate_feed_url("ftp://example.com/rss").is_err());
        assert!(validate_feed_url("not a url").is_err());
    }
}
