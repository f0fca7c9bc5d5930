use tracing::info;

use super::core::Database;
use super::error::StoreError;
use crate::TARGET_DB;

impl Database {
    pub(crate) async fn initialize_schema(&self) -> Result<(), StoreError> {
        let mut conn = self.pool().acquire().await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feeds (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                name TEXT NOT NULL,
                url TEXT NOT NULL UNIQUE,
                last_fetched_at TEXT,
                user_id TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_feeds_last_fetched_at ON feeds (last_fetched_at);

            CREATE TABLE IF NOT EXISTS posts (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                published_at TEXT NOT NULL,
                url TEXT NOT NULL UNIQUE,
                feed_id TEXT NOT NULL,
                FOREIGN KEY (feed_id) REFERENCES feeds (id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_posts_feed_id ON posts (feed_id);
            CREATE INDEX IF NOT EXISTS idx_posts_published_at ON posts (published_at);
            "#,
        )
        .execute(&mut *conn)
        .await?;

        info!(target: TARGET_DB, "Database schema initialized");
        Ok(())
    }
}
