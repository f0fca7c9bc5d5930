use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::core::{decode_time, decode_uuid, encode_time, Database};
use super::error::StoreError;
use crate::models::Feed;
use crate::TARGET_DB;

#[derive(FromRow)]
struct FeedRow {
    id: String,
    created_at: String,
    updated_at: String,
    name: String,
    url: String,
    last_fetched_at: Option<String>,
    user_id: Option<String>,
}

impl TryFrom<FeedRow> for Feed {
    type Error = StoreError;

    fn try_from(row: FeedRow) -> Result<Self, Self::Error> {
        Ok(Feed {
            id: decode_uuid(&row.id)?,
            created_at: decode_time(&row.created_at)?,
            updated_at: decode_time(&row.updated_at)?,
            name: row.name,
            url: row.url,
            last_fetched_at: row.last_fetched_at.as_deref().map(decode_time).transpose()?,
            user_id: row.user_id.as_deref().map(decode_uuid).transpose()?,
        })
    }
}

fn into_feeds(rows: Vec<FeedRow>) -> Result<Vec<Feed>, StoreError> {
    rows.into_iter().map(Feed::try_from).collect()
}

impl Database {
    #[instrument(target = "db_query", level = "info", skip(self))]
    pub async fn create_feed(
        &self,
        name: &str,
        url: &str,
        user_id: Option<Uuid>,
    ) -> Result<Feed, StoreError> {
        let feed = Feed::new(name, url, user_id);

        let row = sqlx::query_as::<_, FeedRow>(
            r#"
            INSERT INTO feeds (id, created_at, updated_at, name, url, last_fetched_at, user_id)
            VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6)
            RETURNING id, created_at, updated_at, name, url, last_fetched_at, user_id
            "#,
        )
        .bind(feed.id.to_string())
        .bind(encode_time(&feed.created_at))
        .bind(encode_time(&feed.updated_at))
        .bind(&feed.name)
        .bind(&feed.url)
        .bind(feed.user_id.map(|id| id.to_string()))
        .fetch_one(self.pool())
        .await?;

        info!(target: TARGET_DB, "Created feed {} ({})", feed.id, feed.url);
        Feed::try_from(row)
    }

    pub async fn get_feed(&self, feed_id: Uuid) -> Result<Feed, StoreError> {
        sqlx::query_as::<_, FeedRow>(
            "SELECT id, created_at, updated_at, name, url, last_fetched_at, user_id FROM feeds WHERE id = ?1",
        )
        .bind(feed_id.to_string())
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("feed {}", feed_id)))
        .and_then(Feed::try_from)
    }

    pub async fn list_feeds(&self) -> Result<Vec<Feed>, StoreError> {
        let rows = sqlx::query_as::<_, FeedRow>(
            "SELECT id, created_at, updated_at, name, url, last_fetched_at, user_id FROM feeds ORDER BY created_at ASC",
        )
        .fetch_all(self.pool())
        .await?;

        into_feeds(rows)
    }

    /// Feeds never fetched come first, then the least recently fetched.
    #[instrument(target = "db_query", level = "debug", skip(self))]
    pub async fn get_next_feeds_to_fetch(&self, limit: usize) -> Result<Vec<Feed>, StoreError> {
        let rows = sqlx::query_as::<_, FeedRow>(
            r#"
            SELECT id, created_at, updated_at, name, url, last_fetched_at, user_id
            FROM feeds
            ORDER BY last_fetched_at ASC NULLS FIRST, created_at ASC
            LIMIT ?1
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(self.pool())
        .await?;

        debug!(target: TARGET_DB, "Selected {} feeds to fetch", rows.len());
        into_feeds(rows)
    }

    /// Records a fetch attempt. `last_fetched_at` never moves backwards.
    #[instrument(target = "db_query", level = "debug", skip(self))]
    pub async fn mark_feed_as_fetched(
        &self,
        feed_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Feed, StoreError> {
        sqlx::query_as::<_, FeedRow>(
            r#"
            UPDATE feeds
            SET last_fetched_at = CASE
                    WHEN last_fetched_at IS NULL OR last_fetched_at < ?1 THEN ?1
                    ELSE last_fetched_at
                END,
                updated_at = ?1
            WHERE id = ?2
            RETURNING id, created_at, updated_at, name, url, last_fetched_at, user_id
            "#,
        )
        .bind(encode_time(&now))
        .bind(feed_id.to_string())
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("feed {}", feed_id)))
        .and_then(Feed::try_from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get_feed() {
        let db = Database::in_memory().await.unwrap();
        let owner = Uuid::new_v4();

        let feed = db
            .create_feed("Example", "http://example.test/rss", Some(owner))
            .await
            .unwrap();
        assert_eq!(feed.last_fetched_at, None);
        assert_eq!(feed.user_id, Some(owner));

        let loaded = db.get_feed(feed.id).await.unwrap();
        assert_eq!(loaded, feed);
        assert_eq!(db.list_feeds().await.unwrap(), vec![feed]);
    }

    #[tokio::test]
    async fn test_duplicate_feed_url() {
        let db = Database::in_memory().await.unwrap();
        db.create_feed("One", "http://example.test/rss", None).await.unwrap();

        let err = db
            .create_feed("Two", "http://example.test/rss", None)
            .await
            .unwrap_err();
        assert!(err.is_duplicate_key());
    }

    #[tokio::test]
    async fn test_next_feeds_orders_never_fetched_first() {
        let db = Database::in_memory().await.unwrap();
        let old = db.create_feed("old", "http://a.test/rss", None).await.unwrap();
        let recent = db.create_feed("recent", "http://b.test/rss", None).await.unwrap();
        let never = db.create_feed("never", "http://c.test/rss", None).await.unwrap();

        db.mark_feed_as_fetched(old.id, at(1)).await.unwrap();
        db.mark_feed_as_fetched(recent.id, at(5)).await.unwrap();

        let next: Vec<Uuid> = db
            .get_next_feeds_to_fetch(3)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(next, vec![never.id, old.id, recent.id]);

        let limited = db.get_next_feeds_to_fetch(2).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].id, never.id);
    }

    #[tokio::test]
    async fn test_mark_fetched_is_monotonic() {
        let db = Database::in_memory().await.unwrap();
        let feed = db.create_feed("f", "http://a.test/rss", None).await.unwrap();

        let marked = db.mark_feed_as_fetched(feed.id, at(10)).await.unwrap();
        assert_eq!(marked.last_fetched_at, Some(at(10)));

        let earlier = db.mark_feed_as_fetched(feed.id, at(9)).await.unwrap();
        assert_eq!(earlier.last_fetched_at, Some(at(10)));

        let later = db
            .mark_feed_as_fetched(feed.id, at(10) + Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(later.last_fetched_at, Some(at(10) + Duration::minutes(1)));
    }

    #[tokio::test]
    async fn test_mark_unknown_feed() {
        let db = Database::in_memory().await.unwrap();
        let err = db.mark_feed_as_fetched(Uuid::new_v4(), at(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
