use sqlx::FromRow;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::core::{decode_time, decode_uuid, encode_time, Database};
use super::error::StoreError;
use crate::models::Post;
use crate::TARGET_DB;

#[derive(FromRow)]
struct PostRow {
    id: String,
    created_at: String,
    updated_at: String,
    title: String,
    description: Option<String>,
    published_at: String,
    url: String,
    feed_id: String,
}

impl TryFrom<PostRow> for Post {
    type Error = StoreError;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        Ok(Post {
            id: decode_uuid(&row.id)?,
            created_at: decode_time(&row.created_at)?,
            updated_at: decode_time(&row.updated_at)?,
            title: row.title,
            description: row.description,
            published_at: decode_time(&row.published_at)?,
            url: row.url,
            feed_id: decode_uuid(&row.feed_id)?,
        })
    }
}

impl Database {
    /// Inserts a post. A post whose URL is already stored fails with
    /// [`StoreError::DuplicateKey`].
    #[instrument(target = "db_query", level = "debug", skip(self, post), fields(url = %post.url))]
    pub async fn create_post(&self, post: &Post) -> Result<Post, StoreError> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            INSERT INTO posts (id, created_at, updated_at, title, description, published_at, url, feed_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            RETURNING id, created_at, updated_at, title, description, published_at, url, feed_id
            "#,
        )
        .bind(post.id.to_string())
        .bind(encode_time(&post.created_at))
        .bind(encode_time(&post.updated_at))
        .bind(&post.title)
        .bind(post.description.as_deref())
        .bind(encode_time(&post.published_at))
        .bind(&post.url)
        .bind(post.feed_id.to_string())
        .fetch_one(self.pool())
        .await?;

        debug!(target: TARGET_DB, "Stored post: {}", post.url);
        Post::try_from(row)
    }

    /// Newest posts of a feed first.
    pub async fn get_posts_for_feed(
        &self,
        feed_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Post>, StoreError> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, created_at, updated_at, title, description, published_at, url, feed_id
            FROM posts
            WHERE feed_id = ?1
            ORDER BY published_at DESC
            LIMIT ?2
            "#,
        )
        .bind(feed_id.to_string())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(Post::try_from).collect()
    }

    pub async fn count_posts_for_feed(&self, feed_id: Uuid) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts WHERE feed_id = ?1")
            .bind(feed_id.to_string())
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn post_for(feed_id: Uuid, url: &str, hour: u32) -> Post {
        let now = Utc::now();
        Post {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            title: format!("post at {}", hour),
            description: None,
            published_at: Utc.with_ymd_and_hms(2024, 3, 5, hour, 0, 0).unwrap(),
            url: url.to_string(),
            feed_id,
        }
    }

    #[tokio::test]
    async fn test_create_post_and_list() {
        let db = Database::in_memory().await.unwrap();
        let feed = db.create_feed("f", "http://a.test/rss", None).await.unwrap();

        let mut first = post_for(feed.id, "http://a.test/1", 8);
        first.description = Some("body".to_string());
        let stored = db.create_post(&first).await.unwrap();
        assert_eq!(stored.description.as_deref(), Some("body"));
        assert_eq!(stored.published_at, first.published_at);

        db.create_post(&post_for(feed.id, "http://a.test/2", 12)).await.unwrap();

        let posts = db.get_posts_for_feed(feed.id, 10).await.unwrap();
        let urls: Vec<&str> = posts.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["http://a.test/2", "http://a.test/1"]);
        assert_eq!(db.count_posts_for_feed(feed.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_url_is_distinguishable() {
        let db = Database::in_memory().await.unwrap();
        let feed = db.create_feed("f", "http://a.test/rss", None).await.unwrap();

        db.create_post(&post_for(feed.id, "http://a.test/1", 8)).await.unwrap();
        let err = db
            .create_post(&post_for(feed.id, "http://a.test/1", 9))
            .await
            .unwrap_err();

        assert!(err.is_duplicate_key(), "unexpected error: {:?}", err);
        assert_eq!(db.count_posts_for_feed(feed.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_post_for_missing_feed_is_not_duplicate() {
        let db = Database::in_memory().await.unwrap();
        let err = db
            .create_post(&post_for(Uuid::new_v4(), "http://a.test/1", 8))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Database(_)), "unexpected error: {:?}", err);
    }
}
