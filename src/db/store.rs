use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::core::Database;
use super::error::StoreError;
use crate::models::{Feed, Post};

/// The persistence operations the scraper depends on. Implementations must be
/// safe to call concurrently from many workers.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// Up to `limit` feeds due for refresh, in the order they should be fetched.
    async fn get_next_feeds_to_fetch(&self, limit: usize) -> Result<Vec<Feed>, StoreError>;

    async fn mark_feed_as_fetched(
        &self,
        feed_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Feed, StoreError>;

    /// Fails with [`StoreError::DuplicateKey`] when the post already exists.
    async fn create_post(&self, post: Post) -> Result<Post, StoreError>;
}

#[async_trait]
impl FeedStore for Database {
    async fn get_next_feeds_to_fetch(&self, limit: usize) -> Result<Vec<Feed>, StoreError> {
        Database::get_next_feeds_to_fetch(self, limit).await
    }

    async fn mark_feed_as_fetched(
        &self,
        feed_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Feed, StoreError> {
        Database::mark_feed_as_fetched(self, feed_id, now).await
    }

    async fn create_post(&self, post: Post) -> Result<Post, StoreError> {
        Database::create_post(self, &post).await
    }
}
