use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An externally hosted RSS source, tracked by URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
    pub url: String,
    /// `None` until the feed has been fetched at least once.
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub user_id: Option<Uuid>,
}

impl Feed {
    pub fn new(name: &str, url: &str, user_id: Option<Uuid>) -> Self {
        let now = Utc::now();
        Feed {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            name: name.to_string(),
            url: url.to_string(),
            last_fetched_at: None,
            user_id,
        }
    }
}

/// A single entry ingested from a feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub title: String,
    pub description: Option<String>,
    pub published_at: DateTime<Utc>,
    pub url: String,
    pub feed_id: Uuid,
}
