//! SQLite-backed storage for feeds and posts.

pub mod core;
mod error;
mod feed;
mod post;
mod schema;
mod store;

pub use self::core::Database;
pub use self::error::StoreError;
pub use self::store::FeedStore;
