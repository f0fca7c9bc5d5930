pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod rss;
pub mod scraper;

pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_DB: &str = "db_query";
pub const TARGET_SCRAPER: &str = "scraper";
