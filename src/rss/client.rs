//! HTTP retrieval of feed documents.

use async_trait::async_trait;
use reqwest::header;
use tokio::time::Duration;
use tracing::debug;

use super::parser::parse_feed;
use super::types::{FeedFetcher, FetchError, RawFeedDocument, REQUEST_TIMEOUT, USER_AGENT};
use crate::TARGET_WEB_REQUEST;

const ACCEPT_FEEDS: &str =
    "application/rss+xml, application/atom+xml, application/xml, text/xml;q=0.9, */*;q=0.8";

/// Create a client with a fixed request timeout and default redirect handling.
pub fn create_http_client(timeout: Duration) -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .gzip(true)
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::default())
        .build()
        .map_err(FetchError::Client)
}

/// Fetches feeds with a single GET per call. No retries: a failed feed waits
/// for the next cycle.
#[derive(Clone)]
pub struct HttpFeedFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFeedFetcher {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        Ok(HttpFeedFetcher {
            client: create_http_client(timeout)?,
            timeout,
        })
    }

    /// Wraps an existing client. `timeout` should match the one the client was built with.
    pub fn from_client(client: reqwest::Client, timeout: Duration) -> Self {
        HttpFeedFetcher { client, timeout }
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Request(err)
        }
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<RawFeedDocument, FetchError> {
        debug!(target: TARGET_WEB_REQUEST, "Loading RSS feed from {}", url);

        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, ACCEPT_FEEDS)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        debug!(target: TARGET_WEB_REQUEST, "Read {} bytes from {}", bytes.len(), url);

        parse_feed(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const BODY: &str = r#"<rss version="2.0"><channel><title>Local</title><link>http://local.test/</link><description>d</description>
<item><title>One</title><link>http://local.test/1</link><pubDate>Tue, 05 Mar 2024 14:30:00 GMT</pubDate></item>
</channel></rss>"#;

    fn test_fetcher(timeout: Duration) -> HttpFeedFetcher {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .unwrap();
        HttpFeedFetcher::from_client(client, timeout)
    }

    /// Serves one canned response and returns the URL to request.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/rss+xml\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        format!("http://{}/rss", addr)
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let url = serve_once("200 OK", BODY).await;
        let document = test_fetcher(Duration::from_secs(5)).fetch(&url).await.unwrap();

        assert_eq!(document.title, "Local");
        assert_eq!(document.items.len(), 1);
        assert_eq!(document.items[0].link, "http://local.test/1");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let url = serve_once("404 Not Found", "missing").await;
        let err = test_fetcher(Duration::from_secs(5)).fetch(&url).await.unwrap_err();

        assert!(matches!(err, FetchError::Status(status) if status.as_u16() == 404));
    }

    #[tokio::test]
    async fn test_fetch_malformed_body() {
        let url = serve_once("200 OK", "<html><body>not a feed").await;
        let err = test_fetcher(Duration::from_secs(5)).fetch(&url).await.unwrap_err();

        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept and never answer.
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let timeout = Duration::from_millis(200);
        let err = test_fetcher(timeout)
            .fetch(&format!("http://{}/rss", addr))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Timeout(d) if d == timeout));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = test_fetcher(Duration::from_secs(2))
            .fetch(&format!("http://{}/rss", addr))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Request(_)));
    }

    #[test]
    fn test_default_fetcher_uses_request_timeout() {
        let fetcher = HttpFeedFetcher::new().unwrap();
        assert_eq!(fetcher.timeout, REQUEST_TIMEOUT);
        assert_eq!(REQUEST_TIMEOUT, Duration::from_secs(10));
    }
}
