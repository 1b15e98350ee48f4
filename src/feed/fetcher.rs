use crate::article::Article;
use crate::cancel::CancelSignal;
use crate::feed::parser::parse_feed;
use crate::http::{self, RequestError, MAX_BODY_SIZE};
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while paging through the feed.
///
/// HTTP statuses and malformed documents are not errors: they come back as
/// an empty page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid domain: {0:?}")]
    InvalidDomain(String),
    #[error("Fetch cancelled")]
    Cancelled,
    #[error(transparent)]
    Request(RequestError),
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

impl From<RequestError> for FetchError {
    fn from(e: RequestError) -> Self {
        match e {
            RequestError::Cancelled => FetchError::Cancelled,
            other => FetchError::Request(other),
        }
    }
}

/// Source of successive feed pages.
#[async_trait]
pub trait FeedSource: Send {
    /// Returns the next page of articles; empty means no further content.
    ///
    /// # Errors
    ///
    /// `FetchError::Cancelled` when `cancel` fires mid-request, or
    /// `FetchError::Request` for transport failures. Either way the source
    /// must not advance, so the same page is asked for on the next call.
    async fn fetch_next(&mut self, cancel: &CancelSignal) -> Result<Vec<Article>, FetchError>;
}

/// Pages through `https://{domain}/wp/feed`.
///
/// Owns the page counter: it starts at 1 and only moves after a successful
/// response, so a failed page can be asked for again.
pub struct FeedFetcher {
    client: reqwest::Client,
    feed_url: String,
    page: u32,
}

impl FeedFetcher {
    /// Fetcher for `https://{domain}/wp/feed`, starting at page 1.
    ///
    /// # Errors
    ///
    /// [`FetchError::InvalidDomain`] when `domain` is empty or whitespace.
    pub fn new(client: reqwest::Client, domain: &str) -> Result<Self, FetchError> {
        let domain = domain.trim();
        if domain.is_empty() {
            return Err(FetchError::InvalidDomain(domain.to_string()));
        }
        Ok(Self::with_base_url(client, format!("https://{domain}")))
    }

    /// Points the fetcher at an arbitrary origin (scheme and host, no path).
    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client,
            feed_url: format!("{}/wp/feed", base_url.trim_end_matches('/')),
            page: 1,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// URL of the current page. Page 1 carries no query string at all.
    pub fn current_url(&self) -> String {
        if self.page > 1 {
            format!("{}?paged={}", self.feed_url, self.page)
        } else {
            self.feed_url.clone()
        }
    }
}

#[async_trait]
impl FeedSource for FeedFetcher {
    async fn fetch_next(&mut self, cancel: &CancelSignal) -> Result<Vec<Article>, FetchError> {
        let url = self.current_url();
        tracing::debug!(url = %url, page = self.page, "Fetching feed page");

        let response = http::get(&self.client, &url, cancel).await?;

        if !response.status().is_success() {
            tracing::info!(
                url = %url,
                status = %response.status(),
                "Feed page unavailable, no further content"
            );
            return Ok(Vec::new());
        }

        // The page only counts as fetched once its whole body is in hand;
        // a body that parses badly still moves the counter.
        let bytes = http::read_body(response, MAX_BODY_SIZE, cancel).await?;
        self.page += 1;

        let articles = parse_feed(&bytes);
        tracing::debug!(url = %url, count = articles.len(), "Parsed feed page");
        Ok(articles)
    }
}
