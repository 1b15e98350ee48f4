use crate::cancel::CancelSignal;
use crate::http::{self, MAX_BODY_SIZE};
use regex::Regex;
use std::sync::LazyLock;

/// Page that always links to the feed site's current domain.
pub const DEFAULT_PUBLISHER_URL: &str = "https://acg.gy/";

// Hostname class is letters, digits, dots and backslashes only; the
// publisher page never carries hyphenated hosts.
static LINK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<a href="https?://([a-zA-Z0-9\\.]*)">"#).unwrap());

/// Discovers the feed site's current domain from the publisher page.
pub struct DomainResolver {
    client: reqwest::Client,
    publisher_url: String,
}

impl DomainResolver {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_publisher_url(client, DEFAULT_PUBLISHER_URL)
    }

    pub fn with_publisher_url(client: reqwest::Client, publisher_url: impl Into<String>) -> Self {
        Self {
            client,
            publisher_url: publisher_url.into(),
        }
    }

    /// Returns the host of the first matching anchor on the publisher page.
    ///
    /// Every failure (network, HTTP status, no match) gives an empty string;
    /// nothing is retried. Callers decide whether to ask for a domain by hand.
    pub async fn resolve(&self) -> String {
        let never = CancelSignal::never();

        let response = match http::get(&self.client, &self.publisher_url, &never).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %self.publisher_url, error = %e, "Publisher page unreachable");
                return String::new();
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                url = %self.publisher_url,
                status = %response.status(),
                "Publisher page returned non-success status"
            );
            return String::new();
        }

        let body = match http::read_body(response, MAX_BODY_SIZE, &never).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(url = %self.publisher_url, error = %e, "Failed to read publisher page");
                return String::new();
            }
        };

        let domain = find_domain(&String::from_utf8_lossy(&body));
        if domain.is_empty() {
            tracing::warn!(url = %self.publisher_url, "No domain link found on publisher page");
        } else {
            tracing::info!(domain = %domain, "Resolved feed domain");
        }
        domain
    }
}

/// Scans raw HTML for the first `<a href="http(s)://host">` anchor.
///
/// The anchor must be exactly `<a href="...">` with a bare host: extra
/// attributes, a path or a hyphen in the host rule it out. Returns `""`
/// when nothing matches.
///
/// # Examples
///
/// ```
/// use hacg_reader::feed::find_domain;
///
/// assert_eq!(find_domain(r#"<a href="https://example.com">go</a>"#), "example.com");
/// assert_eq!(find_domain("<p>no links</p>"), "");
/// ```
pub fn find_domain(html: &str) -> String {
    LINK_PATTERN
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}
