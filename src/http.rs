//! HTTP plumbing shared by the resolver, the feed fetcher and the page analyzer.

use crate::cancel::CancelSignal;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_CHARSET, USER_AGENT};
use reqwest::redirect::Policy;
use std::time::Duration;
use thiserror::Error;

/// Desktop browser agent; the site turns away library defaults.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/103.0.5060.66 Safari/537.36 Edg/103.0.1264.44";

/// Upper bound on any feed or page body.
pub const MAX_BODY_SIZE: usize = 10 * 1024 * 1024; // 10MB

const MAX_REDIRECTS: usize = 10;

/// Errors raised below the HTTP status level.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Request timed out")]
    Timeout,
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    /// Received fewer bytes than Content-Length announced
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    #[error("Request cancelled")]
    Cancelled,
}

/// Client settings taken from configuration.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub user_agent: String,
    pub use_proxy: bool,
    pub timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            use_proxy: true,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Follows redirects up to a hop limit, refusing loops.
fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("Too many redirects");
        }

        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );

        attempt.follow()
    })
}

/// Builds the one client every component shares.
///
/// # Arguments
///
/// * `settings` - user agent, proxy toggle and request timeout
///
/// Every request carries `User-Agent` and `Accept-Charset: utf-8`. Redirects
/// are followed up to 10 hops; a hop back to an already-visited URL fails
/// the request.
///
/// # Errors
///
/// Fails when the user agent is not a valid header value or the TLS
/// backend cannot be initialised.
///
/// # Examples
///
/// ```
/// use hacg_reader::http::{build_client, ClientSettings};
///
/// let client = build_client(&ClientSettings::default()).unwrap();
/// # drop(client);
/// ```
pub fn build_client(settings: &ClientSettings) -> anyhow::Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_str(&settings.user_agent)?);
    headers.insert(ACCEPT_CHARSET, HeaderValue::from_static("utf-8"));

    let mut builder = reqwest::Client::builder()
        .default_headers(headers)
        .redirect(create_redirect_policy())
        .timeout(settings.timeout);

    if !settings.use_proxy {
        builder = builder.no_proxy();
    }

    Ok(builder.build()?)
}

/// Sends a GET, giving up as soon as `cancel` is raised.
///
/// Resolves once the response head has arrived; the body is left unread
/// for [`read_body`]. HTTP error statuses are not errors here.
///
/// # Errors
///
/// - [`RequestError::Cancelled`] if `cancel` fires first (checked before
///   sending, so an already-raised signal sends nothing)
/// - [`RequestError::Timeout`] when the client timeout elapses
/// - [`RequestError::Network`] for DNS, connect, TLS and redirect failures
pub async fn get(
    client: &reqwest::Client,
    url: &str,
    cancel: &CancelSignal,
) -> Result<reqwest::Response, RequestError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RequestError::Cancelled),
        result = client.get(url).send() => result.map_err(|e| {
            if e.is_timeout() {
                RequestError::Timeout
            } else {
                RequestError::Network(e)
            }
        }),
    }
}

/// Reads a response body with a size cap, racing `cancel`.
///
/// # Arguments
///
/// * `response` - response returned by [`get`]
/// * `limit` - maximum body size in bytes, usually [`MAX_BODY_SIZE`]
/// * `cancel` - aborts the read between chunks
///
/// SEC-001: the cap is enforced twice. A `Content-Length` above `limit` is
/// refused before reading; a body without one is counted chunk by chunk.
///
/// EDGE-001: a body shorter than its announced `Content-Length` is an
/// error, never a silently truncated document.
///
/// # Errors
///
/// [`RequestError::ResponseTooLarge`], [`RequestError::IncompleteResponse`],
/// [`RequestError::Network`] (connection dropped mid-body) or
/// [`RequestError::Cancelled`].
pub async fn read_body(
    response: reqwest::Response,
    limit: usize,
    cancel: &CancelSignal,
) -> Result<Vec<u8>, RequestError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RequestError::Cancelled),
        result = read_limited_bytes(response, limit) => result,
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, RequestError> {
    let expected_length = response.content_length();

    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(RequestError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(RequestError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(RequestError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(RequestError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::cancel_pair;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_client_sends_agent_and_charset() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .and(header("user-agent", "hacg-reader-test"))
            .and(header("accept-charset", "utf-8"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let settings = ClientSettings {
            user_agent: "hacg-reader-test".to_string(),
            ..Default::default()
        };
        let client = build_client(&settings).unwrap();
        let response = get(&client, &format!("{}/", mock_server.uri()), &CancelSignal::never())
            .await
            .unwrap();
        assert!(response.status().is_success());
    }

    #[tokio::test]
    async fn test_body_over_limit_is_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(64)))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let never = CancelSignal::never();
        let response = get(&client, &mock_server.uri(), &never).await.unwrap();
        let result = read_body(response, 16, &never).await;
        assert!(matches!(result, Err(RequestError::ResponseTooLarge(16))));
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let (handle, signal) = cancel_pair();
        handle.cancel();

        let client = reqwest::Client::new();
        let result = get(&client, &mock_server.uri(), &signal).await;
        assert!(matches!(result, Err(RequestError::Cancelled)));
    }

    #[test]
    fn test_invalid_user_agent_is_an_error() {
        let settings = ClientSettings {
            user_agent: "bad\nagent".to_string(),
            ..Default::default()
        };
        assert!(build_client(&settings).is_err());
    }
}
