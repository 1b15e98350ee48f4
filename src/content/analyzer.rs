use crate::article::Article;
use crate::cancel::CancelSignal;
use crate::content::magnet::extract_magnet_links;
use crate::content::preview::render_preview;
use crate::http::{self, RequestError, MAX_BODY_SIZE};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use thiserror::Error;

/// Containers holding the human-readable article body.
static ENTRY_CONTENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.entry-content").unwrap());

#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// The caller handed over an article with no usable page URL.
    #[error("Invalid article link: {0:?}")]
    InvalidArticle(String),
    #[error("Analysis cancelled")]
    Cancelled,
    #[error(transparent)]
    Request(RequestError),
}

impl AnalyzeError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AnalyzeError::Cancelled)
    }
}

impl From<RequestError> for AnalyzeError {
    fn from(e: RequestError) -> Self {
        match e {
            RequestError::Cancelled => AnalyzeError::Cancelled,
            other => AnalyzeError::Request(other),
        }
    }
}

/// Fills in `magnet_links` and `preview` for a feed article.
#[async_trait]
pub trait ArticleAnalyzer: Send + Sync {
    async fn analyze(&self, article: Article, cancel: &CancelSignal)
        -> Result<Article, AnalyzeError>;
}

/// What the entry-content blocks of one page yield.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PageContent {
    pub magnet_links: Vec<String>,
    pub preview: String,
}

/// Scrapes `<div class="entry-content">` blocks of an article page.
pub struct PageAnalyzer {
    client: reqwest::Client,
}

impl PageAnalyzer {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ArticleAnalyzer for PageAnalyzer {
    /// A non-success status returns the article untouched. Only a missing
    /// or non-http(s) link is an error.
    async fn analyze(
        &self,
        mut article: Article,
        cancel: &CancelSignal,
    ) -> Result<Article, AnalyzeError> {
        match url::Url::parse(&article.link) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => return Err(AnalyzeError::InvalidArticle(article.link)),
        }

        let response = http::get(&self.client, &article.link, cancel).await?;
        if !response.status().is_success() {
            tracing::debug!(
                url = %article.link,
                status = %response.status(),
                "Article page unavailable, leaving it unanalyzed"
            );
            return Ok(article);
        }

        let bytes = http::read_body(response, MAX_BODY_SIZE, cancel).await?;
        let content = analyze_html(&String::from_utf8_lossy(&bytes));
        tracing::debug!(
            url = %article.link,
            magnets = content.magnet_links.len(),
            "Analyzed article page"
        );

        article.magnet_links = content.magnet_links;
        article.preview = content.preview;
        Ok(article)
    }
}

/// Extracts magnet links and a preview from every entry-content block.
///
/// Hashes are deduplicated per block, then concatenated in document order.
/// A page without entry-content blocks yields nothing.
///
/// # Arguments
///
/// * `html` - the full article page
///
/// The preview is the concatenation of each block's
/// [`render_preview`](crate::content::render_preview), trimmed once at the
/// ends.
///
/// # Examples
///
/// ```
/// use hacg_reader::content::analyze_html;
///
/// let hash = "0123456789abcdef0123456789abcdef01234567";
/// let page = format!(r#"<div class="entry-content"><p>{hash}</p><p>{hash}</p></div>"#);
/// let content = analyze_html(&page);
/// assert_eq!(content.magnet_links, [format!("magnet:?xt=urn:btih:{hash}")]);
/// assert_eq!(content.preview, format!("{hash}\n\n{hash}"));
/// ```
pub fn analyze_html(html: &str) -> PageContent {
    let document = Html::parse_document(html);
    let blocks: Vec<_> = document.select(&ENTRY_CONTENT).collect();
    if blocks.is_empty() {
        return PageContent::default();
    }

    let magnet_links = blocks
        .iter()
        .flat_map(|block| extract_magnet_links(&block.inner_html()))
        .collect();

    let preview = blocks
        .iter()
        .map(|block| render_preview(*block))
        .collect::<String>()
        .trim()
        .to_string();

    PageContent {
        magnet_links,
        preview,
    }
}
