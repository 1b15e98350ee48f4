use chrono::{DateTime, Utc};
use serde::Serialize;

/// Prefix turning a 40-hex info-hash into a magnet URI.
pub const MAGNET_PREFIX: &str = "magnet:?xt=urn:btih:";

/// One feed entry, later enriched with what the article page contains.
///
/// Feed-derived fields are set once by the feed parser. `preview` and
/// `magnet_links` stay empty until the page analyzer has run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Article {
    pub title: String,
    /// Canonical page URL, also the deduplication key.
    pub link: String,
    pub comment_link: String,
    /// Plain-text rendering of the article body.
    pub preview: String,
    /// Full `magnet:?xt=urn:btih:<hash>` URIs in document order.
    pub magnet_links: Vec<String>,
    pub creator: String,
    /// `None` when the feed date was missing or unparseable.
    pub pub_date: Option<DateTime<Utc>>,
    pub categories: Vec<String>,
    pub comment_count: i32,
}

impl Article {
    /// Whether two articles point at the same page.
    pub fn same_page(&self, other: &Article) -> bool {
        self.link == other.link
    }

    /// Short label for list views, e.g. "2 magnet links".
    pub fn magnet_summary(&self) -> String {
        match self.magnet_links.len() {
            1 => "1 magnet link".to_string(),
            n => format!("{n} magnet links"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_article_is_empty() {
        let article = Article::default();
        assert!(article.title.is_empty());
        assert!(article.magnet_links.is_empty());
        assert!(article.pub_date.is_none());
        assert_eq!(article.comment_count, 0);
    }

    #[test]
    fn test_magnet_summary() {
        let mut article = Article::default();
        assert_eq!(article.magnet_summary(), "0 magnet links");
        article.magnet_links.push(format!("{MAGNET_PREFIX}{}", "a".repeat(40)));
        assert_eq!(article.magnet_summary(), "1 magnet link");
        article.magnet_links.push(format!("{MAGNET_PREFIX}{}", "b".repeat(40)));
        assert_eq!(article.magnet_summary(), "2 magnet links");
    }

    #[test]
    fn test_same_page_compares_links_only() {
        let a = Article {
            title: "A".into(),
            link: "https://example.com/1.html".into(),
            ..Default::default()
        };
        let b = Article {
            title: "B".into(),
            link: "https://example.com/1.html".into(),
            ..Default::default()
        };
        assert!(a.same_page(&b));
    }
}
