use crate::article::Article;
use crate::util::sanitize;
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use thiserror::Error;

/// Dublin Core, used for `<dc:creator>`.
pub const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";
/// Slash module, used for `<slash:comments>`.
pub const SLASH_NAMESPACE: &str = "http://purl.org/rss/1.0/modules/slash/";

/// Prefixes honoured even when the document never declares them.
const REGISTERED_NAMESPACES: [(&str, &str); 2] = [("dc", DC_NAMESPACE), ("slash", SLASH_NAMESPACE)];

const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %:z";

// `+0000` -> `+00:00`
static NUMERIC_OFFSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([+-])(\d\d)(\d\d)$").unwrap());

#[derive(Debug, Error)]
enum ParseError {
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    #[error("Document ends inside {0} unclosed element(s)")]
    Unclosed(usize),
}

/// Element names the item parser cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Field {
    Title,
    Link,
    Comments,
    PubDate,
    Category,
    Creator,
    CommentCount,
    Other,
}

impl Field {
    fn classify(namespace: Option<&str>, local: &str) -> Self {
        match (namespace, local) {
            (None, "title") => Field::Title,
            (None, "link") => Field::Link,
            (None, "comments") => Field::Comments,
            (None, "pubDate") => Field::PubDate,
            (None, "category") => Field::Category,
            (Some(DC_NAMESPACE), "creator") => Field::Creator,
            (Some(SLASH_NAMESPACE), "comments") => Field::CommentCount,
            _ => Field::Other,
        }
    }
}

/// Maps a resolved element to its namespace URI, falling back to the
/// registered prefixes for undeclared ones. `Err` means "foreign element".
fn namespace_of(resolved: &ResolveResult<'_>) -> Result<Option<&'static str>, ()> {
    match resolved {
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Bound(ns) => REGISTERED_NAMESPACES
            .iter()
            .find(|(_, uri)| uri.as_bytes() == ns.as_ref())
            .map(|(_, uri)| Some(*uri))
            .ok_or(()),
        ResolveResult::Unknown(prefix) => REGISTERED_NAMESPACES
            .iter()
            .find(|(p, _)| p.as_bytes() == prefix.as_slice())
            .map(|(_, uri)| Some(*uri))
            .ok_or(()),
    }
}

/// Accumulates one `<item>` while its children stream past.
///
/// Single-valued fields keep their first occurrence; categories collect
/// every occurrence.
#[derive(Default)]
struct ItemBuilder {
    article: Article,
    pub_date: String,
    comment_count: String,
    seen: HashSet<Field>,
}

impl ItemBuilder {
    fn set(&mut self, field: Field, text: String) {
        if field == Field::Other {
            return;
        }
        if field == Field::Category {
            self.article.categories.push(text);
            return;
        }
        if !self.seen.insert(field) {
            return;
        }

        let article = &mut self.article;
        match field {
            Field::Title => article.title = text,
            Field::Link => article.link = text,
            Field::Comments => article.comment_link = text,
            Field::Creator => article.creator = text,
            Field::PubDate => self.pub_date = text,
            Field::CommentCount => self.comment_count = text,
            Field::Category | Field::Other => {}
        }
    }

    fn build(self) -> Article {
        let mut article = self.article;
        article.pub_date = parse_pub_date(&self.pub_date);
        article.comment_count = self.comment_count.trim().parse().unwrap_or(0);
        article
    }
}

/// Parses one feed page into articles.
///
/// Items are the `<item>` children of `<channel>` directly under the root.
/// Every field defaults independently when absent: text fields to `""`,
/// `comment_count` to 0 and `pub_date` to `None`. Feed text is passed
/// through [`sanitize`](crate::util::sanitize).
///
/// EDGE-002: the document is all-or-nothing. Mismatched tags, bad escapes
/// or a document cut off before its closing tags yield no articles at all,
/// even if some items were complete.
///
/// EDGE-003: `<title>`, `<link>`, `<comments>`, `<dc:creator>`, `<pubDate>`
/// and `<slash:comments>` keep their first occurrence within an item.
///
/// # Examples
///
/// ```
/// use hacg_reader::feed::parse_feed;
///
/// let xml = b"<rss><channel><item><title>Hello</title></item></channel></rss>";
/// let articles = parse_feed(xml);
/// assert_eq!(articles.len(), 1);
/// assert_eq!(articles[0].title, "Hello");
///
/// assert!(parse_feed(b"<rss><channel><item><title>Cut").is_empty());
/// ```
pub fn parse_feed(bytes: &[u8]) -> Vec<Article> {
    match parse_items(bytes) {
        Ok(articles) => articles,
        Err(e) => {
            tracing::debug!(error = %e, "Malformed feed document, treating as empty");
            Vec::new()
        }
    }
}

fn parse_items(bytes: &[u8]) -> Result<Vec<Article>, ParseError> {
    let mut reader = NsReader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut articles = Vec::new();
    let mut buf = Vec::new();

    // Depth 1 is the root, 2 `<channel>`, 3 `<item>`, 4 an item field.
    let mut depth = 0usize;
    let mut in_channel = false;
    let mut item: Option<ItemBuilder> = None;
    let mut field = Field::Other;
    let mut text = String::new();

    loop {
        let (resolved, event) = reader.read_resolved_event_into(&mut buf)?;
        match event {
            Event::Start(e) => {
                depth += 1;
                let namespace = namespace_of(&resolved);
                let local = e.local_name();
                let local = String::from_utf8_lossy(local.as_ref());
                match depth {
                    2 => in_channel = namespace == Ok(None) && local == "channel",
                    3 if in_channel && namespace == Ok(None) && local == "item" => {
                        item = Some(ItemBuilder::default());
                    }
                    4 if item.is_some() => {
                        field = namespace
                            .map(|ns| Field::classify(ns, &local))
                            .unwrap_or(Field::Other);
                        text.clear();
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                let namespace = namespace_of(&resolved);
                let local = e.local_name();
                let local = String::from_utf8_lossy(local.as_ref());
                match depth + 1 {
                    3 if in_channel && namespace == Ok(None) && local == "item" => {
                        articles.push(Article::default());
                    }
                    4 => {
                        if let Some(builder) = item.as_mut() {
                            let field = namespace
                                .map(|ns| Field::classify(ns, &local))
                                .unwrap_or(Field::Other);
                            builder.set(field, String::new());
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(e) => {
                if depth >= 4 && item.is_some() {
                    text.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if depth >= 4 && item.is_some() {
                    text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(_) => {
                match depth {
                    2 => in_channel = false,
                    3 => {
                        if let Some(builder) = item.take() {
                            articles.push(builder.build());
                        }
                    }
                    4 => {
                        if let Some(builder) = item.as_mut() {
                            builder.set(field, sanitize(&text).into_owned());
                        }
                        field = Field::Other;
                    }
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof if depth > 0 => return Err(ParseError::Unclosed(depth)),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(articles)
}

/// Parses an RSS `pubDate` such as `Sat, 01 Jan 2022 00:00:00 +0000`.
///
/// The four-digit offset is rewritten to `+00:00` before strict parsing.
/// Anything that does not fit the pattern yields `None`.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use hacg_reader::feed::parse_pub_date;
///
/// assert_eq!(
///     parse_pub_date("Sun, 02 Jan 2022 08:00:00 +0800"),
///     Some(Utc.with_ymd_and_hms(2022, 1, 2, 0, 0, 0).unwrap())
/// );
/// assert_eq!(parse_pub_date("yesterday"), None);
/// ```
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let normalized = NUMERIC_OFFSET.replace(raw.trim(), "$1$2:$3");
    match DateTime::parse_from_str(&normalized, PUB_DATE_FORMAT) {
        Ok(date) => Some(date.with_timezone(&Utc)),
        Err(e) => {
            if !raw.is_empty() {
                tracing::debug!(raw = %raw, error = %e, "Unparseable pubDate");
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    const TWO_ITEMS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"
    xmlns:dc="http://purl.org/dc/elements/1.1/"
    xmlns:slash="http://purl.org/rss/1.0/modules/slash/">
<channel>
    <title>Shrine</title>
    <item>
        <title>Item 1</title>
        <link>https://example.com/wp/00001.html</link>
        <comments>https://example.com/wp/00001.html#respond</comments>
        <dc:creator><![CDATA[creator 1]]></dc:creator>
        <pubDate>Sat, 01 Jan 2022 00:00:00 +0000</pubDate>
        <category><![CDATA[Cat 1]]></category>
        <category><![CDATA[Cat 2]]></category>
        <category><![CDATA[Cat 3]]></category>
        <slash:comments>0</slash:comments>
    </item>
    <item>
        <title>Item 2</title>
        <link>https://example.com/wp/00002.html</link>
        <comments>https://example.com/wp/00002.html#respond</comments>
        <dc:creator>creator 2</dc:creator>
        <pubDate>Sun, 02 Jan 2022 16:00:00 +0800</pubDate>
        <category>Cat 4</category>
        <slash:comments>50</slash:comments>
    </item>
</channel>
</rss>"#;

    #[test]
    fn test_parse_two_items() {
        let articles = parse_feed(TWO_ITEMS.as_bytes());
        assert_eq!(articles.len(), 2);

        assert_eq!(
            articles[0],
            Article {
                title: "Item 1".into(),
                link: "https://example.com/wp/00001.html".into(),
                comment_link: "https://example.com/wp/00001.html#respond".into(),
                creator: "creator 1".into(),
                pub_date: Some(Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap()),
                categories: vec!["Cat 1".into(), "Cat 2".into(), "Cat 3".into()],
                comment_count: 0,
                ..Default::default()
            }
        );
        assert_eq!(articles[1].creator, "creator 2");
        assert_eq!(
            articles[1].pub_date,
            Some(Utc.with_ymd_and_hms(2022, 1, 2, 8, 0, 0).unwrap())
        );
        assert_eq!(articles[1].categories, vec!["Cat 4".to_string()]);
        assert_eq!(articles[1].comment_count, 50);
        assert!(articles[1].magnet_links.is_empty());
    }

    #[test]
    fn test_undeclared_prefixes_use_registered_namespaces() {
        let xml = r#"<rss><channel><item>
            <dc:creator>someone</dc:creator>
            <slash:comments>7</slash:comments>
        </item></channel></rss>"#;
        let articles = parse_feed(xml.as_bytes());
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].creator, "someone");
        assert_eq!(articles[0].comment_count, 7);
    }

    #[test]
    fn test_foreign_namespace_is_ignored() {
        let xml = r#"<rss xmlns:x="urn:other"><channel><item>
            <x:creator>nobody</x:creator>
            <x:comments>3</x:comments>
            <comments>https://example.com/c</comments>
        </item></channel></rss>"#;
        let articles = parse_feed(xml.as_bytes());
        assert_eq!(articles[0].creator, "");
        assert_eq!(articles[0].comment_count, 0);
        assert_eq!(articles[0].comment_link, "https://example.com/c");
    }

    #[test]
    fn test_empty_documents_yield_nothing() {
        assert!(parse_feed(b"").is_empty());
        assert!(parse_feed(br#"<?xml version="1.0" encoding="UTF-8"?><rss/>"#).is_empty());
        assert!(parse_feed(b"<rss><channel></channel></rss>").is_empty());
    }

    #[test]
    fn test_empty_item_yields_default_article() {
        let articles = parse_feed(b"<rss><channel><item/></channel></rss>");
        assert_eq!(articles, vec![Article::default()]);

        let articles = parse_feed(b"<rss><channel><item></item></channel></rss>");
        assert_eq!(articles, vec![Article::default()]);
    }

    #[test]
    fn test_malformed_xml_yields_nothing() {
        let xml = "<rss><channel><item><title>Half</title></item></channel></oops>";
        assert!(parse_feed(xml.as_bytes()).is_empty());
    }

    #[test]
    fn test_items_outside_channel_are_ignored() {
        let xml = "<rss><item><title>Stray</title></item><channel/></rss>";
        assert!(parse_feed(xml.as_bytes()).is_empty());
    }

    #[test]
    fn test_bad_comment_count_defaults_to_zero() {
        let xml = "<rss><channel><item><slash:comments>many</slash:comments></item></channel></rss>";
        assert_eq!(parse_feed(xml.as_bytes())[0].comment_count, 0);
    }

    #[test]
    fn test_escaped_text_is_unescaped() {
        let xml = "<rss><channel><item><title>Tom &amp; Jerry</title></item></channel></rss>";
        assert_eq!(parse_feed(xml.as_bytes())[0].title, "Tom & Jerry");
    }

    #[test]
    fn test_parse_pub_date_utc_midnight() {
        assert_eq!(
            parse_pub_date("Sat, 01 Jan 2022 00:00:00 +0000"),
            Some(Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_pub_date_negative_offset() {
        assert_eq!(
            parse_pub_date("Fri, 31 Dec 2021 19:30:00 -0430"),
            Some(Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_pub_date_rejects_other_formats() {
        assert_eq!(parse_pub_date(""), None);
        assert_eq!(parse_pub_date("2022-01-01T00:00:00Z"), None);
        assert_eq!(parse_pub_date("Sat, 01 Jan 2022 00:00:00 GMT"), None);
    }

    #[test]
    fn test_truncated_document_yields_nothing() {
        let xml = "<rss><channel><item><title>A</title><link>https://x/1</link></item><item><title>B";
        assert!(parse_feed(xml.as_bytes()).is_empty());

        let xml = "<rss><channel><item><title>A</title></item></channel>";
        assert!(parse_feed(xml.as_bytes()).is_empty());
    }

    #[test]
    fn test_first_occurrence_of_single_fields_wins() {
        let xml = "<rss><channel><item>
            <title>First</title><title>Second</title>
            <link>https://example.com/1</link><link>https://example.com/2</link>
            <dc:creator>alice</dc:creator><dc:creator>bob</dc:creator>
            <pubDate>Sat, 01 Jan 2022 00:00:00 +0000</pubDate>
            <pubDate>Sun, 02 Jan 2022 00:00:00 +0000</pubDate>
            <category>One</category><category>Two</category>
        </item></channel></rss>";
        let article = &parse_feed(xml.as_bytes())[0];
        assert_eq!(article.title, "First");
        assert_eq!(article.link, "https://example.com/1");
        assert_eq!(article.creator, "alice");
        assert_eq!(
            article.pub_date,
            Some(Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(article.categories, ["One", "Two"]);
    }
}
