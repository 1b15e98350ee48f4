use regex::Regex;
use std::sync::LazyLock;

// Label, dot, then a TLD or a second-level label plus TLD. Punycode allowed.
static DOMAIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(xn--)?[a-z0-9][a-z0-9_-]{0,61}[a-z0-9]?\.(xn--)?([a-z0-9-]{1,61}|[a-z0-9-]{1,30}\.[a-z]{2,})$",
    )
    .unwrap()
});

/// Checks a hand-entered domain: lowercase host, no scheme, no path.
///
/// Accepts a label and a TLD (`example.com`) or a label and a two-part
/// suffix (`example.co.uk`), each optionally punycode (`xn--`).
///
/// # Examples
///
/// ```
/// use hacg_reader::util::is_valid_domain;
///
/// assert!(is_valid_domain("example.com"));
/// assert!(!is_valid_domain("https://example.com"));
/// ```
pub fn is_valid_domain(domain: &str) -> bool {
    !domain.starts_with('-') && DOMAIN_PATTERN.is_match(domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_hosts() {
        assert!(is_valid_domain("example.com"));
        assert!(is_valid_domain("my-site.org"));
        assert!(is_valid_domain("example.co.uk"));
        assert!(is_valid_domain("xn--fiqs8s.com"));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(!is_valid_domain(""));
        assert!(!is_valid_domain("localhost"));
        assert!(!is_valid_domain("www.example.co.uk"));
        assert!(!is_valid_domain("-bad.com"));
        assert!(!is_valid_domain("https://example.com"));
        assert!(!is_valid_domain("example.com/wp"));
        assert!(!is_valid_domain("Example.com"));
    }
}
