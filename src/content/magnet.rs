use crate::article::MAGNET_PREFIX;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Length of a hex-encoded BitTorrent v1 info-hash.
pub const INFO_HASH_LEN: usize = 40;

static HEX_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9a-fA-F]+").unwrap());

/// Extracts the distinct 40-hex info-hashes in `fragment`, first-seen order.
///
/// A hash must be a whole hex run: any hex digit directly before or after
/// disqualifies it, so 39- and 41-character runs never match.
///
/// # Examples
///
/// ```
/// use hacg_reader::content::extract_info_hashes;
///
/// let hash = "0123456789abcdef0123456789abcdef01234567";
/// assert_eq!(extract_info_hashes(&format!("<p>{hash}</p><p>{hash}</p>")), [hash]);
/// assert!(extract_info_hashes(&format!("f{hash}")).is_empty());
/// ```
pub fn extract_info_hashes(fragment: &str) -> Vec<&str> {
    let mut seen = HashSet::new();
    HEX_RUN
        .find_iter(fragment)
        .map(|m| m.as_str())
        .filter(|run| run.len() == INFO_HASH_LEN)
        .filter(|hash| seen.insert(*hash))
        .collect()
}

/// Like [`extract_info_hashes`], with each hash turned into a magnet URI.
pub fn extract_magnet_links(fragment: &str) -> Vec<String> {
    extract_info_hashes(fragment)
        .into_iter()
        .map(|hash| format!("{MAGNET_PREFIX}{hash}"))
        .collect()
}
