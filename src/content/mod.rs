//! Article page scraping.
//!
//! - [`analyzer`] - fetches an article page and fills in magnet links and preview
//! - [`magnet`] - 40-hex info-hash extraction
//! - [`preview`] - plain-text rendering of entry-content markup

pub mod analyzer;
pub mod magnet;
pub mod preview;

pub use analyzer::{analyze_html, AnalyzeError, ArticleAnalyzer, PageAnalyzer, PageContent};
pub use magnet::{extract_info_hashes, extract_magnet_links};
pub use preview::render_preview;
