//! Feed side of the pipeline.
//!
//! - [`domain`] - finds the feed site's current domain on the publisher page
//! - [`fetcher`] - pages through the RSS feed, one page per call
//! - [`parser`] - turns an RSS 2.0 page (with `dc:` and `slash:`) into articles

pub mod domain;
pub mod fetcher;
pub mod parser;

pub use domain::{find_domain, DomainResolver, DEFAULT_PUBLISHER_URL};
pub use fetcher::{FeedFetcher, FeedSource, FetchError};
pub use parser::{parse_feed, parse_pub_date};
