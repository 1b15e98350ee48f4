//! Feed-and-page pipeline for a WordPress site whose domain rotates.
//!
//! - [`feed`] finds the current domain and pages through the RSS feed
//! - [`content`] scrapes each article page for magnet links and a preview
//! - [`pipeline`] ties fetch, analysis and accumulation together and reports
//!   progress as [`pipeline::PipelineEvent`] messages

pub mod article;
pub mod cancel;
pub mod config;
pub mod content;
pub mod feed;
pub mod http;
pub mod pipeline;
pub mod util;

pub use article::Article;
pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
