//! Text and input helpers.

mod domain;
mod text;

pub use domain::is_valid_domain;
pub use text::{display_width, sanitize, truncate_to_width};
