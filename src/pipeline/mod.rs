//! Fetch, analyze and accumulate.
//!
//! - [`orchestrator`] - one pass over the feed, with duplicate suppression
//! - [`controller`] - background execution with cancel-then-rejoin
//! - [`events`] - messages emitted along the way

pub mod controller;
pub mod events;
pub mod orchestrator;

pub use controller::{ControllerError, FetchController};
pub use events::PipelineEvent;
pub use orchestrator::{PassOutcome, Pipeline};
