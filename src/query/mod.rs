//! In-memory query processor: parameters, filters and the list pipeline.

pub mod filter;
mod params;
pub mod pipeline;
pub use params::*;
pub use pipeline::{ListOutcome, PaginationMeta};
