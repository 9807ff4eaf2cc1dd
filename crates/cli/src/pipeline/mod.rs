//! Event ingestion and run reporting.

mod feed;
mod stats;

pub use feed::{feed_events, parse_line, FeedStats};
pub use stats::RunStats;
