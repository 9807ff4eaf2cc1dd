//! JSON-lines feed - one tracking event per line into a collector.

use contracts::{HubProvider, TrackingEvent};
use dispatcher::Collector;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use crate::error::{CliError, Result};

/// Counters for one feed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub lines_read: usize,
    pub events_collected: usize,
    pub lines_skipped: usize,
}

/// Parse one input line; blank lines yield None
pub fn parse_line(line: &str, number: usize) -> Result<Option<TrackingEvent>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|e| CliError::invalid_event(number, e.to_string()))
}

/// Read `reader` to EOF, collecting every valid event
///
/// Invalid lines are logged and skipped. `stats` is updated as lines arrive
/// so it stays accurate if the feed is cancelled.
pub async fn feed_events<R, P>(
    reader: R,
    collector: &Collector<P>,
    stats: &mut FeedStats,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    P: HubProvider + Send + Sync + 'static,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        stats.lines_read += 1;
        match parse_line(&line, stats.lines_read) {
            Ok(Some(event)) => {
                collector.collect(event);
                stats.events_collected += 1;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Skipping input line");
                stats.lines_skipped += 1;
            }
        }
    }

    debug!(
        lines = stats.lines_read,
        collected = stats.events_collected,
        "Input exhausted"
    );
    Ok(())
}
