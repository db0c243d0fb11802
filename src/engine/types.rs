//! Engine types
//!
//! Run settings, statistics and the sleep capability used by the driver.

use crate::types::Timestamp;
use async_trait::async_trait;
use std::time::Duration;

/// Default number of records requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// Default lookback for the very first run
pub const DEFAULT_LOOKBACK_DAYS: i64 = 365;

/// Settings for one export run
#[derive(Debug, Clone)]
pub struct ExportSettings {
    /// Records requested per page
    pub page_size: u32,
    /// Free-text filter passed to the API
    pub filter: String,
    /// How far back the first run reaches
    pub lookback: chrono::Duration,
    /// Explicit lower bound; replaces the stored watermark
    pub from_override: Option<Timestamp>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            filter: String::new(),
            lookback: chrono::Duration::days(DEFAULT_LOOKBACK_DAYS),
            from_override: None,
        }
    }
}

impl ExportSettings {
    /// Create settings with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the filter query
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Set the first-run lookback
    #[must_use]
    pub fn with_lookback(mut self, lookback: chrono::Duration) -> Self {
        self.lookback = lookback;
        self
    }

    /// Force the lower bound of the window
    #[must_use]
    pub fn with_from(mut self, from: Timestamp) -> Self {
        self.from_override = Some(from);
        self
    }
}

/// Statistics from an export run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportStats {
    /// Pages fetched successfully
    pub pages_fetched: usize,
    /// Records received from the API
    pub records_fetched: usize,
    /// Records handed to the emitter
    pub records_emitted: usize,
    /// Records dropped as outside the window
    pub records_skipped: usize,
    /// Throttled responses waited out
    pub throttles: usize,
    /// Records the emitter rejected
    pub emit_failures: usize,
    /// Checkpoint writes that failed
    pub checkpoint_failures: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl ExportStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page with `records` records
    pub fn add_page(&mut self, records: usize) {
        self.pages_fetched += 1;
        self.records_fetched += records;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}

/// Capability: suspend the run for a while.
///
/// Backoff waits and inter-page pauses go through this so they can be
/// observed in tests.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Wait for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
