//! Rate-limit backoff policy
//!
//! Decides how long to wait after a throttled response and how long to pause
//! between successful pages.

use crate::types::RateLimitSignal;
use std::time::Duration;

/// Wait used when a throttled response carries no `Retry-After`
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(50);

/// Pause between consecutive successful page fetches
pub const DEFAULT_INTER_PAGE_DELAY: Duration = Duration::from_millis(200);

/// Backoff policy for throttled requests.
///
/// Every throttle is evaluated on its own: there is no growth across
/// repeated throttles. Retrying is unbounded unless `max_throttles` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay when the response has no retry-after value
    pub fallback: Duration,
    /// Upper bound applied to any single throttle delay
    pub max_delay: Option<Duration>,
    /// Abort after this many consecutive throttles on the same request
    pub max_throttles: Option<u32>,
    /// Pause between successful consecutive pages
    pub inter_page_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            fallback: DEFAULT_RETRY_AFTER,
            max_delay: None,
            max_throttles: None,
            inter_page_delay: DEFAULT_INTER_PAGE_DELAY,
        }
    }
}

impl BackoffPolicy {
    /// Create a policy with the default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback delay
    #[must_use]
    pub fn fallback(mut self, delay: Duration) -> Self {
        self.fallback = delay;
        self
    }

    /// Cap each throttle delay
    #[must_use]
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Give up after `throttles` consecutive throttles
    #[must_use]
    pub fn max_throttles(mut self, throttles: u32) -> Self {
        self.max_throttles = Some(throttles);
        self
    }

    /// Set the inter-page delay
    #[must_use]
    pub fn inter_page_delay(mut self, delay: Duration) -> Self {
        self.inter_page_delay = delay;
        self
    }

    /// Delay before retrying a throttled request.
    ///
    /// An explicit retry-after is used verbatim, otherwise the fallback.
    pub fn next_delay(&self, signal: Option<RateLimitSignal>) -> Duration {
        let delay = signal.map_or(self.fallback, |s| {
            Duration::from_secs(s.retry_after_seconds)
        });

        match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        }
    }

    /// Whether another retry is allowed after `throttles` consecutive throttles
    pub fn allows_retry(&self, throttles: u32) -> bool {
        self.max_throttles.map_or(true, |max| throttles <= max)
    }
}
