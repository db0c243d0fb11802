//! Execution engine module
//!
//! The checkpointed pagination loop.
//!
//! # Overview
//!
//! The engine module provides:
//! - `Exporter` - drives fetch, advance, emit and persist until the window
//!   is exhausted
//! - `CheckpointAdvancer` - watermark and range filtering per page
//! - `ExportSettings` / `ExportStats` - run configuration and results
//!
//! The loop is strictly sequential: one request in flight, and every wait
//! (throttle backoff, inter-page pause) blocks the run.

mod advancer;
mod types;

pub use advancer::CheckpointAdvancer;
pub use types::{
    ExportSettings, ExportStats, Sleeper, TokioSleeper, DEFAULT_LOOKBACK_DAYS, DEFAULT_PAGE_SIZE,
};

use crate::error::{Error, Result};
use crate::http::{BackoffPolicy, PageFetcher, PageRequest};
use crate::output::RecordEmitter;
use crate::pagination::{NextPage, PaginationStyle, Paginator};
use crate::state::{Checkpoint, CheckpointStore};
use crate::types::{format_millis, Page, RateLimitSignal, Timestamp, Window};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Export driver for one source
pub struct Exporter {
    /// Page source
    fetcher: Arc<dyn PageFetcher>,
    /// Record sink
    emitter: Arc<dyn RecordEmitter>,
    /// Checkpoint persistence
    store: CheckpointStore,
    /// Pagination style of the source
    style: PaginationStyle,
    /// Throttle handling
    backoff: BackoffPolicy,
    /// Watermark and range filtering
    advancer: CheckpointAdvancer,
    /// Waits
    sleeper: Arc<dyn Sleeper>,
    /// Run settings
    settings: ExportSettings,
}

impl Exporter {
    /// Create a new exporter
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        emitter: Arc<dyn RecordEmitter>,
        store: CheckpointStore,
        style: PaginationStyle,
    ) -> Self {
        Self {
            fetcher,
            emitter,
            store,
            style,
            backoff: BackoffPolicy::default(),
            advancer: CheckpointAdvancer::default(),
            sleeper: Arc::new(TokioSleeper),
            settings: ExportSettings::default(),
        }
    }

    /// Set run settings
    #[must_use]
    pub fn with_settings(mut self, settings: ExportSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the backoff policy
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the checkpoint advancer
    #[must_use]
    pub fn with_advancer(mut self, advancer: CheckpointAdvancer) -> Self {
        self.advancer = advancer;
        self
    }

    /// Replace the sleeper
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Get the checkpoint store
    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Get run settings
    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Get the pagination style
    pub fn style(&self) -> PaginationStyle {
        self.style
    }

    /// Run one export pass ending at `now`.
    ///
    /// Returns once the API reports no further pages. Any fetch failure other
    /// than throttling aborts the run; the last persisted checkpoint is then
    /// the resume point.
    pub async fn run(&self, now: Timestamp) -> Result<ExportStats> {
        // Built from the settings so the short-page check and the requested
        // limit always agree
        let paginator = self.style.paginator(self.settings.page_size);
        let checkpoint = self.starting_checkpoint(paginator.as_ref(), now).await;
        let window = checkpoint.window_for_run(now);

        let span = info_span!(
            "export",
            style = %self.style,
            from = %format_millis(&window.from),
            to = %format_millis(&window.to),
            page_size = self.settings.page_size,
        );

        self.run_pass(paginator.as_ref(), checkpoint, window)
            .instrument(span)
            .await
    }

    /// Load the checkpoint and reconcile it with the active settings
    async fn starting_checkpoint(&self, paginator: &dyn Paginator, now: Timestamp) -> Checkpoint {
        let initial = paginator.initial_position();

        if let Some(from) = self.settings.from_override {
            info!(from = %format_millis(&from), "Using explicit start time, ignoring stored checkpoint");
            return Checkpoint::new(initial, from);
        }

        let default = Checkpoint::initial(initial, now, self.settings.lookback);
        let mut checkpoint = self.store.load_or(default).await;

        let resumed = paginator.resume_position(&checkpoint.position);
        if resumed != checkpoint.position {
            warn!(
                stored = %checkpoint.position,
                style = %self.style,
                "Stored position belongs to another pagination style, starting a fresh pass"
            );
            checkpoint.complete_pass(resumed);
        }

        checkpoint
    }

    async fn run_pass(
        &self,
        paginator: &dyn Paginator,
        mut checkpoint: Checkpoint,
        window: Window,
    ) -> Result<ExportStats> {
        let start = Instant::now();
        let mut stats = ExportStats::new();
        let mut position = checkpoint.position.clone();

        if position.is_initial() {
            info!("Getting records from {} to {}", window.from, window.to);
        } else {
            info!(%position, "Resuming interrupted pass");
        }

        loop {
            let request = PageRequest {
                window,
                position: position.clone(),
                page_size: self.settings.page_size,
                filter: self.settings.filter.clone(),
            };

            debug!(%position, "Fetching page");
            let page = self.fetch_page(&request, &mut stats).await?;
            stats.add_page(page.len());

            let in_range =
                self.advancer
                    .advance(&mut checkpoint, &window, &page, position.is_initial());
            stats.records_skipped += page.len() - in_range.len();

            for record in in_range {
                match self.emitter.emit(record).await {
                    Ok(()) => stats.records_emitted += 1,
                    Err(e) => {
                        error!(id = %record.id, error = %e, "Failed to emit record");
                        stats.emit_failures += 1;
                    }
                }
            }

            let next = paginator.process_page(&position, &page);
            match &next {
                NextPage::Continue(next_position) => {
                    checkpoint.continue_pass(next_position.clone(), window);
                }
                NextPage::Done => checkpoint.complete_pass(paginator.initial_position()),
            }
            self.persist(&checkpoint, &mut stats).await;

            match next {
                NextPage::Continue(next_position) => {
                    position = next_position;
                    self.sleeper.sleep(self.backoff.inter_page_delay).await;
                }
                NextPage::Done => break,
            }
        }

        if let Err(e) = self.emitter.flush().await {
            error!(error = %e, "Failed to flush output");
        }

        if stats.records_fetched == 0 {
            info!("No events found");
        }

        stats.set_duration(start.elapsed().as_millis() as u64);
        info!(
            pages = stats.pages_fetched,
            fetched = stats.records_fetched,
            emitted = stats.records_emitted,
            skipped = stats.records_skipped,
            throttles = stats.throttles,
            watermark = %format_millis(&checkpoint.watermark),
            "Export complete"
        );

        Ok(stats)
    }

    /// Fetch one page, waiting out throttled responses
    async fn fetch_page(&self, request: &PageRequest, stats: &mut ExportStats) -> Result<Page> {
        let mut throttles = 0u32;

        loop {
            match self.fetcher.fetch(request).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_throttled() => {
                    throttles += 1;
                    stats.throttles += 1;

                    if !self.backoff.allows_retry(throttles) {
                        error!(throttles, "Rate limited too many times, giving up");
                        return Err(Error::ThrottleLimitExceeded { throttles });
                    }

                    let signal = e.retry_after_seconds().map(|seconds| RateLimitSignal {
                        retry_after_seconds: seconds,
                    });
                    let delay = self.backoff.next_delay(signal);
                    warn!(
                        position = %request.position,
                        attempt = throttles,
                        wait_secs = delay.as_secs(),
                        "Rate limited, retrying the same page"
                    );
                    self.sleeper.sleep(delay).await;
                }
                Err(e) => {
                    error!(position = %request.position, error = %e, "Failed to get records from API");
                    return Err(e);
                }
            }
        }
    }

    /// Persist the checkpoint; a failed write is logged and the run goes on
    async fn persist(&self, checkpoint: &Checkpoint, stats: &mut ExportStats) {
        if self.store.current().await.as_ref() == Some(checkpoint) {
            debug!("Checkpoint unchanged, skipping write");
            return;
        }

        match self.store.save(checkpoint).await {
            Ok(()) => debug!(position = %checkpoint.position, "Checkpoint saved"),
            Err(e) => {
                error!(error = %e, "Error saving checkpoint");
                stats.checkpoint_failures += 1;
            }
        }
    }
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("style", &self.style)
            .field("store", &self.store)
            .field("backoff", &self.backoff)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
