//! Checkpoint advancer
//!
//! Moves the watermark forward from the first page of a pass and filters
//! out records that fall outside the run's window.

use crate::state::Checkpoint;
use crate::types::{Page, Record, Window};
use tracing::{debug, warn};

/// Computes checkpoint progress from fetched pages
#[derive(Debug, Clone)]
pub struct CheckpointAdvancer {
    /// Added to the newest record's timestamp so the next window excludes it
    step: chrono::Duration,
}

impl Default for CheckpointAdvancer {
    fn default() -> Self {
        Self {
            step: chrono::Duration::milliseconds(1),
        }
    }
}

impl CheckpointAdvancer {
    /// Create an advancer stepping one millisecond past the newest record
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an advancer with a custom step
    pub fn with_step(step: chrono::Duration) -> Self {
        Self { step }
    }

    /// Apply one page to `checkpoint` and return the records to emit.
    ///
    /// Pages arrive newest-first, so when `starts_result_set` is set the first
    /// record is the newest one in the window and the watermark moves just
    /// past it. Out-of-range records are dropped here but the caller still
    /// counts them toward the offset.
    pub fn advance<'p>(
        &self,
        checkpoint: &mut Checkpoint,
        window: &Window,
        page: &'p Page,
        starts_result_set: bool,
    ) -> Vec<&'p Record> {
        if starts_result_set {
            if let Some(newest) = page.records.first() {
                match newest.created_at() {
                    Some(created) => {
                        checkpoint.advance_watermark(created + self.step);
                        debug!(
                            id = %newest.id,
                            watermark = %checkpoint.watermark,
                            "Advanced watermark past newest record"
                        );
                    }
                    None => warn!(
                        id = %newest.id,
                        created = %newest.created,
                        "Cannot parse creation time, watermark left unchanged"
                    ),
                }
            }
        }

        page.records
            .iter()
            .filter(|record| match record.created_at() {
                Some(created) if !window.admits(&created) => {
                    debug!(id = %record.id, created = %record.created, "Record created date is out of range");
                    false
                }
                Some(_) => true,
                None => {
                    warn!(id = %record.id, created = %record.created, "Cannot parse creation time, emitting anyway");
                    true
                }
            })
            .collect()
    }
}
