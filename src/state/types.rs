//! Checkpoint type and its on-disk shape
//!
//! Serialized to JSON and persisted between runs.

use crate::types::{millis_format, truncate_millis, Position, Timestamp, Window};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable record of how far the export has progressed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CheckpointFile", into = "CheckpointFile")]
pub struct Checkpoint {
    /// Pagination token to resume from
    pub position: Position,
    /// Everything created before this instant has been exported
    pub watermark: Timestamp,
    /// Window of a pass that was interrupted before its last page
    pub window: Option<Window>,
}

impl Checkpoint {
    /// Create a checkpoint at the given position and watermark
    pub fn new(position: Position, watermark: Timestamp) -> Self {
        Self {
            position,
            watermark: truncate_millis(watermark),
            window: None,
        }
    }

    /// Checkpoint used on the very first run: watermark is `now - lookback`,
    /// never earlier than the Unix epoch
    pub fn initial(position: Position, now: Timestamp, lookback: chrono::Duration) -> Self {
        let watermark = now
            .checked_sub_signed(lookback)
            .map_or(DateTime::<Utc>::UNIX_EPOCH, |ts| {
                ts.max(DateTime::<Utc>::UNIX_EPOCH)
            });
        Self::new(position, watermark)
    }

    /// Window the next run should query.
    ///
    /// An interrupted pass is resumed over its original window so that
    /// offsets and cursors keep pointing into the same result set.
    pub fn window_for_run(&self, now: Timestamp) -> Window {
        match self.window {
            Some(window) if !self.position.is_initial() => window,
            _ => Window::new(self.watermark, now),
        }
    }

    /// Move the watermark forward, never backward
    pub fn advance_watermark(&mut self, candidate: Timestamp) {
        let candidate = truncate_millis(candidate);
        if candidate > self.watermark {
            self.watermark = candidate;
        }
    }

    /// Record the position reached inside `window`
    pub fn continue_pass(&mut self, position: Position, window: Window) {
        self.position = position;
        self.window = Some(window);
    }

    /// Finish the pass: reset the position and forget the window
    pub fn complete_pass(&mut self, initial: Position) {
        self.position = initial;
        self.window = None;
    }
}

/// On-disk representation
///
/// ```json
/// {"offset": 1000, "last_event_date": "2024-03-01T10:15:31.123Z"}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CheckpointFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cursor: Option<String>,
    #[serde(with = "millis_format")]
    last_event_date: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    window: Option<Window>,
}

impl From<CheckpointFile> for Checkpoint {
    fn from(file: CheckpointFile) -> Self {
        let position = match (file.cursor, file.offset) {
            (Some(cursor), _) => Position::Cursor(Some(cursor)),
            (None, Some(offset)) => Position::Offset(offset),
            (None, None) => Position::Cursor(None),
        };
        Self {
            position,
            watermark: file.last_event_date,
            window: file.window,
        }
    }
}

impl From<Checkpoint> for CheckpointFile {
    fn from(checkpoint: Checkpoint) -> Self {
        let (offset, cursor) = match checkpoint.position {
            Position::Offset(offset) => (Some(offset), None),
            Position::Cursor(cursor) => (None, cursor),
        };
        Self {
            offset,
            cursor,
            last_event_date: checkpoint.watermark,
            window: checkpoint.window,
        }
    }
}
