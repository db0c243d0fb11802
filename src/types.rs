//! Common types used throughout the exporter
//!
//! Records, windows, pagination positions and the timestamp helpers that keep
//! every persisted instant at millisecond precision.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// Point in time used for windows and watermarks
pub type Timestamp = DateTime<Utc>;

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Layout of the `created` field returned by the Jira audit API
/// (e.g. `2024-03-01T10:15:30.123+0000`).
const JIRA_CREATED_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

// ============================================================================
// Timestamp Helpers
// ============================================================================

/// Drop everything below the millisecond
pub fn truncate_millis(ts: Timestamp) -> Timestamp {
    ts.trunc_subsecs(3)
}

/// Current wall-clock time at millisecond precision
pub fn now_millis() -> Timestamp {
    truncate_millis(Utc::now())
}

/// Format as ISO-8601 with exactly three fractional digits and a `Z` suffix
pub fn format_millis(ts: &Timestamp) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Parse a timestamp as emitted by either supported API.
///
/// Accepts RFC 3339 as well as the offset-without-colon layout Jira uses.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, JIRA_CREATED_LAYOUT))
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Serde adapter writing timestamps with millisecond precision.
///
/// Reading accepts any RFC 3339 string so older state files still load.
pub mod millis_format {
    use super::{format_millis, truncate_millis, Timestamp};
    use chrono::DateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Write `ts` as `YYYY-MM-DDTHH:MM:SS.mmmZ`
    pub fn serialize<S: Serializer>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_millis(ts))
    }

    /// Read any RFC 3339 timestamp
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| truncate_millis(ts.with_timezone(&chrono::Utc)))
            .map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Window
// ============================================================================

/// Inclusive time range queried in one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    /// Lower bound (inclusive)
    #[serde(with = "millis_format")]
    pub from: Timestamp,
    /// Upper bound
    #[serde(with = "millis_format")]
    pub to: Timestamp,
}

impl Window {
    /// Create a window, truncating both bounds to milliseconds
    pub fn new(from: Timestamp, to: Timestamp) -> Self {
        Self {
            from: truncate_millis(from),
            to: truncate_millis(to),
        }
    }

    /// Whether a record created at `created` belongs to this window.
    ///
    /// Only records older than both bounds are rejected; the API filter is
    /// imprecise at the lower edge.
    pub fn admits(&self, created: &Timestamp) -> bool {
        !(*created < self.to && *created < self.from)
    }
}

// ============================================================================
// Position
// ============================================================================

/// Pagination token carried between pages and across runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    /// Number of records already consumed in the current pass
    Offset(u64),
    /// Opaque continuation issued by the API; `None` means first page
    Cursor(Option<String>),
}

impl Position {
    /// Whether this position points at the start of a result set
    pub fn is_initial(&self) -> bool {
        match self {
            Position::Offset(offset) => *offset == 0,
            Position::Cursor(cursor) => cursor.is_none(),
        }
    }

    /// Offset value, if this is an offset position
    pub fn offset(&self) -> Option<u64> {
        match self {
            Position::Offset(offset) => Some(*offset),
            Position::Cursor(_) => None,
        }
    }

    /// Cursor value, if this is a cursor position past the first page
    pub fn cursor(&self) -> Option<&str> {
        match self {
            Position::Cursor(cursor) => cursor.as_deref(),
            Position::Offset(_) => None,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Position::Offset(offset) => write!(f, "offset {offset}"),
            Position::Cursor(Some(cursor)) => write!(f, "cursor {cursor}"),
            Position::Cursor(None) => write!(f, "first page"),
        }
    }
}

// ============================================================================
// Record / Page
// ============================================================================

/// A single audit event as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Event identifier
    pub id: String,
    /// Raw creation timestamp as sent by the API
    pub created: String,
    /// Remaining event attributes
    #[serde(default)]
    pub attributes: JsonObject,
}

impl Record {
    /// Create a record without extra attributes
    pub fn new(id: impl Into<String>, created: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created: created.into(),
            attributes: JsonObject::new(),
        }
    }

    /// Attach attributes
    #[must_use]
    pub fn with_attributes(mut self, attributes: JsonObject) -> Self {
        self.attributes = attributes;
        self
    }

    /// Parsed creation time, `None` if the API sent something unparseable
    pub fn created_at(&self) -> Option<Timestamp> {
        parse_timestamp(&self.created)
    }
}

/// One page of results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Records in fetch order (newest first for the supported APIs)
    pub records: Vec<Record>,
    /// Continuation cursor, for cursor-style APIs
    pub next_cursor: Option<String>,
}

impl Page {
    /// Create a page without a continuation
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            next_cursor: None,
        }
    }

    /// Attach a continuation cursor
    #[must_use]
    pub fn with_next_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.next_cursor = Some(cursor.into());
        self
    }

    /// Number of records on this page
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the page carries no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Throttling information derived from a rate-limited response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSignal {
    /// Value of the `Retry-After` header, in seconds
    pub retry_after_seconds: u64,
}

// ============================================================================
// Output Format
// ============================================================================

/// How exported records are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// One structured log event per record
    #[default]
    Log,
    /// One JSON object per line on stdout
    JsonLines,
}
