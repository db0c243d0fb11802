//! Pagination types and traits
//!
//! Defines the core pagination abstractions used by both strategies.

use super::strategies::{CursorPaginator, OffsetPaginator};
use crate::types::{Page, Position};
use serde::{Deserialize, Serialize};

/// Result of processing a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// More pages available from this position
    Continue(Position),
    /// The page just processed was the last one of the pass
    Done,
}

impl NextPage {
    /// Check if this is a done result
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Check if this is a continue result
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue(_))
    }
}

/// Pagination style of the remote API.
///
/// A configuration choice, never detected from responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationStyle {
    /// Numeric offset; a short page ends the pass
    #[default]
    Offset,
    /// Opaque cursor from a next link; a missing link ends the pass
    Cursor,
}

impl PaginationStyle {
    /// Build the strategy for this style
    pub fn paginator(self, page_size: u32) -> Box<dyn Paginator> {
        match self {
            PaginationStyle::Offset => Box::new(OffsetPaginator::new(page_size)),
            PaginationStyle::Cursor => Box::new(CursorPaginator::new()),
        }
    }
}

impl std::fmt::Display for PaginationStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaginationStyle::Offset => write!(f, "offset"),
            PaginationStyle::Cursor => write!(f, "cursor"),
        }
    }
}

/// Core trait for pagination strategies
pub trait Paginator: Send + Sync {
    /// Style implemented by this strategy
    fn style(&self) -> PaginationStyle;

    /// Position of the first page of a fresh pass
    fn initial_position(&self) -> Position;

    /// Position to resume from, given what the checkpoint holds.
    ///
    /// A position written by the other style cannot be continued and is
    /// replaced by the initial position.
    fn resume_position(&self, stored: &Position) -> Position;

    /// Process a fetched page and determine if there's a next page
    fn process_page(&self, position: &Position, page: &Page) -> NextPage;
}
