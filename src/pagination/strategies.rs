//! Pagination strategy implementations
//!
//! Each strategy handles a specific pagination pattern.

use super::types::{NextPage, PaginationStyle, Paginator};
use crate::types::{Page, Position};

// ============================================================================
// Offset Pagination
// ============================================================================

/// Offset-based pagination (e.g. the Jira audit records API)
///
/// Uses `offset` and `limit` parameters. A page shorter than `limit` is the
/// last page. This assumes the API only returns short pages at the true end
/// of the result set.
#[derive(Debug, Clone)]
pub struct OffsetPaginator {
    /// Number of records requested per page
    pub page_size: u32,
}

impl OffsetPaginator {
    /// Create a new offset paginator
    pub fn new(page_size: u32) -> Self {
        Self { page_size }
    }
}

impl Paginator for OffsetPaginator {
    fn style(&self) -> PaginationStyle {
        PaginationStyle::Offset
    }

    fn initial_position(&self) -> Position {
        Position::Offset(0)
    }

    fn resume_position(&self, stored: &Position) -> Position {
        match stored {
            Position::Offset(offset) => Position::Offset(*offset),
            Position::Cursor(_) => self.initial_position(),
        }
    }

    fn process_page(&self, position: &Position, page: &Page) -> NextPage {
        // Short page = last page
        if page.len() < self.page_size as usize {
            return NextPage::Done;
        }

        let offset = position.offset().unwrap_or(0);
        NextPage::Continue(Position::Offset(offset + page.len() as u64))
    }
}

// ============================================================================
// Cursor Pagination
// ============================================================================

/// Cursor-based pagination (e.g. the Atlassian organization events API)
///
/// Follows the cursor taken from the response's next link until the API
/// stops sending one.
#[derive(Debug, Clone, Default)]
pub struct CursorPaginator;

impl CursorPaginator {
    /// Create a new cursor paginator
    pub fn new() -> Self {
        Self
    }
}

impl Paginator for CursorPaginator {
    fn style(&self) -> PaginationStyle {
        PaginationStyle::Cursor
    }

    fn initial_position(&self) -> Position {
        Position::Cursor(None)
    }

    fn resume_position(&self, stored: &Position) -> Position {
        match stored {
            Position::Cursor(cursor) => Position::Cursor(cursor.clone()),
            Position::Offset(_) => self.initial_position(),
        }
    }

    fn process_page(&self, _position: &Position, page: &Page) -> NextPage {
        match page.next_cursor.as_deref() {
            Some(cursor) if !cursor.is_empty() => {
                NextPage::Continue(Position::Cursor(Some(cursor.to_string())))
            }
            _ => NextPage::Done,
        }
    }
}
