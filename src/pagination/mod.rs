//! Pagination module
//!
//! Supports: Offset, Cursor
//!
//! # Overview
//!
//! Both audit APIs page through a time window newest-first. The driver loop is
//! shared; each strategy only decides what the next position is and whether
//! the page just processed was the last one.

mod strategies;
mod types;

pub use strategies::{CursorPaginator, OffsetPaginator};
pub use types::{NextPage, PaginationStyle, Paginator};
