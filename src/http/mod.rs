//! HTTP module
//!
//! Provides the HTTP client, the page fetchers for both audit APIs and the
//! backoff policy applied when those APIs throttle.
//!
//! # Features
//!
//! - **Throttle classification**: 429 responses surface as `Error::RateLimited`
//! - **Backoff**: verbatim `Retry-After` or a fixed fallback, no growth
//! - **Fetchers**: Jira audit records (offset) and admin events (cursor)

mod client;
mod fetcher;
mod rate_limit;

pub use client::{Credentials, HttpClient, HttpClientConfig};
pub use fetcher::{
    cursor_from_link, AdminEventsFetcher, JiraAuditFetcher, PageFetcher, PageRequest,
    JIRA_AUDIT_PATH,
};
pub use rate_limit::{BackoffPolicy, DEFAULT_INTER_PAGE_DELAY, DEFAULT_RETRY_AFTER};
