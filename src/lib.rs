// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # audit-export
//!
//! Incremental, checkpointed exporter for paginated audit APIs.
//!
//! Each run fetches every event created since the previous run, hands each
//! one to a record emitter and persists a checkpoint after every page, so an
//! interrupted run picks up where it stopped.
//!
//! ## Features
//!
//! - **Two pagination styles**: numeric offset (Jira audit records) and
//!   opaque cursor (organization admin events)
//! - **Watermark**: the next run starts just past the newest event seen
//! - **Throttling**: waits out HTTP 429 using `Retry-After` and retries the
//!   same page
//! - **Durable checkpoint**: JSON file replaced atomically after each page
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use audit_export::{cli::Runner, config::ExporterConfig, now_millis};
//!
//! let config = ExporterConfig::load("export.yaml")?;
//! config.validate()?;
//! let exporter = Runner::build_exporter(&config, config.emitter())?;
//! let stats = exporter.run(now_millis()).await?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                           Exporter                            │
//! │  load checkpoint → window → fetch → advance → emit → persist  │
//! └───────────────────────────────────────────────────────────────┘
//!                                │
//! ┌────────────┬─────────────┬───┴──────────┬──────────┬─────────┐
//! │   HTTP     │  Paginate   │  Checkpoint  │  Output  │ Config  │
//! ├────────────┼─────────────┼──────────────┼──────────┼─────────┤
//! │ Jira audit │ Offset      │ JSON file    │ Log      │ YAML    │
//! │ Admin API  │ Cursor      │ Atomic write │ JSONL    │ Flags   │
//! │ Backoff    │             │ Watermark    │          │ Env     │
//! └────────────┴─────────────┴──────────────┴──────────┴─────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the exporter
pub mod error;

/// Common types and type aliases
pub mod types;

/// HTTP client, page fetchers and backoff policy
pub mod http;

/// Pagination strategies
pub mod pagination;

/// Checkpoint persistence
pub mod state;

/// Record emitters
pub mod output;

/// Export driver
pub mod engine;

/// Exporter configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use config::ExporterConfig;
pub use engine::{ExportStats, Exporter};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
