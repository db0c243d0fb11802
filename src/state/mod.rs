//! Checkpoint module
//!
//! Durable progress tracking between export runs.
//!
//! # Overview
//!
//! The state module provides:
//! - `Checkpoint` - pagination position plus the watermark timestamp
//! - `CheckpointStore` - file-based persistence with atomic replace
//!
//! A single exporter instance is expected to own the checkpoint file; two
//! processes sharing one file will overwrite each other's progress.

mod manager;
mod types;

pub use manager::CheckpointStore;
pub use types::Checkpoint;
