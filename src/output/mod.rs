//! Output module
//!
//! Record sinks for exported events.
//!
//! # Overview
//!
//! - `RecordEmitter` - trait consumed by the export driver
//! - `LogEmitter` - one structured log line per record
//! - `JsonLinesEmitter` - newline-delimited JSON to any writer

mod emitter;

pub use emitter::{JsonLinesEmitter, LogEmitter, RecordEmitter};
