//! Record emitters
//!
//! Sinks that receive each exported record in fetch order.

use crate::error::{Error, Result};
use crate::types::{JsonValue, Record};
use async_trait::async_trait;
use std::io::Write;
use std::sync::Mutex;
use tracing::info;

/// Capability: accept one exported record.
///
/// Failures are reported back to the driver, which logs them and moves on;
/// a sink failure never aborts an export.
#[async_trait]
pub trait RecordEmitter: Send + Sync {
    /// Emit a single record
    async fn emit(&self, record: &Record) -> Result<()>;

    /// Flush buffered output at the end of a run
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Log Emitter
// ============================================================================

/// Writes each record as one structured `info` event
#[derive(Debug, Clone, Default)]
pub struct LogEmitter;

impl LogEmitter {
    /// Create a new log emitter
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RecordEmitter for LogEmitter {
    async fn emit(&self, record: &Record) -> Result<()> {
        let attributes = JsonValue::Object(record.attributes.clone());
        info!(
            target: "audit_export::record",
            id = %record.id,
            created = %record.created,
            attributes = %attributes,
            "audit record"
        );
        Ok(())
    }
}

// ============================================================================
// JSON Lines Emitter
// ============================================================================

/// Writes each record as a single JSON object followed by a newline
#[derive(Debug)]
pub struct JsonLinesEmitter<W: Write + Send> {
    writer: Mutex<W>,
}

impl JsonLinesEmitter<std::io::Stdout> {
    /// Emit to standard output
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> JsonLinesEmitter<W> {
    /// Emit to `writer`
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Take back the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl<W: Write + Send> RecordEmitter for JsonLinesEmitter<W> {
    async fn emit(&self, record: &Record) -> Result<()> {
        let line = serde_json::to_string(record)
            .map_err(|e| Error::emit(&record.id, e.to_string()))?;

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| Error::emit(&record.id, "output writer poisoned"))?;
        writeln!(writer, "{line}").map_err(|e| Error::emit(&record.id, e.to_string()))
    }

    async fn flush(&self) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| Error::emit("-", "output writer poisoned"))?;
        writer.flush()?;
        Ok(())
    }
}
