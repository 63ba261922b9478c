//! Append-only evidence ledger.
//!
//! Every pipeline stage emits structured audit records through an
//! [`EvidenceSink`]. Writes are fire-and-forget: a failing sink is logged
//! and swallowed, never aborting the pipeline.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

/// One audit line. Never mutated after creation.
#[derive(Debug, Clone, Serialize)]
pub struct EvidenceRecord {
    /// Item key; None for lot-level records (e.g. the optimizer)
    pub sku_local: Option<String>,
    /// Stage tag, e.g. "gate", "price:estimate", "sell:estimate", "optimize:bid"
    pub source: String,
    pub ok: bool,
    pub timestamp: String,
    pub meta: Value,
}

impl EvidenceRecord {
    pub fn new(sku_local: Option<&str>, source: &str, ok: bool, meta: Value) -> Self {
        EvidenceRecord {
            sku_local: sku_local.map(str::to_string),
            source: source.to_string(),
            ok,
            timestamp: Utc::now().to_rfc3339(),
            meta,
        }
    }
}

/// Destination for evidence records.
///
/// Implementations append one record per call to durable storage.
/// Failure modes must not propagate to the caller.
pub trait EvidenceSink {
    fn write(&self, record: &EvidenceRecord);
}

/// Sink that drops every record.
#[derive(Debug, Default)]
pub struct NullSink;

impl EvidenceSink for NullSink {
    fn write(&self, _record: &EvidenceRecord) {}
}

/// In-memory sink, mainly for tests and for callers that post-process
/// the ledger themselves.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<EvidenceRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        MemorySink::default()
    }

    pub fn records(&self) -> Vec<EvidenceRecord> {
        self.records.lock().expect("evidence sink poisoned").clone()
    }
}

impl EvidenceSink for MemorySink {
    fn write(&self, record: &EvidenceRecord) {
        self.records
            .lock()
            .expect("evidence sink poisoned")
            .push(record.clone());
    }
}

/// NDJSON file sink: one JSON object per line, opened in append mode on
/// every write so concurrent single-writer appends stay line-atomic.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonlSink { path: path.into() }
    }

    fn try_write(&self, record: &EvidenceRecord) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(record)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

impl EvidenceSink for JsonlSink {
    fn write(&self, record: &EvidenceRecord) {
        if let Err(e) = self.try_write(record) {
            tracing::warn!(
                path = %self.path.display(),
                source = %record.source,
                error = %e,
                "evidence append failed; record dropped"
            );
        }
    }
}
