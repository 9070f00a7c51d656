//! Persistence sink for per-tag scan results.
//!
//! After each authentication decision (verified, failed, or invalid
//! payload) the pipeline hands a [`ScanRecord`] to the configured
//! [`TagSink`]. The
//! sink performs an idempotent insert-or-update keyed by tag id, so the
//! store always holds the latest result per tag.
//!
//! [`MemorySink`] is the in-process implementation used in tests and
//! diagnostics-only deployments; [`SqlSink`](sql::SqlSink) (features
//! `sqlite`/`postgres`) writes through sqlx.

mod errors;
#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub mod sql;

pub use errors::SinkError;
#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub use sql::SqlSink;

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The latest scan outcome for one tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanRecord {
    /// Primary tag identifier; the upsert key.
    pub tag_id: String,
    /// Product/EPC identifier correlated with the tag.
    pub epc_hex: Option<String>,
    /// When the tag was observed, RFC3339.
    pub observed_at: String,
    /// Outcome of the authentication decision.
    pub authentic: bool,
    /// Human-readable reason accompanying the outcome.
    pub detail: Option<String>,
}

/// A store of latest-scan results.
#[async_trait]
pub trait TagSink: Send + Sync {
    /// Insert or update the record for `record.tag_id`.
    async fn upsert_latest(&self, record: &ScanRecord) -> Result<(), SinkError>;
}

/// In-memory sink keyed by tag id.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<HashMap<String, ScanRecord>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored record for a tag, if any.
    pub fn get(&self, tag_id: &str) -> Option<ScanRecord> {
        self.records.lock().unwrap().get(tag_id).cloned()
    }

    /// All stored records, ordered by tag id.
    pub fn records(&self) -> Vec<ScanRecord> {
        let mut records: Vec<ScanRecord> =
            self.records.lock().unwrap().values().cloned().collect();
        records.sort_by(|a, b| a.tag_id.cmp(&b.tag_id));
        records
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Whether the sink holds any record.
    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl TagSink for MemorySink {
    async fn upsert_latest(&self, record: &ScanRecord) -> Result<(), SinkError> {
        self.records
            .lock()
            .unwrap()
            .insert(record.tag_id.clone(), record.clone());
        Ok(())
    }
}
