//! Authentication-result cache.
//!
//! The verifier round trip is the most expensive step in the pipeline, so
//! [`VerdictCache`] memoizes its outcome per tag for a bounded window. Under
//! sustained re-reads of the same tag the verifier is consulted at most once
//! per TTL.
//!
//! Expiry is lazy: a stale verdict is deleted on the read path, never
//! returned. There is no sweeper task.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;

use crate::clock::Clock;

/// A memoized verifier outcome.
#[derive(Debug, Clone, PartialEq)]
struct CachedVerdict {
    authentic: bool,
    detail: Option<String>,
    /// When the verdict was stored, millis since epoch.
    fetched_at: u64,
}

/// One live cache entry in a diagnostic snapshot.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CachedVerdictView {
    /// Tag identifier the verdict applies to.
    pub tag_id: String,
    /// Whether the tag was judged authentic.
    pub authentic: bool,
    /// Human-readable reason accompanying the verdict.
    pub detail: Option<String>,
}

/// Diagnostic view of the cache.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CacheSnapshot {
    /// Number of live entries.
    pub count: usize,
    /// Live entries ordered by tag id.
    pub entries: Vec<CachedVerdictView>,
}

/// Time-bounded cache of authentication verdicts, keyed by tag id.
///
/// Same sharing model as the registry: the streaming task is the sole
/// writer, diagnostic readers run concurrently, and every operation is one
/// critical section.
#[derive(Debug)]
pub struct VerdictCache {
    clock: Arc<dyn Clock>,
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedVerdict>>,
}

impl VerdictCache {
    /// Create a cache whose verdicts live for `ttl`.
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            clock,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The configured verdict TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up the verdict for a tag.
    ///
    /// Returns `None` on a miss. A stored verdict older than the TTL is
    /// deleted here and reported as a miss; it is never returned.
    pub fn get(&self, tag_id: &str) -> Option<(bool, Option<String>)> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock().unwrap();

        let verdict = entries.get(tag_id)?;
        if self.expired(verdict, now) {
            entries.remove(tag_id);
            return None;
        }
        Some((verdict.authentic, verdict.detail.clone()))
    }

    /// Store a verdict for a tag, overwriting any existing one and resetting
    /// its age.
    pub fn set(&self, tag_id: &str, authentic: bool, detail: Option<String>) {
        let fetched_at = self.clock.now_millis();
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            tag_id.to_string(),
            CachedVerdict {
                authentic,
                detail,
                fetched_at,
            },
        );
    }

    /// Diagnostic snapshot of all live entries, ordered by tag id.
    ///
    /// Entries that have expired by iteration time are excluded (and dropped
    /// from the cache).
    pub fn snapshot(&self) -> CacheSnapshot {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|_, verdict| !self.expired(verdict, now));

        let mut views: Vec<CachedVerdictView> = entries
            .iter()
            .map(|(tag_id, verdict)| CachedVerdictView {
                tag_id: tag_id.clone(),
                authentic: verdict.authentic,
                detail: verdict.detail.clone(),
            })
            .collect();
        views.sort_by(|a, b| a.tag_id.cmp(&b.tag_id));

        CacheSnapshot {
            count: views.len(),
            entries: views,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|_, verdict| !self.expired(verdict, now));
        entries.len()
    }

    /// Whether the cache holds any live entry.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn expired(&self, verdict: &CachedVerdict, now: u64) -> bool {
        now.saturating_sub(verdict.fetched_at) > self.ttl.as_millis() as u64
    }
}
