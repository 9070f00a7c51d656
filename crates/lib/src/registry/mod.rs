//! Active-tag presence registry.
//!
//! [`TagRegistry`] tracks every tag currently in view of the reader. A tag
//! enters the registry on its first observation and stays until it goes
//! unobserved for longer than the grace period. The grace window decouples
//! "currently in the reader's field" from "momentarily missing between
//! inventory rounds": a single missed read cycle must not flicker a tag in
//! and out of the active set.
//!
//! Eviction is enforced transactionally: every mutating and every snapshot
//! operation removes stale entries inside the same critical section, so
//! external observers never see a tag past its grace window.

mod errors;

pub use errors::RegistryError;

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;

use crate::Result;
use crate::clock::Clock;

/// One tag currently in view of the reader.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TagObservation {
    /// Primary tag identifier.
    pub tag_id: String,
    /// Product/EPC identifier correlated with the tag.
    pub epc_hex: Option<String>,
    /// When the tag was first observed, millis since epoch. Never changes.
    pub first_seen: u64,
    /// When the tag was last observed, millis since epoch.
    pub last_seen: u64,
    /// Challenge from the most recent authentication exchange.
    pub challenge_hex: Option<String>,
    /// Response from the most recent authentication exchange.
    pub response_hex: Option<String>,
}

/// Diagnostic view of the registry.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RegistrySnapshot {
    /// Number of active tags.
    pub count: usize,
    /// Active tags, most recently discovered first.
    pub tags: Vec<TagObservation>,
}

/// Registry of tags currently in the reader's field.
///
/// Shared between the streaming task (sole writer) and concurrent snapshot
/// readers; every operation is a single critical section over the internal
/// map, so readers see either the pre- or post-update state, never a torn
/// one.
#[derive(Debug)]
pub struct TagRegistry {
    clock: Arc<dyn Clock>,
    grace: Duration,
    tags: Mutex<HashMap<String, TagObservation>>,
}

impl TagRegistry {
    /// Create a registry with the given grace period.
    pub fn new(clock: Arc<dyn Clock>, grace: Duration) -> Self {
        Self {
            clock,
            grace,
            tags: Mutex::new(HashMap::new()),
        }
    }

    /// The configured grace period.
    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Record that a tag was observed at `at_millis`.
    ///
    /// Creates the observation if the tag is new (`first_seen = last_seen =
    /// at_millis`) or refreshes `last_seen` and overwrites the mutable fields
    /// if it is already present. Stale entries are evicted as part of the
    /// same call.
    ///
    /// Returns `true` when this is a first-time observation.
    pub fn observe(
        &self,
        tag_id: &str,
        epc_hex: Option<&str>,
        challenge_hex: Option<&str>,
        response_hex: Option<&str>,
        at_millis: u64,
    ) -> Result<bool> {
        if tag_id.is_empty() {
            return Err(RegistryError::EmptyTagId.into());
        }

        let mut tags = self.tags.lock().unwrap();
        let is_new = match tags.entry(tag_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                let existing = occupied.get_mut();
                existing.last_seen = existing.last_seen.max(at_millis);
                existing.epc_hex = epc_hex.map(str::to_string);
                existing.challenge_hex = challenge_hex.map(str::to_string);
                existing.response_hex = response_hex.map(str::to_string);
                false
            }
            Entry::Vacant(vacant) => {
                vacant.insert(TagObservation {
                    tag_id: tag_id.to_string(),
                    epc_hex: epc_hex.map(str::to_string),
                    first_seen: at_millis,
                    last_seen: at_millis,
                    challenge_hex: challenge_hex.map(str::to_string),
                    response_hex: response_hex.map(str::to_string),
                });
                true
            }
        };

        Self::evict_locked(&mut tags, self.cutoff(at_millis));
        Ok(is_new)
    }

    /// Remove every entry whose `last_seen` is older than `now − grace`.
    ///
    /// Returns the number of entries removed. Called implicitly by every
    /// other operation; exposed for callers that want to drive eviction from
    /// their own schedule.
    pub fn evict_stale(&self, now_millis: u64) -> usize {
        let mut tags = self.tags.lock().unwrap();
        Self::evict_locked(&mut tags, self.cutoff(now_millis))
    }

    /// All active tags, sorted by `first_seen` descending (most recently
    /// discovered first, ties broken by tag id).
    pub fn list_active(&self) -> Vec<TagObservation> {
        let now = self.clock.now_millis();
        let mut tags = self.tags.lock().unwrap();
        Self::evict_locked(&mut tags, self.cutoff(now));

        let mut active: Vec<TagObservation> = tags.values().cloned().collect();
        active.sort_by(|a, b| {
            b.first_seen
                .cmp(&a.first_seen)
                .then_with(|| a.tag_id.cmp(&b.tag_id))
        });
        active
    }

    /// Diagnostic snapshot; same ordering and eviction contract as
    /// [`list_active`](Self::list_active).
    pub fn snapshot(&self) -> RegistrySnapshot {
        let tags = self.list_active();
        RegistrySnapshot {
            count: tags.len(),
            tags,
        }
    }

    /// Number of active tags.
    pub fn len(&self) -> usize {
        let now = self.clock.now_millis();
        let mut tags = self.tags.lock().unwrap();
        Self::evict_locked(&mut tags, self.cutoff(now));
        tags.len()
    }

    /// Whether any tag is currently active.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cutoff(&self, now_millis: u64) -> u64 {
        now_millis.saturating_sub(self.grace.as_millis() as u64)
    }

    fn evict_locked(tags: &mut HashMap<String, TagObservation>, cutoff: u64) -> usize {
        let before = tags.len();
        tags.retain(|_, tag| tag.last_seen >= cutoff);
        before - tags.len()
    }
}
