//! Per-event processing pipeline.
//!
//! One decoded reader event flows through classification, presence tracking,
//! the verdict cache, the verifier, and the persistence sink, in that
//! order, fully completing before the next event is touched. The streaming
//! loop drives this for live feeds; [`EventPipeline::process`] can also be
//! called directly to inject events (simulators, tests).

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::Result;
use crate::cache::VerdictCache;
use crate::clock::Clock;
use crate::event::{Classification, ReaderEvent, classify};
use crate::registry::TagRegistry;
use crate::sink::{ScanRecord, TagSink};
use crate::verifier::Verifier;

/// The validator → registry → cache → verifier → sink chain.
///
/// Holds shared handles only; cloning is cheap and every clone operates on
/// the same underlying state.
#[derive(Clone)]
pub struct EventPipeline {
    registry: Arc<TagRegistry>,
    cache: Arc<VerdictCache>,
    verifier: Arc<dyn Verifier>,
    sink: Arc<dyn TagSink>,
    clock: Arc<dyn Clock>,
}

impl EventPipeline {
    /// Assemble a pipeline from its collaborators.
    pub fn new(
        registry: Arc<TagRegistry>,
        cache: Arc<VerdictCache>,
        verifier: Arc<dyn Verifier>,
        sink: Arc<dyn TagSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            cache,
            verifier,
            sink,
            clock,
        }
    }

    /// Run one decoded event through the full chain.
    ///
    /// Ignored events touch nothing. Invalid events still update the
    /// registry (presence tracking must not depend on authentication
    /// outcome) and record a deterministic negative verdict without
    /// consulting the verifier. Valid events hit the cache first; the
    /// verifier runs only on a miss, and its verdict is cached and
    /// persisted.
    pub async fn process(&self, event: &ReaderEvent) -> Result<()> {
        match classify(event) {
            Classification::Ignored(reason) => {
                trace!("Ignoring reader event: {reason:?}");
                Ok(())
            }
            Classification::Invalid {
                tag_id,
                epc_hex,
                reason,
            } => {
                let seen_at = self.clock.now_millis();
                self.registry
                    .observe(&tag_id, epc_hex.as_deref(), None, None, seen_at)?;

                let detail = reason.detail().to_string();
                debug!("Unusable authentication payload for tag {tag_id}: {detail}");
                self.cache.set(&tag_id, false, Some(detail.clone()));
                self.persist(&tag_id, epc_hex.as_deref(), false, Some(detail))
                    .await;
                Ok(())
            }
            Classification::Valid {
                tag_id,
                epc_hex,
                challenge,
            } => {
                let seen_at = self.clock.now_millis();
                let is_new = self.registry.observe(
                    &tag_id,
                    epc_hex.as_deref(),
                    Some(&challenge.message_hex),
                    Some(&challenge.response_hex),
                    seen_at,
                )?;
                if is_new {
                    debug!("Tag {tag_id} entered the read field");
                }

                // A live verdict bounds verifier load to one call per tag
                // per TTL window.
                if self.cache.get(&tag_id).is_some() {
                    trace!("Cache hit for tag {tag_id}");
                    return Ok(());
                }

                let verdict = self.verifier.verify(&challenge).await;
                debug!(
                    "Verifier judged tag {tag_id}: authentic={}",
                    verdict.authentic
                );
                self.cache
                    .set(&tag_id, verdict.authentic, verdict.detail.clone());
                self.persist(&tag_id, epc_hex.as_deref(), verdict.authentic, verdict.detail)
                    .await;
                Ok(())
            }
        }
    }

    /// Hand the latest result to the sink. Failures are logged, never
    /// propagated; a broken store must not stall ingestion.
    async fn persist(
        &self,
        tag_id: &str,
        epc_hex: Option<&str>,
        authentic: bool,
        detail: Option<String>,
    ) {
        let record = ScanRecord {
            tag_id: tag_id.to_string(),
            epc_hex: epc_hex.map(str::to_string),
            observed_at: self.clock.now_rfc3339(),
            authentic,
            detail,
        };
        if let Err(e) = self.sink.upsert_latest(&record).await {
            warn!("Failed to persist scan result for tag {tag_id}: {e}");
        }
    }
}
