//! Gateway assembly and streaming lifecycle.
//!
//! [`Gateway`] wires the pipeline together: it owns the registry, the
//! verdict cache, the selected verifier, the persistence sink, and the
//! clock, and it manages the single background streaming task. Diagnostic
//! readers can query the gateway concurrently while the stream is running.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::Result;
use crate::cache::{CacheSnapshot, VerdictCache};
use crate::clock::{Clock, SystemClock};
use crate::event::ReaderEvent;
use crate::registry::{RegistrySnapshot, TagObservation, TagRegistry};
use crate::settings::{GatewayConfig, VerifierMode};
use crate::sink::{MemorySink, TagSink};
use crate::stream::{EventPipeline, ReaderClient, StreamError};
use crate::verifier::{HttpVerifier, SimulatedVerifier, Verifier};

/// An active tag joined with its cached authentication verdict.
///
/// Tags that have no live verdict yet ("present, not yet authenticated")
/// are excluded; consumers distinguish the remaining rows by `authentic`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScanResult {
    /// Primary tag identifier.
    pub tag_id: String,
    /// Product/EPC identifier correlated with the tag.
    pub epc_hex: Option<String>,
    /// When the tag was first observed, millis since epoch.
    pub first_seen: u64,
    /// When the tag was last observed, millis since epoch.
    pub last_seen: u64,
    /// Cached authentication outcome.
    pub authentic: bool,
    /// Human-readable reason accompanying the outcome.
    pub detail: Option<String>,
}

/// Handle on the live streaming task.
struct StreamTask {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<Result<()>>,
}

/// The assembled ingestion-and-authentication pipeline.
pub struct Gateway {
    config: GatewayConfig,
    clock: Arc<dyn Clock>,
    registry: Arc<TagRegistry>,
    cache: Arc<VerdictCache>,
    verifier: Arc<dyn Verifier>,
    sink: Arc<dyn TagSink>,
    stream_task: Mutex<Option<StreamTask>>,
}

impl Gateway {
    /// Build a gateway from configuration alone: system clock, verifier
    /// selected from `config.verifier`, in-memory sink.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let verifier: Arc<dyn Verifier> = match &config.verifier {
            VerifierMode::Simulated => {
                Arc::new(SimulatedVerifier::new(config.shared_secret.clone()))
            }
            VerifierMode::Http { endpoint } => Arc::new(HttpVerifier::new(endpoint)?),
        };
        Ok(Self::with_parts(
            config,
            Arc::new(SystemClock),
            verifier,
            Arc::new(MemorySink::new()),
        ))
    }

    /// Build a gateway with injected collaborators.
    pub fn with_parts(
        config: GatewayConfig,
        clock: Arc<dyn Clock>,
        verifier: Arc<dyn Verifier>,
        sink: Arc<dyn TagSink>,
    ) -> Self {
        let registry = Arc::new(TagRegistry::new(clock.clone(), config.grace()));
        let cache = Arc::new(VerdictCache::new(clock.clone(), config.cache_ttl()));
        Self {
            config,
            clock,
            registry,
            cache,
            verifier,
            sink,
            stream_task: Mutex::new(None),
        }
    }

    /// The gateway configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The active-tag registry.
    pub fn registry(&self) -> &Arc<TagRegistry> {
        &self.registry
    }

    /// The verdict cache.
    pub fn cache(&self) -> &Arc<VerdictCache> {
        &self.cache
    }

    /// Build a pipeline over this gateway's shared state.
    pub fn pipeline(&self) -> EventPipeline {
        EventPipeline::new(
            self.registry.clone(),
            self.cache.clone(),
            self.verifier.clone(),
            self.sink.clone(),
            self.clock.clone(),
        )
    }

    /// Run one already-decoded event through the pipeline.
    ///
    /// This is the injection path used by simulators and tests; the live
    /// stream drives the same pipeline.
    pub async fn ingest(&self, event: &ReaderEvent) -> Result<()> {
        self.pipeline().process(event).await
    }

    /// Start the background streaming task.
    ///
    /// Returns [`StreamError::AlreadyRunning`] while a previous task is
    /// still live. A task that already terminated on its own (feed ended,
    /// transport failure) is replaced.
    pub async fn start_stream(&self) -> Result<()> {
        let client = ReaderClient::new(&self.config.reader)?;
        let pipeline = self.pipeline();

        let mut slot = self.stream_task.lock().unwrap();
        if slot.as_ref().is_some_and(|task| !task.handle.is_finished()) {
            return Err(StreamError::AlreadyRunning.into());
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let result = client.run(&pipeline, shutdown_rx).await;
            if let Err(e) = &result {
                error!("Reader stream terminated: {e}");
            }
            result
        });

        info!("Reader stream started");
        *slot = Some(StreamTask {
            shutdown: shutdown_tx,
            handle,
        });
        Ok(())
    }

    /// Stop the background streaming task and wait for its teardown.
    ///
    /// Returns [`StreamError::NotRunning`] when no task was started. If the
    /// task had already terminated on its own, its terminal result is
    /// returned here.
    pub async fn stop_stream(&self) -> Result<()> {
        let task = self.stream_task.lock().unwrap().take();
        let Some(task) = task else {
            return Err(StreamError::NotRunning.into());
        };

        // The task may have already finished; the signal is then a no-op.
        let _ = task.shutdown.send(());
        let result = match task.handle.await {
            Ok(result) => result,
            Err(e) => Err(StreamError::TaskFailed(e.to_string()).into()),
        };
        info!("Reader stream stopped");
        result
    }

    /// Whether a streaming task is currently live.
    pub fn is_streaming(&self) -> bool {
        self.stream_task
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// All tags currently in the reader's field, most recently discovered
    /// first.
    pub fn active_tags(&self) -> Vec<TagObservation> {
        self.registry.list_active()
    }

    /// Diagnostic view of presence state, before any authentication.
    pub fn registry_snapshot(&self) -> RegistrySnapshot {
        self.registry.snapshot()
    }

    /// Diagnostic view of authentication outcomes.
    pub fn cache_snapshot(&self) -> CacheSnapshot {
        self.cache.snapshot()
    }

    /// Active tags joined with their live authentication verdicts.
    pub fn scan_results(&self) -> Vec<ScanResult> {
        self.registry
            .list_active()
            .into_iter()
            .filter_map(|tag| {
                self.cache
                    .get(&tag.tag_id)
                    .map(|(authentic, detail)| ScanResult {
                        tag_id: tag.tag_id,
                        epc_hex: tag.epc_hex,
                        first_seen: tag.first_seen,
                        last_seen: tag.last_seen,
                        authentic,
                        detail,
                    })
            })
            .collect()
    }
}
