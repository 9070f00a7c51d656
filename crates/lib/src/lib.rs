//!
//! Tagwatch: an RFID tag-authentication gateway core.
//!
//! The crate ingests a continuous stream of tag-inventory events from a
//! physical reader, decides whether each tag is authentic via a
//! challenge-response scheme, and maintains two time-bounded in-memory views
//! of tag state for downstream consumers.
//!
//! ## Core Concepts
//!
//! * **Reader events (`event::ReaderEvent`)**: one JSON object per line on the
//!   reader's feed; `event::classify` reduces each to ignored, invalid, or a
//!   verifiable challenge.
//! * **Registry (`registry::TagRegistry`)**: every tag currently in the
//!   reader's field, with grace-period eviction so a missed read cycle does
//!   not flicker a tag out of the active set.
//! * **Cache (`cache::VerdictCache`)**: memoized authentication verdicts with
//!   TTL expiry, bounding verifier load to one call per tag per window.
//! * **Verifier (`verifier::Verifier`)**: the opaque challenge-response
//!   backend, simulated locally or reached over HTTP, selected once at
//!   construction.
//! * **Sink (`sink::TagSink`)**: idempotent latest-scan persistence, keyed by
//!   tag id; failures never stall ingestion.
//! * **Gateway (`gateway::Gateway`)**: the assembled pipeline plus the
//!   lifecycle of the single background streaming task.

pub mod cache;
pub mod clock;
pub mod event;
pub mod gateway;
pub mod registry;
pub mod settings;
pub mod sink;
pub mod stream;
pub mod verifier;

pub use clock::{Clock, SystemClock};
pub use gateway::Gateway;
pub use settings::{GatewayConfig, ReaderConfig, VerifierMode};

#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;

/// Result type used throughout the Tagwatch library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Tagwatch library.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured configuration errors from the settings module
    #[error(transparent)]
    Config(#[from] settings::ConfigError),

    /// Structured registry errors from the registry module
    #[error(transparent)]
    Registry(#[from] registry::RegistryError),

    /// Structured streaming errors from the stream module
    #[error(transparent)]
    Stream(#[from] stream::StreamError),

    /// Structured persistence errors from the sink module
    #[error(transparent)]
    Sink(#[from] sink::SinkError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
            Error::Config(_) => "settings",
            Error::Registry(_) => "registry",
            Error::Stream(_) => "stream",
            Error::Sink(_) => "sink",
        }
    }

    /// Check if this error reports starting a stream that is already
    /// running.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Stream(stream::StreamError::AlreadyRunning))
    }

    /// Check if this error reports stopping a stream that is not running.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Stream(stream::StreamError::NotRunning))
    }

    /// Check if this error is network/connection-related.
    pub fn is_network_error(&self) -> bool {
        match self {
            Error::Stream(e) => e.is_network_error(),
            Error::Sink(sink::SinkError::Connect { .. }) => true,
            _ => false,
        }
    }

    /// Check if this error is validation-related (bad input or
    /// configuration).
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Registry(_))
    }
}
