//! Gateway configuration.
//!
//! [`GatewayConfig`] collects everything the pipeline needs to run: where the
//! reader's event feed lives, how long a tag stays "present" without being
//! re-read, how long an authentication verdict stays fresh, and which verifier
//! implementation to use. All fields beyond the reader endpoint have
//! defaults matching the reference deployment.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::verifier::simulated::DEFAULT_SHARED_SECRET;

/// Default grace period before an unobserved tag is evicted, in seconds.
pub const DEFAULT_GRACE_SECONDS: f64 = 3.0;

/// Default time-to-live for cached authentication verdicts, in hours.
pub const DEFAULT_CACHE_TTL_HOURS: u64 = 24;

/// Errors produced while validating gateway configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The reader feed base URL could not be parsed.
    #[error("Invalid reader base URL '{url}': {reason}")]
    InvalidReaderUrl { url: String, reason: String },

    /// The verifier service endpoint could not be parsed.
    #[error("Invalid verifier endpoint '{url}': {reason}")]
    InvalidVerifierEndpoint { url: String, reason: String },

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {reason}")]
    HttpClient { reason: String },
}

/// Connection settings for the reader's event feed.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ReaderConfig {
    /// Base URL of the reader, e.g. `http://reader.local`. The stream
    /// endpoint is derived by appending `/data/stream`.
    pub base_url: String,
    /// HTTP basic-auth username for the feed.
    #[serde(default)]
    pub username: String,
    /// HTTP basic-auth password for the feed.
    #[serde(default)]
    pub password: String,
}

/// Which challenge-response verifier the gateway consults.
///
/// Selected once at construction and injected; never resolved per call.
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum VerifierMode {
    /// Local sha2-based verifier sharing a demo secret with the tag
    /// simulator. The default.
    #[default]
    Simulated,
    /// Remote authentication service reached over HTTP.
    Http {
        /// Endpoint accepting the verification JSON POST.
        endpoint: String,
    },
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GatewayConfig {
    /// Reader feed connection settings.
    pub reader: ReaderConfig,
    /// Grace period before an unobserved tag leaves the active set.
    #[serde(default = "default_grace_seconds")]
    pub grace_seconds: f64,
    /// TTL for cached authentication verdicts.
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: u64,
    /// Verifier selection.
    #[serde(default)]
    pub verifier: VerifierMode,
    /// Shared secret for the simulated verifier.
    #[serde(default = "default_shared_secret")]
    pub shared_secret: String,
}

fn default_grace_seconds() -> f64 {
    DEFAULT_GRACE_SECONDS
}

fn default_cache_ttl_hours() -> u64 {
    DEFAULT_CACHE_TTL_HOURS
}

fn default_shared_secret() -> String {
    DEFAULT_SHARED_SECRET.to_string()
}

impl GatewayConfig {
    /// Create a configuration for the given reader with all defaults.
    pub fn for_reader(reader: ReaderConfig) -> Self {
        Self {
            reader,
            grace_seconds: DEFAULT_GRACE_SECONDS,
            cache_ttl_hours: DEFAULT_CACHE_TTL_HOURS,
            verifier: VerifierMode::default(),
            shared_secret: default_shared_secret(),
        }
    }

    /// Grace period as a [`Duration`].
    pub fn grace(&self) -> Duration {
        Duration::from_secs_f64(self.grace_seconds)
    }

    /// Verdict TTL as a [`Duration`].
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_hours * 3600)
    }
}
