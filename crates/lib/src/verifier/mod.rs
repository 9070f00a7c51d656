//! Challenge-response verification capability.
//!
//! The gateway treats the verifier as an opaque collaborator behind the
//! [`Verifier`] trait. Two implementations ship with the crate: the
//! [`SimulatedVerifier`](simulated::SimulatedVerifier) for demo and test
//! deployments, and the [`HttpVerifier`](http::HttpVerifier) that calls out
//! to a real authentication service. One of them is selected at construction
//! and injected; nothing resolves the verifier per call.
//!
//! Verification is infallible by contract: any internal failure (service
//! unreachable, malformed reply) surfaces as a negative [`Verdict`] with a
//! descriptive detail, never as an error that could abort the stream.

pub mod http;
pub mod simulated;

pub use http::HttpVerifier;
pub use simulated::{DEFAULT_SHARED_SECRET, SimulatedVerifier};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The challenge-response tuple submitted for verification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthChallenge {
    /// Identifier of the tag being verified.
    pub tid_hex: String,
    /// Challenge message the reader sent to the tag.
    pub message_hex: String,
    /// The tag's response. Guaranteed non-empty by the event validator.
    pub response_hex: String,
}

/// The verifier's judgement on one challenge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Verdict {
    /// Whether the tag's response checked out.
    pub authentic: bool,
    /// Human-readable reason.
    pub detail: Option<String>,
}

impl Verdict {
    /// A positive verdict with the given detail.
    pub fn authentic(detail: impl Into<String>) -> Self {
        Self {
            authentic: true,
            detail: Some(detail.into()),
        }
    }

    /// A negative verdict with the given detail.
    pub fn rejected(detail: impl Into<String>) -> Self {
        Self {
            authentic: false,
            detail: Some(detail.into()),
        }
    }
}

/// A challenge-response verification backend.
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Judge one challenge. Must not fail: implementations map their own
    /// failures to a negative verdict with a descriptive detail.
    async fn verify(&self, challenge: &AuthChallenge) -> Verdict;
}
