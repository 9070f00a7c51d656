//! Simulated challenge-response verifier.
//!
//! Stands in for the real authentication service in demo and test
//! deployments. The tag simulator and this verifier share a secret; a tag's
//! response is valid when it equals the first 16 hex characters of
//! `sha256(secret || tid || challenge)`.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{AuthChallenge, Verdict, Verifier};

/// Shared secret used when none is configured. Matches the demo tag
/// simulator.
pub const DEFAULT_SHARED_SECRET: &str = "tagwatch-demo-secret";

/// Length of a response in hex characters.
const RESPONSE_HEX_LEN: usize = 16;

/// Verifier that recomputes the expected tag response locally.
#[derive(Debug, Clone)]
pub struct SimulatedVerifier {
    secret: String,
}

impl SimulatedVerifier {
    /// Create a verifier around the given shared secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Compute the response a genuine tag would give to `challenge`.
    ///
    /// Also used by test fixtures to fabricate valid reader events.
    pub fn expected_response(&self, tid_hex: &str, challenge_hex: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(tid_hex.as_bytes());
        hasher.update(challenge_hex.as_bytes());
        let digest = hex::encode(hasher.finalize());
        digest[..RESPONSE_HEX_LEN].to_string()
    }
}

impl Default for SimulatedVerifier {
    fn default() -> Self {
        Self::new(DEFAULT_SHARED_SECRET)
    }
}

#[async_trait]
impl Verifier for SimulatedVerifier {
    async fn verify(&self, challenge: &AuthChallenge) -> Verdict {
        let expected = self.expected_response(&challenge.tid_hex, &challenge.message_hex);
        if expected == challenge.response_hex {
            Verdict::authentic("challenge response verified")
        } else {
            Verdict::rejected("challenge response mismatch")
        }
    }
}
