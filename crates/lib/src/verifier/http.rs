//! HTTP verifier calling a remote authentication service.
//!
//! The service accepts the challenge tuple as a JSON POST and replies with a
//! verdict. Per the [`Verifier`] contract every failure mode here (service
//! unreachable, non-success status, undecodable reply) becomes a negative
//! verdict with a descriptive detail instead of an error.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;
use url::Url;

use super::{AuthChallenge, Verdict, Verifier};
use crate::settings::ConfigError;

/// How long one verification round trip may take before it is written off
/// as a failure.
const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// The service's reply.
#[derive(Debug, Deserialize)]
struct VerifyResponse {
    authentic: bool,
    #[serde(default)]
    detail: Option<String>,
}

/// Verifier backed by a remote authentication service.
pub struct HttpVerifier {
    endpoint: Url,
    client: reqwest::Client,
}

impl HttpVerifier {
    /// Create a verifier posting to `endpoint`.
    pub fn new(endpoint: &str) -> Result<Self, ConfigError> {
        let endpoint = Url::parse(endpoint).map_err(|e| ConfigError::InvalidVerifierEndpoint {
            url: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        let client = reqwest::Client::builder()
            .timeout(VERIFY_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::HttpClient {
                reason: e.to_string(),
            })?;
        Ok(Self { endpoint, client })
    }

    /// The configured service endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Verifier for HttpVerifier {
    async fn verify(&self, challenge: &AuthChallenge) -> Verdict {
        let response = match self
            .client
            .post(self.endpoint.clone())
            .json(challenge)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Verification service unreachable for tag {}: {e}", challenge.tid_hex);
                return Verdict::rejected(format!("verification service unreachable: {e}"));
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            warn!("Verification service rejected tag {}: {status}", challenge.tid_hex);
            return Verdict::rejected(format!("verification service returned {status}"));
        }

        match response.json::<VerifyResponse>().await {
            Ok(reply) => Verdict {
                authentic: reply.authentic,
                detail: reply.detail,
            },
            Err(e) => {
                warn!("Undecodable verification reply for tag {}: {e}", challenge.tid_hex);
                Verdict::rejected(format!("undecodable verification reply: {e}"))
            }
        }
    }
}
