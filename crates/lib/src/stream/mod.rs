//! Streaming consumer for the reader's event feed.
//!
//! [`ReaderClient`] holds a long-lived HTTP connection against the reader's
//! NDJSON feed and pushes each decoded line through the
//! [`EventPipeline`](pipeline::EventPipeline) strictly in arrival order,
//! with no reordering or batching. One event fully completes (registry update,
//! cache check, optional verifier call, optional persistence call) before
//! the next line is read; a slow verifier therefore throttles ingestion,
//! which is the intended backpressure mechanism.
//!
//! ## Malformed lines
//!
//! A line that fails JSON decoding is skipped and logged at `warn`, and the
//! connection survives. Treating a malformed line as fatal to the connection
//! attempt would let one corrupt frame tear down an otherwise healthy feed.
//! See DESIGN.md for the full rationale.
//!
//! ## Cancellation
//!
//! `run` races a shutdown signal against every blocking transport read. On
//! cancellation, end-of-stream, or transport error alike, the connection
//! resource is dropped before the function returns, on every exit path.

mod error;
pub mod pipeline;

pub use error::StreamError;
pub use pipeline::EventPipeline;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use url::Url;

use crate::Result;
use crate::event::ReaderEvent;
use crate::settings::{ConfigError, ReaderConfig};

/// Path of the stream endpoint relative to the reader base URL.
const STREAM_PATH: &str = "/data/stream";

/// How much of a malformed line to reproduce in the log.
const PREVIEW_LEN: usize = 120;

/// Client for the reader's authenticated NDJSON event feed.
#[derive(Debug)]
pub struct ReaderClient {
    base_url: String,
    username: String,
    password: String,
    client: reqwest::Client,
}

impl ReaderClient {
    /// Build a client for the configured reader.
    ///
    /// The underlying HTTP client carries no request timeout: the stream is
    /// expected to stay open indefinitely.
    pub fn new(config: &ReaderConfig) -> Result<Self> {
        Url::parse(&config.base_url).map_err(|e| ConfigError::InvalidReaderUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::HttpClient {
                reason: e.to_string(),
            })?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            client,
        })
    }

    /// The full URL of the stream endpoint.
    pub fn stream_url(&self) -> String {
        format!("{}{STREAM_PATH}", self.base_url)
    }

    /// Consume the feed until end-of-stream, transport failure, or shutdown.
    ///
    /// Returns `Ok(())` when the feed ends or the shutdown signal fires
    /// (including the sender being dropped); transport failures are returned
    /// after the connection has been released.
    pub async fn run(
        &self,
        pipeline: &EventPipeline,
        mut shutdown: oneshot::Receiver<()>,
    ) -> Result<()> {
        let url = self.stream_url();
        info!("Connecting to reader event stream at {url}");

        let response = tokio::select! {
            _ = &mut shutdown => {
                debug!("Shutdown before the stream connected");
                return Ok(());
            }
            response = self
                .client
                .get(&url)
                .basic_auth(&self.username, Some(&self.password))
                .send() => {
                response.map_err(|e| StreamError::Connect {
                    url: url.clone(),
                    reason: e.to_string(),
                })?
            }
        };

        let mut response = response.error_for_status().map_err(|e| StreamError::Rejected {
            url: url.clone(),
            status: e
                .status()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        })?;

        info!("Reader event stream connected");

        let mut buf: Vec<u8> = Vec::new();
        let mut malformed: u64 = 0;

        // The response body is dropped on every path out of this loop,
        // releasing the connection.
        let result = loop {
            let chunk = tokio::select! {
                _ = &mut shutdown => {
                    debug!("Shutdown signal received, closing reader stream");
                    break Ok(());
                }
                chunk = response.chunk() => chunk,
            };

            match chunk {
                Ok(Some(bytes)) => {
                    buf.extend_from_slice(&bytes);
                    while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                        let line: Vec<u8> = buf.drain(..=pos).collect();
                        let text = String::from_utf8_lossy(&line);
                        let text = text.trim();
                        if text.is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<ReaderEvent>(text) {
                            Ok(event) => pipeline.process(&event).await?,
                            Err(e) => {
                                malformed += 1;
                                warn!(
                                    "Skipping malformed event line ({e}): {}",
                                    preview(text)
                                );
                            }
                        }
                    }
                }
                Ok(None) => {
                    info!("Reader event stream ended");
                    break Ok(());
                }
                Err(e) => break Err(StreamError::Transport(e.to_string()).into()),
            }
        };

        if malformed > 0 {
            warn!("Reader stream skipped {malformed} malformed lines");
        }
        result
    }
}

fn preview(line: &str) -> &str {
    match line.char_indices().nth(PREVIEW_LEN) {
        Some((i, _)) => &line[..i],
        None => line,
    }
}
