//! Error types for the streaming consumer.

use thiserror::Error;

/// Errors that can occur while running the reader event stream.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StreamError {
    /// Attempted to start the stream while a streaming task is live.
    #[error("Reader stream already running")]
    AlreadyRunning,

    /// Attempted to stop the stream when no streaming task is live.
    #[error("Reader stream not running")]
    NotRunning,

    /// The feed endpoint could not be reached.
    #[error("Failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    /// The feed endpoint refused the stream request.
    #[error("Reader rejected stream request to {url}: {status}")]
    Rejected { url: String, status: String },

    /// The connection failed mid-stream.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The streaming task ended abnormally.
    #[error("Stream task failed: {0}")]
    TaskFailed(String),
}

impl StreamError {
    /// Check if this is a lifecycle error (double start / double stop).
    pub fn is_lifecycle_error(&self) -> bool {
        matches!(self, StreamError::AlreadyRunning | StreamError::NotRunning)
    }

    /// Check if this is a network/connection error.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            StreamError::Connect { .. } | StreamError::Rejected { .. } | StreamError::Transport(_)
        )
    }
}
