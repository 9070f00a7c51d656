//! Error types for the persistence sink.

use thiserror::Error;

/// Errors that can occur while persisting scan results.
///
/// Sink failures never abort the pipeline; the streaming loop logs them and
/// moves on to the next event.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SinkError {
    /// The backing store rejected or failed the operation.
    #[error("Sink error: {reason}")]
    Database { reason: String },

    /// The backing store could not be reached or initialized.
    #[error("Failed to connect to sink at {url}: {reason}")]
    Connect { url: String, reason: String },
}
