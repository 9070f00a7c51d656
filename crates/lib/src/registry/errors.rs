//! Error types for the active-tag registry.

use thiserror::Error;

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// An observation was submitted without a tag identifier.
    #[error("Tag id must not be empty")]
    EmptyTagId,
}
