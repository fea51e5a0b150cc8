//! Content error type and its client-facing outcome.

use cms_storage::{StorageError, StorageErrorKind};

/// Error returned by content operations.
///
/// Storage-internal types never escape this boundary: [`StorageError`]s are
/// classified into [`ContentError::NotFound`] or [`ContentError::Unavailable`].
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// Requested item does not exist or the viewer may not see it.
    #[error("Not found: {0}")]
    NotFound(String),
    /// Stored hierarchy is malformed (cycle, excessive depth, duplicate key).
    #[error("Structural error: {0}")]
    Structural(String),
    /// Storage backend failed.
    #[error("Storage unavailable: {0}")]
    Unavailable(#[source] StorageError),
    /// Site or language configuration is missing or inconsistent.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// A content unit kind is not registered.
    #[error("Unsupported content kind: {0}")]
    UnsupportedKind(String),
}

impl From<StorageError> for ContentError {
    fn from(e: StorageError) -> Self {
        match e.kind {
            StorageErrorKind::NotFound => Self::NotFound(e.to_string()),
            _ => Self::Unavailable(e),
        }
    }
}

/// Client-facing classification of an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Report as "not found".
    NotFound,
    /// Report as a server error.
    ServerError,
}

impl ContentError {
    /// Classify the error for clients.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::NotFound(_) | Self::Configuration(_) => Outcome::NotFound,
            Self::Structural(_) | Self::Unavailable(_) | Self::UnsupportedKind(_) => {
                Outcome::ServerError
            }
        }
    }

    /// Message safe to show to clients.
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        match self.outcome() {
            Outcome::NotFound => "Not found.",
            Outcome::ServerError => "Internal server error.",
        }
    }
}
