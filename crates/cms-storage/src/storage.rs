//! Storage trait and error types.
//!
//! Provides the core [`ContentStore`] trait for abstracting content queries,
//! along with [`StorageError`] for unified error handling across backends.
//!
//! Every method must answer from a single consistent snapshot of the
//! backend. Hierarchy is not resolved here: nodes and units are returned flat
//! with parent references and the consumer assembles trees.

use std::collections::BTreeSet;

use crate::model::{AreaKey, ContentNode, PlaceholderRecord, SiteId, UnitRecord};

/// Semantic error categories.
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum StorageErrorKind {
    /// Resource does not exist.
    NotFound,
    /// Backend is temporarily unavailable.
    Unavailable,
    /// Operation timed out.
    Timeout,
    /// Stored data could not be decoded.
    Corrupt,
    /// Other/unknown error category.
    Other,
}

/// Retry guidance for the caller. The core itself never retries.
#[derive(Debug, PartialEq, Eq, Default)]
pub enum ErrorStatus {
    /// Don't retry (not found, corrupt data).
    #[default]
    Permanent,
    /// Retry immediately (timeout, connection reset).
    Temporary,
    /// Retry with backoff (service unavailable).
    Persistent,
}

/// Storage error with semantic kind and backend-specific source.
#[derive(Debug)]
pub struct StorageError {
    /// Semantic error category.
    pub kind: StorageErrorKind,
    /// Retry guidance.
    pub status: ErrorStatus,
    /// Backend identifier (e.g., "Json", "Mock").
    pub backend: Option<&'static str>,
    /// What was being queried (e.g., "placeholder 5/1/content").
    pub context: Option<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StorageError {
    /// Create a new storage error.
    #[must_use]
    pub fn new(kind: StorageErrorKind) -> Self {
        Self {
            kind,
            status: ErrorStatus::Permanent,
            backend: None,
            context: None,
            source: None,
        }
    }

    /// Attach query context.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Attach backend identifier.
    #[must_use]
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set retry status.
    #[must_use]
    pub fn with_status(mut self, status: ErrorStatus) -> Self {
        self.status = status;
        self
    }

    /// Attach the underlying error source.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Downcast the source error to a concrete type.
    #[must_use]
    pub fn downcast_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.source.as_ref()?.downcast_ref()
    }

    /// Create a not found error with context.
    #[must_use]
    pub fn not_found(context: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::NotFound).with_context(context)
    }

    /// Create a retryable unavailable error.
    #[must_use]
    pub fn unavailable(context: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::Unavailable)
            .with_status(ErrorStatus::Persistent)
            .with_context(context)
    }

    /// Create a storage error from an I/O error.
    #[must_use]
    pub fn io(err: std::io::Error, context: impl Into<String>) -> Self {
        let (kind, status) = match err.kind() {
            std::io::ErrorKind::TimedOut => (StorageErrorKind::Timeout, ErrorStatus::Temporary),
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                (StorageErrorKind::Unavailable, ErrorStatus::Persistent)
            }
            _ => (StorageErrorKind::Other, ErrorStatus::Permanent),
        };
        Self::new(kind)
            .with_status(status)
            .with_context(context)
            .with_source(err)
    }

    /// Whether the caller may retry the operation.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.status != ErrorStatus::Permanent
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: "[Backend] Kind: message (context)"
        if let Some(backend) = self.backend {
            write!(f, "[{backend}] ")?;
        }

        let kind_str = match self.kind {
            StorageErrorKind::NotFound => "Not found",
            StorageErrorKind::Unavailable => "Unavailable",
            StorageErrorKind::Timeout => "Timeout",
            StorageErrorKind::Corrupt => "Corrupt data",
            StorageErrorKind::Other => "Error",
        };

        write!(f, "{kind_str}")?;

        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }

        if let Some(context) = &self.context {
            write!(f, " ({context})")?;
        }

        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Read-only query interface over the content backend.
///
/// Methods return `Ok(None)`/empty collections for absent data and reserve
/// [`StorageError`] for backend faults.
pub trait ContentStore: Send + Sync {
    /// All content nodes of a site in one language, in storage order.
    fn fetch_nodes_for_site(
        &self,
        site: SiteId,
        language: &str,
    ) -> Result<Vec<ContentNode>, StorageError>;

    /// A content node by its URL path.
    ///
    /// The default implementation scans [`ContentStore::fetch_nodes_for_site`].
    fn fetch_page(
        &self,
        site: SiteId,
        language: &str,
        path: &str,
    ) -> Result<Option<ContentNode>, StorageError> {
        Ok(self
            .fetch_nodes_for_site(site, language)?
            .into_iter()
            .find(|node| node.path == path))
    }

    /// A content node by content record id.
    fn fetch_node(&self, content_id: u64) -> Result<Option<ContentNode>, StorageError>;

    /// Placeholder metadata for an area.
    fn fetch_placeholder(&self, key: &AreaKey) -> Result<Option<PlaceholderRecord>, StorageError>;

    /// Every placeholder attached to a page content record, including slots
    /// no longer declared by its template.
    fn fetch_page_placeholders(
        &self,
        content_id: u64,
    ) -> Result<Vec<PlaceholderRecord>, StorageError>;

    /// Flat content units of an area in one language.
    fn fetch_content_units(
        &self,
        key: &AreaKey,
        language: &str,
    ) -> Result<Vec<UnitRecord>, StorageError>;

    /// Slots declared by a template.
    fn fetch_declared_slots(&self, template: &str) -> Result<BTreeSet<String>, StorageError>;

    /// Whether the record is still returned by its model's default query
    /// (not soft-deleted, not excluded by the model's own visibility rules).
    fn subject_exists(&self, model: &str, object_id: u64) -> Result<bool, StorageError>;
}
