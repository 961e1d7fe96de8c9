/*!
Error types for the shelf core engine.

Two layers: [`StorageError`] is what a storage adapter (or the JSON codec)
reports, and [`StoreError`] is what the record store surfaces to callers,
always wrapping the underlying cause.
*/

use thiserror::Error;

/// Result type used throughout the shelf core.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Result type returned by storage adapters.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Failures reported by a storage adapter or while encoding/decoding records.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Nothing is stored at the requested path
    #[error("nothing stored at {0}")]
    Missing(String),

    /// I/O errors during file operations
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend-specific failure with no richer type
    #[error("Storage error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Wrap an I/O error together with the path it occurred on
    pub fn io<P: Into<String>>(path: P, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a new backend error
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        Self::Backend(msg.into())
    }

    /// True when the error means the path holds nothing
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Missing(_) => true,
            Self::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Errors surfaced by [`RecordStore`](crate::RecordStore) operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Encoding the record or writing it to storage failed
    #[error("cannot persist record at {path}: {source}")]
    CannotPersist {
        path: String,
        #[source]
        source: StorageError,
    },

    /// Nothing readable is stored at the path, or its contents failed to decode
    #[error("no record found at {path}: {source}")]
    NotFound {
        path: String,
        #[source]
        source: StorageError,
    },

    /// Loading the collection behind a filter failed
    #[error("cannot filter collection '{type_tag}': {source}")]
    CannotFilter {
        type_tag: String,
        #[source]
        source: Box<StoreError>,
    },

    /// Clearing the store root failed
    #[error("cannot clear store root '{root}': {source}")]
    CannotClear {
        root: String,
        #[source]
        source: StorageError,
    },

    /// Identifier cannot be embedded in a storage path
    #[error("invalid record identifier {0:?}")]
    InvalidIdentifier(String),

    /// Reading or writing the persisted version marker failed
    #[error("version marker error: {0}")]
    VersionMarker(#[source] StorageError),

    /// Configuration errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// A background task running a store call did not complete
    #[error("background task failed: {0}")]
    Task(String),

    /// Tracing or metrics setup failed
    #[error("Observability error: {0}")]
    Observability(String),
}

impl StoreError {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// True for [`StoreError::NotFound`]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
