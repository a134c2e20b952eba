use std::io;
use std::path::{Path, PathBuf};

/// Errors from store operations.
///
/// Every public operation either succeeds or returns exactly one of these.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The key is empty or its encoding was rejected by the transformer.
    #[error("invalid key {key}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// No entry exists for the requested key.
    #[error("key not found: {0}")]
    NotFound(String),

    /// A mutation was attempted that the store's mutability policy forbids.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The entry changed between the freshness checks around a read.
    #[error("entry was modified during read: {}", .0.display())]
    ConcurrentModification(PathBuf),

    /// The write ran out of storage capacity.
    #[error("storage exhausted while writing {}", .0.display())]
    StorageExhausted(PathBuf),

    /// Transport or backend failure, including OS-level permission errors.
    #[error("storage unavailable: {0}")]
    Unavailable(#[source] io::Error),

    /// The serializer rejected the value or the stored bytes.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The store configuration is malformed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl StoreError {
    /// Build an [`StoreError::InvalidKey`] from anything printable as a key.
    pub fn invalid_key(key: impl std::fmt::Debug, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: format!("{key:?}"),
            reason: reason.into(),
        }
    }

    /// Classify an I/O error raised while touching `path`.
    pub fn io(err: io::Error, path: &Path) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => {
                Self::NotFound(path.display().to_string())
            }
            io::ErrorKind::StorageFull | io::ErrorKind::QuotaExceeded => {
                Self::StorageExhausted(path.to_path_buf())
            }
            _ => Self::Unavailable(err),
        }
    }

    /// Classify a serializer failure for the entry at `path`.
    pub fn from_serializer(err: SerializerError, path: &Path) -> Self {
        match err {
            SerializerError::Io(e) => Self::io(e, path),
            SerializerError::Format(msg) => Self::Serialization(msg),
        }
    }
}

/// Errors raised by a [`Serializer`](crate::serializer::Serializer).
///
/// I/O failures are kept apart from format failures so that a full disk can
/// be reported as [`StoreError::StorageExhausted`].
#[derive(Debug, thiserror::Error)]
pub enum SerializerError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("format error: {0}")]
    Format(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
