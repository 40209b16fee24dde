use std::fmt;

/// Errors from store operations.
///
/// Every backend translates its medium-specific failures into these variants
/// before returning, so callers never branch on backend identity. Use
/// [`StoreError::kind`] to match on the canonical error kind.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested key is absent.
    #[error("key not found: {key}")]
    KeyNotFound { key: String },

    /// Encoding or decoding a value failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from a filesystem-backed medium.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Medium-level fault reported by a storage service.
    #[error("{backend} backend error: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    /// The key cannot be represented on this backend's medium.
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// The write lease for a key could not be obtained.
    #[error("failed to acquire lock for {key}: {reason}")]
    LockAcquisition { key: String, reason: String },

    /// The write lease for a key could not be released.
    ///
    /// Returned only when the guarded operation itself succeeded, so the
    /// write has been applied.
    #[error("failed to release lock for {key}: {reason}")]
    LockRelease { key: String, reason: String },

    /// A required construction argument is missing or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Canonical error kinds shared by every backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    KeyNotFound,
    Serialization,
    Backend,
    LockAcquisition,
    LockRelease,
    Configuration,
}

impl StoreError {
    /// Build a [`StoreError::KeyNotFound`] for `key`.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }

    /// Build a [`StoreError::Backend`] from any displayable fault.
    pub fn backend(backend: &'static str, err: impl fmt::Display) -> Self {
        Self::Backend {
            backend,
            message: err.to_string(),
        }
    }

    /// The canonical kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::KeyNotFound { .. } => ErrorKind::KeyNotFound,
            Self::Serialization(_) => ErrorKind::Serialization,
            Self::Io(_) | Self::Backend { .. } | Self::InvalidKey { .. } => ErrorKind::Backend,
            Self::LockAcquisition { .. } => ErrorKind::LockAcquisition,
            Self::LockRelease { .. } => ErrorKind::LockRelease,
            Self::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// Returns `true` for [`ErrorKind::KeyNotFound`].
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::KeyNotFound
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
