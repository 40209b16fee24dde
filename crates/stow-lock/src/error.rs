//! Error types for lock coordination.

use thiserror::Error;

/// Errors reported by a lock coordination service.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another claimant currently holds the lease.
    #[error("lease already held: {name}")]
    Held { name: String },

    /// The lease expired or was taken over before it was released.
    #[error("lease no longer held: {name}")]
    Expired { name: String },

    /// The coordination service could not be reached or refused the request.
    #[error("lock service unavailable: {0}")]
    Unavailable(String),
}

/// Convenience type alias for lock operations.
pub type LockResult<T> = std::result::Result<T, LockError>;
