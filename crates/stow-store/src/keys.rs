//! Key validation shared by path-mapped backends.
//!
//! Filesystem, object-storage and S3 backends map keys onto hierarchical
//! paths. A key accepted here is a non-empty, relative, `/`-separated path
//! whose segments are neither empty nor `.`/`..`, so it can never escape the
//! backend's root or namespace.

use crate::error::{StoreError, StoreResult};

/// Check that `key` is a safe relative path.
pub fn validate_key(key: &str) -> StoreResult<()> {
    let reject = |reason: &str| {
        Err(StoreError::InvalidKey {
            key: key.to_string(),
            reason: reason.to_string(),
        })
    };

    if key.is_empty() {
        return reject("key is empty");
    }
    if key.contains('\0') {
        return reject("key contains a NUL byte");
    }
    if key.starts_with('/') {
        return reject("key must be relative");
    }
    for segment in key.split('/') {
        match segment {
            "" => return reject("key contains an empty path segment"),
            "." | ".." => return reject("key contains a relative path segment"),
            _ => {}
        }
    }
    Ok(())
}
