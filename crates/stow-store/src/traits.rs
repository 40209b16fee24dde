use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{JsonRef, JsonSlot, Serializable};
use crate::error::{StoreError, StoreResult};

/// Key/value persistence contract shared by every backend.
///
/// All implementations must satisfy these invariants:
/// - Within one store (and namespace), a key maps to at most one value.
/// - `set` is all-or-nothing: a failed write never leaves a truncated value
///   readable.
/// - Every medium-specific "not found" signal surfaces as
///   [`StoreError::KeyNotFound`].
/// - Namespacing is internal: keys passed in and keys returned by `list`
///   never carry a backend prefix.
/// - No retries and no silent recovery: every failure reaches the caller
///   with its kind preserved.
///
/// Implementations provide no cross-call atomicity. Concurrent writers of the
/// same key need a locking decorator.
pub trait Store: Send + Sync {
    /// Read the bytes stored under `key` and decode them into `dst`.
    fn get(&self, key: &str, dst: &mut dyn Serializable) -> StoreResult<()>;

    /// Encode `val` and store it under `key`, replacing any previous value.
    fn set(&self, key: &str, val: &dyn Serializable) -> StoreResult<()>;

    /// Remove the value stored under `key`.
    ///
    /// Whether deleting an absent key is an error is backend-specific; see
    /// each backend's documentation.
    fn del(&self, key: &str) -> StoreResult<()>;

    /// All keys starting with `prefix`, in unspecified order.
    ///
    /// Pass `""` to list every key. No match is an empty result, not an error.
    fn list(&self, prefix: &str) -> StoreResult<Vec<String>>;
}

impl<S: Store + ?Sized> Store for &S {
    fn get(&self, key: &str, dst: &mut dyn Serializable) -> StoreResult<()> {
        (**self).get(key, dst)
    }

    fn set(&self, key: &str, val: &dyn Serializable) -> StoreResult<()> {
        (**self).set(key, val)
    }

    fn del(&self, key: &str) -> StoreResult<()> {
        (**self).del(key)
    }

    fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
        (**self).list(prefix)
    }
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn get(&self, key: &str, dst: &mut dyn Serializable) -> StoreResult<()> {
        (**self).get(key, dst)
    }

    fn set(&self, key: &str, val: &dyn Serializable) -> StoreResult<()> {
        (**self).set(key, val)
    }

    fn del(&self, key: &str) -> StoreResult<()> {
        (**self).del(key)
    }

    fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
        (**self).list(prefix)
    }
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn get(&self, key: &str, dst: &mut dyn Serializable) -> StoreResult<()> {
        (**self).get(key, dst)
    }

    fn set(&self, key: &str, val: &dyn Serializable) -> StoreResult<()> {
        (**self).set(key, val)
    }

    fn del(&self, key: &str) -> StoreResult<()> {
        (**self).del(key)
    }

    fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
        (**self).list(prefix)
    }
}

/// Typed helpers available on every [`Store`].
pub trait StoreExt: Store {
    /// Read and JSON-decode the value under `key`.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> StoreResult<T> {
        let mut slot = JsonSlot(None);
        self.get(key, &mut slot)?;
        slot.0.ok_or_else(|| {
            StoreError::Serialization(format!("no value decoded for {key}"))
        })
    }

    /// JSON-encode `value` and store it under `key`.
    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> StoreResult<()> {
        self.set(key, &JsonRef(value))
    }

    /// Whether `key` currently holds a value.
    fn contains(&self, key: &str) -> StoreResult<bool> {
        let mut sink = Vec::<u8>::new();
        match self.get(key, &mut sink) {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl<S: Store + ?Sized> StoreExt for S {}
