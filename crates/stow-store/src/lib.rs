//! Typed key/value persistence over interchangeable storage backends.
//!
//! Callers program against the [`Store`] trait and pick a backend at
//! construction time. Values are opaque bytes produced by the
//! [`Serializable`] contract; the store never inspects them.
//!
//! # Storage Backends
//!
//! All backends implement the [`Store`] trait:
//!
//! - [`MemoryStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsStore`] -- one file per key under a root directory
//!
//! Object-storage and S3-compatible backends live in their own crates, as
//! does the distributed write-lock decorator.
//!
//! # Design Rules
//!
//! 1. Every backend "not found" signal becomes [`StoreError::KeyNotFound`].
//! 2. Writes are whole-value: a failed `set` never exposes a partial value.
//! 3. Namespaces are added before any medium call and stripped from listed keys.
//! 4. No retries and no silent recovery; all errors reach the caller.
//! 5. Missing construction arguments fail eagerly with
//!    [`StoreError::Configuration`].

pub mod codec;
pub mod error;
pub mod fs;
pub mod keys;
pub mod memory;
pub mod traits;

#[cfg(any(test, feature = "testing"))]
pub mod conformance;

// Re-export primary types at crate root for ergonomic imports.
pub use codec::{Json, Serializable};
pub use error::{ErrorKind, StoreError, StoreResult};
pub use fs::FsStore;
pub use keys::validate_key;
pub use memory::MemoryStore;
pub use traits::{Store, StoreExt};
