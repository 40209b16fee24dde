//! Typed key/value persistence over interchangeable storage backends.
//!
//! Application code is written against the [`Store`] trait; which medium
//! holds the data (memory, a local directory, an object-storage URL, or an
//! S3-compatible bucket) is chosen once at construction, either directly or
//! from a [`StowConfig`] via [`open_store`]. Writes can be serialized across
//! processes by wrapping any store in a [`MutexStore`].
//!
//! ```no_run
//! use stow::{open_store, StoreExt, StowConfig};
//!
//! let config = StowConfig::from_toml_str(r#"
//!     [backend]
//!     type = "filesystem"
//!     root = "/var/lib/app"
//! "#)?;
//! let store = open_store(&config)?;
//! store.set_json("user", &"john")?;
//! # Ok::<(), stow::StoreError>(())
//! ```

pub mod config;
pub mod factory;

pub use config::{BackendConfig, LockConfig, StowConfig};
pub use factory::{open_backend, open_locked_store, open_store};

// Re-export the building blocks
pub use stow_lock::{
    InMemoryLockService, Lease, LockError, LockService, MutexConfig, MutexStore, RedisLockService,
};
pub use stow_object::{BlobKeys, BlobStore};
pub use stow_s3::{S3ApiError, S3Client, S3ClientConfig, S3Config, S3Store};
pub use stow_store::{
    validate_key, ErrorKind, FsStore, Json, MemoryStore, Serializable, Store, StoreError,
    StoreExt, StoreResult,
};
