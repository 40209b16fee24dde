//! Distributed write locking for stow stores.
//!
//! [`MutexStore`] wraps any [`Store`](stow_store::Store) and serializes
//! writes to each key across processes by holding a lease from an external
//! coordination service for the duration of the write.
//!
//! # Architecture
//!
//! - A **lease** is a time-bounded exclusive claim on one name. Its TTL is
//!   the only deadlock-avoidance mechanism: a crashed holder's lease expires
//!   on its own.
//! - The **lock service** grants and releases leases. Acquisition fails fast
//!   instead of waiting; there is no retry or backoff.
//! - The **decorator** implements the same `Store` trait it wraps, so it
//!   stacks with any backend or other decorator.
//!
//! # Modules
//!
//! - [`error`] — Error types for lock operations
//! - [`traits`] — The [`LockService`] trait and [`Lease`]
//! - [`memory`] — In-process [`InMemoryLockService`] with TTL expiry
//! - [`mutex`] — The [`MutexStore`] decorator
//! - `redis_lock` — [`RedisLockService`] (feature `redis`)

pub mod error;
pub mod memory;
pub mod mutex;
#[cfg(feature = "redis")]
pub mod redis_lock;
pub mod traits;

pub use error::{LockError, LockResult};
pub use memory::InMemoryLockService;
pub use mutex::{MutexConfig, MutexStore};
#[cfg(feature = "redis")]
pub use redis_lock::RedisLockService;
pub use traits::{Lease, LockService};
