//! The [`LockService`] capability and the [`Lease`] it grants.
//!
//! A coordination service hands out time-bounded exclusive claims on names.
//! Any backend (in-process, Redis, a consensus store) implements this trait.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::LockResult;

/// A granted, time-bounded claim on a single name.
///
/// The `token` identifies this particular grant, so a release only removes
/// the lease it was issued for even if the name has since been re-acquired
/// by someone else.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lease {
    name: String,
    token: String,
    ttl: Duration,
    acquired_at: Instant,
}

impl Lease {
    /// Build a lease record. Called by [`LockService`] implementations.
    pub fn new(name: impl Into<String>, token: impl Into<String>, ttl: Duration) -> Self {
        Self {
            name: name.into(),
            token: token.into(),
            ttl,
            acquired_at: Instant::now(),
        }
    }

    /// The claimed name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unique token for this grant.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Time-to-live requested at acquisition.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Local estimate of whether the TTL has run out.
    ///
    /// The coordination service is authoritative; this only reflects the
    /// holder's own clock.
    pub fn is_expired(&self) -> bool {
        self.acquired_at.elapsed() >= self.ttl
    }
}

/// External coordination service granting exclusive leases.
///
/// Implementations must guarantee that at most one unexpired lease exists per
/// name at any instant, and must never block indefinitely: a held name fails
/// fast with [`LockError::Held`](crate::LockError::Held).
pub trait LockService: Send + Sync {
    /// Claim `name` for at most `ttl`.
    fn acquire(&self, name: &str, ttl: Duration) -> LockResult<Lease>;

    /// Give up a lease obtained from [`acquire`](Self::acquire).
    ///
    /// Fails with [`LockError::Expired`](crate::LockError::Expired) when the
    /// lease is no longer held by this grant.
    fn release(&self, lease: &Lease) -> LockResult<()>;
}

impl<L: LockService + ?Sized> LockService for Arc<L> {
    fn acquire(&self, name: &str, ttl: Duration) -> LockResult<Lease> {
        (**self).acquire(name, ttl)
    }

    fn release(&self, lease: &Lease) -> LockResult<()> {
        (**self).release(lease)
    }
}

impl<L: LockService + ?Sized> LockService for Box<L> {
    fn acquire(&self, name: &str, ttl: Duration) -> LockResult<Lease> {
        (**self).acquire(name, ttl)
    }

    fn release(&self, lease: &Lease) -> LockResult<()> {
        (**self).release(lease)
    }
}

/// Generate a fresh lease token.
pub(crate) fn new_token() -> String {
    uuid::Uuid::new_v4().to_string()
}
