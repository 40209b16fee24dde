//! In-process lock service for tests and single-process deployments.
//!
//! [`InMemoryLockService`] keeps leases in a `HashMap` behind a `Mutex`. It
//! enforces the same exclusivity and TTL-expiry rules as a networked
//! coordination service, so decorators can be tested without one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{LockError, LockResult};
use crate::traits::{new_token, Lease, LockService};

#[derive(Debug)]
struct Grant {
    token: String,
    expires_at: Instant,
}

/// An in-memory implementation of [`LockService`].
#[derive(Debug)]
pub struct InMemoryLockService {
    grants: Mutex<HashMap<String, Grant>>,
    available: AtomicBool,
}

impl InMemoryLockService {
    /// Create a service with no leases outstanding.
    pub fn new() -> Self {
        Self {
            grants: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Whether an unexpired lease on `name` exists.
    pub fn is_held(&self, name: &str) -> bool {
        let grants = self.grants.lock().expect("lock poisoned");
        grants
            .get(name)
            .is_some_and(|g| g.expires_at > Instant::now())
    }

    /// Simulate the service going down (`false`) or coming back (`true`).
    ///
    /// While unavailable every call fails with [`LockError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> LockResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LockError::Unavailable("in-memory lock service offline".into()))
        }
    }
}

impl Default for InMemoryLockService {
    fn default() -> Self {
        Self::new()
    }
}

impl LockService for InMemoryLockService {
    fn acquire(&self, name: &str, ttl: Duration) -> LockResult<Lease> {
        self.check_available()?;
        let now = Instant::now();
        let mut grants = self.grants.lock().expect("lock poisoned");

        if let Some(existing) = grants.get(name) {
            if existing.expires_at > now {
                return Err(LockError::Held {
                    name: name.to_string(),
                });
            }
            debug!(name, "replacing expired lease");
        }

        let lease = Lease::new(name, new_token(), ttl);
        grants.insert(
            name.to_string(),
            Grant {
                token: lease.token().to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(lease)
    }

    fn release(&self, lease: &Lease) -> LockResult<()> {
        self.check_available()?;
        let now = Instant::now();
        let mut grants = self.grants.lock().expect("lock poisoned");

        match grants.get(lease.name()) {
            Some(g) if g.token == lease.token() && g.expires_at > now => {
                grants.remove(lease.name());
                Ok(())
            }
            _ => Err(LockError::Expired {
                name: lease.name().to_string(),
            }),
        }
    }
}
