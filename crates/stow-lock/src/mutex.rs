//! Write-serializing decorator over any [`Store`].
//!
//! `set` and `del` run inside a lease named after the target key; `get` and
//! `list` pass straight through. Only one writer per key proceeds at a time,
//! cluster-wide; writes to distinct keys never contend.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use stow_store::{Serializable, Store, StoreError, StoreResult};
use tracing::{debug, warn};

use crate::error::LockResult;
use crate::traits::{Lease, LockService};

/// Settings for [`MutexStore`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutexConfig {
    /// Lease time-to-live. A holder that crashes blocks other writers of the
    /// same key for at most this long.
    pub ttl: Duration,
}

impl MutexConfig {
    /// Check the settings before use.
    pub fn validate(&self) -> StoreResult<()> {
        if self.ttl.is_zero() {
            return Err(StoreError::Configuration(
                "lease ttl must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for MutexConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(8),
        }
    }
}

/// Releases its lease when dropped unless released explicitly.
///
/// Covers unwinding out of a delegated operation; the normal path calls
/// [`LeaseGuard::release`] to observe the outcome.
struct LeaseGuard<'a, L: LockService + ?Sized> {
    locks: &'a L,
    lease: Option<Lease>,
}

impl<'a, L: LockService + ?Sized> LeaseGuard<'a, L> {
    fn new(locks: &'a L, lease: Lease) -> Self {
        Self {
            locks,
            lease: Some(lease),
        }
    }

    fn release(mut self) -> LockResult<()> {
        match self.lease.take() {
            Some(lease) => self.locks.release(&lease),
            None => Ok(()),
        }
    }
}

impl<L: LockService + ?Sized> Drop for LeaseGuard<'_, L> {
    fn drop(&mut self) {
        if let Some(lease) = self.lease.take() {
            if let Err(e) = self.locks.release(&lease) {
                warn!(name = lease.name(), error = %e, "failed to release lease during unwind");
            }
        }
    }
}

/// A [`Store`] whose writes are guarded by leases from a [`LockService`].
///
/// Acquisition never waits: if the key's lease is held elsewhere or the
/// service is unreachable the call fails immediately with
/// [`StoreError::LockAcquisition`]. Callers wanting retry wrap the call
/// themselves.
///
/// The lease is released on every exit path. Errors are reported as:
/// - the delegated error when the wrapped store fails (a release failure in
///   that case is logged, not returned);
/// - [`StoreError::LockRelease`] when the wrapped store succeeded but the
///   release did not; the write has been applied.
pub struct MutexStore<S, L> {
    inner: S,
    locks: L,
    config: MutexConfig,
}

impl<S: Store, L: LockService> MutexStore<S, L> {
    /// Guard `inner` with leases from `locks`, using the default TTL.
    pub fn new(inner: S, locks: L) -> Self {
        Self {
            inner,
            locks,
            config: MutexConfig::default(),
        }
    }

    /// Guard `inner` with leases from `locks` using `config`.
    ///
    /// A zero TTL fails with [`StoreError::Configuration`]: such a lease
    /// would expire as it is granted.
    pub fn with_config(inner: S, locks: L, config: MutexConfig) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self {
            inner,
            locks,
            config,
        })
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// The lock service issuing leases.
    pub fn locks(&self) -> &L {
        &self.locks
    }

    /// Lease TTL in effect.
    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    fn guarded(&self, key: &str, op: impl FnOnce(&S) -> StoreResult<()>) -> StoreResult<()> {
        let lease = self
            .locks
            .acquire(key, self.config.ttl)
            .map_err(|e| StoreError::LockAcquisition {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        debug!(key, "lease acquired");

        let guard = LeaseGuard::new(&self.locks, lease);
        let outcome = op(&self.inner);
        let released = guard.release();

        match (outcome, released) {
            (Ok(()), Ok(())) => {
                debug!(key, "lease released");
                Ok(())
            }
            (Ok(()), Err(e)) => Err(StoreError::LockRelease {
                key: key.to_string(),
                reason: e.to_string(),
            }),
            (Err(op_err), Ok(())) => Err(op_err),
            (Err(op_err), Err(e)) => {
                warn!(key, error = %e, "failed to release lease after failed write");
                Err(op_err)
            }
        }
    }
}

impl<S: Store, L: LockService> Store for MutexStore<S, L> {
    fn get(&self, key: &str, dst: &mut dyn Serializable) -> StoreResult<()> {
        self.inner.get(key, dst)
    }

    fn set(&self, key: &str, val: &dyn Serializable) -> StoreResult<()> {
        self.guarded(key, |inner| inner.set(key, val))
    }

    fn del(&self, key: &str) -> StoreResult<()> {
        self.guarded(key, |inner| inner.del(key))
    }

    fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
        self.inner.list(prefix)
    }
}

impl<S, L> std::fmt::Debug for MutexStore<S, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutexStore")
            .field("ttl", &self.config.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LockError;
    use crate::memory::InMemoryLockService;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use stow_store::{ErrorKind, Json, MemoryStore, StoreExt};

    /// Wraps a store and records how many writes ever overlapped.
    struct OverlapProbe {
        inner: MemoryStore,
        active: AtomicUsize,
        max_active: AtomicUsize,
        order: Mutex<Vec<u32>>,
    }

    impl OverlapProbe {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
                order: Mutex::new(Vec::new()),
            }
        }
    }

    impl Store for OverlapProbe {
        fn get(&self, key: &str, dst: &mut dyn Serializable) -> StoreResult<()> {
            self.inner.get(key, dst)
        }

        fn set(&self, key: &str, val: &dyn Serializable) -> StoreResult<()> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(2));
            let result = self.inner.set(key, val);
            if result.is_ok() {
                let mut written = Json(0u32);
                if written.deserialize(&val.serialize()?).is_ok() {
                    self.order.lock().unwrap().push(written.0);
                }
            }
            self.active.fetch_sub(1, Ordering::SeqCst);
            result
        }

        fn del(&self, key: &str) -> StoreResult<()> {
            self.inner.del(key)
        }

        fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
            self.inner.list(prefix)
        }
    }

    /// A lock service whose releases always fail.
    struct SlipperyLocks(InMemoryLockService);

    impl LockService for SlipperyLocks {
        fn acquire(&self, name: &str, ttl: Duration) -> LockResult<Lease> {
            self.0.acquire(name, ttl)
        }

        fn release(&self, lease: &Lease) -> LockResult<()> {
            Err(LockError::Unavailable(format!("cannot release {}", lease.name())))
        }
    }

    struct Unencodable;

    impl Serializable for Unencodable {
        fn serialize(&self) -> StoreResult<Vec<u8>> {
            Err(StoreError::Serialization("refusing to encode".into()))
        }

        fn deserialize(&mut self, _data: &[u8]) -> StoreResult<()> {
            Ok(())
        }
    }

    fn guarded_memory() -> (Arc<InMemoryLockService>, MutexStore<MemoryStore, Arc<InMemoryLockService>>) {
        let locks = Arc::new(InMemoryLockService::new());
        let store = MutexStore::new(MemoryStore::new(), Arc::clone(&locks));
        (locks, store)
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    #[test]
    fn zero_ttl_is_configuration_error() {
        let config = MutexConfig { ttl: Duration::ZERO };
        let err = MutexStore::with_config(MemoryStore::new(), InMemoryLockService::new(), config)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn configured_ttl_is_applied() {
        let config = MutexConfig {
            ttl: Duration::from_millis(1500),
        };
        let store =
            MutexStore::with_config(MemoryStore::new(), InMemoryLockService::new(), config).unwrap();
        assert_eq!(store.ttl(), Duration::from_millis(1500));
        store.set_json("user", &1u32).unwrap();
        assert!(!store.locks().is_held("user"));
    }

    // -----------------------------------------------------------------------
    // Pass-through behaviour
    // -----------------------------------------------------------------------

    #[test]
    fn passes_conformance_checks() {
        let (locks, store) = guarded_memory();
        stow_store::conformance::check_all(&store);
        assert!(!locks.is_held("user"));
    }

    #[test]
    fn reads_do_not_take_leases() {
        let (locks, store) = guarded_memory();
        store.set_json("user", &1u32).unwrap();

        let _held = locks.acquire("user", Duration::from_secs(30)).unwrap();
        assert_eq!(store.get_json::<u32>("user").unwrap(), 1);
        assert_eq!(store.list("u").unwrap(), vec!["user"]);
    }

    // -----------------------------------------------------------------------
    // Acquisition failures
    // -----------------------------------------------------------------------

    #[test]
    fn held_key_fails_fast_without_writing() {
        let (locks, store) = guarded_memory();
        let held = locks.acquire("user", Duration::from_secs(30)).unwrap();

        let err = store.set_json("user", &1u32).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LockAcquisition);
        assert!(!store.inner().contains("user").unwrap());

        let err = store.del("user").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LockAcquisition);

        locks.release(&held).unwrap();
        store.set_json("user", &1u32).unwrap();
    }

    #[test]
    fn unreachable_service_is_lock_acquisition_error() {
        let (locks, store) = guarded_memory();
        locks.set_available(false);
        let err = store.set_json("user", &1u32).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LockAcquisition);
    }

    #[test]
    fn other_keys_stay_writable_while_one_is_held() {
        let (locks, store) = guarded_memory();
        let _held = locks.acquire("a", Duration::from_secs(30)).unwrap();
        store.set_json("b", &2u32).unwrap();
        assert_eq!(store.get_json::<u32>("b").unwrap(), 2);
    }

    #[test]
    fn crashed_holder_blocks_for_at_most_one_ttl() {
        let (locks, store) = guarded_memory();
        // Acquired and never released, as if the holder crashed.
        let _abandoned = locks.acquire("user", Duration::from_millis(30)).unwrap();
        assert!(store.set_json("user", &1u32).is_err());

        thread::sleep(Duration::from_millis(60));
        store.set_json("user", &1u32).unwrap();
    }

    // -----------------------------------------------------------------------
    // Release on every exit path
    // -----------------------------------------------------------------------

    #[test]
    fn lease_released_after_failed_write() {
        let (locks, store) = guarded_memory();
        let err = store.set("user", &Unencodable).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);

        assert!(!locks.is_held("user"));
        let claimant = locks.acquire("user", Duration::from_secs(30));
        assert!(claimant.is_ok());
    }

    #[test]
    fn lease_released_after_failed_delete() {
        let (locks, store) = guarded_memory();
        let err = store.del("missing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyNotFound);
        assert!(!locks.is_held("missing"));
    }

    #[test]
    fn lease_released_when_write_panics() {
        struct Explodes;
        impl Serializable for Explodes {
            fn serialize(&self) -> StoreResult<Vec<u8>> {
                panic!("boom");
            }
            fn deserialize(&mut self, _data: &[u8]) -> StoreResult<()> {
                Ok(())
            }
        }

        let (locks, store) = guarded_memory();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = store.set("user", &Explodes);
        }));
        assert!(result.is_err());
        assert!(!locks.is_held("user"));
    }

    #[test]
    fn release_failure_after_success_is_reported() {
        let store = MutexStore::new(MemoryStore::new(), SlipperyLocks(InMemoryLockService::new()));
        let err = store.set_json("user", &1u32).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LockRelease);
        // The write itself went through.
        assert_eq!(store.get_json::<u32>("user").unwrap(), 1);
    }

    #[test]
    fn delegated_error_wins_over_release_failure() {
        let store = MutexStore::new(MemoryStore::new(), SlipperyLocks(InMemoryLockService::new()));
        let err = store.set("user", &Unencodable).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);
    }

    // -----------------------------------------------------------------------
    // Exclusivity
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_writers_of_one_key_never_overlap() {
        let locks = Arc::new(InMemoryLockService::new());
        let store = Arc::new(MutexStore::new(OverlapProbe::new(), Arc::clone(&locks)));

        let handles: Vec<_> = (1..=6u32)
            .map(|n| {
                let store = Arc::clone(&store);
                thread::spawn(move || loop {
                    match store.set_json("shared", &n) {
                        Ok(()) => break,
                        Err(e) if e.kind() == ErrorKind::LockAcquisition => thread::yield_now(),
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }

        let probe = store.inner();
        assert_eq!(probe.max_active.load(Ordering::SeqCst), 1);

        let order = probe.order.lock().unwrap().clone();
        assert_eq!(order.len(), 6);
        let last = *order.last().unwrap();
        assert_eq!(store.get_json::<u32>("shared").unwrap(), last);
    }

    #[test]
    fn debug_shows_ttl() {
        let (_locks, store) = guarded_memory();
        let debug = format!("{store:?}");
        assert!(debug.contains("MutexStore"));
        assert!(debug.contains("ttl"));
        assert_eq!(store.ttl(), Duration::from_secs(8));
    }
}
