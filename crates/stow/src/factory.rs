//! Build stores from [`StowConfig`].

use std::sync::Arc;

use tracing::debug;

use stow_lock::{LockService, MutexStore, RedisLockService};
use stow_object::BlobStore;
use stow_s3::S3Store;
use stow_store::{FsStore, MemoryStore, Store, StoreError, StoreResult};

use crate::config::{BackendConfig, StowConfig};

/// Open the backend described by `config`, without any lock layer.
pub fn open_backend(config: &BackendConfig) -> StoreResult<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match config {
        BackendConfig::Memory => Arc::new(MemoryStore::new()),
        BackendConfig::Filesystem { root } => Arc::new(FsStore::new(root)?),
        BackendConfig::ObjectStorage { url } => Arc::new(BlobStore::open(url)?),
        BackendConfig::S3(s3) => Arc::new(S3Store::new(s3.clone(), None)?),
    };
    debug!(backend = ?config, "opened backend");
    Ok(store)
}

/// Open the configured backend, wrapped in a [`MutexStore`] over Redis when
/// `config.lock` is set.
pub fn open_store(config: &StowConfig) -> StoreResult<Arc<dyn Store>> {
    let backend = open_backend(&config.backend)?;
    let Some(lock) = &config.lock else {
        return Ok(backend);
    };
    let locks = RedisLockService::open(&lock.redis_url)
        .map_err(|e| StoreError::Configuration(format!("lock service: {e}")))?;
    Ok(Arc::new(MutexStore::with_config(
        backend,
        locks,
        lock.mutex_config(),
    )?))
}

/// Open the configured backend and always wrap it in a [`MutexStore`] over
/// `locks`. The lease TTL comes from `config.lock`, or the default.
pub fn open_locked_store<L>(config: &StowConfig, locks: L) -> StoreResult<Arc<dyn Store>>
where
    L: LockService + 'static,
{
    let backend = open_backend(&config.backend)?;
    let mutex_config = config
        .lock
        .as_ref()
        .map(|lock| lock.mutex_config())
        .unwrap_or_default();
    Ok(Arc::new(MutexStore::with_config(backend, locks, mutex_config)?))
}
