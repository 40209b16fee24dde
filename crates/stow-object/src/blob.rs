//! The [`BlobStore`] backend and its lazy key listing.

use std::fmt;
use std::sync::Arc;

use futures_util::stream::{BoxStream, StreamExt};
use object_store::path::Path;
use object_store::{ObjectMeta, ObjectStore, PutPayload};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;
use url::Url;

use stow_store::{validate_key, Serializable, Store, StoreError, StoreResult};

const BACKEND: &str = "object-storage";

/// A store over an [`ObjectStore`] medium.
///
/// Each key is one object at `<base>/<key>`, where `base` is the path part
/// of the URL the store was opened with.
///
/// Deleting an absent key follows the medium: local files report
/// [`StoreError::KeyNotFound`], while memory and cloud buckets treat it as a
/// successful no-op.
pub struct BlobStore {
    inner: Arc<dyn ObjectStore>,
    base: Path,
    runtime: Runtime,
}

impl BlobStore {
    /// Open the medium addressed by `url`.
    ///
    /// For cloud schemes, settings such as `AWS_REGION` or
    /// `AWS_ACCESS_KEY_ID` are taken from the environment.
    pub fn open(url: &str) -> StoreResult<Self> {
        if url.is_empty() {
            return Err(StoreError::Configuration(
                "object storage url not specified".into(),
            ));
        }
        let parsed = Url::parse(url)
            .map_err(|e| StoreError::Configuration(format!("invalid url {url:?}: {e}")))?;
        let env = std::env::vars().map(|(k, v)| (k.to_ascii_lowercase(), v));
        let (inner, base) = object_store::parse_url_opts(&parsed, env)
            .map_err(|e| StoreError::Configuration(format!("unsupported url {url:?}: {e}")))?;
        debug!(scheme = parsed.scheme(), base = %base, "opened object store");
        Self::with_store(Arc::from(inner), base)
    }

    /// Wrap an already constructed medium, rooting keys at `base`.
    pub fn with_store(inner: Arc<dyn ObjectStore>, base: Path) -> StoreResult<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(StoreError::Io)?;
        Ok(Self {
            inner,
            base,
            runtime,
        })
    }

    /// Path prefixed to every key.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Lazily iterate keys starting with `prefix`, in medium order.
    ///
    /// Pages are fetched from the medium as the iterator advances.
    pub fn keys(&self, prefix: &str) -> BlobKeys<'_> {
        let strip = self.base_prefix();
        let full_prefix = format!("{strip}{prefix}");
        // Media list by whole path segments; list the deepest complete
        // directory and filter the remainder by string.
        let dir = match full_prefix.rfind('/') {
            Some(idx) => Path::from_iter(full_prefix[..idx].split('/')),
            None => Path::default(),
        };
        let stream = if dir.as_ref().is_empty() {
            self.inner.list(None)
        } else {
            self.inner.list(Some(&dir))
        };
        BlobKeys {
            stream,
            runtime: &self.runtime,
            strip,
            full_prefix,
        }
    }

    fn base_prefix(&self) -> String {
        if self.base.as_ref().is_empty() {
            String::new()
        } else {
            format!("{}/", self.base)
        }
    }

    fn location(&self, key: &str) -> StoreResult<Path> {
        validate_key(key)?;
        Path::parse(format!("{}{key}", self.base_prefix())).map_err(|e| StoreError::InvalidKey {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }
}

fn map_err(key: &str, err: object_store::Error) -> StoreError {
    match err {
        object_store::Error::NotFound { .. } => StoreError::not_found(key),
        other => StoreError::backend(BACKEND, other),
    }
}

impl fmt::Debug for BlobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobStore")
            .field("medium", &self.inner.to_string())
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl Store for BlobStore {
    fn get(&self, key: &str, dst: &mut dyn Serializable) -> StoreResult<()> {
        let location = self.location(key)?;
        let data = self.runtime.block_on(async {
            let result = self.inner.get(&location).await?;
            result.bytes().await
        });
        let data = data.map_err(|e| map_err(key, e))?;
        dst.deserialize(&data)
    }

    fn set(&self, key: &str, val: &dyn Serializable) -> StoreResult<()> {
        let location = self.location(key)?;
        let data = val.serialize()?;
        let len = data.len();
        self.runtime
            .block_on(self.inner.put(&location, PutPayload::from(data)))
            .map_err(|e| map_err(key, e))?;
        debug!(key, location = %location, len, "blob put");
        Ok(())
    }

    fn del(&self, key: &str) -> StoreResult<()> {
        let location = self.location(key)?;
        self.runtime
            .block_on(self.inner.delete(&location))
            .map_err(|e| map_err(key, e))?;
        debug!(key, location = %location, "blob delete");
        Ok(())
    }

    fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let mut keys = self.keys(prefix).collect::<StoreResult<Vec<_>>>()?;
        keys.sort();
        Ok(keys)
    }
}

/// Lazy iterator over keys of a [`BlobStore`], from [`BlobStore::keys`].
pub struct BlobKeys<'a> {
    stream: BoxStream<'a, object_store::Result<ObjectMeta>>,
    runtime: &'a Runtime,
    strip: String,
    full_prefix: String,
}

impl Iterator for BlobKeys<'_> {
    type Item = StoreResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let meta = match self.runtime.block_on(self.stream.next())? {
                Ok(meta) => meta,
                Err(e) => return Some(Err(StoreError::backend(BACKEND, e))),
            };
            let location = meta.location.as_ref();
            if !location.starts_with(&self.full_prefix) {
                continue;
            }
            let key = location.strip_prefix(&self.strip).unwrap_or(location);
            return Some(Ok(key.to_string()));
        }
    }
}

impl fmt::Debug for BlobKeys<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobKeys")
            .field("prefix", &self.full_prefix)
            .finish_non_exhaustive()
    }
}
