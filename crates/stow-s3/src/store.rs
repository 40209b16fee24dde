//! The S3-compatible [`Store`] backend.
//!
//! Objects live at `<namespace>/<key>` inside one bucket, so several stores
//! (or applications) can share a bucket without seeing each other's keys.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use stow_store::{validate_key, Serializable, Store, StoreError, StoreResult};

use crate::client::S3Client;
use crate::config::S3Config;
use crate::error::S3ApiError;

const BACKEND: &str = "s3";

/// A store keeping each value as one object in an S3 bucket.
///
/// Deleting an absent key fails with [`StoreError::KeyNotFound`]: S3's own
/// `DeleteObject` succeeds for absent keys, so `del` checks existence with
/// `HeadObject` first. The two requests are not atomic: when another client
/// deletes the key between them, `del` still reports success. Wrap the store
/// in a lock decorator when that distinction matters.
pub struct S3Store {
    client: Arc<dyn S3Client>,
    bucket: String,
    namespace: String,
}

impl S3Store {
    /// Open a store for `config`.
    ///
    /// With `client` set, all requests go through it. Otherwise an AWS SDK
    /// client is built: from `endpoint`/`region` when an endpoint is
    /// configured, else from the ambient AWS environment. Without the `aws`
    /// feature a client must be supplied.
    pub fn new(config: S3Config, client: Option<Arc<dyn S3Client>>) -> StoreResult<Self> {
        if config.bucket.is_empty() {
            return Err(StoreError::Configuration("s3 bucket not specified".into()));
        }
        let namespace = config.namespace.trim_matches('/').to_string();
        if namespace.is_empty() {
            return Err(StoreError::Configuration(
                "s3 namespace not specified".into(),
            ));
        }

        let client = match client {
            Some(client) => client,
            None => default_client(&config)?,
        };

        debug!(bucket = %config.bucket, namespace = %namespace, "opened s3 store");
        Ok(Self {
            client,
            bucket: config.bucket,
            namespace,
        })
    }

    /// Bucket holding this store's objects.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Namespace prefixed to every key, without its trailing `/`.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn object_key(&self, key: &str) -> StoreResult<String> {
        validate_key(key)?;
        Ok(format!("{}/{}", self.namespace, key))
    }

    fn map_err(key: &str, err: S3ApiError) -> StoreError {
        if err.is_not_found() {
            StoreError::not_found(key)
        } else {
            StoreError::backend(BACKEND, err)
        }
    }
}

#[cfg(feature = "aws")]
fn default_client(config: &S3Config) -> StoreResult<Arc<dyn S3Client>> {
    let client = match config.client_config() {
        Some(client_config) => crate::aws::AwsS3Client::connect(&client_config)?,
        None => crate::aws::AwsS3Client::from_env()?,
    };
    Ok(Arc::new(client))
}

#[cfg(not(feature = "aws"))]
fn default_client(_config: &S3Config) -> StoreResult<Arc<dyn S3Client>> {
    Err(StoreError::Configuration(
        "no s3 client supplied and the `aws` feature is disabled".into(),
    ))
}

impl fmt::Debug for S3Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Store")
            .field("bucket", &self.bucket)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl Store for S3Store {
    fn get(&self, key: &str, dst: &mut dyn Serializable) -> StoreResult<()> {
        let object_key = self.object_key(key)?;
        let data = self
            .client
            .get_object(&self.bucket, &object_key)
            .map_err(|e| Self::map_err(key, e))?;
        dst.deserialize(&data)
    }

    fn set(&self, key: &str, val: &dyn Serializable) -> StoreResult<()> {
        let object_key = self.object_key(key)?;
        let data = val.serialize()?;
        let len = data.len();
        self.client
            .put_object(&self.bucket, &object_key, data)
            .map_err(|e| Self::map_err(key, e))?;
        debug!(bucket = %self.bucket, key = %object_key, len, "s3 put");
        Ok(())
    }

    fn del(&self, key: &str) -> StoreResult<()> {
        let object_key = self.object_key(key)?;
        self.client
            .head_object(&self.bucket, &object_key)
            .map_err(|e| Self::map_err(key, e))?;
        self.client
            .delete_object(&self.bucket, &object_key)
            .map_err(|e| Self::map_err(key, e))?;
        debug!(bucket = %self.bucket, key = %object_key, "s3 delete");
        Ok(())
    }

    fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let ns_prefix = format!("{}/", self.namespace);
        let full_prefix = format!("{ns_prefix}{prefix}");

        let mut keys = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self
                .client
                .list_objects_v2(&self.bucket, &full_prefix, token.as_deref())
                .map_err(|e| StoreError::backend(BACKEND, e))?;
            keys.extend(
                page.keys
                    .into_iter()
                    .filter_map(|k| k.strip_prefix(&ns_prefix).map(str::to_string)),
            );
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        keys.sort();
        Ok(keys)
    }
}
