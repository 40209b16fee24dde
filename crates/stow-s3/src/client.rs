//! The low-level S3 capability the store is written against.
//!
//! Any S3-compatible client can back an [`S3Store`](crate::S3Store) by
//! implementing [`S3Client`]: the AWS SDK (feature `aws`), another SDK, or an
//! in-process fake in tests.

use crate::error::S3ApiError;

/// One page of a `ListObjectsV2` response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Full object keys on this page, namespace prefix included.
    pub keys: Vec<String>,
    /// Token for the next page; `None` when the listing is complete.
    pub next_token: Option<String>,
}

/// Blocking subset of the S3 object API.
pub trait S3Client: Send + Sync {
    /// Store `body` as the whole object at `key`.
    fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), S3ApiError>;

    /// Fetch the whole object at `key`.
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, S3ApiError>;

    /// Check that the object at `key` exists.
    fn head_object(&self, bucket: &str, key: &str) -> Result<(), S3ApiError>;

    /// Remove the object at `key`. S3 reports success for absent keys.
    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), S3ApiError>;

    /// List object keys starting with `prefix`, resuming at `continuation`.
    fn list_objects_v2(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ListPage, S3ApiError>;
}
