//! An in-process S3 service for tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::client::{ListPage, S3Client};
use crate::error::S3ApiError;

/// Fake S3 endpoint holding buckets in memory.
///
/// Mirrors the service behaviours the store depends on: `NoSuchKey` on get,
/// a bare 404 on head, idempotent delete and paginated listing.
pub struct FakeS3 {
    buckets: Mutex<HashMap<String, BTreeMap<String, Vec<u8>>>>,
    page_size: usize,
    offline: AtomicBool,
    list_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl FakeS3 {
    pub fn with_bucket(bucket: &str) -> Self {
        let mut buckets = HashMap::new();
        buckets.insert(bucket.to_string(), BTreeMap::new());
        Self {
            buckets: Mutex::new(buckets),
            page_size: 1000,
            offline: AtomicBool::new(false),
            list_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn object_keys(&self, bucket: &str) -> Vec<String> {
        let buckets = self.buckets.lock().expect("lock poisoned");
        buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    fn with_objects<T>(
        &self,
        bucket: &str,
        f: impl FnOnce(&mut BTreeMap<String, Vec<u8>>) -> Result<T, S3ApiError>,
    ) -> Result<T, S3ApiError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(S3ApiError::transport("connection refused"));
        }
        let mut buckets = self.buckets.lock().expect("lock poisoned");
        match buckets.get_mut(bucket) {
            Some(objects) => f(objects),
            None => Err(S3ApiError::service(
                "NoSuchBucket",
                404,
                format!("NoSuchBucket: {bucket}"),
            )),
        }
    }
}

impl S3Client for FakeS3 {
    fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), S3ApiError> {
        self.with_objects(bucket, |objects| {
            objects.insert(key.to_string(), body);
            Ok(())
        })
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, S3ApiError> {
        self.with_objects(bucket, |objects| {
            objects
                .get(key)
                .cloned()
                .ok_or_else(|| S3ApiError::service("NoSuchKey", 404, "NoSuchKey"))
        })
    }

    fn head_object(&self, bucket: &str, key: &str) -> Result<(), S3ApiError> {
        self.with_objects(bucket, |objects| {
            if objects.contains_key(key) {
                Ok(())
            } else {
                Err(S3ApiError {
                    code: None,
                    status: Some(404),
                    message: "404 Not Found".into(),
                })
            }
        })
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), S3ApiError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.with_objects(bucket, |objects| {
            objects.remove(key);
            Ok(())
        })
    }

    fn list_objects_v2(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ListPage, S3ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let page_size = self.page_size;
        self.with_objects(bucket, |objects| {
            let mut matching = objects
                .keys()
                .filter(|k| k.starts_with(prefix))
                .filter(|k| continuation.map_or(true, |after| k.as_str() > after));
            let keys: Vec<String> = matching.by_ref().take(page_size).cloned().collect();
            // The fake's token is simply the last key returned.
            let next_token = match (matching.next(), keys.last()) {
                (Some(_), Some(last)) => Some(last.clone()),
                _ => None,
            };
            Ok(ListPage { keys, next_token })
        })
    }
}
