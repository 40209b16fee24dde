//! Generic object-storage backend for stow.
//!
//! [`BlobStore`] maps the stow [`Store`](stow_store::Store) operations onto
//! any [`object_store::ObjectStore`] medium: local files, memory, or a cloud
//! bucket, chosen by URL (`file:///srv/data`, `memory:///`,
//! `s3://bucket/prefix`).

pub mod blob;

pub use blob::{BlobKeys, BlobStore};
