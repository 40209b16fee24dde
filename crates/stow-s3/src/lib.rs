//! S3-compatible object storage backend for stow.
//!
//! [`S3Store`] keeps each value as one object at `<namespace>/<key>` in a
//! bucket. It talks to the service through the [`S3Client`] trait; with the
//! default `aws` feature, [`AwsS3Client`] provides an implementation on the
//! AWS SDK that also works against S3-compatible services via a custom
//! endpoint.
//!
//! # Modules
//!
//! - [`client`] — The [`S3Client`] capability and [`ListPage`]
//! - [`config`] — [`S3Config`] and [`S3ClientConfig`]
//! - [`error`] — [`S3ApiError`], the service-level error
//! - [`store`] — The [`S3Store`] backend
//! - `aws` — [`AwsS3Client`] (feature `aws`)

#[cfg(feature = "aws")]
pub mod aws;
pub mod client;
pub mod config;
pub mod error;
pub mod store;

#[cfg(test)]
mod testing;

#[cfg(feature = "aws")]
pub use aws::AwsS3Client;
pub use client::{ListPage, S3Client};
pub use config::{S3ClientConfig, S3Config};
pub use error::S3ApiError;
pub use store::S3Store;
