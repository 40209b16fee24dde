//! [`S3Client`] on the AWS SDK.
//!
//! The SDK is async; [`AwsS3Client`] owns a single-threaded tokio runtime
//! and blocks on each request so the store API stays synchronous. Do not
//! call it from inside another tokio runtime.

use std::fmt;

use aws_config::BehaviorVersion;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, warn};

use stow_store::{StoreError, StoreResult};

use crate::client::{ListPage, S3Client};
use crate::config::S3ClientConfig;
use crate::error::S3ApiError;

/// S3 client backed by `aws-sdk-s3`.
pub struct AwsS3Client {
    client: aws_sdk_s3::Client,
    runtime: Runtime,
}

impl AwsS3Client {
    /// Build a client from the ambient AWS configuration (environment,
    /// profile files, instance metadata).
    pub fn from_env() -> StoreResult<Self> {
        let runtime = build_runtime()?;
        let sdk_config = runtime.block_on(aws_config::load_defaults(BehaviorVersion::latest()));
        debug!(region = ?sdk_config.region(), "aws s3 client from environment");
        Ok(Self {
            client: aws_sdk_s3::Client::new(&sdk_config),
            runtime,
        })
    }

    /// Build a client for an S3-compatible service at `config.endpoint`.
    ///
    /// Credentials still come from the ambient AWS configuration.
    pub fn connect(config: &S3ClientConfig) -> StoreResult<Self> {
        if config.endpoint.is_empty() {
            return Err(StoreError::Configuration("s3 endpoint not specified".into()));
        }
        if config.region.is_empty() {
            return Err(StoreError::Configuration("s3 region not specified".into()));
        }
        if !config.endpoint.starts_with("https://") {
            warn!(endpoint = %config.endpoint, "s3 endpoint is not using https");
        }

        let runtime = build_runtime()?;
        let sdk_config = runtime.block_on(
            aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(config.region.clone()))
                .load(),
        );
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .endpoint_url(config.endpoint.clone())
            .force_path_style(config.path_style)
            .build();

        debug!(
            endpoint = %config.endpoint,
            region = %config.region,
            path_style = config.path_style,
            "aws s3 client for custom endpoint"
        );
        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            runtime,
        })
    }

    /// Wrap an already configured SDK client.
    pub fn from_client(client: aws_sdk_s3::Client) -> StoreResult<Self> {
        Ok(Self {
            client,
            runtime: build_runtime()?,
        })
    }
}

fn build_runtime() -> StoreResult<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(StoreError::Io)
}

fn api_error<E>(err: SdkError<E, HttpResponse>) -> S3ApiError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let status = err.raw_response().map(|raw| raw.status().as_u16());
    S3ApiError {
        code: err.code().map(str::to_string),
        status,
        message: DisplayErrorContext(&err).to_string(),
    }
}

impl fmt::Debug for AwsS3Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsS3Client").finish_non_exhaustive()
    }
}

impl S3Client for AwsS3Client {
    fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), S3ApiError> {
        self.runtime.block_on(async {
            self.client
                .put_object()
                .bucket(bucket)
                .key(key)
                .body(ByteStream::from(body))
                .send()
                .await
                .map_err(api_error)?;
            Ok(())
        })
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, S3ApiError> {
        self.runtime.block_on(async {
            let output = self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(api_error)?;
            let body = output
                .body
                .collect()
                .await
                .map_err(|e| S3ApiError::transport(format!("reading object body: {e}")))?;
            Ok(body.into_bytes().to_vec())
        })
    }

    fn head_object(&self, bucket: &str, key: &str) -> Result<(), S3ApiError> {
        self.runtime.block_on(async {
            self.client
                .head_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(api_error)?;
            Ok(())
        })
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), S3ApiError> {
        self.runtime.block_on(async {
            self.client
                .delete_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(api_error)?;
            Ok(())
        })
    }

    fn list_objects_v2(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ListPage, S3ApiError> {
        self.runtime.block_on(async {
            let output = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.map(str::to_string))
                .send()
                .await
                .map_err(api_error)?;
            let keys = output
                .contents()
                .iter()
                .filter_map(|object| object.key().map(str::to_string))
                .collect();
            let next_token = if output.is_truncated().unwrap_or(false) {
                output.next_continuation_token().map(str::to_string)
            } else {
                None
            };
            Ok(ListPage { keys, next_token })
        })
    }
}
