use serde::{Deserialize, Serialize};

/// Settings for an [`S3Store`](crate::S3Store).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Config {
    /// Bucket holding the stored objects. Required.
    pub bucket: String,
    /// Key namespace within the bucket. Required.
    pub namespace: String,
    /// Custom endpoint for S3-compatible services other than AWS.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Signing region; required together with `endpoint`.
    #[serde(default)]
    pub region: Option<String>,
    /// Use path-style (`endpoint/bucket/key`) addressing.
    #[serde(default)]
    pub path_style: bool,
}

impl S3Config {
    /// Config for `bucket` and `namespace` on ambient AWS settings.
    pub fn new(bucket: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// The client settings implied by `endpoint`/`region`, if an endpoint is set.
    pub fn client_config(&self) -> Option<S3ClientConfig> {
        self.endpoint.as_ref().map(|endpoint| S3ClientConfig {
            endpoint: endpoint.clone(),
            region: self.region.clone().unwrap_or_default(),
            path_style: self.path_style,
        })
    }
}

/// Settings for connecting to an S3-compatible service that is not AWS.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3ClientConfig {
    /// Web endpoint of the service, usually `https://...`. Required.
    pub endpoint: String,
    /// Region of the service. Required.
    pub region: String,
    /// Use path-style addressing.
    #[serde(default)]
    pub path_style: bool,
}
