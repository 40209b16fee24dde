//! Low-level S3 API errors.

use thiserror::Error;

/// An error reported by an S3-compatible service or the transport to it.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct S3ApiError {
    /// Service error code, e.g. `NoSuchKey`, when the service returned one.
    pub code: Option<String>,
    /// HTTP status of the response, when one was received.
    pub status: Option<u16>,
    /// Human-readable description.
    pub message: String,
}

impl S3ApiError {
    /// An error carrying a service error code.
    pub fn service(code: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            status: Some(status),
            message: message.into(),
        }
    }

    /// A failure before any response arrived (DNS, TLS, timeout, ...).
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            code: None,
            status: None,
            message: message.into(),
        }
    }

    /// Whether this error means the addressed object does not exist.
    ///
    /// `GetObject` reports `NoSuchKey`; `HeadObject` has no body and reports
    /// `NotFound`, or just a bare 404 on some S3-compatible services. A 404
    /// carrying another code (such as `NoSuchBucket`) is not a missing key.
    pub fn is_not_found(&self) -> bool {
        match self.code.as_deref() {
            Some("NoSuchKey") | Some("NotFound") => true,
            Some(_) => false,
            None => self.status == Some(404),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_codes_are_not_found() {
        assert!(S3ApiError::service("NoSuchKey", 404, "gone").is_not_found());
        assert!(S3ApiError::service("NotFound", 404, "gone").is_not_found());
    }

    #[test]
    fn bare_404_is_not_found() {
        let err = S3ApiError {
            code: None,
            status: Some(404),
            message: "head failed".into(),
        };
        assert!(err.is_not_found());
    }

    #[test]
    fn missing_bucket_is_not_a_missing_key() {
        assert!(!S3ApiError::service("NoSuchBucket", 404, "no bucket").is_not_found());
        assert!(!S3ApiError::service("AccessDenied", 403, "denied").is_not_found());
        assert!(!S3ApiError::transport("connection reset").is_not_found());
    }
}
