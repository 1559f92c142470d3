//! Error envelope shared by resources and data sources
//!
//! Every failure reported to Terraform reads
//! `Resource <type> <action> Failed!!! [<origin>] <cause>` or, for waits that
//! ran out of time, `Resource <type> <action> Timeout!!! <cause>`.

use crate::api::ApiError;
use std::fmt;
use tfplug::helper::{BoxError, RetryFailure, WaitError};
use tfplug::Diagnostics;

/// BCE code for transient server-side failures
pub const ERROR_CODE_INTERNAL: &str = "InternalError";

/// Codes BCE services use when the addressed object does not exist
pub const NOT_FOUND_CODES: &[&str] = &[
    "NoSuchObject",
    "NotFound",
    "ResourceNotFound",
    "InstanceNotFound",
    "InstanceNotExist",
    "EipNotFound",
    "Vpc.VpcNotFound",
    "Subnet.SubnetNotFound",
    "ClusterNotExist",
    "CCE.ClusterNotFound",
];

/// Where an error originated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSource {
    BceSdk,
    Provider,
}

impl fmt::Display for ErrorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSource::BceSdk => write!(f, "bce-sdk"),
            ErrorSource::Provider => write!(f, "terraform-provider"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Resource {resource} {action} Failed!!! [{origin}] {cause}")]
    Failed {
        resource: String,
        action: String,
        origin: ErrorSource,
        #[source]
        cause: BoxError,
    },

    #[error("Resource {resource} {action} Timeout!!! {cause}")]
    Timeout {
        resource: String,
        action: String,
        #[source]
        cause: BoxError,
    },
}

impl ProviderError {
    /// Single-error diagnostics carrying the envelope as summary
    pub fn to_diagnostics(&self) -> Diagnostics {
        Diagnostics::error(self.to_string(), None::<String>)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderError::Timeout { .. })
    }
}

/// Wraps `err` in the uniform envelope
pub fn wrap_error(
    err: impl Into<BoxError>,
    resource: &str,
    action: &str,
    origin: ErrorSource,
) -> ProviderError {
    ProviderError::Failed {
        resource: resource.to_string(),
        action: action.to_string(),
        origin,
        cause: err.into(),
    }
}

/// Poll failures keep the last observed status in their message
pub fn wrap_wait_error(err: WaitError, resource: &str, action: &str) -> ProviderError {
    match err {
        WaitError::Timeout { .. } => ProviderError::Timeout {
            resource: resource.to_string(),
            action: action.to_string(),
            cause: Box::new(err),
        },
        WaitError::Refresh { .. } => wrap_error(err, resource, action, ErrorSource::BceSdk),
        _ => wrap_error(err, resource, action, ErrorSource::Provider),
    }
}

pub fn wrap_retry_failure(
    err: RetryFailure<ApiError>,
    resource: &str,
    action: &str,
) -> ProviderError {
    match err {
        RetryFailure::Timeout { .. } => ProviderError::Timeout {
            resource: resource.to_string(),
            action: action.to_string(),
            cause: Box::new(err),
        },
        RetryFailure::Aborted(e) => wrap_error(e, resource, action, ErrorSource::BceSdk),
        RetryFailure::Cancelled => wrap_error(err, resource, action, ErrorSource::Provider),
    }
}

/// HTTP 404 or one of [`NOT_FOUND_CODES`]
pub fn is_not_found(err: &ApiError) -> bool {
    if err.status() == Some(404) {
        return true;
    }
    err.code().is_some_and(|code| NOT_FOUND_CODES.contains(&code))
}

/// Whether a resource operation should be attempted again
pub fn is_retryable(err: &ApiError) -> bool {
    is_expected_error(err, &[ERROR_CODE_INTERNAL])
}

/// Whether `err` carries one of `codes`
pub fn is_expected_error(err: &ApiError, codes: &[&str]) -> bool {
    match err.code() {
        Some(code) => codes.contains(&code),
        None => {
            let message = err.to_string();
            codes.iter().any(|c| message.contains(c))
        }
    }
}
