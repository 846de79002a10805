//! Error taxonomy shared by every controller.
//!
//! Errors fall into four groups: input errors raised while decoding
//! identifiers and localities, plan-time constraints raised before any remote
//! call, remote failures classified by HTTP status, and cooperative
//! scheduling outcomes (deadline or cancellation).

use thiserror::Error;

use crate::api::ApiError;

/// Errors raised by the provider core.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProviderError {
    /// Raised when an identifier does not have the expected localized shape.
    #[error("invalid id '{value}': {reason}")]
    InvalidId {
        /// Offending identifier as supplied.
        value: String,
        /// Why the identifier was rejected.
        reason: String,
    },
    /// Raised when a localized reference lives in another region.
    #[error("{attribute} = '{value}' is not in region {expected_region}")]
    LocalityMismatch {
        /// Attribute path holding the reference (for example `instance_id`).
        attribute: String,
        /// Value found in the attribute.
        value: String,
        /// Region of the resource being planned.
        expected_region: String,
    },
    /// Raised when neither the input nor the provider defaults name a region.
    #[error("cannot resolve region for {resource}: set region or a provider default")]
    LocalityUnresolved {
        /// Resource or identifier whose region was needed.
        resource: String,
    },
    /// Raised when a size is declared on a local-storage volume.
    #[error("volume size cannot be set when the volume type is local storage")]
    VolumeSizeOnLocal,
    /// Raised when a plan would shrink the volume.
    #[error("volume size cannot decrease (current {current_gb} GB, requested {requested_gb} GB)")]
    VolumeShrink {
        /// Size currently provisioned.
        current_gb: u64,
        /// Size requested by the configuration.
        requested_gb: u64,
    },
    /// Raised when a volume size is not a multiple of the allocation unit.
    #[error("volume size must be a multiple of 5 GB (requested {requested_gb} GB)")]
    VolumeGranularity {
        /// Size requested by the configuration.
        requested_gb: u64,
    },
    /// Raised when a node-type change is requested on a full disk without a
    /// size increase.
    #[error(
        "instance {instance_id} is disk-full: a node type change requires a volume size increase in the same plan"
    )]
    NodeUpgradeBlockedByDiskFull {
        /// Localized instance identifier.
        instance_id: String,
    },
    /// Raised when encryption at rest would be disabled.
    #[error("encryption at rest cannot be disabled once enabled")]
    EncryptionDowngrade,
    /// Raised when an expiration date would be removed.
    #[error("expires_at cannot be removed from {resource} once set")]
    ExpiryRemovalForbidden {
        /// Localized identifier of the snapshot or backup.
        resource: String,
    },
    /// Raised when a private-network block selects neither IPAM nor a static
    /// service IP.
    #[error("private network {pn_id}: set either service_ip or enable_ipam")]
    EndpointUnderspecified {
        /// Private network identifier from the declaration.
        pn_id: String,
    },
    /// Raised when an attribute fails validation.
    #[error("invalid {attribute}: {message}")]
    InvalidAttribute {
        /// Attribute path.
        attribute: String,
        /// Human-readable reason.
        message: String,
    },
    /// Remote answered 404.
    #[error("remote resource not found: {message}")]
    RemoteNotFound {
        /// Message reported by the remote.
        message: String,
    },
    /// Remote answered 409.
    #[error("remote conflict: {message}")]
    RemoteConflict {
        /// Message reported by the remote.
        message: String,
    },
    /// Any other remote failure, surfaced verbatim.
    #[error("remote error: {message}")]
    RemoteOther {
        /// Message reported by the remote or the transport.
        message: String,
    },
    /// Raised when a wait does not reach a terminal state before the
    /// deadline.
    #[error("timeout waiting for {action} on {id}")]
    Timeout {
        /// What was being waited on.
        action: String,
        /// Identifier of the resource.
        id: String,
    },
    /// Raised when the caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,
    /// Raised when the provider configuration is incomplete.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    /// Returns true for remote 404 responses.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::RemoteNotFound { .. })
    }

    /// Returns true for remote 409 responses.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::RemoteConflict { .. })
    }

    pub(crate) fn invalid_attribute(attribute: &str, message: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            attribute: attribute.to_owned(),
            message: message.into(),
        }
    }
}

impl From<ApiError> for ProviderError {
    fn from(value: ApiError) -> Self {
        match value {
            ApiError::NotFound(message) => Self::RemoteNotFound { message },
            ApiError::Conflict(message) => Self::RemoteConflict { message },
            other => Self::RemoteOther {
                message: other.to_string(),
            },
        }
    }
}

/// Converts a not-found outcome into `None`, leaving other errors intact.
///
/// # Errors
///
/// Returns the original error when it is not a remote 404.
pub fn tolerate_not_found<T>(result: Result<T, ProviderError>) -> Result<Option<T>, ProviderError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}
