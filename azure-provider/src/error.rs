//! Error types for the provider.

use thiserror::Error;

use crate::cloud::RemoteError;

/// A single host that failed to join the backend pool.
#[derive(Debug)]
pub struct HostFailure {
    pub host: String,
    pub error: CloudError,
}

/// Errors surfaced by reconcilers and the provider.
#[derive(Debug, Error)]
pub enum CloudError {
    /// Remote call failed for a reason other than "not found".
    #[error("remote call failed: {0}")]
    Remote(#[from] RemoteError),

    /// A resource this controller manages exclusively was changed by someone else.
    #[error("misconfigured {resource}: {reason}")]
    MisconfiguredResource { resource: String, reason: String },

    /// The subnet already references a route table we do not own.
    #[error("subnet {subnet} is bound to route table {actual}, expected {expected}; refusing to modify it")]
    SubnetRouteTableConflict {
        subnet: String,
        expected: String,
        actual: String,
    },

    /// Two live services have identities where one is a prefix of the other.
    #[error("service identity {identity} collides with live service identity {other}")]
    PrefixCollision { identity: String, other: String },

    #[error("virtual machine {machine} has no unambiguous primary network interface")]
    NoPrimaryNic { machine: String },

    #[error("network interface {nic} has {count} IP configurations, expected exactly one")]
    AmbiguousIpConfig { nic: String, count: usize },

    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("out of security rule priorities")]
    OutOfPriorities,

    #[error("invalid CIDR: {0}")]
    InvalidCidr(String),

    #[error("invalid service {service}: {reason}")]
    InvalidService { service: String, reason: String },

    /// A resource the operation depends on does not exist.
    #[error("{kind} {name} does not exist")]
    ResourceMissing { kind: &'static str, name: String },

    /// A fetched resource lacks a field the operation needs.
    #[error("{resource} is missing {field}")]
    MissingField {
        resource: String,
        field: &'static str,
    },

    #[error("instance not found: {0}")]
    InstanceNotFound(String),

    #[error("instance metadata unavailable: {0}")]
    Metadata(String),

    /// Some hosts could not be added to the backend pool. Updates of the
    /// remaining hosts were applied.
    #[error("{} of {attempted} hosts failed to join the backend pool: {}", .failures.len(), describe_failures(.failures))]
    PartialFailure {
        attempted: usize,
        failures: Vec<HostFailure>,
    },
}

fn describe_failures(failures: &[HostFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.host, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

impl CloudError {
    pub fn misconfigured(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MisconfiguredResource {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    pub fn missing(kind: &'static str, name: impl Into<String>) -> Self {
        Self::ResourceMissing {
            kind,
            name: name.into(),
        }
    }

    /// Observed remote state conflicts with what this controller owns.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::MisconfiguredResource { .. }
                | Self::SubnetRouteTableConflict { .. }
                | Self::PrefixCollision { .. }
                | Self::NoPrimaryNic { .. }
                | Self::AmbiguousIpConfig { .. }
        )
    }

    /// The request itself cannot be satisfied.
    pub fn is_unsupported_input(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedProtocol(_)
                | Self::OutOfPriorities
                | Self::InvalidCidr(_)
                | Self::InvalidService { .. }
        )
    }

    /// A remote failure the caller may retry.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, CloudError>;
