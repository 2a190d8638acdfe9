//! azure-provider: cloud provider that converges load balancers, security
//! groups and route tables with a cluster's services and nodes.
//!
//! The pure reconcilers in [`reconciler`] compute the converged form of a
//! remote object. [`AzureProvider`] fetches observed state through the
//! [`cloud`] traits, runs the reconcilers and writes back only what changed.

pub mod audit;
pub mod cloud;
pub mod cluster;
pub mod config;
pub mod error;
pub mod existence;
pub mod memory;
pub mod naming;
pub mod priority;
pub mod provider;
pub mod reconciler;
pub mod resources;

#[cfg(test)]
mod test_util;

pub use audit::ProviderAuditLogger;
pub use cloud::{RemoteError, ResourceManager};
pub use config::{CloudConfig, CloudEnvironment, ConfigError};
pub use error::{CloudError, HostFailure, Result};
pub use existence::{Existence, check_exists};
pub use memory::{CloudSnapshot, MemoryCloud, WriteRecord};
pub use provider::{AzureProvider, InstanceInfo, InstanceMetadata, MetadataFile, StaticMetadata};
pub use reconciler::Reconciled;
