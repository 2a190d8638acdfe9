//! AzureProvider - top-level orchestration.
//!
//! Every operation follows the same shape: fetch the observed object (or
//! start from an empty one), run the pure reconciler, write back only when
//! the result is dirty, then apply dependent updates.

mod instances;
mod load_balancer;
mod routes;
mod zones;

pub use zones::{INSTANCE_INFO_URL, InstanceInfo, InstanceMetadata, MetadataFile, StaticMetadata};

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::audit::ProviderAuditLogger;
use crate::cloud::ResourceManager;
use crate::config::CloudConfig;
use crate::error::{CloudError, Result};
use crate::existence::ExistenceExt;
use crate::naming::{self, ResourceNamer};
use crate::reconciler::{primary_ip_config, primary_nic_id};
use crate::resources::{NetworkInterface, VirtualMachine};

/// Cloud provider for one cluster's resource group.
pub struct AzureProvider<C> {
    cloud: Arc<C>,
    config: CloudConfig,
    namer: ResourceNamer,
    audit: ProviderAuditLogger,
    metadata: Option<Arc<dyn InstanceMetadata>>,
    fault_domain: OnceCell<String>,
}

impl<C: ResourceManager> AzureProvider<C> {
    pub fn new(cloud: Arc<C>, config: CloudConfig) -> Self {
        let namer = ResourceNamer::new(&config.subscription_id, &config.resource_group);
        Self {
            cloud,
            config,
            namer,
            audit: ProviderAuditLogger::new("azure-provider"),
            metadata: None,
            fault_domain: OnceCell::new(),
        }
    }

    pub fn with_audit(mut self, audit: ProviderAuditLogger) -> Self {
        self.audit = audit;
        self
    }

    /// Source of this host's instance metadata, used for zone lookups.
    pub fn with_metadata(mut self, metadata: Arc<dyn InstanceMetadata>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn config(&self) -> &CloudConfig {
        &self.config
    }

    pub fn namer(&self) -> &ResourceNamer {
        &self.namer
    }

    pub fn cloud(&self) -> &C {
        &self.cloud
    }

    fn resource_group(&self) -> &str {
        &self.config.resource_group
    }

    /// Fetch a machine, failing with `missing` when it does not exist.
    async fn machine(
        &self,
        name: &str,
        missing: impl FnOnce() -> CloudError,
    ) -> Result<VirtualMachine> {
        self.cloud
            .get_virtual_machine(self.resource_group(), name)
            .await
            .existence()?
            .into_option()
            .ok_or_else(missing)
    }

    /// Fetch the primary interface of `machine`.
    async fn primary_interface(&self, machine: &VirtualMachine) -> Result<NetworkInterface> {
        let nic_name = naming::last_segment(primary_nic_id(machine)?).to_string();
        self.cloud
            .get_interface(self.resource_group(), &nic_name)
            .await
            .existence()?
            .into_option()
            .ok_or_else(|| CloudError::missing("network interface", nic_name))
    }

    /// Private address of the machine's primary IP configuration.
    pub async fn ip_for_machine(&self, machine_name: &str) -> Result<String> {
        let machine = self
            .machine(machine_name, || {
                CloudError::missing("virtual machine", machine_name)
            })
            .await?;
        let nic = self.primary_interface(&machine).await?;
        let ip_config = primary_ip_config(&nic)?;
        ip_config
            .private_ip_address
            .clone()
            .ok_or_else(|| CloudError::MissingField {
                resource: format!("network interface {}", nic.name),
                field: "privateIpAddress",
            })
    }
}
