//! Instance lookups by node name.

use tracing::debug;

use super::AzureProvider;
use crate::cloud::ResourceManager;
use crate::cluster::{NodeAddress, NodeAddressType};
use crate::error::{CloudError, Result};
use crate::reconciler::primary_ip_config;
use crate::resources::VirtualMachine;

impl<C: ResourceManager> AzureProvider<C> {
    async fn instance(&self, name: &str) -> Result<VirtualMachine> {
        self.machine(name, || CloudError::InstanceNotFound(name.to_string()))
            .await
    }

    /// Internal address of the primary IP configuration, then the host name.
    pub async fn node_addresses(&self, name: &str) -> Result<Vec<NodeAddress>> {
        let machine = self.instance(name).await?;
        let nic = self.primary_interface(&machine).await?;
        let ip_config = primary_ip_config(&nic)?;
        let address = ip_config
            .private_ip_address
            .clone()
            .ok_or_else(|| CloudError::MissingField {
                resource: format!("network interface {}", nic.name),
                field: "privateIpAddress",
            })?;
        debug!("node_addresses: name={:?} address={:?}", name, address);

        Ok(vec![
            NodeAddress {
                kind: NodeAddressType::InternalIp,
                address,
            },
            NodeAddress {
                kind: NodeAddressType::Hostname,
                address: name.to_string(),
            },
        ])
    }

    /// Resource ID of the machine.
    pub async fn instance_id(&self, name: &str) -> Result<String> {
        let machine = self.instance(name).await?;
        Ok(machine
            .id
            .unwrap_or_else(|| self.namer.machine_id(&machine.name)))
    }

    pub async fn external_id(&self, name: &str) -> Result<String> {
        self.instance_id(name).await
    }

    /// VM size of the machine.
    pub async fn instance_type(&self, name: &str) -> Result<String> {
        Ok(self.instance(name).await?.vm_size)
    }

    /// Node names equal host names.
    pub fn current_node_name(&self, hostname: &str) -> String {
        hostname.to_string()
    }
}
