//! Shared fixtures for provider integration tests.
//!
//! A seeded in-memory resource group with a subnet, a security group and
//! a few nodes, each with a single primary NIC.

#![allow(dead_code)]

use std::sync::Arc;

use azure_provider::cluster::{Protocol, Service, ServicePort};
use azure_provider::naming::ResourceNamer;
use azure_provider::resources::{
    InterfaceIpConfiguration, NetworkInterface, NetworkInterfaceReference, SecurityGroup, Subnet,
    VirtualMachine,
};
use azure_provider::{AzureProvider, CloudConfig, MemoryCloud, ProviderAuditLogger};

pub const CLUSTER: &str = "kube";
pub const RESOURCE_GROUP: &str = "kube-rg";
pub const VNET: &str = "kube-vnet";
pub const SUBNET: &str = "kube-subnet";
pub const SECURITY_GROUP: &str = "kube-nsg";
pub const LOCATION: &str = "westus";

pub fn test_config() -> CloudConfig {
    CloudConfig::from_json(&format!(
        r#"{{
            "cloud": "public",
            "tenantId": "tenant",
            "subscriptionId": "sub-0001",
            "resourceGroup": "{RESOURCE_GROUP}",
            "location": "{LOCATION}",
            "vnetName": "{VNET}",
            "subnetName": "{SUBNET}",
            "securityGroupName": "{SECURITY_GROUP}",
            "hostUpdateConcurrency": 2
        }}"#
    ))
    .unwrap()
}

pub fn namer() -> ResourceNamer {
    let config = test_config();
    ResourceNamer::new(config.subscription_id, config.resource_group)
}

/// Test environment: the in-memory cloud and a provider on top of it.
pub struct TestCloud {
    pub cloud: Arc<MemoryCloud>,
    pub provider: AzureProvider<MemoryCloud>,
}

impl TestCloud {
    /// Resource group with the cluster subnet and an empty security group.
    pub fn new() -> Self {
        let cloud = Arc::new(MemoryCloud::new(namer()));
        cloud.seed_subnet(
            VNET,
            Subnet {
                id: None,
                name: SUBNET.to_string(),
                address_prefix: Some("10.240.0.0/16".to_string()),
                route_table: None,
            },
        );
        cloud
            .seed_security_group(SecurityGroup {
                id: None,
                name: SECURITY_GROUP.to_string(),
                location: LOCATION.to_string(),
                security_rules: vec![],
            })
            .unwrap();

        let provider = AzureProvider::new(Arc::clone(&cloud), test_config())
            .with_audit(ProviderAuditLogger::new_noop());
        Self { cloud, provider }
    }

    /// Same, with `count` nodes named `node-0`, `node-1`, ...
    pub fn with_nodes(count: usize) -> Self {
        let env = Self::new();
        for i in 0..count {
            env.add_node(&format!("node-{}", i), &format!("10.240.0.{}", i + 4));
        }
        env
    }

    pub fn add_node(&self, name: &str, address: &str) {
        let nic_name = format!("{}-nic", name);
        self.cloud.seed_interface(NetworkInterface {
            id: None,
            name: nic_name.clone(),
            location: LOCATION.to_string(),
            ip_configurations: vec![InterfaceIpConfiguration {
                id: None,
                name: "ipconfig1".to_string(),
                private_ip_address: Some(address.to_string()),
                primary: Some(true),
                load_balancer_backend_address_pools: vec![],
            }],
        });
        self.cloud.seed_virtual_machine(VirtualMachine {
            id: None,
            name: name.to_string(),
            location: LOCATION.to_string(),
            vm_size: "Standard_D2_v2".to_string(),
            network_interfaces: vec![NetworkInterfaceReference {
                id: namer().interface_id(&nic_name),
                primary: None,
            }],
        });
    }

    pub fn hosts(&self) -> Vec<String> {
        self.cloud
            .snapshot()
            .virtual_machines
            .values()
            .map(|vm| vm.name.clone())
            .collect()
    }
}

pub fn make_service(uid: &str, ports: &[(Protocol, u16, u16)]) -> Service {
    Service {
        namespace: "default".to_string(),
        name: format!("svc-{}", uid),
        uid: uid.to_string(),
        ports: ports
            .iter()
            .map(|&(protocol, port, node_port)| ServicePort {
                protocol,
                port,
                node_port,
            })
            .collect(),
    }
}
