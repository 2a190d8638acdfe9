//! Cluster-facing types: what the controller loop hands in and gets back.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CloudError, Result};

/// Maximum length of a service identity.
const MAX_IDENTITY_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Tcp,
    Udp,
    Sctp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "TCP"),
            Protocol::Udp => write!(f, "UDP"),
            Protocol::Sctp => write!(f, "SCTP"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePort {
    pub protocol: Protocol,
    pub port: u16,
    pub node_port: u16,
}

/// A service that wants (or no longer wants) external exposure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub namespace: String,
    pub name: String,
    pub uid: String,
    #[serde(default)]
    pub ports: Vec<ServicePort>,
}

impl Service {
    /// Deterministic identity used to name every cloud object the service owns.
    ///
    /// `"a"` followed by the UID without dashes, cut to 32 characters.
    pub fn load_balancer_name(&self) -> String {
        let mut name: String = std::iter::once('a')
            .chain(self.uid.chars().filter(|c| *c != '-'))
            .collect();
        name.truncate(MAX_IDENTITY_LEN);
        name
    }

    /// Rejects services whose identity would be unsafe as an ownership prefix.
    pub fn validate(&self) -> Result<()> {
        if self.uid.chars().all(|c| c == '-') {
            return Err(CloudError::InvalidService {
                service: self.to_string(),
                reason: "uid is empty".to_string(),
            });
        }
        if !self.uid.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(CloudError::InvalidService {
                service: self.to_string(),
                reason: format!("uid {:?} contains characters other than [a-zA-Z0-9-]", self.uid),
            });
        }
        Ok(())
    }

    /// Same service with no ports, used to compute removals on teardown.
    pub fn without_ports(&self) -> Self {
        Self {
            ports: Vec::new(),
            ..self.clone()
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A pod CIDR route to a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRoute {
    #[serde(default)]
    pub name: String,
    pub target_instance: String,
    pub destination_cidr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerIngress {
    pub ip: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerStatus {
    pub ingress: Vec<LoadBalancerIngress>,
}

impl LoadBalancerStatus {
    pub fn from_ip(ip: impl Into<String>) -> Self {
        Self {
            ingress: vec![LoadBalancerIngress { ip: ip.into() }],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeAddressType {
    InternalIp,
    Hostname,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAddress {
    pub kind: NodeAddressType,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub failure_domain: String,
    pub region: String,
}
