//! Fixtures shared by unit tests.

use crate::cluster::{Protocol, Service, ServicePort};
use crate::naming::ResourceNamer;
use crate::resources::{IpAllocationMethod, PublicIpAddress};

pub const SUBSCRIPTION: &str = "sub-0001";
pub const RESOURCE_GROUP: &str = "kube-rg";
pub const CLUSTER: &str = "kube";
pub const SECURITY_GROUP: &str = "kube-nsg";

pub fn namer() -> ResourceNamer {
    ResourceNamer::new(SUBSCRIPTION, RESOURCE_GROUP)
}

pub fn make_service(uid: &str, ports: Vec<ServicePort>) -> Service {
    Service {
        namespace: "default".to_string(),
        name: format!("svc-{}", uid),
        uid: uid.to_string(),
        ports,
    }
}

pub fn tcp(port: u16, node_port: u16) -> ServicePort {
    ServicePort {
        protocol: Protocol::Tcp,
        port,
        node_port,
    }
}

pub fn udp(port: u16, node_port: u16) -> ServicePort {
    ServicePort {
        protocol: Protocol::Udp,
        port,
        node_port,
    }
}

pub fn make_pip(name: &str) -> PublicIpAddress {
    PublicIpAddress {
        id: Some(namer().public_ip_id(name)),
        name: name.to_string(),
        location: "westus".to_string(),
        allocation_method: IpAllocationMethod::Static,
        ip_address: Some("52.0.0.10".to_string()),
    }
}
