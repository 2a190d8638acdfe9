//! Deterministic resource names and IDs.
//!
//! Reconciliation recomputes the identity of every desired object on each
//! pass, so these functions must stay pure: same inputs, same outputs.
//!
//! Naming contract:
//!
//! | Object | Name |
//! |---|---|
//! | load balancer, backend pool, route table | `{cluster}` |
//! | public IP | `{cluster}-{identity}` |
//! | frontend IP configuration | `{identity}` |
//! | probe, LB rule, security rule | `{identity}-{PROTOCOL}-{port}-{nodePort}` |
//! | route | `{instance}` |
//!
//! `identity` is [`Service::load_balancer_name`]. Anything whose name starts
//! with a service's identity (ignoring case) belongs to that service.

use crate::cluster::{Service, ServicePort};
use crate::error::{CloudError, Result};

const COMPUTE_PROVIDER: &str = "Microsoft.Compute";
const NETWORK_PROVIDER: &str = "Microsoft.Network";

pub fn load_balancer_name(cluster: &str) -> String {
    cluster.to_string()
}

pub fn backend_pool_name(cluster: &str) -> String {
    cluster.to_string()
}

pub fn route_table_name(cluster: &str) -> String {
    cluster.to_string()
}

pub fn route_name(instance: &str) -> String {
    instance.to_string()
}

pub fn instance_name(route_name: &str) -> String {
    route_name.to_string()
}

/// Prefix shared by every object a service owns.
pub fn rule_prefix(service: &Service) -> String {
    service.load_balancer_name()
}

pub fn rule_name(service: &Service, port: &ServicePort) -> String {
    format!(
        "{}-{}-{}-{}",
        rule_prefix(service),
        port.protocol,
        port.port,
        port.node_port
    )
}

pub fn frontend_ip_config_name(service: &Service) -> String {
    service.load_balancer_name()
}

pub fn public_ip_name(cluster: &str, service: &Service) -> String {
    format!("{}-{}", cluster, service.load_balancer_name())
}

/// Whether `name` belongs to `service`.
pub fn service_owns(service: &Service, name: &str) -> bool {
    starts_with_ignore_case(name, &rule_prefix(service))
}

/// Recover the owning identity from a `{identity}-{PROTOCOL}-{port}-{nodePort}` name.
///
/// Returns `None` for names that do not follow the contract (manual rules).
pub fn owner_prefix(name: &str) -> Option<&str> {
    let mut parts = name.rsplitn(4, '-');
    let node_port = parts.next()?;
    let port = parts.next()?;
    let protocol = parts.next()?;
    let prefix = parts.next()?;
    if prefix.is_empty()
        || node_port.parse::<u16>().is_err()
        || port.parse::<u16>().is_err()
        || !matches!(protocol.to_ascii_uppercase().as_str(), "TCP" | "UDP" | "SCTP")
    {
        return None;
    }
    Some(prefix)
}

/// Refuse an identity that is a strict prefix of another live identity, or
/// the other way around. Either case would make ownership ambiguous.
pub fn check_prefix_collision<'a>(
    identity: &str,
    live: impl IntoIterator<Item = &'a str>,
) -> Result<()> {
    for other in live {
        if other.eq_ignore_ascii_case(identity) {
            continue;
        }
        if starts_with_ignore_case(other, identity) || starts_with_ignore_case(identity, other) {
            return Err(CloudError::PrefixCollision {
                identity: identity.to_string(),
                other: other.to_string(),
            });
        }
    }
    Ok(())
}

/// Terminal path component of a resource ID.
pub fn last_segment(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// Builds fully-qualified resource IDs for one subscription and resource group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNamer {
    subscription_id: String,
    resource_group: String,
}

impl ResourceNamer {
    pub fn new(subscription_id: impl Into<String>, resource_group: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
        }
    }

    pub fn resource_group(&self) -> &str {
        &self.resource_group
    }

    fn resource_id(&self, provider: &str, kind: &str, name: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}",
            self.subscription_id, self.resource_group, provider, kind, name
        )
    }

    fn child_id(&self, provider: &str, kind: &str, name: &str, sub: &str, sub_name: &str) -> String {
        format!("{}/{}/{}", self.resource_id(provider, kind, name), sub, sub_name)
    }

    pub fn machine_id(&self, machine: &str) -> String {
        self.resource_id(COMPUTE_PROVIDER, "virtualMachines", machine)
    }

    pub fn interface_id(&self, nic: &str) -> String {
        self.resource_id(NETWORK_PROVIDER, "networkInterfaces", nic)
    }

    pub fn interface_ip_config_id(&self, nic: &str, ip_config: &str) -> String {
        self.child_id(NETWORK_PROVIDER, "networkInterfaces", nic, "ipConfigurations", ip_config)
    }

    pub fn load_balancer_id(&self, lb: &str) -> String {
        self.resource_id(NETWORK_PROVIDER, "loadBalancers", lb)
    }

    pub fn frontend_ip_config_id(&self, lb: &str, config: &str) -> String {
        self.child_id(NETWORK_PROVIDER, "loadBalancers", lb, "frontendIPConfigurations", config)
    }

    pub fn backend_pool_id(&self, lb: &str, pool: &str) -> String {
        self.child_id(NETWORK_PROVIDER, "loadBalancers", lb, "backendAddressPools", pool)
    }

    pub fn load_balancer_rule_id(&self, lb: &str, rule: &str) -> String {
        self.child_id(NETWORK_PROVIDER, "loadBalancers", lb, "loadBalancingRules", rule)
    }

    pub fn load_balancer_probe_id(&self, lb: &str, probe: &str) -> String {
        self.child_id(NETWORK_PROVIDER, "loadBalancers", lb, "probes", probe)
    }

    pub fn public_ip_id(&self, pip: &str) -> String {
        self.resource_id(NETWORK_PROVIDER, "publicIPAddresses", pip)
    }

    pub fn security_group_id(&self, sg: &str) -> String {
        self.resource_id(NETWORK_PROVIDER, "networkSecurityGroups", sg)
    }

    pub fn security_rule_id(&self, sg: &str, rule: &str) -> String {
        self.child_id(NETWORK_PROVIDER, "networkSecurityGroups", sg, "securityRules", rule)
    }

    pub fn route_table_id(&self, table: &str) -> String {
        self.resource_id(NETWORK_PROVIDER, "routeTables", table)
    }

    pub fn route_id(&self, table: &str, route: &str) -> String {
        self.child_id(NETWORK_PROVIDER, "routeTables", table, "routes", route)
    }

    pub fn subnet_id(&self, vnet: &str, subnet: &str) -> String {
        self.child_id(NETWORK_PROVIDER, "virtualNetworks", vnet, "subnets", subnet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Protocol;

    fn make_service(uid: &str) -> Service {
        Service {
            namespace: "default".to_string(),
            name: "web".to_string(),
            uid: uid.to_string(),
            ports: vec![],
        }
    }

    fn tcp(port: u16, node_port: u16) -> ServicePort {
        ServicePort {
            protocol: Protocol::Tcp,
            port,
            node_port,
        }
    }

    #[test]
    fn test_rule_name_format() {
        let svc = make_service("1111-2222");
        assert_eq!(rule_name(&svc, &tcp(80, 30080)), "a11112222-TCP-80-30080");
    }

    #[test]
    fn test_public_ip_name() {
        let svc = make_service("1111-2222");
        assert_eq!(public_ip_name("kube", &svc), "kube-a11112222");
    }

    #[test]
    fn test_service_owns_ignores_case() {
        let svc = make_service("abcd");
        assert!(service_owns(&svc, "AABCD-TCP-80-30080"));
        assert!(!service_owns(&svc, "aabce-TCP-80-30080"));
        assert!(!service_owns(&svc, "aab"));
    }

    #[test]
    fn test_owner_prefix_roundtrip() {
        let svc = make_service("dead-beef");
        let name = rule_name(&svc, &tcp(443, 31443));
        assert_eq!(owner_prefix(&name), Some("adeadbeef"));
        assert_eq!(owner_prefix("allow-ssh"), None);
        assert_eq!(owner_prefix("x-TCP-notaport-1"), None);
        assert_eq!(owner_prefix("-TCP-80-30080"), None);
    }

    #[test]
    fn test_prefix_collision() {
        assert!(check_prefix_collision("aabc", ["aabc", "azzz"]).is_ok());
        assert!(matches!(
            check_prefix_collision("aabc", ["aabcd"]),
            Err(CloudError::PrefixCollision { .. })
        ));
        assert!(check_prefix_collision("aabcd", ["AABC"]).is_err());
    }

    #[test]
    fn test_ids_and_last_segment() {
        let namer = ResourceNamer::new("sub", "rg");
        assert_eq!(
            namer.backend_pool_id("kube", "kube"),
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/loadBalancers/kube/backendAddressPools/kube"
        );
        assert_eq!(
            namer.machine_id("node-1"),
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/node-1"
        );
        assert_eq!(last_segment(&namer.interface_id("node-1-nic")), "node-1-nic");
        assert_eq!(last_segment("plain"), "plain");
    }

    #[test]
    fn test_names_are_stable() {
        let svc = make_service("0f0f");
        assert_eq!(rule_name(&svc, &tcp(1, 2)), rule_name(&svc.clone(), &tcp(1, 2)));
        assert_eq!(load_balancer_name("c"), backend_pool_name("c"));
        assert_eq!(instance_name(&route_name("node-7")), "node-7");
    }
}
