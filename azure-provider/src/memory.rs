//! MemoryCloud - in-process implementation of the remote resource traits.
//!
//! Holds one resource group worth of objects in a serialisable
//! [`CloudSnapshot`]. Writes behave like the resource manager: IDs of the
//! resource and its sub-resources are filled in, static public IPs get an
//! address, load balancers get a fresh etag. Every accepted write is appended
//! to a journal so callers can see exactly what an operation changed.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cloud::{
    InterfaceApi, LoadBalancerApi, PublicIpApi, RemoteError, RemoteResult, RouteApi,
    RouteTableApi, SecurityGroupApi, SubnetApi, VirtualMachineApi,
};
use crate::naming::ResourceNamer;
use crate::resources::{
    IpAllocationMethod, LoadBalancer, NetworkInterface, PublicIpAddress, Route, RouteTable,
    SecurityGroup, Subnet, VirtualMachine, id_matches,
};

const STATUS_BAD_REQUEST: u16 = 400;

/// Every object of the resource group, keyed by lowercase name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudSnapshot {
    #[serde(default)]
    pub load_balancers: BTreeMap<String, LoadBalancer>,
    #[serde(default)]
    pub public_ips: BTreeMap<String, PublicIpAddress>,
    #[serde(default)]
    pub security_groups: BTreeMap<String, SecurityGroup>,
    #[serde(default)]
    pub route_tables: BTreeMap<String, RouteTable>,
    /// Keyed by `{vnet}/{subnet}`.
    #[serde(default)]
    pub subnets: BTreeMap<String, Subnet>,
    #[serde(default)]
    pub interfaces: BTreeMap<String, NetworkInterface>,
    #[serde(default)]
    pub virtual_machines: BTreeMap<String, VirtualMachine>,
    /// Number of public addresses handed out so far.
    #[serde(default)]
    pub allocated_addresses: u32,
}

impl CloudSnapshot {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    LoadBalancer,
    PublicIp,
    SecurityGroup,
    RouteTable,
    Route,
    Subnet,
    Interface,
    VirtualMachine,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::LoadBalancer => "load balancer",
            ResourceKind::PublicIp => "public IP",
            ResourceKind::SecurityGroup => "security group",
            ResourceKind::RouteTable => "route table",
            ResourceKind::Route => "route",
            ResourceKind::Subnet => "subnet",
            ResourceKind::Interface => "network interface",
            ResourceKind::VirtualMachine => "virtual machine",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteOp {
    Put,
    Delete,
}

/// One accepted write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRecord {
    pub op: WriteOp,
    pub kind: ResourceKind,
    pub name: String,
}

impl fmt::Display for WriteRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            WriteOp::Put => "PUT",
            WriteOp::Delete => "DELETE",
        };
        write!(f, "{} {} {}", op, self.kind, self.name)
    }
}

#[derive(Default)]
struct State {
    snapshot: CloudSnapshot,
    journal: Vec<WriteRecord>,
    faults: HashMap<(ResourceKind, String), RemoteError>,
}

impl State {
    fn check_fault(&self, kind: ResourceKind, name: &str) -> RemoteResult<()> {
        match self.faults.get(&(kind, key(name))) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn record(&mut self, op: WriteOp, kind: ResourceKind, name: &str) {
        debug!("memory_cloud: {:?} {} {:?}", op, kind, name);
        self.journal.push(WriteRecord {
            op,
            kind,
            name: name.to_string(),
        });
    }

    fn next_address(&mut self) -> String {
        self.snapshot.allocated_addresses += 1;
        let n = self.snapshot.allocated_addresses;
        format!("52.{}.{}.{}", (n >> 16) & 0xff, (n >> 8) & 0xff, n & 0xff)
    }
}

fn key(name: &str) -> String {
    name.to_ascii_lowercase()
}

fn subnet_key(vnet: &str, subnet: &str) -> String {
    format!("{}/{}", key(vnet), key(subnet))
}

fn not_found(kind: ResourceKind, name: &str) -> RemoteError {
    RemoteError::not_found(format!("{} {} not found", kind, name))
}

fn bad_request(message: impl Into<String>) -> RemoteError {
    RemoteError::new(STATUS_BAD_REQUEST, message)
}

fn fill<'a>(id: &'a mut Option<String>, make: impl FnOnce() -> String) -> &'a str {
    id.get_or_insert_with(make).as_str()
}

/// In-memory resource group.
pub struct MemoryCloud {
    namer: ResourceNamer,
    state: Mutex<State>,
}

impl MemoryCloud {
    pub fn new(namer: ResourceNamer) -> Self {
        Self::with_snapshot(namer, CloudSnapshot::default())
    }

    pub fn with_snapshot(namer: ResourceNamer, snapshot: CloudSnapshot) -> Self {
        Self {
            namer,
            state: Mutex::new(State {
                snapshot,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_group(&self, resource_group: &str) -> RemoteResult<()> {
        if resource_group.eq_ignore_ascii_case(self.namer.resource_group()) {
            Ok(())
        } else {
            Err(RemoteError::not_found(format!(
                "resource group {} not found",
                resource_group
            )))
        }
    }

    pub fn snapshot(&self) -> CloudSnapshot {
        self.state().snapshot.clone()
    }

    /// Writes accepted so far, in order.
    pub fn journal(&self) -> Vec<WriteRecord> {
        self.state().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.state().journal.clear();
    }

    /// Fail every call touching `kind`/`name` with `error` until cleared.
    pub fn inject_fault(&self, kind: ResourceKind, name: &str, error: RemoteError) {
        self.state().faults.insert((kind, key(name)), error);
    }

    pub fn clear_faults(&self) {
        self.state().faults.clear();
    }

    // Seeding. These bypass the journal and faults.

    pub fn seed_virtual_machine(&self, mut vm: VirtualMachine) {
        fill(&mut vm.id, || self.namer.machine_id(&vm.name));
        self.state()
            .snapshot
            .virtual_machines
            .insert(key(&vm.name), vm);
    }

    pub fn seed_interface(&self, nic: NetworkInterface) {
        let nic = self.assign_interface_ids(nic);
        self.state().snapshot.interfaces.insert(key(&nic.name), nic);
    }

    pub fn seed_subnet(&self, vnet: &str, mut subnet: Subnet) {
        fill(&mut subnet.id, || self.namer.subnet_id(vnet, &subnet.name));
        self.state()
            .snapshot
            .subnets
            .insert(subnet_key(vnet, &subnet.name), subnet);
    }

    pub fn seed_security_group(&self, sg: SecurityGroup) -> RemoteResult<()> {
        let sg = self.assign_security_group_ids(sg)?;
        self.state()
            .snapshot
            .security_groups
            .insert(key(&sg.name), sg);
        Ok(())
    }

    pub fn seed_route_table(&self, table: RouteTable) {
        let table = self.assign_route_table_ids(table);
        self.state()
            .snapshot
            .route_tables
            .insert(key(&table.name), table);
    }

    pub fn seed_load_balancer(&self, lb: LoadBalancer) -> RemoteResult<()> {
        let lb = self.assign_load_balancer_ids(lb)?;
        self.state().snapshot.load_balancers.insert(key(&lb.name), lb);
        Ok(())
    }

    // ID assignment and validation, as the resource manager does on PUT.

    fn assign_load_balancer_ids(&self, mut lb: LoadBalancer) -> RemoteResult<LoadBalancer> {
        let namer = &self.namer;
        let name = lb.name.clone();
        fill(&mut lb.id, || namer.load_balancer_id(&name));
        lb.etag = Some(uuid::Uuid::new_v4().to_string());
        for pool in &mut lb.backend_address_pools {
            fill(&mut pool.id, || namer.backend_pool_id(&name, &pool.name));
        }
        for config in &mut lb.frontend_ip_configurations {
            fill(&mut config.id, || namer.frontend_ip_config_id(&name, &config.name));
        }
        for probe in &mut lb.probes {
            fill(&mut probe.id, || namer.load_balancer_probe_id(&name, &probe.name));
        }
        for rule in &mut lb.load_balancing_rules {
            fill(&mut rule.id, || namer.load_balancer_rule_id(&name, &rule.name));
        }

        for rule in &lb.load_balancing_rules {
            let frontend_ok = lb
                .frontend_ip_configurations
                .iter()
                .any(|c| id_matches(c.id.as_deref(), &rule.frontend_ip_configuration.id));
            let pool_ok = lb
                .backend_address_pools
                .iter()
                .any(|p| id_matches(p.id.as_deref(), &rule.backend_address_pool.id));
            let probe_ok = lb
                .probes
                .iter()
                .any(|p| id_matches(p.id.as_deref(), &rule.probe.id));
            if !(frontend_ok && pool_ok && probe_ok) {
                return Err(bad_request(format!(
                    "load balancing rule {} references a missing sub-resource",
                    rule.name
                )));
            }
        }
        Ok(lb)
    }

    fn assign_security_group_ids(&self, mut sg: SecurityGroup) -> RemoteResult<SecurityGroup> {
        let name = sg.name.clone();
        fill(&mut sg.id, || self.namer.security_group_id(&name));
        let mut priorities = HashMap::new();
        for rule in &mut sg.security_rules {
            fill(&mut rule.id, || self.namer.security_rule_id(&name, &rule.name));
            let priority = rule
                .priority
                .ok_or_else(|| bad_request(format!("security rule {} has no priority", rule.name)))?;
            if let Some(other) = priorities.insert(priority, rule.name.clone()) {
                return Err(bad_request(format!(
                    "security rules {} and {} share priority {}",
                    other, rule.name, priority
                )));
            }
        }
        Ok(sg)
    }

    fn assign_route_table_ids(&self, mut table: RouteTable) -> RouteTable {
        let name = table.name.clone();
        fill(&mut table.id, || self.namer.route_table_id(&name));
        for route in &mut table.routes {
            fill(&mut route.id, || self.namer.route_id(&name, &route.name));
        }
        table
    }

    fn assign_interface_ids(&self, mut nic: NetworkInterface) -> NetworkInterface {
        let name = nic.name.clone();
        fill(&mut nic.id, || self.namer.interface_id(&name));
        for config in &mut nic.ip_configurations {
            fill(&mut config.id, || {
                self.namer.interface_ip_config_id(&name, &config.name)
            });
        }
        nic
    }
}

#[async_trait]
impl LoadBalancerApi for MemoryCloud {
    async fn get_load_balancer(
        &self,
        resource_group: &str,
        name: &str,
    ) -> RemoteResult<LoadBalancer> {
        self.check_group(resource_group)?;
        let state = self.state();
        state.check_fault(ResourceKind::LoadBalancer, name)?;
        state
            .snapshot
            .load_balancers
            .get(&key(name))
            .cloned()
            .ok_or_else(|| not_found(ResourceKind::LoadBalancer, name))
    }

    async fn create_or_update_load_balancer(
        &self,
        resource_group: &str,
        lb: &LoadBalancer,
    ) -> RemoteResult<LoadBalancer> {
        self.check_group(resource_group)?;
        self.state()
            .check_fault(ResourceKind::LoadBalancer, &lb.name)?;
        let lb = self.assign_load_balancer_ids(lb.clone())?;
        let mut state = self.state();
        state.record(WriteOp::Put, ResourceKind::LoadBalancer, &lb.name);
        state
            .snapshot
            .load_balancers
            .insert(key(&lb.name), lb.clone());
        Ok(lb)
    }

    async fn delete_load_balancer(&self, resource_group: &str, name: &str) -> RemoteResult<()> {
        self.check_group(resource_group)?;
        let mut state = self.state();
        state.check_fault(ResourceKind::LoadBalancer, name)?;
        if state.snapshot.load_balancers.remove(&key(name)).is_some() {
            state.record(WriteOp::Delete, ResourceKind::LoadBalancer, name);
        }
        Ok(())
    }
}

#[async_trait]
impl PublicIpApi for MemoryCloud {
    async fn get_public_ip(
        &self,
        resource_group: &str,
        name: &str,
    ) -> RemoteResult<PublicIpAddress> {
        self.check_group(resource_group)?;
        let state = self.state();
        state.check_fault(ResourceKind::PublicIp, name)?;
        state
            .snapshot
            .public_ips
            .get(&key(name))
            .cloned()
            .ok_or_else(|| not_found(ResourceKind::PublicIp, name))
    }

    async fn create_or_update_public_ip(
        &self,
        resource_group: &str,
        pip: &PublicIpAddress,
    ) -> RemoteResult<PublicIpAddress> {
        self.check_group(resource_group)?;
        let mut state = self.state();
        state.check_fault(ResourceKind::PublicIp, &pip.name)?;

        let mut pip = pip.clone();
        fill(&mut pip.id, || self.namer.public_ip_id(&pip.name));
        if pip.allocation_method == IpAllocationMethod::Static && pip.ip_address.is_none() {
            let existing = state
                .snapshot
                .public_ips
                .get(&key(&pip.name))
                .and_then(|p| p.ip_address.clone());
            pip.ip_address = Some(match existing {
                Some(address) => address,
                None => state.next_address(),
            });
        }
        state.record(WriteOp::Put, ResourceKind::PublicIp, &pip.name);
        state.snapshot.public_ips.insert(key(&pip.name), pip.clone());
        Ok(pip)
    }

    async fn delete_public_ip(&self, resource_group: &str, name: &str) -> RemoteResult<()> {
        self.check_group(resource_group)?;
        let mut state = self.state();
        state.check_fault(ResourceKind::PublicIp, name)?;
        let referenced = state.snapshot.load_balancers.values().any(|lb| {
            lb.frontend_ip_configurations.iter().any(|c| {
                c.public_ip_address
                    .as_ref()
                    .is_some_and(|p| p.id.eq_ignore_ascii_case(&self.namer.public_ip_id(name)))
            })
        });
        if referenced {
            return Err(bad_request(format!(
                "public IP {} is in use by a load balancer",
                name
            )));
        }
        if state.snapshot.public_ips.remove(&key(name)).is_some() {
            state.record(WriteOp::Delete, ResourceKind::PublicIp, name);
        }
        Ok(())
    }
}

#[async_trait]
impl SecurityGroupApi for MemoryCloud {
    async fn get_security_group(
        &self,
        resource_group: &str,
        name: &str,
    ) -> RemoteResult<SecurityGroup> {
        self.check_group(resource_group)?;
        let state = self.state();
        state.check_fault(ResourceKind::SecurityGroup, name)?;
        state
            .snapshot
            .security_groups
            .get(&key(name))
            .cloned()
            .ok_or_else(|| not_found(ResourceKind::SecurityGroup, name))
    }

    async fn create_or_update_security_group(
        &self,
        resource_group: &str,
        sg: &SecurityGroup,
    ) -> RemoteResult<SecurityGroup> {
        self.check_group(resource_group)?;
        self.state()
            .check_fault(ResourceKind::SecurityGroup, &sg.name)?;
        let sg = self.assign_security_group_ids(sg.clone())?;
        let mut state = self.state();
        state.record(WriteOp::Put, ResourceKind::SecurityGroup, &sg.name);
        state
            .snapshot
            .security_groups
            .insert(key(&sg.name), sg.clone());
        Ok(sg)
    }
}

#[async_trait]
impl RouteTableApi for MemoryCloud {
    async fn get_route_table(&self, resource_group: &str, name: &str) -> RemoteResult<RouteTable> {
        self.check_group(resource_group)?;
        let state = self.state();
        state.check_fault(ResourceKind::RouteTable, name)?;
        state
            .snapshot
            .route_tables
            .get(&key(name))
            .cloned()
            .ok_or_else(|| not_found(ResourceKind::RouteTable, name))
    }

    async fn create_or_update_route_table(
        &self,
        resource_group: &str,
        table: &RouteTable,
    ) -> RemoteResult<RouteTable> {
        self.check_group(resource_group)?;
        let table = self.assign_route_table_ids(table.clone());
        let mut state = self.state();
        state.check_fault(ResourceKind::RouteTable, &table.name)?;
        state.record(WriteOp::Put, ResourceKind::RouteTable, &table.name);
        state
            .snapshot
            .route_tables
            .insert(key(&table.name), table.clone());
        Ok(table)
    }
}

#[async_trait]
impl RouteApi for MemoryCloud {
    async fn create_or_update_route(
        &self,
        resource_group: &str,
        route_table: &str,
        route: &Route,
    ) -> RemoteResult<Route> {
        self.check_group(resource_group)?;
        let mut route = route.clone();
        fill(&mut route.id, || self.namer.route_id(route_table, &route.name));

        let mut state = self.state();
        state.check_fault(ResourceKind::Route, &route.name)?;
        let table = state
            .snapshot
            .route_tables
            .get_mut(&key(route_table))
            .ok_or_else(|| not_found(ResourceKind::RouteTable, route_table))?;
        match table
            .routes
            .iter_mut()
            .find(|r| r.name.eq_ignore_ascii_case(&route.name))
        {
            Some(existing) => *existing = route.clone(),
            None => table.routes.push(route.clone()),
        }
        state.record(WriteOp::Put, ResourceKind::Route, &route.name);
        Ok(route)
    }

    async fn delete_route(
        &self,
        resource_group: &str,
        route_table: &str,
        name: &str,
    ) -> RemoteResult<()> {
        self.check_group(resource_group)?;
        let mut state = self.state();
        state.check_fault(ResourceKind::Route, name)?;
        let Some(table) = state.snapshot.route_tables.get_mut(&key(route_table)) else {
            return Ok(());
        };
        let before = table.routes.len();
        table.routes.retain(|r| !r.name.eq_ignore_ascii_case(name));
        if table.routes.len() != before {
            state.record(WriteOp::Delete, ResourceKind::Route, name);
        }
        Ok(())
    }
}

#[async_trait]
impl SubnetApi for MemoryCloud {
    async fn get_subnet(&self, resource_group: &str, vnet: &str, name: &str) -> RemoteResult<Subnet> {
        self.check_group(resource_group)?;
        let state = self.state();
        state.check_fault(ResourceKind::Subnet, name)?;
        state
            .snapshot
            .subnets
            .get(&subnet_key(vnet, name))
            .cloned()
            .ok_or_else(|| not_found(ResourceKind::Subnet, name))
    }

    async fn create_or_update_subnet(
        &self,
        resource_group: &str,
        vnet: &str,
        subnet: &Subnet,
    ) -> RemoteResult<Subnet> {
        self.check_group(resource_group)?;
        let mut subnet = subnet.clone();
        fill(&mut subnet.id, || self.namer.subnet_id(vnet, &subnet.name));

        let mut state = self.state();
        state.check_fault(ResourceKind::Subnet, &subnet.name)?;
        if let Some(bound) = &subnet.route_table {
            let exists = state
                .snapshot
                .route_tables
                .values()
                .any(|t| id_matches(t.id.as_deref(), &bound.id));
            if !exists {
                return Err(bad_request(format!(
                    "subnet {} references missing route table {}",
                    subnet.name, bound.id
                )));
            }
        }
        state.record(WriteOp::Put, ResourceKind::Subnet, &subnet.name);
        state
            .snapshot
            .subnets
            .insert(subnet_key(vnet, &subnet.name), subnet.clone());
        Ok(subnet)
    }
}

#[async_trait]
impl InterfaceApi for MemoryCloud {
    async fn get_interface(
        &self,
        resource_group: &str,
        name: &str,
    ) -> RemoteResult<NetworkInterface> {
        self.check_group(resource_group)?;
        let state = self.state();
        state.check_fault(ResourceKind::Interface, name)?;
        state
            .snapshot
            .interfaces
            .get(&key(name))
            .cloned()
            .ok_or_else(|| not_found(ResourceKind::Interface, name))
    }

    async fn create_or_update_interface(
        &self,
        resource_group: &str,
        nic: &NetworkInterface,
    ) -> RemoteResult<NetworkInterface> {
        self.check_group(resource_group)?;
        let nic = self.assign_interface_ids(nic.clone());
        let mut state = self.state();
        state.check_fault(ResourceKind::Interface, &nic.name)?;
        state.record(WriteOp::Put, ResourceKind::Interface, &nic.name);
        state.snapshot.interfaces.insert(key(&nic.name), nic.clone());
        Ok(nic)
    }
}

#[async_trait]
impl VirtualMachineApi for MemoryCloud {
    async fn get_virtual_machine(
        &self,
        resource_group: &str,
        name: &str,
    ) -> RemoteResult<VirtualMachine> {
        self.check_group(resource_group)?;
        let state = self.state();
        state.check_fault(ResourceKind::VirtualMachine, name)?;
        state
            .snapshot
            .virtual_machines
            .get(&key(name))
            .cloned()
            .ok_or_else(|| not_found(ResourceKind::VirtualMachine, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{BackendAddressPool, LoadBalancingRule, SubResource, TransportProtocol};
    use crate::test_util::{RESOURCE_GROUP, namer};

    fn cloud() -> MemoryCloud {
        MemoryCloud::new(namer())
    }

    #[test]
    fn test_unknown_resource_group() {
        let cloud = cloud();
        let err = tokio_test::block_on(cloud.get_load_balancer("other-rg", "kube")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_put_assigns_ids_and_etag() {
        let cloud = cloud();
        let mut lb = LoadBalancer::new("kube", "westus");
        lb.backend_address_pools.push(BackendAddressPool {
            id: None,
            name: "kube".to_string(),
        });
        let first = cloud
            .create_or_update_load_balancer(RESOURCE_GROUP, &lb)
            .await
            .unwrap();
        assert_eq!(first.id.as_deref(), Some(namer().load_balancer_id("kube").as_str()));
        assert_eq!(
            first.backend_address_pools[0].id.as_deref(),
            Some(namer().backend_pool_id("kube", "kube").as_str())
        );

        let second = cloud
            .create_or_update_load_balancer(RESOURCE_GROUP, &first)
            .await
            .unwrap();
        assert_ne!(first.etag, second.etag);
        assert_eq!(cloud.journal().len(), 2);
    }

    #[tokio::test]
    async fn test_rule_with_dangling_reference_is_rejected() {
        let cloud = cloud();
        let mut lb = LoadBalancer::new("kube", "westus");
        lb.load_balancing_rules.push(LoadBalancingRule {
            id: None,
            name: "a1-TCP-80-30080".to_string(),
            protocol: TransportProtocol::Tcp,
            frontend_ip_configuration: SubResource::new("/missing"),
            backend_address_pool: SubResource::new("/missing"),
            probe: SubResource::new("/missing"),
            frontend_port: 80,
            backend_port: 30080,
        });
        let err = cloud
            .create_or_update_load_balancer(RESOURCE_GROUP, &lb)
            .await
            .unwrap_err();
        assert_eq!(err.status, STATUS_BAD_REQUEST);
        assert!(cloud.journal().is_empty());
    }

    #[tokio::test]
    async fn test_static_address_allocation_is_stable() {
        let cloud = cloud();
        let pip = PublicIpAddress {
            id: None,
            name: "kube-a1".to_string(),
            location: "westus".to_string(),
            allocation_method: IpAllocationMethod::Static,
            ip_address: None,
        };
        let first = cloud.create_or_update_public_ip(RESOURCE_GROUP, &pip).await.unwrap();
        assert_eq!(first.ip_address.as_deref(), Some("52.0.0.1"));
        let again = cloud.create_or_update_public_ip(RESOURCE_GROUP, &pip).await.unwrap();
        assert_eq!(again.ip_address, first.ip_address);
    }

    #[tokio::test]
    async fn test_delete_absent_succeeds_without_journal() {
        let cloud = cloud();
        cloud.delete_public_ip(RESOURCE_GROUP, "nope").await.unwrap();
        cloud.delete_load_balancer(RESOURCE_GROUP, "nope").await.unwrap();
        cloud.delete_route(RESOURCE_GROUP, "kube", "nope").await.unwrap();
        assert!(cloud.journal().is_empty());
    }

    #[tokio::test]
    async fn test_injected_fault() {
        let cloud = cloud();
        cloud.seed_route_table(RouteTable {
            id: None,
            name: "kube".to_string(),
            location: "westus".to_string(),
            routes: vec![],
        });
        cloud.inject_fault(ResourceKind::RouteTable, "KUBE", RemoteError::new(500, "boom"));
        let err = cloud.get_route_table(RESOURCE_GROUP, "kube").await.unwrap_err();
        assert_eq!(err.status, 500);

        cloud.clear_faults();
        assert!(cloud.get_route_table(RESOURCE_GROUP, "kube").await.is_ok());
    }

    #[test]
    fn test_snapshot_json() {
        let cloud = cloud();
        cloud.seed_subnet(
            "kube-vnet",
            Subnet {
                id: None,
                name: "kube-subnet".to_string(),
                address_prefix: Some("10.240.0.0/16".to_string()),
                route_table: None,
            },
        );
        let json = cloud.snapshot().to_json().unwrap();
        let restored = CloudSnapshot::from_json(&json).unwrap();
        assert_eq!(restored, cloud.snapshot());
        assert!(restored.subnets.contains_key("kube-vnet/kube-subnet"));
    }
}
