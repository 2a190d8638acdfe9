//! Per-resource remote API traits.
//!
//! Each trait covers one resource kind. Writes return the object as stored
//! remotely, with IDs filled in. Deletes of absent resources succeed.

use async_trait::async_trait;

use super::error::RemoteResult;
use crate::resources::{
    LoadBalancer, NetworkInterface, PublicIpAddress, Route, RouteTable, SecurityGroup, Subnet,
    VirtualMachine,
};

#[async_trait]
pub trait LoadBalancerApi: Send + Sync {
    async fn get_load_balancer(&self, resource_group: &str, name: &str)
    -> RemoteResult<LoadBalancer>;

    async fn create_or_update_load_balancer(
        &self,
        resource_group: &str,
        lb: &LoadBalancer,
    ) -> RemoteResult<LoadBalancer>;

    async fn delete_load_balancer(&self, resource_group: &str, name: &str) -> RemoteResult<()>;
}

#[async_trait]
pub trait PublicIpApi: Send + Sync {
    async fn get_public_ip(&self, resource_group: &str, name: &str)
    -> RemoteResult<PublicIpAddress>;

    async fn create_or_update_public_ip(
        &self,
        resource_group: &str,
        pip: &PublicIpAddress,
    ) -> RemoteResult<PublicIpAddress>;

    async fn delete_public_ip(&self, resource_group: &str, name: &str) -> RemoteResult<()>;
}

#[async_trait]
pub trait SecurityGroupApi: Send + Sync {
    async fn get_security_group(&self, resource_group: &str, name: &str)
    -> RemoteResult<SecurityGroup>;

    async fn create_or_update_security_group(
        &self,
        resource_group: &str,
        sg: &SecurityGroup,
    ) -> RemoteResult<SecurityGroup>;
}

#[async_trait]
pub trait RouteTableApi: Send + Sync {
    async fn get_route_table(&self, resource_group: &str, name: &str) -> RemoteResult<RouteTable>;

    async fn create_or_update_route_table(
        &self,
        resource_group: &str,
        table: &RouteTable,
    ) -> RemoteResult<RouteTable>;
}

#[async_trait]
pub trait RouteApi: Send + Sync {
    async fn create_or_update_route(
        &self,
        resource_group: &str,
        route_table: &str,
        route: &Route,
    ) -> RemoteResult<Route>;

    async fn delete_route(
        &self,
        resource_group: &str,
        route_table: &str,
        name: &str,
    ) -> RemoteResult<()>;
}

#[async_trait]
pub trait SubnetApi: Send + Sync {
    async fn get_subnet(&self, resource_group: &str, vnet: &str, name: &str)
    -> RemoteResult<Subnet>;

    async fn create_or_update_subnet(
        &self,
        resource_group: &str,
        vnet: &str,
        subnet: &Subnet,
    ) -> RemoteResult<Subnet>;
}

#[async_trait]
pub trait InterfaceApi: Send + Sync {
    async fn get_interface(&self, resource_group: &str, name: &str)
    -> RemoteResult<NetworkInterface>;

    async fn create_or_update_interface(
        &self,
        resource_group: &str,
        nic: &NetworkInterface,
    ) -> RemoteResult<NetworkInterface>;
}

#[async_trait]
pub trait VirtualMachineApi: Send + Sync {
    async fn get_virtual_machine(&self, resource_group: &str, name: &str)
    -> RemoteResult<VirtualMachine>;
}

/// Composite trait covering every remote resource the provider reconciles.
///
/// Implemented automatically for any type implementing all resource traits.
pub trait ResourceManager:
    LoadBalancerApi
    + PublicIpApi
    + SecurityGroupApi
    + RouteTableApi
    + RouteApi
    + SubnetApi
    + InterfaceApi
    + VirtualMachineApi
    + Send
    + Sync
{
}

impl<T> ResourceManager for T where
    T: LoadBalancerApi
        + PublicIpApi
        + SecurityGroupApi
        + RouteTableApi
        + RouteApi
        + SubnetApi
        + InterfaceApi
        + VirtualMachineApi
        + Send
        + Sync
{
}
