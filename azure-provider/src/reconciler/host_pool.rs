//! Backend pool membership of a single host.

use tracing::debug;

use super::Reconciled;
use crate::error::{CloudError, Result};
use crate::resources::{InterfaceIpConfiguration, NetworkInterface, SubResource, VirtualMachine};

/// ID of the machine's primary network interface.
///
/// A single attached interface is primary. With several, exactly one must
/// carry the primary flag.
pub fn primary_nic_id(vm: &VirtualMachine) -> Result<&str> {
    if let [only] = vm.network_interfaces.as_slice() {
        return Ok(&only.id);
    }

    let mut flagged = vm
        .network_interfaces
        .iter()
        .filter(|nic| nic.primary == Some(true));
    match (flagged.next(), flagged.next()) {
        (Some(nic), None) => Ok(&nic.id),
        _ => Err(CloudError::NoPrimaryNic {
            machine: vm.name.clone(),
        }),
    }
}

/// The interface's only IP configuration.
pub fn primary_ip_config(nic: &NetworkInterface) -> Result<&InterfaceIpConfiguration> {
    match nic.ip_configurations.as_slice() {
        [only] => Ok(only),
        other => Err(CloudError::AmbiguousIpConfig {
            nic: nic.name.clone(),
            count: other.len(),
        }),
    }
}

/// Add `pool_id` to the interface's IP configuration if it is not there yet.
pub fn reconcile_backend_pool_membership(
    nic: &NetworkInterface,
    pool_id: &str,
) -> Result<Reconciled<NetworkInterface>> {
    let ip_config = primary_ip_config(nic)?;
    let joined = ip_config
        .load_balancer_backend_address_pools
        .iter()
        .any(|pool| pool.id.eq_ignore_ascii_case(pool_id));
    if joined {
        return Ok(Reconciled::unchanged(nic.clone()));
    }

    debug!(
        "ensure_host_in_pool: adding interface to backend pool. nic={:?} pool={:?}",
        nic.name, pool_id
    );
    let mut updated = nic.clone();
    if let Some(config) = updated.ip_configurations.first_mut() {
        config
            .load_balancer_backend_address_pools
            .push(SubResource::new(pool_id));
    }
    Ok(Reconciled::changed(updated))
}
