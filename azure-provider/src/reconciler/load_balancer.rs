//! Load balancer reconciler - backend pool, frontend IP configuration, probes and rules.

use tracing::info;

use super::{Reconciled, cloud_protocols, merge_owned};
use crate::cluster::Service;
use crate::error::{CloudError, Result};
use crate::naming::{self, ResourceNamer};
use crate::resources::{
    BackendAddressPool, FrontendIpConfiguration, LoadBalancer, LoadBalancingRule, Probe,
    PublicIpAddress, SubResource, id_matches,
};

/// Seconds between health probes.
pub const PROBE_INTERVAL_SECONDS: u32 = 5;
/// Consecutive probe results needed to change a backend's state.
pub const PROBE_COUNT: u32 = 2;

/// Converge the shared cluster load balancer toward what `service` wants.
///
/// `pip` is the service's public IP. `None` means the service no longer wants
/// exposure: its frontend configuration, probes and rules are removed.
/// The input is never modified; on error nothing is returned.
pub fn reconcile_load_balancer(
    namer: &ResourceNamer,
    lb: &LoadBalancer,
    pip: Option<&PublicIpAddress>,
    cluster: &str,
    service: &Service,
) -> Result<Reconciled<LoadBalancer>> {
    service.validate()?;

    let lb_name = naming::load_balancer_name(cluster);
    let identity = naming::rule_prefix(service);
    let pool_name = naming::backend_pool_name(cluster);
    let pool_id = namer.backend_pool_id(&lb_name, &pool_name);
    let frontend_name = naming::frontend_ip_config_name(service);
    let frontend_id = namer.frontend_ip_config_id(&lb_name, &frontend_name);

    naming::check_prefix_collision(&identity, live_identities(lb))?;

    let mut updated = lb.clone();
    let mut dirty = false;

    // Backend pool: create if absent, never repair.
    match lb.backend_address_pools.as_slice() {
        [] => {
            info!("reconcile_lb: creating backend pool. pool={:?}", pool_name);
            updated.backend_address_pools = vec![BackendAddressPool {
                id: Some(pool_id.clone()),
                name: pool_name,
            }];
            dirty = true;
        }
        [pool] if id_matches(pool.id.as_deref(), &pool_id) => {}
        pools => {
            let actual: Vec<_> = pools
                .iter()
                .map(|p| p.id.as_deref().unwrap_or(p.name.as_str()))
                .collect();
            return Err(CloudError::misconfigured(
                format!("load balancer {}", lb_name),
                format!(
                    "already configured with a different backend pool. expected={:?} actual={:?}",
                    pool_id, actual
                ),
            ));
        }
    }

    // Frontend IP configuration, matched by ID.
    let configs = &mut updated.frontend_ip_configurations;
    match pip {
        Some(pip) => {
            if !configs
                .iter()
                .any(|c| id_matches(c.id.as_deref(), &frontend_id))
            {
                let pip_id = pip.id.clone().ok_or_else(|| CloudError::MissingField {
                    resource: format!("public IP {}", pip.name),
                    field: "id",
                })?;
                info!(
                    "reconcile_lb: adding frontend ip config. name={:?} pip={:?}",
                    frontend_name, pip_id
                );
                configs.push(FrontendIpConfiguration {
                    id: Some(frontend_id.clone()),
                    name: frontend_name,
                    public_ip_address: Some(SubResource::new(pip_id)),
                });
                dirty = true;
            }
        }
        None => {
            let before = configs.len();
            configs.retain(|c| !id_matches(c.id.as_deref(), &frontend_id));
            if configs.len() != before {
                info!(
                    "reconcile_lb: removing frontend ip config. name={:?}",
                    frontend_name
                );
                dirty = true;
            }
        }
    }

    // Probes and rules: one pair per service port.
    let mut expected_probes = Vec::with_capacity(service.ports.len());
    let mut expected_rules = Vec::with_capacity(service.ports.len());
    for port in &service.ports {
        let name = naming::rule_name(service, port);
        let (transport, _, probe_protocol) = cloud_protocols(port.protocol)?;
        let probe_id = namer.load_balancer_probe_id(&lb_name, &name);

        expected_probes.push(Probe {
            id: Some(probe_id.clone()),
            name: name.clone(),
            protocol: probe_protocol,
            port: port.node_port,
            interval_in_seconds: PROBE_INTERVAL_SECONDS,
            number_of_probes: PROBE_COUNT,
        });
        expected_rules.push(LoadBalancingRule {
            id: Some(namer.load_balancer_rule_id(&lb_name, &name)),
            name,
            protocol: transport,
            frontend_ip_configuration: SubResource::new(frontend_id.clone()),
            backend_address_pool: SubResource::new(pool_id.clone()),
            probe: SubResource::new(probe_id),
            frontend_port: port.port,
            backend_port: port.node_port,
        });
    }

    dirty |= merge_owned(
        &mut updated.probes,
        expected_probes,
        service,
        "probe",
        |p| p.name.as_str(),
        |p| p.id.as_deref(),
        |_, p| Ok(p),
    )?;
    dirty |= merge_owned(
        &mut updated.load_balancing_rules,
        expected_rules,
        service,
        "rule",
        |r| r.name.as_str(),
        |r| r.id.as_deref(),
        |_, r| Ok(r),
    )?;

    if dirty {
        Ok(Reconciled::changed(updated))
    } else {
        Ok(Reconciled::unchanged(lb.clone()))
    }
}

/// Identities of every service that currently has objects on the load balancer.
fn live_identities(lb: &LoadBalancer) -> Vec<&str> {
    lb.frontend_ip_configurations
        .iter()
        .map(|c| c.name.as_str())
        .chain(lb.probes.iter().filter_map(|p| naming::owner_prefix(&p.name)))
        .chain(
            lb.load_balancing_rules
                .iter()
                .filter_map(|r| naming::owner_prefix(&r.name)),
        )
        .collect()
}
