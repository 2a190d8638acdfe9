//! Security group reconciler - ingress rules for service node ports.

use super::{Reconciled, cloud_protocols, merge_owned};
use crate::cluster::Service;
use crate::error::Result;
use crate::naming::{self, ResourceNamer};
use crate::priority::next_available_priority;
use crate::resources::{Access, Direction, SecurityGroup, SecurityRule};

/// Source prefix of service ingress rules.
const SOURCE_INTERNET: &str = "Internet";
const ANY: &str = "*";

/// Converge the cluster security group toward the ingress rules `service` needs.
///
/// New rules get the lowest free priority at the moment they are appended,
/// after stale rules of the service have been dropped.
pub fn reconcile_security_group(
    namer: &ResourceNamer,
    sg: &SecurityGroup,
    service: &Service,
) -> Result<Reconciled<SecurityGroup>> {
    service.validate()?;

    let identity = naming::rule_prefix(service);
    naming::check_prefix_collision(
        &identity,
        sg.security_rules
            .iter()
            .filter_map(|r| naming::owner_prefix(&r.name)),
    )?;

    let mut expected = Vec::with_capacity(service.ports.len());
    for port in &service.ports {
        let name = naming::rule_name(service, port);
        let (_, protocol, _) = cloud_protocols(port.protocol)?;
        expected.push(SecurityRule {
            id: Some(namer.security_rule_id(&sg.name, &name)),
            name,
            protocol,
            source_port_range: ANY.to_string(),
            destination_port_range: port.node_port.to_string(),
            source_address_prefix: SOURCE_INTERNET.to_string(),
            destination_address_prefix: ANY.to_string(),
            access: Access::Allow,
            direction: Direction::Inbound,
            priority: None,
        });
    }

    let mut updated = sg.clone();
    let dirty = merge_owned(
        &mut updated.security_rules,
        expected,
        service,
        "security rule",
        |r| r.name.as_str(),
        |r| r.id.as_deref(),
        |current, mut rule| {
            rule.priority = Some(next_available_priority(current)?);
            Ok(rule)
        },
    )?;

    if dirty {
        Ok(Reconciled::changed(updated))
    } else {
        Ok(Reconciled::unchanged(sg.clone()))
    }
}
