//! Route table reconciler - per-node pod CIDR routes and the subnet binding.

use tracing::info;

use super::Reconciled;
use crate::cluster::ClusterRoute;
use crate::error::{CloudError, Result};
use crate::naming::{self, ResourceNamer};
use crate::resources::{NextHopType, Route, RouteTable, SubResource, Subnet, id_matches};

/// Bind `route_table_id` to `subnet` unless it is already bound.
///
/// A subnet bound to any other table is never rebound.
pub fn bind_route_table(subnet: &Subnet, route_table_id: &str) -> Result<Reconciled<Subnet>> {
    match &subnet.route_table {
        Some(current) if current.id.eq_ignore_ascii_case(route_table_id) => {
            Ok(Reconciled::unchanged(subnet.clone()))
        }
        Some(current) => Err(CloudError::SubnetRouteTableConflict {
            subnet: subnet.name.clone(),
            expected: route_table_id.to_string(),
            actual: current.id.clone(),
        }),
        None => {
            info!(
                "reconcile_routes: binding route table to subnet. subnet={:?} table={:?}",
                subnet.name, route_table_id
            );
            let mut bound = subnet.clone();
            bound.route_table = Some(SubResource::new(route_table_id));
            Ok(Reconciled::changed(bound))
        }
    }
}

/// The route sending `route.destination_cidr` to the node at `target_ip`.
pub fn desired_route(
    namer: &ResourceNamer,
    cluster: &str,
    route: &ClusterRoute,
    target_ip: &str,
) -> Route {
    let table = naming::route_table_name(cluster);
    let name = naming::route_name(&route.target_instance);
    Route {
        id: Some(namer.route_id(&table, &name)),
        name,
        address_prefix: route.destination_cidr.clone(),
        next_hop_type: NextHopType::VirtualAppliance,
        next_hop_ip_address: Some(target_ip.to_string()),
    }
}

/// Upsert `desired` into the table, replacing a route with the same name.
pub fn reconcile_route(table: &RouteTable, desired: Route) -> Reconciled<RouteTable> {
    let existing = table
        .routes
        .iter()
        .position(|r| r.name.eq_ignore_ascii_case(&desired.name));

    match existing {
        Some(i) if same_route(&table.routes[i], &desired) => Reconciled::unchanged(table.clone()),
        Some(i) => {
            let mut updated = table.clone();
            updated.routes[i] = Route {
                id: updated.routes[i].id.take().or(desired.id.clone()),
                ..desired
            };
            Reconciled::changed(updated)
        }
        None => {
            let mut updated = table.clone();
            updated.routes.push(desired);
            Reconciled::changed(updated)
        }
    }
}

fn same_route(a: &Route, b: &Route) -> bool {
    a.address_prefix == b.address_prefix
        && a.next_hop_type == b.next_hop_type
        && a.next_hop_ip_address == b.next_hop_ip_address
}

/// Translate every route of the table back into cluster routes.
pub fn cluster_routes(table: &RouteTable) -> Vec<ClusterRoute> {
    table
        .routes
        .iter()
        .map(|r| ClusterRoute {
            name: r.name.clone(),
            target_instance: naming::instance_name(&r.name),
            destination_cidr: r.address_prefix.clone(),
        })
        .collect()
}

/// Whether `table` is the table the subnet should point at.
pub fn is_bound_to(subnet: &Subnet, table: &RouteTable) -> bool {
    match (&subnet.route_table, &table.id) {
        (Some(bound), Some(id)) => id_matches(Some(bound.id.as_str()), id),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{CLUSTER, namer};

    fn make_subnet(route_table: Option<&str>) -> Subnet {
        Subnet {
            id: Some(namer().subnet_id("kube-vnet", "kube-subnet")),
            name: "kube-subnet".to_string(),
            address_prefix: Some("10.240.0.0/16".to_string()),
            route_table: route_table.map(SubResource::new),
        }
    }

    fn make_table() -> RouteTable {
        RouteTable {
            id: Some(namer().route_table_id(CLUSTER)),
            name: CLUSTER.to_string(),
            location: "westus".to_string(),
            routes: vec![],
        }
    }

    fn node_route(instance: &str, cidr: &str) -> ClusterRoute {
        ClusterRoute {
            name: String::new(),
            target_instance: instance.to_string(),
            destination_cidr: cidr.to_string(),
        }
    }

    #[test]
    fn test_bind_unbound_subnet() {
        let table_id = namer().route_table_id(CLUSTER);
        let out = bind_route_table(&make_subnet(None), &table_id).unwrap();
        assert!(out.dirty);
        assert!(is_bound_to(&out.value, &make_table()));

        let again = bind_route_table(&out.value, &table_id).unwrap();
        assert!(!again.dirty);
    }

    #[test]
    fn test_bind_refuses_foreign_table() {
        let foreign = namer().route_table_id("someone-else");
        let subnet = make_subnet(Some(&foreign));
        let err = bind_route_table(&subnet, &namer().route_table_id(CLUSTER)).unwrap_err();
        assert!(matches!(
            err,
            CloudError::SubnetRouteTableConflict { ref actual, .. } if *actual == foreign
        ));
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_route_upsert() {
        let route = desired_route(&namer(), CLUSTER, &node_route("node-1", "10.244.1.0/24"), "10.240.0.4");
        assert_eq!(route.name, "node-1");
        assert_eq!(route.next_hop_type, NextHopType::VirtualAppliance);

        let added = reconcile_route(&make_table(), route.clone());
        assert!(added.dirty);
        assert_eq!(added.value.routes.len(), 1);

        let same = reconcile_route(&added.value, route);
        assert!(!same.dirty);

        let moved = desired_route(&namer(), CLUSTER, &node_route("node-1", "10.244.1.0/24"), "10.240.0.9");
        let out = reconcile_route(&added.value, moved);
        assert!(out.dirty);
        assert_eq!(out.value.routes.len(), 1);
        assert_eq!(
            out.value.routes[0].next_hop_ip_address.as_deref(),
            Some("10.240.0.9")
        );
    }

    #[test]
    fn test_cluster_routes() {
        let mut table = make_table();
        for (node, cidr) in [("node-1", "10.244.1.0/24"), ("node-2", "10.244.2.0/24")] {
            table = reconcile_route(
                &table,
                desired_route(&namer(), CLUSTER, &node_route(node, cidr), "10.240.0.4"),
            )
            .value;
        }
        let routes = cluster_routes(&table);
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[1].target_instance, "node-2");
        assert_eq!(routes[1].name, "node-2");
        assert_eq!(routes[1].destination_cidr, "10.244.2.0/24");
    }
}
