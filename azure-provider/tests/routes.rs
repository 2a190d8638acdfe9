//! Integration tests for pod CIDR routes.

mod harness;

use azure_provider::CloudError;
use azure_provider::cluster::ClusterRoute;
use azure_provider::memory::{ResourceKind, WriteOp};
use azure_provider::resources::{NextHopType, Subnet};

use harness::{CLUSTER, SUBNET, TestCloud, VNET, namer};

fn node_route(instance: &str, cidr: &str) -> ClusterRoute {
    ClusterRoute {
        name: String::new(),
        target_instance: instance.to_string(),
        destination_cidr: cidr.to_string(),
    }
}

#[tokio::test]
async fn test_list_without_table_is_empty() {
    let env = TestCloud::new();
    assert!(env.provider.list_routes(CLUSTER).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_route_builds_table_and_binds_subnet() {
    let env = TestCloud::with_nodes(2);
    env.provider
        .create_route(CLUSTER, "hint", &node_route("node-1", "10.244.1.0/24"))
        .await
        .unwrap();

    let kinds: Vec<_> = env.cloud.journal().iter().map(|w| w.kind).collect();
    assert_eq!(
        kinds,
        vec![ResourceKind::RouteTable, ResourceKind::Subnet, ResourceKind::Route]
    );

    let snapshot = env.cloud.snapshot();
    let table = &snapshot.route_tables["kube"];
    assert_eq!(table.routes.len(), 1);
    assert_eq!(table.routes[0].name, "node-1");
    assert_eq!(table.routes[0].address_prefix, "10.244.1.0/24");
    assert_eq!(table.routes[0].next_hop_type, NextHopType::VirtualAppliance);
    assert_eq!(table.routes[0].next_hop_ip_address.as_deref(), Some("10.240.0.5"));

    let subnet = &snapshot.subnets["kube-vnet/kube-subnet"];
    assert_eq!(
        subnet.route_table.as_ref().map(|t| t.id.as_str()),
        Some(namer().route_table_id(CLUSTER).as_str())
    );

    let routes = env.provider.list_routes(CLUSTER).await.unwrap();
    assert_eq!(routes, vec![ClusterRoute {
        name: "node-1".to_string(),
        target_instance: "node-1".to_string(),
        destination_cidr: "10.244.1.0/24".to_string(),
    }]);
}

#[tokio::test]
async fn test_create_route_is_idempotent() {
    let env = TestCloud::with_nodes(1);
    let route = node_route("node-0", "10.244.0.0/24");
    env.provider.create_route(CLUSTER, "", &route).await.unwrap();
    env.cloud.clear_journal();

    env.provider.create_route(CLUSTER, "", &route).await.unwrap();
    assert!(env.cloud.journal().is_empty());
}

#[tokio::test]
async fn test_second_node_reuses_binding() {
    let env = TestCloud::with_nodes(2);
    env.provider
        .create_route(CLUSTER, "", &node_route("node-0", "10.244.0.0/24"))
        .await
        .unwrap();
    env.cloud.clear_journal();

    env.provider
        .create_route(CLUSTER, "", &node_route("node-1", "10.244.1.0/24"))
        .await
        .unwrap();
    let kinds: Vec<_> = env.cloud.journal().iter().map(|w| w.kind).collect();
    assert_eq!(kinds, vec![ResourceKind::Route]);
    assert_eq!(env.provider.list_routes(CLUSTER).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_foreign_subnet_binding_is_refused() {
    let env = TestCloud::with_nodes(1);
    let foreign = namer().route_table_id("someone-else");
    env.cloud.seed_subnet(
        VNET,
        Subnet {
            id: None,
            name: SUBNET.to_string(),
            address_prefix: Some("10.240.0.0/16".to_string()),
            route_table: Some(azure_provider::resources::SubResource::new(foreign.clone())),
        },
    );

    let err = env
        .provider
        .create_route(CLUSTER, "", &node_route("node-0", "10.244.0.0/24"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CloudError::SubnetRouteTableConflict { ref actual, .. } if *actual == foreign
    ));

    let snapshot = env.cloud.snapshot();
    assert_eq!(
        snapshot.subnets["kube-vnet/kube-subnet"]
            .route_table
            .as_ref()
            .map(|t| t.id.clone()),
        Some(foreign)
    );
    assert!(snapshot.route_tables["kube"].routes.is_empty());
    assert!(env.cloud.journal().iter().all(|w| w.kind != ResourceKind::Subnet));
}

#[tokio::test]
async fn test_invalid_cidr() {
    let env = TestCloud::with_nodes(1);
    let err = env
        .provider
        .create_route(CLUSTER, "", &node_route("node-0", "10.244.0.0/33"))
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::InvalidCidr(_)));
    assert!(env.cloud.journal().is_empty());
}

#[tokio::test]
async fn test_route_to_unknown_node() {
    let env = TestCloud::new();
    let err = env
        .provider
        .create_route(CLUSTER, "", &node_route("ghost", "10.244.9.0/24"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CloudError::ResourceMissing { kind: "virtual machine", .. }
    ));
}

#[tokio::test]
async fn test_delete_route() {
    let env = TestCloud::with_nodes(2);
    for (node, cidr) in [("node-0", "10.244.0.0/24"), ("node-1", "10.244.1.0/24")] {
        env.provider
            .create_route(CLUSTER, "", &node_route(node, cidr))
            .await
            .unwrap();
    }
    env.cloud.clear_journal();

    env.provider
        .delete_route(CLUSTER, &node_route("node-0", ""))
        .await
        .unwrap();
    let journal = env.cloud.journal();
    assert_eq!(journal.len(), 1);
    assert_eq!(journal[0].op, WriteOp::Delete);

    let routes = env.provider.list_routes(CLUSTER).await.unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].target_instance, "node-1");

    // Deleting again does not check existence.
    env.provider
        .delete_route(CLUSTER, &node_route("node-0", ""))
        .await
        .unwrap();
}
