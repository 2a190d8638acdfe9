//! Pod CIDR routes through the cluster route table.

use ipnet::IpNet;
use tracing::{debug, info};

use super::AzureProvider;
use crate::cloud::ResourceManager;
use crate::cluster::ClusterRoute;
use crate::error::{CloudError, Result};
use crate::existence::ExistenceExt;
use crate::naming;
use crate::reconciler::route_table::{cluster_routes, desired_route};
use crate::reconciler::{bind_route_table, reconcile_route};
use crate::resources::RouteTable;

impl<C: ResourceManager> AzureProvider<C> {
    /// Routes of the cluster route table. A missing table has no routes.
    pub async fn list_routes(&self, cluster: &str) -> Result<Vec<ClusterRoute>> {
        let table_name = naming::route_table_name(cluster);
        info!("list: START cluster={:?} table={:?}", cluster, table_name);

        let Some(table) = self
            .cloud
            .get_route_table(self.resource_group(), &table_name)
            .await
            .existence()?
            .into_option()
        else {
            info!("list: route table does not exist. table={:?}", table_name);
            return Ok(Vec::new());
        };

        let routes = cluster_routes(&table);
        for route in &routes {
            debug!(
                "list: instance={:?} cidr={:?}",
                route.target_instance, route.destination_cidr
            );
        }
        info!("list: FINISH routes={}", routes.len());
        Ok(routes)
    }

    /// Route `route.destination_cidr` to the primary address of `route.target_instance`.
    ///
    /// Creates the route table and binds it to the cluster subnet on first use.
    pub async fn create_route(
        &self,
        cluster: &str,
        name_hint: &str,
        route: &ClusterRoute,
    ) -> Result<()> {
        info!(
            "create: START cluster={:?} hint={:?} instance={:?} cidr={:?}",
            cluster, name_hint, route.target_instance, route.destination_cidr
        );
        route
            .destination_cidr
            .parse::<IpNet>()
            .map_err(|_| CloudError::InvalidCidr(route.destination_cidr.clone()))?;

        let table = self.ensure_route_table(cluster).await?;
        let table_id = table.id.clone().ok_or_else(|| CloudError::MissingField {
            resource: format!("route table {}", table.name),
            field: "id",
        })?;

        let (vnet, subnet_name) = (&self.config.vnet_name, &self.config.subnet_name);
        debug!("create: getting subnet. vnet={:?} subnet={:?}", vnet, subnet_name);
        let subnet = self
            .cloud
            .get_subnet(self.resource_group(), vnet, subnet_name)
            .await
            .existence()?
            .into_option()
            .ok_or_else(|| CloudError::missing("subnet", format!("{}/{}", vnet, subnet_name)))?;

        let bound = bind_route_table(&subnet, &table_id)?;
        if bound.dirty {
            let written = self
                .cloud
                .create_or_update_subnet(self.resource_group(), vnet, &bound.value)
                .await?;
            self.audit
                .subnet_bound(written.id.as_deref().unwrap_or(subnet_name), &table_id);
        } else {
            debug!("create: subnet already bound to route table");
        }

        let target_ip = self.ip_for_machine(&route.target_instance).await?;
        let desired = desired_route(&self.namer, cluster, route, &target_ip);
        let reconciled = reconcile_route(&table, desired.clone());
        if !reconciled.dirty {
            info!(
                "create: FINISH route already present. instance={:?}",
                route.target_instance
            );
            return Ok(());
        }

        let written = self
            .cloud
            .create_or_update_route(self.resource_group(), &table.name, &desired)
            .await?;
        self.audit.route_upserted(
            written.id.as_deref().unwrap_or(&desired.name),
            &desired.address_prefix,
            &target_ip,
        );
        info!("create: FINISH");
        Ok(())
    }

    /// Delete the route for `route.target_instance` without checking that it exists.
    pub async fn delete_route(&self, cluster: &str, route: &ClusterRoute) -> Result<()> {
        info!("delete: START instance={:?}", route.target_instance);
        let table_name = naming::route_table_name(cluster);
        let route_name = naming::route_name(&route.target_instance);
        self.cloud
            .delete_route(self.resource_group(), &table_name, &route_name)
            .await?;
        self.audit.route_deleted(&route_name);
        info!("delete: FINISH");
        Ok(())
    }

    async fn ensure_route_table(&self, cluster: &str) -> Result<RouteTable> {
        let table_name = naming::route_table_name(cluster);
        if let Some(table) = self
            .cloud
            .get_route_table(self.resource_group(), &table_name)
            .await
            .existence()?
            .into_option()
        {
            return Ok(table);
        }

        info!("create: route table needs creation. table={:?}", table_name);
        let table = RouteTable {
            id: None,
            name: table_name.clone(),
            location: self.config.location.clone(),
            routes: Vec::new(),
        };
        self.cloud
            .create_or_update_route_table(self.resource_group(), &table)
            .await?;
        let table = self
            .cloud
            .get_route_table(self.resource_group(), &table_name)
            .await?;
        self.audit
            .route_table_created(table.id.as_deref().unwrap_or(&table_name));
        Ok(table)
    }
}
