//! Load balancer lifecycle for services, plus public IPs and backend pool membership.

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::AzureProvider;
use crate::cloud::ResourceManager;
use crate::cluster::{LoadBalancerStatus, Service};
use crate::error::{CloudError, HostFailure, Result};
use crate::existence::ExistenceExt;
use crate::naming;
use crate::reconciler::{
    reconcile_backend_pool_membership, reconcile_load_balancer, reconcile_security_group,
};
use crate::resources::{IpAllocationMethod, LoadBalancer, PublicIpAddress, SecurityGroup};

impl<C: ResourceManager> AzureProvider<C> {
    /// Status of the service's load balancer, `None` when the load balancer
    /// or the service's public IP does not exist.
    pub async fn get_load_balancer(
        &self,
        cluster: &str,
        service: &Service,
    ) -> Result<Option<LoadBalancerStatus>> {
        let lb_name = naming::load_balancer_name(cluster);
        let pip_name = naming::public_ip_name(cluster, service);
        info!(
            "get: START cluster={:?} lb={:?} service={} pip={:?}",
            cluster, lb_name, service, pip_name
        );

        let lb = self
            .cloud
            .get_load_balancer(self.resource_group(), &lb_name)
            .await
            .existence()?;
        if !lb.exists() {
            info!("get: FINISH load balancer does not exist. lb={:?}", lb_name);
            return Ok(None);
        }

        let Some(pip) = self
            .cloud
            .get_public_ip(self.resource_group(), &pip_name)
            .await
            .existence()?
            .into_option()
        else {
            info!("get: FINISH public IP does not exist. pip={:?}", pip_name);
            return Ok(None);
        };

        info!("get: FINISH service={} lb={:?}", service, lb_name);
        status_for(&pip).map(Some)
    }

    /// Expose `service` through the cluster load balancer and join `hosts`
    /// to its backend pool.
    pub async fn ensure_load_balancer(
        &self,
        cluster: &str,
        service: &Service,
        hosts: &[String],
    ) -> Result<LoadBalancerStatus> {
        service.validate()?;
        let lb_name = naming::load_balancer_name(cluster);
        let pip_name = naming::public_ip_name(cluster, service);
        info!(
            "ensure: START cluster={:?} lb={:?} service={} pip={:?} hosts={}",
            cluster,
            lb_name,
            service,
            pip_name,
            hosts.len()
        );

        let pip = self.ensure_public_ip_exists(&pip_name).await?;

        debug!("ensure: getting security group");
        let sg = self
            .cloud
            .get_security_group(self.resource_group(), &self.config.security_group_name)
            .await
            .existence()?
            .into_option()
            .ok_or_else(|| {
                CloudError::missing("security group", self.config.security_group_name.clone())
            })?;
        self.write_security_group(&sg, service).await?;

        debug!("ensure: getting load balancer");
        let (lb, needs_create) = match self
            .cloud
            .get_load_balancer(self.resource_group(), &lb_name)
            .await
            .existence()?
            .into_option()
        {
            Some(lb) => (lb, false),
            None => {
                info!("ensure: load balancer needs creation. lb={:?}", lb_name);
                (LoadBalancer::new(&lb_name, &self.config.location), true)
            }
        };

        let reconciled = reconcile_load_balancer(&self.namer, &lb, Some(&pip), cluster, service)?;
        if needs_create || reconciled.dirty {
            info!("ensure: writing load balancer. lb={:?}", lb_name);
            let written = self
                .cloud
                .create_or_update_load_balancer(self.resource_group(), &reconciled.value)
                .await?;
            self.audit.load_balancer_updated(
                written.id.as_deref().unwrap_or(&lb_name),
                &service.to_string(),
            );
        }

        let pool_id = self
            .namer
            .backend_pool_id(&lb_name, &naming::backend_pool_name(cluster));
        self.ensure_hosts_in_pool(hosts, &pool_id).await?;

        let status = status_for(&pip)?;
        info!(
            "ensure: FINISH service={} ip={:?}",
            service, status.ingress[0].ip
        );
        Ok(status)
    }

    pub async fn update_load_balancer(
        &self,
        cluster: &str,
        service: &Service,
        hosts: &[String],
    ) -> Result<()> {
        info!(
            "update: START cluster={:?} service={} hosts={}",
            cluster,
            service,
            hosts.len()
        );
        self.ensure_load_balancer(cluster, service, hosts).await?;
        info!("update: FINISH");
        Ok(())
    }

    /// Remove everything `service` owns: frontend configuration, probes,
    /// rules, security rules and finally its public IP.
    ///
    /// The load balancer itself is deleted once no frontend configuration is left.
    pub async fn ensure_load_balancer_deleted(&self, cluster: &str, service: &Service) -> Result<()> {
        let lb_name = naming::load_balancer_name(cluster);
        let pip_name = naming::public_ip_name(cluster, service);
        info!(
            "delete: START cluster={:?} lb={:?} service={} pip={:?}",
            cluster, lb_name, service, pip_name
        );
        let service = service.without_ports();

        if let Some(lb) = self
            .cloud
            .get_load_balancer(self.resource_group(), &lb_name)
            .await
            .existence()?
            .into_option()
        {
            let reconciled = reconcile_load_balancer(&self.namer, &lb, None, cluster, &service)?;
            if reconciled.dirty {
                if reconciled.value.frontend_ip_configurations.is_empty() {
                    info!("delete: no frontend left, deleting load balancer. lb={:?}", lb_name);
                    self.cloud
                        .delete_load_balancer(self.resource_group(), &lb_name)
                        .await?;
                    self.audit
                        .load_balancer_deleted(&lb_name, &service.to_string());
                } else {
                    let written = self
                        .cloud
                        .create_or_update_load_balancer(self.resource_group(), &reconciled.value)
                        .await?;
                    self.audit.load_balancer_updated(
                        written.id.as_deref().unwrap_or(&lb_name),
                        &service.to_string(),
                    );
                }
            }
        }

        if let Some(sg) = self
            .cloud
            .get_security_group(self.resource_group(), &self.config.security_group_name)
            .await
            .existence()?
            .into_option()
        {
            self.write_security_group(&sg, &service).await?;
        }

        self.ensure_public_ip_deleted(&pip_name).await?;

        info!("delete: FINISH");
        Ok(())
    }

    async fn write_security_group(&self, sg: &SecurityGroup, service: &Service) -> Result<()> {
        let reconciled = reconcile_security_group(&self.namer, sg, service)?;
        if reconciled.dirty {
            info!("reconcile_sg: writing security group. sg={:?}", sg.name);
            let written = self
                .cloud
                .create_or_update_security_group(self.resource_group(), &reconciled.value)
                .await?;
            self.audit.security_group_updated(
                written.id.as_deref().unwrap_or(&sg.name),
                &service.to_string(),
            );
        }
        Ok(())
    }

    /// Fetch the public IP, creating a static one when absent.
    pub async fn ensure_public_ip_exists(&self, name: &str) -> Result<PublicIpAddress> {
        if let Some(pip) = self
            .cloud
            .get_public_ip(self.resource_group(), name)
            .await
            .existence()?
            .into_option()
        {
            return Ok(pip);
        }

        info!("ensure: creating public IP. pip={:?}", name);
        let pip = PublicIpAddress {
            id: None,
            name: name.to_string(),
            location: self.config.location.clone(),
            allocation_method: IpAllocationMethod::Static,
            ip_address: None,
        };
        self.cloud
            .create_or_update_public_ip(self.resource_group(), &pip)
            .await?;

        debug!("ensure: retrieving public IP. pip={:?}", name);
        let pip = self.cloud.get_public_ip(self.resource_group(), name).await?;
        self.audit.public_ip_created(
            pip.id.as_deref().unwrap_or(name),
            pip.ip_address.as_deref(),
        );
        Ok(pip)
    }

    /// Delete the public IP. An already absent IP is not an error.
    pub async fn ensure_public_ip_deleted(&self, name: &str) -> Result<()> {
        let deleted = self
            .cloud
            .delete_public_ip(self.resource_group(), name)
            .await
            .existence()?;
        if deleted.exists() {
            self.audit.public_ip_deleted(name);
        }
        Ok(())
    }

    /// Join the primary IP configuration of `machine` to the backend pool.
    pub async fn ensure_host_in_pool(&self, machine_name: &str, pool_id: &str) -> Result<()> {
        let machine = self
            .machine(machine_name, || {
                CloudError::missing("virtual machine", machine_name)
            })
            .await?;
        let nic = self.primary_interface(&machine).await?;

        let reconciled = reconcile_backend_pool_membership(&nic, pool_id)?;
        if !reconciled.dirty {
            debug!(
                "ensure: nic already in backend pool. machine={:?}",
                machine_name
            );
            return Ok(());
        }

        info!(
            "ensure: nic update start. machine={:?} nic={:?}",
            machine.name, nic.name
        );
        let written = self
            .cloud
            .create_or_update_interface(self.resource_group(), &reconciled.value)
            .await?;
        self.audit
            .nic_joined_pool(written.id.as_deref().unwrap_or(&nic.name), pool_id);
        Ok(())
    }

    /// Join every host to the backend pool with bounded concurrency.
    ///
    /// All hosts are attempted. Failures are collected into
    /// [`CloudError::PartialFailure`], ordered like `hosts`.
    pub async fn ensure_hosts_in_pool(&self, hosts: &[String], pool_id: &str) -> Result<()> {
        if hosts.is_empty() {
            return Ok(());
        }
        let limit = self.config.host_update_concurrency.max(1);

        let mut results: Vec<(usize, Result<()>)> = stream::iter(hosts.iter().enumerate())
            .map(|(i, host)| async move { (i, self.ensure_host_in_pool(host, pool_id).await) })
            .buffer_unordered(limit)
            .collect()
            .await;
        results.sort_by_key(|(i, _)| *i);

        let failures: Vec<HostFailure> = results
            .into_iter()
            .filter_map(|(i, result)| {
                result.err().map(|error| HostFailure {
                    host: hosts[i].clone(),
                    error,
                })
            })
            .collect();

        if failures.is_empty() {
            return Ok(());
        }
        for failure in &failures {
            warn!(
                "ensure: host failed to join backend pool. host={:?} error={}",
                failure.host, failure.error
            );
        }
        self.audit
            .hosts_failed(failures.len(), hosts.len(), pool_id);
        Err(CloudError::PartialFailure {
            attempted: hosts.len(),
            failures,
        })
    }
}

fn status_for(pip: &PublicIpAddress) -> Result<LoadBalancerStatus> {
    let ip = pip
        .ip_address
        .clone()
        .ok_or_else(|| CloudError::MissingField {
            resource: format!("public IP {}", pip.name),
            field: "ipAddress",
        })?;
    Ok(LoadBalancerStatus::from_ip(ip))
}
