//! Audit trail of remote writes.
//!
//! Every event is emitted on the `audit` tracing target with the IDs of the
//! affected resources. The no-op variant drops events and is meant for tests.

use tracing::{info, warn};

/// Provider audit logger
#[derive(Debug, Clone)]
pub struct ProviderAuditLogger {
    component: String,
    enabled: bool,
}

impl ProviderAuditLogger {
    pub fn new(component: &str) -> Self {
        Self {
            component: component.to_string(),
            enabled: true,
        }
    }

    pub fn new_noop() -> Self {
        Self {
            component: String::new(),
            enabled: false,
        }
    }

    fn audit(&self, message: String, object_ids: &[&str]) {
        if self.enabled {
            info!(target: "audit", component = %self.component, objects = ?object_ids, "{}", message);
        }
    }

    fn audit_warn(&self, message: String, object_ids: &[&str]) {
        if self.enabled {
            warn!(target: "audit", component = %self.component, objects = ?object_ids, "{}", message);
        }
    }

    // Load balancer events
    pub fn load_balancer_updated(&self, lb_id: &str, service: &str) {
        self.audit(
            format!("Load balancer updated for service {}", service),
            &[lb_id],
        );
    }

    pub fn load_balancer_deleted(&self, lb_name: &str, service: &str) {
        self.audit(
            format!(
                "Load balancer {} deleted: last frontend removed by service {}",
                lb_name, service
            ),
            &[lb_name],
        );
    }

    // Public IP events
    pub fn public_ip_created(&self, pip_id: &str, address: Option<&str>) {
        self.audit(
            format!(
                "Public IP created: {} ({})",
                pip_id,
                address.unwrap_or("pending")
            ),
            &[pip_id],
        );
    }

    pub fn public_ip_deleted(&self, pip_name: &str) {
        self.audit(format!("Public IP deleted: {}", pip_name), &[pip_name]);
    }

    // Security group events
    pub fn security_group_updated(&self, sg_id: &str, service: &str) {
        self.audit(
            format!("Security group updated for service {}", service),
            &[sg_id],
        );
    }

    // Route events
    pub fn route_table_created(&self, table_id: &str) {
        self.audit(format!("Route table created: {}", table_id), &[table_id]);
    }

    pub fn subnet_bound(&self, subnet_id: &str, table_id: &str) {
        self.audit(
            format!("Subnet {} bound to route table {}", subnet_id, table_id),
            &[subnet_id, table_id],
        );
    }

    pub fn route_upserted(&self, route_id: &str, cidr: &str, next_hop: &str) {
        self.audit(
            format!("Route upserted: {} via {}", cidr, next_hop),
            &[route_id],
        );
    }

    pub fn route_deleted(&self, route_name: &str) {
        self.audit(format!("Route deleted: {}", route_name), &[route_name]);
    }

    // Host events
    pub fn nic_joined_pool(&self, nic_id: &str, pool_id: &str) {
        self.audit(
            format!("Network interface joined backend pool {}", pool_id),
            &[nic_id, pool_id],
        );
    }

    pub fn hosts_failed(&self, failed: usize, attempted: usize, pool_id: &str) {
        self.audit_warn(
            format!(
                "{} of {} hosts failed to join backend pool",
                failed, attempted
            ),
            &[pool_id],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_is_disabled() {
        let logger = ProviderAuditLogger::new_noop();
        assert!(!logger.enabled);
        logger.route_deleted("node-1");
    }

    #[test]
    fn test_component_is_kept() {
        let logger = ProviderAuditLogger::new("azure-provider");
        assert!(logger.enabled);
        assert_eq!(logger.component, "azure-provider");
    }
}
