//! Reconcilers for the remote networking resources.
//!
//! Each reconciler compares the observed object with the state a service or
//! route wants and returns the converged object plus a dirty flag. They never
//! talk to the remote side; callers write back only when `dirty` is set.

pub mod host_pool;
pub mod load_balancer;
pub mod route_table;
pub mod security_group;

pub use host_pool::{primary_ip_config, primary_nic_id, reconcile_backend_pool_membership};
pub use load_balancer::reconcile_load_balancer;
pub use route_table::{bind_route_table, reconcile_route};
pub use security_group::reconcile_security_group;

use tracing::{debug, info};

use crate::cluster::{Protocol, Service};
use crate::error::{CloudError, Result};
use crate::naming;
use crate::resources::{ProbeProtocol, SecurityRuleProtocol, TransportProtocol, id_matches};

/// Result of a reconcile pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled<T> {
    /// The converged object. Equal to the input when `dirty` is false.
    pub value: T,
    /// Whether a remote write is required.
    pub dirty: bool,
}

impl<T> Reconciled<T> {
    pub fn unchanged(value: T) -> Self {
        Self {
            value,
            dirty: false,
        }
    }

    pub fn changed(value: T) -> Self {
        Self { value, dirty: true }
    }
}

/// Map a service protocol onto the load balancer, security rule and probe protocols.
///
/// Probes always use TCP: UDP backends are health-checked over TCP on the node port.
pub(crate) fn cloud_protocols(
    protocol: Protocol,
) -> Result<(TransportProtocol, SecurityRuleProtocol, ProbeProtocol)> {
    match protocol {
        Protocol::Tcp => Ok((
            TransportProtocol::Tcp,
            SecurityRuleProtocol::Tcp,
            ProbeProtocol::Tcp,
        )),
        Protocol::Udp => Ok((
            TransportProtocol::Udp,
            SecurityRuleProtocol::Udp,
            ProbeProtocol::Tcp,
        )),
        other => Err(CloudError::UnsupportedProtocol(other.to_string())),
    }
}

/// Converge the entries `service` owns in `current` toward `expected`.
///
/// Owned entries with no expected counterpart are dropped, expected entries
/// that are missing are appended after passing through `prepare`. Entries
/// owned by anyone else are left exactly where they are. Matching is by ID,
/// so every expected entry must carry the ID it will have remotely.
pub(crate) fn merge_owned<T>(
    current: &mut Vec<T>,
    expected: Vec<T>,
    service: &Service,
    kind: &str,
    name_of: impl Fn(&T) -> &str,
    id_of: impl Fn(&T) -> Option<&str>,
    mut prepare: impl FnMut(&[T], T) -> Result<T>,
) -> Result<bool> {
    let before = current.len();
    current.retain(|existing| {
        let name = name_of(existing);
        if !naming::service_owns(service, name) {
            return true;
        }
        let keep = expected
            .iter()
            .any(|e| id_of(e).is_some_and(|id| id_matches(id_of(existing), id)));
        if keep {
            debug!("reconcile: keeping {}. name={:?}", kind, name);
        } else {
            info!("reconcile: dropping {}. name={:?}", kind, name);
        }
        keep
    });
    let mut dirty = current.len() != before;

    for wanted in expected {
        let present = id_of(&wanted)
            .is_some_and(|id| current.iter().any(|c| id_matches(id_of(c), id)));
        if present {
            debug!("reconcile: {} already exists. name={:?}", kind, name_of(&wanted));
            continue;
        }
        let wanted = prepare(current.as_slice(), wanted)?;
        info!("reconcile: adding {}. name={:?}", kind, name_of(&wanted));
        current.push(wanted);
        dirty = true;
    }

    Ok(dirty)
}
