//! Remote resource-manager abstraction.
//!
//! The provider never talks to the control plane directly. Every remote
//! object is reached through the traits in this module, keyed by resource
//! group and name, with Get/CreateOrUpdate/Delete semantics.
//!
//! # Architecture
//!
//! ```text
//! AzureProvider<C: ResourceManager>
//!        ↓
//!  cloud.get_load_balancer(rg, name)             // observed state
//!  reconcile_load_balancer(..)                    // pure diff
//!  cloud.create_or_update_load_balancer(rg, lb)   // only when dirty
//! ```
//!
//! Transport, authentication and retries belong to the implementation behind
//! these traits. `MemoryCloud` implements them in-process.

mod error;
mod traits;

pub use error::{RemoteError, RemoteResult};
pub use traits::*;
