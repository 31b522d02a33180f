//! Sync orchestrator: three-phase apply, identity resolution, primary-IP
//! arbitration, VRF/tenant inheritance, VLAN correlation, prune, and tag GC
//! (spec §4.4). Operates on an already-populated
//! [`nb_inventory::Inventory`]; has no opinion on where that inventory's
//! entries came from — that is `source-framework`'s job.

pub mod error;
pub mod identity;
pub mod ip_topology;
pub mod loader;
pub mod orchestrator;
pub mod settings;
mod version;

pub use error::SyncError;
pub use identity::{find_host, PrimaryIpArbitration};
pub use ip_topology::{InheritedScope, TenantSource};
pub use loader::load_current;
pub use orchestrator::Orchestrator;
pub use settings::{EngineSettings, SetPrimaryIp, TenantInheritanceSource};
