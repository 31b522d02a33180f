//! The common base every concrete source adapter builds on (spec §4.5):
//! interface matching, IP/prefix/VLAN correlation, permitted-subnet
//! filtering, manufacturer normalisation, custom-field registration, and
//! PTR/DNS enrichment. Adapters themselves (`crates/sources`) consume this
//! crate but never touch HTTP or the cache directly (spec §6
//! "Source-adapter contract").

pub mod adapter;
pub mod custom_field;
pub mod dns;
pub mod interfaces;
pub mod manufacturer_mapping;
pub mod permitted_subnets;
pub mod settings;
pub mod vlan;
pub mod vlan_filter;

pub use adapter::SourceAdapter;
pub use interfaces::{add_update_interface, map_object_interfaces_to_current_interfaces};
pub use permitted_subnets::PermittedSubnets;
pub use settings::SourceSettings;
pub use vlan::{add_vlan_object_to_netbox, get_vlan_object_if_exists, DiscoveredVlan};
