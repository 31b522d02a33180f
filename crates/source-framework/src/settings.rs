//! The typed settings bundle every adapter's `settings()` exposes (spec
//! §4.5: "a parsed typed config bundle including at least: `enabled`,
//! `permitted_subnets`, `set_primary_ip`, `ip_tenant_inheritance_order`,
//! and name/id filter regexes").

use sync_core::settings::{SetPrimaryIp, TenantInheritanceSource};

use crate::permitted_subnets::PermittedSubnets;
use crate::vlan_filter::{VlanFilterById, VlanFilterByName};

/// One `(filter, vlan_group_name)` pair from a `vlan_group_relation_by_*`
/// config table (`add_vlan_group`'s first-match-wins lookup).
pub struct VlanGroupRelationByName(pub VlanFilterByName, pub String);
/// Same, keyed by VLAN ID instead of name.
pub struct VlanGroupRelationById(pub VlanFilterById, pub String);

/// Per-source configuration the framework consults when running an
/// adapter's `apply()` (spec §4.5).
pub struct SourceSettings {
    pub enabled: bool,
    pub permitted_subnets: PermittedSubnets,
    pub set_primary_ip: SetPrimaryIp,
    pub ip_tenant_inheritance_order: Vec<TenantInheritanceSource>,
    pub match_host_by_serial: bool,
    pub disable_vlan_sync: bool,
    pub vlan_sync_exclude_by_name: Vec<VlanFilterByName>,
    pub vlan_sync_exclude_by_id: Vec<VlanFilterById>,
    pub vlan_group_relation_by_name: Vec<VlanGroupRelationByName>,
    pub vlan_group_relation_by_id: Vec<VlanGroupRelationById>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            permitted_subnets: PermittedSubnets::default(),
            set_primary_ip: SetPrimaryIp::WhenUndefined,
            ip_tenant_inheritance_order: vec![TenantInheritanceSource::Device, TenantInheritanceSource::Prefix],
            match_host_by_serial: false,
            disable_vlan_sync: false,
            vlan_sync_exclude_by_name: Vec::new(),
            vlan_sync_exclude_by_id: Vec::new(),
            vlan_group_relation_by_name: Vec::new(),
            vlan_group_relation_by_id: Vec::new(),
        }
    }
}
