//! Engine-wide policy settings the orchestrator and the source-adapter
//! framework both consult. Loading these from a config file is out of
//! scope (spec §1); `bin/netbox-sync` is the only crate that constructs one
//! from disk.

/// When to steal primary-IP ownership from another holder (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetPrimaryIp {
    /// Always take it, unsetting the previous holder's primary_ip field.
    Always,
    /// Only assign if the device/VM currently has none set.
    WhenUndefined,
    /// Never touch primary_ip fields.
    Never,
}

/// Where an IP's tenant is inherited from, tried in list order (spec §4.4
/// "VRF and tenant inheritance").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantInheritanceSource {
    Device,
    Prefix,
}

/// Policy knobs shared by the orchestrator and every source adapter.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// The string stamped on every managed object (spec GLOSSARY "Primary tag").
    pub primary_tag: String,
    /// Log would-be HTTP bodies and skip write requests (spec §5).
    pub dry_run: bool,
    /// Gate for the prune pass entirely.
    pub prune_enabled: bool,
    /// Grace period before an orphaned object is actually deleted.
    pub prune_delay_in_days: i64,
    /// Host serial/asset-tag identity fallback (spec §4.4 step 3, Device only).
    pub match_host_by_serial: bool,
    /// spec §4.4 "set_primary_ip policy".
    pub set_primary_ip: SetPrimaryIp,
    /// spec §4.4 "ordered inheritance list", `disabled` clears the list.
    pub ip_tenant_inheritance_order: Vec<TenantInheritanceSource>,
}

impl EngineSettings {
    /// The orphan tag derived from the primary tag (spec GLOSSARY).
    pub fn orphan_tag(&self) -> String {
        format!("{}: Orphaned", self.primary_tag)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            primary_tag: "NetBox-synced".to_string(),
            dry_run: false,
            prune_enabled: true,
            prune_delay_in_days: 30,
            match_host_by_serial: true,
            set_primary_ip: SetPrimaryIp::WhenUndefined,
            ip_tenant_inheritance_order: vec![TenantInheritanceSource::Device, TenantInheritanceSource::Prefix],
        }
    }
}
