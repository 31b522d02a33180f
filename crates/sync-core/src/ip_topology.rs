//! Longest-prefix-match IP correlation and VRF/tenant inheritance
//! (spec §4.4 "VRF and tenant inheritance", grounded on
//! `source_base.py::return_longest_matching_prefix_for_ip`).
//!
//! VLAN correlation (`get_vlan_object_if_exists`/`add_vlan_group`) lives in
//! `source-framework` instead, since it also needs the VLAN-group
//! name/id-range filters that are a source-adapter-framework concern per
//! spec §4.5 — this module only owns the Prefix-side lookup every adapter
//! shares.

use std::net::IpAddr;

use ipnet::IpNet;
use nb_inventory::{ClassTag, EntityId, FieldValue, Inventory};

use crate::settings::TenantInheritanceSource;

/// Find the most specific [`ClassTag::Prefix`] covering `ip`, preferring a
/// prefix whose `site` equals `site`, falling back to the longest global
/// match (spec §4.4: "preferring prefixes whose scope... equals the
/// Device/VM's site; else the globally longest match").
pub fn longest_matching_prefix(inventory: &Inventory, ip: IpAddr, site: Option<EntityId>) -> Option<EntityId> {
    best_match(inventory, ip, site).or_else(|| best_match(inventory, ip, None))
}

fn best_match(inventory: &Inventory, ip: IpAddr, site: Option<EntityId>) -> Option<EntityId> {
    let mut best: Option<(EntityId, u8)> = None;
    for (id, prefix) in inventory.all(ClassTag::Prefix) {
        if let Some(want_site) = site {
            match prefix.get("site") {
                Some(FieldValue::Ref(s)) if *s == want_site => {}
                _ => continue,
            }
        }
        let Some(FieldValue::Str(cidr)) = prefix.get("prefix") else { continue };
        let Ok(net) = cidr.parse::<IpNet>() else { continue };
        if !net.contains(&ip) {
            continue;
        }
        let len = net.prefix_len();
        if best.is_none_or(|(_, best_len)| len > best_len) {
            best = Some((id, len));
        }
    }
    best.map(|(id, _)| id)
}

/// Which input actually supplied the inherited tenant, for logging/tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantSource {
    Device,
    Prefix,
}

/// VRF + tenant inherited from a matched prefix and/or the owning
/// Device/VM, per the configured inheritance order (spec §4.4).
#[derive(Debug, Clone, Copy, Default)]
pub struct InheritedScope {
    pub vrf: Option<EntityId>,
    pub tenant: Option<EntityId>,
    pub tenant_source: Option<TenantSource>,
}

/// Derive VRF (always taken from the matched prefix, if any) and tenant
/// (walked in `order`, first populated entry wins; an empty `order` disables
/// inheritance entirely — spec §4.4 "`disabled` disabling inheritance").
pub fn inherit_scope(
    inventory: &Inventory,
    prefix: Option<EntityId>,
    device_tenant: Option<EntityId>,
    order: &[TenantInheritanceSource],
) -> InheritedScope {
    let vrf = prefix.and_then(|p| match inventory.get(p)?.get("vrf") {
        Some(FieldValue::Ref(v)) => Some(*v),
        _ => None,
    });
    let prefix_tenant = prefix.and_then(|p| match inventory.get(p)?.get("tenant") {
        Some(FieldValue::Ref(t)) => Some(*t),
        _ => None,
    });

    for source in order {
        let (candidate, tag) = match source {
            TenantInheritanceSource::Device => (device_tenant, TenantSource::Device),
            TenantInheritanceSource::Prefix => (prefix_tenant, TenantSource::Prefix),
        };
        if let Some(tenant) = candidate {
            return InheritedScope {
                vrf,
                tenant: Some(tenant),
                tenant_source: Some(tag),
            };
        }
    }

    InheritedScope {
        vrf,
        tenant: None,
        tenant_source: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prefers_site_scoped_over_longer_global_match() {
        let mut inv = Inventory::new();
        inv.add_object(ClassTag::Site, &json!({"name": "dc1"}), false, None)
            .expect("site");
        inv.add_object(ClassTag::Prefix, &json!({"prefix": "10.0.0.0/8"}), false, None);
        let scoped = inv
            .add_object(
                ClassTag::Prefix,
                &json!({"prefix": "10.0.0.0/24", "site": {"name": "dc1"}}),
                false,
                None,
            )
            .expect("scoped prefix");
        let site = inv
            .add_update_object(ClassTag::Site, &json!({"name": "dc1"}), false, None)
            .expect("same site resolved");

        let ip: IpAddr = "10.0.0.5".parse().expect("ip");
        assert_eq!(longest_matching_prefix(&inv, ip, Some(site)), Some(scoped));
    }

    #[test]
    fn longest_prefix_wins_without_site_preference() {
        let mut inv = Inventory::new();
        inv.add_object(ClassTag::Prefix, &json!({"prefix": "10.0.0.0/8"}), false, None);
        let narrow = inv
            .add_object(ClassTag::Prefix, &json!({"prefix": "10.0.0.0/24"}), false, None)
            .expect("narrow prefix");
        let ip: IpAddr = "10.0.0.5".parse().expect("ip");
        assert_eq!(longest_matching_prefix(&inv, ip, None), Some(narrow));
    }

    #[test]
    fn tenant_inheritance_order_prefers_first_populated() {
        let mut inv = Inventory::new();
        let device_tenant = inv
            .add_object(ClassTag::Tenant, &json!({"name": "dev-tenant"}), false, None)
            .expect("tenant");
        let prefix_tenant = inv
            .add_object(ClassTag::Tenant, &json!({"name": "prefix-tenant"}), false, None)
            .expect("tenant");
        let prefix = inv
            .add_object(
                ClassTag::Prefix,
                &json!({"prefix": "10.0.0.0/24", "tenant": {"name": "prefix-tenant"}}),
                false,
                None,
            )
            .expect("prefix");
        let _ = prefix_tenant;

        let order = [TenantInheritanceSource::Device, TenantInheritanceSource::Prefix];
        let scope = inherit_scope(&inv, Some(prefix), Some(device_tenant), &order);
        assert_eq!(scope.tenant, Some(device_tenant));
        assert_eq!(scope.tenant_source, Some(TenantSource::Device));

        let order_prefix_first = [TenantInheritanceSource::Prefix, TenantInheritanceSource::Device];
        let scope2 = inherit_scope(&inv, Some(prefix), Some(device_tenant), &order_prefix_first);
        assert_eq!(scope2.tenant, Some(prefix_tenant));
        assert_eq!(scope2.tenant_source, Some(TenantSource::Prefix));
    }
}
