//! VLAN correlation helpers: matching a discovered VLAN to an existing
//! NetBox `VLAN`/`VLANGroup`, and the eligibility gate for creating new ones
//! (spec §4.5, grounded on `source_base.py`'s `add_vlan_group`,
//! `get_vlan_object_if_exists`, `add_vlan_object_to_netbox`).

use nb_inventory::{ClassTag, EntityId, FieldValue, Inventory};
use tracing::debug;

use crate::settings::SourceSettings;

/// A VLAN a source discovered, identified but not necessarily yet present
/// in the inventory.
#[derive(Debug, Clone)]
pub struct DiscoveredVlan {
    pub vid: u32,
    pub name: String,
    pub site: Option<EntityId>,
    /// The `Prefix` covering the interface's address, if one was found.
    /// When that prefix already declares a `vlan`, it outranks any
    /// site/group/global match (spec §4.5 precedence step a).
    pub prefix: Option<EntityId>,
}

/// Find an existing `VLAN` matching `vlan`, in precedence order: the VLAN
/// already linked from `vlan.prefix` (if any), then exact site match, then
/// matching `VLANGroup` scope, then a global (siteless, groupless) VLAN
/// with the same ID. `None` means no match exists yet.
pub fn get_vlan_object_if_exists(inventory: &Inventory, vlan: &DiscoveredVlan) -> Option<EntityId> {
    debug!("looking for an existing VLAN with id {}", vlan.vid);

    if let Some(prefix) = vlan.prefix {
        if let Some(vlan_ref) = inventory.get(prefix).and_then(|e| e.get("vlan")).and_then(FieldValue::as_ref_id) {
            return Some(vlan_ref);
        }
    }

    let mut by_site = None;
    let mut by_group = None;
    let mut global = None;

    for (id, e) in inventory.all(ClassTag::Vlan) {
        let Some(FieldValue::Int(vid)) = e.get("vid") else { continue };
        if *vid as u32 != vlan.vid {
            continue;
        }

        let has_site = matches!(e.get("site"), Some(FieldValue::Ref(s)) if Some(*s) == vlan.site);
        if has_site {
            by_site = Some(id);
            break;
        }

        if let Some(FieldValue::Ref(_group)) = e.get("group") {
            if by_group.is_none() {
                by_group = Some(id);
            }
            continue;
        }

        if e.get("site").is_none() {
            global = Some(id);
        }
    }

    by_site.or(by_group).or(global)
}

/// Find the `VLANGroup` this VLAN should belong to, based on the
/// name/ID filter relation tables in `settings` (first match wins, name
/// before ID, spec §4.5 `add_vlan_group`).
pub fn find_vlan_group(inventory: &Inventory, settings: &SourceSettings, vlan: &DiscoveredVlan) -> Option<EntityId> {
    let site_name = vlan.site.map(|s| inventory.display_name(s));

    for rel in &settings.vlan_group_relation_by_name {
        if rel.0.matches(&vlan.name, site_name.as_deref()) {
            if let Some(id) = find_group_by_name(inventory, &rel.1) {
                return Some(id);
            }
        }
    }
    for rel in &settings.vlan_group_relation_by_id {
        if rel.0.matches(vlan.vid, site_name.as_deref()) {
            if let Some(id) = find_group_by_name(inventory, &rel.1) {
                return Some(id);
            }
        }
    }
    None
}

fn find_group_by_name(inventory: &Inventory, name: &str) -> Option<EntityId> {
    inventory
        .all(ClassTag::VlanGroup)
        .find(|(_, e)| matches!(e.get("name"), Some(FieldValue::Str(n)) if n == name))
        .map(|(id, _)| id)
}

/// Whether a newly-discovered VLAN should be synced to NetBox at all (spec
/// §4.5 `add_vlan_object_to_netbox`): excludes VMware's reserved VGT ID
/// 4095 and anything out of the valid 1..4094 range, plus any
/// `vlan_sync_exclude_by_*` match.
pub fn add_vlan_object_to_netbox(settings: &SourceSettings, vlan: &DiscoveredVlan, site_name: Option<&str>) -> bool {
    if settings.disable_vlan_sync {
        return false;
    }
    if vlan.vid == 4095 {
        debug!("skipping sync of VLAN '{}' id {} (reserved VGT id)", vlan.name, vlan.vid);
        return false;
    }
    if vlan.vid >= 4096 {
        return false;
    }
    if settings.vlan_sync_exclude_by_name.iter().any(|f| f.matches(&vlan.name, site_name)) {
        return false;
    }
    if settings.vlan_sync_exclude_by_id.iter().any(|f| f.matches(vlan.vid, site_name)) {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn site_scoped_vlan_wins_over_global() {
        let mut inv = Inventory::new();
        let site = inv.add_object(ClassTag::Site, &json!({"name": "dc1"}), false, None).expect("site");
        inv.add_object(ClassTag::Vlan, &json!({"vid": 100, "name": "global"}), false, None);
        let scoped = inv
            .add_object(ClassTag::Vlan, &json!({"vid": 100, "name": "scoped", "site": {"name": "dc1"}}), false, None)
            .expect("scoped vlan");

        let found =
            get_vlan_object_if_exists(&inv, &DiscoveredVlan { vid: 100, name: "scoped".into(), site: Some(site), prefix: None });
        assert_eq!(found, Some(scoped));
    }

    #[test]
    fn reserved_vgt_id_is_never_synced() {
        let settings = SourceSettings::default();
        let vlan = DiscoveredVlan { vid: 4095, name: "vgt".into(), site: None, prefix: None };
        assert!(!add_vlan_object_to_netbox(&settings, &vlan, None));
    }

    #[test]
    fn prefix_linked_vlan_outranks_site_scope_match() {
        let mut inv = Inventory::new();
        let site = inv.add_object(ClassTag::Site, &json!({"name": "dc1"}), false, None).expect("site");
        let _scoped = inv
            .add_object(ClassTag::Vlan, &json!({"vid": 100, "name": "scoped", "site": {"name": "dc1"}}), false, None)
            .expect("scoped vlan");
        let linked = inv
            .add_object(ClassTag::Vlan, &json!({"id": 55, "vid": 200, "name": "linked-elsewhere"}), true, None)
            .expect("linked vlan");
        let prefix = inv
            .add_object(
                ClassTag::Prefix,
                &json!({"prefix": "10.10.0.0/24", "vlan": {"id": inv.nb_reference(linked).unwrap_or(0)}}),
                false,
                None,
            )
            .expect("prefix");

        let found = get_vlan_object_if_exists(
            &inv,
            &DiscoveredVlan { vid: 100, name: "scoped".into(), site: Some(site), prefix: Some(prefix) },
        );
        assert_eq!(found, Some(linked), "prefix's own linked vlan must win over the vid/site match");
    }
}
