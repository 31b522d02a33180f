//! `map_object_interfaces_to_current_interfaces` and `add_update_interface`
//! (spec §4.5), grounded on `source_base.py`'s methods of the same name.

use std::collections::BTreeMap;
use std::net::IpAddr;

use nb_inventory::{ClassTag, EntityId, FieldValue, Inventory};
use serde_json::{json, Map, Value as Json};
use sync_core::identity::{arbitrate_primary_ip, PrimaryIpArbitration};
use sync_core::ip_topology::{inherit_scope, longest_matching_prefix};
use tracing::{debug, warn};

use crate::settings::SourceSettings;
use crate::vlan::{add_vlan_object_to_netbox, find_vlan_group, get_vlan_object_if_exists, DiscoveredVlan};

fn interface_kind(e: &nb_inventory::Entity) -> &'static str {
    match e.get("type") {
        Some(FieldValue::Str(t)) if !t.contains("virtual") => "physical",
        _ => "virtual",
    }
}

fn data_kind(data: &Json) -> &'static str {
    match data.get("type").and_then(Json::as_str) {
        Some(t) if !t.contains("virtual") => "physical",
        _ => "virtual",
    }
}

/// Match discovered interfaces (`incoming`, name -> data) against the
/// Device/VM's current interfaces, in the precedence order spec §4.5
/// prescribes: exact name, then MAC+type, then MAC alone, then 1:1 by
/// sorted name for anything left over (or leave unmatched if
/// `append_unmatched` is set, so the caller creates new interfaces instead).
pub fn map_object_interfaces_to_current_interfaces(
    inventory: &Inventory,
    parent: EntityId,
    incoming: &BTreeMap<String, Json>,
    append_unmatched: bool,
) -> BTreeMap<String, Option<EntityId>> {
    let mut by_name: BTreeMap<String, EntityId> = BTreeMap::new();
    let mut by_mac_typed: BTreeMap<(&'static str, String), EntityId> = BTreeMap::new();
    let mut by_mac: BTreeMap<String, EntityId> = BTreeMap::new();

    for id in inventory.get_all_interfaces(parent) {
        let Some(e) = inventory.get(id) else { continue };
        if let Some(FieldValue::Str(name)) = e.get("name") {
            by_name.insert(name.clone(), id);
        }
        if let Some(FieldValue::Str(mac)) = e.get("mac_address") {
            by_mac_typed.insert((interface_kind(e), mac.clone()), id);
            by_mac.entry(mac.clone()).or_insert(id);
        }
    }

    let mut remaining_names: Vec<String> = by_name.keys().cloned().collect();
    let mut used: Vec<EntityId> = Vec::new();
    let mut result = BTreeMap::new();
    let mut unmatched = Vec::new();

    for (name, data) in incoming {
        let mac = data.get("mac_address").and_then(Json::as_str).unwrap_or("XX:XX:YY:YY:ZZ:ZZ");
        let kind = data_kind(data);

        let matched = if remaining_names.contains(name) {
            by_name.get(name).copied()
        } else if let Some(&id) = by_mac_typed.get(&(kind, mac.to_string())) {
            Some(id)
        } else if let Some(&id) = by_mac.get(mac) {
            (!used.contains(&id)).then_some(id)
        } else {
            None
        };

        match matched {
            Some(id) => {
                result.insert(name.clone(), Some(id));
                used.push(id);
                if let Some(e) = inventory.get(id) {
                    if let Some(FieldValue::Str(matched_name)) = e.get("name") {
                        remaining_names.retain(|n| n != matched_name);
                    }
                }
            }
            None => unmatched.push(name.clone()),
        }
    }

    unmatched.sort();
    remaining_names.sort();

    if append_unmatched {
        for name in unmatched {
            result.insert(name, None);
        }
    } else {
        for (new_name, current_name) in unmatched.into_iter().zip(remaining_names) {
            debug!("matching '{new_name}' to existing interface '{current_name}'");
            result.insert(new_name, by_name.get(&current_name).copied());
        }
    }

    result
}

/// Add or update one interface on a Device/VM, attach its IP addresses
/// (correlating each against the longest-matching prefix for VRF/tenant/VLAN
/// inheritance), and re-home any IP that belonged to a different,
/// lower-priority interface (spec §4.5 `add_update_interface`).
pub fn add_update_interface(
    inventory: &mut Inventory,
    settings: &SourceSettings,
    existing: Option<EntityId>,
    parent: EntityId,
    mut interface_data: Json,
    interface_ips: &[String],
    source_tag: &str,
) -> Option<(EntityId, Vec<EntityId>)> {
    let (iface_class, parent_field, site) = match parent.class() {
        ClassTag::Device => (ClassTag::Interface, "device", site_of_device(inventory, parent)),
        ClassTag::Vm => (ClassTag::VmInterface, "virtual_machine", site_of_vm(inventory, parent)),
        _ => {
            warn!("add_update_interface called with a parent that is neither Device nor VM");
            return None;
        }
    };

    let device_tenant = inventory.get(parent)?.get("tenant").and_then(FieldValue::as_ref_id);

    let mut untagged_vlan = None;
    let mut tagged_vlans = Vec::new();
    if let Json::Object(map) = &mut interface_data {
        map.insert(parent_field.to_string(), nb_reference_payload(inventory, parent));
        untagged_vlan = take_vlan_ref(map, "untagged_vlan");
        tagged_vlans = take_tagged_vlans(map);
    }

    let interface_id = match existing {
        Some(id) => {
            inventory.add_update_object(iface_class, &interface_data, false, Some(source_tag));
            id
        }
        None => inventory.add_update_object(iface_class, &interface_data, false, Some(source_tag))?,
    };

    let mut attached = Vec::new();
    let mut vlan_prefix = None;
    for raw_ip in interface_ips {
        let Ok(ip) = raw_ip.split('/').next().unwrap_or(raw_ip).parse::<IpAddr>() else {
            warn!("IP '{raw_ip}' does not appear to be a valid IP address, skipping");
            continue;
        };
        if !settings.permitted_subnets.permitted(ip, Some(raw_ip)) {
            continue;
        }

        let prefix = longest_matching_prefix(inventory, ip, site)
            .or_else(|| longest_matching_prefix(inventory, ip, None));
        vlan_prefix = vlan_prefix.or(prefix);
        let scope = inherit_scope(inventory, prefix, device_tenant, &settings.ip_tenant_inheritance_order);

        let existing_ip = find_existing_ip(inventory, raw_ip, interface_id, scope.vrf);
        let mut ip_data = json!({ "address": raw_ip, "assigned_object_id": nb_reference_payload(inventory, interface_id) });
        if let (Json::Object(map), Some(vrf)) = (&mut ip_data, scope.vrf) {
            map.insert("vrf".to_string(), nb_reference_payload(inventory, vrf));
        }
        if let (Json::Object(map), Some(tenant)) = (&mut ip_data, scope.tenant) {
            map.insert("tenant".to_string(), nb_reference_payload(inventory, tenant));
        }

        let Some((ip_id, arbitration)) = existing_ip else {
            let id = inventory.add_update_object(ClassTag::IpAddress, &ip_data, false, Some(source_tag))?;
            attached.push(id);
            continue;
        };

        match arbitration {
            PrimaryIpArbitration::Skip => continue,
            PrimaryIpArbitration::Steal | PrimaryIpArbitration::ReassignSameParent | PrimaryIpArbitration::Clear => {
                inventory.add_update_object(ClassTag::IpAddress, &ip_data, false, Some(source_tag));
            }
            PrimaryIpArbitration::Defer | PrimaryIpArbitration::AllowMultiple => {
                inventory.add_update_object(ClassTag::IpAddress, &ip_data, false, Some(source_tag));
            }
        }
        attached.push(ip_id);
    }

    // Any IP still assigned to this interface but not reconfirmed this run
    // loses the assignment, unless it is an anycast address (spec §3
    // invariant 5).
    for (ip_id, ip) in inventory.all(ClassTag::IpAddress) {
        let assigned_here = matches!(ip.get("assigned_object_id"), Some(FieldValue::Ref(a)) if *a == interface_id);
        if !assigned_here || attached.contains(&ip_id) {
            continue;
        }
        if matches!(ip.get("role"), Some(FieldValue::Str(r)) if r == "anycast") {
            continue;
        }
        inventory.unset_field(ip_id, "assigned_object_id");
    }

    let mut vlan_update = Map::new();
    if let Some((vid, name)) = untagged_vlan {
        if let Some(id) = resolve_vlan(inventory, settings, site, vlan_prefix, vid, &name, source_tag) {
            vlan_update.insert("untagged_vlan".to_string(), vlan_reference_payload(inventory, id, vid));
        }
    }
    if !tagged_vlans.is_empty() {
        let resolved: Vec<Json> = tagged_vlans
            .iter()
            .filter_map(|(vid, name)| {
                resolve_vlan(inventory, settings, site, vlan_prefix, *vid, name, source_tag).map(|id| (id, *vid))
            })
            .map(|(id, vid)| vlan_reference_payload(inventory, id, vid))
            .collect();
        if !resolved.is_empty() {
            vlan_update.insert("tagged_vlans".to_string(), Json::Array(resolved));
        }
    }
    if !vlan_update.is_empty() {
        inventory.update_by_id(interface_id, &Json::Object(vlan_update), Some(source_tag));
    }

    Some((interface_id, attached))
}

/// Pull `{"vid": u32, "name": str}` off `map[key]`, leaving the interface
/// payload without a raw VLAN descriptor that would otherwise be committed
/// verbatim into a `Ref`/`RefList` field.
fn take_vlan_ref(map: &mut Map<String, Json>, key: &str) -> Option<(u32, String)> {
    let raw = map.remove(key)?;
    let vid = raw.get("vid").and_then(Json::as_u64)? as u32;
    let name = raw.get("name").and_then(Json::as_str).unwrap_or_default().to_string();
    Some((vid, name))
}

fn take_tagged_vlans(map: &mut Map<String, Json>) -> Vec<(u32, String)> {
    let Some(Json::Array(arr)) = map.remove("tagged_vlans") else { return Vec::new() };
    arr.iter()
        .filter_map(|v| {
            let vid = v.get("vid").and_then(Json::as_u64)? as u32;
            let name = v.get("name").and_then(Json::as_str).unwrap_or_default().to_string();
            Some((vid, name))
        })
        .collect()
}

/// Resolve one discovered VLAN identifier to an `EntityId`, in the
/// precedence order spec §4.5 prescribes: prefix-linked VLAN, then
/// site/group/global scope match, then create-if-eligible.
fn resolve_vlan(
    inventory: &mut Inventory,
    settings: &SourceSettings,
    site: Option<EntityId>,
    prefix: Option<EntityId>,
    vid: u32,
    name: &str,
    source_tag: &str,
) -> Option<EntityId> {
    let discovered = DiscoveredVlan { vid, name: name.to_string(), site, prefix };
    if let Some(id) = get_vlan_object_if_exists(inventory, &discovered) {
        return Some(id);
    }

    let site_name = site.map(|s| inventory.display_name(s));
    if !add_vlan_object_to_netbox(settings, &discovered, site_name.as_deref()) {
        return None;
    }

    let mut data = Map::new();
    data.insert("vid".to_string(), json!(vid));
    data.insert("name".to_string(), json!(name));
    if let Some(site) = site {
        data.insert("site".to_string(), nb_reference_payload(inventory, site));
    }
    if let Some(group) = find_vlan_group(inventory, settings, &discovered) {
        data.insert("group".to_string(), nb_reference_payload(inventory, group));
    }
    inventory.add_update_object(ClassTag::Vlan, &Json::Object(data), false, Some(source_tag))
}

fn nb_reference_payload(inventory: &Inventory, id: EntityId) -> Json {
    match inventory.nb_reference(id) {
        Some(nb_id) => json!({ "id": nb_id }),
        None => json!({ "id": 0 }),
    }
}

/// Like [`nb_reference_payload`], but falls back to the VLAN's business key
/// (`vid`) rather than a synthetic `id: 0` when the target hasn't been
/// synced to NetBox yet, so `get_by_data` can still resolve it to the
/// entity created earlier this same pass.
fn vlan_reference_payload(inventory: &Inventory, id: EntityId, vid: u32) -> Json {
    match inventory.nb_reference(id) {
        Some(nb_id) => json!({ "id": nb_id }),
        None => json!({ "vid": vid }),
    }
}

fn site_of_device(inventory: &Inventory, device: EntityId) -> Option<EntityId> {
    inventory.get(device)?.get("site").and_then(FieldValue::as_ref_id)
}

fn site_of_vm(inventory: &Inventory, vm: EntityId) -> Option<EntityId> {
    inventory.get(vm)?.get("site").and_then(FieldValue::as_ref_id)
}

/// Find an `IPAddress` entity whose bare address matches `address`,
/// resolving the spec §4.4 primary-IP arbitration question of whether it is
/// safe for `interface` to claim it.
fn find_existing_ip(
    inventory: &Inventory,
    address: &str,
    interface: EntityId,
    vrf: Option<EntityId>,
) -> Option<(EntityId, PrimaryIpArbitration)> {
    let bare = address.split('/').next().unwrap_or(address);
    for (id, ip) in inventory.all(ClassTag::IpAddress) {
        let Some(FieldValue::Str(current_address)) = ip.get("address") else { continue };
        if current_address.split('/').next().unwrap_or(current_address) != bare {
            continue;
        }
        if ip.get("vrf").and_then(FieldValue::as_ref_id) != vrf {
            continue;
        }

        let is_anycast = matches!(ip.get("role"), Some(FieldValue::Str(r)) if r == "anycast");
        let current_assignment = ip.get("assigned_object_id").and_then(FieldValue::as_ref_id);
        let same_interface = current_assignment == Some(interface);

        let arbitration = match current_assignment {
            None => PrimaryIpArbitration::Clear,
            Some(holder) if holder == interface => PrimaryIpArbitration::ReassignSameParent,
            Some(holder) => {
                let holder_enabled = inventory
                    .get(holder)
                    .and_then(|h| h.get("enabled"))
                    .is_none_or(|v| !matches!(v, FieldValue::Bool(false)));
                let incoming_enabled = inventory
                    .get(interface)
                    .and_then(|h| h.get("enabled"))
                    .is_none_or(|v| !matches!(v, FieldValue::Bool(false)));
                arbitrate_primary_ip(is_anycast, same_interface, incoming_enabled, holder_enabled)
            }
        };
        return Some((id, arbitration));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(inventory: &mut Inventory, name: &str, site: Option<EntityId>) -> EntityId {
        let mut data = Map::new();
        data.insert("name".to_string(), json!(name));
        if let Some(site) = site {
            data.insert("site".to_string(), nb_reference_payload(inventory, site));
        }
        inventory.add_object(ClassTag::Device, &Json::Object(data), false, None).expect("device")
    }

    #[test]
    fn untagged_vlan_is_created_when_none_exists() {
        let mut inv = Inventory::new();
        let dev = device(&mut inv, "h1", None);
        let settings = SourceSettings::default();
        let data = json!({"name": "eth0", "type": "1000base-t", "untagged_vlan": {"vid": 100, "name": "vlan100"}});

        let (iface, _) = add_update_interface(&mut inv, &settings, None, dev, data, &[], "vc1")
            .expect("interface created");

        let vlan_id = inv.get(iface).and_then(|e| e.get("untagged_vlan")).and_then(FieldValue::as_ref_id).expect("vlan set");
        let vlan = inv.get(vlan_id).expect("vlan entity");
        assert!(matches!(vlan.get("vid"), Some(FieldValue::Int(100))));
        assert_eq!(inv.all(ClassTag::Vlan).count(), 1);
    }

    #[test]
    fn untagged_vlan_correlates_to_existing_site_scoped_vlan() {
        let mut inv = Inventory::new();
        let site = inv.add_object(ClassTag::Site, &json!({"name": "dc1"}), false, None).expect("site");
        let existing = inv
            .add_object(ClassTag::Vlan, &json!({"vid": 100, "name": "prod", "site": {"name": "dc1"}}), false, None)
            .expect("existing vlan");
        let dev = device(&mut inv, "h1", Some(site));
        let settings = SourceSettings::default();
        let data = json!({"name": "eth0", "type": "1000base-t", "untagged_vlan": {"vid": 100, "name": "prod"}});

        let (iface, _) = add_update_interface(&mut inv, &settings, None, dev, data, &[], "vc1")
            .expect("interface created");

        let vlan_id = inv.get(iface).and_then(|e| e.get("untagged_vlan")).and_then(FieldValue::as_ref_id);
        assert_eq!(vlan_id, Some(existing));
        assert_eq!(inv.all(ClassTag::Vlan).count(), 1, "must correlate, not duplicate");
    }

    #[test]
    fn tagged_vlans_resolve_to_multiple_entities() {
        let mut inv = Inventory::new();
        let dev = device(&mut inv, "h1", None);
        let settings = SourceSettings::default();
        let data = json!({
            "name": "eth0",
            "type": "1000base-t",
            "tagged_vlans": [{"vid": 10, "name": "ten"}, {"vid": 20, "name": "twenty"}],
        });

        let (iface, _) = add_update_interface(&mut inv, &settings, None, dev, data, &[], "vc1")
            .expect("interface created");

        let tagged = match inv.get(iface).and_then(|e| e.get("tagged_vlans")) {
            Some(FieldValue::RefList(ids)) => ids.clone(),
            other => panic!("expected a RefList, got {other:?}"),
        };
        assert_eq!(tagged.len(), 2);
        assert_eq!(inv.all(ClassTag::Vlan).count(), 2);
    }

    #[test]
    fn vlan_sync_disabled_leaves_untagged_vlan_unset() {
        let mut inv = Inventory::new();
        let dev = device(&mut inv, "h1", None);
        let mut settings = SourceSettings::default();
        settings.disable_vlan_sync = true;
        let data = json!({"name": "eth0", "type": "1000base-t", "untagged_vlan": {"vid": 100, "name": "vlan100"}});

        let (iface, _) = add_update_interface(&mut inv, &settings, None, dev, data, &[], "vc1")
            .expect("interface created");

        assert!(inv.get(iface).and_then(|e| e.get("untagged_vlan")).is_none());
        assert_eq!(inv.all(ClassTag::Vlan).count(), 0);
    }
}
