//! Identity resolution: matching a source-reported Device/VM to an existing
//! NetBox object (spec §4.4 "Identity resolution").

use std::collections::HashMap;

use nb_inventory::{ClassTag, EntityId, FieldValue, Inventory};
use serde_json::Value as Json;
use tracing::debug;

/// The ratio the top MAC-tally candidate must beat the runner-up by for the
/// match to be accepted rather than rejected as ambiguous (spec §4.4 step 2).
const MAC_TALLY_WIN_RATIO: f64 = 2.0;

/// Everything a source can supply to help identity resolution locate an
/// existing Device or VM. All fields optional except `class`/`object_data`.
#[derive(Debug, Default)]
pub struct HostIdentityHint<'a> {
    pub mac_addresses: &'a [String],
    pub serial: Option<&'a str>,
    pub asset_tag: Option<&'a str>,
    pub primary_ip4: Option<&'a str>,
    pub primary_ip6: Option<&'a str>,
}

/// Find an existing Device (`class == ClassTag::Device`) or VM
/// (`class == ClassTag::Vm`) matching `object_data`/`hint`, trying each
/// strategy in the order spec §4.4 prescribes and returning on first hit.
pub fn find_host(
    inventory: &Inventory,
    class: ClassTag,
    object_data: &Json,
    hint: &HostIdentityHint<'_>,
    match_host_by_serial: bool,
) -> Option<EntityId> {
    debug_assert!(matches!(class, ClassTag::Device | ClassTag::Vm));

    let map = object_data.as_object().cloned().unwrap_or_default();
    if let Some(found) = inventory.get_by_data(class, &map) {
        return Some(found);
    }

    if let Some(found) = match_by_mac_tally(inventory, class, hint.mac_addresses) {
        return Some(found);
    }

    if class == ClassTag::Device && match_host_by_serial {
        if let Some(serial) = hint.serial {
            if let Some(found) = find_by_str_field(inventory, class, "serial", serial) {
                return Some(found);
            }
        }
        if let Some(asset_tag) = hint.asset_tag {
            if let Some(found) = find_by_str_field(inventory, class, "asset_tag", asset_tag) {
                return Some(found);
            }
        }
    }

    if let Some(ip) = hint.primary_ip4 {
        if let Some(found) = match_by_primary_ip(inventory, class, "primary_ip4", ip) {
            return Some(found);
        }
    }
    if let Some(ip) = hint.primary_ip6 {
        if let Some(found) = match_by_primary_ip(inventory, class, "primary_ip6", ip) {
            return Some(found);
        }
    }

    None
}

fn find_by_str_field(inventory: &Inventory, class: ClassTag, field: &str, needle: &str) -> Option<EntityId> {
    if needle.is_empty() {
        return None;
    }
    inventory
        .all(class)
        .find(|(_, e)| matches!(e.get(field), Some(FieldValue::Str(s)) if s.eq_ignore_ascii_case(needle)))
        .map(|(id, _)| id)
}

/// spec §4.4 step 2: tally MAC hits per parent entity across the matching
/// interface class, accept the top scorer only if it beats the runner-up by
/// [`MAC_TALLY_WIN_RATIO`].
fn match_by_mac_tally(inventory: &Inventory, class: ClassTag, mac_list: &[String]) -> Option<EntityId> {
    if mac_list.is_empty() {
        return None;
    }
    let (iface_class, parent_field) = match class {
        ClassTag::Device => (ClassTag::Interface, "device"),
        ClassTag::Vm => (ClassTag::VmInterface, "virtual_machine"),
        _ => return None,
    };

    let mut tally: HashMap<EntityId, u32> = HashMap::new();
    for (_, iface) in inventory.all(iface_class) {
        let Some(FieldValue::Str(mac)) = iface.get("mac_address") else { continue };
        if !mac_list.iter().any(|m| m.eq_ignore_ascii_case(mac)) {
            continue;
        }
        if let Some(FieldValue::Ref(parent)) = iface.get(parent_field) {
            *tally.entry(*parent).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(EntityId, u32)> = tally.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    match ranked.as_slice() {
        [] => None,
        [(only, _)] => Some(*only),
        [(top, top_score), (_, second_score), ..] => {
            let ratio = f64::from(*top_score) / f64::from((*second_score).max(1));
            if ratio >= MAC_TALLY_WIN_RATIO {
                Some(*top)
            } else {
                debug!("MAC-tally ratio {ratio:.2} below {MAC_TALLY_WIN_RATIO}, rejecting as ambiguous");
                None
            }
        }
    }
}

/// spec §4.4 step 4: compare the bare address (no prefix length) of every
/// existing Device/VM's `primary_ip{4,6}` against `needle`.
fn match_by_primary_ip(inventory: &Inventory, class: ClassTag, field: &str, needle: &str) -> Option<EntityId> {
    let needle = needle.split('/').next().unwrap_or(needle);
    inventory.all(class).find_map(|(id, e)| {
        let FieldValue::Ref(ip_id) = e.get(field)? else { return None };
        let ip = inventory.get(*ip_id)?;
        let FieldValue::Str(address) = ip.get("address")? else { return None };
        let bare = address.split('/').next().unwrap_or(address);
        (bare == needle).then_some(id)
    })
}

/// Primary-IP arbitration outcome for one candidate assignment (spec §4.4
/// "Primary-IP arbitration").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryIpArbitration {
    /// No conflicting holder; assign freely.
    Clear,
    /// Same Device/VM, different interface: reassign.
    ReassignSameParent,
    /// Existing holder's interface is disabled and the incoming one is
    /// enabled: take it from them.
    Steal,
    /// Incoming interface is disabled and the holder's is enabled: leave it.
    Skip,
    /// Both enabled, different parents: needs a second pass, or a warning if
    /// none is available.
    Defer,
    /// `role=anycast`: any number of simultaneous holders is fine.
    AllowMultiple,
}

/// Decide what to do about an IP address candidate that already has a
/// holder, given the incoming and existing assignment's enabled state and
/// parent identity.
pub fn arbitrate_primary_ip(
    is_anycast: bool,
    same_parent: bool,
    incoming_enabled: bool,
    holder_enabled: bool,
) -> PrimaryIpArbitration {
    if is_anycast {
        return PrimaryIpArbitration::AllowMultiple;
    }
    if same_parent {
        return PrimaryIpArbitration::ReassignSameParent;
    }
    match (incoming_enabled, holder_enabled) {
        (true, false) => PrimaryIpArbitration::Steal,
        (false, true) => PrimaryIpArbitration::Skip,
        (true, true) => PrimaryIpArbitration::Defer,
        (false, false) => PrimaryIpArbitration::Defer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_host_with_interface(inv: &mut Inventory, host_name: &str, mac: &str) -> EntityId {
        let id = inv
            .add_object(ClassTag::Device, &json!({"name": host_name}), false, None)
            .expect("device created");
        inv.add_update_object(
            ClassTag::Interface,
            &json!({"name": "eth0", "device": {"name": host_name}, "mac_address": mac}),
            false,
            None,
        );
        id
    }

    #[test]
    fn mac_tally_accepts_two_to_one_ratio() {
        let mut inv = Inventory::new();
        let a = make_host_with_interface(&mut inv, "a", "AA:AA:AA:AA:AA:01");
        inv.add_update_object(
            ClassTag::Interface,
            &json!({"name": "eth1", "device": {"name": "a"}, "mac_address": "AA:AA:AA:AA:AA:02"}),
            false,
            None,
        );
        let _b = make_host_with_interface(&mut inv, "b", "AA:AA:AA:AA:AA:03");

        let hint = HostIdentityHint {
            mac_addresses: &[
                "AA:AA:AA:AA:AA:01".to_string(),
                "AA:AA:AA:AA:AA:02".to_string(),
                "AA:AA:AA:AA:AA:03".to_string(),
            ],
            ..Default::default()
        };
        let found = find_host(&inv, ClassTag::Device, &json!({}), &hint, false);
        // a scores 2, b scores 1: ratio 2.0 meets the threshold, a wins.
        assert_eq!(found, Some(a));
    }

    #[test]
    fn mac_tally_none_when_no_macs_match() {
        let mut inv = Inventory::new();
        make_host_with_interface(&mut inv, "a", "AA:AA:AA:AA:AA:01");
        let hint = HostIdentityHint {
            mac_addresses: &["FF:FF:FF:FF:FF:FF".to_string()],
            ..Default::default()
        };
        assert_eq!(find_host(&inv, ClassTag::Device, &json!({}), &hint, false), None);
    }

    #[test]
    fn serial_match_used_for_device_only() {
        let mut inv = Inventory::new();
        let id = inv
            .add_object(ClassTag::Device, &json!({"name": "h1", "serial": "S1"}), false, None)
            .expect("created");
        let hint = HostIdentityHint {
            serial: Some("S1"),
            ..Default::default()
        };
        assert_eq!(find_host(&inv, ClassTag::Device, &json!({"name": "h1-renamed"}), &hint, true), Some(id));
    }

    #[test]
    fn arbitration_prefers_enabled_over_disabled() {
        assert_eq!(
            arbitrate_primary_ip(false, false, true, false),
            PrimaryIpArbitration::Steal
        );
        assert_eq!(
            arbitrate_primary_ip(false, false, false, true),
            PrimaryIpArbitration::Skip
        );
        assert_eq!(arbitrate_primary_ip(true, false, true, true), PrimaryIpArbitration::AllowMultiple);
        assert_eq!(
            arbitrate_primary_ip(false, true, false, false),
            PrimaryIpArbitration::ReassignSameParent
        );
    }
}
