//! Hypervisor-cluster adapter: syncs hosts and VMs discovered in a cluster
//! of compute nodes (spec §0 "hypervisor-cluster"), grounded on
//! `vmware/connection.py`'s externally-observable dataflow contract
//! (`add_device_vm_to_inventory`, `add_host`, `add_virtual_machine`) per
//! spec §1's scoping of concrete adapters to "the contract they owe the
//! core" — the vSphere-walk mechanics that populate a [`ClusterSnapshot`]
//! are not reproduced; this adapter starts from an already-collected
//! snapshot and owns only the to-inventory mapping.

use std::collections::BTreeMap;

use nb_inventory::{ClassTag, EntityId, FieldValue, Inventory};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use source_framework::{add_update_interface, manufacturer_mapping, map_object_interfaces_to_current_interfaces, SourceAdapter, SourceSettings};
use tracing::warn;

/// One discovered host or VM, with its interfaces and attached IPs (spec
/// §4.5's `add_device_vm_to_inventory` parameter set, flattened). Deserialisable
/// so `bin/netbox-sync` can load a pre-collected snapshot file directly — the
/// vSphere/oVirt walk that would *produce* this structure is out of scope
/// (spec §1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeNode {
    pub kind: NodeKind,
    pub name: String,
    pub cluster_name: String,
    pub site_name: String,
    pub serial: Option<String>,
    pub asset_tag: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub status: String,
    pub vcpus: Option<f64>,
    pub memory_mb: Option<i64>,
    pub disk_mb: Option<i64>,
    /// Interface name -> (JSON fragment without `device`/`virtual_machine`
    /// or IP fields, list of addresses in `addr/prefixlen` form). May carry
    /// `untagged_vlan`/`tagged_vlans` as `{"vid": u32, "name": str}` (or an
    /// array of those), which `add_update_interface` correlates to NetBox
    /// `VLAN` objects itself.
    pub interfaces: BTreeMap<String, (Json, Vec<String>)>,
    pub primary_ip4: Option<String>,
    pub primary_ip6: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Host,
    Vm,
}

/// Adapter driven by a pre-collected [`ClusterSnapshot`] — the set of
/// compute nodes a hypervisor-cluster source currently reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    pub nodes: Vec<ComputeNode>,
}

pub struct HypervisorClusterAdapter {
    name: String,
    settings: SourceSettings,
    init_successful: bool,
    snapshot: ClusterSnapshot,
}

const DEPENDENT_CLASSES: &[ClassTag] = &[
    ClassTag::Tag,
    ClassTag::Manufacturer,
    ClassTag::DeviceType,
    ClassTag::Platform,
    ClassTag::ClusterType,
    ClassTag::ClusterGroup,
    ClassTag::DeviceRole,
    ClassTag::Site,
    ClassTag::SiteGroup,
    ClassTag::Cluster,
    ClassTag::Device,
    ClassTag::Vm,
    ClassTag::VmInterface,
    ClassTag::Interface,
    ClassTag::IpAddress,
    ClassTag::Prefix,
    ClassTag::Tenant,
    ClassTag::Vrf,
    ClassTag::Vlan,
    ClassTag::VlanGroup,
    ClassTag::CustomField,
    ClassTag::VirtualDisk,
    ClassTag::MacAddress,
];

impl HypervisorClusterAdapter {
    pub fn new(name: impl Into<String>, settings: SourceSettings, snapshot: ClusterSnapshot) -> Self {
        Self { name: name.into(), settings, init_successful: true, snapshot }
    }

    fn find_or_create_cluster(&self, inventory: &mut Inventory, site: EntityId, cluster_name: &str) -> Option<EntityId> {
        inventory.add_update_object(
            ClassTag::Cluster,
            &json!({ "name": cluster_name, "site": { "id": inventory.nb_reference(site).unwrap_or(0) } }),
            false,
            Some(&self.source_tag()),
        )
    }

    fn find_or_create_site(&self, inventory: &mut Inventory, site_name: &str) -> Option<EntityId> {
        inventory.add_update_object(ClassTag::Site, &json!({ "name": site_name }), false, Some(&self.source_tag()))
    }

    fn find_or_create_manufacturer(&self, inventory: &mut Inventory, raw_name: &str) -> Option<EntityId> {
        let name = manufacturer_mapping::sanitize_manufacturer_name(raw_name);
        inventory.add_update_object(ClassTag::Manufacturer, &json!({ "name": name }), false, Some(&self.source_tag()))
    }

    /// Add or update one compute node: the object itself, then every
    /// interface and its IPs via the shared `source-framework` helpers
    /// (spec §4.5 `add_device_vm_to_inventory`).
    fn add_device_vm_to_inventory(&self, inventory: &mut Inventory, node: &ComputeNode) -> Option<EntityId> {
        let site = self.find_or_create_site(inventory, &node.site_name)?;
        let class = match node.kind {
            NodeKind::Host => ClassTag::Device,
            NodeKind::Vm => ClassTag::Vm,
        };

        let mut data = serde_json::Map::new();
        data.insert("name".to_string(), json!(node.name));
        data.insert("status".to_string(), json!(node.status));
        data.insert("site".to_string(), json!({ "id": inventory.nb_reference(site).unwrap_or(0) }));

        let cluster = self.find_or_create_cluster(inventory, site, &node.cluster_name);
        if let Some(cluster) = cluster {
            data.insert("cluster".to_string(), json!({ "id": inventory.nb_reference(cluster).unwrap_or(0) }));
        }

        match node.kind {
            NodeKind::Host => {
                if let Some(serial) = &node.serial {
                    data.insert("serial".to_string(), json!(serial));
                }
                if let Some(asset_tag) = &node.asset_tag {
                    data.insert("asset_tag".to_string(), json!(asset_tag));
                }
                if let (Some(manufacturer), Some(model)) = (&node.manufacturer, &node.model) {
                    let manufacturer_id = self.find_or_create_manufacturer(inventory, manufacturer);
                    data.insert(
                        "device_type".to_string(),
                        json!({ "model": model, "manufacturer": { "id": manufacturer_id.and_then(|m| inventory.nb_reference(m)).unwrap_or(0) } }),
                    );
                }
            }
            NodeKind::Vm => {
                if let Some(v) = node.vcpus {
                    data.insert("vcpus".to_string(), json!(v));
                }
                if let Some(v) = node.memory_mb {
                    data.insert("memory".to_string(), json!(v));
                }
                if let Some(v) = node.disk_mb {
                    data.insert("disk".to_string(), json!(v));
                }
            }
        }

        let node_id = inventory.add_update_object(class, &Json::Object(data), false, Some(&self.source_tag()))?;

        let incoming: BTreeMap<String, Json> = node.interfaces.iter().map(|(name, (data, _))| (name.clone(), data.clone())).collect();
        let matches = map_object_interfaces_to_current_interfaces(inventory, node_id, &incoming, true);

        let mut primary4 = None;
        let mut primary6 = None;
        for (name, existing) in matches {
            let Some((data, ips)) = node.interfaces.get(&name) else { continue };
            let Some((interface_id, attached)) =
                add_update_interface(inventory, &self.settings, existing, node_id, data.clone(), ips, &self.source_tag())
            else {
                warn!("failed to add/update interface '{name}' on '{}'", node.name);
                continue;
            };
            for ip in attached {
                let Some(entity) = inventory.get(ip) else { continue };
                let Some(FieldValue::Str(addr)) = entity.get("address") else { continue };
                let bare = addr.split('/').next().unwrap_or(addr);
                if Some(bare) == node.primary_ip4.as_deref().map(|a| a.split('/').next().unwrap_or(a)) {
                    primary4 = Some((interface_id, ip));
                }
                if Some(bare) == node.primary_ip6.as_deref().map(|a| a.split('/').next().unwrap_or(a)) {
                    primary6 = Some((interface_id, ip));
                }
            }
        }

        self.apply_primary_ip(inventory, node_id, "primary_ip4", primary4.map(|(_, ip)| ip));
        self.apply_primary_ip(inventory, node_id, "primary_ip6", primary6.map(|(_, ip)| ip));

        Some(node_id)
    }

    fn apply_primary_ip(&self, inventory: &mut Inventory, node_id: EntityId, field: &str, ip: Option<EntityId>) {
        use sync_core::SetPrimaryIp;
        if self.settings.set_primary_ip == SetPrimaryIp::Never {
            return;
        }
        let current = inventory.get(node_id).and_then(|e| e.get(field)).and_then(FieldValue::as_ref_id);

        let Some(ip) = ip else {
            // The node no longer reports an address for this field: drop the
            // stale reference rather than leaving it pointed at an IP we no
            // longer see from this node.
            if current.is_some() {
                inventory.unset_field(node_id, field);
            }
            return;
        };

        if current == Some(ip) {
            return;
        }
        if current.is_some() && self.settings.set_primary_ip == SetPrimaryIp::WhenUndefined {
            return;
        }
        if self.settings.set_primary_ip == SetPrimaryIp::Always {
            self.steal_primary_ip(inventory, node_id, field, ip);
        }

        let payload = json!({ field: ip_reference_payload(inventory, ip) });
        inventory.update_by_id(node_id, &payload, Some(&self.source_tag()));
    }

    /// `SetPrimaryIp::Always`: clear `field` on any other Device/VM currently
    /// holding `ip` as its primary, so the new claim does not leave a second,
    /// stale reference behind (spec §4.4, `SetPrimaryIp::Always` doc comment).
    fn steal_primary_ip(&self, inventory: &mut Inventory, node_id: EntityId, field: &str, ip: EntityId) {
        let holders: Vec<EntityId> = [ClassTag::Device, ClassTag::Vm]
            .into_iter()
            .flat_map(|class| inventory.all(class).map(|(id, _)| id).collect::<Vec<_>>())
            .filter(|&id| id != node_id)
            .filter(|&id| matches!(inventory.get(id).and_then(|e| e.get(field)), Some(FieldValue::Ref(holder_ip)) if *holder_ip == ip))
            .collect();
        for holder in holders {
            inventory.unset_field(holder, field);
        }
    }
}

impl SourceAdapter for HypervisorClusterAdapter {
    fn source_type(&self) -> &'static str {
        "hypervisor_cluster"
    }

    fn implements(type_string: &str) -> bool
    where
        Self: Sized,
    {
        type_string == "hypervisor_cluster" || type_string == "vmware" || type_string == "ovirt"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn settings(&self) -> &SourceSettings {
        &self.settings
    }

    fn init_successful(&self) -> bool {
        self.init_successful
    }

    fn dependent_netbox_objects(&self) -> &'static [ClassTag] {
        DEPENDENT_CLASSES
    }

    fn apply(&mut self, inventory: &mut Inventory) {
        let nodes = self.snapshot.nodes.clone();
        for node in &nodes {
            if self.add_device_vm_to_inventory(inventory, node).is_none() {
                warn!("failed to add/update '{}' in cluster '{}'", node.name, node.cluster_name);
            }
        }
    }
}

/// Like a plain `{"id": nb_reference(ip)}` payload, but falls back to the
/// IP's own `address` rather than a synthetic `id: 0` when `ip` hasn't been
/// synced to NetBox yet, so `get_by_data` can still resolve it to the
/// entity attached to this node earlier in the same run.
fn ip_reference_payload(inventory: &Inventory, ip: EntityId) -> Json {
    match inventory.nb_reference(ip) {
        Some(nb_id) => json!({ "id": nb_id }),
        None => {
            let address = inventory.get(ip).and_then(|e| e.get("address")).and_then(FieldValue::as_str).unwrap_or_default();
            json!({ "address": address })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host_node(name: &str) -> ComputeNode {
        ComputeNode {
            kind: NodeKind::Host,
            name: name.to_string(),
            cluster_name: "cluster-a".to_string(),
            site_name: "dc1".to_string(),
            serial: Some("SN1".to_string()),
            asset_tag: None,
            manufacturer: Some("VMware, Inc.".to_string()),
            model: Some("ESXi".to_string()),
            status: "active".to_string(),
            vcpus: None,
            memory_mb: None,
            disk_mb: None,
            interfaces: BTreeMap::new(),
            primary_ip4: None,
            primary_ip6: None,
        }
    }

    #[test]
    fn adds_a_host_and_its_cluster_and_site() {
        let mut inv = Inventory::new();
        let adapter = HypervisorClusterAdapter::new("vc1", SourceSettings::default(), ClusterSnapshot { nodes: vec![host_node("esx1")] });
        let id = adapter.add_device_vm_to_inventory(&mut inv, &host_node("esx1"));
        assert!(id.is_some());
        assert!(inv.all(ClassTag::Cluster).any(|(_, e)| matches!(e.get("name"), Some(FieldValue::Str(n)) if n == "cluster-a")));
        assert!(inv.all(ClassTag::Site).any(|(_, e)| matches!(e.get("name"), Some(FieldValue::Str(n)) if n == "dc1")));
    }

    #[test]
    fn implements_recognises_legacy_source_type_strings() {
        assert!(HypervisorClusterAdapter::implements("vmware"));
        assert!(HypervisorClusterAdapter::implements("hypervisor_cluster"));
        assert!(!HypervisorClusterAdapter::implements("check_redfish"));
    }

    #[test]
    fn always_policy_steals_primary_ip_from_previous_holder() {
        use sync_core::SetPrimaryIp;

        let mut inv = Inventory::new();
        let a = inv.add_object(ClassTag::Device, &json!({"name": "a"}), false, None).expect("device a");
        let b = inv.add_object(ClassTag::Device, &json!({"name": "b"}), false, None).expect("device b");
        let ip = inv.add_object(ClassTag::IpAddress, &json!({"address": "10.0.0.1/24"}), false, None).expect("ip");
        let payload = ip_reference_payload(&inv, ip);
        inv.update_by_id(a, &json!({"primary_ip4": payload}), None);
        assert_eq!(
            inv.get(a).and_then(|e| e.get("primary_ip4")).and_then(FieldValue::as_ref_id),
            Some(ip),
            "precondition: a must hold the ip before b steals it"
        );

        let mut settings = SourceSettings::default();
        settings.set_primary_ip = SetPrimaryIp::Always;
        let adapter = HypervisorClusterAdapter::new("vc1", settings, ClusterSnapshot::default());

        adapter.apply_primary_ip(&mut inv, b, "primary_ip4", Some(ip));

        assert_eq!(inv.get(b).and_then(|e| e.get("primary_ip4")).and_then(FieldValue::as_ref_id), Some(ip));
        assert!(inv.get(a).and_then(|e| e.get("primary_ip4")).is_none_or(FieldValue::is_null));
    }

    #[test]
    fn primary_ip_cleared_when_node_no_longer_reports_it() {
        let mut inv = Inventory::new();
        let a = inv.add_object(ClassTag::Device, &json!({"name": "a"}), false, None).expect("device a");
        let ip = inv.add_object(ClassTag::IpAddress, &json!({"address": "10.0.0.1/24"}), false, None).expect("ip");
        let payload = ip_reference_payload(&inv, ip);
        inv.update_by_id(a, &json!({"primary_ip4": payload}), None);
        assert_eq!(
            inv.get(a).and_then(|e| e.get("primary_ip4")).and_then(FieldValue::as_ref_id),
            Some(ip),
            "precondition: a must hold the ip before it stops reporting one"
        );

        let adapter = HypervisorClusterAdapter::new("vc1", SourceSettings::default(), ClusterSnapshot::default());
        adapter.apply_primary_ip(&mut inv, a, "primary_ip4", None);

        assert!(inv.get(a).and_then(|e| e.get("primary_ip4")).is_none_or(FieldValue::is_null));
    }
}
