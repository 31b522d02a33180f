//! Hardware-inventory-JSON adapter: imports check_redfish-style snapshot
//! files describing one physical device's hardware state (spec §0
//! "hardware-inventory JSON"), grounded on
//! `check_redfish/import_inventory.py`'s dataflow contract: match an
//! existing `Device` by NetBox id or serial, then update the device record
//! and its power-supply inventory items. The actual file-glob/JSON-parse
//! plumbing is left to the caller (`InventorySnapshot` is already-parsed
//! input) — only the to-inventory mapping is reproduced here.

use nb_inventory::{ClassTag, EntityId, Inventory};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use source_framework::{custom_field, SourceAdapter, SourceSettings};
use tracing::{error, warn};

/// One check_redfish inventory snapshot: the `inventory.system.0` record
/// plus zero or more power supplies. Field names mirror the JSON keys the
/// original inventory files use. Deserialisable so `bin/netbox-sync` can
/// read one JSON file per device directly (spec §1: the directory-glob/
/// JSON-parse plumbing itself is in scope; the Redfish crawl that produced
/// the files is not).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HardwareSnapshot {
    pub netbox_device_id: Option<u64>,
    pub serial: Option<String>,
    pub host_name: Option<String>,
    pub model: Option<String>,
    pub manufacturer: Option<String>,
    pub health_status: Option<String>,
    pub power_state: Option<String>,
    pub dell_service_tag: Option<String>,
    pub power_supplies: Vec<PowerSupply>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerSupply {
    pub name: String,
    pub present: bool,
    pub capacity_in_watt: Option<i64>,
    pub firmware: Option<String>,
    pub health_status: Option<String>,
}

/// Adapter driven by a pre-collected set of [`HardwareSnapshot`]s, one per
/// device, supplied up front (the original re-reads a directory of files
/// every run; here the caller owns that I/O).
pub struct HardwareInventoryAdapter {
    name: String,
    settings: SourceSettings,
    init_successful: bool,
    overwrite_host_name: bool,
    snapshots: Vec<HardwareSnapshot>,
}

const DEPENDENT_CLASSES: &[ClassTag] = &[
    ClassTag::Tag,
    ClassTag::Manufacturer,
    ClassTag::DeviceType,
    ClassTag::Platform,
    ClassTag::Site,
    ClassTag::Device,
    ClassTag::Interface,
    ClassTag::MacAddress,
    ClassTag::IpAddress,
    ClassTag::PowerPort,
    ClassTag::InventoryItem,
    ClassTag::CustomField,
];

impl HardwareInventoryAdapter {
    pub fn new(name: impl Into<String>, settings: SourceSettings, overwrite_host_name: bool, snapshots: Vec<HardwareSnapshot>) -> Self {
        Self {
            name: name.into(),
            settings,
            init_successful: true,
            overwrite_host_name,
            snapshots,
        }
    }

    fn find_device(&self, inventory: &Inventory, snapshot: &HardwareSnapshot) -> Option<EntityId> {
        if let Some(nb_id) = snapshot.netbox_device_id {
            if let Some(id) = inventory.get_by_id(ClassTag::Device, nb_id) {
                return Some(id);
            }
        }
        let serial = snapshot.serial.as_deref()?;
        let mut map = serde_json::Map::new();
        map.insert("serial".to_string(), json!(serial));
        inventory.get_by_data(ClassTag::Device, &map)
    }

    fn update_device(&self, inventory: &mut Inventory, device: EntityId, snapshot: &HardwareSnapshot) {
        let mut custom_fields = serde_json::Map::new();
        if let Some(h) = &snapshot.health_status {
            custom_fields.insert("health".to_string(), json!(h));
        }
        if let Some(p) = &snapshot.power_state {
            custom_fields.insert("power_state".to_string(), json!(p));
        }

        let mut data = serde_json::Map::new();
        if let Some(model) = &snapshot.model {
            data.insert(
                "device_type".to_string(),
                json!({ "model": model, "manufacturer": { "name": snapshot.manufacturer } }),
            );
        }
        if let Some(serial) = &snapshot.serial {
            data.insert("serial".to_string(), json!(serial));
        }
        if self.overwrite_host_name {
            if let Some(name) = &snapshot.host_name {
                data.insert("name".to_string(), json!(name));
            }
        }

        let is_dell = snapshot.manufacturer.as_deref().is_some_and(|m| m.to_lowercase().contains("dell"));
        if is_dell {
            if let Some(tag) = &snapshot.dell_service_tag {
                custom_field::add_update_custom_field(inventory, "service_tag", &["dcim.device"], &self.source_tag());
                custom_fields.insert("service_tag".to_string(), json!(tag));
            } else {
                warn!("no chassis/sku data found for a Dell device in inventory snapshot");
            }
        }

        if !custom_fields.is_empty() {
            data.insert("custom_fields".to_string(), Json::Object(custom_fields));
        }

        inventory.update_by_id(device, &Json::Object(data), Some(&self.source_tag()));
    }

    fn update_power_supplies(&self, inventory: &mut Inventory, device: EntityId, snapshot: &HardwareSnapshot) {
        let source_tag = self.source_tag();
        for (index, ps) in snapshot.power_supplies.iter().enumerate() {
            if !ps.present {
                continue;
            }
            let name = if ps.name.len() > 1 { ps.name.clone() } else { format!("Power Supply {}", index + 1) };

            let mut data = serde_json::Map::new();
            data.insert("name".to_string(), json!(name));
            data.insert("device".to_string(), json!({ "id": inventory.nb_reference(device).unwrap_or(0) }));
            if let Some(watt) = ps.capacity_in_watt {
                data.insert("maximum_draw".to_string(), json!(watt));
            }
            if ps.firmware.is_some() || ps.health_status.is_some() {
                data.insert(
                    "custom_fields".to_string(),
                    json!({ "firmware": ps.firmware, "health": ps.health_status }),
                );
            }

            inventory.add_update_object(ClassTag::PowerPort, &Json::Object(data), false, Some(&source_tag));
        }
    }
}

impl SourceAdapter for HardwareInventoryAdapter {
    fn source_type(&self) -> &'static str {
        "hardware_inventory_json"
    }

    fn implements(type_string: &str) -> bool
    where
        Self: Sized,
    {
        type_string == "hardware_inventory_json" || type_string == "check_redfish"
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
        let snapshots = self.snapshots.clone();
        for snapshot in &snapshots {
            let Some(device) = self.find_device(inventory, snapshot) else {
                error!(
                    "unable to find a device for inventory id {:?} / serial {:?}",
                    snapshot.netbox_device_id, snapshot.serial
                );
                continue;
            };
            self.update_device(inventory, device, snapshot);
            self.update_power_supplies(inventory, device, snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_inventory_with_device() -> (Inventory, EntityId) {
        let mut inv = Inventory::new();
        let id = inv
            .add_object(ClassTag::Device, &json!({"name": "host1", "serial": "ABC123"}), false, None)
            .expect("device");
        (inv, id)
    }

    #[test]
    fn finds_device_by_serial_when_no_netbox_id_given() {
        let (mut inv, device) = base_inventory_with_device();
        let adapter = HardwareInventoryAdapter::new("redfish1", SourceSettings::default(), false, vec![]);
        let snapshot = HardwareSnapshot { serial: Some("ABC123".into()), ..Default::default() };
        assert_eq!(adapter.find_device(&mut inv, &snapshot), Some(device));
    }

    #[test]
    fn dell_service_tag_registers_custom_field() {
        let (mut inv, device) = base_inventory_with_device();
        let adapter = HardwareInventoryAdapter::new("redfish1", SourceSettings::default(), false, vec![]);
        let snapshot = HardwareSnapshot {
            serial: Some("ABC123".into()),
            manufacturer: Some("Dell Inc.".into()),
            dell_service_tag: Some("SVCTAG1".into()),
            ..Default::default()
        };
        adapter.update_device(&mut inv, device, &snapshot);
        let cf = inv.all(ClassTag::CustomField).find(|(_, e)| matches!(e.get("name"), Some(nb_inventory::FieldValue::Str(n)) if n == "service_tag"));
        assert!(cf.is_some());
    }
}
