//! Idempotent custom-field registration and the overwrite/fill-empty-only
//! patch helper (spec §4.5 `add_update_custom_field`, `patch_data`).

use nb_inventory::{ClassTag, Entity, EntityId, FieldValue, Inventory};
use serde_json::{json, Value as Json};

/// Register (or extend the `object_types` whitelist of) a `CustomField`,
/// enforcing NetBox's name constraints: collapse repeated `-`, convert `_`
/// to `-` then back to `_` after slug-normalising, max 50 chars (mirrors
/// `manufacturer_mapping.py`-adjacent `add_update_custom_field`'s name
/// sanitisation in `source_base.py`).
pub fn add_update_custom_field(inventory: &mut Inventory, name: &str, object_types: &[&str], source_tag: &str) -> Option<EntityId> {
    let sanitized = sanitize_custom_field_name(name);
    let data = json!({ "name": sanitized, "object_types": object_types });
    inventory.add_update_object(ClassTag::CustomField, &data, false, Some(source_tag))
}

fn sanitize_custom_field_name(name: &str) -> String {
    let dashed = name.replace('_', "-");
    let collapsed: String = dashed.chars().fold(String::new(), |mut acc, c| {
        if c == '-' && acc.ends_with('-') {
            return acc;
        }
        acc.push(c);
        acc
    });
    let trimmed = collapsed.trim_matches('-');
    let truncated: String = trimmed.chars().take(50).collect();
    truncated.replace('-', "_")
}

/// Only keep keys from `incoming` whose current value on `entity` is empty
/// (unset, empty string, or empty list), unless `overwrite` is set, in
/// which case everything is returned verbatim (spec §4.5 `patch_data`).
pub fn patch_data(entity: &Entity, incoming: &Json, overwrite: bool) -> Json {
    if overwrite {
        return incoming.clone();
    }
    let Some(map) = incoming.as_object() else {
        return incoming.clone();
    };

    let mut result = serde_json::Map::new();
    for (key, value) in map {
        let is_empty = match entity.get(key) {
            None | Some(FieldValue::Null) => true,
            Some(FieldValue::Str(s)) => s.is_empty(),
            Some(FieldValue::RefList(v)) => v.is_empty(),
            _ => false,
        };
        if is_empty {
            result.insert(key.clone(), value.clone());
        }
    }
    Json::Object(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn custom_field_name_sanitisation_collapses_dashes() {
        assert_eq!(sanitize_custom_field_name("__foo--bar__"), "foo_bar");
    }

    #[test]
    fn overwrite_false_keeps_only_empty_fields() {
        let mut inv = Inventory::new();
        let id = inv
            .add_object(ClassTag::Device, &json!({"name": "h1", "serial": "S1"}), false, None)
            .expect("created");
        let entity = inv.get(id).expect("entity");
        let patched = patch_data(entity, &json!({"serial": "S2", "asset_tag": "A1"}), false);
        assert_eq!(patched, json!({"asset_tag": "A1"}));
    }

    #[test]
    fn overwrite_true_returns_incoming_verbatim() {
        let mut inv = Inventory::new();
        let id = inv
            .add_object(ClassTag::Device, &json!({"name": "h1", "serial": "S1"}), false, None)
            .expect("created");
        let entity = inv.get(id).expect("entity");
        let patched = patch_data(entity, &json!({"serial": "S2"}), true);
        assert_eq!(patched, json!({"serial": "S2"}));
    }
}
