//! The process-wide entity registry (spec §4.2). One `Inventory` holds every
//! entity of every class in per-class `Vec<Entity>` storage indexed by
//! [`EntityId`], plus the disambiguation (`get_by_data`), relation
//! resolution, and tag-lifecycle operations spec §4.2 assigns to it.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::{Map, Value as Json};
use tracing::{debug, warn};

use crate::class::{descriptor, FieldKind};
use crate::entity::{Entity, FieldValue, PendingRef};
use crate::id::{ClassTag, EntityId};
use crate::slug;

/// Process-wide registry of all entities, keyed by class.
#[derive(Debug, Default)]
pub struct Inventory {
    classes: Vec<Vec<Entity>>,
    /// `(class, nb_id) -> slot`, kept in step with `classes` for O(1) `get_by_id`.
    id_index: HashMap<(ClassTag, u64), u32>,
    /// Classes this run has already bulk-loaded from NetBox (spec §4.2).
    queried: BTreeSet<ClassTag>,
    /// NetBox API version string discovered this run, if any.
    api_version: Option<String>,
}

impl Inventory {
    /// Build an empty inventory with one storage vector per declared class.
    pub fn new() -> Self {
        Self {
            classes: vec![Vec::new(); ClassTag::ALL.len()],
            id_index: HashMap::new(),
            queried: BTreeSet::new(),
            api_version: None,
        }
    }

    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref()
    }

    pub fn set_api_version(&mut self, version: String) {
        self.api_version = Some(version);
    }

    pub fn mark_queried(&mut self, class: ClassTag) {
        self.queried.insert(class);
    }

    pub fn is_queried(&self, class: ClassTag) -> bool {
        self.queried.contains(&class)
    }

    fn slots(&self, class: ClassTag) -> &[Entity] {
        &self.classes[class.index()]
    }

    fn slots_mut(&mut self, class: ClassTag) -> &mut Vec<Entity> {
        &mut self.classes[class.index()]
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.slots(id.class()).get(id.slot as usize)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.slots_mut(id.class()).get_mut(id.slot as usize)
    }

    /// Iterate every live (non-deleted) entity of a class.
    pub fn all(&self, class: ClassTag) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.slots(class).iter().enumerate().filter_map(move |(i, e)| {
            (!e.deleted).then(|| {
                (
                    EntityId {
                        class,
                        slot: i as u32,
                    },
                    e,
                )
            })
        })
    }

    /// O(1) amortised lookup by NetBox id (spec §4.2).
    pub fn get_by_id(&self, class: ClassTag, nb_id: u64) -> Option<EntityId> {
        if nb_id == 0 {
            return None;
        }
        self.id_index.get(&(class, nb_id)).map(|&slot| EntityId { class, slot })
    }

    /// The disambiguator (spec §4.2 precedence list).
    pub fn get_by_data(&self, class: ClassTag, data: &Map<String, Json>) -> Option<EntityId> {
        let desc = descriptor(class);

        if let Some(id) = data.get("id").and_then(Json::as_u64).filter(|id| *id > 0) {
            if let Some(found) = self.get_by_id(class, id) {
                return Some(found);
            }
        }

        if desc.has_slug() {
            if let Some(name) = data.get("name").and_then(Json::as_str) {
                let candidate = slug::normalize(name, 255);
                if let Some(found) = self.all(class).find(|(_, e)| {
                    matches!(e.get("slug"), Some(FieldValue::Str(s)) if *s == candidate)
                }) {
                    return Some(found.0);
                }
            }
        }

        if let Some(pk) = data.get(desc.primary_key) {
            let incoming_display = display_value(pk, data.get(desc.secondary_key.unwrap_or("")));
            if let Some(found) = self.all(class).find(|(id, _)| {
                self.display_name(*id).eq_ignore_ascii_case(&incoming_display)
            }) {
                return Some(found.0);
            }
            return None;
        }

        self.all(class)
            .find(|(_, e)| data.iter().all(|(k, v)| matches_raw(e.get(k), v)))
            .map(|(id, _)| id)
    }

    /// Construct a new entity and populate it (spec §4.2 `add_object`).
    pub fn add_object(
        &mut self,
        class: ClassTag,
        data: &Json,
        read_from_netbox: bool,
        source: Option<&str>,
    ) -> Option<EntityId> {
        let desc = descriptor(class);
        let map = data.as_object().cloned().unwrap_or_default();
        if !read_from_netbox && !map.contains_key(desc.primary_key) && !desc.skip_if_missing_pk {
            warn!(
                "{}: dropping new object with no {:?} (spec invariant 1)",
                desc.name, desc.primary_key
            );
            return None;
        }
        let slot = self.slots(class).len() as u32;
        let id = EntityId { class, slot };
        self.slots_mut(class).push(Entity::new(class));
        self.apply_update(id, data, read_from_netbox, source);
        Some(id)
    }

    /// `get_by_data` then update, else `add_object` (spec §4.2).
    pub fn add_update_object(
        &mut self,
        class: ClassTag,
        data: &Json,
        read_from_netbox: bool,
        source: Option<&str>,
    ) -> Option<EntityId> {
        let map = data.as_object().cloned().unwrap_or_default();
        match self.get_by_data(class, &map) {
            Some(id) => {
                self.apply_update(id, data, read_from_netbox, source);
                Some(id)
            }
            None => self.add_object(class, data, read_from_netbox, source),
        }
    }

    /// Apply spec §4.1 `update()` semantics to an already-allocated slot.
    fn apply_update(
        &mut self,
        id: EntityId,
        data: &Json,
        read_from_netbox: bool,
        source: Option<&str>,
    ) {
        let desc = descriptor(id.class());
        let Some(map) = data.as_object() else { return };

        if read_from_netbox {
            let nb_id = map.get("id").and_then(Json::as_u64).unwrap_or(0);
            let mut converted = BTreeMap::new();
            for field in desc.fields {
                if let Some(raw) = map.get(field.name) {
                    if let Some(v) = self.convert_field(id.class(), field.kind, field.name, raw, true) {
                        converted.insert(field.name.to_string(), v);
                    }
                }
            }
            // Not a declared model field, but prune's grace-period check
            // (spec §4.4) needs it; stashed under a reserved key so it is
            // never touched by PATCH-body construction, which only ever
            // walks `desc.fields`.
            if let Some(lu) = map.get("last_updated").and_then(Json::as_str) {
                converted.insert("_last_updated".to_string(), FieldValue::Str(lu.to_string()));
            }
            // Tag GC needs NetBox's live usage count, which likewise isn't a
            // `data_model` field (spec §4.4 "Tag GC").
            if let Some(n) = map.get("tagged_items").and_then(Json::as_i64) {
                converted.insert("_tagged_items".to_string(), FieldValue::Int(n));
            }
            if let Some(e) = self.get_mut(id) {
                e.load_from_netbox(nb_id, converted);
            }
            if nb_id > 0 {
                self.id_index.insert((id.class(), nb_id), id.slot);
            }
            return;
        }

        for field in desc.fields {
            let Some(raw) = map.get(field.name) else { continue };

            if field.name == desc.primary_key {
                if let Some(FieldValue::Str(current)) =
                    self.get(id).and_then(|e| e.get(field.name))
                {
                    if let Some(incoming) = raw.as_str() {
                        if incoming.eq_ignore_ascii_case(current) {
                            continue;
                        }
                    }
                }
            }

            match field.kind {
                FieldKind::TagList => {
                    let names: Vec<String> = match raw {
                        Json::Array(arr) => arr
                            .iter()
                            .filter_map(|v| v.as_str().map(str::to_string))
                            .collect(),
                        Json::String(s) => vec![s.clone()],
                        _ => continue,
                    };
                    if let Some(e) = self.get_mut(id) {
                        e.add_tags(field.name, names);
                    }
                }
                FieldKind::CustomFieldBag => {
                    let Some(incoming) = raw.as_object() else { continue };
                    let incoming: BTreeMap<String, Json> = incoming
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect();
                    if let Some(e) = self.get_mut(id) {
                        e.merge_custom_fields(field.name, incoming);
                    }
                }
                _ => {
                    if let Some(v) = self.convert_field(id.class(), field.kind, field.name, raw, false) {
                        if let Some(e) = self.get_mut(id) {
                            e.set_field(field.name, v);
                        }
                    }
                }
            }
        }

        if let Some(src) = source {
            if let Some(e) = self.get_mut(id) {
                e.set_source(Some(src.to_string()));
            }
        }
    }

    /// Enforce one field's declared kind, logging and dropping on mismatch
    /// rather than failing the run (spec §4.1).
    #[allow(clippy::too_many_lines, reason = "one dispatch per FieldKind, kept flat on purpose")]
    fn convert_field(
        &mut self,
        class: ClassTag,
        kind: FieldKind,
        field: &str,
        raw: &Json,
        read_from_netbox: bool,
    ) -> Option<FieldValue> {
        match kind {
            FieldKind::Str(max_len) => raw.as_str().map(|s| {
                FieldValue::Str(s.chars().take(max_len as usize).collect())
            }).or_else(|| {
                warn!("{class:?}.{field}: expected string, got {raw}");
                None
            }),
            FieldKind::Slug(max_len) => {
                let name = raw.as_str()?;
                let taken = |candidate: &str| {
                    self.all(class).any(|(_, e)| {
                        matches!(e.get("slug"), Some(FieldValue::Str(s)) if s == candidate)
                    })
                };
                Some(FieldValue::Str(slug::unique_slug(name, max_len, taken)))
            }
            FieldKind::Int => match raw {
                Json::Number(n) => n.as_i64().map(FieldValue::Int),
                Json::String(s) => s.parse().ok().map(FieldValue::Int),
                _ => {
                    warn!("{class:?}.{field}: expected integer, got {raw}");
                    None
                }
            },
            FieldKind::Float => match raw {
                Json::Number(n) => n.as_f64().map(FieldValue::Float),
                _ => {
                    warn!("{class:?}.{field}: expected float, got {raw}");
                    None
                }
            },
            FieldKind::Bool => raw.as_bool().map(FieldValue::Bool).or_else(|| {
                warn!("{class:?}.{field}: expected bool, got {raw}");
                None
            }),
            FieldKind::Enum(allowed) => {
                let s = raw.as_str()?;
                if allowed.contains(&s) {
                    Some(FieldValue::Str(s.to_string()))
                } else {
                    warn!("{class:?}.{field}: {s:?} not in enumerated set {allowed:?}, dropped");
                    None
                }
            }
            FieldKind::Ref(target) => self.resolve_ref(target, raw, read_from_netbox),
            FieldKind::RefList(target) => {
                let arr = raw.as_array()?;
                if read_from_netbox {
                    let nb_ids: Vec<u64> = arr
                        .iter()
                        .filter_map(|item| item.get("id").and_then(Json::as_u64))
                        .filter(|id| *id > 0)
                        .collect();
                    return Some(FieldValue::Pending(PendingRef::ByIdList { class: target, nb_ids }));
                }
                let mut ids = Vec::new();
                for item in arr {
                    if let Some(FieldValue::Ref(eid)) = self.resolve_ref(target, item, false) {
                        if !ids.contains(&eid) {
                            ids.push(eid);
                        }
                    }
                }
                Some(FieldValue::RefList(ids))
            }
            FieldKind::ScopedRef(candidates) => {
                let type_field = raw.get("type").and_then(Json::as_str);
                let target = type_field
                    .and_then(|t| crate::scopes::class_for_object_type(t, candidates))
                    .or_else(|| candidates.first().copied())?;
                self.resolve_ref(target, raw, read_from_netbox)
            }
            FieldKind::CustomFieldBag | FieldKind::TagList => None,
        }
    }

    fn resolve_ref(&mut self, target: ClassTag, raw: &Json, read_from_netbox: bool) -> Option<FieldValue> {
        if raw.is_null() {
            return Some(FieldValue::Null);
        }
        let map = raw.as_object()?;
        let nb_id = map.get("id").and_then(Json::as_u64).unwrap_or(0);

        if read_from_netbox {
            return Some(if nb_id > 0 {
                FieldValue::Pending(PendingRef::ById { class: target, nb_id })
            } else {
                FieldValue::Pending(PendingRef::ByData {
                    class: target,
                    data: map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                })
            });
        }

        if nb_id > 0 {
            if let Some(found) = self.get_by_id(target, nb_id) {
                return Some(FieldValue::Ref(found));
            }
        }
        self.add_update_object(target, raw, false, None).map(FieldValue::Ref)
    }

    /// Explicitly clear `field` on `id` (spec §4.1 `unset_attribute`),
    /// queuing it for the next UNSET-phase PATCH. Used by the source
    /// adapter framework to re-home an IP address away from its previous
    /// interface when an incoming IP claims it instead.
    pub fn unset_field(&mut self, id: EntityId, field: &str) {
        if let Some(e) = self.get_mut(id) {
            e.unset_attribute(field);
        }
    }

    /// Apply a partial update directly to an already-resolved entity,
    /// bypassing the `get_by_data` re-match `add_update_object` performs
    /// (spec §4.2 `update()`). Used by source adapters that already hold
    /// the `EntityId` (matched by NetBox id or another side channel) and
    /// whose update payload may not carry enough fields to re-match safely.
    pub fn update_by_id(&mut self, id: EntityId, data: &Json, source: Option<&str>) {
        self.apply_update(id, data, false, source);
    }

    /// Feed a successful create/update HTTP response back into the entity
    /// at `id` (spec §4.4 "fed back into the entity via `update(data,
    /// read_from_netbox=true)`"): stamps `nb_id`, clears `updated_items`/
    /// `unset_items`, and resets the dirty-tracking baseline.
    pub fn absorb_response(&mut self, id: EntityId, response: &Json) {
        self.apply_update(id, response, true, None);
    }

    /// Walk every entity and substitute `Pending` references with live
    /// handles, now that every class has finished its bulk load (spec §4.2).
    pub fn resolve_relations(&mut self) {
        for class in ClassTag::ALL.iter().copied() {
            let len = self.slots(class).len();
            for slot in 0..len {
                let id = EntityId { class, slot: slot as u32 };
                let Some(entity) = self.get(id) else { continue };
                let pending: Vec<(String, PendingRef)> = entity
                    .fields()
                    .filter_map(|(f, v)| match v {
                        FieldValue::Pending(p) => Some((f.to_string(), p.clone())),
                        _ => None,
                    })
                    .collect();
                for (field, pending_ref) in pending {
                    if let PendingRef::ByIdList { class: target, nb_ids } = pending_ref {
                        let resolved: Vec<EntityId> = nb_ids
                            .iter()
                            .filter_map(|&nb_id| self.get_by_id(target, nb_id))
                            .collect();
                        if resolved.len() == nb_ids.len() {
                            if let Some(e) = self.get_mut(id) {
                                e.data.insert(field.clone(), FieldValue::RefList(resolved.clone()));
                                if e.original_data.contains_key(&field) {
                                    e.original_data.insert(field, FieldValue::RefList(resolved));
                                }
                            }
                        } else {
                            debug!("{id}: unresolved list-reference field {field:?} left dangling");
                        }
                        continue;
                    }

                    let resolved = match pending_ref {
                        PendingRef::ById { class: target, nb_id } => self.get_by_id(target, nb_id),
                        PendingRef::ByData { class: target, data } => {
                            let payload = Json::Object(data.into_iter().collect());
                            self.add_update_object(target, &payload, true, None)
                        }
                        PendingRef::ByIdList { .. } => unreachable!("handled above"),
                    };
                    match resolved {
                        Some(target_id) => {
                            if let Some(e) = self.get_mut(id) {
                                e.data.insert(field.clone(), FieldValue::Ref(target_id));
                                // Keep the load-time snapshot in step so a later
                                // source update that repeats the same reference
                                // is correctly recognised as a no-op (spec §8).
                                if e.original_data.contains_key(&field) {
                                    e.original_data.insert(field, FieldValue::Ref(target_id));
                                }
                            }
                        }
                        None => {
                            debug!("{id}: unresolved reference field {field:?} left dangling");
                        }
                    }
                }
            }
        }
    }

    /// Returns any still-unresolved (`Pending`) reference, for the FINAL
    /// pass's non-fatal end-of-run diagnostic (spec §4.4).
    pub fn unresolved_references(&self) -> Vec<(EntityId, String)> {
        let mut out = Vec::new();
        for class in ClassTag::ALL.iter().copied() {
            for (id, e) in self.all(class) {
                for (f, v) in e.fields() {
                    if matches!(v, FieldValue::Pending(_)) {
                        out.push((id, f.to_string()));
                    }
                }
            }
        }
        out
    }

    /// Interfaces (Device) or VMInterfaces (VM) whose parent field points at
    /// `parent` (spec §4.2 `get_all_interfaces`).
    pub fn get_all_interfaces(&self, parent: EntityId) -> Vec<EntityId> {
        let (iface_class, parent_field) = match parent.class() {
            ClassTag::Device => (ClassTag::Interface, "device"),
            ClassTag::Vm => (ClassTag::VmInterface, "virtual_machine"),
            _ => return Vec::new(),
        };
        self.all(iface_class)
            .filter(|(_, e)| matches!(e.get(parent_field), Some(FieldValue::Ref(p)) if *p == parent))
            .map(|(id, _)| id)
            .collect()
    }

    /// Display name (spec §4.1): primary key, optionally with secondary key,
    /// with the scope-aware override VLANs use.
    pub fn display_name(&self, id: EntityId) -> String {
        let Some(e) = self.get(id) else { return String::new() };
        let desc = descriptor(id.class());
        let pk = e
            .get(desc.primary_key)
            .and_then(field_display)
            .unwrap_or_default();

        if id.class() == ClassTag::Vlan {
            if let Some(FieldValue::Ref(site)) = e.get("site") {
                return format!("{pk} (site: {})", self.display_name(*site));
            }
            if let Some(FieldValue::Ref(group)) = e.get("group") {
                return format!("{pk} (group: {})", self.display_name(*group));
            }
            return pk;
        }

        match desc.secondary_key {
            Some(sk) if desc.enforce_secondary_key => {
                let secondary = e.get(sk).and_then(field_display);
                match secondary {
                    Some(s) if !s.is_empty() => format!("{pk} ({s})"),
                    _ => pk,
                }
            }
            _ => pk,
        }
    }

    /// The NetBox-side reference for a `Ref` field's PATCH payload: `None`
    /// while the referent is itself new and has no id yet (spec §4.1
    /// `get_nb_reference`, spec §4.4 deferred-reference rule).
    pub fn nb_reference(&self, id: EntityId) -> Option<u64> {
        self.get(id).filter(|e| !e.is_new()).map(Entity::nb_id)
    }

    /// Classes `class` can reference, derived from its `data_model` (spec
    /// §4.1 `get_dependencies`).
    pub fn dependencies_of(class: ClassTag) -> Vec<ClassTag> {
        descriptor(class)
            .fields
            .iter()
            .filter_map(|f| match f.kind {
                FieldKind::Ref(c) | FieldKind::RefList(c) => Some(vec![c]),
                FieldKind::ScopedRef(cs) => Some(cs.to_vec()),
                _ => None,
            })
            .flatten()
            .filter(|c| *c != class)
            .collect()
    }

    /// Stamp primary/source tags and (un)set the orphan tag for every
    /// entity, per spec §4.2 `tag_lifecycle`. `skip_orphan` lets the caller
    /// (which owns config/source state) veto orphan-tagging an entity (e.g.
    /// it originated from a currently-disabled source, spec §8 scenario 4).
    pub fn tag_lifecycle(
        &mut self,
        primary_tag: &str,
        source_tag_of: impl Fn(&str) -> String,
        orphan_tag: &str,
        skip_orphan: impl Fn(EntityId, &Entity) -> bool,
    ) {
        for class in ClassTag::ALL.iter().copied() {
            let ids: Vec<EntityId> = self.all(class).map(|(id, _)| id).collect();
            for id in ids {
                let Some(e) = self.get(id) else { continue };
                if e.deleted() {
                    continue;
                }
                let source = e.source().map(str::to_string);
                let has_primary = has_tag(e, primary_tag);
                match source {
                    Some(src) => {
                        let source_tag = source_tag_of(&src);
                        let mut names = vec![primary_tag.to_string(), source_tag];
                        if has_tag(e, orphan_tag) {
                            if let Some(e) = self.get_mut(id) {
                                e.remove_tags("tags", &BTreeSet::from([orphan_tag.to_string()]));
                            }
                        }
                        names.retain(|t| !has_tag(self.get(id).expect("just fetched"), t));
                        if let Some(e) = self.get_mut(id) {
                            if !names.is_empty() {
                                e.add_tags("tags", names);
                            }
                        }
                    }
                    None => {
                        let e = self.get(id).expect("just fetched");
                        if has_primary && !skip_orphan(id, e) && !has_tag(e, orphan_tag) {
                            if let Some(e) = self.get_mut(id) {
                                e.add_tags("tags", vec![orphan_tag.to_string()]);
                            }
                        }
                    }
                }
            }
        }
    }
}

fn has_tag(e: &Entity, tag: &str) -> bool {
    matches!(e.get("tags"), Some(FieldValue::Tags(set)) if set.contains(tag))
}

fn field_display(v: &FieldValue) -> Option<String> {
    match v {
        FieldValue::Str(s) => Some(s.clone()),
        FieldValue::Int(i) => Some(i.to_string()),
        FieldValue::Float(f) => Some(f.to_string()),
        FieldValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn display_value(pk: &Json, secondary: Option<&Json>) -> String {
    let pk_str = pk.as_str().map_or_else(|| pk.to_string(), str::to_string);
    match secondary.and_then(Json::as_str) {
        Some(s) if !s.is_empty() => format!("{pk_str} ({s})"),
        _ => pk_str,
    }
}

fn matches_raw(current: Option<&FieldValue>, incoming: &Json) -> bool {
    match (current, incoming) {
        (Some(FieldValue::Str(s)), Json::String(i)) => s == i,
        (Some(FieldValue::Int(n)), Json::Number(i)) => i.as_i64() == Some(*n),
        (Some(FieldValue::Bool(b)), Json::Bool(i)) => b == i,
        (None, Json::Null) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn add_object_assigns_slug_and_is_new() {
        let mut inv = Inventory::new();
        let id = inv
            .add_object(ClassTag::Site, &json!({"name": "Site A"}), false, Some("test"))
            .expect("created");
        let e = inv.get(id).expect("entity");
        assert!(e.is_new());
        assert_eq!(e.nb_id(), 0);
        assert!(matches!(e.get("slug"), Some(FieldValue::Str(s)) if s == "site-a"));
    }

    #[test]
    fn add_update_object_finds_existing_by_display_name() {
        let mut inv = Inventory::new();
        let first = inv
            .add_object(ClassTag::Tenant, &json!({"name": "Acme"}), false, Some("a"))
            .expect("created");
        let second = inv
            .add_update_object(ClassTag::Tenant, &json!({"name": "acme"}), false, Some("b"))
            .expect("matched");
        assert_eq!(first, second);
    }

    #[test]
    fn primary_key_case_only_change_is_ignored() {
        let mut inv = Inventory::new();
        let id = inv
            .add_object(ClassTag::Tenant, &json!({"name": "Acme"}), false, None)
            .expect("created");
        inv.add_update_object(ClassTag::Tenant, &json!({"id": 0, "name": "ACME", "description": "x"}), false, None);
        let e = inv.get(id).expect("entity");
        assert!(matches!(e.get("name"), Some(FieldValue::Str(s)) if s == "Acme"));
    }

    #[test]
    fn custom_fields_merge_not_replace() {
        let mut inv = Inventory::new();
        let id = inv
            .add_object(ClassTag::Device, &json!({"name": "h1", "custom_fields": {"a": 1}}), false, None)
            .expect("created");
        inv.add_update_object(ClassTag::Device, &json!({"name": "h1", "custom_fields": {"b": 2}}), false, None);
        let e = inv.get(id).expect("entity");
        match e.get("custom_fields") {
            Some(FieldValue::CustomFields(m)) => {
                assert_eq!(m.get("a"), Some(&json!(1)));
                assert_eq!(m.get("b"), Some(&json!(2)));
            }
            other => panic!("expected merged custom fields, got {other:?}"),
        }
    }

    #[test]
    fn tags_are_additive() {
        let mut inv = Inventory::new();
        let id = inv
            .add_object(ClassTag::Device, &json!({"name": "h1", "tags": ["a"]}), false, None)
            .expect("created");
        inv.add_update_object(ClassTag::Device, &json!({"name": "h1", "tags": ["b"]}), false, None);
        let e = inv.get(id).expect("entity");
        match e.get("tags") {
            Some(FieldValue::Tags(set)) => assert_eq!(set, &BTreeSet::from(["a".to_string(), "b".to_string()])),
            other => panic!("expected additive tags, got {other:?}"),
        }
    }

    #[test]
    fn resolve_relations_links_dangling_netbox_references() {
        let mut inv = Inventory::new();
        inv.add_object(ClassTag::Site, &json!({"id": 5, "name": "dc1"}), true, None);
        let dev = inv
            .add_object(
                ClassTag::Device,
                &json!({"id": 10, "name": "h1", "site": {"id": 5}}),
                true,
                None,
            )
            .expect("created");
        inv.resolve_relations();
        let e = inv.get(dev).expect("entity");
        match e.get("site") {
            Some(FieldValue::Ref(site_id)) => {
                assert_eq!(inv.display_name(*site_id), "dc1");
            }
            other => panic!("expected resolved site reference, got {other:?}"),
        }
        assert!(inv.unresolved_references().is_empty());
    }

    #[test]
    fn dirty_field_cancels_when_reset_to_original() {
        let mut inv = Inventory::new();
        let id = inv
            .add_object(
                ClassTag::Site,
                &json!({"id": 1, "name": "dc1", "status": "active"}),
                true,
                None,
            )
            .expect("created");
        inv.add_update_object(ClassTag::Site, &json!({"id": 1, "name": "dc1", "status": "planned"}), false, None);
        assert!(inv.get(id).expect("e").dirty_fields().any(|f| f == "status"));
        inv.add_update_object(ClassTag::Site, &json!({"id": 1, "name": "dc1", "status": "active"}), false, None);
        assert!(!inv.get(id).expect("e").dirty_fields().any(|f| f == "status"));
    }
}
