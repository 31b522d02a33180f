//! The three-phase apply, prune, and tag-GC passes (spec §4.4).
//!
//! `ClassTag::ALL` is already declared in dependency order (see
//! `nb_inventory::id`), so a plain forward scan over it satisfies "every
//! class a dependent relies on is resolved first" without needing the
//! recursive `resolved_dependencies` walk the original performed — the
//! classes that do form a cycle (Device/VM <-> Interface <-> IPAddress via
//! `primary_ip4`/`primary_ip6`/`primary_mac_address`) are exactly the ones
//! always deferred to Pass 3, which breaks the cycle at the same point.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use nb_inventory::{ClassTag, Entity, FieldValue, Inventory};
use netbox_client::NetBoxClient;
use serde_json::{json, Map, Value as Json};
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::settings::EngineSettings;

/// Reference fields that are never written until Pass 3, because their
/// referent and the entity itself can form a creation cycle (spec §4.4).
const ALWAYS_DEFERRED: &[&str] = &["primary_ip4", "primary_ip6", "primary_mac_address"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Unset,
    Upsert,
    Final,
}

/// Drives the write side of a sync run against a populated [`Inventory`].
pub struct Orchestrator<'a> {
    client: &'a NetBoxClient,
    settings: &'a EngineSettings,
}

impl<'a> Orchestrator<'a> {
    pub fn new(client: &'a NetBoxClient, settings: &'a EngineSettings) -> Self {
        Self { client, settings }
    }

    /// Create the primary tag and orphan tag up front so every source can
    /// reference them by name (spec §2 dataflow `seed_basics`).
    pub async fn seed_basics(&self, inventory: &mut Inventory) -> Result<(), SyncError> {
        self.upsert_one(
            inventory,
            ClassTag::Tag,
            &json!({"name": self.settings.primary_tag, "description": "Managed by the reconciliation engine"}),
        )
        .await?;
        self.upsert_one(
            inventory,
            ClassTag::Tag,
            &json!({"name": self.settings.orphan_tag(), "description": format!("{}: no longer reported by any source", self.settings.primary_tag)}),
        )
        .await?;
        Ok(())
    }

    async fn upsert_one(&self, inventory: &mut Inventory, class: ClassTag, data: &Json) -> Result<(), SyncError> {
        let Some(id) = inventory.add_update_object(class, data, false, None) else {
            return Ok(());
        };
        let Some(entity) = inventory.get(id) else { return Ok(()) };
        if entity.is_new() {
            let desc = nb_inventory::descriptor(class);
            let body = build_patch_body(inventory, entity, desc.fields.iter().map(|f| f.name), false);
            if self.settings.dry_run {
                info!("[dry-run] POST {}: {body}", desc.api_path);
                return Ok(());
            }
            let response = self.client.create(desc.api_path, &Json::Object(body)).await?;
            inventory.absorb_response(id, &response);
        }
        Ok(())
    }

    /// Run all three passes in order (spec §2 dataflow).
    pub async fn apply_all(&self, inventory: &mut Inventory) -> Result<(), SyncError> {
        self.apply_phase(inventory, Phase::Unset).await?;
        self.apply_phase(inventory, Phase::Upsert).await?;
        self.apply_phase(inventory, Phase::Final).await?;
        for (id, field) in inventory.unresolved_references() {
            warn!("{id}: reference field {field:?} still unresolved after Pass 3 (non-fatal)");
        }
        Ok(())
    }

    async fn apply_phase(&self, inventory: &mut Inventory, phase: Phase) -> Result<(), SyncError> {
        for class in ClassTag::ALL.iter().copied() {
            let ids: Vec<_> = inventory.all(class).map(|(id, _)| id).collect();
            for id in ids {
                match phase {
                    Phase::Unset => self.apply_unset(inventory, id).await?,
                    Phase::Upsert => self.apply_write(inventory, id, false).await?,
                    Phase::Final => {
                        self.apply_write(inventory, id, true).await?;
                        self.apply_delete(inventory, id).await?;
                    }
                }
            }
        }
        Ok(())
    }

    async fn apply_unset(&self, inventory: &mut Inventory, id: nb_inventory::EntityId) -> Result<(), SyncError> {
        let Some(entity) = inventory.get(id) else { return Ok(()) };
        if entity.unset_fields().next().is_none() || entity.is_new() {
            return Ok(());
        }
        let desc = nb_inventory::descriptor(id.class());
        if desc.read_only {
            return Ok(());
        }
        let fields: Vec<String> = entity.unset_fields().map(str::to_string).collect();
        let mut body = Map::new();
        for field in &fields {
            let kind = desc.field(field).map(|f| f.kind);
            let empty = match kind {
                Some(nb_inventory::FieldKind::RefList(_) | nb_inventory::FieldKind::TagList) => Json::Array(Vec::new()),
                _ => Json::Null,
            };
            body.insert(field.clone(), empty);
        }
        if body.is_empty() {
            return Ok(());
        }
        if self.settings.dry_run {
            info!("[dry-run] UNSET PATCH {}/{}: {body:?}", desc.api_path, entity.nb_id());
            return Ok(());
        }
        let response = self.client.update(desc.api_path, entity.nb_id(), &Json::Object(body)).await?;
        inventory.absorb_response(id, &response);
        Ok(())
    }

    /// Shared by Pass 2 (UPSERT) and Pass 3 (FINAL, `last_run = true`).
    async fn apply_write(&self, inventory: &mut Inventory, id: nb_inventory::EntityId, last_run: bool) -> Result<(), SyncError> {
        let Some(entity) = inventory.get(id) else { return Ok(()) };
        if entity.deleted() {
            return Ok(());
        }
        let dirty: Vec<String> = entity.dirty_fields().map(str::to_string).collect();
        if dirty.is_empty() {
            return Ok(());
        }
        let desc = nb_inventory::descriptor(id.class());
        if desc.read_only {
            debug!("{id}: skipping write, {} is read_only", desc.name);
            return Ok(());
        }
        let body = build_patch_body(inventory, entity, dirty.iter().map(String::as_str), !last_run);
        if body.is_empty() {
            debug!("{id}: every dirty field deferred this pass");
            return Ok(());
        }

        if self.settings.dry_run {
            let verb = if entity.is_new() { "POST" } else { "PATCH" };
            info!("[dry-run] {verb} {}: {body:?}", desc.api_path);
            return Ok(());
        }

        let response = if entity.is_new() {
            self.client.create(desc.api_path, &Json::Object(body)).await?
        } else {
            self.client.update(desc.api_path, entity.nb_id(), &Json::Object(body)).await?
        };
        inventory.absorb_response(id, &response);
        Ok(())
    }

    async fn apply_delete(&self, inventory: &mut Inventory, id: nb_inventory::EntityId) -> Result<(), SyncError> {
        let Some(entity) = inventory.get(id) else { return Ok(()) };
        if !entity.deleted() || entity.is_new() {
            return Ok(());
        }
        let desc = nb_inventory::descriptor(id.class());
        if desc.read_only {
            debug!("{id}: skipping delete, {} is read_only", desc.name);
            return Ok(());
        }
        if self.settings.dry_run {
            info!("[dry-run] DELETE {}/{}", desc.api_path, entity.nb_id());
            return Ok(());
        }
        self.client.delete(desc.api_path, entity.nb_id()).await?;
        Ok(())
    }

    /// Delete every orphaned, grace-period-expired object (spec §4.4 Prune).
    /// Runs after the three apply passes. `source_disabled` tells prune an
    /// entity's recorded source adapter is currently turned off in config,
    /// which must suppress deletion (spec §8 scenario 4 / §4.2 skip rules).
    pub async fn prune(
        &self,
        inventory: &mut Inventory,
        now: DateTime<Utc>,
        source_disabled: impl Fn(&str) -> bool,
    ) -> Result<(), SyncError> {
        if !self.settings.prune_enabled {
            return Ok(());
        }
        let orphan_tag = self.settings.orphan_tag();
        for class in ClassTag::ALL.iter().rev().copied() {
            let desc = nb_inventory::descriptor(class);
            if !desc.prune {
                continue;
            }
            let candidates: Vec<_> = inventory
                .all(class)
                .filter(|(_, e)| is_prune_candidate(e, &orphan_tag, &source_disabled))
                .map(|(id, _)| id)
                .collect();

            for id in candidates {
                let Some(e) = inventory.get(id) else { continue };
                if !past_grace_period(e, self.settings.prune_delay_in_days, now) {
                    continue;
                }
                if matches!(class, ClassTag::Device | ClassTag::Vm) {
                    for iface in inventory.get_all_interfaces(id) {
                        self.delete_now(inventory, iface).await?;
                    }
                }
                self.delete_now(inventory, id).await?;
            }
        }
        Ok(())
    }

    async fn delete_now(&self, inventory: &mut Inventory, id: nb_inventory::EntityId) -> Result<(), SyncError> {
        let Some(e) = inventory.get(id) else { return Ok(()) };
        if e.is_new() {
            return Ok(());
        }
        let desc = nb_inventory::descriptor(id.class());
        if desc.read_only {
            debug!("{id}: skipping delete, {} is read_only", desc.name);
            return Ok(());
        }
        let nb_id = e.nb_id();
        if self.settings.dry_run {
            info!("[dry-run] PRUNE DELETE {}/{}", desc.api_path, nb_id);
        } else {
            self.client.delete(desc.api_path, nb_id).await?;
        }
        if let Some(e) = inventory.get_mut(id) {
            e.mark_deleted();
        }
        Ok(())
    }

    /// Delete every Tag stamped by this engine with zero remaining taggings
    /// and not touched this run (spec §4.4 Tag GC).
    pub async fn gc_tags(&self, inventory: &mut Inventory, used_this_run: &BTreeSet<String>) -> Result<(), SyncError> {
        let prefix = self.settings.primary_tag.clone();
        let ids: Vec<_> = inventory
            .all(ClassTag::Tag)
            .filter(|(_, e)| {
                let description = matches!(e.get("description"), Some(FieldValue::Str(d)) if d.starts_with(&prefix));
                let name = matches!(e.get("name"), Some(FieldValue::Str(n)) if !used_this_run.contains(n));
                let unused = matches!(e.get("_tagged_items"), Some(FieldValue::Int(0)) | None);
                description && name && unused
            })
            .map(|(id, _)| id)
            .collect();
        for id in ids {
            self.delete_now(inventory, id).await?;
        }
        Ok(())
    }

    /// `just_delete_all_the_things`: unconditionally remove everything this
    /// engine has ever tagged, then the primary/orphan tags themselves
    /// (supplemented feature, spec §2 `purge_all`).
    pub async fn purge_all(&self, inventory: &mut Inventory) -> Result<(), SyncError> {
        let primary_tag = self.settings.primary_tag.clone();
        for class in ClassTag::ALL.iter().rev().copied() {
            if class == ClassTag::Tag {
                continue;
            }
            let desc = nb_inventory::descriptor(class);
            if !desc.prune {
                continue;
            }
            let ids: Vec<_> = inventory
                .all(class)
                .filter(|(_, e)| has_tag(e, &primary_tag))
                .map(|(id, _)| id)
                .collect();
            for id in ids {
                self.delete_now(inventory, id).await?;
            }
        }
        let orphan_tag = self.settings.orphan_tag();
        let tag_ids: Vec<_> = inventory
            .all(ClassTag::Tag)
            .filter(|(_, e)| matches!(e.get("name"), Some(FieldValue::Str(n)) if *n == primary_tag || *n == orphan_tag))
            .map(|(id, _)| id)
            .collect();
        for id in tag_ids {
            self.delete_now(inventory, id).await?;
        }
        Ok(())
    }
}

fn is_prune_candidate(e: &Entity, orphan_tag: &str, source_disabled: &impl Fn(&str) -> bool) -> bool {
    if e.deleted() || e.source().is_some() {
        return false;
    }
    if !has_tag(e, orphan_tag) {
        return false;
    }
    // An object last touched by a source that is merely disabled this run
    // (not removed from config) keeps its orphan tag but is not pruned yet.
    !matches!(e.source(), Some(src) if source_disabled(src))
}

fn past_grace_period(e: &Entity, prune_delay_in_days: i64, now: DateTime<Utc>) -> bool {
    let Some(FieldValue::Str(lu)) = e.get("_last_updated") else {
        return true;
    };
    match DateTime::parse_from_rfc3339(lu) {
        Ok(dt) => (now - dt.with_timezone(&Utc)).num_days() >= prune_delay_in_days,
        Err(_) => true,
    }
}

fn has_tag(e: &Entity, tag: &str) -> bool {
    matches!(e.get("tags"), Some(FieldValue::Tags(set)) if set.contains(tag))
}

/// Build a PATCH/POST body from `fields` on `entity`. `defer_unresolved`
/// (true for UNSET/UPSERT, false for FINAL) moves a reference field whose
/// target has no NetBox id yet — or any of [`ALWAYS_DEFERRED`] — out of the
/// body instead of emitting a half-resolved reference (spec §4.4 Pass 2).
fn build_patch_body<'a>(
    inventory: &Inventory,
    entity: &Entity,
    fields: impl Iterator<Item = &'a str>,
    defer_unresolved: bool,
) -> Map<String, Json> {
    let mut body = Map::new();
    for field in fields {
        if defer_unresolved && ALWAYS_DEFERRED.contains(&field) {
            continue;
        }
        let Some(value) = entity.get(field) else { continue };
        match field_to_json(inventory, value) {
            Some(json) => {
                body.insert(field.to_string(), json);
            }
            None if defer_unresolved => continue,
            None => {
                warn!("{field}: reference still unresolved in FINAL pass, omitting from body");
            }
        }
    }
    body
}

fn field_to_json(inventory: &Inventory, value: &FieldValue) -> Option<Json> {
    match value {
        FieldValue::Null => Some(Json::Null),
        FieldValue::Str(s) => Some(json!(s)),
        FieldValue::Int(i) => Some(json!(i)),
        FieldValue::Float(f) => Some(json!(f)),
        FieldValue::Bool(b) => Some(json!(b)),
        FieldValue::Ref(id) => inventory.nb_reference(*id).map(|nb_id| json!(nb_id)),
        FieldValue::RefList(ids) => {
            let mut out = Vec::with_capacity(ids.len());
            for id in ids {
                out.push(inventory.nb_reference(*id)?);
            }
            Some(json!(out))
        }
        FieldValue::Pending(_) => None,
        FieldValue::CustomFields(m) => Some(Json::Object(m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())),
        FieldValue::Tags(set) => Some(json!(set.iter().cloned().collect::<Vec<_>>())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn build_patch_body_defers_always_deferred_fields() {
        let mut inv = Inventory::new();
        inv.add_object(ClassTag::IpAddress, &json!({"id": 3, "address": "10.0.0.5/24"}), true, None);
        let dev = inv
            .add_object(ClassTag::Device, &json!({"id": 2, "name": "h1"}), true, None)
            .expect("created");
        inv.resolve_relations();
        inv.add_update_object(ClassTag::Device, &json!({"name": "h1", "primary_ip4": {"id": 3}}), false, None);
        let e = inv.get(dev).expect("entity");
        let body = build_patch_body(&inv, e, ["primary_ip4"].into_iter(), true);
        assert!(body.is_empty(), "primary_ip4 must always defer to Pass 3");
    }

    #[test]
    fn prune_candidate_requires_orphan_tag_and_no_source() {
        let mut inv = Inventory::new();
        let id = inv
            .add_object(ClassTag::Tenant, &json!({"name": "x"}), false, None)
            .expect("created");
        let e = inv.get(id).expect("entity");
        assert!(!is_prune_candidate(e, "orphan", &|_| false));

        inv.add_update_object(ClassTag::Tenant, &json!({"name": "x", "tags": ["orphan"]}), false, None);
        let e = inv.get(id).expect("entity");
        assert!(is_prune_candidate(e, "orphan", &|_| false));
    }

    fn dummy_client() -> NetBoxClient {
        NetBoxClient::new(
            "http://127.0.0.1:0".to_string(),
            "token".to_string(),
            std::time::Duration::from_millis(1),
            0,
            50,
            true,
            None,
        )
        .expect("client")
    }

    /// A `read_only` class (e.g. VRF, grounded in `object_classes.py`) must
    /// never reach `client.create`/`update`/`delete`, no matter how dirty or
    /// deleted its entity is — if it did, this test would hang or error
    /// trying to actually reach 127.0.0.1:0.
    #[tokio::test]
    async fn read_only_class_is_never_written_or_deleted() {
        let client = dummy_client();
        let settings = EngineSettings::default();
        let orch = Orchestrator::new(&client, &settings);
        let mut inv = Inventory::new();
        assert!(nb_inventory::descriptor(ClassTag::Vrf).read_only);

        let id = inv
            .add_object(ClassTag::Vrf, &json!({"id": 7, "name": "blue"}), true, None)
            .expect("created");
        inv.update_by_id(id, &json!({"name": "red"}), None);
        orch.apply_write(&mut inv, id, true).await.expect("write skipped, not sent");

        if let Some(e) = inv.get_mut(id) {
            e.mark_deleted();
        }
        orch.apply_delete(&mut inv, id).await.expect("delete skipped, not sent");
    }
}
