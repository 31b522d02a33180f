//! The generic entity representation. One `Entity` stands in for all 27
//! classes; its `ClassDescriptor` (see [`crate::class`]) supplies the
//! class-specific field kinds that [`crate::inventory::Inventory`] enforces
//! on every write.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value as Json;

use crate::id::{ClassTag, EntityId};

/// A resolved or deferred value assigned to one field of an [`Entity`].
///
/// `Ref`/`RefList` hold a live [`EntityId`] once resolved. A source-driven
/// update resolves its references immediately (`get_by_data`/
/// `add_update_object`, spec §4.1); a NetBox bulk-load defers resolution to
/// [`crate::inventory::Inventory::resolve_relations`] via [`PendingRef`],
/// since the referenced entity may not exist in the inventory yet.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Absent / explicitly unset.
    Null,
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// A resolved reference to another entity.
    Ref(EntityId),
    /// A resolved, ordered, de-duplicated list of references.
    RefList(Vec<EntityId>),
    /// Not yet resolved — see [`PendingRef`].
    Pending(PendingRef),
    /// `custom_fields`: merged, not replaced, on update.
    CustomFields(BTreeMap<String, Json>),
    /// `tags`: additive-only on update.
    Tags(BTreeSet<String>),
}

impl FieldValue {
    /// The live id this field points to, once resolved.
    pub fn as_ref_id(&self) -> Option<EntityId> {
        match self {
            Self::Ref(id) => Some(*id),
            _ => None,
        }
    }

    /// The live ids this field points to, once resolved.
    pub fn as_ref_list(&self) -> Option<&[EntityId]> {
        match self {
            Self::RefList(ids) => Some(ids),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// A reference field whose target could not be resolved at assignment time.
///
/// Mirrors the original's two distinct reference-resolution code paths: a
/// NetBox payload supplies the target's numeric id directly (`ById`), while
/// a source adapter supplies a nested data dict that must be matched or
/// created (`ByData`) — spec §4.1 "reference fields... resolved against the
/// live inventory".
#[derive(Debug, Clone, PartialEq)]
pub enum PendingRef {
    /// NetBox returned `{"id": N, ...}`; resolve by id once the target class
    /// has finished loading.
    ById { class: ClassTag, nb_id: u64 },
    /// NetBox returned a list of `{"id": N, ...}` for a `RefList` field;
    /// resolve every id once the target class has finished loading.
    ByIdList { class: ClassTag, nb_ids: Vec<u64> },
    /// A source handed us nested identifying data; resolve (or create) by
    /// `get_by_data` once the target class's disambiguation fields are all
    /// present in the inventory.
    ByData { class: ClassTag, data: BTreeMap<String, Json> },
}

/// One entity instance: a class tag, its field values, and the bookkeeping
/// needed to compute a minimal diff against NetBox (spec §8 "dirty-field
/// tracking").
#[derive(Debug, Clone)]
pub struct Entity {
    pub(crate) class: ClassTag,
    /// This entity's NetBox primary key, or 0 if not yet created there
    /// (spec invariant: `nb_id == 0 <=> is_new`).
    pub(crate) nb_id: u64,
    pub(crate) is_new: bool,
    /// Marked for deletion by a prune pass; excluded from further matching.
    pub(crate) deleted: bool,
    /// Current field values.
    pub(crate) data: BTreeMap<String, FieldValue>,
    /// Snapshot of `data` at load time (or at creation, for a new object),
    /// used to detect and cancel no-op writes.
    pub(crate) original_data: BTreeMap<String, FieldValue>,
    /// Field names changed since `original_data`, pending an UPSERT-phase
    /// PATCH.
    pub(crate) updated_items: BTreeSet<String>,
    /// Field names explicitly unset (assigned `Null` where the original had
    /// a value), requiring a UNSET-phase PATCH before the cycle they belong
    /// to can be broken.
    pub(crate) unset_items: BTreeSet<String>,
    /// Name of the source adapter that last touched this entity, or `None`
    /// for objects discovered only via bulk NetBox load. Drives orphan-tag
    /// bookkeeping (spec §4.5).
    pub(crate) source: Option<String>,
}

impl Entity {
    /// Construct a brand-new, not-yet-persisted entity.
    pub fn new(class: ClassTag) -> Self {
        Self {
            class,
            nb_id: 0,
            is_new: true,
            deleted: false,
            data: BTreeMap::new(),
            original_data: BTreeMap::new(),
            updated_items: BTreeSet::new(),
            unset_items: BTreeSet::new(),
            source: None,
        }
    }

    /// Reconstruct an entity already known to NetBox, snapshotting `data`
    /// as `original_data` so a later update can diff against it.
    pub fn from_netbox(class: ClassTag, nb_id: u64, data: BTreeMap<String, FieldValue>) -> Self {
        Self {
            class,
            nb_id,
            is_new: false,
            deleted: false,
            original_data: data.clone(),
            data,
            updated_items: BTreeSet::new(),
            unset_items: BTreeSet::new(),
            source: None,
        }
    }

    pub fn class(&self) -> ClassTag {
        self.class
    }

    pub fn nb_id(&self) -> u64 {
        self.nb_id
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn deleted(&self) -> bool {
        self.deleted
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.data.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn has_pending(&self) -> bool {
        self.data.values().any(|v| matches!(v, FieldValue::Pending(_)))
    }

    /// Dirty fields that still need an UPSERT-phase write.
    pub fn dirty_fields(&self) -> impl Iterator<Item = &str> {
        self.updated_items.iter().map(String::as_str)
    }

    /// Fields that still need a UNSET-phase write (assigned, then cleared,
    /// a value that referenced an entity later found to be part of a cycle).
    pub fn unset_fields(&self) -> impl Iterator<Item = &str> {
        self.unset_items.iter().map(String::as_str)
    }

    pub fn is_dirty(&self) -> bool {
        !self.updated_items.is_empty() || !self.unset_items.is_empty()
    }

    pub fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    pub fn set_source(&mut self, source: Option<String>) {
        self.source = Some(source.unwrap_or_default()).filter(|s| !s.is_empty());
    }

    /// Apply `read_from_netbox=true` semantics: take the payload verbatim,
    /// reset dirty-tracking, stamp `nb_id`/`is_new` (spec §4.1).
    pub(crate) fn load_from_netbox(&mut self, nb_id: u64, data: BTreeMap<String, FieldValue>) {
        self.nb_id = nb_id;
        self.is_new = false;
        self.original_data = data.clone();
        self.data = data;
        self.updated_items.clear();
        self.unset_items.clear();
    }

    /// Apply one field write under source-driven semantics (spec §4.1): the
    /// field becomes dirty unless the new value matches `original_data`
    /// (first-seen NetBox value), in which case the write is a no-op and any
    /// prior dirtiness for this field is cancelled (spec §8 "dirty-field
    /// cancellation").
    pub(crate) fn set_field(&mut self, field: &str, value: FieldValue) {
        let unchanged = self
            .original_data
            .get(field)
            .is_some_and(|orig| *orig == value);
        if unchanged {
            self.updated_items.remove(field);
            self.unset_items.remove(field);
        } else {
            self.updated_items.insert(field.to_string());
            self.unset_items.remove(field);
        }
        self.data.insert(field.to_string(), value);
    }

    /// Record `field` as pending a UNSET-phase PATCH, only if it currently
    /// carries a non-empty value (spec §4.1 `unset_attribute`).
    pub(crate) fn unset_attribute(&mut self, field: &str) {
        let is_empty = match self.data.get(field) {
            None => true,
            Some(FieldValue::Null) => true,
            Some(FieldValue::RefList(v)) => v.is_empty(),
            Some(FieldValue::Tags(v)) => v.is_empty(),
            Some(FieldValue::Str(s)) => s.is_empty(),
            _ => false,
        };
        if !is_empty {
            self.unset_items.insert(field.to_string());
            self.data.insert(field.to_string(), FieldValue::Null);
            self.updated_items.remove(field);
        }
    }

    /// Additive tag assignment (spec §3 "tag list: assignment is additive").
    pub(crate) fn add_tags(&mut self, field: &str, names: impl IntoIterator<Item = String>) {
        let mut set = match self.data.remove(field) {
            Some(FieldValue::Tags(s)) => s,
            _ => BTreeSet::new(),
        };
        let before = set.clone();
        set.extend(names);
        if set != before {
            self.updated_items.insert(field.to_string());
        }
        self.data.insert(field.to_string(), FieldValue::Tags(set));
    }

    /// Explicit tag removal — the spec's one exception to additive-only
    /// assignment ("explicit removal is a separate operation").
    pub(crate) fn remove_tags(&mut self, field: &str, names: &BTreeSet<String>) {
        if let Some(FieldValue::Tags(set)) = self.data.get_mut(field) {
            let before_len = set.len();
            set.retain(|t| !names.contains(t));
            if set.len() != before_len {
                self.updated_items.insert(field.to_string());
            }
        }
    }

    /// Merge-not-replace custom-field assignment (spec §3).
    pub(crate) fn merge_custom_fields(&mut self, field: &str, incoming: BTreeMap<String, Json>) {
        let mut map = match self.data.remove(field) {
            Some(FieldValue::CustomFields(m)) => m,
            _ => BTreeMap::new(),
        };
        let before = map.clone();
        map.extend(incoming);
        if map != before {
            self.updated_items.insert(field.to_string());
        }
        self.data.insert(field.to_string(), FieldValue::CustomFields(map));
    }
}
