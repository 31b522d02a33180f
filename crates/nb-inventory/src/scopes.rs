//! Mapping between a [`ClassTag`] and the NetBox content-type string used in
//! polymorphic `assigned_object_type`/`scope_type` fields.
//!
//! Grounded in `object_classes.py::NetBoxMappings`, which the original keeps
//! as a hand-written dict from short internal class name to NetBox's
//! `app_label.model` content-type string. IPAddress and MACAddress are the
//! classes that carry a [`crate::class::FieldKind::ScopedRef`]; this module
//! is also reused for the `scope_id`/`scope_type` pattern NetBox 4.2 added
//! to Cluster/Prefix/VLANGroup.

use crate::class::descriptor;
use crate::id::ClassTag;

/// Resolve the NetBox content-type string (`"dcim.interface"`, ...) for a
/// class tag that can appear as the target of a polymorphic reference.
pub fn object_type_of(tag: ClassTag) -> &'static str {
    descriptor(tag).object_type
}

/// Resolve a NetBox content-type string back to the [`ClassTag`] it names,
/// scanning only the given candidate set (the `ScopedRef` field's allowed
/// targets) so an unrelated class sharing no relationship to this field
/// can never be matched.
pub fn class_for_object_type(object_type: &str, candidates: &[ClassTag]) -> Option<ClassTag> {
    candidates
        .iter()
        .copied()
        .find(|tag| descriptor(*tag).object_type == object_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_interface_content_type() {
        let ty = object_type_of(ClassTag::Interface);
        assert_eq!(ty, "dcim.interface");
        assert_eq!(
            class_for_object_type(ty, &[ClassTag::Interface, ClassTag::VmInterface]),
            Some(ClassTag::Interface)
        );
    }

    #[test]
    fn rejects_object_type_outside_candidate_set() {
        let ty = object_type_of(ClassTag::FhrpGroupItem);
        assert_eq!(class_for_object_type(ty, &[ClassTag::Interface, ClassTag::VmInterface]), None);
    }
}
