use thiserror::Error;

use crate::id::ClassTag;

/// Errors raised by inventory operations themselves, as distinct from
/// transport errors (those live in `netbox_client::NetBoxError` and are
/// handled one layer up, in `sync-core`).
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("{class:?}: value {value:?} rejected for field {field:?}: {reason}")]
    InvalidField {
        class: ClassTag,
        field: String,
        value: String,
        reason: String,
    },
    #[error("{class:?}: missing required primary key field {field:?}")]
    MissingPrimaryKey { class: ClassTag, field: String },
    #[error("{class:?}#{slot}: entity slot out of range")]
    InvalidSlot { class: ClassTag, slot: u32 },
    #[error("{0:?}: reference left unresolved after resolve_relations()")]
    DanglingReference(ClassTag),
}
