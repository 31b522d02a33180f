//! Errors raised by the sync orchestrator itself, layered over the
//! transport ([`netbox_client::NetBoxError`]) and data ([`nb_inventory::InventoryError`])
//! error types the lower crates already define.

use thiserror::Error;

/// Errors the orchestrator can raise. Per spec §7, only the variants that
/// wrap a [`netbox_client::NetBoxError::Fatal`] should abort the run — every
/// other failure is logged and the affected object/class is skipped.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("NetBox transport error: {0}")]
    NetBox(#[from] netbox_client::NetBoxError),

    #[error("inventory error: {0}")]
    Inventory(#[from] nb_inventory::InventoryError),

    #[error("cache directory error: {0}")]
    Cache(#[source] std::io::Error),
}

impl SyncError {
    /// True when the run must abort (spec §7: 403 / 5xx / missing
    /// `API-Version` / retry budget exhausted).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NetBox(netbox_client::NetBoxError::Fatal(_)))
    }
}
