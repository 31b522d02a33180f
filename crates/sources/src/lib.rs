//! Concrete source adapters built on `source-framework`'s common base
//! (spec §0 "Concrete Source Adapters"): a hypervisor-cluster adapter and
//! a hardware-inventory-JSON adapter, each grounded on the dataflow
//! contract of its `original_source/` counterpart rather than its
//! internal collection mechanics (out of scope per spec §1).

pub mod hardware_inventory;
pub mod hypervisor_cluster;

pub use hardware_inventory::{HardwareInventoryAdapter, HardwareSnapshot, PowerSupply};
pub use hypervisor_cluster::{ClusterSnapshot, ComputeNode, HypervisorClusterAdapter, NodeKind};
