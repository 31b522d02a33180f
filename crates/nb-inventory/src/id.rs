//! The arena index model that replaces the original's cyclic live-object
//! references (spec §9 REDESIGN FLAGS: "cyclic object graphs").

use std::fmt;

/// Every NetBox entity class the engine touches, in the declaration order
/// that encodes the dependency DAG (spec §4.4: "the declaration order
/// encodes the natural dependency DAG"). `primary_ip4`/`primary_ip6`/
/// `primary_mac_address` are excluded from this DAG by design — they are
/// always deferred to the FINAL pass, which is what breaks the Device ↔
/// IPAddress ↔ Interface ↔ Device cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[non_exhaustive]
pub enum ClassTag {
    /// Organisational tag stamped on every managed object.
    Tag,
    /// Tenant.
    Tenant,
    /// Geographic/administrative region.
    Region,
    /// Grouping of sites.
    SiteGroup,
    /// Site.
    Site,
    /// Routing/forwarding instance.
    Vrf,
    /// Grouping of clusters.
    ClusterGroup,
    /// Cluster type (e.g. "VMware vSphere").
    ClusterType,
    /// Hypervisor/VM cluster.
    Cluster,
    /// Device manufacturer.
    Manufacturer,
    /// Device type (model).
    DeviceType,
    /// Device functional role.
    DeviceRole,
    /// Operating system / platform.
    Platform,
    /// IP prefix / subnet.
    Prefix,
    /// VLAN group.
    VlanGroup,
    /// VLAN.
    Vlan,
    /// Physical device.
    Device,
    /// Virtual machine.
    Vm,
    /// Physical network interface.
    Interface,
    /// Virtual machine network interface.
    VmInterface,
    /// Virtual disk attached to a VM.
    VirtualDisk,
    /// IP address.
    IpAddress,
    /// MAC address (its own entity since NetBox 4.2).
    MacAddress,
    /// FHRP (VRRP/HSRP/...) group membership.
    FhrpGroupItem,
    /// Generic inventory item (PSU, transceiver, ...).
    InventoryItem,
    /// Power port on a device.
    PowerPort,
    /// Custom field definition.
    CustomField,
}

impl ClassTag {
    /// Every class, in declaration/dependency order.
    pub const ALL: &'static [ClassTag] = &[
        ClassTag::Tag,
        ClassTag::Tenant,
        ClassTag::Region,
        ClassTag::SiteGroup,
        ClassTag::Site,
        ClassTag::Vrf,
        ClassTag::ClusterGroup,
        ClassTag::ClusterType,
        ClassTag::Cluster,
        ClassTag::Manufacturer,
        ClassTag::DeviceType,
        ClassTag::DeviceRole,
        ClassTag::Platform,
        ClassTag::Prefix,
        ClassTag::VlanGroup,
        ClassTag::Vlan,
        ClassTag::Device,
        ClassTag::Vm,
        ClassTag::Interface,
        ClassTag::VmInterface,
        ClassTag::VirtualDisk,
        ClassTag::IpAddress,
        ClassTag::MacAddress,
        ClassTag::FhrpGroupItem,
        ClassTag::InventoryItem,
        ClassTag::PowerPort,
        ClassTag::CustomField,
    ];

    /// Index into [`Self::ALL`] / the inventory's per-class storage vector.
    pub fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|c| *c == self)
            .unwrap_or(usize::MAX)
    }
}

/// A stable, process-unique handle to one entity: its address in the
/// inventory. Replaces the original's live Python object references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId {
    pub(crate) class: ClassTag,
    pub(crate) slot: u32,
}

impl EntityId {
    /// The class this handle belongs to.
    pub fn class(self) -> ClassTag {
        self.class
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}#{}", self.class, self.slot)
    }
}
