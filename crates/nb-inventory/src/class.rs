//! Static class descriptors — the REDESIGN FLAGS replacement for runtime
//! `subclasses(Entity)` enumeration (spec §9). One descriptor per
//! [`ClassTag`], carrying its `api_path`, key fields, `data_model` field
//! kinds and dependency-relevant metadata. The orchestrator and inventory
//! walk [`ClassTag::ALL`] and dispatch generically off these descriptors
//! instead of one hand-written subclass per entity.

use crate::id::ClassTag;

/// The permitted value kind of one `data_model` field (spec §3 "Field-kind semantics").
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// Truncated to the given length on assignment.
    Str(u32),
    /// Like `Str`, additionally slug-normalised and uniqueness-checked.
    Slug(u32),
    /// Integer.
    Int,
    /// Floating point (only `VM.vcpus` uses this today).
    Float,
    /// Boolean.
    Bool,
    /// Rejected unless the value is one of the given set.
    Enum(&'static [&'static str]),
    /// Looked up or created by the nested payload; stores a live `EntityId`.
    Ref(ClassTag),
    /// Ordered, de-duplicated set of references.
    RefList(ClassTag),
    /// Polymorphic reference: `assigned_object_id` scoped to one of several classes,
    /// paired with a derived `assigned_object_type` field.
    ScopedRef(&'static [ClassTag]),
    /// `custom_fields`: merge-not-replace map.
    CustomFieldBag,
    /// `tags`: additive-only assignment.
    TagList,
}

/// One field of a class's `data_model`.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Field name as it appears in the NetBox payload.
    pub name: &'static str,
    /// Permitted value kind.
    pub kind: FieldKind,
}

/// Static metadata for one entity class.
#[derive(Debug, Clone, Copy)]
pub struct ClassDescriptor {
    /// This class's tag.
    pub tag: ClassTag,
    /// Human-readable name, used in display names and log messages.
    pub name: &'static str,
    /// NetBox REST path, e.g. `"dcim/devices"`.
    pub api_path: &'static str,
    /// NetBox content-type string, e.g. `"dcim.device"` — used as the value
    /// of a sibling `assigned_object_type`/`object_types` field.
    pub object_type: &'static str,
    /// The field that uniquely (or near-uniquely) identifies an instance.
    pub primary_key: &'static str,
    /// Disambiguates display/lookup when primary keys collide across a wider scope.
    pub secondary_key: Option<&'static str>,
    /// Display name always includes the secondary key, not only on collision.
    pub enforce_secondary_key: bool,
    /// Eligible for orphan-tag/prune handling.
    pub prune: bool,
    /// Never written to by this engine (e.g. `FHRPGroupItem`).
    pub read_only: bool,
    /// Lowest NetBox API version this class is available on, if gated.
    pub min_api_version: Option<&'static str>,
    /// Whether the NetBox model exposes `last_updated` (drives cache delta
    /// eligibility — spec §4.3, Open Question #1 in SPEC_FULL.md).
    pub has_last_updated: bool,
    /// Missing primary key drops the entity with a warning rather than failing the run.
    pub skip_if_missing_pk: bool,
    /// The class's `data_model`.
    pub fields: &'static [FieldSpec],
}

const fn f(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, kind }
}

const DEVICE_STATUS: &[&str] = &[
    "offline", "active", "planned", "staged", "failed", "inventory", "decommissioning",
];
const VM_STATUS: &[&str] = &["offline", "active", "planned", "staged", "failed", "decommissioning"];
const INTERFACE_MODE: &[&str] = &["access", "tagged", "tagged-all"];
const INTERFACE_DUPLEX: &[&str] = &["half", "full", "auto"];
const IP_ROLE: &[&str] = &[
    "loopback", "secondary", "anycast", "vip", "vrrp", "hsrp", "glbp", "carp",
];
/// A representative subset of NetBox's interface-type choice set (the real
/// list runs into the hundreds); common physical and virtual kinds plus the
/// ones the framework itself branches on (`virtual`, `lag`).
const INTERFACE_TYPE: &[&str] = &[
    "virtual", "lag", "bridge",
    "100base-tx", "1000base-t", "2.5gbase-t", "5gbase-t", "10gbase-t",
    "1000base-x-sfp", "10gbase-x-sfpp", "25gbase-x-sfp28", "40gbase-x-qsfpp",
    "100gbase-x-qsfp28", "other",
];

static DESCRIPTORS: [ClassDescriptor; 27] = [
    ClassDescriptor {
        tag: ClassTag::Tag,
        name: "tag",
        api_path: "extras/tags",
        object_type: "extras.tag",
        primary_key: "name",
        secondary_key: None,
        enforce_secondary_key: false,
        prune: false,
        read_only: false,
        min_api_version: None,
        has_last_updated: false,
        skip_if_missing_pk: false,
        fields: &[
            f("name", FieldKind::Str(100)),
            f("slug", FieldKind::Slug(100)),
            f("description", FieldKind::Str(200)),
            f("color", FieldKind::Str(6)),
        ],
    },
    ClassDescriptor {
        tag: ClassTag::Tenant,
        name: "tenant",
        api_path: "tenancy/tenants",
        object_type: "tenancy.tenant",
        primary_key: "name",
        secondary_key: None,
        enforce_secondary_key: false,
        prune: false,
        read_only: false,
        min_api_version: None,
        has_last_updated: true,
        skip_if_missing_pk: false,
        fields: &[
            f("name", FieldKind::Str(64)),
            f("slug", FieldKind::Slug(64)),
            f("description", FieldKind::Str(200)),
            f("comments", FieldKind::Str(65536)),
            f("tags", FieldKind::TagList),
        ],
    },
    ClassDescriptor {
        tag: ClassTag::Region,
        name: "region",
        api_path: "dcim/regions",
        object_type: "dcim.region",
        primary_key: "name",
        secondary_key: None,
        enforce_secondary_key: false,
        prune: false,
        read_only: false,
        min_api_version: None,
        has_last_updated: true,
        skip_if_missing_pk: false,
        fields: &[
            f("name", FieldKind::Str(64)),
            f("slug", FieldKind::Slug(64)),
            f("description", FieldKind::Str(200)),
        ],
    },
    ClassDescriptor {
        tag: ClassTag::SiteGroup,
        name: "site group",
        api_path: "dcim/site-groups",
        object_type: "dcim.sitegroup",
        primary_key: "name",
        secondary_key: None,
        enforce_secondary_key: false,
        prune: false,
        read_only: true,
        min_api_version: None,
        has_last_updated: true,
        skip_if_missing_pk: false,
        fields: &[
            f("name", FieldKind::Str(64)),
            f("slug", FieldKind::Slug(64)),
            f("description", FieldKind::Str(200)),
        ],
    },
    ClassDescriptor {
        tag: ClassTag::Site,
        name: "site",
        api_path: "dcim/sites",
        object_type: "dcim.site",
        primary_key: "name",
        secondary_key: None,
        enforce_secondary_key: false,
        prune: false,
        read_only: false,
        min_api_version: None,
        has_last_updated: true,
        skip_if_missing_pk: false,
        fields: &[
            f("name", FieldKind::Str(64)),
            f("slug", FieldKind::Slug(64)),
            f("status", FieldKind::Enum(&["active", "planned", "staging", "decommissioning", "retired"])),
            f("region", FieldKind::Ref(ClassTag::Region)),
            f("group", FieldKind::Ref(ClassTag::SiteGroup)),
            f("tenant", FieldKind::Ref(ClassTag::Tenant)),
            f("description", FieldKind::Str(200)),
            f("comments", FieldKind::Str(65536)),
            f("tags", FieldKind::TagList),
        ],
    },
    ClassDescriptor {
        tag: ClassTag::Vrf,
        name: "VRF",
        api_path: "ipam/vrfs",
        object_type: "ipam.vrf",
        primary_key: "name",
        secondary_key: None,
        enforce_secondary_key: false,
        prune: false,
        read_only: true,
        min_api_version: None,
        has_last_updated: true,
        skip_if_missing_pk: false,
        fields: &[
            f("name", FieldKind::Str(64)),
            f("rd", FieldKind::Str(21)),
            f("tenant", FieldKind::Ref(ClassTag::Tenant)),
            f("description", FieldKind::Str(200)),
            f("tags", FieldKind::TagList),
        ],
    },
    ClassDescriptor {
        tag: ClassTag::ClusterGroup,
        name: "cluster group",
        api_path: "virtualization/cluster-groups",
        object_type: "virtualization.clustergroup",
        primary_key: "name",
        secondary_key: None,
        enforce_secondary_key: false,
        prune: false,
        read_only: false,
        min_api_version: None,
        has_last_updated: true,
        skip_if_missing_pk: false,
        fields: &[
            f("name", FieldKind::Str(64)),
            f("slug", FieldKind::Slug(64)),
            f("description", FieldKind::Str(200)),
        ],
    },
    ClassDescriptor {
        tag: ClassTag::ClusterType,
        name: "cluster type",
        api_path: "virtualization/cluster-types",
        object_type: "virtualization.clustertype",
        primary_key: "name",
        secondary_key: None,
        enforce_secondary_key: false,
        prune: false,
        read_only: false,
        min_api_version: None,
        has_last_updated: true,
        skip_if_missing_pk: false,
        fields: &[
            f("name", FieldKind::Str(64)),
            f("slug", FieldKind::Slug(64)),
            f("description", FieldKind::Str(200)),
        ],
    },
    ClassDescriptor {
        tag: ClassTag::Cluster,
        name: "cluster",
        api_path: "virtualization/clusters",
        object_type: "virtualization.cluster",
        primary_key: "name",
        secondary_key: None,
        enforce_secondary_key: false,
        prune: false,
        read_only: false,
        min_api_version: None,
        has_last_updated: true,
        skip_if_missing_pk: false,
        fields: &[
            f("name", FieldKind::Str(100)),
            f("type", FieldKind::Ref(ClassTag::ClusterType)),
            f("group", FieldKind::Ref(ClassTag::ClusterGroup)),
            f("site", FieldKind::Ref(ClassTag::Site)),
            f("tenant", FieldKind::Ref(ClassTag::Tenant)),
            f("status", FieldKind::Enum(&["active", "planned", "staging", "decommissioning", "offline"])),
            f("comments", FieldKind::Str(65536)),
            f("tags", FieldKind::TagList),
        ],
    },
    ClassDescriptor {
        tag: ClassTag::Manufacturer,
        name: "manufacturer",
        api_path: "dcim/manufacturers",
        object_type: "dcim.manufacturer",
        primary_key: "name",
        secondary_key: None,
        enforce_secondary_key: false,
        prune: false,
        read_only: false,
        min_api_version: None,
        has_last_updated: true,
        skip_if_missing_pk: false,
        fields: &[
            f("name", FieldKind::Str(64)),
            f("slug", FieldKind::Slug(64)),
            f("description", FieldKind::Str(200)),
        ],
    },
    ClassDescriptor {
        tag: ClassTag::DeviceType,
        name: "device type",
        api_path: "dcim/device-types",
        object_type: "dcim.devicetype",
        primary_key: "model",
        secondary_key: Some("manufacturer"),
        enforce_secondary_key: true,
        prune: false,
        read_only: false,
        min_api_version: None,
        has_last_updated: true,
        skip_if_missing_pk: false,
        fields: &[
            f("model", FieldKind::Str(100)),
            f("slug", FieldKind::Slug(100)),
            f("manufacturer", FieldKind::Ref(ClassTag::Manufacturer)),
            f("part_number", FieldKind::Str(50)),
            f("u_height", FieldKind::Int),
            f("is_full_depth", FieldKind::Bool),
            f("tags", FieldKind::TagList),
        ],
    },
    ClassDescriptor {
        tag: ClassTag::DeviceRole,
        name: "device role",
        api_path: "dcim/device-roles",
        object_type: "dcim.devicerole",
        primary_key: "name",
        secondary_key: None,
        enforce_secondary_key: false,
        prune: false,
        read_only: false,
        min_api_version: None,
        has_last_updated: true,
        skip_if_missing_pk: false,
        fields: &[
            f("name", FieldKind::Str(64)),
            f("slug", FieldKind::Slug(64)),
            f("color", FieldKind::Str(6)),
            f("vm_role", FieldKind::Bool),
            f("description", FieldKind::Str(200)),
        ],
    },
    ClassDescriptor {
        tag: ClassTag::Platform,
        name: "platform",
        api_path: "dcim/platforms",
        object_type: "dcim.platform",
        primary_key: "name",
        secondary_key: None,
        enforce_secondary_key: false,
        prune: false,
        read_only: false,
        min_api_version: None,
        has_last_updated: true,
        skip_if_missing_pk: false,
        fields: &[
            f("name", FieldKind::Str(64)),
            f("slug", FieldKind::Slug(64)),
            f("manufacturer", FieldKind::Ref(ClassTag::Manufacturer)),
            f("description", FieldKind::Str(200)),
        ],
    },
    ClassDescriptor {
        tag: ClassTag::Prefix,
        name: "prefix",
        api_path: "ipam/prefixes",
        object_type: "ipam.prefix",
        primary_key: "prefix",
        secondary_key: Some("vrf"),
        enforce_secondary_key: false,
        prune: false,
        read_only: true,
        min_api_version: None,
        has_last_updated: true,
        skip_if_missing_pk: false,
        fields: &[
            f("prefix", FieldKind::Str(64)),
            f("site", FieldKind::Ref(ClassTag::Site)),
            f("vrf", FieldKind::Ref(ClassTag::Vrf)),
            f("tenant", FieldKind::Ref(ClassTag::Tenant)),
            f("vlan", FieldKind::Ref(ClassTag::Vlan)),
            f("status", FieldKind::Enum(&["container", "active", "reserved", "deprecated"])),
            f("is_pool", FieldKind::Bool),
            f("description", FieldKind::Str(200)),
            f("tags", FieldKind::TagList),
        ],
    },
    ClassDescriptor {
        tag: ClassTag::VlanGroup,
        name: "VLAN group",
        api_path: "ipam/vlan-groups",
        object_type: "ipam.vlangroup",
        primary_key: "name",
        secondary_key: None,
        enforce_secondary_key: false,
        prune: false,
        read_only: true,
        min_api_version: None,
        has_last_updated: true,
        skip_if_missing_pk: false,
        fields: &[
            f("name", FieldKind::Str(64)),
            f("slug", FieldKind::Slug(64)),
            f("site", FieldKind::Ref(ClassTag::Site)),
            f("description", FieldKind::Str(200)),
        ],
    },
    ClassDescriptor {
        tag: ClassTag::Vlan,
        name: "VLAN",
        api_path: "ipam/vlans",
        object_type: "ipam.vlan",
        primary_key: "vid",
        secondary_key: Some("name"),
        enforce_secondary_key: true,
        prune: false,
        read_only: false,
        min_api_version: None,
        has_last_updated: true,
        skip_if_missing_pk: false,
        fields: &[
            f("vid", FieldKind::Int),
            f("name", FieldKind::Str(64)),
            f("site", FieldKind::Ref(ClassTag::Site)),
            f("group", FieldKind::Ref(ClassTag::VlanGroup)),
            f("tenant", FieldKind::Ref(ClassTag::Tenant)),
            f("status", FieldKind::Enum(&["active", "reserved", "deprecated"])),
            f("description", FieldKind::Str(200)),
            f("tags", FieldKind::TagList),
        ],
    },
    ClassDescriptor {
        tag: ClassTag::Device,
        name: "device",
        api_path: "dcim/devices",
        object_type: "dcim.device",
        primary_key: "name",
        secondary_key: None,
        enforce_secondary_key: false,
        prune: true,
        read_only: false,
        min_api_version: None,
        has_last_updated: true,
        skip_if_missing_pk: false,
        fields: &[
            f("name", FieldKind::Str(64)),
            f("device_type", FieldKind::Ref(ClassTag::DeviceType)),
            f("role", FieldKind::Ref(ClassTag::DeviceRole)),
            f("platform", FieldKind::Ref(ClassTag::Platform)),
            f("serial", FieldKind::Str(50)),
            f("site", FieldKind::Ref(ClassTag::Site)),
            f("status", FieldKind::Enum(DEVICE_STATUS)),
            f("cluster", FieldKind::Ref(ClassTag::Cluster)),
            f("asset_tag", FieldKind::Str(50)),
            f("primary_ip4", FieldKind::Ref(ClassTag::IpAddress)),
            f("primary_ip6", FieldKind::Ref(ClassTag::IpAddress)),
            f("tags", FieldKind::TagList),
            f("tenant", FieldKind::Ref(ClassTag::Tenant)),
            f("custom_fields", FieldKind::CustomFieldBag),
        ],
    },
    ClassDescriptor {
        tag: ClassTag::Vm,
        name: "virtual machine",
        api_path: "virtualization/virtual-machines",
        object_type: "virtualization.virtualmachine",
        primary_key: "name",
        secondary_key: Some("cluster"),
        enforce_secondary_key: false,
        prune: true,
        read_only: false,
        min_api_version: None,
        has_last_updated: true,
        skip_if_missing_pk: false,
        fields: &[
            f("name", FieldKind::Str(64)),
            f("serial", FieldKind::Str(50)),
            f("status", FieldKind::Enum(VM_STATUS)),
            f("cluster", FieldKind::Ref(ClassTag::Cluster)),
            f("role", FieldKind::Ref(ClassTag::DeviceRole)),
            f("platform", FieldKind::Ref(ClassTag::Platform)),
            f("vcpus", FieldKind::Float),
            f("memory", FieldKind::Int),
            f("disk", FieldKind::Int),
            f("comments", FieldKind::Str(65536)),
            f("primary_ip4", FieldKind::Ref(ClassTag::IpAddress)),
            f("primary_ip6", FieldKind::Ref(ClassTag::IpAddress)),
            f("site", FieldKind::Ref(ClassTag::Site)),
            f("tags", FieldKind::TagList),
            f("tenant", FieldKind::Ref(ClassTag::Tenant)),
            f("device", FieldKind::Ref(ClassTag::Device)),
            f("custom_fields", FieldKind::CustomFieldBag),
        ],
    },
    ClassDescriptor {
        tag: ClassTag::Interface,
        name: "interface",
        api_path: "dcim/interfaces",
        object_type: "dcim.interface",
        primary_key: "name",
        secondary_key: Some("device"),
        enforce_secondary_key: true,
        prune: true,
        read_only: false,
        min_api_version: None,
        has_last_updated: false,
        skip_if_missing_pk: false,
        fields: &[
            f("name", FieldKind::Str(64)),
            f("device", FieldKind::Ref(ClassTag::Device)),
            f("label", FieldKind::Str(64)),
            f("type", FieldKind::Enum(INTERFACE_TYPE)),
            f("enabled", FieldKind::Bool),
            f("mac_address", FieldKind::Str(17)),
            f("primary_mac_address", FieldKind::Ref(ClassTag::MacAddress)),
            f("wwn", FieldKind::Str(23)),
            f("mgmt_only", FieldKind::Bool),
            f("mtu", FieldKind::Int),
            f("mode", FieldKind::Enum(INTERFACE_MODE)),
            f("speed", FieldKind::Int),
            f("duplex", FieldKind::Enum(INTERFACE_DUPLEX)),
            f("untagged_vlan", FieldKind::Ref(ClassTag::Vlan)),
            f("tagged_vlans", FieldKind::RefList(ClassTag::Vlan)),
            f("description", FieldKind::Str(200)),
            f("mark_connected", FieldKind::Bool),
            f("tags", FieldKind::TagList),
            f("parent", FieldKind::Ref(ClassTag::Interface)),
        ],
    },
    ClassDescriptor {
        tag: ClassTag::VmInterface,
        name: "virtual machine interface",
        api_path: "virtualization/interfaces",
        object_type: "virtualization.vminterface",
        primary_key: "name",
        secondary_key: Some("virtual_machine"),
        enforce_secondary_key: true,
        prune: true,
        read_only: false,
        min_api_version: None,
        has_last_updated: false,
        skip_if_missing_pk: false,
        fields: &[
            f("name", FieldKind::Str(64)),
            f("virtual_machine", FieldKind::Ref(ClassTag::Vm)),
            f("enabled", FieldKind::Bool),
            f("mac_address", FieldKind::Str(17)),
            f("primary_mac_address", FieldKind::Ref(ClassTag::MacAddress)),
            f("mtu", FieldKind::Int),
            f("mode", FieldKind::Enum(INTERFACE_MODE)),
            f("untagged_vlan", FieldKind::Ref(ClassTag::Vlan)),
            f("tagged_vlans", FieldKind::RefList(ClassTag::Vlan)),
            f("description", FieldKind::Str(200)),
            f("tags", FieldKind::TagList),
        ],
    },
    ClassDescriptor {
        tag: ClassTag::VirtualDisk,
        name: "virtual disk",
        api_path: "virtualization/virtual-disks",
        object_type: "virtualization.virtualdisk",
        primary_key: "name",
        secondary_key: Some("virtual_machine"),
        enforce_secondary_key: true,
        prune: true,
        read_only: false,
        min_api_version: Some("3.7.0"),
        has_last_updated: false,
        skip_if_missing_pk: false,
        fields: &[
            f("name", FieldKind::Str(64)),
            f("virtual_machine", FieldKind::Ref(ClassTag::Vm)),
            f("description", FieldKind::Str(200)),
            f("size", FieldKind::Int),
            f("tags", FieldKind::TagList),
        ],
    },
    ClassDescriptor {
        tag: ClassTag::IpAddress,
        name: "IP address",
        api_path: "ipam/ip-addresses",
        object_type: "ipam.ipaddress",
        primary_key: "address",
        secondary_key: None,
        enforce_secondary_key: false,
        prune: true,
        read_only: false,
        min_api_version: None,
        has_last_updated: true,
        skip_if_missing_pk: false,
        fields: &[
            f("address", FieldKind::Str(43)),
            f("assigned_object_id", FieldKind::ScopedRef(&[ClassTag::Interface, ClassTag::VmInterface, ClassTag::FhrpGroupItem])),
            f("description", FieldKind::Str(200)),
            f("role", FieldKind::Enum(IP_ROLE)),
            f("dns_name", FieldKind::Str(255)),
            f("tags", FieldKind::TagList),
            f("tenant", FieldKind::Ref(ClassTag::Tenant)),
            f("vrf", FieldKind::Ref(ClassTag::Vrf)),
        ],
    },
    ClassDescriptor {
        tag: ClassTag::MacAddress,
        name: "MAC address",
        api_path: "dcim/mac-addresses",
        object_type: "ipam.macaddress",
        primary_key: "mac_address",
        secondary_key: None,
        enforce_secondary_key: false,
        prune: true,
        read_only: false,
        min_api_version: Some("4.2.0"),
        has_last_updated: false,
        skip_if_missing_pk: false,
        fields: &[
            f("mac_address", FieldKind::Str(17)),
            f("assigned_object_id", FieldKind::ScopedRef(&[ClassTag::Interface, ClassTag::VmInterface])),
            f("description", FieldKind::Str(200)),
            f("tags", FieldKind::TagList),
        ],
    },
    ClassDescriptor {
        tag: ClassTag::FhrpGroupItem,
        name: "FHRP group",
        api_path: "ipam/fhrp-groups",
        object_type: "ipam.fhrpgroup",
        primary_key: "group_id",
        secondary_key: None,
        enforce_secondary_key: false,
        prune: false,
        read_only: true,
        min_api_version: None,
        has_last_updated: false,
        skip_if_missing_pk: false,
        fields: &[
            f("group_id", FieldKind::Int),
            f("ip_addresses", FieldKind::RefList(ClassTag::IpAddress)),
            f("description", FieldKind::Str(200)),
            f("tags", FieldKind::TagList),
            f("custom_fields", FieldKind::CustomFieldBag),
        ],
    },
    ClassDescriptor {
        tag: ClassTag::InventoryItem,
        name: "inventory item",
        api_path: "dcim/inventory-items",
        object_type: "dcim.inventoryitem",
        primary_key: "name",
        secondary_key: Some("device"),
        enforce_secondary_key: false,
        prune: true,
        read_only: false,
        min_api_version: None,
        has_last_updated: false,
        skip_if_missing_pk: false,
        fields: &[
            f("device", FieldKind::Ref(ClassTag::Device)),
            f("name", FieldKind::Str(64)),
            f("label", FieldKind::Str(64)),
            f("manufacturer", FieldKind::Ref(ClassTag::Manufacturer)),
            f("part_id", FieldKind::Str(50)),
            f("serial", FieldKind::Str(50)),
            f("asset_tag", FieldKind::Str(50)),
            f("discovered", FieldKind::Bool),
            f("description", FieldKind::Str(200)),
            f("tags", FieldKind::TagList),
            f("custom_fields", FieldKind::CustomFieldBag),
        ],
    },
    ClassDescriptor {
        tag: ClassTag::PowerPort,
        name: "power port",
        api_path: "dcim/power-ports",
        object_type: "dcim.powerport",
        primary_key: "name",
        secondary_key: Some("device"),
        enforce_secondary_key: false,
        prune: true,
        read_only: false,
        min_api_version: None,
        has_last_updated: false,
        skip_if_missing_pk: false,
        fields: &[
            f("device", FieldKind::Ref(ClassTag::Device)),
            f("name", FieldKind::Str(64)),
            f("label", FieldKind::Str(64)),
            f("description", FieldKind::Str(200)),
            f("maximum_draw", FieldKind::Int),
            f("allocated_draw", FieldKind::Int),
            f("mark_connected", FieldKind::Bool),
            f("tags", FieldKind::TagList),
            f("custom_fields", FieldKind::CustomFieldBag),
        ],
    },
    ClassDescriptor {
        tag: ClassTag::CustomField,
        name: "custom field",
        api_path: "extras/custom-fields",
        object_type: "extras.customfield",
        primary_key: "name",
        secondary_key: None,
        enforce_secondary_key: false,
        prune: false,
        read_only: false,
        min_api_version: None,
        has_last_updated: false,
        skip_if_missing_pk: false,
        fields: &[
            f("name", FieldKind::Str(50)),
            f("label", FieldKind::Str(50)),
            f("type", FieldKind::Enum(&["text", "integer", "boolean", "date", "url", "json", "select"])),
            // "object_types" since 4.0.0, "content_types" before.
            f("object_types", FieldKind::RefList(ClassTag::CustomField)),
            f("description", FieldKind::Str(200)),
        ],
    },
];

/// Look up the static descriptor for a class.
pub fn descriptor(tag: ClassTag) -> &'static ClassDescriptor {
    &DESCRIPTORS[tag.index()]
}

/// All descriptors, in declaration/dependency order.
pub fn all() -> &'static [ClassDescriptor] {
    &DESCRIPTORS
}

impl ClassDescriptor {
    /// Find a field's kind by name.
    pub fn field(&self, name: &str) -> Option<FieldKind> {
        self.fields.iter().find(|fs| fs.name == name).map(|fs| fs.kind)
    }

    /// True if this class declares a `slug` field.
    pub fn has_slug(&self) -> bool {
        self.fields.iter().any(|fs| matches!(fs.kind, FieldKind::Slug(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_class_tag_has_a_descriptor_at_its_index() {
        for tag in ClassTag::ALL {
            assert_eq!(descriptor(*tag).tag, *tag);
        }
    }

    #[test]
    fn device_has_dual_role_and_device_role_handling_note() {
        let d = descriptor(ClassTag::Device);
        assert!(d.field("role").is_some());
        assert_eq!(d.api_path, "dcim/devices");
    }

    /// Only Device/VM/Interface/VMInterface/VirtualDisk/IPAddress/
    /// MACAddress/InventoryItem/PowerPort are eligible for orphan-tag prune;
    /// every organisational/topology class is left alone even once orphaned.
    #[test]
    fn only_instance_level_classes_are_prunable() {
        let prunable: Vec<ClassTag> = ClassTag::ALL.iter().copied().filter(|t| descriptor(*t).prune).collect();
        assert_eq!(
            prunable,
            vec![
                ClassTag::Device,
                ClassTag::Vm,
                ClassTag::Interface,
                ClassTag::VmInterface,
                ClassTag::VirtualDisk,
                ClassTag::IpAddress,
                ClassTag::MacAddress,
                ClassTag::InventoryItem,
                ClassTag::PowerPort,
            ]
        );
    }

    #[test]
    fn read_only_classes_match_grounding_source() {
        for tag in [ClassTag::SiteGroup, ClassTag::Vrf, ClassTag::Prefix, ClassTag::VlanGroup, ClassTag::FhrpGroupItem] {
            assert!(descriptor(tag).read_only, "{tag:?} should be read_only");
        }
        assert!(!descriptor(ClassTag::Site).read_only);
    }
}
