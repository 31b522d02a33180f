//! The contract every concrete source adapter implements (spec §4.5).

use nb_inventory::{ClassTag, Inventory};

use crate::settings::SourceSettings;

/// A single data-collection source (a hypervisor cluster, a JSON inventory
/// dump, …). The framework drives `apply()` once per run, in the order
/// adapters were instantiated (spec §5: "Sources execute sequentially").
pub trait SourceAdapter {
    /// Constant identifying this adapter's kind, e.g. `"vmware"`.
    fn source_type(&self) -> &'static str;

    /// Whether this adapter can handle `type_string` from config.
    fn implements(type_string: &str) -> bool
    where
        Self: Sized;

    /// The configured instance name, used to build `source_tag()`.
    fn name(&self) -> &str;

    /// This adapter's parsed settings bundle.
    fn settings(&self) -> &SourceSettings;

    /// `"Source: <name>"` — stamped onto every object this adapter touches
    /// (spec §4.4 "Tag lifecycle").
    fn source_tag(&self) -> String {
        format!("Source: {}", self.name())
    }

    /// False if this adapter failed to initialise (spec §7 "Source-init
    /// failure"); such an adapter is skipped entirely, other sources
    /// continue.
    fn init_successful(&self) -> bool;

    /// Entity classes this adapter writes to, used to decide which classes
    /// the engine must pre-load before running it.
    fn dependent_netbox_objects(&self) -> &'static [ClassTag];

    /// Populate `inventory` with this adapter's full current-side state.
    /// Anything this adapter omits becomes a candidate for orphan/prune
    /// (spec §6 "Source-adapter contract").
    fn apply(&mut self, inventory: &mut Inventory);
}
