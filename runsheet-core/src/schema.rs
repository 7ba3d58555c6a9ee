//! Schema generations and the function tables that specialise the shared pipeline.

use std::fmt;

use serde::Serialize;

use crate::control::{ControlBlock, Directive};
use crate::ingest::grid::Row;
use crate::model::{Delivery, DeliveryQuantities, Driver, Pickup, PickupQuantities};
use crate::template::scope::Scope;

/// Single ration category schema.
pub mod gen2;
/// Meal and grocery schema with alternate types.
pub mod gen3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
/// Row schema declared by a run file's `Version` directive.
pub enum SchemaVersion {
    /// `2-0-0`: normal / veggie rations.
    Gen2,
    /// `3-0-0`: standard and alternate meals and groceries.
    Gen3,
}

impl SchemaVersion {
    /// Resolve a version tag such as `2-0-0`.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim() {
            "2-0-0" => Some(SchemaVersion::Gen2),
            "3-0-0" => Some(SchemaVersion::Gen3),
            _ => None,
        }
    }

    /// Version tag as written in the control block.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            SchemaVersion::Gen2 => "2-0-0",
            SchemaVersion::Gen3 => "3-0-0",
        }
    }

    /// Function table for this generation.
    #[must_use]
    pub fn ops(self) -> &'static SchemaOps {
        match self {
            SchemaVersion::Gen2 => &gen2::OPS,
            SchemaVersion::Gen3 => &gen3::OPS,
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.tag())
    }
}

/// Generation-specific behaviour consulted by ingestion and templating.
pub struct SchemaOps {
    /// Header columns carrying quantities.
    pub quantity_columns: &'static [&'static str],
    /// Directives that must be present.
    pub required_directives: &'static [Directive],
    /// Directives accepted with a warning and otherwise ignored.
    pub unsupported_directives: &'static [Directive],
    /// Read the quantities of a pickup row.
    pub pickup_quantities: fn(&Row<'_>) -> Result<PickupQuantities, Vec<String>>,
    /// Read the quantities of a delivery row.
    pub delivery_quantities: fn(&Row<'_>) -> Result<DeliveryQuantities, Vec<String>>,
    /// Check a pickup's declared quantities against the deliveries it feeds.
    pub audit_pickup: fn(&Driver, &Pickup, &mut Vec<String>),
    /// Check a delivery against control block option lists.
    pub audit_delivery: fn(&ControlBlock, &Delivery, &mut Vec<String>),
    /// Compute the effective start time, pushing advisories onto the driver.
    pub derive_start_time: fn(&mut Driver),
    /// Resolve generation-specific value references.
    pub resolve_value: fn(&Scope<'_>, &str) -> Option<String>,
    /// Resolve generation-specific boolean references.
    pub resolve_flag: fn(&Scope<'_>, &str) -> Option<bool>,
}
