//! Element tree produced by the template parser.

use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
/// Position in template source, both 1-based.
pub struct Location {
    /// Line number.
    pub line: usize,
    /// Column number, counted in characters.
    pub column: usize,
}

impl Location {
    /// Construct a location.
    #[must_use]
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Collections a `LOOP` can iterate.
pub enum ListName {
    /// Every driver of the run.
    Driver,
    /// Deliveries of the current driver.
    Consumer,
    /// Pickups of the current driver.
    ThisDriverRestaurant,
    /// Deliveries of the current driver sourced from the current pickup.
    ThisDriverRestaurantPickup,
    /// Restaurants visited by more than one driver.
    SplitRestaurant,
    /// Drivers visiting the current split restaurant.
    SplitRestaurantDriver,
    /// Pickups of the current driver at split restaurants.
    ThisDriverSplitsRestaurant,
    /// Alternate meal types.
    AlternateMeals,
    /// Alternate grocery types.
    AlternateGroceries,
    /// Pickup managers.
    PickupManager,
    /// Backup drivers.
    BackupDriver,
    /// Pickups and deliveries of the current driver in row order.
    Itinerary,
}

impl ListName {
    /// Resolve a list reference as written inside `&{...}`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let list = match name {
            "Driver" => ListName::Driver,
            "Consumer" | "Driver.Consumer" => ListName::Consumer,
            "ThisDriverRestaurant" => ListName::ThisDriverRestaurant,
            "ThisDriverRestaurant.Pickup" => ListName::ThisDriverRestaurantPickup,
            "SplitRestaurant" => ListName::SplitRestaurant,
            "SplitRestaurant.Driver" => ListName::SplitRestaurantDriver,
            "ThisDriverSplitsRestaurant" => ListName::ThisDriverSplitsRestaurant,
            "AlternateMeals" => ListName::AlternateMeals,
            "AlternateGroceries" => ListName::AlternateGroceries,
            "PickupManager" => ListName::PickupManager,
            "BackupDriver" => ListName::BackupDriver,
            "Itinerary" => ListName::Itinerary,
            _ => return None,
        };
        Some(list)
    }

    /// Canonical spelling of the list.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ListName::Driver => "Driver",
            ListName::Consumer => "Consumer",
            ListName::ThisDriverRestaurant => "ThisDriverRestaurant",
            ListName::ThisDriverRestaurantPickup => "ThisDriverRestaurant.Pickup",
            ListName::SplitRestaurant => "SplitRestaurant",
            ListName::SplitRestaurantDriver => "SplitRestaurant.Driver",
            ListName::ThisDriverSplitsRestaurant => "ThisDriverSplitsRestaurant",
            ListName::AlternateMeals => "AlternateMeals",
            ListName::AlternateGroceries => "AlternateGroceries",
            ListName::PickupManager => "PickupManager",
            ListName::BackupDriver => "BackupDriver",
            ListName::Itinerary => "Itinerary",
        }
    }
}

impl fmt::Display for ListName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One node of a parsed template.
pub enum Element {
    /// Text copied to the output.
    Literal(String),
    /// Value reference, `${Name}` or `&{List.Field}`.
    Variable {
        /// Reference name, trimmed.
        name: String,
        /// Where the reference starts.
        location: Location,
    },
    /// `LOOP &{List} { ... }`.
    Loop {
        /// Collection iterated.
        list: ListName,
        /// Body rendered once per item.
        body: Vec<Element>,
        /// Where the `LOOP` keyword starts.
        location: Location,
    },
    /// `IF [NOT] &{Flag} THEN { ... }`.
    Conditional {
        /// Boolean reference name.
        reference: String,
        /// Whether the test is inverted.
        negated: bool,
        /// Body rendered when the test holds.
        body: Vec<Element>,
        /// Where the `IF` keyword starts.
        location: Location,
    },
    /// `CONTINUE`: skip the rest of the current loop iteration.
    Continue {
        /// Where the keyword starts.
        location: Location,
    },
}
