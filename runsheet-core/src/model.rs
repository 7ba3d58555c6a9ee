//! Domain data structures for a delivery run: restaurants, drivers, deliveries.

use std::collections::HashMap;
use std::ops::AddAssign;

use chrono::NaiveTime;
use serde::Serialize;

use crate::control::ControlBlock;
use crate::schema::SchemaVersion;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Catalog facts about a restaurant, shared by the global and per-pickup views.
pub struct RestaurantInfo {
    /// Street address used for routing.
    pub address: String,
    /// Free-text pickup instructions.
    pub details: String,
    /// Time the restaurant stops handing out orders.
    pub closing_time: Option<NaiveTime>,
    /// Time orders are ready for pickup.
    pub start_time: Option<NaiveTime>,
    /// Route label used to estimate hops between restaurants.
    pub route: String,
    /// Emoji printed next to the restaurant in announcements.
    pub emoji: String,
    /// Whether the restaurant asks drivers not to take photos.
    pub no_pics: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
/// Generation 2 quantities on a delivery row.
pub struct RationCounts {
    /// Standard rations.
    pub normal: u32,
    /// Vegetarian rations.
    pub veggie: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Generation 3 quantities on a delivery row.
pub struct MixedCounts {
    /// Standard meals.
    pub std_meals: u32,
    /// Alternate meals.
    pub alt_meals: u32,
    /// Alternate meal type, empty when there are none.
    pub alt_meal_type: String,
    /// Standard grocery bags.
    pub std_groceries: u32,
    /// Alternate grocery bags.
    pub alt_groceries: u32,
    /// Alternate grocery type, empty when there are none.
    pub alt_grocery_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Quantities carried by one delivery, shaped by the schema generation.
pub enum DeliveryQuantities {
    /// Single ration category.
    Gen2(RationCounts),
    /// Meal and grocery categories with alternates.
    Gen3(MixedCounts),
}

impl DeliveryQuantities {
    /// True when the delivery carries nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            DeliveryQuantities::Gen2(counts) => counts.normal == 0 && counts.veggie == 0,
            DeliveryQuantities::Gen3(counts) => {
                counts.std_meals == 0
                    && counts.alt_meals == 0
                    && counts.std_groceries == 0
                    && counts.alt_groceries == 0
            }
        }
    }

    /// Category totals for this delivery, used when folding into pickup totals.
    #[must_use]
    pub fn totals(&self) -> PickupQuantities {
        match self {
            DeliveryQuantities::Gen2(counts) => PickupQuantities::Gen2(OrderCounts {
                orders: u32::from(!self.is_empty()),
                normal: Some(counts.normal),
                veggie: Some(counts.veggie),
            }),
            DeliveryQuantities::Gen3(counts) => PickupQuantities::Gen3(MixedTotals {
                std_meals: counts.std_meals,
                alt_meals: counts.alt_meals,
                std_groceries: counts.std_groceries,
                alt_groceries: counts.alt_groceries,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
/// Generation 2 quantities declared on a pickup row.
pub struct OrderCounts {
    /// Number of orders the driver collects.
    pub orders: u32,
    /// Declared standard rations, when the column is filled in.
    pub normal: Option<u32>,
    /// Declared vegetarian rations, when the column is filled in.
    pub veggie: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
/// Generation 3 category totals at a pickup.
pub struct MixedTotals {
    /// Standard meals.
    pub std_meals: u32,
    /// Alternate meals.
    pub alt_meals: u32,
    /// Standard grocery bags.
    pub std_groceries: u32,
    /// Alternate grocery bags.
    pub alt_groceries: u32,
}

impl MixedTotals {
    /// True when every category is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.std_meals == 0 && self.alt_meals == 0 && self.std_groceries == 0 && self.alt_groceries == 0
    }
}

impl AddAssign for MixedTotals {
    fn add_assign(&mut self, other: Self) {
        self.std_meals += other.std_meals;
        self.alt_meals += other.alt_meals;
        self.std_groceries += other.std_groceries;
        self.alt_groceries += other.alt_groceries;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
/// Quantities declared on a pickup row, shaped by the schema generation.
pub enum PickupQuantities {
    /// Order and ration counts.
    Gen2(OrderCounts),
    /// Meal and grocery totals.
    Gen3(MixedTotals),
}

impl PickupQuantities {
    /// Empty totals for the given generation.
    #[must_use]
    pub fn zero(version: SchemaVersion) -> Self {
        match version {
            SchemaVersion::Gen2 => PickupQuantities::Gen2(OrderCounts::default()),
            SchemaVersion::Gen3 => PickupQuantities::Gen3(MixedTotals::default()),
        }
    }

    /// True when the pickup declares no orders.
    #[must_use]
    pub fn has_no_orders(&self) -> bool {
        match self {
            PickupQuantities::Gen2(counts) => counts.orders == 0,
            PickupQuantities::Gen3(totals) => totals.is_empty(),
        }
    }

    /// Fold another set of quantities into this one. Mismatched generations are ignored.
    pub fn accumulate(&mut self, other: &PickupQuantities) {
        match (self, other) {
            (PickupQuantities::Gen2(mine), PickupQuantities::Gen2(theirs)) => {
                mine.orders += theirs.orders;
                mine.normal = sum_declared(mine.normal, theirs.normal);
                mine.veggie = sum_declared(mine.veggie, theirs.veggie);
            }
            (PickupQuantities::Gen3(mine), PickupQuantities::Gen3(theirs)) => *mine += *theirs,
            _ => {}
        }
    }
}

fn sum_declared(mine: Option<u32>, theirs: Option<u32>) -> Option<u32> {
    match (mine, theirs) {
        (None, None) => None,
        (mine, theirs) => Some(mine.unwrap_or(0) + theirs.unwrap_or(0)),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// One driver's stop at a restaurant, as it appears in their block.
pub struct Pickup {
    /// Restaurant name, the registry key.
    pub name: String,
    /// Source line of the pickup row.
    pub line: usize,
    /// Catalog facts copied in when the run is parsed.
    pub info: RestaurantInfo,
    /// Quantities this driver collects here.
    pub quantities: PickupQuantities,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// A restaurant across the whole run, folded from every pickup referencing it.
pub struct Restaurant {
    /// Restaurant name.
    pub name: String,
    /// Catalog facts.
    pub info: RestaurantInfo,
    /// Source line of the first pickup row naming it.
    pub line: usize,
    /// Usernames of visiting drivers, in order of first visit.
    pub drivers: Vec<String>,
    /// Quantities summed over all pickups.
    pub totals: PickupQuantities,
    /// Alternate meal types, set when this is the declared meal source.
    pub alt_meal_types: Vec<String>,
    /// Alternate grocery types, set when this is the declared grocery source.
    pub alt_grocery_types: Vec<String>,
}

impl Restaurant {
    /// More than one driver stops here.
    #[must_use]
    pub fn is_split(&self) -> bool {
        self.drivers.len() > 1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
/// Name-keyed arena of global restaurants preserving first-appearance order.
pub struct RestaurantRegistry {
    restaurants: Vec<Restaurant>,
    index: HashMap<String, usize>,
}

impl RestaurantRegistry {
    /// Look up a restaurant by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Restaurant> {
        self.index
            .get(name)
            .and_then(|position| self.restaurants.get(*position))
    }

    /// Iterate restaurants in order of first appearance.
    pub fn iter(&self) -> impl Iterator<Item = &Restaurant> {
        self.restaurants.iter()
    }

    /// Restaurants visited by more than one driver.
    pub fn split(&self) -> impl Iterator<Item = &Restaurant> {
        self.restaurants.iter().filter(|restaurant| restaurant.is_split())
    }

    /// Number of distinct restaurants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.restaurants.len()
    }

    /// True when no restaurant was seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.restaurants.is_empty()
    }

    /// Fold one driver's pickup into the global restaurant it refers to.
    pub fn merge_pickup(&mut self, driver: &str, pickup: &Pickup) {
        let position = if let Some(position) = self.index.get(&pickup.name) {
            *position
        } else {
            let position = self.restaurants.len();
            self.restaurants.push(Restaurant {
                name: pickup.name.clone(),
                info: pickup.info.clone(),
                line: pickup.line,
                drivers: Vec::new(),
                totals: match pickup.quantities {
                    PickupQuantities::Gen2(_) => PickupQuantities::zero(SchemaVersion::Gen2),
                    PickupQuantities::Gen3(_) => PickupQuantities::zero(SchemaVersion::Gen3),
                },
                alt_meal_types: Vec::new(),
                alt_grocery_types: Vec::new(),
            });
            self.index.insert(pickup.name.clone(), position);
            position
        };

        if let Some(restaurant) = self.restaurants.get_mut(position) {
            if !restaurant.drivers.iter().any(|known| known == driver) {
                restaurant.drivers.push(driver.to_owned());
            }
            restaurant.totals.accumulate(&pickup.quantities);
        }
    }

    /// Mutable access for post-merge enrichment such as food source types.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Restaurant> {
        let position = *self.index.get(name)?;
        self.restaurants.get_mut(position)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// A consumer drop-off on a driver's itinerary.
pub struct Delivery {
    /// Consumer display name.
    pub name: String,
    /// Consumer forum username.
    pub username: String,
    /// Primary phone.
    pub phone: String,
    /// Alternate phone, possibly empty.
    pub alt_phone: String,
    /// Neighborhood label.
    pub neighborhood: String,
    /// City.
    pub city: String,
    /// Street address.
    pub address: String,
    /// Whether the consumer lives in a condo or apartment complex.
    pub condo: bool,
    /// Free-text delivery instructions.
    pub details: String,
    /// Name of the restaurant the delivery is sourced from.
    pub restaurant: String,
    /// Source line of the delivery row.
    pub line: usize,
    /// Quantities to hand over.
    pub quantities: DeliveryQuantities,
}

impl Delivery {
    /// Street address and city joined for geocoding and display.
    #[must_use]
    pub fn full_address(&self) -> String {
        join_address(&self.address, &self.city)
    }
}

/// Join a street address and city, skipping whichever is empty.
#[must_use]
pub fn join_address(address: &str, city: &str) -> String {
    match (address.is_empty(), city.is_empty()) {
        (false, false) => format!("{address}, {city}"),
        (false, true) => address.to_owned(),
        (true, _) => city.to_owned(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
/// Entry in a driver's raw itinerary, pointing into their pickups or deliveries.
pub enum ItineraryStop {
    /// Index into [`Driver::pickups`].
    Pickup(usize),
    /// Index into [`Driver::deliveries`].
    Delivery(usize),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
/// Line numbers delimiting a driver block in the source grid.
pub struct BlockLines {
    /// Opening driver header row.
    pub header: usize,
    /// Closing driver header row.
    pub closing: usize,
    /// Navigation URL row.
    pub navigation: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// A volunteer driver with their pickups and deliveries.
pub struct Driver {
    /// Forum username.
    pub username: String,
    /// Display name.
    pub name: String,
    /// Primary phone.
    pub phone: String,
    /// Alternate phone, possibly empty.
    pub alt_phone: String,
    /// Home street address.
    pub address: String,
    /// Home city.
    pub city: String,
    /// Source lines of the driver block.
    pub block: BlockLines,
    /// Start time taken from the control block.
    pub declared_start: Option<NaiveTime>,
    /// Effective start time after derivation.
    pub start_time: Option<NaiveTime>,
    /// Restaurant stops in file order.
    pub pickups: Vec<Pickup>,
    /// Deliveries in file order.
    pub deliveries: Vec<Delivery>,
    /// Pickups and deliveries interleaved in row order.
    pub itinerary: Vec<ItineraryStop>,
    /// Navigation URL from the block's trailing row.
    pub navigation_url: String,
    /// Advisories raised while validating this driver.
    pub warnings: Vec<String>,
}

impl Driver {
    /// Home address and city joined.
    #[must_use]
    pub fn home_address(&self) -> String {
        join_address(&self.address, &self.city)
    }

    /// True when any delivery goes to a condo.
    #[must_use]
    pub fn has_condo(&self) -> bool {
        self.deliveries.iter().any(|delivery| delivery.condo)
    }

    /// Find this driver's pickup at the named restaurant.
    #[must_use]
    pub fn pickup(&self, restaurant: &str) -> Option<&Pickup> {
        self.pickups.iter().find(|pickup| pickup.name == restaurant)
    }

    /// Deliveries sourced from the named restaurant, in file order.
    pub fn deliveries_from<'a>(&'a self, restaurant: &'a str) -> impl Iterator<Item = &'a Delivery> {
        self.deliveries
            .iter()
            .filter(move |delivery| delivery.restaurant == restaurant)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Validated model of one run file.
pub struct DeliveryRun {
    /// Configuration directives.
    pub control: ControlBlock,
    /// Drivers in file order.
    pub drivers: Vec<Driver>,
    /// Global restaurants.
    pub restaurants: RestaurantRegistry,
    /// Run-wide advisories, including every driver warning.
    pub warnings: Vec<String>,
}

impl DeliveryRun {
    /// Schema generation declared by the control block.
    #[must_use]
    pub fn version(&self) -> SchemaVersion {
        self.control.version
    }

    /// Look up a driver by username.
    #[must_use]
    pub fn driver(&self, username: &str) -> Option<&Driver> {
        self.drivers.iter().find(|driver| driver.username == username)
    }
}
