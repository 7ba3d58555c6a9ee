//! Chain of rendering scopes, innermost first.

use crate::model::{Delivery, DeliveryRun, Driver, ItineraryStop, Pickup, Restaurant};

#[derive(Debug, Clone, Copy, PartialEq)]
/// Model element bound by one scope.
pub enum Binding<'a> {
    /// The run itself; only the base scope carries it.
    Run,
    /// A driver.
    Driver(&'a Driver),
    /// A delivery.
    Delivery(&'a Delivery),
    /// One of the current driver's pickups.
    Pickup(&'a Pickup),
    /// A restaurant shared by several drivers.
    SplitRestaurant(&'a Restaurant),
    /// An alternate meal type.
    AlternateMeal(&'a str),
    /// An alternate grocery type.
    AlternateGrocery(&'a str),
    /// A pickup manager username.
    PickupManager(&'a str),
    /// A backup driver username.
    BackupDriver(&'a str),
    /// One entry of the current driver's itinerary.
    Stop(ItineraryStop),
}

#[derive(Debug, Clone, Copy)]
/// A named scope with one binding and an optional enclosing scope.
pub struct Scope<'a> {
    name: &'static str,
    run: &'a DeliveryRun,
    binding: Binding<'a>,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    /// Base scope of a run.
    #[must_use]
    pub fn base(run: &'a DeliveryRun) -> Self {
        Self {
            name: "Run",
            run,
            binding: Binding::Run,
            parent: None,
        }
    }

    /// Open a nested scope.
    #[must_use]
    pub fn child<'s>(&'s self, name: &'static str, binding: Binding<'s>) -> Scope<'s> {
        Scope {
            name,
            run: self.run,
            binding,
            parent: Some(self),
        }
    }

    /// Name of this scope.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Binding of this scope alone.
    #[must_use]
    pub fn binding(&self) -> Binding<'a> {
        self.binding
    }

    /// The run being rendered.
    #[must_use]
    pub fn run(&self) -> &'a DeliveryRun {
        self.run
    }

    /// Scope names from the innermost outwards, for diagnostics.
    #[must_use]
    pub fn path(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let mut current = Some(self);
        while let Some(scope) = current {
            names.push(scope.name);
            current = scope.parent;
        }
        names
    }

    fn find<T>(&self, pick: impl Fn(Binding<'a>) -> Option<T>) -> Option<T> {
        let mut current = Some(self);
        while let Some(scope) = current {
            if let Some(found) = pick(scope.binding) {
                return Some(found);
            }
            current = scope.parent;
        }
        None
    }

    /// Innermost driver.
    #[must_use]
    pub fn driver(&self) -> Option<&'a Driver> {
        self.find(|binding| match binding {
            Binding::Driver(driver) => Some(driver),
            _ => None,
        })
    }

    /// Innermost delivery, including one reached through an itinerary stop.
    #[must_use]
    pub fn delivery(&self) -> Option<&'a Delivery> {
        self.find(|binding| match binding {
            Binding::Delivery(delivery) => Some(delivery),
            Binding::Stop(ItineraryStop::Delivery(position)) => {
                self.driver()?.deliveries.get(position)
            }
            _ => None,
        })
    }

    /// Innermost pickup, including one reached through an itinerary stop.
    #[must_use]
    pub fn pickup(&self) -> Option<&'a Pickup> {
        self.find(|binding| match binding {
            Binding::Pickup(pickup) => Some(pickup),
            Binding::Stop(ItineraryStop::Pickup(position)) => self.driver()?.pickups.get(position),
            _ => None,
        })
    }

    /// Innermost split restaurant.
    #[must_use]
    pub fn split_restaurant(&self) -> Option<&'a Restaurant> {
        self.find(|binding| match binding {
            Binding::SplitRestaurant(restaurant) => Some(restaurant),
            _ => None,
        })
    }

    /// Innermost alternate meal type.
    #[must_use]
    pub fn alternate_meal(&self) -> Option<&'a str> {
        self.find(|binding| match binding {
            Binding::AlternateMeal(kind) => Some(kind),
            _ => None,
        })
    }

    /// Innermost alternate grocery type.
    #[must_use]
    pub fn alternate_grocery(&self) -> Option<&'a str> {
        self.find(|binding| match binding {
            Binding::AlternateGrocery(kind) => Some(kind),
            _ => None,
        })
    }

    /// Innermost pickup manager.
    #[must_use]
    pub fn pickup_manager(&self) -> Option<&'a str> {
        self.find(|binding| match binding {
            Binding::PickupManager(username) => Some(username),
            _ => None,
        })
    }

    /// Innermost backup driver.
    #[must_use]
    pub fn backup_driver(&self) -> Option<&'a str> {
        self.find(|binding| match binding {
            Binding::BackupDriver(username) => Some(username),
            _ => None,
        })
    }

    /// Innermost itinerary stop.
    #[must_use]
    pub fn stop(&self) -> Option<ItineraryStop> {
        self.find(|binding| match binding {
            Binding::Stop(stop) => Some(stop),
            _ => None,
        })
    }
}
