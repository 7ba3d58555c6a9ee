//! Cross-row audits run once every driver block has been read.

use crate::catalog::RestaurantCatalog;
use crate::control::ControlBlock;
use crate::model::{Driver, RestaurantRegistry};

/// Audit drivers against each other and the control block, and fold pickups
/// into the global restaurant registry.
pub(crate) fn audit_run(
    control: &ControlBlock,
    drivers: &mut [Driver],
    catalog: Option<&RestaurantCatalog>,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) -> RestaurantRegistry {
    let ops = control.version.ops();
    for driver in drivers.iter() {
        audit_deliveries(driver, errors);
        for delivery in &driver.deliveries {
            (ops.audit_delivery)(control, delivery, errors);
        }
        for pickup in &driver.pickups {
            (ops.audit_pickup)(driver, pickup, errors);
        }
    }

    let mut registry = RestaurantRegistry::default();
    for driver in drivers.iter() {
        for pickup in &driver.pickups {
            registry.merge_pickup(&driver.username, pickup);
        }
    }

    audit_food_sources(control, &mut registry, catalog, errors);
    audit_split_restaurants(control, &registry, errors);
    assign_start_times(control, drivers, errors, warnings);
    audit_backup_drivers(control, drivers, warnings);
    registry
}

fn audit_deliveries(driver: &Driver, errors: &mut Vec<String>) {
    for delivery in &driver.deliveries {
        match driver.pickup(&delivery.restaurant) {
            None => errors.push(format!(
                "line {}: delivery to {} is sourced from '{}', which is not a pickup for driver {}",
                delivery.line, delivery.name, delivery.restaurant, driver.username
            )),
            Some(pickup) if delivery.line <= pickup.line => errors.push(format!(
                "line {}: delivery to {} comes before its pickup at '{}' (line {})",
                delivery.line, delivery.name, pickup.name, pickup.line
            )),
            Some(_) => {}
        }
    }
}

fn audit_food_sources(
    control: &ControlBlock,
    registry: &mut RestaurantRegistry,
    catalog: Option<&RestaurantCatalog>,
    errors: &mut Vec<String>,
) {
    let Some(sources) = &control.food_sources else {
        return;
    };
    if let Some(catalog) = catalog {
        for (kind, name) in [("meal", &sources.meals), ("grocery", &sources.groceries)] {
            if !catalog.contains(name) {
                errors.push(format!(
                    "{kind} source '{name}' is not in the restaurant catalog"
                ));
            }
        }
    }
    if let Some(restaurant) = registry.get_mut(&sources.meals) {
        restaurant.alt_meal_types.clone_from(&control.alt_meal_options);
    }
    if let Some(restaurant) = registry.get_mut(&sources.groceries) {
        restaurant
            .alt_grocery_types
            .clone_from(&control.alt_grocery_options);
    }
}

fn audit_split_restaurants(
    control: &ControlBlock,
    registry: &RestaurantRegistry,
    errors: &mut Vec<String>,
) {
    for restaurant in registry.split() {
        let visitors = restaurant.drivers.join(", ");
        match control.cleanup_driver(&restaurant.name) {
            None => errors.push(format!(
                "missing split restaurant directive for '{}' (visited by {visitors})",
                restaurant.name
            )),
            Some(cleanup) if !restaurant.drivers.iter().any(|driver| driver == cleanup) => {
                errors.push(format!(
                    "wrong cleanup driver {cleanup} for split restaurant '{}' (visited by {visitors})",
                    restaurant.name
                ));
            }
            Some(_) => {}
        }
    }

    for split in &control.split_restaurants {
        match registry.get(&split.name) {
            None => errors.push(format!(
                "line {}: split restaurant '{}' is not a pickup for any driver",
                split.line, split.name
            )),
            Some(restaurant) if !restaurant.is_split() => errors.push(format!(
                "line {}: split restaurant '{}' is only visited by {}",
                split.line,
                split.name,
                restaurant.drivers.join(", ")
            )),
            Some(_) => {}
        }
    }
}

fn assign_start_times(
    control: &ControlBlock,
    drivers: &mut [Driver],
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    let declared = control.start_times.len();
    if drivers.len() > declared {
        errors.push(format!(
            "{} drivers but only {declared} start time(s) declared",
            drivers.len()
        ));
    } else if drivers.len() < declared {
        warnings.push(format!(
            "{declared} start times declared for {} driver(s)",
            drivers.len()
        ));
    }

    for (driver, start) in drivers.iter_mut().zip(&control.start_times) {
        driver.declared_start = Some(*start);
        driver.start_time = Some(*start);
    }
}

fn audit_backup_drivers(control: &ControlBlock, drivers: &[Driver], warnings: &mut Vec<String>) {
    for backup in &control.backup_drivers {
        if drivers.iter().any(|driver| &driver.username == backup) {
            warnings.push(format!(
                "backup driver {backup} is also scheduled as a driver"
            ));
        }
    }
}
