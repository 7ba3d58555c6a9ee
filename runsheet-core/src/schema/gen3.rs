//! Generation 3: standard and alternate meals and groceries.

use crate::control::{ControlBlock, Directive};
use crate::ingest::grid::{Row, column};
use crate::model::{
    Delivery, DeliveryQuantities, Driver, MixedCounts, MixedTotals, Pickup, PickupQuantities,
};
use crate::schema::SchemaOps;
use crate::template::scope::Scope;

pub(crate) static OPS: SchemaOps = SchemaOps {
    quantity_columns: &[
        column::STD_MEALS,
        column::ALT_MEALS,
        column::TYPE_MEAL,
        column::STD_GROCERY,
        column::ALT_GROCERY,
        column::TYPE_GROCERY,
    ],
    required_directives: &[
        Directive::Version,
        Directive::OpsManager,
        Directive::StartTimes,
        Directive::FoodSources,
        Directive::AltMealOptions,
        Directive::AltGroceryOptions,
        Directive::PickupManager,
        Directive::MessageFormat,
    ],
    unsupported_directives: &[],
    pickup_quantities,
    delivery_quantities,
    audit_pickup,
    audit_delivery,
    derive_start_time,
    resolve_value,
    resolve_flag,
};

fn counts(row: &Row<'_>, problems: &mut Vec<String>) -> MixedTotals {
    let mut count = |name: &str| {
        row.count(name).unwrap_or_else(|message| {
            problems.push(message);
            0
        })
    };
    MixedTotals {
        std_meals: count(column::STD_MEALS),
        alt_meals: count(column::ALT_MEALS),
        std_groceries: count(column::STD_GROCERY),
        alt_groceries: count(column::ALT_GROCERY),
    }
}

fn pickup_quantities(row: &Row<'_>) -> Result<PickupQuantities, Vec<String>> {
    let mut problems = Vec::new();
    let totals = counts(row, &mut problems);
    if problems.is_empty() {
        Ok(PickupQuantities::Gen3(totals))
    } else {
        Err(problems)
    }
}

fn delivery_quantities(row: &Row<'_>) -> Result<DeliveryQuantities, Vec<String>> {
    let mut problems = Vec::new();
    let totals = counts(row, &mut problems);
    let alt_meal_type = row.get(column::TYPE_MEAL).to_owned();
    let alt_grocery_type = row.get(column::TYPE_GROCERY).to_owned();
    if totals.alt_meals > 0 && alt_meal_type.is_empty() {
        problems.push(format!("missing {} for alternate meals", column::TYPE_MEAL));
    }
    if totals.alt_groceries > 0 && alt_grocery_type.is_empty() {
        problems.push(format!("missing {} for alternate groceries", column::TYPE_GROCERY));
    }

    if !problems.is_empty() {
        return Err(problems);
    }
    Ok(DeliveryQuantities::Gen3(MixedCounts {
        std_meals: totals.std_meals,
        alt_meals: totals.alt_meals,
        alt_meal_type,
        std_groceries: totals.std_groceries,
        alt_groceries: totals.alt_groceries,
        alt_grocery_type,
    }))
}

fn mixed(delivery: &Delivery) -> Option<&MixedCounts> {
    match &delivery.quantities {
        DeliveryQuantities::Gen3(counts) => Some(counts),
        DeliveryQuantities::Gen2(_) => None,
    }
}

fn audit_pickup(driver: &Driver, pickup: &Pickup, errors: &mut Vec<String>) {
    let PickupQuantities::Gen3(declared) = pickup.quantities else {
        return;
    };
    let mut found = MixedTotals::default();
    let mut matching = 0_usize;
    for delivery in driver.deliveries_from(&pickup.name) {
        matching += 1;
        if let PickupQuantities::Gen3(totals) = delivery.quantities.totals() {
            found += totals;
        }
    }

    if declared.is_empty() && matching > 0 {
        errors.push(format!(
            "line {}: '{}' has no orders for driver {} but {matching} deliver(ies) reference it",
            pickup.line, pickup.name, driver.username
        ));
        return;
    }

    let checks = [
        ("std meals", declared.std_meals, found.std_meals),
        ("alt meals", declared.alt_meals, found.alt_meals),
        ("std grocery", declared.std_groceries, found.std_groceries),
        ("alt grocery", declared.alt_groceries, found.alt_groceries),
    ];
    for (label, expected, actual) in checks {
        if expected != actual {
            errors.push(format!(
                "line {}: {label} mismatch at '{}' for driver {}: {expected} declared, {actual} found",
                pickup.line, pickup.name, driver.username
            ));
        }
    }
}

fn audit_delivery(control: &ControlBlock, delivery: &Delivery, errors: &mut Vec<String>) {
    let Some(counts) = mixed(delivery) else {
        return;
    };
    let checks = [
        (
            "meal",
            counts.alt_meals,
            &counts.alt_meal_type,
            &control.alt_meal_options,
            Directive::AltMealOptions,
        ),
        (
            "grocery",
            counts.alt_groceries,
            &counts.alt_grocery_type,
            &control.alt_grocery_options,
            Directive::AltGroceryOptions,
        ),
    ];
    for (kind, count, kind_type, options, directive) in checks {
        if count > 0 && !options.iter().any(|option| option == kind_type) {
            errors.push(format!(
                "line {}: alternate {kind} type '{kind_type}' for {} is not listed in {directive} ({})",
                delivery.line,
                delivery.name,
                options.join(", ")
            ));
        }
    }
}

fn derive_start_time(driver: &mut Driver) {
    driver.start_time = driver.declared_start;
}

/// Deliveries in reach: the current driver's, or the whole run's.
fn deliveries_in_scope<'a>(scope: &Scope<'a>) -> Vec<&'a Delivery> {
    match scope.driver() {
        Some(driver) => driver.deliveries.iter().collect(),
        None => scope
            .run()
            .drivers
            .iter()
            .flat_map(|driver| driver.deliveries.iter())
            .collect(),
    }
}

fn totals_in_scope(scope: &Scope<'_>) -> MixedTotals {
    let mut totals = MixedTotals::default();
    for delivery in deliveries_in_scope(scope) {
        if let PickupQuantities::Gen3(found) = delivery.quantities.totals() {
            totals += found;
        }
    }
    totals
}

fn alternate_total(scope: &Scope<'_>, pick: fn(&MixedCounts) -> (&str, u32), wanted: &str) -> u32 {
    deliveries_in_scope(scope)
        .into_iter()
        .filter_map(mixed)
        .map(pick)
        .filter(|(kind, _)| *kind == wanted)
        .map(|(_, count)| count)
        .sum()
}

fn alt_meals(counts: &MixedCounts) -> (&str, u32) {
    (&counts.alt_meal_type, counts.alt_meals)
}

fn alt_groceries(counts: &MixedCounts) -> (&str, u32) {
    (&counts.alt_grocery_type, counts.alt_groceries)
}

fn pickup_totals(pickup: &Pickup) -> Option<MixedTotals> {
    match pickup.quantities {
        PickupQuantities::Gen3(totals) => Some(totals),
        PickupQuantities::Gen2(_) => None,
    }
}

fn resolve_value(scope: &Scope<'_>, name: &str) -> Option<String> {
    let value = match name {
        "Consumer.StdMeals" => mixed(scope.delivery()?)?.std_meals.to_string(),
        "Consumer.AltMeals" => mixed(scope.delivery()?)?.alt_meals.to_string(),
        "Consumer.TypeMeal" => mixed(scope.delivery()?)?.alt_meal_type.clone(),
        "Consumer.StdGrocery" => mixed(scope.delivery()?)?.std_groceries.to_string(),
        "Consumer.AltGrocery" => mixed(scope.delivery()?)?.alt_groceries.to_string(),
        "Consumer.TypeGrocery" => mixed(scope.delivery()?)?.alt_grocery_type.clone(),
        "ThisDriverRestaurant.StdMeals" => pickup_totals(scope.pickup()?)?.std_meals.to_string(),
        "ThisDriverRestaurant.AltMeals" => pickup_totals(scope.pickup()?)?.alt_meals.to_string(),
        "ThisDriverRestaurant.StdGrocery" => pickup_totals(scope.pickup()?)?.std_groceries.to_string(),
        "ThisDriverRestaurant.AltGrocery" => pickup_totals(scope.pickup()?)?.alt_groceries.to_string(),
        "AlternateMeals.Name" => scope.alternate_meal()?.to_owned(),
        "AlternateMeals.Total" => {
            alternate_total(scope, alt_meals, scope.alternate_meal()?).to_string()
        }
        "AlternateGroceries.Name" => scope.alternate_grocery()?.to_owned(),
        "AlternateGroceries.Total" => {
            alternate_total(scope, alt_groceries, scope.alternate_grocery()?).to_string()
        }
        "Driver.TotalStdMeals" => totals_for_driver(scope)?.std_meals.to_string(),
        "Driver.TotalAltMeals" => totals_for_driver(scope)?.alt_meals.to_string(),
        "Driver.TotalStdGrocery" => totals_for_driver(scope)?.std_groceries.to_string(),
        "Driver.TotalAltGrocery" => totals_for_driver(scope)?.alt_groceries.to_string(),
        _ => return None,
    };
    Some(value)
}

fn totals_for_driver(scope: &Scope<'_>) -> Option<MixedTotals> {
    scope.driver()?;
    Some(totals_in_scope(scope))
}

fn resolve_flag(scope: &Scope<'_>, name: &str) -> Option<bool> {
    let flag = match name {
        "Consumer.IsStdMeal" => mixed(scope.delivery()?)?.std_meals > 0,
        "Consumer.IsAltMeal" => mixed(scope.delivery()?)?.alt_meals > 0,
        "Consumer.IsStdGrocery" => mixed(scope.delivery()?)?.std_groceries > 0,
        "Consumer.IsAltGrocery" => mixed(scope.delivery()?)?.alt_groceries > 0,
        "Driver.IsMealsOnly" => {
            let totals = totals_in_scope(scope);
            totals.std_groceries == 0 && totals.alt_groceries == 0
        }
        "Driver.IsGroceriesOnly" => {
            let totals = totals_in_scope(scope);
            totals.std_meals == 0 && totals.alt_meals == 0
        }
        "ThisDriverRestaurant.IsMealSource" => {
            let sources = scope.run().control.food_sources.as_ref()?;
            scope.pickup()?.name == sources.meals
        }
        "ThisDriverRestaurant.IsGrocerySource" => {
            let sources = scope.run().control.food_sources.as_ref()?;
            scope.pickup()?.name == sources.groceries
        }
        _ => return None,
    };
    Some(flag)
}
