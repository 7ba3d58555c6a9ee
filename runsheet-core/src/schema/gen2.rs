//! Generation 2: normal / veggie rations and derived driver start times.

use chrono::{NaiveTime, TimeDelta};

use crate::clock::{format_clock, hm, parse_compact_clock};
use crate::control::{ControlBlock, Directive};
use crate::ingest::grid::{Row, column};
use crate::model::{
    Delivery, DeliveryQuantities, Driver, OrderCounts, Pickup, PickupQuantities, RationCounts,
};
use crate::schema::SchemaOps;
use crate::template::scope::Scope;

const CLOSING_MARGIN_MINUTES: i64 = 10;
const SAME_ROUTE_HOP_MINUTES: i64 = 5;
const ROUTE_CHANGE_HOP_MINUTES: i64 = 10;
const CLOSING_BEFORE_PREFIX: &str = "Driver.IsFirstRestaurantClosingBefore";

pub(crate) static OPS: SchemaOps = SchemaOps {
    quantity_columns: &[column::NORMAL, column::VEGGIE, column::ORDERS],
    required_directives: &[Directive::Version, Directive::OpsManager, Directive::StartTimes],
    unsupported_directives: &[
        Directive::FoodSources,
        Directive::AltMealOptions,
        Directive::AltGroceryOptions,
        Directive::PickupManager,
        Directive::MessageFormat,
    ],
    pickup_quantities,
    delivery_quantities,
    audit_pickup,
    audit_delivery,
    derive_start_time,
    resolve_value,
    resolve_flag,
};

/// Earliest time a derived start may fall on.
fn start_floor() -> NaiveTime {
    hm(17, 0)
}

fn pickup_quantities(row: &Row<'_>) -> Result<PickupQuantities, Vec<String>> {
    let mut problems = Vec::new();
    let orders = row.count(column::ORDERS).unwrap_or_else(|message| {
        problems.push(message);
        0
    });
    let mut declared = |name: &str| {
        row.optional_count(name).unwrap_or_else(|message| {
            problems.push(message);
            None
        })
    };
    let normal = declared(column::NORMAL);
    let veggie = declared(column::VEGGIE);

    if problems.is_empty() {
        Ok(PickupQuantities::Gen2(OrderCounts {
            orders,
            normal,
            veggie,
        }))
    } else {
        Err(problems)
    }
}

fn delivery_quantities(row: &Row<'_>) -> Result<DeliveryQuantities, Vec<String>> {
    match (row.count(column::NORMAL), row.count(column::VEGGIE)) {
        (Ok(normal), Ok(veggie)) => Ok(DeliveryQuantities::Gen2(RationCounts { normal, veggie })),
        (normal, veggie) => Err([normal.err(), veggie.err()].into_iter().flatten().collect()),
    }
}

fn rations(delivery: &Delivery) -> Option<RationCounts> {
    match &delivery.quantities {
        DeliveryQuantities::Gen2(counts) => Some(*counts),
        DeliveryQuantities::Gen3(_) => None,
    }
}

fn audit_pickup(driver: &Driver, pickup: &Pickup, errors: &mut Vec<String>) {
    let PickupQuantities::Gen2(declared) = pickup.quantities else {
        return;
    };
    let matching: Vec<&Delivery> = driver.deliveries_from(&pickup.name).collect();
    let filled: Vec<RationCounts> = matching
        .iter()
        .filter(|delivery| !delivery.quantities.is_empty())
        .filter_map(|delivery| rations(delivery))
        .collect();
    let found = u32::try_from(filled.len()).unwrap_or(u32::MAX);

    if declared.orders != found {
        errors.push(format!(
            "line {}: order count mismatch at '{}' for driver {}: {} declared, {found} found",
            pickup.line, pickup.name, driver.username, declared.orders
        ));
    } else if declared.orders == 0 && !matching.is_empty() {
        errors.push(format!(
            "line {}: '{}' has no orders for driver {} but {} deliver(ies) reference it",
            pickup.line,
            pickup.name,
            driver.username,
            matching.len()
        ));
    }

    let checks = [
        ("normal", declared.normal, filled.iter().map(|counts| counts.normal).sum::<u32>()),
        ("veggie", declared.veggie, filled.iter().map(|counts| counts.veggie).sum::<u32>()),
    ];
    for (label, expected, actual) in checks {
        if let Some(expected) = expected
            && expected != actual
        {
            errors.push(format!(
                "line {}: {label} ration mismatch at '{}' for driver {}: {expected} declared, {actual} found",
                pickup.line, pickup.name, driver.username
            ));
        }
    }
}

fn audit_delivery(_control: &ControlBlock, _delivery: &Delivery, _errors: &mut Vec<String>) {}

fn hop_minutes(from: &Pickup, to: &Pickup) -> i64 {
    if from.info.route == to.info.route {
        SAME_ROUTE_HOP_MINUTES
    } else {
        ROUTE_CHANGE_HOP_MINUTES
    }
}

/// Back-compute a driver's start when their first stop carries no orders.
pub(crate) fn compute_start(pickups: &[Pickup], declared: NaiveTime) -> NaiveTime {
    let Some(first) = pickups.first() else {
        return declared;
    };
    if !first.quantities.has_no_orders() {
        return declared;
    }

    let floor = start_floor();
    if let Some(closing) = first.info.closing_time {
        let leave = closing - TimeDelta::minutes(CLOSING_MARGIN_MINUTES);
        if leave + TimeDelta::minutes(SAME_ROUTE_HOP_MINUTES) <= floor {
            return leave;
        }
    }

    let Some(position) = pickups
        .iter()
        .position(|pickup| !pickup.quantities.has_no_orders())
    else {
        return declared;
    };
    let Some(ready) = pickups.get(position).and_then(|pickup| pickup.info.start_time) else {
        return declared;
    };
    if ready <= floor {
        return ready;
    }

    let travel: i64 = pickups
        .iter()
        .zip(pickups.iter().skip(1))
        .take(position)
        .map(|(from, to)| hop_minutes(from, to))
        .sum();
    (ready - TimeDelta::minutes(travel)).max(floor)
}

/// Walk the pickups from `start` and report stops the driver is likely late for.
pub(crate) fn late_arrivals(pickups: &[Pickup], start: NaiveTime) -> Vec<String> {
    let first_bearing = pickups
        .iter()
        .position(|pickup| !pickup.quantities.has_no_orders());
    let mut warnings = Vec::new();
    let mut arrival = start;
    let mut previous: Option<&Pickup> = None;

    for (position, pickup) in pickups.iter().enumerate() {
        if let Some(previous) = previous {
            arrival += TimeDelta::minutes(hop_minutes(previous, pickup));
        }
        if let Some(closing) = pickup.info.closing_time {
            let last_pickup = closing - TimeDelta::minutes(CLOSING_MARGIN_MINUTES);
            if arrival > last_pickup {
                warnings.push(format!(
                    "reaches '{}' at {}, after its last pickup time {}",
                    pickup.name,
                    format_clock(arrival),
                    format_clock(last_pickup)
                ));
            }
        }
        if Some(position) == first_bearing
            && let Some(ready) = pickup.info.start_time
            && arrival > ready
        {
            warnings.push(format!(
                "reaches '{}' at {}, after its start time {}",
                pickup.name,
                format_clock(arrival),
                format_clock(ready)
            ));
        }
        previous = Some(pickup);
    }
    warnings
}

fn derive_start_time(driver: &mut Driver) {
    let Some(declared) = driver.declared_start else {
        return;
    };
    let start = compute_start(&driver.pickups, declared);
    if start != declared {
        tracing::debug!(
            driver = %driver.username,
            declared = %format_clock(declared),
            derived = %format_clock(start),
            "derived start time"
        );
    }
    driver.start_time = Some(start);
    let late = late_arrivals(&driver.pickups, start);
    driver.warnings.extend(late);
}

fn driver_total(driver: &Driver, pick: fn(&RationCounts) -> u32) -> u32 {
    driver
        .deliveries
        .iter()
        .filter_map(rations)
        .map(|counts| pick(&counts))
        .sum()
}

fn resolve_value(scope: &Scope<'_>, name: &str) -> Option<String> {
    let value = match name {
        "Consumer.Normal" => rations(scope.delivery()?)?.normal,
        "Consumer.Veggie" => rations(scope.delivery()?)?.veggie,
        "ThisDriverRestaurant.Orders" => match scope.pickup()?.quantities {
            PickupQuantities::Gen2(counts) => counts.orders,
            PickupQuantities::Gen3(_) => return None,
        },
        "Driver.TotalNormal" => driver_total(scope.driver()?, |counts| counts.normal),
        "Driver.TotalVeggie" => driver_total(scope.driver()?, |counts| counts.veggie),
        _ => return None,
    };
    Some(value.to_string())
}

fn resolve_flag(scope: &Scope<'_>, name: &str) -> Option<bool> {
    match name {
        "ThisDriverRestaurant.NoPics" => Some(scope.pickup()?.info.no_pics),
        "ThisDriverRestaurant.IsEmpty" => Some(scope.pickup()?.quantities.has_no_orders()),
        _ => {
            let threshold = parse_compact_clock(name.strip_prefix(CLOSING_BEFORE_PREFIX)?)?;
            let driver = scope.driver()?;
            Some(
                driver
                    .pickups
                    .first()
                    .and_then(|pickup| pickup.info.closing_time)
                    .is_some_and(|closing| closing < threshold),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RestaurantInfo;

    fn pickup(name: &str, orders: u32, route: &str, closing: NaiveTime, start: Option<NaiveTime>) -> Pickup {
        Pickup {
            name: name.to_owned(),
            line: 10,
            info: RestaurantInfo {
                closing_time: Some(closing),
                start_time: start,
                route: route.to_owned(),
                ..RestaurantInfo::default()
            },
            quantities: PickupQuantities::Gen2(OrderCounts {
                orders,
                ..OrderCounts::default()
            }),
        }
    }

    #[test]
    fn order_bearing_first_stop_keeps_declared_start() {
        let pickups = [pickup("A", 2, "North", hm(20, 0), Some(hm(17, 0)))];
        assert_eq!(compute_start(&pickups, hm(17, 5)), hm(17, 5));
    }

    #[test]
    fn early_closing_lead_stop_starts_ten_minutes_before_close() {
        let pickups = [
            pickup("Lead", 0, "North", hm(17, 5), None),
            pickup("Main", 3, "North", hm(20, 0), Some(hm(17, 5))),
        ];
        assert_eq!(compute_start(&pickups, hm(17, 0)), hm(16, 55));
    }

    #[test]
    fn late_closing_lead_stop_is_floored_at_five() {
        let pickups = [
            pickup("Lead", 0, "North", hm(17, 8), None),
            pickup("Main", 3, "North", hm(20, 0), Some(hm(17, 5))),
        ];
        assert_eq!(compute_start(&pickups, hm(17, 30)), hm(17, 0));
    }

    #[test]
    fn walk_forward_counts_route_changes() {
        let pickups = [
            pickup("Lead", 0, "North", hm(19, 0), None),
            pickup("Hop", 0, "North", hm(19, 0), None),
            pickup("Main", 3, "South", hm(20, 0), Some(hm(17, 30))),
        ];
        // 5 minutes same route + 10 minutes route change
        assert_eq!(compute_start(&pickups, hm(17, 0)), hm(17, 15));
    }

    #[test]
    fn early_ready_restaurant_sets_start_directly() {
        let pickups = [
            pickup("Lead", 0, "North", hm(19, 0), None),
            pickup("Main", 3, "South", hm(20, 0), Some(hm(16, 45))),
        ];
        assert_eq!(compute_start(&pickups, hm(17, 30)), hm(16, 45));
    }

    #[test]
    fn warns_when_schedule_misses_closing_or_start() {
        let pickups = [
            pickup("Lead", 0, "North", hm(17, 8), None),
            pickup("Main", 3, "South", hm(17, 15), Some(hm(17, 5))),
        ];
        let warnings = late_arrivals(&pickups, hm(17, 0));
        assert_eq!(
            warnings,
            vec![
                "reaches 'Lead' at 5:00 PM, after its last pickup time 4:58 PM".to_owned(),
                "reaches 'Main' at 5:10 PM, after its last pickup time 5:05 PM".to_owned(),
                "reaches 'Main' at 5:10 PM, after its start time 5:05 PM".to_owned(),
            ]
        );
    }

    #[test]
    fn on_time_schedule_has_no_warnings() {
        let pickups = [
            pickup("Lead", 0, "North", hm(19, 0), None),
            pickup("Main", 3, "North", hm(20, 0), Some(hm(17, 30))),
        ];
        assert!(late_arrivals(&pickups, hm(17, 25)).is_empty());
    }
}
