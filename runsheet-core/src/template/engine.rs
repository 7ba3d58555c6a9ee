//! Tree-walking evaluator.

use crate::model::Restaurant;
use crate::template::TemplateError;
use crate::template::ast::{Element, ListName, Location};
use crate::template::resolve;
use crate::template::scope::{Binding, Scope};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Outcome of evaluating a sequence of elements.
pub enum Evaluated {
    /// Every element was evaluated.
    Completed(String),
    /// A `CONTINUE` was reached; the text produced up to it.
    SkipRestOfIteration(String),
}

impl Evaluated {
    /// Text produced, whichever way evaluation ended.
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Evaluated::Completed(text) | Evaluated::SkipRestOfIteration(text) => text,
        }
    }
}

/// Evaluate `elements` in order within `scope`.
pub(crate) fn evaluate(elements: &[Element], scope: &Scope<'_>) -> Result<Evaluated, TemplateError> {
    let mut text = String::new();
    for element in elements {
        match element {
            Element::Literal(literal) => text.push_str(literal),
            Element::Variable { name, location } => text.push_str(&value(scope, name, *location)?),
            Element::Loop {
                list,
                body,
                location,
            } => {
                for binding in items(*list, scope, *location)? {
                    let inner = scope.child(list.name(), binding);
                    text.push_str(&evaluate(body, &inner)?.into_text());
                }
            }
            Element::Conditional {
                reference,
                negated,
                body,
                location,
            } => {
                if flag(scope, reference, *location)? != *negated {
                    match evaluate(body, scope)? {
                        Evaluated::Completed(inner) => text.push_str(&inner),
                        Evaluated::SkipRestOfIteration(inner) => {
                            text.push_str(&inner);
                            return Ok(Evaluated::SkipRestOfIteration(text));
                        }
                    }
                }
            }
            Element::Continue { .. } => return Ok(Evaluated::SkipRestOfIteration(text)),
        }
    }
    Ok(Evaluated::Completed(text))
}

fn unknown(scope: &Scope<'_>, name: &str, location: Location) -> TemplateError {
    tracing::debug!(name, scopes = ?scope.path(), "unresolved reference");
    TemplateError::UnknownVariable {
        name: name.to_owned(),
        location,
    }
}

fn value(scope: &Scope<'_>, name: &str, location: Location) -> Result<String, TemplateError> {
    let ops = scope.run().version().ops();
    resolve::value(scope, name)
        .or_else(|| (ops.resolve_value)(scope, name))
        .ok_or_else(|| unknown(scope, name, location))
}

fn flag(scope: &Scope<'_>, name: &str, location: Location) -> Result<bool, TemplateError> {
    let ops = scope.run().version().ops();
    resolve::flag(scope, name)
        .or_else(|| (ops.resolve_flag)(scope, name))
        .ok_or_else(|| unknown(scope, name, location))
}

fn items<'a>(
    list: ListName,
    scope: &Scope<'a>,
    location: Location,
) -> Result<Vec<Binding<'a>>, TemplateError> {
    let run = scope.run();
    let control = &run.control;
    let missing = |needs: &'static str| TemplateError::MissingScope {
        list: list.name().to_owned(),
        needs,
        location,
    };
    let driver = || scope.driver().ok_or_else(|| missing("Driver"));

    let bindings = match list {
        ListName::Driver => run.drivers.iter().map(Binding::Driver).collect(),
        ListName::Consumer => driver()?.deliveries.iter().map(Binding::Delivery).collect(),
        ListName::ThisDriverRestaurant => driver()?.pickups.iter().map(Binding::Pickup).collect(),
        ListName::ThisDriverRestaurantPickup => {
            let pickup = scope.pickup().ok_or_else(|| missing("ThisDriverRestaurant"))?;
            driver()?
                .deliveries_from(&pickup.name)
                .map(Binding::Delivery)
                .collect()
        }
        ListName::SplitRestaurant => run.restaurants.split().map(Binding::SplitRestaurant).collect(),
        ListName::SplitRestaurantDriver => scope
            .split_restaurant()
            .ok_or_else(|| missing("SplitRestaurant"))?
            .drivers
            .iter()
            .filter_map(|username| run.driver(username))
            .map(Binding::Driver)
            .collect(),
        ListName::ThisDriverSplitsRestaurant => driver()?
            .pickups
            .iter()
            .filter(|pickup| {
                run.restaurants
                    .get(&pickup.name)
                    .is_some_and(Restaurant::is_split)
            })
            .map(Binding::Pickup)
            .collect(),
        ListName::AlternateMeals => control
            .alt_meal_options
            .iter()
            .map(|kind| Binding::AlternateMeal(kind))
            .collect(),
        ListName::AlternateGroceries => control
            .alt_grocery_options
            .iter()
            .map(|kind| Binding::AlternateGrocery(kind))
            .collect(),
        ListName::PickupManager => control
            .pickup_managers
            .iter()
            .map(|username| Binding::PickupManager(username))
            .collect(),
        ListName::BackupDriver => control
            .backup_drivers
            .iter()
            .map(|username| Binding::BackupDriver(username))
            .collect(),
        ListName::Itinerary => driver()?.itinerary.iter().copied().map(Binding::Stop).collect(),
    };
    Ok(bindings)
}
