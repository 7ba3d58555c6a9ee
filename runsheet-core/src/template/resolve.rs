//! References shared by every schema generation.

use crate::clock::format_clock;
use crate::model::{ItineraryStop, Restaurant};
use crate::template::scope::Scope;

/// Resolve a value reference that does not depend on the schema generation.
pub(crate) fn value(scope: &Scope<'_>, name: &str) -> Option<String> {
    let run = scope.run();
    let value = match name {
        "Driver.Name" => scope.driver()?.name.clone(),
        "Driver.UserName" => scope.driver()?.username.clone(),
        "Driver.CompositeName" => {
            let driver = scope.driver()?;
            format!("{} ({})", driver.name, driver.username)
        }
        "Driver.Phone" => scope.driver()?.phone.clone(),
        "Driver.AltPhone" => scope.driver()?.alt_phone.clone(),
        "Driver.StartTime" => scope.driver()?.start_time.map(format_clock).unwrap_or_default(),
        "Driver.FirstRestaurantName" => scope
            .driver()?
            .pickups
            .first()
            .map(|pickup| pickup.name.clone())
            .unwrap_or_default(),
        "Driver.GMapURL" => scope.driver()?.navigation_url.clone(),
        "Consumer.Name" => scope.delivery()?.name.clone(),
        "Consumer.UserName" => scope.delivery()?.username.clone(),
        "Consumer.Phone" => scope.delivery()?.phone.clone(),
        "Consumer.AltPhone" => scope.delivery()?.alt_phone.clone(),
        "Consumer.CompactPhone" => compact_phone(&scope.delivery()?.phone),
        "Consumer.Neighborhood" => scope.delivery()?.neighborhood.clone(),
        "Consumer.City" => scope.delivery()?.city.clone(),
        "Consumer.Address" => scope.delivery()?.address.clone(),
        "Consumer.FullAddress" => scope.delivery()?.full_address(),
        "Consumer.Details" => scope.delivery()?.details.clone(),
        "Consumer.RestaurantEmoji" => run
            .restaurants
            .get(&scope.delivery()?.restaurant)
            .map(|restaurant| restaurant.info.emoji.clone())
            .unwrap_or_default(),
        "ThisDriverRestaurant.Name" => scope.pickup()?.name.clone(),
        "ThisDriverRestaurant.Emoji" => scope.pickup()?.info.emoji.clone(),
        "ThisDriverRestaurant.Address" => scope.pickup()?.info.address.clone(),
        "ThisDriverRestaurant.Details" => scope.pickup()?.info.details.clone(),
        "ThisDriverRestaurant.CloseTime" => scope
            .pickup()?
            .info
            .closing_time
            .map(format_clock)
            .unwrap_or_default(),
        "SplitRestaurant.Name" => scope.split_restaurant()?.name.clone(),
        "SplitRestaurant.Emoji" => scope.split_restaurant()?.info.emoji.clone(),
        "SplitRestaurant.Address" => scope.split_restaurant()?.info.address.clone(),
        "SplitRestaurant.CleanupDriverUserName" => run
            .control
            .cleanup_driver(&scope.split_restaurant()?.name)
            .unwrap_or_default()
            .to_owned(),
        "OpsManager.UserName" => run.control.ops_manager.username.clone(),
        "OpsManager.Phone" => run.control.ops_manager.phone.clone(),
        "PickupManager.UserName" => scope.pickup_manager()?.to_owned(),
        "BackupDriver.UserName" => scope.backup_driver()?.to_owned(),
        _ => return None,
    };
    Some(value)
}

/// Resolve a boolean reference that does not depend on the schema generation.
pub(crate) fn flag(scope: &Scope<'_>, name: &str) -> Option<bool> {
    let flag = match name {
        "Consumer.IsAltPhone" => !scope.delivery()?.alt_phone.is_empty(),
        "Consumer.IsCondo" => scope.delivery()?.condo,
        "Consumer.IsDetails" => !scope.delivery()?.details.is_empty(),
        "Driver.IsAltPhone" => !scope.driver()?.alt_phone.is_empty(),
        "Driver.HasCondo" => scope.driver()?.has_condo(),
        "ThisDriverRestaurant.IsSplit" => scope
            .run()
            .restaurants
            .get(&scope.pickup()?.name)
            .is_some_and(Restaurant::is_split),
        "SplitRestaurant.IsCleanup" => {
            let restaurant = scope.split_restaurant()?;
            let driver = scope.driver()?;
            scope.run().control.cleanup_driver(&restaurant.name) == Some(driver.username.as_str())
        }
        "Itinerary.IsRestaurant" => matches!(scope.stop()?, ItineraryStop::Pickup(_)),
        "Itinerary.IsDelivery" => matches!(scope.stop()?, ItineraryStop::Delivery(_)),
        _ => return None,
    };
    Some(flag)
}

fn compact_phone(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_phone_keeps_digits_only() {
        assert_eq!(compact_phone("(510) 555-0123"), "5105550123");
        assert_eq!(compact_phone(""), "");
    }
}
