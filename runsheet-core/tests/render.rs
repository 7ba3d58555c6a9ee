//! Announcement rendering against fixture runs.

use runsheet_core::{DeliveryRun, Template, TemplateError, parse};

mod common;

fn gen2_run() -> DeliveryRun {
    parse(&common::grid("run-gen2.csv"), Some(&common::catalog())).expect("valid run")
}

fn gen3_run() -> DeliveryRun {
    parse(&common::grid("run-gen3.csv"), Some(&common::catalog())).expect("valid run")
}

#[test]
fn split_restaurant_summary() {
    let template = Template::parse(
        r#"
        # one line per shared restaurant
        LOOP &{SplitRestaurant} {
            ${SplitRestaurant.Emoji} " " ${SplitRestaurant.Name} " cleanup: @" ${SplitRestaurant.CleanupDriverUserName}
            LOOP &{SplitRestaurant.Driver} {
                " " ${Driver.UserName}
                IF &{SplitRestaurant.IsCleanup} THEN { "*" }
            }
            "\n"
        }
        "#,
    )
    .expect("valid template");
    let text = template.render_run(&gen2_run()).expect("rendered");
    assert_eq!(text, "🍛 Cafe Raj cleanup: @bob anne bob*\n");
}

#[test]
fn gen2_driver_message() {
    let template = Template::parse(
        r#"
        "Driver: " ${Driver.CompositeName} " starts " ${Driver.StartTime} " at " ${Driver.FirstRestaurantName} "\n"
        IF &{Driver.IsFirstRestaurantClosingBefore545PM} THEN { "Hurry to the first stop!\n" }
        LOOP &{ThisDriverRestaurant} {
            IF &{ThisDriverRestaurant.IsEmpty} THEN { CONTINUE }
            ${ThisDriverRestaurant.Emoji} " " ${ThisDriverRestaurant.Name} " x" ${ThisDriverRestaurant.Orders}
            IF &{ThisDriverRestaurant.IsSplit} THEN { " (split)" }
            IF &{ThisDriverRestaurant.NoPics} THEN { " no pics" }
            "\n"
        }
        LOOP &{Consumer} {
            "- " ${Consumer.Name} " " ${Consumer.FullAddress} " " ${Consumer.Normal} "/" ${Consumer.Veggie} " " ${Consumer.RestaurantEmoji}
            IF &{Consumer.IsDetails} THEN { " [" ${Consumer.Details} "]" }
            "\n"
        }
        "#,
    )
    .expect("valid template");
    let messages = template.render_drivers(&gen2_run()).expect("rendered");
    assert_eq!(messages.len(), 2);
    assert_eq!(
        messages[0].text,
        "Driver: Anne Driver (anne) starts 4:55 PM at Bopshop\n\
         Hurry to the first stop!\n\
         🍛 Cafe Raj x2 (split) no pics\n\
         - Cust Name 5 5 Elm St, Berkeley 2/0 🍛 [Gate code 12]\n\
         - Cust Name 6 6 Elm St, Berkeley 1/1 🍛\n"
    );
    assert_eq!(messages[1].username, "bob");
    assert!(messages[1].text.starts_with("Driver: Bob Driver (bob) starts 5:15 PM at Cafe Raj\n🍛 Cafe Raj x1 (split) no pics\n🍜 Kim's Cafe x1\n"));
}

#[test]
fn gen3_alternate_totals_follow_scope() {
    let template = Template::parse(
        r#"
        LOOP &{AlternateMeals} { ${AlternateMeals.Name} "=" ${AlternateMeals.Total} " " }
        LOOP &{AlternateGroceries} { ${AlternateGroceries.Name} "=" ${AlternateGroceries.Total} " " }
        LOOP &{PickupManager} { "@" ${PickupManager.UserName} }
        "\n"
        LOOP &{Driver} {
            ${Driver.UserName} ": " ${Driver.TotalStdMeals} "+" ${Driver.TotalAltMeals} " meals, "
            ${Driver.TotalStdGrocery} "+" ${Driver.TotalAltGrocery} " groceries"
            IF &{Driver.HasCondo} THEN { ", condo" }
            IF NOT &{Driver.IsMealsOnly} THEN { ", mixed" }
            "\n"
            LOOP &{ThisDriverRestaurant} {
                ${ThisDriverRestaurant.Name}
                IF &{ThisDriverRestaurant.IsMealSource} THEN { " meals " ${ThisDriverRestaurant.StdMeals} "/" ${ThisDriverRestaurant.AltMeals} }
                IF &{ThisDriverRestaurant.IsGrocerySource} THEN { " groceries " ${ThisDriverRestaurant.StdGrocery} "/" ${ThisDriverRestaurant.AltGrocery} }
                "\n"
                LOOP &{ThisDriverRestaurant.Pickup} {
                    "  " ${Consumer.UserName}
                    IF &{Consumer.IsAltMeal} THEN { " " ${Consumer.AltMeals} "x" ${Consumer.TypeMeal} }
                    IF &{Consumer.IsAltGrocery} THEN { " " ${Consumer.AltGrocery} "x" ${Consumer.TypeGrocery} }
                    "\n"
                }
            }
        }
        "#,
    )
    .expect("valid template");
    let text = template.render_run(&gen3_run()).expect("rendered");
    assert_eq!(
        text,
        "Veg=1 Halal=0 Kosher=1 @pam\n\
         dana: 3+1 meals, 2+1 groceries, condo, mixed\n\
         Kitchen meals 3/1\n\
         \x20 cust1 1xVeg\n\
         \x20 cust2\n\
         Pantry groceries 2/1\n\
         \x20 cust3 1xKosher\n"
    );
}

#[test]
fn gen2_reference_is_unknown_under_gen3() {
    let template = Template::parse("LOOP &{Driver} { LOOP &{Consumer} { ${Consumer.Normal} } }")
        .expect("valid template");
    let error = template.render_run(&gen3_run()).expect_err("gen2 only");
    assert_eq!(error.to_string(), "1:37: unknown variable 'Consumer.Normal'");
    assert!(matches!(error, TemplateError::UnknownVariable { .. }));
}

#[test]
fn itinerary_reads_stops_in_row_order() {
    let template = Template::parse(
        r#"LOOP &{Itinerary} {
            IF &{Itinerary.IsRestaurant} THEN { "P:" ${ThisDriverRestaurant.Name} }
            IF &{Itinerary.IsDelivery} THEN { "D:" ${Consumer.Name} }
            ";"
        }"#,
    )
    .expect("valid template");
    let messages = template.render_drivers(&gen3_run()).expect("rendered");
    assert_eq!(
        messages[0].text,
        "P:Kitchen;P:Pantry;D:Cust Name 1;D:Cust Name 2;D:Cust Name 3;"
    );
}
