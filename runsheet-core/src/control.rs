//! Control block: the directive rows between `ControlBegin` and `ControlEnd`.

use std::fmt;

use chrono::NaiveTime;
use serde::Serialize;

use crate::clock::parse_clock;
use crate::schema::SchemaVersion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
/// Directive keys understood by any generation.
pub enum Directive {
    /// Schema version tag.
    Version,
    /// Operations manager username and phone.
    OpsManager,
    /// Declared start times, one per driver.
    StartTimes,
    /// Split restaurant and its cleanup driver.
    SplitRestaurant,
    /// Backup driver usernames.
    BackupDriver,
    /// Meal and grocery source restaurants.
    FoodSources,
    /// Alternate meal types.
    AltMealOptions,
    /// Alternate grocery types.
    AltGroceryOptions,
    /// Pickup manager usernames.
    PickupManager,
    /// Announcement format selector.
    MessageFormat,
}

impl Directive {
    /// Every known directive.
    pub const ALL: [Directive; 10] = [
        Directive::Version,
        Directive::OpsManager,
        Directive::StartTimes,
        Directive::SplitRestaurant,
        Directive::BackupDriver,
        Directive::FoodSources,
        Directive::AltMealOptions,
        Directive::AltGroceryOptions,
        Directive::PickupManager,
        Directive::MessageFormat,
    ];

    /// Key as written in the `Name` column.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Directive::Version => "Version",
            Directive::OpsManager => "OpsManager",
            Directive::StartTimes => "StartTimes",
            Directive::SplitRestaurant => "SplitRestaurant",
            Directive::BackupDriver => "BackupDriver",
            Directive::FoodSources => "FoodSources",
            Directive::AltMealOptions => "AltMealOptions",
            Directive::AltGroceryOptions => "AltGroceryOptions",
            Directive::PickupManager => "PickupManager",
            Directive::MessageFormat => "MessageFormat",
        }
    }

    /// Resolve a key, ignoring ASCII case.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim();
        Directive::ALL
            .into_iter()
            .find(|directive| directive.key().eq_ignore_ascii_case(key))
    }

    fn repeatable(self) -> bool {
        matches!(self, Directive::SplitRestaurant)
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Raw directive row as captured from the grid.
pub struct DirectiveEntry {
    /// Key from the `Name` column.
    pub key: String,
    /// Value from the `Details` column.
    pub value: String,
    /// Source line.
    pub line: usize,
}

impl DirectiveEntry {
    /// Construct an entry.
    #[must_use]
    pub fn new<K: Into<String>, V: Into<String>>(key: K, value: V, line: usize) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            line,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Operations manager contact.
pub struct OpsManager {
    /// Forum username.
    pub username: String,
    /// Phone number.
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Restaurant shared by several drivers and who cleans up there.
pub struct SplitRestaurant {
    /// Restaurant name.
    pub name: String,
    /// Username of the cleanup driver.
    pub cleanup_driver: String,
    /// Source line of the directive.
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Generation 3 meal and grocery sources.
pub struct FoodSources {
    /// Restaurant supplying meals.
    pub meals: String,
    /// Restaurant supplying groceries.
    pub groceries: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Validated configuration for one run.
pub struct ControlBlock {
    /// Declared schema generation.
    pub version: SchemaVersion,
    /// Directive rows in declaration order.
    pub directives: Vec<DirectiveEntry>,
    /// Operations manager.
    pub ops_manager: OpsManager,
    /// Start times, assigned to drivers in file order.
    pub start_times: Vec<NaiveTime>,
    /// Split restaurant declarations.
    pub split_restaurants: Vec<SplitRestaurant>,
    /// Backup driver usernames.
    pub backup_drivers: Vec<String>,
    /// Meal and grocery sources (generation 3).
    pub food_sources: Option<FoodSources>,
    /// Alternate meal types (generation 3).
    pub alt_meal_options: Vec<String>,
    /// Alternate grocery types (generation 3).
    pub alt_grocery_options: Vec<String>,
    /// Pickup manager usernames (generation 3).
    pub pickup_managers: Vec<String>,
    /// Announcement format selector (generation 3).
    pub message_format: Option<String>,
    /// Advisories raised while reading directives.
    pub warnings: Vec<String>,
}

impl ControlBlock {
    /// Build and validate a control block from its directive rows.
    ///
    /// # Errors
    ///
    /// Returns every problem found: a missing or invalid `Version`, unknown or
    /// duplicated keys, malformed values and missing required directives.
    pub fn from_directives(entries: Vec<DirectiveEntry>) -> Result<Self, Vec<String>> {
        let mut errors = Vec::new();

        let Some(version_entry) = entries
            .iter()
            .find(|entry| Directive::from_key(&entry.key) == Some(Directive::Version))
        else {
            return Err(vec![format!("missing required directive {}", Directive::Version)]);
        };
        let Some(version) = SchemaVersion::from_tag(&version_entry.value) else {
            return Err(vec![format!(
                "line {}: unsupported version '{}'",
                version_entry.line,
                version_entry.value.trim()
            )]);
        };
        if entries.first().map(|entry| entry.line) != Some(version_entry.line) {
            errors.push(format!(
                "line {}: {} must be the first directive",
                version_entry.line,
                Directive::Version
            ));
        }

        let ops = version.ops();
        let mut block = ControlBlock {
            version,
            directives: Vec::new(),
            ops_manager: OpsManager::default(),
            start_times: Vec::new(),
            split_restaurants: Vec::new(),
            backup_drivers: Vec::new(),
            food_sources: None,
            alt_meal_options: Vec::new(),
            alt_grocery_options: Vec::new(),
            pickup_managers: Vec::new(),
            message_format: None,
            warnings: Vec::new(),
        };
        let mut seen: Vec<(Directive, usize)> = Vec::new();

        for entry in &entries {
            let Some(directive) = Directive::from_key(&entry.key) else {
                errors.push(format!(
                    "line {}: unknown directive '{}'",
                    entry.line,
                    entry.key.trim()
                ));
                continue;
            };

            if let Some((_, first)) = seen.iter().find(|(known, _)| *known == directive)
                && !directive.repeatable()
            {
                errors.push(format!(
                    "line {}: duplicate directive {directive} (first declared at line {first})",
                    entry.line
                ));
                continue;
            }
            seen.push((directive, entry.line));

            if ops.unsupported_directives.contains(&directive) {
                block.warnings.push(format!(
                    "line {}: directive {directive} is not supported by version {}, ignored",
                    entry.line,
                    version.tag()
                ));
                continue;
            }

            if let Err(message) = block.apply(directive, entry) {
                errors.push(format!("line {}: {directive}: {message}", entry.line));
            }
        }

        for required in ops.required_directives {
            if !seen.iter().any(|(known, _)| known == required) {
                errors.push(format!("missing required directive {required}"));
            }
        }

        block.directives = entries;
        for warning in &block.warnings {
            tracing::warn!(target: "runsheet::control", "{warning}");
        }

        if errors.is_empty() {
            Ok(block)
        } else {
            Err(errors)
        }
    }

    fn apply(&mut self, directive: Directive, entry: &DirectiveEntry) -> Result<(), String> {
        let items = split_list(&entry.value);
        match directive {
            Directive::Version => {}
            Directive::OpsManager => {
                let [username, phone] = exactly::<2>(&items, "username, phone")?;
                self.ops_manager = OpsManager {
                    username: parse_username(username)?,
                    phone: phone.to_owned(),
                };
            }
            Directive::StartTimes => {
                if items.is_empty() {
                    return Err("expected at least one start time".to_owned());
                }
                self.start_times = items
                    .iter()
                    .map(|item| parse_clock(item).ok_or_else(|| format!("bad start time '{item}'")))
                    .collect::<Result<_, _>>()?;
            }
            Directive::SplitRestaurant => {
                let [name, cleanup] = exactly::<2>(&items, "restaurant name, cleanup driver")?;
                if self.split_restaurants.iter().any(|split| split.name == name) {
                    return Err(format!("restaurant '{name}' is declared split twice"));
                }
                self.split_restaurants.push(SplitRestaurant {
                    name: name.to_owned(),
                    cleanup_driver: parse_username(cleanup)?,
                    line: entry.line,
                });
            }
            Directive::BackupDriver => self.backup_drivers = parse_usernames(&items)?,
            Directive::FoodSources => {
                let [meals, groceries] = exactly::<2>(&items, "meal source, grocery source")?;
                self.food_sources = Some(FoodSources {
                    meals: meals.to_owned(),
                    groceries: groceries.to_owned(),
                });
            }
            Directive::AltMealOptions => self.alt_meal_options = parse_options(&items)?,
            Directive::AltGroceryOptions => self.alt_grocery_options = parse_options(&items)?,
            Directive::PickupManager => {
                if items.is_empty() {
                    return Err("expected at least one username".to_owned());
                }
                self.pickup_managers = parse_usernames(&items)?;
            }
            Directive::MessageFormat => {
                let [format] = exactly::<1>(&items, "format name")?;
                if !format
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
                {
                    return Err(format!("bad format name '{format}'"));
                }
                self.message_format = Some(format.to_owned());
            }
        }
        Ok(())
    }

    /// Cleanup driver declared for a split restaurant.
    #[must_use]
    pub fn cleanup_driver(&self, restaurant: &str) -> Option<&str> {
        self.split_restaurants
            .iter()
            .find(|split| split.name == restaurant)
            .map(|split| split.cleanup_driver.as_str())
    }
}

fn split_list(value: &str) -> Vec<&str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect()
}

fn exactly<'a, const N: usize>(items: &[&'a str], shape: &str) -> Result<[&'a str; N], String> {
    <[&str; N]>::try_from(items)
        .map_err(|_err| format!("expected '{shape}', found {} value(s)", items.len()))
}

/// Normalise a forum username: strip a leading `@`, reject blanks and spaces.
///
/// # Errors
///
/// Returns a message describing why the username is malformed.
pub fn parse_username(raw: &str) -> Result<String, String> {
    let username = raw.trim().trim_start_matches('@');
    if username.is_empty() {
        return Err("empty username".to_owned());
    }
    if username.chars().any(char::is_whitespace) {
        return Err(format!("bad username '{username}'"));
    }
    Ok(username.to_owned())
}

fn parse_usernames(items: &[&str]) -> Result<Vec<String>, String> {
    let mut usernames: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let username = parse_username(item)?;
        if usernames.contains(&username) {
            return Err(format!("username '{username}' listed twice"));
        }
        usernames.push(username);
    }
    Ok(usernames)
}

fn parse_options(items: &[&str]) -> Result<Vec<String>, String> {
    if items.is_empty() {
        return Err("expected at least one option".to_owned());
    }
    let mut options: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if options.iter().any(|known| known == item) {
            return Err(format!("option '{item}' listed twice"));
        }
        options.push((*item).to_owned());
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::hm;

    fn gen2_entries() -> Vec<DirectiveEntry> {
        vec![
            DirectiveEntry::new("Version", "2-0-0", 3),
            DirectiveEntry::new("OpsManager", "@ops, 510-555-0100", 4),
            DirectiveEntry::new("StartTimes", "3:00 PM, 3:15 PM", 5),
        ]
    }

    #[test]
    fn builds_minimal_gen2_block() {
        let block = ControlBlock::from_directives(gen2_entries()).expect("valid block");
        assert_eq!(block.version, SchemaVersion::Gen2);
        assert_eq!(block.ops_manager.username, "ops");
        assert_eq!(block.start_times, vec![hm(15, 0), hm(15, 15)]);
        assert!(block.warnings.is_empty());
    }

    #[test]
    fn missing_version_is_reported_alone() {
        let errors = ControlBlock::from_directives(vec![DirectiveEntry::new("OpsManager", "ops, 1", 3)])
            .expect_err("no version");
        assert_eq!(errors, vec!["missing required directive Version".to_owned()]);
    }

    #[test]
    fn aggregates_every_directive_problem() {
        let entries = vec![
            DirectiveEntry::new("Version", "3-0-0", 3),
            DirectiveEntry::new("StartTimes", "3:00 PM, later", 4),
            DirectiveEntry::new("Bogus", "x", 5),
            DirectiveEntry::new("StartTimes", "4:00 PM", 6),
        ];
        let errors = ControlBlock::from_directives(entries).expect_err("invalid block");
        assert!(errors.iter().any(|e| e.contains("line 4: StartTimes: bad start time 'later'")));
        assert!(errors.iter().any(|e| e.contains("line 5: unknown directive 'Bogus'")));
        assert!(errors.iter().any(|e| e.contains("line 6: duplicate directive StartTimes")));
        assert!(errors.iter().any(|e| e == "missing required directive FoodSources"));
        assert!(errors.iter().any(|e| e == "missing required directive MessageFormat"));
    }

    #[test]
    fn gen3_only_directives_warn_under_gen2() {
        let mut entries = gen2_entries();
        entries.push(DirectiveEntry::new("AltMealOptions", "Veg, Halal", 6));
        let block = ControlBlock::from_directives(entries).expect("valid block");
        assert!(block.alt_meal_options.is_empty());
        assert_eq!(block.warnings.len(), 1);
        assert!(block.warnings[0].contains("AltMealOptions is not supported by version 2-0-0"));
    }

    #[test]
    fn split_restaurants_may_repeat() {
        let mut entries = gen2_entries();
        entries.push(DirectiveEntry::new("SplitRestaurant", "Bopshop, @anne", 6));
        entries.push(DirectiveEntry::new("SplitRestaurant", "Cafe Raj, bob", 7));
        let block = ControlBlock::from_directives(entries).expect("valid block");
        assert_eq!(block.cleanup_driver("Bopshop"), Some("anne"));
        assert_eq!(block.cleanup_driver("Cafe Raj"), Some("bob"));
        assert_eq!(block.cleanup_driver("Elsewhere"), None);
    }

    #[test]
    fn rejects_usernames_with_spaces() {
        let mut entries = gen2_entries();
        entries.push(DirectiveEntry::new("BackupDriver", "good, not good", 6));
        let errors = ControlBlock::from_directives(entries).expect_err("bad username");
        assert_eq!(errors, vec!["line 6: BackupDriver: bad username 'not good'".to_owned()]);
    }
}
