//! Row state machine: control block, then driver blocks.

use std::mem;

use crate::catalog::RestaurantCatalog;
use crate::control::{ControlBlock, Directive, DirectiveEntry, parse_username};
use crate::ingest::IngestError;
use crate::ingest::grid::{Columns, Row, column};
use crate::model::{
    BlockLines, Delivery, DeliveryQuantities, Driver, ItineraryStop, MixedCounts, Pickup,
    PickupQuantities, RationCounts, RestaurantInfo,
};
use crate::schema::SchemaVersion;

const CONTROL_BEGIN: &str = "ControlBegin";
const CONTROL_END: &str = "ControlEnd";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    BeforeControlBlock,
    InControlBlock { begin: usize },
    AfterControlBlock,
    InDriverBlock,
    AwaitNavigation,
    AwaitSeparator,
}

/// Output of the row pass, before cross-row audits.
pub(crate) struct RowPass {
    pub(crate) control: Option<ControlBlock>,
    pub(crate) drivers: Vec<Driver>,
    pub(crate) errors: Vec<String>,
}

/// Walk every row of the grid.
///
/// Structural problems abort immediately; field-level problems are collected
/// in [`RowPass::errors`].
pub(crate) fn parse_rows(
    grid: &[Vec<String>],
    catalog: Option<&RestaurantCatalog>,
) -> Result<RowPass, IngestError> {
    let (header, rows) = grid
        .split_first()
        .ok_or_else(|| IngestError::structural(1, "missing header row"))?;
    let columns = Columns::from_header(header);
    let missing = columns.missing(&column::SHARED);
    if !missing.is_empty() {
        return Err(IngestError::structural(
            1,
            format!("missing header column(s): {}", missing.join(", ")),
        ));
    }

    let mut parser = Parser {
        columns: &columns,
        catalog,
        state: State::BeforeControlBlock,
        directives: Vec::new(),
        version: None,
        control: None,
        drivers: Vec::new(),
        current: None,
        errors: Vec::new(),
    };
    for (offset, cells) in rows.iter().enumerate() {
        parser.step(Row::new(offset + 2, cells, &columns))?;
    }
    parser.finish(grid.len())
}

struct Parser<'g> {
    columns: &'g Columns,
    catalog: Option<&'g RestaurantCatalog>,
    state: State,
    directives: Vec<DirectiveEntry>,
    version: Option<SchemaVersion>,
    control: Option<ControlBlock>,
    drivers: Vec<Driver>,
    current: Option<Driver>,
    errors: Vec<String>,
}

impl Parser<'_> {
    fn step(&mut self, row: Row<'_>) -> Result<(), IngestError> {
        // the navigation row carries its URL in the Consumer column
        if self.state != State::AwaitNavigation {
            check_markers(&row)?;
        }
        match self.state {
            State::BeforeControlBlock => {
                if row.is_blank() {
                    return Ok(());
                }
                if is_control_row(&row) && row.get(column::NAME).eq_ignore_ascii_case(CONTROL_BEGIN) {
                    tracing::debug!(line = row.line, "entering control block");
                    self.state = State::InControlBlock { begin: row.line };
                    return Ok(());
                }
                Err(IngestError::structural(
                    row.line,
                    format!("expected {CONTROL_BEGIN} before any other row"),
                ))
            }
            State::InControlBlock { .. } => {
                if row.is_blank() {
                    return Ok(());
                }
                if !is_control_row(&row) {
                    return Err(IngestError::structural(
                        row.line,
                        "driver or consumer row inside the control block",
                    ));
                }
                let key = row.get(column::NAME);
                if key.eq_ignore_ascii_case(CONTROL_END) {
                    self.finish_control(row.line)?;
                    self.state = State::AfterControlBlock;
                } else if key.eq_ignore_ascii_case(CONTROL_BEGIN) {
                    return Err(IngestError::structural(row.line, "nested ControlBegin"));
                } else if key.is_empty() {
                    return Err(IngestError::structural(
                        row.line,
                        "control block row without a directive key",
                    ));
                } else {
                    self.directives
                        .push(DirectiveEntry::new(key, row.get(column::DETAILS), row.line));
                }
                Ok(())
            }
            State::AfterControlBlock => {
                if row.is_blank() {
                    return Ok(());
                }
                if row.is_marked(column::DRIVER) {
                    self.open_driver(&row);
                    self.state = State::InDriverBlock;
                    return Ok(());
                }
                Err(IngestError::structural(row.line, "expected a driver header row"))
            }
            State::InDriverBlock => {
                if row.is_marked(column::DRIVER) {
                    self.close_driver(&row)?;
                    self.state = State::AwaitNavigation;
                } else if row.is_marked(column::CONSUMER) {
                    self.delivery_row(&row);
                } else if !row.get(column::RESTAURANTS).is_empty() {
                    self.pickup_row(&row);
                } else if row.is_blank() {
                    return Err(self.unterminated());
                } else {
                    return Err(IngestError::structural(
                        row.line,
                        "row inside a driver block is neither a pickup nor a delivery",
                    ));
                }
                Ok(())
            }
            State::AwaitNavigation => {
                let url = row.first();
                if !(url.starts_with("https://") || url.starts_with("http://")) {
                    return Err(IngestError::structural(
                        row.line,
                        format!("expected a navigation URL row after the driver block for {}", self.current_username()),
                    ));
                }
                if let Some(mut driver) = self.current.take() {
                    url.clone_into(&mut driver.navigation_url);
                    driver.block.navigation = row.line;
                    self.drivers.push(driver);
                }
                self.state = State::AwaitSeparator;
                Ok(())
            }
            State::AwaitSeparator => {
                if row.is_blank() {
                    self.state = State::AfterControlBlock;
                    return Ok(());
                }
                Err(IngestError::structural(
                    row.line,
                    "expected a blank separator row after the navigation URL",
                ))
            }
        }
    }

    fn finish(self, rows: usize) -> Result<RowPass, IngestError> {
        let end = rows + 1;
        match self.state {
            State::BeforeControlBlock => Err(IngestError::structural(end, "missing control block")),
            State::InControlBlock { begin } => Err(IngestError::structural(
                begin,
                format!("control block is missing {CONTROL_END}"),
            )),
            State::InDriverBlock => Err(self.unterminated()),
            State::AwaitNavigation => Err(IngestError::structural(
                end,
                format!("missing navigation URL row for {}", self.current_username()),
            )),
            State::AfterControlBlock | State::AwaitSeparator => Ok(RowPass {
                control: self.control,
                drivers: self.drivers,
                errors: self.errors,
            }),
        }
    }

    fn finish_control(&mut self, line: usize) -> Result<(), IngestError> {
        let entries = mem::take(&mut self.directives);
        let declared = entries
            .iter()
            .find(|entry| Directive::from_key(&entry.key) == Some(Directive::Version))
            .and_then(|entry| SchemaVersion::from_tag(&entry.value));

        match ControlBlock::from_directives(entries) {
            Ok(block) => {
                self.version = Some(block.version);
                self.control = Some(block);
            }
            Err(problems) => {
                self.errors.extend(problems);
                self.version = declared;
            }
        }

        let Some(version) = self.version else {
            return Err(IngestError::Validation(mem::take(&mut self.errors)));
        };
        let missing = self.columns.missing(version.ops().quantity_columns);
        if !missing.is_empty() {
            return Err(IngestError::structural(
                1,
                format!(
                    "missing header column(s) for version {version}: {}",
                    missing.join(", ")
                ),
            ));
        }
        tracing::debug!(line, %version, "control block complete");
        Ok(())
    }

    fn open_driver(&mut self, row: &Row<'_>) {
        let mut problems = Vec::new();
        let name = required(row, column::NAME, "missing driver name", &mut problems);
        let phone = required(row, column::PHONE, "missing driver phone", &mut problems);
        let username = parse_username(row.get(column::USER_NAME)).unwrap_or_else(|message| {
            problems.push(format!("driver {message}"));
            row.get(column::USER_NAME).to_owned()
        });
        self.report(row.line, problems);

        if let Some(previous) = self
            .drivers
            .iter()
            .find(|driver| !username.is_empty() && driver.username == username)
        {
            self.errors.push(format!(
                "line {}: driver {username} already has a block at line {}",
                row.line, previous.block.header
            ));
        }

        self.current = Some(Driver {
            username,
            name,
            phone,
            alt_phone: row.get(column::ALT_PHONE).to_owned(),
            address: row.get(column::ADDRESS).to_owned(),
            city: row.get(column::CITY).to_owned(),
            block: BlockLines {
                header: row.line,
                ..BlockLines::default()
            },
            declared_start: None,
            start_time: None,
            pickups: Vec::new(),
            deliveries: Vec::new(),
            itinerary: Vec::new(),
            navigation_url: String::new(),
            warnings: Vec::new(),
        });
    }

    fn close_driver(&mut self, row: &Row<'_>) -> Result<(), IngestError> {
        let closing = row.get(column::USER_NAME).trim_start_matches('@');
        let Some(driver) = self.current.as_mut() else {
            return Err(IngestError::structural(row.line, "driver block closed twice"));
        };
        if closing != driver.username {
            return Err(IngestError::structural(
                row.line,
                format!(
                    "driver block for {} opened at line {} is closed by a header for {closing}",
                    driver.username, driver.block.header
                ),
            ));
        }
        driver.block.closing = row.line;
        Ok(())
    }

    fn pickup_row(&mut self, row: &Row<'_>) {
        let Some(version) = self.version else { return };
        let name = row.get(column::RESTAURANTS).to_owned();
        let mut problems = Vec::new();

        let info = match self.catalog {
            Some(catalog) => catalog.get(&name).cloned().unwrap_or_else(|| {
                problems.push(format!("unknown restaurant '{name}'"));
                RestaurantInfo::default()
            }),
            None => RestaurantInfo::default(),
        };
        let quantities = (version.ops().pickup_quantities)(row).unwrap_or_else(|found| {
            problems.extend(found);
            PickupQuantities::zero(version)
        });

        let Some(driver) = self.current.as_mut() else { return };
        if let Some(previous) = driver.pickup(&name) {
            problems.push(format!(
                "driver {} already picks up at '{name}' (line {})",
                driver.username, previous.line
            ));
        } else {
            driver.itinerary.push(ItineraryStop::Pickup(driver.pickups.len()));
            driver.pickups.push(Pickup {
                name,
                line: row.line,
                info,
                quantities,
            });
        }
        self.report(row.line, problems);
    }

    fn delivery_row(&mut self, row: &Row<'_>) {
        let Some(version) = self.version else { return };
        let mut problems = Vec::new();

        let name = required(row, column::NAME, "missing consumer name", &mut problems);
        let phone = required(row, column::PHONE, "missing consumer phone", &mut problems);
        let city = required(row, column::CITY, "missing city", &mut problems);
        let address = required(row, column::ADDRESS, "missing address", &mut problems);
        let restaurant = required(row, column::RESTAURANTS, "missing restaurant", &mut problems);
        let username = parse_username(row.get(column::USER_NAME)).unwrap_or_else(|message| {
            problems.push(format!("consumer {message}"));
            String::new()
        });
        let condo = row.flag(column::CONDO).unwrap_or_else(|message| {
            problems.push(message);
            false
        });
        let quantities = (version.ops().delivery_quantities)(row).unwrap_or_else(|found| {
            problems.extend(found);
            empty_delivery(version)
        });
        self.report(row.line, problems);

        if let Some(driver) = self.current.as_mut() {
            driver
                .itinerary
                .push(ItineraryStop::Delivery(driver.deliveries.len()));
            driver.deliveries.push(Delivery {
                name,
                username,
                phone,
                alt_phone: row.get(column::ALT_PHONE).to_owned(),
                neighborhood: row.get(column::NEIGHBORHOOD).to_owned(),
                city,
                address,
                condo,
                details: row.get(column::DETAILS).to_owned(),
                restaurant,
                line: row.line,
                quantities,
            });
        }
    }

    fn report(&mut self, line: usize, problems: Vec<String>) {
        if !problems.is_empty() {
            self.errors.push(format!("line {line}: {}", problems.join(", ")));
        }
    }

    fn current_username(&self) -> &str {
        self.current.as_ref().map_or("?", |driver| driver.username.as_str())
    }

    fn unterminated(&self) -> IngestError {
        let (header, username) = self
            .current
            .as_ref()
            .map_or((0, "?"), |driver| (driver.block.header, driver.username.as_str()));
        IngestError::structural(
            header,
            format!("unterminated driver block for {username}: missing closing driver header row"),
        )
    }
}

/// Marker columns drive row classification, so they must read TRUE, FALSE or blank.
fn check_markers(row: &Row<'_>) -> Result<(), IngestError> {
    for name in [column::CONSUMER, column::DRIVER] {
        row.flag(name).map_err(|message| {
            IngestError::structural(row.line, format!("unrecognised row marker: {message}"))
        })?;
    }
    Ok(())
}

fn is_control_row(row: &Row<'_>) -> bool {
    !row.is_marked(column::CONSUMER) && !row.is_marked(column::DRIVER)
}

fn required(row: &Row<'_>, name: &str, message: &str, problems: &mut Vec<String>) -> String {
    let value = row.get(name);
    if value.is_empty() {
        problems.push(message.to_owned());
    }
    value.to_owned()
}

fn empty_delivery(version: SchemaVersion) -> DeliveryQuantities {
    match version {
        SchemaVersion::Gen2 => DeliveryQuantities::Gen2(RationCounts::default()),
        SchemaVersion::Gen3 => DeliveryQuantities::Gen3(MixedCounts::default()),
    }
}
