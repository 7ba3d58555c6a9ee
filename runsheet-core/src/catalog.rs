//! Restaurant catalog: addresses, hours, routes and presentation details.

use std::collections::HashMap;
use std::io;

use crate::clock::parse_clock;
use crate::ingest::grid::{Columns, Row, read_grid};
use crate::model::RestaurantInfo;

const NAME: &str = "Name";
const ADDRESS: &str = "Address";
const DETAILS: &str = "Details";
const CLOSING: &str = "Closing";
const START: &str = "Start";
const ROUTE: &str = "Route";
const EMOJI: &str = "Emoji";
const NO_PICS: &str = "NoPics";

#[derive(thiserror::Error, Debug)]
/// Errors raised while loading a restaurant catalog.
pub enum CatalogError {
    /// The CSV could not be read.
    #[error("Catalog CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// The catalog has no header row.
    #[error("Catalog is empty")]
    Empty,
    /// Header columns are missing.
    #[error("Catalog is missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    /// One or more rows are malformed.
    #[error("Catalog has {} problem(s):\n{}", .0.len(), .0.join("\n"))]
    Invalid(Vec<String>),
}

#[derive(Debug, Clone, Default)]
/// Known restaurants keyed by name.
pub struct RestaurantCatalog {
    entries: HashMap<String, RestaurantInfo>,
}

impl RestaurantCatalog {
    /// Build a catalog from already-validated entries.
    #[must_use]
    pub fn new<I: IntoIterator<Item = (String, RestaurantInfo)>>(entries: I) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Read a catalog CSV.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] for unreadable CSV, missing columns, duplicate
    /// names or malformed times and markers.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, CatalogError> {
        Self::from_grid(&read_grid(reader)?)
    }

    /// Build a catalog from a grid whose first row is the header.
    ///
    /// # Errors
    ///
    /// Same as [`RestaurantCatalog::from_reader`], minus CSV decoding.
    pub fn from_grid(grid: &[Vec<String>]) -> Result<Self, CatalogError> {
        let (header, rows) = grid.split_first().ok_or(CatalogError::Empty)?;
        let columns = Columns::from_header(header);
        let missing = columns.missing(&[NAME, ADDRESS]);
        if !missing.is_empty() {
            return Err(CatalogError::MissingColumns(
                missing.into_iter().map(str::to_owned).collect(),
            ));
        }

        let mut entries = HashMap::new();
        let mut errors = Vec::new();
        for (offset, cells) in rows.iter().enumerate() {
            let row = Row::new(offset + 2, cells, &columns);
            if row.is_blank() {
                continue;
            }
            let name = row.get(NAME);
            if name.is_empty() {
                errors.push(format!("line {}: missing restaurant name", row.line));
                continue;
            }
            match read_info(&row) {
                Ok(info) => {
                    if entries.insert(name.to_owned(), info).is_some() {
                        errors.push(format!("line {}: duplicate restaurant '{name}'", row.line));
                    }
                }
                Err(problems) => errors.push(format!("line {}: {}", row.line, problems.join(", "))),
            }
        }

        if errors.is_empty() {
            tracing::debug!(restaurants = entries.len(), "loaded restaurant catalog");
            Ok(Self { entries })
        } else {
            Err(CatalogError::Invalid(errors))
        }
    }

    /// Catalog facts for a restaurant.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RestaurantInfo> {
        self.entries.get(name)
    }

    /// Whether the catalog knows the restaurant.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of restaurants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the catalog has no restaurants.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn read_info(row: &Row<'_>) -> Result<RestaurantInfo, Vec<String>> {
    let mut problems = Vec::new();
    let mut time = |column: &str| {
        let raw = row.get(column);
        let parsed = parse_clock(raw);
        if parsed.is_none() && !raw.is_empty() {
            problems.push(format!("bad {column} time '{raw}'"));
        }
        parsed
    };
    let closing_time = time(CLOSING);
    let start_time = time(START);
    let no_pics = row.flag(NO_PICS).unwrap_or_else(|message| {
        problems.push(message);
        false
    });

    if !problems.is_empty() {
        return Err(problems);
    }
    Ok(RestaurantInfo {
        address: row.get(ADDRESS).to_owned(),
        details: row.get(DETAILS).to_owned(),
        closing_time,
        start_time,
        route: row.get(ROUTE).to_owned(),
        emoji: row.get(EMOJI).to_owned(),
        no_pics,
    })
}
