//! Header-addressed access to the raw cell grid, plus CSV reading and writing.

use std::collections::HashMap;
use std::io;

/// Column names shared by every generation.
pub mod column {
    /// Delivery row marker.
    pub const CONSUMER: &str = "Consumer";
    /// Driver header row marker.
    pub const DRIVER: &str = "Driver";
    /// Person name, or control key / sentinel in the control block.
    pub const NAME: &str = "Name";
    /// Forum username.
    pub const USER_NAME: &str = "User Name";
    /// Primary phone.
    pub const PHONE: &str = "Phone";
    /// Alternate phone.
    pub const ALT_PHONE: &str = "Alt. Phone";
    /// Neighborhood.
    pub const NEIGHBORHOOD: &str = "Neighborhood";
    /// City.
    pub const CITY: &str = "City";
    /// Street address.
    pub const ADDRESS: &str = "Address";
    /// Condo marker.
    pub const CONDO: &str = "Condo";
    /// Free text, or control value in the control block.
    pub const DETAILS: &str = "Details";
    /// Restaurant name.
    pub const RESTAURANTS: &str = "Restaurants";

    /// Generation 2 standard rations.
    pub const NORMAL: &str = "normal";
    /// Generation 2 vegetarian rations.
    pub const VEGGIE: &str = "veggie";
    /// Generation 2 order count on pickup rows.
    pub const ORDERS: &str = "#orders";

    /// Generation 3 standard meals.
    pub const STD_MEALS: &str = "std meals";
    /// Generation 3 alternate meals.
    pub const ALT_MEALS: &str = "alt meals";
    /// Generation 3 alternate meal type.
    pub const TYPE_MEAL: &str = "type meal";
    /// Generation 3 standard grocery bags.
    pub const STD_GROCERY: &str = "std grocery";
    /// Generation 3 alternate grocery bags.
    pub const ALT_GROCERY: &str = "alt grocery";
    /// Generation 3 alternate grocery type.
    pub const TYPE_GROCERY: &str = "type grocery";

    /// Columns required before the version is known.
    pub const SHARED: [&str; 12] = [
        CONSUMER,
        DRIVER,
        NAME,
        USER_NAME,
        PHONE,
        ALT_PHONE,
        NEIGHBORHOOD,
        CITY,
        ADDRESS,
        CONDO,
        DETAILS,
        RESTAURANTS,
    ];
}

/// Two-dimensional grid of cells, one `Vec` per row.
pub type Grid = Vec<Vec<String>>;

/// Read a CSV export into a grid. Rows may have differing lengths.
///
/// # Errors
///
/// Returns the CSV reader's error for malformed input or I/O failures.
pub fn read_grid<R: io::Read>(reader: R) -> Result<Grid, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    reader
        .records()
        .map(|record| record.map(|cells| cells.iter().map(str::to_owned).collect()))
        .collect()
}

/// Write a grid back out as CSV.
///
/// # Errors
///
/// Returns the CSV writer's error on I/O failures.
pub fn write_grid<W: io::Write>(writer: W, grid: &[Vec<String>]) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    for row in grid {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Clone, Default)]
/// Header name to column position lookup.
pub struct Columns {
    positions: HashMap<String, usize>,
}

impl Columns {
    /// Index the header row. Names are matched case-insensitively.
    #[must_use]
    pub fn from_header(header: &[String]) -> Self {
        let mut positions = HashMap::new();
        for (position, name) in header.iter().enumerate() {
            positions
                .entry(name.trim().to_lowercase())
                .or_insert(position);
        }
        Self { positions }
    }

    /// Position of a named column.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(&name.to_lowercase()).copied()
    }

    /// Names from `required` that the header lacks.
    #[must_use]
    pub fn missing<'n>(&self, required: &[&'n str]) -> Vec<&'n str> {
        required
            .iter()
            .copied()
            .filter(|name| self.position(name).is_none())
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
/// One grid row viewed through the header.
pub struct Row<'a> {
    /// 1-based line number in the source file.
    pub line: usize,
    cells: &'a [String],
    columns: &'a Columns,
}

impl<'a> Row<'a> {
    /// Wrap a row of cells.
    #[must_use]
    pub fn new(line: usize, cells: &'a [String], columns: &'a Columns) -> Self {
        Self {
            line,
            cells,
            columns,
        }
    }

    /// Trimmed value of a named column, empty when absent.
    #[must_use]
    pub fn get(&self, name: &str) -> &'a str {
        self.columns
            .position(name)
            .and_then(|position| self.cells.get(position))
            .map_or("", |cell| cell.trim())
    }

    /// Trimmed value of the first cell.
    #[must_use]
    pub fn first(&self) -> &'a str {
        self.cells.first().map_or("", |cell| cell.trim())
    }

    /// Every cell is empty after trimming.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|cell| cell.trim().is_empty())
    }

    /// Boolean marker column: `TRUE`/`FALSE` in any case, blank is false.
    ///
    /// # Errors
    ///
    /// Returns a message naming the column when the cell holds anything else.
    pub fn flag(&self, name: &str) -> Result<bool, String> {
        let value = self.get(name);
        if value.is_empty() || value.eq_ignore_ascii_case("false") {
            Ok(false)
        } else if value.eq_ignore_ascii_case("true") {
            Ok(true)
        } else {
            Err(format!("{name} must be TRUE or FALSE, found '{value}'"))
        }
    }

    /// Marker column read leniently, for row classification.
    #[must_use]
    pub fn is_marked(&self, name: &str) -> bool {
        self.get(name).eq_ignore_ascii_case("true")
    }

    /// Non-negative count column, blank meaning zero.
    ///
    /// # Errors
    ///
    /// Returns a message naming the column when the cell is not a whole number.
    pub fn count(&self, name: &str) -> Result<u32, String> {
        Ok(self.optional_count(name)?.unwrap_or(0))
    }

    /// Non-negative count column, `None` when blank.
    ///
    /// # Errors
    ///
    /// Returns a message naming the column when the cell is not a whole number.
    pub fn optional_count(&self, name: &str) -> Result<Option<u32>, String> {
        let value = self.get(name);
        if value.is_empty() {
            return Ok(None);
        }
        value
            .parse::<u32>()
            .map(Some)
            .map_err(|_err| format!("{name} is not a valid count: '{value}'"))
    }
}
