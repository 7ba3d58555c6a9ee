//! Shared fixtures for the runsheet-core integration suites.

use std::fs::File;
use std::path::PathBuf;

use runsheet_core::ingest::read_grid;
use runsheet_core::{Grid, RestaurantCatalog};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Load a run grid from `tests/fixtures`.
pub fn grid(name: &str) -> Grid {
    let file = File::open(fixture_path(name)).expect("fixture exists");
    read_grid(file).expect("fixture is valid CSV")
}

/// The restaurant catalog every fixture run refers to.
pub fn catalog() -> RestaurantCatalog {
    let file = File::open(fixture_path("restaurants.csv")).expect("catalog exists");
    RestaurantCatalog::from_reader(file).expect("catalog is valid")
}

/// Overwrite the cell at `line` under header `column`.
pub fn set_cell(grid: &mut Grid, line: usize, column: &str, value: &str) {
    let position = grid[0]
        .iter()
        .position(|name| name == column)
        .expect("column exists");
    grid[line - 1][position] = value.to_owned();
}
