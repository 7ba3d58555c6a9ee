//! Ingestion of a run grid into a validated [`DeliveryRun`].

use crate::catalog::RestaurantCatalog;
use crate::model::DeliveryRun;

mod audit;
/// Header-addressed grid access and CSV helpers.
pub mod grid;
mod parser;

pub use grid::{Grid, read_grid, write_grid};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Reasons a run grid is rejected.
pub enum IngestError {
    /// The grid does not have the expected shape; reported at the first offense.
    #[error("line {line}: {message}")]
    Structural {
        /// Offending line.
        line: usize,
        /// What was wrong.
        message: String,
    },
    /// Every semantic problem found across the grid.
    #[error("{} validation error(s):\n{}", .0.len(), .0.join("\n"))]
    Validation(Vec<String>),
}

impl IngestError {
    pub(crate) fn structural<M: Into<String>>(line: usize, message: M) -> Self {
        IngestError::Structural {
            line,
            message: message.into(),
        }
    }

    /// Individual problem messages.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        match self {
            IngestError::Structural { .. } => vec![self.to_string()],
            IngestError::Validation(messages) => messages.clone(),
        }
    }
}

/// Parse and validate a run grid whose first row is the header.
///
/// Restaurant facts (addresses, hours, routes) come from `catalog` when given;
/// every pickup must then name a catalog restaurant.
///
/// # Errors
///
/// Returns [`IngestError::Structural`] for the first shape violation, or
/// [`IngestError::Validation`] with every field and audit problem found.
pub fn parse(
    grid: &[Vec<String>],
    catalog: Option<&RestaurantCatalog>,
) -> Result<DeliveryRun, IngestError> {
    let pass = parser::parse_rows(grid, catalog)?;
    let mut errors = pass.errors;
    let mut drivers = pass.drivers;
    let Some(control) = pass.control else {
        return Err(IngestError::Validation(errors));
    };

    let mut warnings = control.warnings.clone();
    let restaurants = audit::audit_run(&control, &mut drivers, catalog, &mut errors, &mut warnings);
    if !errors.is_empty() {
        tracing::debug!(errors = errors.len(), "run rejected");
        return Err(IngestError::Validation(errors));
    }

    let derive = control.version.ops().derive_start_time;
    for driver in &mut drivers {
        derive(driver);
        warnings.extend(
            driver
                .warnings
                .iter()
                .map(|warning| format!("{}: {warning}", driver.username)),
        );
    }
    for warning in &warnings {
        tracing::warn!(target: "runsheet::ingest", "{warning}");
    }
    tracing::debug!(
        drivers = drivers.len(),
        restaurants = restaurants.len(),
        version = %control.version,
        "run parsed"
    );

    Ok(DeliveryRun {
        control,
        drivers,
        restaurants,
        warnings,
    })
}
