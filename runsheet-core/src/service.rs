//! High-level service facade: sequencing drivers and re-ingesting the result.

use std::sync::Arc;

use crate::catalog::RestaurantCatalog;
use crate::ingest::{self, Grid, IngestError};
use crate::model::{DeliveryRun, Driver};
use crate::ports::TravelPort;
use crate::route::{self, Addressed, BlockOrder, PortCalls, RouteError};

#[derive(thiserror::Error, Debug)]
/// Any failure surfaced by the service.
pub enum ServiceError {
    /// The run grid was rejected.
    #[error(transparent)]
    Ingest(#[from] IngestError),
    /// Sequencing or rewriting failed.
    #[error(transparent)]
    Route(#[from] RouteError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A delivery handed to the sequencer: its position in the driver's list and where it goes.
pub struct DeliveryStop {
    /// Index into [`Driver::deliveries`].
    pub index: usize,
    /// Full delivery address.
    pub address: String,
}

impl Addressed for DeliveryStop {
    fn address(&self) -> &str {
        &self.address
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Sequencing outcome for one driver.
pub struct DriverRoute {
    /// Driver username.
    pub username: String,
    /// Delivery indices in visiting order.
    pub order: Vec<usize>,
    /// Directions URL through every pickup, the deliveries and home.
    pub navigation_url: String,
    /// Travel time of the chosen legs.
    pub total_travel_seconds: u64,
    /// Provider calls made.
    pub calls: PortCalls,
}

#[derive(Debug, Clone)]
/// A run re-ordered by the sequencer.
pub struct Resequenced {
    /// Rewritten grid.
    pub grid: Grid,
    /// The rewritten grid parsed again.
    pub run: DeliveryRun,
    /// One entry per sequenced driver, in file order.
    pub routes: Vec<DriverRoute>,
}

/// Public entry point for routing a parsed run.
pub struct RunsheetService {
    port: Arc<dyn TravelPort>,
}

impl RunsheetService {
    /// Create a new service bound to the provided travel port.
    #[must_use]
    pub fn new(port: Arc<dyn TravelPort>) -> Self {
        Self { port }
    }

    /// Order one driver's deliveries from their last pickup to their home.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::MissingAnchor`] when the last pickup or home address
    /// is blank, or the sequencer's error when a provider call fails.
    pub async fn sequence_driver(&self, driver: &Driver) -> Result<DriverRoute, RouteError> {
        let start = driver
            .pickups
            .last()
            .map(|pickup| pickup.info.address.clone())
            .filter(|address| !address.is_empty())
            .ok_or_else(|| RouteError::MissingAnchor {
                driver: driver.username.clone(),
                anchor: "start",
            })?;
        let end = driver.home_address();
        if end.is_empty() {
            return Err(RouteError::MissingAnchor {
                driver: driver.username.clone(),
                anchor: "end",
            });
        }

        let stops = driver
            .deliveries
            .iter()
            .enumerate()
            .map(|(index, delivery)| DeliveryStop {
                index,
                address: delivery.full_address(),
            })
            .collect();
        let sequenced = route::sequence(self.port.as_ref(), &start, &end, stops).await?;

        let mut addresses: Vec<&str> = driver
            .pickups
            .iter()
            .map(|pickup| pickup.info.address.as_str())
            .collect();
        addresses.extend(sequenced.path.iter().skip(1).map(String::as_str));
        addresses.dedup();
        let navigation_url = route::navigation_url(&addresses)?;

        tracing::info!(
            driver = %driver.username,
            stops = sequenced.stops.len(),
            seconds = sequenced.total_travel_seconds,
            "driver sequenced"
        );
        Ok(DriverRoute {
            username: driver.username.clone(),
            order: sequenced.stops.iter().map(|stop| stop.index).collect(),
            navigation_url,
            total_travel_seconds: sequenced.total_travel_seconds,
            calls: sequenced.calls,
        })
    }

    /// Parse a run, sequence every driver with deliveries, rewrite their
    /// blocks and parse the rewritten grid again.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] if the run is invalid, a driver cannot be
    /// sequenced, or the rewritten grid no longer parses.
    pub async fn resequence(
        &self,
        grid: &[Vec<String>],
        catalog: Option<&RestaurantCatalog>,
    ) -> Result<Resequenced, ServiceError> {
        let run = ingest::parse(grid, catalog)?;
        let mut routes = Vec::new();
        for driver in run.drivers.iter().filter(|driver| !driver.deliveries.is_empty()) {
            routes.push(self.sequence_driver(driver).await?);
        }

        let orders: Vec<BlockOrder> = routes
            .iter()
            .map(|route| BlockOrder {
                username: route.username.clone(),
                deliveries: route.order.clone(),
                navigation_url: route.navigation_url.clone(),
            })
            .collect();
        let grid = route::rewrite_blocks(grid, &run, &orders)?;
        let run = ingest::parse(&grid, catalog)?;
        Ok(Resequenced { grid, run, routes })
    }
}
