//! Traits describing the geocoding and travel-time provider.

use std::fmt;

use async_trait::async_trait;
use reqwest::Error as ReqwestError;
use serde::Serialize;

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to the provider backend.
pub enum PortError {
    /// Network layer failed.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// The geocoder found no match.
    #[error("Address not found: {0}")]
    AddressNotFound(String),
    /// The geocoder found more than one match.
    #[error("Ambiguous address: {address} ({matches} matches)")]
    AmbiguousAddress {
        /// Address queried.
        address: String,
        /// Number of matches returned.
        matches: usize,
    },
    /// The router did not answer with exactly one route of one leg.
    #[error("Unexpected route shape: {routes} route(s), {legs} leg(s)")]
    UnexpectedRoute {
        /// Routes returned.
        routes: usize,
        /// Legs in the first route.
        legs: usize,
    },
    /// Internal provider error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
/// WGS84 position.
pub struct Coordinate {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Coordinate {
    /// Construct a coordinate.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

#[async_trait]
/// Trait for geocoding and driving-time backends.
pub trait TravelPort: Send + Sync {
    /// Resolve a street address to a single coordinate.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails or the address does not
    /// resolve to exactly one match.
    async fn geocode(&self, address: &str) -> Result<Coordinate, PortError>;

    /// Driving time between two coordinates, in whole seconds.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails or the route is not a
    /// single leg.
    async fn travel_time(&self, from: Coordinate, to: Coordinate) -> Result<u64, PortError>;
}
