//! Travel provider using a Nominatim geocoder and an OSRM router.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::{self, Instant};

use runsheet_core::ports::{Coordinate, PortError, TravelPort};

/// Public Nominatim instance.
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";
/// Public OSRM demo server.
pub const DEFAULT_ROUTER_URL: &str = "https://router.project-osrm.org";
/// Nominatim's usage policy allows one request per second.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Single match from /search?format=jsonv2
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,

    #[serde(default)]
    display_name: String,
}

/// Response from /route/v1/driving
#[derive(Debug, Deserialize)]
struct RouteResponse {
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    #[serde(default)]
    legs: Vec<Leg>,
}

#[derive(Debug, Deserialize)]
struct Leg {
    duration: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Endpoints and politeness settings for the OSM services.
pub struct OsmConfig {
    /// Base URL of the Nominatim instance.
    pub geocoder_url: String,
    /// Base URL of the OSRM instance.
    pub router_url: String,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Minimum pause between two requests.
    pub min_interval: Duration,
}

impl Default for OsmConfig {
    fn default() -> Self {
        Self {
            geocoder_url: DEFAULT_GEOCODER_URL.to_owned(),
            router_url: DEFAULT_ROUTER_URL.to_owned(),
            user_agent: concat!("runsheet/", env!("CARGO_PKG_VERSION")).to_owned(),
            min_interval: DEFAULT_MIN_INTERVAL,
        }
    }
}

/// Geocoding and travel times over Nominatim and OSRM.
pub struct OsmTravelPort {
    client: Client,
    config: OsmConfig,
    last_request: Mutex<Option<Instant>>,
}

impl OsmTravelPort {
    /// Create a new port bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client, config: OsmConfig) -> Self {
        Self {
            client,
            config,
            last_request: Mutex::new(None),
        }
    }

    /// Wait until `min_interval` has passed since the previous request.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let ready = previous + self.config.min_interval;
            if ready > Instant::now() {
                time::sleep_until(ready).await;
            }
        }
        *last = Some(Instant::now());
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.client
            .get(url)
            .header(USER_AGENT, self.config.user_agent.as_str())
    }
}

#[async_trait]
impl TravelPort for OsmTravelPort {
    async fn geocode(&self, address: &str) -> Result<Coordinate, PortError> {
        let url = format!("{}/search", self.config.geocoder_url.trim_end_matches('/'));
        // two results are enough to tell a unique match from an ambiguous one
        let req = self.get(&url).query(&[
            ("q", address),
            ("format", "jsonv2"),
            ("limit", "2"),
        ]);

        self.throttle().await;
        let places = fetch_json::<Vec<Place>>(req).await?;
        tracing::debug!(address, matches = places.len(), "geocoded");
        single_place(address, places)
    }

    async fn travel_time(&self, from: Coordinate, to: Coordinate) -> Result<u64, PortError> {
        let req = self
            .get(&route_url(&self.config.router_url, from, to))
            .query(&[("overview", "false")]);

        self.throttle().await;
        let response = fetch_json::<RouteResponse>(req).await?;
        single_leg(&response)
    }
}

/// Build the travel port for the given client and settings.
#[must_use]
pub fn port(client: Client, config: OsmConfig) -> Arc<dyn TravelPort> {
    Arc::new(OsmTravelPort::new(client, config))
}

fn route_url(base: &str, from: Coordinate, to: Coordinate) -> String {
    // OSRM takes longitude first
    format!(
        "{}/route/v1/driving/{},{};{},{}",
        base.trim_end_matches('/'),
        from.longitude,
        from.latitude,
        to.longitude,
        to.latitude
    )
}

fn single_place(address: &str, places: Vec<Place>) -> Result<Coordinate, PortError> {
    let matches = places.len();
    let mut places = places.into_iter();
    let (Some(place), None) = (places.next(), places.next()) else {
        if matches == 0 {
            return Err(PortError::AddressNotFound(address.to_owned()));
        }
        return Err(PortError::AmbiguousAddress {
            address: address.to_owned(),
            matches,
        });
    };

    let degrees = |raw: &str| {
        raw.parse::<f64>().map_err(|err| {
            PortError::Internal(format!("bad coordinate '{raw}' for {}: {err}", place.display_name))
        })
    };
    Ok(Coordinate::new(degrees(&place.lat)?, degrees(&place.lon)?))
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "durations are rounded, clamped at zero and far below u64::MAX"
)]
fn single_leg(response: &RouteResponse) -> Result<u64, PortError> {
    let legs = response.routes.first().map_or(0, |route| route.legs.len());
    match response.routes.as_slice() {
        [route] => match route.legs.as_slice() {
            [leg] => Ok(leg.duration.max(0.0).round() as u64),
            _ => Err(PortError::UnexpectedRoute { routes: 1, legs }),
        },
        routes => Err(PortError::UnexpectedRoute {
            routes: routes.len(),
            legs,
        }),
    }
}

// Small helper to fetch and decode JSON with status handling.
async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, PortError> {
    req.send()
        .await
        .map_err(PortError::from)?
        .error_for_status()
        .map_err(PortError::from)?
        .json()
        .await
        .map_err(PortError::from)
}
