//! Delivery ordering and the grid rewrite that records it.

use crate::ports::PortError;

mod rewrite;
mod sequencer;

pub use rewrite::{BlockOrder, navigation_url, rewrite_blocks};
pub use sequencer::{Addressed, PortCalls, Sequenced, sequence};

#[derive(thiserror::Error, Debug)]
/// Errors raised while sequencing stops or rewriting driver blocks.
pub enum RouteError {
    /// Geocoding an address failed.
    #[error("could not geocode '{address}': {source}")]
    Geocode {
        /// Address queried.
        address: String,
        /// Provider failure.
        source: PortError,
    },
    /// A travel-time query failed.
    #[error("could not get travel time from '{from}' to '{to}': {source}")]
    TravelTime {
        /// Origin address.
        from: String,
        /// Destination address.
        to: String,
        /// Provider failure.
        source: PortError,
    },
    /// A driver lacks the address one route end needs.
    #[error("driver {driver} has no {anchor} address")]
    MissingAnchor {
        /// Driver username.
        driver: String,
        /// `start` or `end`.
        anchor: &'static str,
    },
    /// A block order does not fit the driver block it targets.
    #[error("cannot rewrite block for {driver}: {message}")]
    Block {
        /// Driver username.
        driver: String,
        /// What did not fit.
        message: String,
    },
    /// The directions URL could not be built.
    #[error("navigation URL: {0}")]
    Navigation(String),
}
