//! Double-ended greedy nearest-neighbour ordering of delivery stops.

use std::collections::HashMap;

use serde::Serialize;

use crate::ports::{Coordinate, TravelPort};
use crate::route::RouteError;

/// Something with a street address the provider can geocode.
pub trait Addressed {
    /// Address to geocode.
    fn address(&self) -> &str;
}

impl Addressed for String {
    fn address(&self) -> &str {
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
/// Provider calls made while sequencing one driver.
pub struct PortCalls {
    /// Geocoding requests.
    pub geocode: usize,
    /// Travel-time requests.
    pub travel_time: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Stops in visiting order and what it cost to find it.
pub struct Sequenced<T> {
    /// Stops in the order they should be visited.
    pub stops: Vec<T>,
    /// Every address on the path, start anchor first and end anchor last.
    pub path: Vec<String>,
    /// Sum of the travel times chosen during placement.
    pub total_travel_seconds: u64,
    /// Provider calls made.
    pub calls: PortCalls,
}

struct Endpoint {
    address: String,
    coordinate: Coordinate,
}

struct Placed<T> {
    stop: T,
    coordinate: Coordinate,
}

enum Slot<T> {
    Start(Endpoint),
    End(Endpoint),
    Stop(Placed<T>),
    Empty,
}

impl<T: Addressed> Slot<T> {
    fn located(&self) -> Option<(&str, Coordinate)> {
        match self {
            Slot::Start(endpoint) | Slot::End(endpoint) => {
                Some((endpoint.address.as_str(), endpoint.coordinate))
            }
            Slot::Stop(placed) => Some((placed.stop.address(), placed.coordinate)),
            Slot::Empty => None,
        }
    }

    fn address(&self) -> Option<&str> {
        self.located().map(|(address, _)| address)
    }
}

struct Session<'p> {
    port: &'p dyn TravelPort,
    known: HashMap<String, Coordinate>,
    calls: PortCalls,
}

impl Session<'_> {
    async fn locate(&mut self, address: &str) -> Result<Coordinate, RouteError> {
        if let Some(coordinate) = self.known.get(address) {
            return Ok(*coordinate);
        }
        self.calls.geocode += 1;
        let coordinate = self
            .port
            .geocode(address)
            .await
            .map_err(|source| RouteError::Geocode {
                address: address.to_owned(),
                source,
            })?;
        self.known.insert(address.to_owned(), coordinate);
        Ok(coordinate)
    }

    async fn travel(
        &mut self,
        from: (&str, Coordinate),
        to: (&str, Coordinate),
    ) -> Result<u64, RouteError> {
        self.calls.travel_time += 1;
        self.port
            .travel_time(from.1, to.1)
            .await
            .map_err(|source| RouteError::TravelTime {
                from: from.0.to_owned(),
                to: to.0.to_owned(),
                source,
            })
    }
}

/// First empty slot next to a filled one, with that neighbour's address and position.
fn next_open<T: Addressed>(slots: &[Slot<T>]) -> Option<(usize, String, Coordinate)> {
    slots.iter().enumerate().find_map(|(position, slot)| {
        if !matches!(slot, Slot::Empty) {
            return None;
        }
        let before = position.checked_sub(1).and_then(|left| slots.get(left));
        let after = slots.get(position + 1);
        before
            .and_then(Slot::located)
            .or_else(|| after.and_then(Slot::located))
            .map(|(address, coordinate)| (position, address.to_owned(), coordinate))
    })
}

/// Order `stops` between a fixed `start` and `end` address.
///
/// Every distinct address is geocoded once. Each step fills the first empty
/// slot beside a placed stop with the closest remaining stop (the earliest
/// one on ties), then flips the working array so both ends grow in turn.
///
/// # Errors
///
/// Returns a [`RouteError`] naming the address or leg whose provider call failed.
pub async fn sequence<T: Addressed>(
    port: &dyn TravelPort,
    start: &str,
    end: &str,
    stops: Vec<T>,
) -> Result<Sequenced<T>, RouteError> {
    let mut session = Session {
        port,
        known: HashMap::new(),
        calls: PortCalls::default(),
    };
    if stops.is_empty() {
        return Ok(Sequenced {
            stops,
            path: vec![start.to_owned(), end.to_owned()],
            total_travel_seconds: 0,
            calls: session.calls,
        });
    }

    let start_at = session.locate(start).await?;
    let end_at = session.locate(end).await?;
    let mut remaining = Vec::with_capacity(stops.len());
    for stop in stops {
        let coordinate = session.locate(stop.address()).await?;
        remaining.push(Placed { stop, coordinate });
    }

    let mut slots: Vec<Slot<T>> = Vec::with_capacity(remaining.len() + 2);
    slots.push(Slot::Start(Endpoint {
        address: start.to_owned(),
        coordinate: start_at,
    }));
    slots.extend(remaining.iter().map(|_| Slot::Empty));
    slots.push(Slot::End(Endpoint {
        address: end.to_owned(),
        coordinate: end_at,
    }));

    let mut total_travel_seconds = 0;
    while !remaining.is_empty() {
        let Some((position, from_address, from_at)) = next_open(&slots) else {
            break;
        };
        let mut best: Option<(usize, u64)> = None;
        for (candidate, placed) in remaining.iter().enumerate() {
            let seconds = session
                .travel(
                    (from_address.as_str(), from_at),
                    (placed.stop.address(), placed.coordinate),
                )
                .await?;
            if best.is_none_or(|(_, shortest)| seconds < shortest) {
                best = Some((candidate, seconds));
            }
        }
        let Some((chosen, seconds)) = best else {
            break;
        };
        let placed = remaining.remove(chosen);
        tracing::trace!(from = %from_address, to = %placed.stop.address(), seconds, "placed stop");
        if let Some(slot) = slots.get_mut(position) {
            *slot = Slot::Stop(placed);
        }
        total_travel_seconds += seconds;
        slots.reverse();
    }
    if !matches!(slots.first(), Some(Slot::Start(_))) {
        slots.reverse();
    }

    let path = slots
        .iter()
        .filter_map(|slot| slot.address().map(str::to_owned))
        .collect();
    let stops = slots
        .into_iter()
        .filter_map(|slot| match slot {
            Slot::Stop(placed) => Some(placed.stop),
            Slot::Start(_) | Slot::End(_) | Slot::Empty => None,
        })
        .collect();
    tracing::debug!(
        total_travel_seconds,
        geocode_calls = session.calls.geocode,
        travel_time_calls = session.calls.travel_time,
        "sequenced stops"
    );
    Ok(Sequenced {
        stops,
        path,
        total_travel_seconds,
        calls: session.calls,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::ports::PortError;

    /// Places every address on a line; travel time is the distance in seconds.
    struct LinePort {
        positions: HashMap<String, f64>,
        travel_log: Mutex<Vec<(f64, f64)>>,
    }

    impl LinePort {
        fn new(positions: &[(&str, f64)]) -> Self {
            Self {
                positions: positions
                    .iter()
                    .map(|(address, position)| ((*address).to_owned(), *position))
                    .collect(),
                travel_log: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TravelPort for LinePort {
        async fn geocode(&self, address: &str) -> Result<Coordinate, PortError> {
            self.positions
                .get(address)
                .map(|position| Coordinate::new(*position, 0.0))
                .ok_or_else(|| PortError::AddressNotFound(address.to_owned()))
        }

        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "test distances are small and non-negative"
        )]
        async fn travel_time(&self, from: Coordinate, to: Coordinate) -> Result<u64, PortError> {
            self.travel_log
                .lock()
                .expect("log lock")
                .push((from.latitude, to.latitude));
            Ok((to.latitude - from.latitude).abs().round() as u64)
        }
    }

    fn stops(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| (*name).to_owned()).collect()
    }

    #[tokio::test]
    async fn no_stops_means_no_provider_calls() {
        let port = LinePort::new(&[]);
        let result = sequence(&port, "S", "E", Vec::<String>::new())
            .await
            .expect("sequenced");
        assert!(result.stops.is_empty());
        assert_eq!(result.path, stops(&["S", "E"]));
        assert_eq!(result.total_travel_seconds, 0);
        assert_eq!(result.calls, PortCalls::default());
    }

    #[tokio::test]
    async fn builds_from_both_ends() {
        let port = LinePort::new(&[
            ("S", 0.0),
            ("E", 100.0),
            ("a", 10.0),
            ("b", 90.0),
            ("c", 50.0),
        ]);
        let result = sequence(&port, "S", "E", stops(&["c", "b", "a"]))
            .await
            .expect("sequenced");
        assert_eq!(result.stops, stops(&["a", "c", "b"]));
        assert_eq!(result.path, stops(&["S", "a", "c", "b", "E"]));
        // S->a 10, E->b 10, a->c 40
        assert_eq!(result.total_travel_seconds, 60);
        assert_eq!(result.calls.geocode, 5);
        assert_eq!(result.calls.travel_time, 3 + 2 + 1);
    }

    #[tokio::test]
    async fn ties_go_to_the_first_stop_listed() {
        let port = LinePort::new(&[("S", 0.0), ("E", 100.0), ("x", 20.0), ("y", 20.0)]);
        let result = sequence(&port, "S", "E", stops(&["y", "x"]))
            .await
            .expect("sequenced");
        assert_eq!(result.stops, stops(&["y", "x"]));
    }

    #[tokio::test]
    async fn repeated_addresses_are_geocoded_once() {
        let port = LinePort::new(&[("S", 0.0), ("E", 10.0), ("a", 5.0)]);
        let result = sequence(&port, "S", "E", stops(&["a", "a", "S"]))
            .await
            .expect("sequenced");
        assert_eq!(result.calls.geocode, 3);
        assert_eq!(result.stops.len(), 3);
    }

    #[tokio::test]
    async fn port_failure_names_the_address() {
        let port = LinePort::new(&[("S", 0.0), ("E", 10.0)]);
        let error = sequence(&port, "S", "E", stops(&["nowhere"]))
            .await
            .expect_err("unknown address");
        assert!(matches!(
            error,
            RouteError::Geocode { ref address, source: PortError::AddressNotFound(_) } if address == "nowhere"
        ));
    }

    #[tokio::test]
    async fn random_runs_keep_anchors_and_stops() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..25 {
            let count = rng.gen_range(1..12);
            let mut positions = vec![("S".to_owned(), 0.0), ("E".to_owned(), 1000.0)];
            for index in 0..count {
                positions.push((format!("stop-{index}"), f64::from(rng.gen_range(0..1000_u32))));
            }
            let table: Vec<(&str, f64)> = positions
                .iter()
                .map(|(address, position)| (address.as_str(), *position))
                .collect();
            let port = LinePort::new(&table);

            let mut input: Vec<String> = (0..count).map(|index| format!("stop-{index}")).collect();
            input.shuffle(&mut rng);
            let result = sequence(&port, "S", "E", input.clone())
                .await
                .expect("sequenced");

            assert_eq!(result.path.first().map(String::as_str), Some("S"));
            assert_eq!(result.path.last().map(String::as_str), Some("E"));
            let mut placed = result.stops.clone();
            placed.sort();
            input.sort();
            assert_eq!(placed, input);
            assert_eq!(result.calls.travel_time, count * (count + 1) / 2);
            assert_eq!(result.calls.geocode, count + 2);
            let logged = port.travel_log.lock().expect("log lock").len();
            assert_eq!(logged, result.calls.travel_time);
        }
    }
}
