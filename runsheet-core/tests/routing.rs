//! Resequencing fixture runs through a scripted travel port.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use runsheet_core::ingest::{read_grid, write_grid};
use runsheet_core::route::RouteError;
use runsheet_core::{Coordinate, IngestError, PortError, RunsheetService, ServiceError, TravelPort};

mod common;

/// Addresses sit on a line; driving between them takes the distance in seconds.
struct ScriptedPort {
    positions: HashMap<String, f64>,
}

impl ScriptedPort {
    fn new(positions: &[(&str, f64)]) -> Self {
        Self {
            positions: positions
                .iter()
                .map(|(address, position)| ((*address).to_owned(), *position))
                .collect(),
        }
    }

    fn without(mut self, address: &str) -> Self {
        self.positions.remove(address);
        self
    }
}

#[async_trait]
impl TravelPort for ScriptedPort {
    async fn geocode(&self, address: &str) -> Result<Coordinate, PortError> {
        self.positions
            .get(address)
            .map(|position| Coordinate::new(*position, 0.0))
            .ok_or_else(|| PortError::AddressNotFound(address.to_owned()))
    }

    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "scripted positions are small whole numbers"
    )]
    async fn travel_time(&self, from: Coordinate, to: Coordinate) -> Result<u64, PortError> {
        Ok((from.latitude - to.latitude).abs() as u64)
    }
}

fn berkeley() -> ScriptedPort {
    ScriptedPort::new(&[
        ("1158 San Pablo Ave, Berkeley", 0.0),
        ("6 Elm St, Berkeley", 1.0),
        ("5 Elm St, Berkeley", 5.0),
        ("12 Oak St, Berkeley", 6.0),
        ("1741 Shattuck Ave, Berkeley", 10.0),
        ("7 Elm St, Berkeley", 11.0),
        ("8 Elm St, Berkeley", 12.0),
        ("40 Pine St, Albany", 13.0),
    ])
}

#[tokio::test]
async fn resequence_reorders_blocks_and_reparses() {
    let catalog = common::catalog();
    let service = RunsheetService::new(Arc::new(berkeley()));
    let result = service
        .resequence(&common::grid("run-gen2.csv"), Some(&catalog))
        .await
        .expect("resequenced");

    assert_eq!(result.routes.len(), 2);
    let anne = &result.routes[0];
    assert_eq!(anne.username, "anne");
    assert_eq!(anne.order, vec![1, 0]);
    assert_eq!(anne.total_travel_seconds, 2);
    assert_eq!(anne.calls.geocode, 4);
    assert_eq!(anne.calls.travel_time, 3);
    assert_eq!(
        anne.navigation_url,
        "https://www.google.com/maps/dir/1823%20Solano%20Ave,%20Berkeley/1158%20San%20Pablo%20Ave,%20Berkeley/6%20Elm%20St,%20Berkeley/5%20Elm%20St,%20Berkeley/12%20Oak%20St,%20Berkeley"
    );

    let bob = &result.routes[1];
    assert_eq!(bob.order, vec![0, 1]);

    let reparsed = result.run.driver("anne").expect("anne");
    let usernames: Vec<&str> = reparsed
        .deliveries
        .iter()
        .map(|delivery| delivery.username.as_str())
        .collect();
    assert_eq!(usernames, vec!["cust6", "cust5"]);
    assert_eq!(reparsed.navigation_url, anne.navigation_url);
    assert_eq!(reparsed.block.header, 10);
    assert_eq!(result.grid.len(), common::grid("run-gen2.csv").len());
    assert_eq!(result.grid[12][3], "cust6");
    assert_eq!(result.grid[13][3], "cust5");
}

#[tokio::test]
async fn rewritten_grid_survives_csv_round_trip() {
    let catalog = common::catalog();
    let service = RunsheetService::new(Arc::new(berkeley()));
    let result = service
        .resequence(&common::grid("run-gen2.csv"), Some(&catalog))
        .await
        .expect("resequenced");

    let mut buffer = Vec::new();
    write_grid(&mut buffer, &result.grid).expect("written");
    let reread = read_grid(buffer.as_slice()).expect("read back");
    assert_eq!(reread, result.grid);
}

#[tokio::test]
async fn blank_home_address_is_a_missing_anchor() {
    let mut grid = common::grid("run-gen2.csv");
    for line in [18, 23] {
        common::set_cell(&mut grid, line, "Address", "");
        common::set_cell(&mut grid, line, "City", "");
    }
    let service = RunsheetService::new(Arc::new(berkeley()));
    let error = service
        .resequence(&grid, Some(&common::catalog()))
        .await
        .expect_err("bob has no home");
    assert!(
        matches!(
            &error,
            ServiceError::Route(RouteError::MissingAnchor { driver, anchor: "end" }) if driver == "bob"
        ),
        "{error:?}"
    );
}

#[tokio::test]
async fn geocoding_failure_names_the_address() {
    let service = RunsheetService::new(Arc::new(berkeley().without("8 Elm St, Berkeley")));
    let error = service
        .resequence(&common::grid("run-gen2.csv"), Some(&common::catalog()))
        .await
        .expect_err("unknown address");
    assert_eq!(
        error.to_string(),
        "could not geocode '8 Elm St, Berkeley': Address not found: 8 Elm St, Berkeley"
    );
}

#[tokio::test]
async fn invalid_run_is_rejected_before_routing() {
    let mut grid = common::grid("run-gen2.csv");
    grid.truncate(21);
    let service = RunsheetService::new(Arc::new(berkeley()));
    let error = service
        .resequence(&grid, Some(&common::catalog()))
        .await
        .expect_err("unterminated block");
    assert!(
        matches!(&error, ServiceError::Ingest(IngestError::Structural { line: 18, .. })),
        "{error:?}"
    );
}
