//! Rewrite driver blocks of a run grid with a new delivery order.

use reqwest::Url;

use crate::ingest::Grid;
use crate::model::DeliveryRun;
use crate::route::RouteError;

const DIRECTIONS_BASE: &str = "https://www.google.com/maps/dir/";

#[derive(Debug, Clone, PartialEq, Eq)]
/// New delivery order for one driver block.
pub struct BlockOrder {
    /// Driver whose block is rewritten.
    pub username: String,
    /// Indices into the driver's deliveries, in visiting order.
    pub deliveries: Vec<usize>,
    /// Replacement for the navigation row's URL.
    pub navigation_url: String,
}

/// Google Maps directions URL through `addresses` in order.
///
/// # Errors
///
/// Returns [`RouteError::Navigation`] if the URL cannot be assembled.
pub fn navigation_url<S: AsRef<str>>(addresses: &[S]) -> Result<String, RouteError> {
    let mut url = Url::parse(DIRECTIONS_BASE).map_err(|err| RouteError::Navigation(err.to_string()))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|()| RouteError::Navigation(format!("{DIRECTIONS_BASE} cannot be a base")))?;
        segments.pop_if_empty();
        segments.extend(
            addresses
                .iter()
                .map(AsRef::as_ref)
                .filter(|address| !address.is_empty()),
        );
    }
    Ok(url.into())
}

/// Copy `grid` with each ordered driver block rebuilt as: opening header,
/// pickups in their original order, deliveries in the new order, closing
/// header and the navigation row carrying the new URL.
///
/// Blocks keep their length, so every other row stays on its line.
///
/// # Errors
///
/// Returns [`RouteError::Block`] when an order names an unknown driver, is not
/// a permutation of the driver's deliveries, or the block lines do not match `grid`.
pub fn rewrite_blocks(
    grid: &[Vec<String>],
    run: &DeliveryRun,
    orders: &[BlockOrder],
) -> Result<Grid, RouteError> {
    let mut rewritten = grid.to_vec();
    for order in orders {
        let fail = |message: String| RouteError::Block {
            driver: order.username.clone(),
            message,
        };
        let driver = run
            .driver(&order.username)
            .ok_or_else(|| fail("no such driver".to_owned()))?;

        let mut seen = vec![false; driver.deliveries.len()];
        for index in &order.deliveries {
            match seen.get_mut(*index) {
                Some(slot) if !*slot => *slot = true,
                _ => return Err(fail(format!("delivery index {index} is out of range or repeated"))),
            }
        }
        if seen.iter().any(|placed| !placed) {
            return Err(fail("order leaves deliveries out".to_owned()));
        }

        let row = |line: usize| {
            line.checked_sub(1)
                .and_then(|index| grid.get(index))
                .cloned()
                .ok_or_else(|| fail(format!("line {line} is outside the grid")))
        };
        let mut block = vec![row(driver.block.header)?];
        for pickup in &driver.pickups {
            block.push(row(pickup.line)?);
        }
        for index in &order.deliveries {
            if let Some(delivery) = driver.deliveries.get(*index) {
                block.push(row(delivery.line)?);
            }
        }
        block.push(row(driver.block.closing)?);
        let mut navigation = row(driver.block.navigation)?;
        if let Some(first) = navigation.first_mut() {
            first.clone_from(&order.navigation_url);
        }
        block.push(navigation);

        let start = driver.block.header - 1;
        let span = driver.block.navigation + 1 - driver.block.header;
        if block.len() != span {
            return Err(fail(format!(
                "block spans {span} rows but {} were rebuilt",
                block.len()
            )));
        }
        rewritten.splice(start..start + span, block);
        tracing::debug!(driver = %order.username, rows = span, "rewrote driver block");
    }
    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_url_escapes_each_address() {
        let url = navigation_url(&["1 Main St, Berkeley", "", "5 Elm St/B, Oakland"]).expect("url");
        assert_eq!(
            url,
            "https://www.google.com/maps/dir/1%20Main%20St,%20Berkeley/5%20Elm%20St%2FB,%20Oakland"
        );
    }
}
