//! Coordinate validation and straight-line distance helpers.
//!
//! Coordinates are WGS84 with `x = longitude` and `y = latitude`, matching
//! the `geo` convention used across the workspace.

use geo::{Coord, Distance, Haversine, Point};
use thiserror::Error;

/// Number of grid cells per degree used for cache keys.
///
/// Four decimal places is roughly eleven metres at the equator, which is
/// well inside the noise of a road-network ETA.
const GRID_CELLS_PER_DEGREE: f64 = 10_000.0;

/// Errors returned when a latitude/longitude pair is out of range.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CoordinateError {
    /// Latitude was outside `-90..=90` or not a number.
    #[error("latitude {0} is outside -90..=90")]
    Latitude(f64),
    /// Longitude was outside `-180..=180` or not a number.
    #[error("longitude {0} is outside -180..=180")]
    Longitude(f64),
}

/// Validate a latitude/longitude pair and convert it to a [`Coord`].
///
/// # Examples
/// ```
/// use reserve_core::coordinate;
///
/// let coord = coordinate(40.41, 49.87)?;
/// assert_eq!(coord.x, 49.87);
/// assert_eq!(coord.y, 40.41);
/// assert!(coordinate(91.0, 0.0).is_err());
/// # Ok::<(), reserve_core::CoordinateError>(())
/// ```
pub fn coordinate(lat: f64, lon: f64) -> Result<Coord<f64>, CoordinateError> {
    if !(-90.0..=90.0).contains(&lat) {
        return Err(CoordinateError::Latitude(lat));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(CoordinateError::Longitude(lon));
    }
    Ok(Coord { x: lon, y: lat })
}

/// Great-circle distance between two coordinates, in kilometres.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use reserve_core::haversine_km;
///
/// let a = Coord { x: 49.86, y: 40.40 };
/// let b = Coord { x: 49.87, y: 40.41 };
/// let km = haversine_km(a, b);
/// assert!(km > 1.3 && km < 1.5);
/// ```
#[must_use]
pub fn haversine_km(origin: Coord<f64>, destination: Coord<f64>) -> f64 {
    Haversine.distance(Point::from(origin), Point::from(destination)) / 1000.0
}

/// Snap a coordinate onto the cache grid.
///
/// Returns `(lat, lon)` cell indices so nearby lookups share a cache entry.
#[must_use]
pub fn grid_cell(coord: Coord<f64>) -> (i64, i64) {
    (quantise(coord.y), quantise(coord.x))
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "Validated coordinates scaled by 1e4 fit in i64"
)]
fn quantise(value: f64) -> i64 {
    (value * GRID_CELLS_PER_DEGREE).round() as i64
}
