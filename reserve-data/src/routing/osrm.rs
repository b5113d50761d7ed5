//! OSRM API response types for the Route service.
//!
//! This module provides deserialisation types for the OSRM Route API response
//! format, requested with `overview=full&geometries=geojson`.
//!
//! See: <http://project-osrm.org/docs/v5.24.0/api/#route-service>

use serde::Deserialize;

/// OSRM Route API response.
///
/// The response contains one or more routes on success or an error message
/// on failure. The `code` field indicates the response status.
#[derive(Debug, Deserialize)]
pub struct RouteResponse {
    /// Status code from OSRM.
    ///
    /// Common values:
    /// - `"Ok"` - Request was successful
    /// - `"NoRoute"` - No route between the coordinates
    /// - `"InvalidQuery"` - Invalid query parameters
    pub code: String,

    /// Optional error message when `code` is not `"Ok"`.
    pub message: Option<String>,

    /// Candidate routes, best first.
    #[serde(default)]
    pub routes: Vec<Route>,
}

impl RouteResponse {
    /// Check if the response indicates success.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == "Ok"
    }
}

/// A single OSRM route.
#[derive(Debug, Deserialize)]
pub struct Route {
    /// Length in metres.
    pub distance: Option<f64>,
    /// Travel time in seconds.
    pub duration: Option<f64>,
    /// Full route geometry.
    pub geometry: Option<LineString>,
}

/// GeoJSON line geometry with `[lon, lat]` positions.
#[derive(Debug, Deserialize)]
pub struct LineString {
    /// Positions along the route.
    #[serde(default)]
    pub coordinates: Vec<Vec<f64>>,
}
