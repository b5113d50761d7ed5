//! Provider traits implemented by the HTTP clients and the test doubles.
//!
//! Every method collapses upstream failures to "no result": `None` for
//! routes and traffic, an empty list for places. Failures are logged by the
//! implementation; callers only decide what to do without the data.

use geo::Coord;

use crate::place::{Place, PlaceQuery};
use crate::request::RouteRequest;
use crate::route::RouteResult;
use crate::traffic::TrafficSnapshot;

/// Fetch a single route between two coordinates.
///
/// # Examples
///
/// ```rust
/// use reserve_core::{RouteProvider, RouteRequest, RouteResult, RouteSource};
///
/// struct Crow;
///
/// impl RouteProvider for Crow {
///     fn fetch_route(&self, request: &RouteRequest) -> Option<RouteResult> {
///         let km = request.straight_line_km();
///         Some(
///             RouteResult::new(RouteSource::Secondary)
///                 .with_distance_km(km)
///                 .with_duration_seconds((km * 120.0) as u64),
///         )
///     }
/// }
///
/// let request = RouteRequest::new(40.40, 49.86, 40.41, 49.87)?;
/// assert!(Crow.fetch_route(&request).is_some());
/// # Ok::<(), reserve_core::CoordinateError>(())
/// ```
pub trait RouteProvider {
    /// Return a route for `request`, or `None` when none is available.
    fn fetch_route(&self, request: &RouteRequest) -> Option<RouteResult>;
}

/// Fetch a traffic observation around a coordinate.
pub trait TrafficProvider {
    /// Return the traffic near `location` within `radius_km`, or `None`.
    fn fetch_traffic(&self, location: Coord<f64>, radius_km: f64) -> Option<TrafficSnapshot>;
}

/// Geocode free-text queries.
pub trait PlaceProvider {
    /// Return up to `query.limit()` places matching `query`.
    fn fetch_places(&self, query: &PlaceQuery) -> Vec<Place>;
}

impl<T: RouteProvider + ?Sized> RouteProvider for &T {
    fn fetch_route(&self, request: &RouteRequest) -> Option<RouteResult> {
        (**self).fetch_route(request)
    }
}

impl<T: TrafficProvider + ?Sized> TrafficProvider for &T {
    fn fetch_traffic(&self, location: Coord<f64>, radius_km: f64) -> Option<TrafficSnapshot> {
        (**self).fetch_traffic(location, radius_km)
    }
}

impl<T: PlaceProvider + ?Sized> PlaceProvider for &T {
    fn fetch_places(&self, query: &PlaceQuery) -> Vec<Place> {
        (**self).fetch_places(query)
    }
}

impl<T: RouteProvider + ?Sized> RouteProvider for Box<T> {
    fn fetch_route(&self, request: &RouteRequest) -> Option<RouteResult> {
        (**self).fetch_route(request)
    }
}

impl<T: TrafficProvider + ?Sized> TrafficProvider for Box<T> {
    fn fetch_traffic(&self, location: Coord<f64>, radius_km: f64) -> Option<TrafficSnapshot> {
        (**self).fetch_traffic(location, radius_km)
    }
}

impl<T: PlaceProvider + ?Sized> PlaceProvider for Box<T> {
    fn fetch_places(&self, query: &PlaceQuery) -> Vec<Place> {
        (**self).fetch_places(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    use crate::test_support::StubRouteProvider;
    use crate::{RouteSource, TrafficSeverity};

    #[rstest]
    fn references_forward_to_the_provider() {
        let stub = StubRouteProvider::new(RouteSource::Primary)
            .with_route(5.2, 600)
            .with_traffic(TrafficSeverity::Moderate);
        let by_ref = &stub;
        let request = RouteRequest::new(40.40, 49.86, 40.41, 49.87).expect("valid");

        let route = by_ref.fetch_route(&request).expect("route");
        assert_eq!(route.duration_seconds(), Some(600));
        let traffic = by_ref
            .fetch_traffic(request.origin(), 2.0)
            .expect("traffic");
        assert_eq!(traffic.severity(), TrafficSeverity::Moderate);
        assert_eq!(stub.route_calls(), 1);
    }

    #[rstest]
    fn boxed_providers_forward_to_the_provider() {
        let boxed: Box<dyn PlaceProvider> = Box::new(
            StubRouteProvider::new(RouteSource::Secondary).with_places(Vec::new()),
        );
        let query = PlaceQuery::new("Flame Towers", 3).expect("valid query");

        assert!(boxed.fetch_places(&query).is_empty());
    }
}
