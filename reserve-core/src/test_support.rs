//! Deterministic provider doubles used by unit and behaviour tests.
//!
//! Each stub answers from data supplied up front and counts how often it was
//! asked, so tests can assert on cache hits and strategy escalation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use geo::Coord;

use crate::{
    Place, PlaceProvider, PlaceQuery, RouteProvider, RouteRequest, RouteResult, RouteSource,
    SearchStrategy, TrafficProvider, TrafficSeverity, TrafficSnapshot,
};

/// Provider returning one fixed route, traffic reading and place list.
///
/// Stands in for a full primary client: it implements every provider trait.
#[derive(Debug)]
pub struct StubRouteProvider {
    source: RouteSource,
    route: Option<RouteResult>,
    traffic: Option<TrafficSnapshot>,
    places: Vec<Place>,
    route_calls: AtomicUsize,
    traffic_calls: AtomicUsize,
    place_calls: AtomicUsize,
}

impl StubRouteProvider {
    /// Create a stub that returns nothing until configured.
    #[must_use]
    pub fn new(source: RouteSource) -> Self {
        Self {
            source,
            route: None,
            traffic: None,
            places: Vec::new(),
            route_calls: AtomicUsize::new(0),
            traffic_calls: AtomicUsize::new(0),
            place_calls: AtomicUsize::new(0),
        }
    }

    /// Answer every route request with `distance_km` and `duration_seconds`.
    #[must_use]
    pub fn with_route(self, distance_km: f64, duration_seconds: u64) -> Self {
        let route = RouteResult::new(self.source)
            .with_distance_km(distance_km)
            .with_duration_seconds(duration_seconds);
        self.with_result(route)
    }

    /// Answer every route request with `route`.
    #[must_use]
    pub fn with_result(mut self, route: RouteResult) -> Self {
        self.route = Some(route);
        self
    }

    /// Report `severity` at every location.
    #[must_use]
    pub fn with_traffic(mut self, severity: TrafficSeverity) -> Self {
        self.traffic = Some(TrafficSnapshot::new(severity));
        self
    }

    /// Answer every search with `places`.
    #[must_use]
    pub fn with_places(mut self, places: Vec<Place>) -> Self {
        self.places = places;
        self
    }

    /// Number of route requests served.
    #[must_use]
    pub fn route_calls(&self) -> usize {
        self.route_calls.load(Ordering::SeqCst)
    }

    /// Number of traffic requests served.
    #[must_use]
    pub fn traffic_calls(&self) -> usize {
        self.traffic_calls.load(Ordering::SeqCst)
    }

    /// Number of searches served.
    #[must_use]
    pub fn place_calls(&self) -> usize {
        self.place_calls.load(Ordering::SeqCst)
    }
}

impl RouteProvider for StubRouteProvider {
    fn fetch_route(&self, _request: &RouteRequest) -> Option<RouteResult> {
        self.route_calls.fetch_add(1, Ordering::SeqCst);
        self.route.clone()
    }
}

impl TrafficProvider for StubRouteProvider {
    fn fetch_traffic(&self, _location: Coord<f64>, _radius_km: f64) -> Option<TrafficSnapshot> {
        self.traffic_calls.fetch_add(1, Ordering::SeqCst);
        self.traffic
    }
}

impl PlaceProvider for StubRouteProvider {
    fn fetch_places(&self, query: &PlaceQuery) -> Vec<Place> {
        self.place_calls.fetch_add(1, Ordering::SeqCst);
        if query.strategy() == SearchStrategy::Exact {
            self.places.iter().take(query.limit()).cloned().collect()
        } else {
            Vec::new()
        }
    }
}

/// Traffic provider with readings pinned to exact coordinates.
#[derive(Debug, Default)]
pub struct StubTrafficProvider {
    readings: Vec<(Coord<f64>, TrafficSnapshot)>,
    calls: AtomicUsize,
}

impl StubTrafficProvider {
    /// Report `severity` at `location`.
    #[must_use]
    pub fn with_reading(self, location: Coord<f64>, severity: TrafficSeverity) -> Self {
        self.with_snapshot(location, TrafficSnapshot::new(severity))
    }

    /// Report `snapshot` at `location`.
    #[must_use]
    pub fn with_snapshot(mut self, location: Coord<f64>, snapshot: TrafficSnapshot) -> Self {
        self.readings.push((location, snapshot));
        self
    }

    /// Number of lookups served.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TrafficProvider for StubTrafficProvider {
    fn fetch_traffic(&self, location: Coord<f64>, _radius_km: f64) -> Option<TrafficSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.readings
            .iter()
            .find(|(at, _)| *at == location)
            .map(|(_, snapshot)| *snapshot)
    }
}

/// Place provider answering per search strategy.
#[derive(Debug, Default)]
pub struct StubPlaceProvider {
    results: HashMap<SearchStrategy, Vec<Place>>,
    calls: Mutex<HashMap<SearchStrategy, usize>>,
}

impl StubPlaceProvider {
    /// Return `places` for searches using `strategy`.
    #[must_use]
    pub fn with_results(mut self, strategy: SearchStrategy, places: Vec<Place>) -> Self {
        self.results.insert(strategy, places);
        self
    }

    /// Number of searches made with `strategy`.
    #[must_use]
    pub fn calls(&self, strategy: SearchStrategy) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&strategy)
            .copied()
            .unwrap_or(0)
    }

    /// Number of searches across all strategies.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }
}

impl PlaceProvider for StubPlaceProvider {
    fn fetch_places(&self, query: &PlaceQuery) -> Vec<Place> {
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(query.strategy())
            .or_default() += 1;
        self.results
            .get(&query.strategy())
            .map(|places| places.iter().take(query.limit()).cloned().collect())
            .unwrap_or_default()
    }
}
