//! The ETA aggregate handed back to callers.

use geo::Coord;

use crate::route::RouteSource;
use crate::traffic::TrafficSeverity;

/// A fully composed arrival estimate.
///
/// `eta_seconds` never falls below `typical_eta_minutes * 60` minus the
/// sub-minute rounding of the base duration: traffic and buffers only add
/// time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EtaComputation {
    /// Final ETA in whole minutes, at least one.
    pub eta_minutes: u64,
    /// Final ETA in seconds, at least one.
    pub eta_seconds: u64,
    /// Road distance of the chosen route.
    pub route_distance_km: Option<f64>,
    /// Baseline minutes before traffic and buffers.
    pub typical_eta_minutes: Option<u64>,
    /// Observed traffic, `None` when traffic was not consulted.
    pub traffic_condition: Option<TrafficSeverity>,
    /// Minutes added by traffic, reported once a severity was observed.
    pub traffic_delay_minutes: Option<u64>,
    /// Provider notice describing the route.
    pub route_summary: Option<String>,
    /// Polyline of the chosen route.
    pub route_geometry: Option<Vec<Coord<f64>>>,
    /// Source that won reconciliation.
    pub provider: RouteSource,
    /// Why the primary provider was overridden, if it was.
    pub calibration_note: Option<String>,
}

/// Synthesise a least-confidence ETA from a straight-line distance and a
/// caller-chosen travel time.
///
/// # Examples
/// ```
/// use reserve_core::{RouteSource, build_fallback_eta};
///
/// let eta = build_fallback_eta(3.14159, 12);
/// assert_eq!(eta.eta_minutes, 12);
/// assert_eq!(eta.eta_seconds, 720);
/// assert_eq!(eta.route_distance_km, Some(3.14));
/// assert_eq!(eta.provider, RouteSource::Fallback);
/// ```
#[must_use]
pub fn build_fallback_eta(distance_km: f64, fallback_minutes: u64) -> EtaComputation {
    let minutes = fallback_minutes.max(1);
    EtaComputation {
        eta_minutes: minutes,
        eta_seconds: minutes.saturating_mul(60),
        route_distance_km: (distance_km.is_finite() && distance_km >= 0.0)
            .then(|| (distance_km * 100.0).round() / 100.0),
        typical_eta_minutes: Some(minutes),
        traffic_condition: None,
        traffic_delay_minutes: None,
        route_summary: None,
        route_geometry: None,
        provider: RouteSource::Fallback,
        calibration_note: None,
    }
}

/// Minutes needed to cover `distance_km` at `speed_kmh`, rounded up.
///
/// Returns at least one minute. A non-positive speed yields one minute per
/// kilometre rather than dividing by zero.
///
/// # Examples
/// ```
/// use reserve_core::fallback_minutes_for;
///
/// assert_eq!(fallback_minutes_for(5.0, 25.0), 12);
/// assert_eq!(fallback_minutes_for(0.0, 25.0), 1);
/// ```
#[must_use]
pub fn fallback_minutes_for(distance_km: f64, speed_kmh: f64) -> u64 {
    let distance = if distance_km.is_finite() { distance_km.max(0.0) } else { 0.0 };
    let speed = if speed_kmh.is_finite() && speed_kmh > 0.0 { speed_kmh } else { 60.0 };
    let minutes = (distance / speed * 60.0).ceil();
    #[expect(
        clippy::cast_possible_truncation,
        reason = "Saturating cast of a whole, non-negative minute count"
    )]
    let minutes = minutes as u64;
    minutes.max(1)
}
