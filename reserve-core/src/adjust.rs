//! Turn a reconciled route and a traffic reading into a buffered ETA.
//!
//! Traffic only ever lengthens the estimate: delay factors below `1.0` are
//! rejected when the configuration is built, and buffers are added on top.

use geo::Coord;

use crate::error::ConfigError;
use crate::eta::EtaComputation;
use crate::provider::TrafficProvider;
use crate::reconcile::ReconciledRoute;
use crate::traffic::TrafficSeverity;

/// Default radius around each endpoint used for traffic lookups.
pub const DEFAULT_TRAFFIC_RADIUS_KM: f64 = 2.0;
/// Default extra minutes added under heavy or severe traffic.
pub const DEFAULT_HEAVY_BUFFER_MINUTES: u64 = 5;

/// Multipliers applied to the base duration per traffic severity.
///
/// # Examples
/// ```
/// use reserve_core::{DelayFactors, TrafficSeverity};
///
/// let factors = DelayFactors::default();
/// assert_eq!(factors.factor_for(TrafficSeverity::Heavy), 1.3);
/// assert_eq!(factors.factor_for(TrafficSeverity::Unknown), 1.0);
/// assert!(DelayFactors::new(1.0, 0.9, 1.3, 1.5).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayFactors {
    smooth: f64,
    moderate: f64,
    heavy: f64,
    severe: f64,
}

impl Default for DelayFactors {
    fn default() -> Self {
        Self {
            smooth: 1.0,
            moderate: 1.15,
            heavy: 1.3,
            severe: 1.5,
        }
    }
}

impl DelayFactors {
    /// Build a table from per-severity multipliers.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DelayFactor`] for any factor below `1.0` or
    /// not finite.
    pub fn new(smooth: f64, moderate: f64, heavy: f64, severe: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            smooth: check_factor(TrafficSeverity::Smooth, smooth)?,
            moderate: check_factor(TrafficSeverity::Moderate, moderate)?,
            heavy: check_factor(TrafficSeverity::Heavy, heavy)?,
            severe: check_factor(TrafficSeverity::Severe, severe)?,
        })
    }

    /// Multiplier for `severity`; `1.0` when the severity is unknown.
    #[must_use]
    pub const fn factor_for(&self, severity: TrafficSeverity) -> f64 {
        match severity {
            TrafficSeverity::Unknown => 1.0,
            TrafficSeverity::Smooth => self.smooth,
            TrafficSeverity::Moderate => self.moderate,
            TrafficSeverity::Heavy => self.heavy,
            TrafficSeverity::Severe => self.severe,
        }
    }
}

fn check_factor(severity: TrafficSeverity, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value >= 1.0 {
        Ok(value)
    } else {
        Err(ConfigError::DelayFactor {
            severity: severity.as_str(),
            value,
        })
    }
}

/// Settings for the ETA adjuster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EtaConfig {
    traffic_enabled: bool,
    traffic_radius_km: f64,
    delay_factors: DelayFactors,
    buffer_minutes: u64,
    heavy_buffer_minutes: u64,
}

impl Default for EtaConfig {
    fn default() -> Self {
        Self {
            traffic_enabled: true,
            traffic_radius_km: DEFAULT_TRAFFIC_RADIUS_KM,
            delay_factors: DelayFactors::default(),
            buffer_minutes: 0,
            heavy_buffer_minutes: DEFAULT_HEAVY_BUFFER_MINUTES,
        }
    }
}

impl EtaConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable traffic lookups.
    #[must_use]
    pub const fn with_traffic_enabled(mut self, enabled: bool) -> Self {
        self.traffic_enabled = enabled;
        self
    }

    /// Set the lookup radius around each endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TrafficRadius`] unless `radius_km` is a positive
    /// finite number.
    pub fn with_traffic_radius_km(mut self, radius_km: f64) -> Result<Self, ConfigError> {
        if !(radius_km.is_finite() && radius_km > 0.0) {
            return Err(ConfigError::TrafficRadius(radius_km));
        }
        self.traffic_radius_km = radius_km;
        Ok(self)
    }

    /// Replace the delay factor table.
    #[must_use]
    pub const fn with_delay_factors(mut self, factors: DelayFactors) -> Self {
        self.delay_factors = factors;
        self
    }

    /// Set the fixed buffer and the extra buffer for heavy or severe traffic.
    #[must_use]
    pub const fn with_buffers(mut self, buffer_minutes: u64, heavy_buffer_minutes: u64) -> Self {
        self.buffer_minutes = buffer_minutes;
        self.heavy_buffer_minutes = heavy_buffer_minutes;
        self
    }

    /// Whether traffic is consulted.
    #[must_use]
    pub const fn traffic_enabled(&self) -> bool {
        self.traffic_enabled
    }

    /// Lookup radius in kilometres.
    #[must_use]
    pub const fn traffic_radius_km(&self) -> f64 {
        self.traffic_radius_km
    }

    /// Delay factor table.
    #[must_use]
    pub const fn delay_factors(&self) -> DelayFactors {
        self.delay_factors
    }

    /// Minutes always added to the ETA.
    #[must_use]
    pub const fn buffer_minutes(&self) -> u64 {
        self.buffer_minutes
    }

    /// Minutes added on top under heavy or severe traffic.
    #[must_use]
    pub const fn heavy_buffer_minutes(&self) -> u64 {
        self.heavy_buffer_minutes
    }
}

/// What the traffic lookup produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficObservation {
    /// Traffic was disabled.
    NotAttempted,
    /// Traffic was requested but neither endpoint produced a severity.
    NoSignal,
    /// The worse severity of the two endpoints.
    Observed(TrafficSeverity),
}

/// Look up traffic at both endpoints and keep the worse reading.
///
/// Each endpoint is fetched independently; one failing does not discard the
/// other.
pub fn observe_traffic<T>(
    provider: &T,
    origin: Coord<f64>,
    destination: Coord<f64>,
    radius_km: f64,
) -> TrafficObservation
where
    T: TrafficProvider + ?Sized,
{
    let origin_reading = provider.fetch_traffic(origin, radius_km);
    let destination_reading = provider.fetch_traffic(destination, radius_km);
    if origin_reading.is_none() && destination_reading.is_none() {
        log::warn!("traffic unavailable at both endpoints; continuing with base ETA");
    }
    let worst = [origin_reading, destination_reading]
        .into_iter()
        .flatten()
        .map(|snapshot| snapshot.severity())
        .max()
        .unwrap_or_default();
    if worst == TrafficSeverity::Unknown {
        TrafficObservation::NoSignal
    } else {
        TrafficObservation::Observed(worst)
    }
}

/// Compose the caller-facing ETA from a reconciled route.
///
/// Returns `None` when the route carries no duration.
///
/// # Examples
/// ```
/// use reserve_core::{
///     EtaConfig, ReconcileConfig, RouteResult, RouteSource, TrafficObservation,
///     TrafficSeverity, compose_eta, reconcile,
/// };
///
/// let route = RouteResult::new(RouteSource::Primary)
///     .with_distance_km(5.2)
///     .with_duration_seconds(600);
/// let chosen = reconcile(Some(&route), None, 4.0, &ReconcileConfig::default()).expect("route");
/// let eta = compose_eta(
///     &chosen,
///     TrafficObservation::Observed(TrafficSeverity::Heavy),
///     &EtaConfig::default(),
/// )
/// .expect("duration present");
///
/// assert_eq!(eta.typical_eta_minutes, Some(10));
/// assert_eq!(eta.traffic_delay_minutes, Some(3));
/// assert_eq!(eta.eta_minutes, 18); // 13 traffic-adjusted + 5 heavy buffer
/// ```
#[must_use]
pub fn compose_eta(
    chosen: &ReconciledRoute,
    observation: TrafficObservation,
    config: &EtaConfig,
) -> Option<EtaComputation> {
    let base_seconds = chosen.route.duration_seconds()?.max(1);
    let typical_minutes = minutes_ceil(base_seconds);

    let (condition, delay_minutes, mut eta_seconds) = match observation {
        TrafficObservation::NotAttempted => (None, None, base_seconds),
        TrafficObservation::NoSignal => (Some(TrafficSeverity::Unknown), None, base_seconds),
        TrafficObservation::Observed(severity) => {
            let factor = config.delay_factors.factor_for(severity);
            #[expect(
                clippy::cast_possible_truncation,
                reason = "Factors are finite and at least 1.0 so the product is positive seconds"
            )]
            let adjusted = ((base_seconds as f64) * factor).round() as u64;
            let adjusted = adjusted.max(base_seconds);
            let delay = (adjusted - base_seconds).div_ceil(60);
            if delay > 0 {
                log::info!(
                    "traffic adjustment: {severity} condition adds {delay} min to {typical_minutes} min base"
                );
            }
            (Some(severity), Some(delay), adjusted)
        }
    };
    let mut eta_minutes = minutes_ceil(eta_seconds);

    let mut buffer = config.buffer_minutes;
    if condition.is_some_and(TrafficSeverity::is_congested) {
        buffer = buffer.saturating_add(config.heavy_buffer_minutes);
    }
    eta_minutes = eta_minutes.saturating_add(buffer);
    eta_seconds = eta_seconds.saturating_add(buffer.saturating_mul(60));

    Some(EtaComputation {
        eta_minutes,
        eta_seconds,
        route_distance_km: chosen.route.distance_km(),
        typical_eta_minutes: Some(typical_minutes),
        traffic_condition: condition,
        traffic_delay_minutes: delay_minutes,
        route_summary: chosen.route.notice().map(str::to_owned),
        route_geometry: chosen.route.geometry().map(<[_]>::to_vec),
        provider: chosen.provider,
        calibration_note: chosen.calibration_note.clone(),
    })
}

fn minutes_ceil(seconds: u64) -> u64 {
    seconds.div_ceil(60).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::{RouteResult, RouteSource};
    use crate::test_support::StubTrafficProvider;
    use rstest::{fixture, rstest};

    fn chosen(seconds: u64) -> ReconciledRoute {
        ReconciledRoute {
            route: RouteResult::new(RouteSource::Primary)
                .with_distance_km(5.2)
                .with_duration_seconds(seconds)
                .with_notice("Ideal"),
            provider: RouteSource::Primary,
            calibration_note: None,
            blended: false,
        }
    }

    #[fixture]
    fn config() -> EtaConfig {
        EtaConfig::default()
    }

    #[rstest]
    fn not_attempted_keeps_base(config: EtaConfig) {
        let eta = compose_eta(&chosen(610), TrafficObservation::NotAttempted, &config)
            .expect("duration");
        assert_eq!(eta.eta_seconds, 610);
        assert_eq!(eta.eta_minutes, 11);
        assert_eq!(eta.typical_eta_minutes, Some(11));
        assert_eq!(eta.traffic_condition, None);
        assert_eq!(eta.traffic_delay_minutes, None);
        assert_eq!(eta.route_summary.as_deref(), Some("Ideal"));
    }

    #[rstest]
    fn no_signal_reports_unknown(config: EtaConfig) {
        let eta = compose_eta(&chosen(600), TrafficObservation::NoSignal, &config)
            .expect("duration");
        assert_eq!(eta.traffic_condition, Some(TrafficSeverity::Unknown));
        assert_eq!(eta.eta_seconds, 600);
    }

    #[rstest]
    #[case(TrafficSeverity::Smooth, 600, 10, 0)]
    #[case(TrafficSeverity::Moderate, 690, 12, 2)]
    #[case(TrafficSeverity::Heavy, 780 + 300, 13 + 5, 3)]
    #[case(TrafficSeverity::Severe, 900 + 300, 15 + 5, 5)]
    fn applies_delay_factors(
        config: EtaConfig,
        #[case] severity: TrafficSeverity,
        #[case] seconds: u64,
        #[case] minutes: u64,
        #[case] delay: u64,
    ) {
        let eta = compose_eta(&chosen(600), TrafficObservation::Observed(severity), &config)
            .expect("duration");
        assert_eq!(eta.eta_seconds, seconds);
        assert_eq!(eta.eta_minutes, minutes);
        assert_eq!(eta.traffic_delay_minutes, Some(delay));
        assert_eq!(eta.typical_eta_minutes, Some(10));
    }

    #[rstest]
    fn fixed_buffer_is_always_added() {
        let config = EtaConfig::default()
            .with_traffic_enabled(false)
            .with_buffers(3, 5);
        let eta = compose_eta(&chosen(600), TrafficObservation::NotAttempted, &config)
            .expect("duration");
        assert_eq!(eta.eta_seconds, 600 + 180);
        assert_eq!(eta.eta_minutes, 13);
    }

    #[rstest]
    fn missing_duration_yields_nothing(config: EtaConfig) {
        let chosen = ReconciledRoute {
            route: RouteResult::new(RouteSource::Secondary).with_distance_km(3.0),
            provider: RouteSource::Secondary,
            calibration_note: None,
            blended: false,
        };
        assert!(compose_eta(&chosen, TrafficObservation::NotAttempted, &config).is_none());
    }

    #[rstest]
    fn worst_endpoint_wins() {
        let origin = Coord { x: 49.86, y: 40.40 };
        let destination = Coord { x: 49.87, y: 40.41 };
        let provider = StubTrafficProvider::default()
            .with_reading(origin, TrafficSeverity::Moderate)
            .with_reading(destination, TrafficSeverity::Severe);
        assert_eq!(
            observe_traffic(&provider, origin, destination, 2.0),
            TrafficObservation::Observed(TrafficSeverity::Severe)
        );
        assert_eq!(provider.calls(), 2);
    }

    #[rstest]
    fn one_missing_endpoint_keeps_the_other() {
        let origin = Coord { x: 49.86, y: 40.40 };
        let destination = Coord { x: 49.87, y: 40.41 };
        let provider =
            StubTrafficProvider::default().with_reading(destination, TrafficSeverity::Heavy);
        assert_eq!(
            observe_traffic(&provider, origin, destination, 2.0),
            TrafficObservation::Observed(TrafficSeverity::Heavy)
        );
    }

    #[rstest]
    fn silent_provider_is_no_signal() {
        let provider = StubTrafficProvider::default();
        let point = Coord { x: 0.0, y: 0.0 };
        assert_eq!(
            observe_traffic(&provider, point, point, 2.0),
            TrafficObservation::NoSignal
        );
    }

    #[rstest]
    fn rejects_non_positive_radius() {
        assert_eq!(
            EtaConfig::default().with_traffic_radius_km(0.0),
            Err(ConfigError::TrafficRadius(0.0))
        );
    }
}
