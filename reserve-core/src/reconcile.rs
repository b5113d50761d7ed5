//! Choose or blend between the primary and secondary route.
//!
//! The straight-line distance between origin and destination serves as a
//! sanity baseline. A provider whose road distance strays too far from it,
//! while the other provider does not, is treated as implausible. When both
//! stray (dense street grids, rivers, one-way systems) the providers are
//! compared with each other instead.

use crate::error::ConfigError;
use crate::route::{RouteResult, RouteSource};

/// Default tolerated deviation from the straight-line distance.
pub const DEFAULT_HAVERSINE_TOLERANCE: f64 = 0.35;
/// Default tolerated disagreement between the two providers.
pub const DEFAULT_DISTANCE_TOLERANCE: f64 = 0.25;

// Floor for denominators, in kilometres.
const EPSILON_KM: f64 = 0.001;

/// Tolerances used by [`reconcile`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcileConfig {
    haversine_tolerance: f64,
    distance_tolerance: f64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            haversine_tolerance: DEFAULT_HAVERSINE_TOLERANCE,
            distance_tolerance: DEFAULT_DISTANCE_TOLERANCE,
        }
    }
}

impl ReconcileConfig {
    /// Build a configuration from relative tolerances.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Tolerance`] when either ratio is negative or
    /// not finite.
    pub fn new(haversine_tolerance: f64, distance_tolerance: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            haversine_tolerance: check_tolerance("haversine tolerance", haversine_tolerance)?,
            distance_tolerance: check_tolerance("distance tolerance", distance_tolerance)?,
        })
    }

    /// Tolerated relative deviation from the straight-line distance.
    #[must_use]
    pub const fn haversine_tolerance(&self) -> f64 {
        self.haversine_tolerance
    }

    /// Tolerated relative disagreement between providers.
    #[must_use]
    pub const fn distance_tolerance(&self) -> f64 {
        self.distance_tolerance
    }
}

fn check_tolerance(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::Tolerance { name, value })
    }
}

/// The route chosen by [`reconcile`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledRoute {
    /// Winning route, gap-filled from the other provider.
    pub route: RouteResult,
    /// Provider credited with the route.
    pub provider: RouteSource,
    /// Why the primary provider was overridden.
    pub calibration_note: Option<String>,
    /// Whether the duration is the mean of both providers.
    pub blended: bool,
}

/// Relative deviation of `distance_km` from the straight-line baseline.
///
/// Returns `None` when either distance is missing or the baseline is zero.
#[must_use]
pub fn relative_deviation(distance_km: Option<f64>, haversine_km: f64) -> Option<f64> {
    let distance = distance_km?;
    if !(haversine_km.is_finite() && haversine_km > 0.0) {
        return None;
    }
    Some((distance - haversine_km).abs() / haversine_km.max(EPSILON_KM))
}

/// Pick the base route from two optional provider results.
///
/// Rules, first match wins:
/// 1. Neither result: `None`. One result: it wins unchanged.
/// 2. Primary strays from the baseline and secondary does not: secondary.
/// 3. Providers disagree beyond the distance tolerance and secondary is
///    shorter: secondary.
/// 4. Otherwise primary; when the providers agree and both report a
///    duration, the duration is their mean.
///
/// Missing distance, duration, geometry or notice on the winner is then
/// filled from the other result.
///
/// # Examples
/// ```
/// use reserve_core::{ReconcileConfig, RouteResult, RouteSource, reconcile};
///
/// let primary = RouteResult::new(RouteSource::Primary)
///     .with_distance_km(15.0)
///     .with_duration_seconds(1_500);
/// let secondary = RouteResult::new(RouteSource::Secondary)
///     .with_distance_km(10.2)
///     .with_duration_seconds(1_020);
///
/// let chosen = reconcile(Some(&primary), Some(&secondary), 10.0, &ReconcileConfig::default())
///     .expect("a route");
/// assert_eq!(chosen.provider, RouteSource::Secondary);
/// assert!(chosen.calibration_note.is_some());
/// ```
#[must_use]
pub fn reconcile(
    primary: Option<&RouteResult>,
    secondary: Option<&RouteResult>,
    haversine_km: f64,
    config: &ReconcileConfig,
) -> Option<ReconciledRoute> {
    match (primary, secondary) {
        (None, None) => None,
        (Some(only), None) | (None, Some(only)) => Some(ReconciledRoute {
            route: only.clone(),
            provider: only.source(),
            calibration_note: None,
            blended: false,
        }),
        (Some(primary), Some(secondary)) => {
            Some(choose(primary, secondary, haversine_km, config))
        }
    }
}

fn choose(
    primary: &RouteResult,
    secondary: &RouteResult,
    haversine_km: f64,
    config: &ReconcileConfig,
) -> ReconciledRoute {
    let (Some(primary_km), Some(secondary_km)) = (primary.distance_km(), secondary.distance_km())
    else {
        return finish(primary, secondary, None, false);
    };

    let strays = |route: &RouteResult| {
        relative_deviation(route.distance_km(), haversine_km)
            .is_some_and(|deviation| deviation > config.haversine_tolerance)
    };
    if strays(primary) && !strays(secondary) {
        log::info!(
            "primary distance {primary_km:.2} km implausible against {haversine_km:.2} km straight line; using secondary"
        );
        let note = "calibrated via secondary provider (primary distance implausible)";
        return finish(secondary, primary, Some(note.to_owned()), false);
    }

    let delta = (primary_km - secondary_km).abs() / secondary_km.max(EPSILON_KM);
    if delta > config.distance_tolerance && secondary_km < primary_km {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "Whole percent of a finite, non-negative delta"
        )]
        let percent = (delta * 100.0) as u64;
        log::info!("providers disagree by {percent}%; using shorter secondary route");
        let note = format!("calibrated via secondary provider (Δ{percent}%)");
        return finish(secondary, primary, Some(note), false);
    }

    if delta <= config.distance_tolerance {
        if let (Some(a), Some(b)) = (primary.duration_seconds(), secondary.duration_seconds()) {
            let mut blended = RouteResult::new(RouteSource::Primary)
                .with_distance_km(primary_km)
                .with_duration_seconds(mean_half_even(a, b));
            if let Some(points) = primary.geometry() {
                blended = blended.with_geometry(points.to_vec());
            }
            if let Some(notice) = primary.notice() {
                blended = blended.with_notice(notice);
            }
            return finish(&blended, secondary, None, true);
        }
    }

    finish(primary, secondary, None, false)
}

/// Integer mean of two durations; a half second rounds to the even value.
fn mean_half_even(a: u64, b: u64) -> u64 {
    let sum = a.saturating_add(b);
    let half = sum / 2;
    if sum % 2 == 1 && half % 2 == 1 { half + 1 } else { half }
}

fn finish(
    winner: &RouteResult,
    other: &RouteResult,
    calibration_note: Option<String>,
    blended: bool,
) -> ReconciledRoute {
    let mut route = winner.clone();
    if route.distance_km().is_none() {
        if let Some(km) = other.distance_km() {
            route = route.with_distance_km(km);
        }
    }
    if route.duration_seconds().is_none() {
        if let Some(seconds) = other.duration_seconds() {
            route = route.with_duration_seconds(seconds);
        }
    }
    if route.geometry().is_none() {
        if let Some(points) = other.geometry() {
            route = route.with_geometry(points.to_vec());
        }
    }
    if route.notice().is_none() {
        if let Some(notice) = other.notice() {
            route = route.with_notice(notice);
        }
    }
    ReconciledRoute {
        provider: winner.source(),
        route,
        calibration_note,
        blended,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;
    use rstest::{fixture, rstest};

    fn route(source: RouteSource, km: f64, seconds: u64) -> RouteResult {
        RouteResult::new(source)
            .with_distance_km(km)
            .with_duration_seconds(seconds)
    }

    #[fixture]
    fn config() -> ReconcileConfig {
        ReconcileConfig::default()
    }

    #[rstest]
    fn nothing_in_nothing_out(config: ReconcileConfig) {
        assert!(reconcile(None, None, 3.0, &config).is_none());
    }

    #[rstest]
    #[case(RouteSource::Primary)]
    #[case(RouteSource::Secondary)]
    fn single_result_wins_alone(config: ReconcileConfig, #[case] source: RouteSource) {
        let only = route(source, 5.0, 600);
        let (p, s) = match source {
            RouteSource::Primary => (Some(&only), None),
            _ => (None, Some(&only)),
        };
        let chosen = reconcile(p, s, 4.0, &config).expect("route");
        assert_eq!(chosen.provider, source);
        assert_eq!(chosen.route, only);
        assert!(chosen.calibration_note.is_none());
    }

    #[rstest]
    fn implausible_primary_defers_to_secondary(config: ReconcileConfig) {
        let primary = route(RouteSource::Primary, 15.0, 1_500);
        let secondary = route(RouteSource::Secondary, 10.2, 1_020);
        let chosen = reconcile(Some(&primary), Some(&secondary), 10.0, &config).expect("route");
        assert_eq!(chosen.provider, RouteSource::Secondary);
        assert_eq!(chosen.route.distance_km(), Some(10.2));
        assert_eq!(
            chosen.calibration_note.as_deref(),
            Some("calibrated via secondary provider (primary distance implausible)")
        );
    }

    #[rstest]
    fn shorter_disagreeing_secondary_wins_with_delta(config: ReconcileConfig) {
        // Both stray from a 1 km baseline, so the providers are compared.
        let primary = route(RouteSource::Primary, 10.0, 1_100);
        let secondary = route(RouteSource::Secondary, 5.0, 700);
        let chosen = reconcile(Some(&primary), Some(&secondary), 1.0, &config).expect("route");
        assert_eq!(chosen.provider, RouteSource::Secondary);
        assert_eq!(
            chosen.calibration_note.as_deref(),
            Some("calibrated via secondary provider (Δ100%)")
        );
    }

    #[rstest]
    fn longer_disagreeing_secondary_loses(config: ReconcileConfig) {
        let primary = route(RouteSource::Primary, 5.0, 600);
        let secondary = route(RouteSource::Secondary, 9.0, 900);
        let chosen = reconcile(Some(&primary), Some(&secondary), 1.0, &config).expect("route");
        assert_eq!(chosen.provider, RouteSource::Primary);
        assert_eq!(chosen.route.duration_seconds(), Some(600));
        assert!(!chosen.blended);
    }

    #[rstest]
    fn agreeing_providers_are_blended(config: ReconcileConfig) {
        let primary = route(RouteSource::Primary, 5.2, 600).with_notice("via Neftchilar");
        let secondary = route(RouteSource::Secondary, 5.3, 620);
        let chosen = reconcile(Some(&primary), Some(&secondary), 1.3, &config).expect("route");
        assert_eq!(chosen.provider, RouteSource::Primary);
        assert!(chosen.blended);
        assert_eq!(chosen.route.duration_seconds(), Some(610));
        assert_eq!(chosen.route.distance_km(), Some(5.2));
        assert_eq!(chosen.route.notice(), Some("via Neftchilar"));
        assert!(chosen.calibration_note.is_none());
    }

    #[rstest]
    #[case(601, 600, 600)]
    #[case(603, 600, 602)]
    #[case(720, 620, 670)]
    fn blended_mean_rounds_half_to_even(
        config: ReconcileConfig,
        #[case] primary_seconds: u64,
        #[case] secondary_seconds: u64,
        #[case] expected: u64,
    ) {
        let primary = route(RouteSource::Primary, 5.0, primary_seconds);
        let secondary = route(RouteSource::Secondary, 5.0, secondary_seconds);
        let chosen = reconcile(Some(&primary), Some(&secondary), 4.0, &config).expect("route");
        assert_eq!(chosen.route.duration_seconds(), Some(expected));
    }

    #[rstest]
    fn missing_distance_keeps_primary_and_fills_gaps(config: ReconcileConfig) {
        let primary = RouteResult::new(RouteSource::Primary).with_duration_seconds(700);
        let geometry = vec![Coord { x: 49.86, y: 40.40 }, Coord { x: 49.87, y: 40.41 }];
        let secondary = route(RouteSource::Secondary, 5.3, 620).with_geometry(geometry.clone());
        let chosen = reconcile(Some(&primary), Some(&secondary), 1.3, &config).expect("route");
        assert_eq!(chosen.provider, RouteSource::Primary);
        assert_eq!(chosen.route.duration_seconds(), Some(700));
        assert_eq!(chosen.route.distance_km(), Some(5.3));
        assert_eq!(chosen.route.geometry(), Some(geometry.as_slice()));
    }

    #[rstest]
    fn zero_baseline_compares_providers_only(config: ReconcileConfig) {
        let primary = route(RouteSource::Primary, 0.4, 90);
        let secondary = route(RouteSource::Secondary, 0.41, 100);
        let chosen = reconcile(Some(&primary), Some(&secondary), 0.0, &config).expect("route");
        assert_eq!(chosen.provider, RouteSource::Primary);
        assert!(chosen.blended);
    }

    #[rstest]
    #[case(-0.1, 0.25)]
    #[case(0.35, f64::NAN)]
    fn rejects_bad_tolerances(#[case] haversine: f64, #[case] distance: f64) {
        assert!(matches!(
            ReconcileConfig::new(haversine, distance),
            Err(ConfigError::Tolerance { .. })
        ));
    }
}
