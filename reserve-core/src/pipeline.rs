//! Entry points that tie the providers, reconciler and adjuster together.

use crate::adjust::{EtaConfig, TrafficObservation, compose_eta, observe_traffic};
use crate::eta::EtaComputation;
use crate::place::{Place, PlaceQuery, QueryError};
use crate::provider::{PlaceProvider, RouteProvider, TrafficProvider};
use crate::reconcile::{ReconcileConfig, reconcile};
use crate::request::{Language, RouteRequest};
use crate::search::smart_search;

/// Tuning for an [`EtaPipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PipelineConfig {
    reconcile: ReconcileConfig,
    eta: EtaConfig,
}

impl PipelineConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the reconciliation tolerances.
    #[must_use]
    pub const fn with_reconcile(mut self, reconcile: ReconcileConfig) -> Self {
        self.reconcile = reconcile;
        self
    }

    /// Replace the ETA adjuster settings.
    #[must_use]
    pub const fn with_eta(mut self, eta: EtaConfig) -> Self {
        self.eta = eta;
        self
    }

    /// Reconciliation tolerances.
    #[must_use]
    pub const fn reconcile(&self) -> ReconcileConfig {
        self.reconcile
    }

    /// ETA adjuster settings.
    #[must_use]
    pub const fn eta(&self) -> EtaConfig {
        self.eta
    }
}

/// Routing and search front door for the rest of the application.
///
/// `P` is the primary service, which also supplies traffic. `S` is the
/// secondary service used for reconciliation and as a fallback. Both are
/// expected to carry their own caches and circuit breakers.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use reserve_core::{
///     EtaPipeline, Place, PlaceProvider, PlaceQuery, PipelineConfig, RouteProvider,
///     RouteRequest, RouteResult, RouteSource, TrafficProvider, TrafficSnapshot,
/// };
///
/// struct Fixed(RouteSource, f64, u64);
///
/// impl RouteProvider for Fixed {
///     fn fetch_route(&self, _: &RouteRequest) -> Option<RouteResult> {
///         Some(RouteResult::new(self.0).with_distance_km(self.1).with_duration_seconds(self.2))
///     }
/// }
/// impl TrafficProvider for Fixed {
///     fn fetch_traffic(&self, _: Coord<f64>, _: f64) -> Option<TrafficSnapshot> {
///         None
///     }
/// }
/// impl PlaceProvider for Fixed {
///     fn fetch_places(&self, _: &PlaceQuery) -> Vec<Place> {
///         Vec::new()
///     }
/// }
///
/// let primary = Fixed(RouteSource::Primary, 5.2, 600);
/// let secondary = Fixed(RouteSource::Secondary, 5.3, 620);
/// let pipeline = EtaPipeline::new(primary, secondary, PipelineConfig::default());
///
/// let eta = pipeline
///     .compute_eta_with_traffic(40.40, 49.86, 40.41, 49.87)
///     .expect("both providers answered");
/// assert_eq!(eta.provider, RouteSource::Primary);
/// assert_eq!(eta.eta_seconds, 610);
/// assert_eq!(eta.eta_minutes, 11);
/// ```
#[derive(Debug)]
pub struct EtaPipeline<P, S> {
    primary: P,
    secondary: S,
    config: PipelineConfig,
}

impl<P, S> EtaPipeline<P, S>
where
    P: RouteProvider + TrafficProvider + PlaceProvider,
    S: RouteProvider + PlaceProvider,
{
    /// Assemble a pipeline.
    #[must_use]
    pub const fn new(primary: P, secondary: S, config: PipelineConfig) -> Self {
        Self {
            primary,
            secondary,
            config,
        }
    }

    /// Primary provider.
    #[must_use]
    pub const fn primary(&self) -> &P {
        &self.primary
    }

    /// Secondary provider.
    #[must_use]
    pub const fn secondary(&self) -> &S {
        &self.secondary
    }

    /// Configuration in force.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Estimate the travel time between two raw coordinates.
    ///
    /// Returns `None` for out-of-range coordinates or when no provider could
    /// produce a route with a duration. Callers then fall back to
    /// [`crate::build_fallback_eta`].
    #[must_use]
    pub fn compute_eta_with_traffic(
        &self,
        origin_lat: f64,
        origin_lon: f64,
        dest_lat: f64,
        dest_lon: f64,
    ) -> Option<EtaComputation> {
        match RouteRequest::new(origin_lat, origin_lon, dest_lat, dest_lon) {
            Ok(request) => self.compute_eta(&request),
            Err(err) => {
                log::warn!("rejecting ETA request: {err}");
                None
            }
        }
    }

    /// Estimate the travel time for a validated request.
    #[must_use]
    pub fn compute_eta(&self, request: &RouteRequest) -> Option<EtaComputation> {
        let primary = self.primary.fetch_route(request);
        let secondary = self.secondary.fetch_route(request);
        let Some(chosen) = reconcile(
            primary.as_ref(),
            secondary.as_ref(),
            request.straight_line_km(),
            &self.config.reconcile,
        ) else {
            log::warn!("no provider returned a route; caller should fall back");
            return None;
        };

        let eta_config = &self.config.eta;
        let observation = if eta_config.traffic_enabled() {
            observe_traffic(
                &self.primary,
                request.origin(),
                request.destination(),
                eta_config.traffic_radius_km(),
            )
        } else {
            TrafficObservation::NotAttempted
        };
        let eta = compose_eta(&chosen, observation, eta_config);
        if eta.is_none() {
            log::warn!("{} route has no duration; caller should fall back", chosen.provider);
        }
        eta
    }

    /// Search for places, escalating across strategies when results are thin.
    ///
    /// An empty query or out-of-range origin yields an empty list without
    /// contacting any provider. An origin missing either coordinate is
    /// ignored.
    #[must_use]
    pub fn search_places(
        &self,
        query: &str,
        origin_lat: Option<f64>,
        origin_lon: Option<f64>,
        limit: usize,
        language: Option<Language>,
    ) -> Vec<Place> {
        match build_query(query, origin_lat, origin_lon, limit, language) {
            Ok(query) => smart_search(&self.primary, &self.secondary, &query),
            Err(err) => {
                log::debug!("rejecting search: {err}");
                Vec::new()
            }
        }
    }
}

fn build_query(
    text: &str,
    origin_lat: Option<f64>,
    origin_lon: Option<f64>,
    limit: usize,
    language: Option<Language>,
) -> Result<PlaceQuery, QueryError> {
    let mut query = PlaceQuery::new(text, limit)?;
    if let (Some(lat), Some(lon)) = (origin_lat, origin_lon) {
        query = query.with_origin(lat, lon)?;
    }
    if let Some(language) = language {
        query = query.with_language(language);
    }
    Ok(query)
}
