//! Client for the primary mapping service.
//!
//! The service exposes form-encoded POST endpoints keyed by an application
//! credential (`guid`) and a response language (`lng`). Routes, searches and
//! traffic readings each have their own cache and their own circuit breaker,
//! so an outage of one endpoint family leaves the others usable.
//!
//! Without a credential the client is disabled: every lookup returns nothing
//! and no request is sent.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use reserve_core::{BreakerRegistry, RouteProvider, RouteRequest};
//! use reserve_data::routing::{PrimaryClient, PrimaryClientConfig};
//!
//! let config = PrimaryClientConfig::default().with_guid("application-guid");
//! let client = PrimaryClient::new(config, Arc::new(BreakerRegistry::default()))?;
//!
//! let request = RouteRequest::new(40.40, 49.86, 40.41, 49.87)?;
//! let route = client.fetch_route(&request);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::sync::Arc;
use std::time::Duration;

use geo::Coord;
use reserve_core::{
    BreakerRegistry, CacheConfig, CacheStats, ConfigError, DEFAULT_CACHE_SIZE, Language, Place,
    PlaceKey, PlaceProvider, PlaceQuery, RetryPolicy, RouteKey, RouteProfile, RouteProvider,
    RouteRequest, RouteResult, SearchStrategy, TrafficProvider, TrafficSnapshot, TtlCache,
    grid_cell,
};

use super::guard::{Guarded, cached};
use super::payload::{
    Payload, decode, ensure_success, places_from_payload, route_from_payload,
    traffic_from_payload,
};
use super::transport::{DEFAULT_USER_AGENT, HttpTransport, ProviderBuildError, endpoint};

/// Production endpoint of the primary service.
pub const DEFAULT_PRIMARY_BASE_URL: &str = "https://api.gomap.az/Main.asmx";
/// Breaker guarding route lookups.
pub const PRIMARY_ROUTING: &str = "primary-routing";
/// Breaker guarding place searches.
pub const PRIMARY_SEARCH: &str = "primary-search";
/// Breaker guarding traffic lookups.
pub const PRIMARY_TRAFFIC: &str = "primary-traffic";
/// Provider label on exact and distance-aware search results.
pub const PRIMARY_PROVIDER_LABEL: &str = "gomap";
/// Provider label on fuzzy search results.
pub const FUZZY_PROVIDER_LABEL: &str = "gomap_fuzzy";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);
const DEFAULT_ROUTE_TTL: Duration = Duration::from_secs(15 * 60);
const DEFAULT_SEARCH_TTL: Duration = Duration::from_secs(30 * 60);
const DEFAULT_TRAFFIC_TTL: Duration = Duration::from_secs(2 * 60);

/// Configuration for [`PrimaryClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryClientConfig {
    /// Base URL of the service; endpoint names are appended to it.
    pub base_url: String,
    /// Application credential. The client is disabled without one.
    pub guid: Option<String>,
    /// Language used when a request does not choose one.
    pub default_language: Language,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
    /// Lifetime of cached routes.
    pub route_ttl: Duration,
    /// Lifetime of cached search results.
    pub search_ttl: Duration,
    /// Lifetime of cached traffic readings.
    pub traffic_ttl: Duration,
    /// Maximum entries per cache.
    pub cache_size: usize,
    /// Retry policy for transport failures.
    pub retry: RetryPolicy,
}

impl Default for PrimaryClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PRIMARY_BASE_URL.to_owned(),
            guid: None,
            default_language: Language::default(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            route_ttl: DEFAULT_ROUTE_TTL,
            search_ttl: DEFAULT_SEARCH_TTL,
            traffic_ttl: DEFAULT_TRAFFIC_TTL,
            cache_size: DEFAULT_CACHE_SIZE,
            retry: RetryPolicy::default(),
        }
    }
}

impl PrimaryClientConfig {
    /// Create a configuration pointing at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the application credential.
    #[must_use]
    pub fn with_guid(mut self, guid: impl Into<String>) -> Self {
        let guid = guid.into();
        self.guid = (!guid.trim().is_empty()).then_some(guid);
        self
    }

    /// Set the fallback language.
    #[must_use]
    pub fn with_default_language(mut self, language: Language) -> Self {
        self.default_language = language;
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the route, search and traffic cache lifetimes.
    #[must_use]
    pub fn with_cache_ttls(mut self, route: Duration, search: Duration, traffic: Duration) -> Self {
        self.route_ttl = route;
        self.search_ttl = search;
        self.traffic_ttl = traffic;
        self
    }

    /// Set the maximum entries per cache.
    #[must_use]
    pub fn with_cache_size(mut self, size: usize) -> Self {
        self.cache_size = size;
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Whether a credential is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.guid.is_some() && !self.base_url.trim().is_empty()
    }
}

/// Key of a cached traffic reading: grid cell plus radius in metres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TrafficKey {
    cell: (i64, i64),
    radius_m: u64,
}

impl TrafficKey {
    fn new(location: Coord<f64>, radius_km: f64) -> Self {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "Radius in whole metres; the cast saturates"
        )]
        let radius_m = (radius_km * 1_000.0).round().max(0.0) as u64;
        Self {
            cell: grid_cell(location),
            radius_m,
        }
    }
}

/// The primary client's caches, one per endpoint family.
#[derive(Debug)]
pub struct PrimaryCaches {
    routes: TtlCache<RouteKey, RouteResult>,
    places: TtlCache<PlaceKey, Vec<Place>>,
    traffic: TtlCache<TrafficKey, TrafficSnapshot>,
}

impl PrimaryCaches {
    /// Build empty caches sized and aged per `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::CacheSize`] when `config.cache_size` is zero.
    pub fn from_config(config: &PrimaryClientConfig) -> Result<Self, ConfigError> {
        let size = config.cache_size;
        Ok(Self {
            routes: TtlCache::new(CacheConfig::new("primary-routes", size, config.route_ttl)?),
            places: TtlCache::new(CacheConfig::new("primary-search", size, config.search_ttl)?),
            traffic: TtlCache::new(CacheConfig::new(
                "primary-traffic",
                size,
                config.traffic_ttl,
            )?),
        })
    }

    /// Route cache statistics.
    #[must_use]
    pub fn route_stats(&self) -> CacheStats {
        self.routes.stats()
    }

    /// Search cache statistics.
    #[must_use]
    pub fn search_stats(&self) -> CacheStats {
        self.places.stats()
    }

    /// Traffic cache statistics.
    #[must_use]
    pub fn traffic_stats(&self) -> CacheStats {
        self.traffic.stats()
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.routes.clear();
        self.places.clear();
        self.traffic.clear();
    }
}

/// Blocking client for the primary mapping service.
///
/// Implements [`RouteProvider`], [`TrafficProvider`] and [`PlaceProvider`].
/// Every failure mode collapses to "no result"; only transport failures are
/// retried and count against the breakers.
#[derive(Debug)]
pub struct PrimaryClient {
    config: PrimaryClientConfig,
    transport: HttpTransport,
    caches: Arc<PrimaryCaches>,
    breakers: Arc<BreakerRegistry>,
    routing: Guarded,
    search: Guarded,
    traffic: Guarded,
}

impl PrimaryClient {
    /// Create a client with fresh caches.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache size is zero or the HTTP client or
    /// Tokio runtime fails to build.
    pub fn new(
        config: PrimaryClientConfig,
        breakers: Arc<BreakerRegistry>,
    ) -> Result<Self, ProviderBuildError> {
        let caches = Arc::new(PrimaryCaches::from_config(&config)?);
        Self::with_caches(config, caches, breakers)
    }

    /// Create a client that shares existing caches.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn with_caches(
        config: PrimaryClientConfig,
        caches: Arc<PrimaryCaches>,
        breakers: Arc<BreakerRegistry>,
    ) -> Result<Self, ProviderBuildError> {
        let transport = HttpTransport::new(&config.user_agent, config.timeout)?;
        let routing = Guarded::new(&breakers, PRIMARY_ROUTING, config.retry);
        let search = Guarded::new(&breakers, PRIMARY_SEARCH, config.retry);
        let traffic = Guarded::new(&breakers, PRIMARY_TRAFFIC, config.retry);
        if !config.is_enabled() {
            log::info!("primary mapping service disabled: no credential configured");
        }
        Ok(Self {
            config,
            transport,
            caches,
            breakers,
            routing,
            search,
            traffic,
        })
    }

    /// Configuration in force.
    #[must_use]
    pub fn config(&self) -> &PrimaryClientConfig {
        &self.config
    }

    /// Caches backing this client.
    #[must_use]
    pub fn caches(&self) -> &PrimaryCaches {
        &self.caches
    }

    /// Breaker registry shared with other clients.
    #[must_use]
    pub fn breakers(&self) -> &BreakerRegistry {
        &self.breakers
    }

    /// Whether requests will be sent at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    fn language(&self, preferred: Option<Language>) -> Language {
        preferred.unwrap_or(self.config.default_language)
    }

    /// POST to `path` and return the payload if the service reported success.
    fn post(
        &self,
        guard: &Guarded,
        path: &str,
        mut form: Vec<(&'static str, String)>,
        language: Language,
    ) -> Option<Payload> {
        let guid = self.config.guid.as_deref()?;
        form.push(("guid", guid.to_owned()));
        form.push(("lng", language.as_str().to_owned()));
        let url = endpoint(&self.config.base_url, path);

        let body = guard.fetch(|| self.transport.post_form(&url, &form))?;
        match ensure_success(decode(&body)) {
            Ok(payload) => Some(payload),
            Err(err) => {
                log::warn!("primary {path} returned no result: {err}");
                None
            }
        }
    }

    fn load_route(&self, request: &RouteRequest) -> Option<RouteResult> {
        let origin = request.origin();
        let destination = request.destination();
        let mut form = Vec::with_capacity(7);
        let path = match request.profile() {
            RouteProfile::Fastest => "getRoute",
            profile => {
                form.push(("type", profile.as_str().to_owned()));
                "getRouteByType"
            }
        };
        form.extend([
            ("Ax", format!("{:.6}", origin.x)),
            ("Ay", format!("{:.6}", origin.y)),
            ("Bx", format!("{:.6}", destination.x)),
            ("By", format!("{:.6}", destination.y)),
        ]);

        let payload = self.post(&self.routing, path, form, self.language(request.language()))?;
        let route = route_from_payload(&payload);
        if route.is_none() {
            log::warn!("primary {path} payload carried neither distance nor duration");
        }
        route
    }

    fn load_places(&self, query: &PlaceQuery) -> Option<Vec<Place>> {
        let mut form = vec![("name", query.text().to_owned())];
        let (path, label) = match query.strategy() {
            SearchStrategy::Exact => ("searchObj", PRIMARY_PROVIDER_LABEL),
            SearchStrategy::DistanceAware => {
                if let Some(origin) = query.origin() {
                    form.push(("x", format!("{:.6}", origin.x)));
                    form.push(("y", format!("{:.6}", origin.y)));
                }
                ("searchObjWithDistance", PRIMARY_PROVIDER_LABEL)
            }
            SearchStrategy::Fuzzy => ("makeSearchCitySettlementFuzzy", FUZZY_PROVIDER_LABEL),
        };

        let payload = self.post(&self.search, path, form, self.language(query.language()))?;
        let mut places = places_from_payload(&payload, query.text(), label);
        places.truncate(query.limit());
        // Empty answers stay uncached.
        (!places.is_empty()).then_some(places)
    }

    fn load_traffic(&self, location: Coord<f64>, radius_km: f64) -> Option<TrafficSnapshot> {
        let form = vec![
            ("x", format!("{:.6}", location.x)),
            ("y", format!("{:.6}", location.y)),
            ("radius", format!("{radius_km}")),
        ];
        let payload = self.post(
            &self.traffic,
            "getTrafficTilesByCoord",
            form,
            self.config.default_language,
        )?;
        traffic_from_payload(&payload)
    }
}

impl RouteProvider for PrimaryClient {
    fn fetch_route(&self, request: &RouteRequest) -> Option<RouteResult> {
        if !self.is_enabled() {
            return None;
        }
        let key = request.cache_key(self.config.default_language);
        cached(&self.caches.routes, key, || self.load_route(request))
    }
}

impl TrafficProvider for PrimaryClient {
    fn fetch_traffic(&self, location: Coord<f64>, radius_km: f64) -> Option<TrafficSnapshot> {
        if !self.is_enabled() {
            return None;
        }
        let key = TrafficKey::new(location, radius_km);
        cached(&self.caches.traffic, key, || {
            self.load_traffic(location, radius_km)
        })
    }
}

impl PlaceProvider for PrimaryClient {
    fn fetch_places(&self, query: &PlaceQuery) -> Vec<Place> {
        if !self.is_enabled() {
            return Vec::new();
        }
        let key = query.cache_key(self.config.default_language);
        cached(&self.caches.places, key, || self.load_places(query)).unwrap_or_default()
    }
}
