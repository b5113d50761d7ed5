//! Client for the secondary routing service.
//!
//! Routes come from an OSRM server's Route API; place search uses an optional
//! Nominatim-compatible `/search` endpoint. Responses are strictly typed, so
//! anything that fails to deserialise is reported as a parse failure and
//! treated as "no result".

use std::sync::Arc;
use std::time::Duration;

use reserve_core::{
    BreakerRegistry, CacheConfig, CacheStats, ConfigError, DEFAULT_CACHE_SIZE, Language, Place,
    PlaceKey, PlaceProvider, PlaceQuery, ProviderError, RetryPolicy, RouteKey, RouteProfile,
    RouteProvider, RouteRequest, RouteResult, RouteSource, TtlCache, coordinate,
};
use url::Url;

use super::guard::{Guarded, cached};
use super::nominatim::SearchHit;
use super::osrm::RouteResponse;
use super::payload::{number, text};
use super::transport::{DEFAULT_USER_AGENT, HttpTransport, ProviderBuildError};

/// Public OSRM demo server.
pub const DEFAULT_SECONDARY_BASE_URL: &str = "https://router.project-osrm.org";
/// Breaker guarding route lookups.
pub const SECONDARY_ROUTING: &str = "secondary-routing";
/// Breaker guarding place searches.
pub const SECONDARY_SEARCH: &str = "secondary-search";
/// Provider label on search results.
pub const SECONDARY_PROVIDER_LABEL: &str = "osm";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);
const DEFAULT_ROUTE_TTL: Duration = Duration::from_secs(15 * 60);
const DEFAULT_SEARCH_TTL: Duration = Duration::from_secs(30 * 60);

/// Configuration for [`SecondaryClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct SecondaryClientConfig {
    /// Base URL of the OSRM service (e.g., `"http://localhost:5000"`).
    pub base_url: String,
    /// Base URL of a Nominatim-compatible search service. Search is disabled
    /// without one.
    pub search_url: Option<String>,
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
    /// Maximum entries per cache.
    pub cache_size: usize,
    /// Retry policy for transport failures.
    pub retry: RetryPolicy,
}

impl Default for SecondaryClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SECONDARY_BASE_URL.to_owned(),
            search_url: None,
            default_language: Language::default(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            route_ttl: DEFAULT_ROUTE_TTL,
            search_ttl: DEFAULT_SEARCH_TTL,
            cache_size: DEFAULT_CACHE_SIZE,
            retry: RetryPolicy::default(),
        }
    }
}

impl SecondaryClientConfig {
    /// Create a configuration with the given OSRM base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Enable place search against `search_url`.
    #[must_use]
    pub fn with_search_url(mut self, search_url: impl Into<String>) -> Self {
        self.search_url = Some(search_url.into());
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

    /// Set the route and search cache lifetimes.
    #[must_use]
    pub fn with_cache_ttls(mut self, route: Duration, search: Duration) -> Self {
        self.route_ttl = route;
        self.search_ttl = search;
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
}

/// The secondary client's caches.
#[derive(Debug)]
pub struct SecondaryCaches {
    routes: TtlCache<RouteKey, RouteResult>,
    places: TtlCache<PlaceKey, Vec<Place>>,
}

impl SecondaryCaches {
    /// Build empty caches sized and aged per `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::CacheSize`] when `config.cache_size` is zero.
    pub fn from_config(config: &SecondaryClientConfig) -> Result<Self, ConfigError> {
        let size = config.cache_size;
        Ok(Self {
            routes: TtlCache::new(CacheConfig::new("secondary-routes", size, config.route_ttl)?),
            places: TtlCache::new(CacheConfig::new(
                "secondary-search",
                size,
                config.search_ttl,
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

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.routes.clear();
        self.places.clear();
    }
}

/// Blocking client for the secondary routing service.
///
/// Implements [`RouteProvider`] and [`PlaceProvider`]. The reconciler uses
/// its routes to sanity-check the primary and as a fallback.
#[derive(Debug)]
pub struct SecondaryClient {
    config: SecondaryClientConfig,
    base_url: Url,
    search_url: Option<Url>,
    transport: HttpTransport,
    caches: Arc<SecondaryCaches>,
    routing: Guarded,
    search: Guarded,
}

fn parse_base(raw: &str) -> Result<Url, ProviderBuildError> {
    let url = Url::parse(raw).map_err(|source| ProviderBuildError::BaseUrl {
        url: raw.to_owned(),
        source,
    })?;
    if url.cannot_be_a_base() {
        return Err(ProviderBuildError::BaseUrl {
            url: raw.to_owned(),
            source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
        });
    }
    Ok(url)
}

impl SecondaryClient {
    /// Create a client with fresh caches.
    ///
    /// # Errors
    ///
    /// Returns an error if a base URL is invalid, the cache size is zero, or
    /// the HTTP client or Tokio runtime fails to build.
    pub fn new(
        config: SecondaryClientConfig,
        breakers: Arc<BreakerRegistry>,
    ) -> Result<Self, ProviderBuildError> {
        let caches = Arc::new(SecondaryCaches::from_config(&config)?);
        Self::with_caches(config, caches, breakers)
    }

    /// Create a client that shares existing caches.
    ///
    /// # Errors
    ///
    /// Returns an error if a base URL is invalid or the HTTP client or Tokio
    /// runtime fails to build.
    pub fn with_caches(
        config: SecondaryClientConfig,
        caches: Arc<SecondaryCaches>,
        breakers: Arc<BreakerRegistry>,
    ) -> Result<Self, ProviderBuildError> {
        let base_url = parse_base(&config.base_url)?;
        let search_url = config.search_url.as_deref().map(parse_base).transpose()?;
        let transport = HttpTransport::new(&config.user_agent, config.timeout)?;
        Ok(Self {
            routing: Guarded::new(&breakers, SECONDARY_ROUTING, config.retry),
            search: Guarded::new(&breakers, SECONDARY_SEARCH, config.retry),
            config,
            base_url,
            search_url,
            transport,
            caches,
        })
    }

    /// Configuration in force.
    #[must_use]
    pub fn config(&self) -> &SecondaryClientConfig {
        &self.config
    }

    /// Caches backing this client.
    #[must_use]
    pub fn caches(&self) -> &SecondaryCaches {
        &self.caches
    }

    /// Build the OSRM Route API URL for `request`.
    ///
    /// The URL format is
    /// `{base_url}/route/v1/{profile}/{lon},{lat};{lon},{lat}?overview=full&geometries=geojson`.
    fn build_route_url(&self, request: &RouteRequest) -> Option<String> {
        let profile = match request.profile() {
            RouteProfile::Pedestrian => "foot",
            RouteProfile::Fastest | RouteProfile::Shortest => "driving",
        };
        let origin = request.origin();
        let destination = request.destination();
        let coords = format!(
            "{},{};{},{}",
            origin.x, origin.y, destination.x, destination.y
        );

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .extend(["route", "v1", profile, &coords]);
        url.query_pairs_mut()
            .append_pair("overview", "full")
            .append_pair("geometries", "geojson");
        Some(url.into())
    }

    fn build_search_url(&self, query: &PlaceQuery) -> Option<String> {
        let mut url = self.search_url.clone()?;
        let language = query.language().unwrap_or(self.config.default_language);
        url.path_segments_mut().ok()?.pop_if_empty().push("search");
        url.query_pairs_mut()
            .append_pair("q", query.text())
            .append_pair("format", "jsonv2")
            .append_pair("limit", &query.limit().to_string())
            .append_pair("accept-language", language.as_str());
        Some(url.into())
    }

    fn load_route(&self, request: &RouteRequest) -> Option<RouteResult> {
        let url = self.build_route_url(request)?;
        let body = self.routing.fetch(|| self.transport.get(&url))?;
        let parsed = serde_json::from_str::<RouteResponse>(&body)
            .map_err(|err| ProviderError::Parse {
                message: err.to_string(),
            })
            .and_then(convert_route);
        match parsed {
            Ok(route) => Some(route),
            Err(err) => {
                log::warn!("secondary route returned no result: {err}");
                None
            }
        }
    }

    fn load_places(&self, query: &PlaceQuery) -> Option<Vec<Place>> {
        let url = self.build_search_url(query)?;
        let body = self.search.fetch(|| self.transport.get(&url))?;
        let hits = match serde_json::from_str::<Vec<SearchHit>>(&body) {
            Ok(hits) => hits,
            Err(err) => {
                log::warn!("secondary search returned no result: {err}");
                return None;
            }
        };
        let mut places: Vec<Place> = hits
            .into_iter()
            .filter_map(|hit| place_from_hit(hit, query.text()))
            .collect();
        places.truncate(query.limit());
        (!places.is_empty()).then_some(places)
    }
}

/// Convert an OSRM response into a route.
fn convert_route(response: RouteResponse) -> Result<RouteResult, ProviderError> {
    if !response.is_ok() {
        return Err(ProviderError::Service {
            message: format!(
                "{}: {}",
                response.code,
                response.message.unwrap_or_default()
            ),
        });
    }
    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse {
            message: "OSRM response missing routes array".to_owned(),
        })?;

    let valid = |v: &f64| v.is_finite() && *v >= 0.0;
    let mut result = RouteResult::new(RouteSource::Secondary);
    if let Some(metres) = route.distance.filter(valid) {
        result = result.with_distance_km(metres / 1_000.0);
    }
    if let Some(seconds) = route.duration.filter(valid) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "Finite, non-negative seconds; the cast saturates"
        )]
        let seconds = seconds.round() as u64;
        result = result.with_duration_seconds(seconds);
    }
    if let Some(line) = route.geometry {
        let points = line
            .coordinates
            .iter()
            .filter_map(|position| match position.as_slice() {
                [lon, lat, ..] => coordinate(*lat, *lon).ok(),
                _ => None,
            })
            .collect();
        result = result.with_geometry(points);
    }
    Ok(result)
}

fn place_from_hit(hit: SearchHit, fallback_name: &str) -> Option<Place> {
    let lat = number(&hit.lat)?;
    let lon = number(&hit.lon)?;
    let location = coordinate(lat, lon).ok()?;
    let display = hit.display_name.filter(|d| !d.trim().is_empty());
    let name = hit
        .name
        .filter(|n| !n.trim().is_empty())
        .or_else(|| {
            display
                .as_deref()
                .and_then(|d| d.split(',').next())
                .map(|n| n.trim().to_owned())
        })
        .unwrap_or_else(|| fallback_name.to_owned());
    let id = hit
        .place_id
        .as_ref()
        .and_then(text)
        .unwrap_or_else(|| format!("{name}@{lat:.5},{lon:.5}"));

    let mut place = Place::new(id, name, location, SECONDARY_PROVIDER_LABEL);
    if let Some(address) = display {
        place.address = Some(address.clone());
        place.place_name = address;
    }
    Some(place)
}

impl RouteProvider for SecondaryClient {
    fn fetch_route(&self, request: &RouteRequest) -> Option<RouteResult> {
        let key = request.cache_key(self.config.default_language);
        cached(&self.caches.routes, key, || self.load_route(request))
    }
}

impl PlaceProvider for SecondaryClient {
    fn fetch_places(&self, query: &PlaceQuery) -> Vec<Place> {
        if self.search_url.is_none() {
            return Vec::new();
        }
        let key = query.cache_key(self.config.default_language);
        cached(&self.caches.places, key, || self.load_places(query)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};
    use rstest::{fixture, rstest};

    #[fixture]
    fn server() -> ServerGuard {
        Server::new()
    }

    fn client(server: &ServerGuard) -> SecondaryClient {
        let config = SecondaryClientConfig::new(server.url())
            .with_search_url(server.url())
            .with_timeout(Duration::from_secs(2))
            .with_retry(RetryPolicy::none());
        SecondaryClient::new(config, Arc::new(BreakerRegistry::default())).expect("client")
    }

    fn request() -> RouteRequest {
        RouteRequest::new(40.4093, 49.8671, 40.3777, 49.8453).expect("valid request")
    }

    #[rstest]
    fn build_route_url_formats_coordinates(server: ServerGuard) {
        let client = client(&server);

        let url = client.build_route_url(&request()).expect("url");

        assert_eq!(
            url,
            format!(
                "{}/route/v1/driving/49.8671,40.4093;49.8453,40.3777?overview=full&geometries=geojson",
                server.url()
            )
        );
    }

    #[rstest]
    fn pedestrian_profile_uses_foot(server: ServerGuard) {
        let client = client(&server);

        let url = client
            .build_route_url(&request().with_profile(RouteProfile::Pedestrian))
            .expect("url");

        assert!(url.contains("/route/v1/foot/"), "unexpected url: {url}");
    }

    #[rstest]
    fn build_route_url_strips_trailing_slash() {
        let config = SecondaryClientConfig::new("http://osrm.example.com/");
        let client =
            SecondaryClient::new(config, Arc::new(BreakerRegistry::default())).expect("client");

        let url = client.build_route_url(&request()).expect("url");

        assert!(url.starts_with("http://osrm.example.com/route/"));
        assert!(!url.contains("//route"));
    }

    #[rstest]
    fn fetches_and_caches_routes(mut server: ServerGuard) {
        let mock = server
            .mock(
                "GET",
                Matcher::Regex(r"^/route/v1/driving/49\.8671,40\.4093;49\.8453,40\.3777".into()),
            )
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("overview".into(), "full".into()),
                Matcher::UrlEncoded("geometries".into(), "geojson".into()),
            ]))
            .with_body(
                r#"{"code": "Ok", "routes": [{"distance": 5300.0, "duration": 619.6,
                    "geometry": {"type": "LineString", "coordinates": [[49.8671, 40.4093], [49.8453, 40.3777]]}}]}"#,
            )
            .expect(1)
            .create();
        let client = client(&server);

        let route = client.fetch_route(&request()).expect("route");
        let again = client.fetch_route(&request()).expect("cached");

        assert_eq!(route.source(), RouteSource::Secondary);
        assert_eq!(route.distance_km(), Some(5.3));
        assert_eq!(route.duration_seconds(), Some(620));
        assert_eq!(route.geometry_len(), 2);
        assert_eq!(again, route);
        mock.assert();
    }

    #[rstest]
    fn no_route_is_absent(mut server: ServerGuard) {
        let _mock = server
            .mock("GET", Matcher::Any)
            .with_body(r#"{"code": "NoRoute", "message": "Impossible route"}"#)
            .create();
        let client = client(&server);

        assert!(client.fetch_route(&request()).is_none());
        assert_eq!(client.caches().route_stats().size, 0);
    }

    #[rstest]
    fn malformed_body_is_absent(mut server: ServerGuard) {
        let _mock = server
            .mock("GET", Matcher::Any)
            .with_body("<html>gateway</html>")
            .create();
        let client = client(&server);

        assert!(client.fetch_route(&request()).is_none());
    }

    #[rstest]
    fn search_reads_hits(mut server: ServerGuard) {
        let mock = server
            .mock("GET", Matcher::Regex("^/search".into()))
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "flame towers".into()),
                Matcher::UrlEncoded("format".into(), "jsonv2".into()),
                Matcher::UrlEncoded("accept-language".into(), "ru".into()),
            ]))
            .with_body(
                r#"[{"place_id": 42, "lat": "40.3594", "lon": "49.8261",
                     "display_name": "Flame Towers, Baku, Azerbaijan"},
                    {"lat": "bogus", "lon": "49.0"}]"#,
            )
            .create();
        let client = client(&server);
        let query = PlaceQuery::new("flame towers", 5)
            .expect("query")
            .with_language(Language::Ru);

        let places = client.fetch_places(&query);

        assert_eq!(places.len(), 1);
        assert_eq!(places[0].id, "42");
        assert_eq!(places[0].name, "Flame Towers");
        assert_eq!(places[0].place_name, "Flame Towers, Baku, Azerbaijan");
        assert_eq!(places[0].provider, SECONDARY_PROVIDER_LABEL);
        mock.assert();
    }

    #[rstest]
    fn search_without_endpoint_is_empty() {
        let config = SecondaryClientConfig::default();
        let client =
            SecondaryClient::new(config, Arc::new(BreakerRegistry::default())).expect("client");
        let query = PlaceQuery::new("flame", 5).expect("query");

        assert!(client.fetch_places(&query).is_empty());
    }

    #[rstest]
    #[case("not a url")]
    #[case("mailto:osrm@example.com")]
    fn invalid_base_url_is_rejected(#[case] base: &str) {
        let err = SecondaryClient::new(
            SecondaryClientConfig::new(base),
            Arc::new(BreakerRegistry::default()),
        )
        .expect_err("invalid base");
        assert!(matches!(err, ProviderBuildError::BaseUrl { .. }));
    }
}
