//! Facade crate for the reserve ETA pipeline.
//!
//! This crate re-exports the synchronous core (caching, circuit breakers,
//! retries, route reconciliation and the traffic-aware ETA adjuster) and,
//! behind the `http` feature, the HTTP clients for the primary mapping
//! service and the secondary OSRM/Nominatim service.

#![forbid(unsafe_code)]

pub use reserve_core::{
    BreakerConfig, BreakerRegistry, CallError, CircuitBreaker, CircuitState, ConfigError,
    CoordinateError, EtaComputation, EtaConfig, EtaPipeline, Language, Place, PlaceProvider,
    PlaceQuery, PipelineConfig, ProviderError, QueryError, ReconcileConfig, RetryExecutor,
    RetryPolicy, RouteProfile, RouteProvider, RouteRequest, RouteResult, RouteSource,
    TrafficProvider, TrafficSeverity, TrafficSnapshot, TtlCache, build_fallback_eta,
    fallback_minutes_for,
};

#[cfg(feature = "test-support")]
pub use reserve_core::test_support;

#[cfg(feature = "http")]
pub use reserve_data::routing::{
    PrimaryClient, PrimaryClientConfig, ProviderBuildError, SecondaryClient,
    SecondaryClientConfig,
};

/// Pipeline wired to the HTTP clients.
#[cfg(feature = "http")]
pub type HttpEtaPipeline = EtaPipeline<PrimaryClient, SecondaryClient>;

/// Build an [`HttpEtaPipeline`] whose clients share one breaker registry.
///
/// # Errors
///
/// Returns [`ProviderBuildError`] when either client rejects its
/// configuration or fails to build its HTTP client or runtime.
///
/// # Examples
/// ```no_run
/// use reserve_eta::{
///     PipelineConfig, PrimaryClientConfig, SecondaryClientConfig, http_pipeline,
/// };
///
/// let pipeline = http_pipeline(
///     PrimaryClientConfig::default().with_guid("my-guid"),
///     SecondaryClientConfig::default(),
///     PipelineConfig::default(),
/// )?;
/// let eta = pipeline
///     .compute_eta_with_traffic(40.4093, 49.8671, 40.3777, 49.8453)
///     .unwrap_or_else(|| reserve_eta::build_fallback_eta(4.2, 15));
/// println!("{} minutes via {}", eta.eta_minutes, eta.provider);
/// # Ok::<(), reserve_eta::ProviderBuildError>(())
/// ```
#[cfg(feature = "http")]
pub fn http_pipeline(
    primary: PrimaryClientConfig,
    secondary: SecondaryClientConfig,
    config: PipelineConfig,
) -> Result<HttpEtaPipeline, ProviderBuildError> {
    let breakers = std::sync::Arc::new(BreakerRegistry::default());
    let primary = PrimaryClient::new(primary, std::sync::Arc::clone(&breakers))?;
    let secondary = SecondaryClient::new(secondary, breakers)?;
    Ok(EtaPipeline::new(primary, secondary, config))
}
