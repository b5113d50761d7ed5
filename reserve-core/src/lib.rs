//! Core of the resilient routing and ETA pipeline.
//!
//! Everything here is synchronous and free of I/O. HTTP clients live in
//! `reserve-data` and plug in through the [`RouteProvider`],
//! [`TrafficProvider`] and [`PlaceProvider`] traits. The crate supplies the
//! pieces those clients share (an expiring cache, circuit breakers and a
//! retry executor) and the pure decision logic on top: route reconciliation
//! and the traffic-aware ETA adjuster, exposed through [`EtaPipeline`] and
//! [`build_fallback_eta`].

#![cfg_attr(docsrs, feature(doc_cfg))]

mod adjust;
mod cache;
mod error;
mod eta;
mod location;
mod pipeline;
mod place;
mod provider;
mod reconcile;
mod request;
pub mod resilience;
mod route;
mod search;
mod traffic;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use adjust::{
    DEFAULT_HEAVY_BUFFER_MINUTES, DEFAULT_TRAFFIC_RADIUS_KM, DelayFactors, EtaConfig,
    TrafficObservation, compose_eta, observe_traffic,
};
pub use cache::{CacheConfig, CacheStats, DEFAULT_CACHE_SIZE, TtlCache};
pub use error::{CallError, ConfigError, ProviderError};
pub use eta::{EtaComputation, build_fallback_eta, fallback_minutes_for};
pub use location::{CoordinateError, coordinate, grid_cell, haversine_km};
pub use pipeline::{EtaPipeline, PipelineConfig};
pub use place::{
    MAX_SEARCH_LIMIT, Place, PlaceKey, PlaceQuery, QueryError, SearchStrategy, format_distance,
};
pub use provider::{PlaceProvider, RouteProvider, TrafficProvider};
pub use reconcile::{
    DEFAULT_DISTANCE_TOLERANCE, DEFAULT_HAVERSINE_TOLERANCE, ReconcileConfig, ReconciledRoute,
    reconcile, relative_deviation,
};
pub use request::{Language, RouteKey, RouteProfile, RouteRequest};
pub use resilience::{
    BreakerConfig, BreakerRegistry, BreakerSnapshot, BreakerStats, CircuitBreaker, CircuitState,
    RetryExecutor, RetryPolicy,
};
pub use route::{RouteResult, RouteSource};
pub use search::smart_search;
pub use traffic::{TrafficSeverity, TrafficSnapshot};
