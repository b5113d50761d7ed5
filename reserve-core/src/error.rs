//! Error types shared by the routing pipeline.
//!
//! Provider clients classify upstream failures into [`ProviderError`]. Only the
//! transport-level variants travel through the circuit breaker; everything
//! else collapses to "no result" at the client boundary. [`CallError`] wraps a
//! breaker-gated failure so callers can tell a rejected call apart from one
//! that was attempted and failed.

use thiserror::Error;

/// Failures observed while talking to an upstream mapping service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The request did not complete within the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Endpoint that was being called.
        url: String,
        /// Timeout that elapsed, in seconds.
        timeout_secs: u64,
    },
    /// The connection failed before a response arrived.
    #[error("network error calling {url}: {message}")]
    Network {
        /// Endpoint that was being called.
        url: String,
        /// Transport error description.
        message: String,
    },
    /// The service answered with a non-success HTTP status.
    #[error("HTTP {status} from {url}: {message}")]
    Http {
        /// Endpoint that was being called.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
    },
    /// The response body could not be decoded.
    #[error("failed to parse provider response: {message}")]
    Parse {
        /// Decoder error description.
        message: String,
    },
    /// The service explicitly reported a failure in its payload.
    #[error("provider reported failure: {message}")]
    Service {
        /// Message supplied by the service.
        message: String,
    },
}

impl ProviderError {
    /// Whether the failure happened at the transport layer.
    ///
    /// Transport failures are retried and count against the circuit breaker.
    /// Parse and service failures are answers, not outages.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Network { .. } | Self::Http { .. }
        )
    }
}

/// Outcome of a call made through a circuit breaker.
#[derive(Debug, Error)]
pub enum CallError<E> {
    /// The breaker rejected the call without invoking it.
    #[error("circuit open for dependency {dependency}")]
    CircuitOpen {
        /// Name of the guarded dependency.
        dependency: String,
    },
    /// The call was attempted and failed.
    #[error(transparent)]
    Failed(E),
}

impl<E> CallError<E> {
    /// Whether the breaker rejected the call outright.
    #[must_use]
    pub const fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    /// Return the underlying failure, if the call was attempted.
    #[must_use]
    pub fn into_failure(self) -> Option<E> {
        match self {
            Self::CircuitOpen { .. } => None,
            Self::Failed(err) => Some(err),
        }
    }
}

/// Invalid configuration supplied to a pipeline component.
///
/// These are programmer errors and are reported when a component is built,
/// never while serving a request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A traffic delay factor would shorten the ETA or is not finite.
    #[error("delay factor for {severity} must be a finite value >= 1.0 (got {value})")]
    DelayFactor {
        /// Severity label the factor applies to.
        severity: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// A reconciliation tolerance is negative or not finite.
    #[error("{name} must be a finite, non-negative ratio (got {value})")]
    Tolerance {
        /// Name of the tolerance.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// A cache could never hold an entry.
    #[error("cache {name} must hold at least one entry")]
    CacheSize {
        /// Name of the cache.
        name: String,
    },
    /// A circuit breaker would never open.
    #[error("failure threshold must be at least 1")]
    FailureThreshold,
    /// The traffic lookup radius is not a positive distance.
    #[error("traffic radius must be a positive number of kilometres (got {0})")]
    TrafficRadius(f64),
}
