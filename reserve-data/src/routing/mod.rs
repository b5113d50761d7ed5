//! HTTP clients for the primary and secondary mapping services.
//!
//! Both clients implement the synchronous provider traits from
//! `reserve-core` by blocking on an owned Tokio runtime, so they plug
//! straight into [`reserve_core::EtaPipeline`]. Each client owns its caches
//! and takes a shared [`reserve_core::BreakerRegistry`], one breaker per
//! endpoint family.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use reserve_core::{BreakerRegistry, EtaPipeline, PipelineConfig};
//! use reserve_data::routing::{
//!     PrimaryClient, PrimaryClientConfig, SecondaryClient, SecondaryClientConfig,
//! };
//!
//! let breakers = Arc::new(BreakerRegistry::default());
//! let primary = PrimaryClient::new(
//!     PrimaryClientConfig::default().with_guid("application-guid"),
//!     Arc::clone(&breakers),
//! )?;
//! let secondary = SecondaryClient::new(
//!     SecondaryClientConfig::new("http://localhost:5000"),
//!     breakers,
//! )?;
//!
//! let pipeline = EtaPipeline::new(primary, secondary, PipelineConfig::default());
//! let eta = pipeline.compute_eta_with_traffic(40.40, 49.86, 40.41, 49.87);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod duration;
mod guard;
mod nominatim;
mod osrm;
mod payload;
mod primary;
mod runtime;
mod secondary;
mod transport;

pub use primary::{
    DEFAULT_PRIMARY_BASE_URL, FUZZY_PROVIDER_LABEL, PRIMARY_PROVIDER_LABEL, PRIMARY_ROUTING,
    PRIMARY_SEARCH, PRIMARY_TRAFFIC, PrimaryCaches, PrimaryClient, PrimaryClientConfig,
};
pub use secondary::{
    DEFAULT_SECONDARY_BASE_URL, SECONDARY_PROVIDER_LABEL, SECONDARY_ROUTING, SECONDARY_SEARCH,
    SecondaryCaches, SecondaryClient, SecondaryClientConfig,
};
pub use transport::{DEFAULT_USER_AGENT, ProviderBuildError};
