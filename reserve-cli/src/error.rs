//! Error types emitted by the reserve CLI.
//!
//! Keep this error type reasonably small, as every command helper returns
//! `Result<_, CliError>`.

use std::sync::Arc;

use reserve_core::CoordinateError;
use reserve_data::routing::ProviderBuildError;
use thiserror::Error;

/// Errors emitted by the reserve CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name without the leading dashes.
        field: &'static str,
        /// Environment variable that can supply the value.
        env: &'static str,
    },
    /// An option was supplied with an unusable value.
    #[error("invalid --{field}: {reason}")]
    InvalidArgument {
        /// Flag name without the leading dashes.
        field: &'static str,
        /// What is wrong with the value.
        reason: String,
    },
    /// An origin or destination lies outside the valid range.
    #[error(transparent)]
    InvalidCoordinate(#[from] CoordinateError),
    /// Constructing a provider client failed.
    #[error("failed to build {provider} client for {base_url:?}: {source}")]
    BuildProvider {
        /// Which client failed to build.
        provider: &'static str,
        /// Base URL the client was configured with.
        base_url: String,
        /// Underlying construction failure.
        #[source]
        source: ProviderBuildError,
    },
    /// Serialising the command output failed.
    #[error("failed to serialise output: {0}")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing the command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
