//! The `search` command: escalating place search across both services.

use clap::Parser;
use geo::Coord;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use reserve_core::{Place, coordinate};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::providers::{DynPipeline, HttpPipelineBuilder, PipelineBuilder, ProviderSettings};
use crate::{
    ARG_GOMAP_GUID, ARG_LANGUAGE, ARG_LAT, ARG_LIMIT, ARG_LON, ARG_PRIMARY_URL, ARG_QUERY,
    ARG_SEARCH_URL, ARG_SECONDARY_URL, ARG_TIMEOUT_SECS, CliError, ENV_QUERY, write_json,
};

pub(crate) const DEFAULT_LIMIT: usize = 5;

/// CLI arguments for the `search` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Search the primary service by exact name, then by distance \
                 from an optional origin, then fuzzily, and finally ask the \
                 secondary service. Results are printed as a JSON array.",
    about = "Search for places by name",
    allow_negative_numbers = true
)]
#[ortho_config(prefix = "RESERVE")]
pub(crate) struct SearchArgs {
    /// Free-text query.
    #[arg(value_name = ARG_QUERY)]
    #[serde(default)]
    pub(crate) query: Option<String>,
    /// Latitude of the search origin.
    #[arg(long = ARG_LAT, value_name = "deg")]
    #[serde(default)]
    pub(crate) lat: Option<f64>,
    /// Longitude of the search origin.
    #[arg(long = ARG_LON, value_name = "deg")]
    #[serde(default)]
    pub(crate) lon: Option<f64>,
    /// Maximum number of places to print (default 5).
    #[arg(long = ARG_LIMIT, value_name = "n")]
    #[serde(default)]
    pub(crate) limit: Option<usize>,
    /// Response language: az, en or ru.
    #[arg(long = ARG_LANGUAGE, value_name = "code")]
    #[serde(default)]
    pub(crate) language: Option<String>,
    /// Credential for the primary mapping service.
    #[arg(long = ARG_GOMAP_GUID, value_name = "guid")]
    #[serde(default)]
    pub(crate) gomap_guid: Option<String>,
    /// Override the primary service base URL.
    #[arg(long = ARG_PRIMARY_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) primary_url: Option<String>,
    /// Override the secondary OSRM base URL.
    #[arg(long = ARG_SECONDARY_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) secondary_url: Option<String>,
    /// Nominatim-compatible search endpoint for the secondary service.
    #[arg(long = ARG_SEARCH_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) search_url: Option<String>,
    /// Per-request timeout in seconds.
    #[arg(long = ARG_TIMEOUT_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
}

impl SearchArgs {
    pub(crate) fn into_config(self) -> Result<SearchCommandConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        SearchCommandConfig::try_from(merged)
    }
}

/// Resolved `search` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SearchCommandConfig {
    pub(crate) query: String,
    pub(crate) origin: Option<Coord<f64>>,
    pub(crate) limit: usize,
    pub(crate) providers: ProviderSettings,
}

impl TryFrom<SearchArgs> for SearchCommandConfig {
    type Error = CliError;

    fn try_from(args: SearchArgs) -> Result<Self, Self::Error> {
        let query = args.query.ok_or(CliError::MissingArgument {
            field: ARG_QUERY,
            env: ENV_QUERY,
        })?;
        if query.trim().is_empty() {
            return Err(CliError::InvalidArgument {
                field: ARG_QUERY,
                reason: "must not be blank".to_owned(),
            });
        }

        let origin = match (args.lat, args.lon) {
            (Some(lat), Some(lon)) => Some(coordinate(lat, lon)?),
            (None, None) => None,
            (Some(_), None) => return Err(unpaired(ARG_LON)),
            (None, Some(_)) => return Err(unpaired(ARG_LAT)),
        };

        Ok(Self {
            query,
            origin,
            limit: args.limit.unwrap_or(DEFAULT_LIMIT),
            providers: ProviderSettings::resolve(
                args.gomap_guid,
                args.primary_url,
                args.secondary_url,
                args.search_url,
                args.timeout_secs,
                args.language.as_deref(),
            )?,
        })
    }
}

fn unpaired(missing: &'static str) -> CliError {
    CliError::InvalidArgument {
        field: missing,
        reason: "--lat and --lon must be given together".to_owned(),
    }
}

pub(crate) fn run_search(args: SearchArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    run_search_with(args, &HttpPipelineBuilder, writer)
}

pub(crate) fn run_search_with(
    args: SearchArgs,
    builder: &dyn PipelineBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let pipeline = builder.build(&config.providers)?;
    let places = search(&config, &pipeline);
    write_json(writer, &places)
}

pub(crate) fn search(config: &SearchCommandConfig, pipeline: &DynPipeline) -> Vec<Place> {
    pipeline.search_places(
        &config.query,
        config.origin.map(|origin| origin.y),
        config.origin.map(|origin| origin.x),
        config.limit,
        Some(config.providers.language),
    )
}
