//! The `eta` command: reconcile both routing services and apply traffic.

use clap::Parser;
use geo::Coord;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use reserve_core::{
    EtaComputation, build_fallback_eta, coordinate, fallback_minutes_for, haversine_km,
};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::providers::{DynPipeline, HttpPipelineBuilder, PipelineBuilder, ProviderSettings};
use crate::{
    ARG_DEST_LAT, ARG_DEST_LON, ARG_FALLBACK_SPEED, ARG_GOMAP_GUID, ARG_LANGUAGE,
    ARG_ORIGIN_LAT, ARG_ORIGIN_LON, ARG_PRIMARY_URL, ARG_SEARCH_URL, ARG_SECONDARY_URL,
    ARG_TIMEOUT_SECS, CliError, ENV_DEST_LAT, ENV_DEST_LON, ENV_ORIGIN_LAT, ENV_ORIGIN_LON,
    write_json,
};

pub(crate) const DEFAULT_FALLBACK_SPEED_KMH: f64 = 25.0;

/// CLI arguments for the `eta` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Ask the primary and secondary routing services for a route, \
                 reconcile their answers and adjust for live traffic. When \
                 neither service answers, a straight-line estimate at the \
                 fallback speed is printed instead.",
    about = "Estimate travel time between two coordinates",
    allow_negative_numbers = true
)]
#[ortho_config(prefix = "RESERVE")]
pub(crate) struct EtaArgs {
    /// Origin latitude in degrees.
    #[arg(long = ARG_ORIGIN_LAT, value_name = "deg")]
    #[serde(default)]
    pub(crate) origin_lat: Option<f64>,
    /// Origin longitude in degrees.
    #[arg(long = ARG_ORIGIN_LON, value_name = "deg")]
    #[serde(default)]
    pub(crate) origin_lon: Option<f64>,
    /// Destination latitude in degrees.
    #[arg(long = ARG_DEST_LAT, value_name = "deg")]
    #[serde(default)]
    pub(crate) dest_lat: Option<f64>,
    /// Destination longitude in degrees.
    #[arg(long = ARG_DEST_LON, value_name = "deg")]
    #[serde(default)]
    pub(crate) dest_lon: Option<f64>,
    /// Speed assumed for the straight-line estimate (default 25 km/h).
    #[arg(long = ARG_FALLBACK_SPEED, value_name = "km/h")]
    #[serde(default)]
    pub(crate) fallback_speed_kmh: Option<f64>,
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

impl EtaArgs {
    pub(crate) fn into_config(self) -> Result<EtaCommandConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        EtaCommandConfig::try_from(merged)
    }
}

/// Resolved `eta` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EtaCommandConfig {
    pub(crate) origin: Coord<f64>,
    pub(crate) destination: Coord<f64>,
    pub(crate) fallback_speed_kmh: f64,
    pub(crate) providers: ProviderSettings,
}

impl TryFrom<EtaArgs> for EtaCommandConfig {
    type Error = CliError;

    fn try_from(args: EtaArgs) -> Result<Self, Self::Error> {
        let origin_lat = args.origin_lat.ok_or(CliError::MissingArgument {
            field: ARG_ORIGIN_LAT,
            env: ENV_ORIGIN_LAT,
        })?;
        let origin_lon = args.origin_lon.ok_or(CliError::MissingArgument {
            field: ARG_ORIGIN_LON,
            env: ENV_ORIGIN_LON,
        })?;
        let dest_lat = args.dest_lat.ok_or(CliError::MissingArgument {
            field: ARG_DEST_LAT,
            env: ENV_DEST_LAT,
        })?;
        let dest_lon = args.dest_lon.ok_or(CliError::MissingArgument {
            field: ARG_DEST_LON,
            env: ENV_DEST_LON,
        })?;

        let fallback_speed_kmh = args
            .fallback_speed_kmh
            .unwrap_or(DEFAULT_FALLBACK_SPEED_KMH);
        if !(fallback_speed_kmh.is_finite() && fallback_speed_kmh > 0.0) {
            return Err(CliError::InvalidArgument {
                field: ARG_FALLBACK_SPEED,
                reason: format!("{fallback_speed_kmh} is not a positive speed"),
            });
        }

        Ok(Self {
            origin: coordinate(origin_lat, origin_lon)?,
            destination: coordinate(dest_lat, dest_lon)?,
            fallback_speed_kmh,
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

pub(crate) fn run_eta(args: EtaArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    run_eta_with(args, &HttpPipelineBuilder, writer)
}

pub(crate) fn run_eta_with(
    args: EtaArgs,
    builder: &dyn PipelineBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let pipeline = builder.build(&config.providers)?;
    let eta = estimate(&config, &pipeline);
    write_json(writer, &eta)
}

/// Ask the pipeline for an ETA, falling back to the straight-line estimate.
pub(crate) fn estimate(config: &EtaCommandConfig, pipeline: &DynPipeline) -> EtaComputation {
    let (origin, destination) = (config.origin, config.destination);
    pipeline
        .compute_eta_with_traffic(origin.y, origin.x, destination.y, destination.x)
        .unwrap_or_else(|| {
            let distance_km = haversine_km(origin, destination);
            log::warn!(
                "no route available; estimating {distance_km:.2} km at {} km/h",
                config.fallback_speed_kmh
            );
            build_fallback_eta(
                distance_km,
                fallback_minutes_for(distance_km, config.fallback_speed_kmh),
            )
        })
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<EtaCommandConfig, CliError> {
    let merged = EtaArgs::merge_from_layers(layers).map_err(CliError::from)?;
    EtaCommandConfig::try_from(merged)
}
