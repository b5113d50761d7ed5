//! The `fallback` command: the synthetic ETA used when routing is down.

use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use reserve_core::{EtaComputation, build_fallback_eta};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::{ARG_DISTANCE_KM, ARG_MINUTES, CliError, ENV_DISTANCE_KM, ENV_MINUTES, write_json};

/// CLI arguments for the `fallback` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Print the least-confidence ETA built from a distance and a \
                 travel time chosen by the caller. No service is contacted.",
    about = "Print a synthetic fallback ETA"
)]
#[ortho_config(prefix = "RESERVE")]
pub(crate) struct FallbackArgs {
    /// Straight-line distance in kilometres.
    #[arg(long = ARG_DISTANCE_KM, value_name = "km")]
    #[serde(default)]
    pub(crate) distance_km: Option<f64>,
    /// Travel time in minutes; zero is raised to one.
    #[arg(long = ARG_MINUTES, value_name = "min")]
    #[serde(default)]
    pub(crate) minutes: Option<u64>,
}

impl FallbackArgs {
    pub(crate) fn into_config(self) -> Result<FallbackCommandConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        FallbackCommandConfig::try_from(merged)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FallbackCommandConfig {
    pub(crate) distance_km: f64,
    pub(crate) minutes: u64,
}

impl TryFrom<FallbackArgs> for FallbackCommandConfig {
    type Error = CliError;

    fn try_from(args: FallbackArgs) -> Result<Self, Self::Error> {
        let distance_km = args.distance_km.ok_or(CliError::MissingArgument {
            field: ARG_DISTANCE_KM,
            env: ENV_DISTANCE_KM,
        })?;
        if !(distance_km.is_finite() && distance_km >= 0.0) {
            return Err(CliError::InvalidArgument {
                field: ARG_DISTANCE_KM,
                reason: format!("{distance_km} is not a non-negative distance"),
            });
        }
        let minutes = args.minutes.ok_or(CliError::MissingArgument {
            field: ARG_MINUTES,
            env: ENV_MINUTES,
        })?;
        Ok(Self {
            distance_km,
            minutes,
        })
    }
}

impl FallbackCommandConfig {
    pub(crate) fn eta(self) -> EtaComputation {
        build_fallback_eta(self.distance_km, self.minutes)
    }
}

pub(crate) fn run_fallback(args: FallbackArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    write_json(writer, &config.eta())
}
