//! Command-line front end for the reserve ETA pipeline.
//!
//! Three subcommands are exposed:
//! - `eta` asks both routing services for a route, reconciles them and
//!   applies live traffic, falling back to a straight-line estimate when no
//!   route is available.
//! - `search` runs the escalating place search.
//! - `fallback` prints the synthetic estimate used when routing is down.
//!
//! Every subcommand layers its options from flags, configuration files and
//! `RESERVE_*` environment variables before printing its result as JSON.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod error;
mod eta;
mod fallback;
mod providers;
mod search;

pub use error::CliError;

use eta::{EtaArgs, run_eta};
use fallback::{FallbackArgs, run_fallback};
use search::{SearchArgs, run_search};

pub(crate) const ARG_ORIGIN_LAT: &str = "origin-lat";
pub(crate) const ARG_ORIGIN_LON: &str = "origin-lon";
pub(crate) const ARG_DEST_LAT: &str = "dest-lat";
pub(crate) const ARG_DEST_LON: &str = "dest-lon";
pub(crate) const ARG_FALLBACK_SPEED: &str = "fallback-speed-kmh";
pub(crate) const ARG_QUERY: &str = "query";
pub(crate) const ARG_LAT: &str = "lat";
pub(crate) const ARG_LON: &str = "lon";
pub(crate) const ARG_LIMIT: &str = "limit";
pub(crate) const ARG_LANGUAGE: &str = "language";
pub(crate) const ARG_DISTANCE_KM: &str = "distance-km";
pub(crate) const ARG_MINUTES: &str = "minutes";
pub(crate) const ARG_GOMAP_GUID: &str = "gomap-guid";
pub(crate) const ARG_PRIMARY_URL: &str = "primary-url";
pub(crate) const ARG_SECONDARY_URL: &str = "secondary-url";
pub(crate) const ARG_SEARCH_URL: &str = "search-url";
pub(crate) const ARG_TIMEOUT_SECS: &str = "timeout-secs";

pub(crate) const ENV_ORIGIN_LAT: &str = "RESERVE_CMDS_ETA_ORIGIN_LAT";
pub(crate) const ENV_ORIGIN_LON: &str = "RESERVE_CMDS_ETA_ORIGIN_LON";
pub(crate) const ENV_DEST_LAT: &str = "RESERVE_CMDS_ETA_DEST_LAT";
pub(crate) const ENV_DEST_LON: &str = "RESERVE_CMDS_ETA_DEST_LON";
pub(crate) const ENV_QUERY: &str = "RESERVE_CMDS_SEARCH_QUERY";
pub(crate) const ENV_DISTANCE_KM: &str = "RESERVE_CMDS_FALLBACK_DISTANCE_KM";
pub(crate) const ENV_MINUTES: &str = "RESERVE_CMDS_FALLBACK_MINUTES";

/// Run the CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Command::Eta(args) => run_eta(args, &mut stdout),
        Command::Search(args) => run_search(args, &mut stdout),
        Command::Fallback(args) => run_fallback(args, &mut stdout),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "reserve-eta",
    about = "Route, traffic and place lookups with provider failover",
    version
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Estimate travel time between two coordinates.
    Eta(EtaArgs),
    /// Search for places by name.
    Search(SearchArgs),
    /// Print the synthetic ETA used when no route is available.
    Fallback(FallbackArgs),
}

/// Pretty-print `value` as JSON followed by a newline.
pub(crate) fn write_json<T: serde::Serialize>(
    writer: &mut dyn std::io::Write,
    value: &T,
) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(value).map_err(CliError::SerialiseOutput)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}

#[cfg(test)]
mod tests;
