//! Stub pipeline builder and argument fixtures shared by the CLI tests.

use super::*;
use crate::eta::EtaArgs;
use crate::fallback::FallbackArgs;
use crate::providers::{DynPipeline, PipelineBuilder, ProviderSettings};
use crate::search::SearchArgs;
use geo::Coord;
use reserve_core::{EtaPipeline, Place, PipelineConfig, RouteSource, test_support::StubRouteProvider};
use std::cell::RefCell;

/// Builds pipelines from stub providers and records the settings it saw.
#[derive(Debug, Default)]
pub(super) struct StubPipelineBuilder {
    pub(super) primary_route: Option<(f64, u64)>,
    pub(super) secondary_route: Option<(f64, u64)>,
    pub(super) places: Vec<Place>,
    pub(super) seen: RefCell<Option<ProviderSettings>>,
}

impl StubPipelineBuilder {
    fn stub(source: RouteSource, route: Option<(f64, u64)>) -> StubRouteProvider {
        let stub = StubRouteProvider::new(source);
        match route {
            Some((km, seconds)) => stub.with_route(km, seconds),
            None => stub,
        }
    }
}

impl PipelineBuilder for StubPipelineBuilder {
    fn build(&self, settings: &ProviderSettings) -> Result<DynPipeline, CliError> {
        self.seen.replace(Some(settings.clone()));
        let primary = Self::stub(RouteSource::Primary, self.primary_route)
            .with_places(self.places.clone());
        let secondary = Self::stub(RouteSource::Secondary, self.secondary_route);
        Ok(EtaPipeline::new(
            Box::new(primary),
            Box::new(secondary),
            PipelineConfig::default(),
        ))
    }
}

pub(super) fn city_centre_args() -> EtaArgs {
    EtaArgs {
        origin_lat: Some(40.40),
        origin_lon: Some(49.86),
        dest_lat: Some(40.41),
        dest_lon: Some(49.87),
        ..EtaArgs::default()
    }
}

pub(super) fn search_args(query: &str) -> SearchArgs {
    SearchArgs {
        query: Some(query.to_owned()),
        ..SearchArgs::default()
    }
}

pub(super) fn fallback_args(distance_km: f64, minutes: u64) -> FallbackArgs {
    FallbackArgs {
        distance_km: Some(distance_km),
        minutes: Some(minutes),
    }
}

pub(super) fn flame_towers() -> Place {
    Place::new(
        "poi1",
        "Flame Towers",
        Coord {
            x: 49.8261,
            y: 40.3594,
        },
        "gomap",
    )
}
