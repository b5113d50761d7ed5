//! Focused unit tests covering command configuration and output.

use super::helpers::{
    StubPipelineBuilder, city_centre_args, fallback_args, flame_towers, search_args,
};
use super::*;
use crate::eta::{DEFAULT_FALLBACK_SPEED_KMH, EtaArgs, EtaCommandConfig, run_eta_with};
use crate::fallback::{FallbackArgs, FallbackCommandConfig};
use crate::providers::ProviderSettings;
use crate::search::{DEFAULT_LIMIT, SearchArgs, SearchCommandConfig, run_search_with};
use reserve_core::{EtaComputation, Language, Place, RouteSource};
use reserve_data::routing::{DEFAULT_PRIMARY_BASE_URL, DEFAULT_SECONDARY_BASE_URL};
use rstest::rstest;
use std::time::Duration;

#[rstest]
#[case::origin_lat(EtaArgs { origin_lat: None, ..city_centre_args() }, ARG_ORIGIN_LAT, ENV_ORIGIN_LAT)]
#[case::origin_lon(EtaArgs { origin_lon: None, ..city_centre_args() }, ARG_ORIGIN_LON, ENV_ORIGIN_LON)]
#[case::dest_lat(EtaArgs { dest_lat: None, ..city_centre_args() }, ARG_DEST_LAT, ENV_DEST_LAT)]
#[case::dest_lon(EtaArgs { dest_lon: None, ..city_centre_args() }, ARG_DEST_LON, ENV_DEST_LON)]
fn converting_eta_without_coordinates_errors(
    #[case] args: EtaArgs,
    #[case] expected_field: &'static str,
    #[case] expected_env: &'static str,
) {
    let err = EtaCommandConfig::try_from(args).expect_err("missing coordinate should error");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, expected_field);
            assert_eq!(env, expected_env);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn eta_config_applies_defaults() {
    let config = EtaCommandConfig::try_from(city_centre_args()).expect("config should build");

    assert_eq!(config.fallback_speed_kmh, DEFAULT_FALLBACK_SPEED_KMH);
    assert_eq!(
        config.providers,
        ProviderSettings {
            gomap_guid: None,
            primary_url: DEFAULT_PRIMARY_BASE_URL.to_owned(),
            secondary_url: DEFAULT_SECONDARY_BASE_URL.to_owned(),
            search_url: None,
            timeout: Duration::from_secs(4),
            language: Language::Az,
        }
    );
}

#[rstest]
fn eta_config_rejects_out_of_range_coordinates() {
    let args = EtaArgs {
        origin_lat: Some(91.0),
        ..city_centre_args()
    };

    let err = EtaCommandConfig::try_from(args).expect_err("latitude out of range");
    assert!(matches!(err, CliError::InvalidCoordinate(_)), "{err:?}");
}

#[rstest]
#[case(0.0)]
#[case(-5.0)]
#[case(f64::NAN)]
fn eta_config_rejects_unusable_fallback_speed(#[case] speed: f64) {
    let args = EtaArgs {
        fallback_speed_kmh: Some(speed),
        ..city_centre_args()
    };

    let err = EtaCommandConfig::try_from(args).expect_err("speed should be rejected");
    match err {
        CliError::InvalidArgument { field, .. } => assert_eq!(field, ARG_FALLBACK_SPEED),
        other => panic!("expected InvalidArgument, found {other:?}"),
    }
}

#[rstest]
#[case(Some("en"), Ok(Language::En))]
#[case(Some("RU"), Ok(Language::Ru))]
#[case(None, Ok(Language::Az))]
#[case(Some("fr"), Err(ARG_LANGUAGE))]
fn provider_settings_parse_the_language(
    #[case] code: Option<&str>,
    #[case] expected: Result<Language, &'static str>,
) {
    let outcome = ProviderSettings::resolve(None, None, None, None, None, code);
    match (outcome, expected) {
        (Ok(settings), Ok(language)) => assert_eq!(settings.language, language),
        (Err(CliError::InvalidArgument { field, .. }), Err(expected_field)) => {
            assert_eq!(field, expected_field);
        }
        (other, wanted) => panic!("expected {wanted:?}, found {other:?}"),
    }
}

#[rstest]
fn provider_settings_drop_blank_credentials() {
    let settings = ProviderSettings::resolve(Some("  ".to_owned()), None, None, None, Some(9), None)
        .expect("settings");

    assert_eq!(settings.gomap_guid, None);
    assert_eq!(settings.timeout, Duration::from_secs(9));
}

#[rstest]
fn provider_settings_reject_zero_timeout() {
    let err = ProviderSettings::resolve(None, None, None, None, Some(0), None)
        .expect_err("zero timeout");
    match err {
        CliError::InvalidArgument { field, .. } => assert_eq!(field, ARG_TIMEOUT_SECS),
        other => panic!("expected InvalidArgument, found {other:?}"),
    }
}

#[rstest]
fn search_config_requires_a_query() {
    let err = SearchCommandConfig::try_from(SearchArgs::default()).expect_err("missing query");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_QUERY);
            assert_eq!(env, ENV_QUERY);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
#[case::lat_only(Some(40.4), None, ARG_LON)]
#[case::lon_only(None, Some(49.8), ARG_LAT)]
fn search_config_rejects_half_an_origin(
    #[case] lat: Option<f64>,
    #[case] lon: Option<f64>,
    #[case] expected_field: &'static str,
) {
    let args = SearchArgs {
        lat,
        lon,
        ..search_args("Flame Towers")
    };

    let err = SearchCommandConfig::try_from(args).expect_err("unpaired origin");
    match err {
        CliError::InvalidArgument { field, .. } => assert_eq!(field, expected_field),
        other => panic!("expected InvalidArgument, found {other:?}"),
    }
}

#[rstest]
fn search_config_defaults_the_limit() {
    let config = SearchCommandConfig::try_from(search_args("Flame Towers")).expect("config");

    assert_eq!(config.limit, DEFAULT_LIMIT);
    assert_eq!(config.origin, None);
}

#[rstest]
fn fallback_config_rejects_negative_distances() {
    let err = FallbackCommandConfig::try_from(fallback_args(-1.0, 10))
        .expect_err("negative distance");
    match err {
        CliError::InvalidArgument { field, .. } => assert_eq!(field, ARG_DISTANCE_KM),
        other => panic!("expected InvalidArgument, found {other:?}"),
    }
}

#[rstest]
fn fallback_config_requires_minutes() {
    let args = FallbackArgs {
        minutes: None,
        ..fallback_args(3.0, 10)
    };

    let err = FallbackCommandConfig::try_from(args).expect_err("missing minutes");
    match err {
        CliError::MissingArgument { field, .. } => assert_eq!(field, ARG_MINUTES),
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn fallback_eta_floors_minutes_at_one() {
    let config = FallbackCommandConfig::try_from(fallback_args(2.345, 0)).expect("config");

    let eta = config.eta();
    assert_eq!(eta.eta_minutes, 1);
    assert_eq!(eta.route_distance_km, Some(2.35));
    assert_eq!(eta.provider, RouteSource::Fallback);
}

#[rstest]
fn eta_command_prints_reconciled_eta() {
    let builder = StubPipelineBuilder {
        primary_route: Some((5.2, 600)),
        secondary_route: Some((5.3, 620)),
        ..StubPipelineBuilder::default()
    };
    let mut stdout = Vec::new();

    run_eta_with(city_centre_args(), &builder, &mut stdout).expect("eta should succeed");

    let eta: EtaComputation = serde_json::from_slice(&stdout).expect("JSON ETA");
    assert_eq!(eta.provider, RouteSource::Primary);
    assert_eq!(eta.eta_seconds, 610);
}

#[rstest]
fn eta_command_falls_back_to_straight_line() {
    let builder = StubPipelineBuilder::default();
    let mut stdout = Vec::new();

    run_eta_with(city_centre_args(), &builder, &mut stdout).expect("eta should succeed");

    let eta: EtaComputation = serde_json::from_slice(&stdout).expect("JSON ETA");
    assert_eq!(eta.provider, RouteSource::Fallback);
    assert_eq!(eta.route_distance_km, Some(1.4));
    assert_eq!(eta.eta_minutes, 4);
}

#[rstest]
fn search_command_prints_places() {
    let builder = StubPipelineBuilder {
        places: vec![flame_towers()],
        ..StubPipelineBuilder::default()
    };
    let args = SearchArgs {
        language: Some("en".to_owned()),
        ..search_args("Flame Towers")
    };
    let mut stdout = Vec::new();

    run_search_with(args, &builder, &mut stdout).expect("search should succeed");

    let places: Vec<Place> = serde_json::from_slice(&stdout).expect("JSON places");
    assert_eq!(places, vec![flame_towers()]);
    let seen = builder.seen.borrow();
    let settings = seen.as_ref().expect("builder was called");
    assert_eq!(settings.language, Language::En);
}
