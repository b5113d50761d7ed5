//! Defensive decoding of primary-service payloads.
//!
//! Replies may be a JSON object, a JSON array, JSON wrapped in an XML
//! `<string>` envelope, or a bare error string. [`decode`] folds all of these
//! into a JSON object; a body that is not JSON becomes
//! `{"success": false, "msg": <body>}`.
//!
//! Field names and units vary between endpoints, so every value is read by
//! probing an ordered table of candidate keys. The first candidate that yields
//! a usable value wins. Supporting a new spelling means adding it to a table.

use geo::Coord;
use reserve_core::{
    Place, ProviderError, RouteResult, RouteSource, TrafficSeverity, TrafficSnapshot, coordinate,
};
use serde_json::{Map, Value};

use super::duration::parse_duration_text;

/// Decoded payload object.
pub(crate) type Payload = Map<String, Value>;

pub(crate) const DISTANCE_KEYS: &[&str] = &[
    "distance",
    "Distance",
    "len",
    "length",
    "route_distance",
    "path_length",
];
pub(crate) const DURATION_KEYS: &[&str] = &["time", "Time", "duration", "eta", "travel_time"];
pub(crate) const GEOMETRY_KEYS: &[&str] = &["route", "geometry", "points", "coords"];
pub(crate) const NOTICE_KEYS: &[&str] = &["msg", "message", "comment"];

pub(crate) const ROW_KEYS: &[&str] = &["rows", "result", "data"];
pub(crate) const LAT_KEYS: &[&str] = &["y", "lat"];
pub(crate) const LON_KEYS: &[&str] = &["x", "lon"];
pub(crate) const NAME_KEYS: &[&str] = &["nm", "name", "poiName"];
pub(crate) const ADDRESS_KEYS: &[&str] = &["addr", "address", "fullAddress"];
pub(crate) const ID_KEYS: &[&str] = &["id", "object_id", "poiGuid"];
pub(crate) const ROW_DISTANCE_KEYS: &[&str] = &["distance", "dist", "distance_m"];
pub(crate) const SIMILARITY_KEYS: &[&str] = &["similarity", "score"];

pub(crate) const TRAFFIC_CONTAINER_KEYS: &[&str] = &["traffic", "data"];
pub(crate) const SEVERITY_KEYS: &[&str] = &["severity", "level", "traffic_level"];
pub(crate) const SPEED_KEYS: &[&str] = &["speed", "speed_kmh", "avg_speed"];
pub(crate) const DELAY_KEYS: &[&str] = &["delay", "delay_minutes"];
pub(crate) const CONGESTION_KEYS: &[&str] = &["congestion", "congestion_level"];

/// Raw distances above this are metres rather than kilometres.
const METRES_THRESHOLD: f64 = 500.0;
/// Raw durations above this are seconds rather than minutes.
const SECONDS_THRESHOLD: f64 = 200.0;

/// Fold a response body into a payload object.
pub(crate) fn decode(body: &str) -> Payload {
    let stripped = body.trim();
    if stripped.is_empty() {
        return Payload::new();
    }
    if let Some(payload) = decode_json(stripped) {
        return payload;
    }
    let unwrapped = strip_envelope(stripped);
    if let Some(payload) = unwrapped.and_then(decode_json) {
        return payload;
    }

    let mut payload = Payload::new();
    payload.insert("success".to_owned(), Value::Bool(false));
    payload.insert(
        "msg".to_owned(),
        Value::String(unwrapped.unwrap_or(stripped).to_owned()),
    );
    payload
}

fn decode_json(text: &str) -> Option<Payload> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Object(map) => Some(map),
        other => {
            let mut payload = Payload::new();
            payload.insert("data".to_owned(), other);
            Some(payload)
        }
    }
}

/// Remove a surrounding XML element such as `<string xmlns="...">...</string>`.
fn strip_envelope(text: &str) -> Option<&str> {
    let mut text = text;
    while text.starts_with("<?") {
        let (_, rest) = text.split_once("?>")?;
        text = rest.trim_start();
    }
    if !text.starts_with('<') || !text.contains("</") {
        return None;
    }
    let (_, inner) = text.split_once('>')?;
    let inner = inner.rfind("</").map_or(inner, |end| inner.get(..end).unwrap_or(inner));
    Some(inner.trim())
}

/// Reject payloads that explicitly report `success: false`.
pub(crate) fn ensure_success(payload: Payload) -> Result<Payload, ProviderError> {
    if payload.get("success") == Some(&Value::Bool(false)) {
        let message = probe(&payload, NOTICE_KEYS, text).unwrap_or_else(|| "unspecified".to_owned());
        return Err(ProviderError::Service { message });
    }
    Ok(payload)
}

/// Return the first value in `keys` order that `extract` accepts.
pub(crate) fn probe<'a, T>(
    map: &'a Payload,
    keys: &[&str],
    extract: impl Fn(&'a Value) -> Option<T>,
) -> Option<T> {
    keys.iter().filter_map(|key| map.get(*key)).find_map(extract)
}

/// Finite number from a JSON number or numeric string.
pub(crate) fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

/// Non-blank text; numbers are rendered so numeric identifiers survive.
pub(crate) fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(raw) if !raw.trim().is_empty() => Some(raw.trim().to_owned()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Interpret a raw distance as kilometres, rounded to metres.
pub(crate) fn normalize_distance_km(raw: f64) -> Option<f64> {
    if !raw.is_finite() || raw < 0.0 {
        return None;
    }
    let km = if raw > METRES_THRESHOLD { raw / 1_000.0 } else { raw };
    Some((km * 1_000.0).round() / 1_000.0)
}

/// Interpret a raw duration as whole seconds.
///
/// Values above the threshold are already seconds; smaller values are
/// minutes.
pub(crate) fn normalize_duration_seconds(raw: f64) -> Option<u64> {
    if !raw.is_finite() || raw < 0.0 {
        return None;
    }
    let seconds = if raw > SECONDS_THRESHOLD { raw } else { raw * 60.0 };
    #[expect(
        clippy::cast_possible_truncation,
        reason = "Finite, non-negative seconds; the cast saturates"
    )]
    let seconds = seconds.round() as u64;
    Some(seconds.max(1))
}

fn distance_value(value: &Value) -> Option<f64> {
    number(value).and_then(normalize_distance_km)
}

fn duration_value(value: &Value) -> Option<u64> {
    match number(value) {
        Some(raw) => normalize_duration_seconds(raw),
        None => value.as_str().and_then(parse_duration_text),
    }
}

/// Parse route geometry from any of the shapes the service emits.
///
/// Accepted: `"lon,lat;lon,lat"` strings, JSON-encoded arrays, arrays of
/// `[lon, lat]` pairs or `"lon,lat"` strings, arrays of objects with `x`/`y`
/// or `lon`/`lat`, and objects nesting any of those. Invalid points are
/// dropped.
pub(crate) fn parse_geometry(value: &Value) -> Option<Vec<Coord<f64>>> {
    let points: Vec<Coord<f64>> = match value {
        Value::String(raw) => {
            let raw = raw.trim();
            if raw.starts_with('[') {
                let nested = serde_json::from_str::<Value>(raw).ok()?;
                return parse_geometry(&nested);
            }
            raw.split(';').filter_map(point_from_pair).collect()
        }
        Value::Object(map) => return probe(map, &["points", "route", "coords"], parse_geometry),
        Value::Array(items) => items.iter().filter_map(point).collect(),
        _ => return None,
    };
    (!points.is_empty()).then_some(points)
}

fn point(item: &Value) -> Option<Coord<f64>> {
    match item {
        Value::Object(map) => {
            let lon = probe(map, LON_KEYS, number)?;
            let lat = probe(map, LAT_KEYS, number)?;
            coordinate(lat, lon).ok()
        }
        Value::Array(pair) => match pair.as_slice() {
            [lon, lat, ..] => coordinate(number(lat)?, number(lon)?).ok(),
            _ => None,
        },
        Value::String(raw) => point_from_pair(raw),
        _ => None,
    }
}

fn point_from_pair(raw: &str) -> Option<Coord<f64>> {
    let (lon, lat) = raw.trim().split_once(',')?;
    let lon = lon.trim().parse::<f64>().ok()?;
    let lat = lat.trim().parse::<f64>().ok()?;
    coordinate(lat, lon).ok()
}

/// Build a route from a primary-service payload.
///
/// Returns `None` when neither a distance nor a duration can be found.
pub(crate) fn route_from_payload(payload: &Payload) -> Option<RouteResult> {
    let distance = probe(payload, DISTANCE_KEYS, distance_value);
    let duration = probe(payload, DURATION_KEYS, duration_value);
    if distance.is_none() && duration.is_none() {
        return None;
    }

    let mut route = RouteResult::new(RouteSource::Primary);
    if let Some(km) = distance {
        route = route.with_distance_km(km);
    }
    if let Some(seconds) = duration {
        route = route.with_duration_seconds(seconds);
    }
    if let Some(geometry) = probe(payload, GEOMETRY_KEYS, parse_geometry) {
        route = route.with_geometry(geometry);
    }
    if let Some(notice) = probe(payload, NOTICE_KEYS, text) {
        route = route.with_notice(notice);
    }
    Some(route)
}

/// Build places from the row list of a search payload.
///
/// Rows without a valid location are skipped. `fallback_name` stands in for
/// rows that carry neither a name nor an address.
pub(crate) fn places_from_payload(payload: &Payload, fallback_name: &str, provider: &str) -> Vec<Place> {
    let Some(rows) = probe(payload, ROW_KEYS, Value::as_array) else {
        return Vec::new();
    };
    rows.iter()
        .filter_map(Value::as_object)
        .filter_map(|row| place_from_row(row, fallback_name, provider))
        .collect()
}

fn place_from_row(row: &Payload, fallback_name: &str, provider: &str) -> Option<Place> {
    let lat = probe(row, LAT_KEYS, number)?;
    let lon = probe(row, LON_KEYS, number)?;
    let location = coordinate(lat, lon).ok()?;

    let name = probe(row, NAME_KEYS, text);
    let address = probe(row, ADDRESS_KEYS, text);
    let display = name
        .clone()
        .or_else(|| address.clone())
        .unwrap_or_else(|| fallback_name.to_owned());
    let id = probe(row, ID_KEYS, text)
        .unwrap_or_else(|| format!("{display}@{lat:.5},{lon:.5}"));

    let mut place = Place::new(id, display, location, provider);
    if let (Some(address), Some(_)) = (address, name) {
        place = place.with_address(address);
    }
    if let Some(meters) = probe(row, ROW_DISTANCE_KEYS, number) {
        place = place.with_distance_meters(meters);
    }
    if let Some(score) = probe(row, SIMILARITY_KEYS, number) {
        place = place.with_similarity(score);
    }
    Some(place)
}

fn severity(value: &Value) -> Option<TrafficSeverity> {
    if let Some(ordinal) = number(value) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "Out-of-range ordinals saturate and map to unknown"
        )]
        let ordinal = ordinal.round() as i64;
        return Some(TrafficSeverity::from_ordinal(ordinal));
    }
    value.as_str().and_then(TrafficSeverity::from_label)
}

/// Build a traffic snapshot from a traffic payload.
///
/// Readings may sit under a `traffic` or `data` object or at the root.
/// Returns `None` when no severity is reported.
pub(crate) fn traffic_from_payload(payload: &Payload) -> Option<TrafficSnapshot> {
    let container = probe(payload, TRAFFIC_CONTAINER_KEYS, Value::as_object).unwrap_or(payload);
    let mut snapshot = TrafficSnapshot::new(probe(container, SEVERITY_KEYS, severity)?);
    if let Some(speed) = probe(container, SPEED_KEYS, number) {
        snapshot = snapshot.with_speed_kmh(speed);
    }
    if let Some(delay) = probe(container, DELAY_KEYS, number).filter(|d| *d >= 0.0) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "Non-negative delay; the cast saturates before narrowing"
        )]
        let delay = delay.round() as u64;
        snapshot = snapshot.with_delay_minutes(u32::try_from(delay).unwrap_or(u32::MAX));
    }
    if let Some(level) = probe(container, CONGESTION_KEYS, number) {
        snapshot = snapshot.with_congestion_level(level);
    }
    Some(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn object(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[rstest]
    fn decodes_plain_json() {
        let payload = decode(r#"{"success": true, "distance": 5.2}"#);
        assert_eq!(payload.get("distance"), Some(&json!(5.2)));
    }

    #[rstest]
    fn wraps_non_object_json() {
        let payload = decode("[1, 2]");
        assert_eq!(payload.get("data"), Some(&json!([1, 2])));
    }

    #[rstest]
    fn unwraps_xml_envelope() {
        let payload = decode(r#"<string xmlns="http://tempuri.org/">{"time": 12}</string>"#);
        assert_eq!(payload.get("time"), Some(&json!(12)));

        let body = r#"<?xml version="1.0" encoding="utf-8"?>
<string xmlns="http://tempuri.org/">{"time": 14}</string>"#;
        assert_eq!(decode(body).get("time"), Some(&json!(14)));
    }

    #[rstest]
    #[case("Invalid guid", "Invalid guid")]
    #[case("<string>Route not found</string>", "Route not found")]
    fn plain_text_becomes_failure(#[case] body: &str, #[case] message: &str) {
        let payload = decode(body);
        let err = ensure_success(payload).expect_err("failure payload");
        assert_eq!(
            err,
            ProviderError::Service {
                message: message.to_owned()
            }
        );
    }

    #[rstest]
    fn empty_body_is_an_empty_object() {
        assert!(decode("  \n").is_empty());
    }

    #[rstest]
    #[case(6_400.0, 6.4)]
    #[case(6.4, 6.4)]
    #[case(500.0, 500.0)]
    #[case(2_345.0, 2.345)]
    fn distances_above_threshold_are_metres(#[case] raw: f64, #[case] km: f64) {
        assert_eq!(normalize_distance_km(raw), Some(km));
    }

    #[rstest]
    #[case(7.0, 420)]
    #[case(420.0, 420)]
    #[case(200.0, 12_000)]
    #[case(0.0, 1)]
    fn small_durations_are_minutes(#[case] raw: f64, #[case] seconds: u64) {
        assert_eq!(normalize_duration_seconds(raw), Some(seconds));
    }

    #[rstest]
    fn oversized_durations_saturate() {
        assert_eq!(normalize_duration_seconds(1.0e30), Some(u64::MAX));
    }

    #[rstest]
    #[case(json!("NaN"))]
    #[case(json!("inf"))]
    #[case(json!("n/a"))]
    #[case(json!(null))]
    #[case(json!(true))]
    fn rejects_non_numeric_values(#[case] value: Value) {
        assert_eq!(number(&value), None);
    }

    #[rstest]
    fn numeric_strings_are_numbers() {
        assert_eq!(number(&json!(" 5.2 ")), Some(5.2));
    }

    #[rstest]
    fn probes_keys_in_order() {
        let payload = object(json!({"len": 3.0, "distance": "bogus", "length": 4.0}));
        assert_eq!(probe(&payload, DISTANCE_KEYS, distance_value), Some(3.0));
    }

    #[rstest]
    #[case(json!("49.8671,40.4093;49.8700,40.4100"))]
    #[case(json!("[[49.8671,40.4093],[49.8700,40.4100]]"))]
    #[case(json!([[49.8671, 40.4093], [49.87, 40.41]]))]
    #[case(json!([{"x": 49.8671, "y": 40.4093}, {"lon": 49.87, "lat": 40.41}]))]
    #[case(json!(["49.8671,40.4093", "49.87,40.41"]))]
    #[case(json!({"points": [[49.8671, 40.4093], [49.87, 40.41]]}))]
    fn parses_geometry_shapes(#[case] value: Value) {
        let points = parse_geometry(&value).expect("geometry");
        assert_eq!(points.len(), 2);
        assert_eq!(points[0], Coord { x: 49.8671, y: 40.4093 });
    }

    #[rstest]
    fn drops_invalid_points() {
        let value = json!([[49.8, 40.4], [200.0, 95.0], "garbage"]);
        assert_eq!(parse_geometry(&value).map(|p| p.len()), Some(1));
        assert_eq!(parse_geometry(&json!("")), None);
    }

    #[rstest]
    fn route_reads_probed_fields() {
        let payload = object(json!({
            "success": true,
            "distance": 5.2,
            "time": 12,
            "route": "[[49.8671,40.4093],[49.8700,40.4100]]",
            "msg": "ok"
        }));
        let route = route_from_payload(&payload).expect("route");
        assert_eq!(route.source(), RouteSource::Primary);
        assert_eq!(route.distance_km(), Some(5.2));
        assert_eq!(route.duration_seconds(), Some(720));
        assert_eq!(route.geometry_len(), 2);
        assert_eq!(route.notice(), Some("ok"));
    }

    #[rstest]
    fn route_accepts_prose_durations() {
        let payload = object(json!({"Distance": "6400", "Time": "12 dəq 30 san"}));
        let route = route_from_payload(&payload).expect("route");
        assert_eq!(route.distance_km(), Some(6.4));
        assert_eq!(route.duration_seconds(), Some(750));
    }

    #[rstest]
    fn route_without_measurements_is_absent() {
        let payload = object(json!({"success": true, "msg": "nothing"}));
        assert!(route_from_payload(&payload).is_none());
    }

    #[rstest]
    fn places_read_rows() {
        let payload = object(json!({
            "rows": [
                {"id": "poi1", "nm": "Flame Towers", "addr": "Mehdi Huseyn 1A", "x": 49.8261, "y": 40.3594},
                {"id": 7, "name": "Nizami Street", "lon": "49.8453", "lat": "40.3777", "distance": 2500},
                {"nm": "Nowhere", "x": 300.0, "y": 40.0},
                {"similarity": 0.85, "x": 49.9, "y": 40.4}
            ]
        }));
        let places = places_from_payload(&payload, "towers", "gomap");

        assert_eq!(places.len(), 3);
        assert_eq!(places[0].id, "poi1");
        assert_eq!(places[0].place_name, "Flame Towers, Mehdi Huseyn 1A");
        assert_eq!(places[0].location, Coord { x: 49.8261, y: 40.3594 });
        assert_eq!(places[1].id, "7");
        assert_eq!(places[1].distance_text.as_deref(), Some("2.5 km"));
        assert_eq!(places[2].name, "towers");
        assert_eq!(places[2].similarity, Some(0.85));
        assert!(places.iter().all(|p| p.provider == "gomap"));
    }

    #[rstest]
    fn places_missing_rows_are_empty() {
        let payload = object(json!({"success": true}));
        assert!(places_from_payload(&payload, "q", "gomap").is_empty());
    }

    #[rstest]
    fn traffic_reads_nested_snapshot() {
        let payload = object(json!({"traffic": {"severity": 2, "speed": 25.5, "congestion": 0.3, "delay": 4}}));
        let snapshot = traffic_from_payload(&payload).expect("snapshot");
        assert_eq!(snapshot.severity(), TrafficSeverity::Moderate);
        assert_eq!(snapshot.speed_kmh(), Some(25.5));
        assert_eq!(snapshot.congestion_level(), Some(0.3));
        assert_eq!(snapshot.delay_minutes(), Some(4));
    }

    #[rstest]
    #[case(json!({"level": 9}), TrafficSeverity::Severe)]
    #[case(json!({"traffic_level": -3}), TrafficSeverity::Unknown)]
    #[case(json!({"severity": "heavy"}), TrafficSeverity::Heavy)]
    #[case(json!({"data": {"severity": "3"}}), TrafficSeverity::Heavy)]
    fn traffic_severity_is_normalised(#[case] value: Value, #[case] expected: TrafficSeverity) {
        let snapshot = traffic_from_payload(&object(value)).expect("snapshot");
        assert_eq!(snapshot.severity(), expected);
    }

    #[rstest]
    fn traffic_without_severity_is_absent() {
        assert!(traffic_from_payload(&object(json!({"traffic": {"speed": 40}}))).is_none());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn undecodable_bodies_become_service_failures(body in ".{0,200}") {
                let payload = decode(&body);
                if payload.get("success") == Some(&Value::Bool(false)) {
                    prop_assert!(ensure_success(payload).is_err());
                }
            }

            #[test]
            fn normalized_distances_stay_close_to_kilometres(raw in 0.0f64..1.0e7) {
                let km = normalize_distance_km(raw).expect("non-negative input is accepted");
                let expected = if raw > METRES_THRESHOLD { raw / 1_000.0 } else { raw };
                prop_assert!(km >= 0.0);
                prop_assert!((km - expected).abs() <= 0.0005 + f64::EPSILON * expected);
            }

            #[test]
            fn normalized_durations_are_at_least_one_second(raw in 0.0f64..1.0e6) {
                let seconds = normalize_duration_seconds(raw).expect("non-negative input is accepted");
                prop_assert!(seconds >= 1);
            }
        }
    }
}
