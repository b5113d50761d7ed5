//! Place search that escalates across strategies when results are thin.

use std::collections::HashSet;

use crate::location::haversine_km;
use crate::place::{Place, PlaceQuery, SearchStrategy};
use crate::provider::PlaceProvider;

/// Search `primary` with increasingly lenient strategies, then `secondary`.
///
/// 1. Exact match.
/// 2. Distance-aware match when an origin is known and fewer than
///    `query.limit()` places were found.
/// 3. Fuzzy match when nothing has been found yet.
/// 4. The secondary provider when the primary produced nothing at all.
///
/// Results are de-duplicated by id, annotated with the distance from the
/// origin when the provider omitted it, and truncated to the limit. The
/// strategy already set on `query` is ignored.
pub fn smart_search<P, S>(primary: &P, secondary: &S, query: &PlaceQuery) -> Vec<Place>
where
    P: PlaceProvider + ?Sized,
    S: PlaceProvider + ?Sized,
{
    let limit = query.limit();
    let mut merged = Merged::default();

    merged.extend(primary.fetch_places(&query.clone().with_strategy(SearchStrategy::Exact)));

    if query.origin().is_some() && merged.len() < limit {
        log::debug!(
            "exact search for '{}' returned {} of {limit}; trying distance-aware search",
            query.text(),
            merged.len()
        );
        merged.extend(
            primary.fetch_places(&query.clone().with_strategy(SearchStrategy::DistanceAware)),
        );
    }

    if merged.is_empty() {
        log::debug!("no exact match for '{}'; trying fuzzy search", query.text());
        merged.extend(primary.fetch_places(&query.clone().with_strategy(SearchStrategy::Fuzzy)));
    }

    if merged.is_empty() {
        log::info!("primary search empty for '{}'; asking secondary", query.text());
        merged.extend(secondary.fetch_places(query));
    }

    let mut places = merged.places;
    places.truncate(limit);
    if let Some(origin) = query.origin() {
        places = places
            .into_iter()
            .map(|place| {
                if place.distance_meters.is_some() {
                    place
                } else {
                    let meters = haversine_km(origin, place.location) * 1_000.0;
                    place.with_distance_meters(meters.round())
                }
            })
            .collect();
    }
    places
}

#[derive(Default)]
struct Merged {
    seen: HashSet<String>,
    places: Vec<Place>,
}

impl Merged {
    fn extend(&mut self, batch: Vec<Place>) {
        for place in batch {
            if self.seen.insert(place.id.clone()) {
                self.places.push(place);
            }
        }
    }

    fn len(&self) -> usize {
        self.places.len()
    }

    fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}
