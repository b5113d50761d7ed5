//! Place search queries and results.

use geo::Coord;
use thiserror::Error;

use crate::location::{CoordinateError, coordinate, grid_cell};
use crate::request::Language;

/// Largest number of places a single search may return.
pub const MAX_SEARCH_LIMIT: usize = 50;

/// Errors raised while validating a search query.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// The query text was empty after trimming.
    #[error("search query must not be empty")]
    EmptyQuery,
    /// The search origin was out of range.
    #[error("invalid search origin: {0}")]
    Coordinate(#[from] CoordinateError),
}

/// Search strategy offered by the primary service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SearchStrategy {
    /// Exact name/address match.
    #[default]
    Exact,
    /// Match ranked by distance from an origin.
    DistanceAware,
    /// Typo-tolerant settlement and name match.
    Fuzzy,
}

impl SearchStrategy {
    /// Return the strategy as a `snake_case` `&str`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::DistanceAware => "distance_aware",
            Self::Fuzzy => "fuzzy",
        }
    }
}

/// A validated place search.
///
/// # Examples
/// ```
/// use reserve_core::{PlaceQuery, QueryError};
///
/// let query = PlaceQuery::new("  Fountain Square ", 200)?.with_origin(40.37, 49.83)?;
/// assert_eq!(query.text(), "Fountain Square");
/// assert_eq!(query.limit(), 50);
/// assert!(query.origin().is_some());
/// assert_eq!(PlaceQuery::new("   ", 5).unwrap_err(), QueryError::EmptyQuery);
/// # Ok::<(), QueryError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceQuery {
    text: String,
    limit: usize,
    origin: Option<Coord<f64>>,
    language: Option<Language>,
    strategy: SearchStrategy,
}

impl PlaceQuery {
    /// Trim the query text and clamp the limit to `1..=50`.
    pub fn new(text: &str, limit: usize) -> Result<Self, QueryError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(QueryError::EmptyQuery);
        }
        Ok(Self {
            text: trimmed.to_owned(),
            limit: limit.clamp(1, MAX_SEARCH_LIMIT),
            origin: None,
            language: None,
            strategy: SearchStrategy::default(),
        })
    }

    /// Rank results relative to an origin.
    pub fn with_origin(mut self, lat: f64, lon: f64) -> Result<Self, QueryError> {
        self.origin = Some(coordinate(lat, lon)?);
        Ok(self)
    }

    /// Set the response language.
    #[must_use]
    pub const fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    /// Select the search strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Trimmed query text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Maximum number of results.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Search origin, if any.
    #[must_use]
    pub const fn origin(&self) -> Option<Coord<f64>> {
        self.origin
    }

    /// Requested language, if any.
    #[must_use]
    pub const fn language(&self) -> Option<Language> {
        self.language
    }

    /// Selected strategy.
    #[must_use]
    pub const fn strategy(&self) -> SearchStrategy {
        self.strategy
    }

    /// Cache key once the language has been resolved.
    #[must_use]
    pub fn cache_key(&self, default_language: Language) -> PlaceKey {
        PlaceKey {
            text: self.text.to_lowercase(),
            limit: self.limit,
            origin: self.origin.map(grid_cell),
            language: self.language.unwrap_or(default_language),
            strategy: self.strategy,
        }
    }
}

/// Hashable identity of a place search.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlaceKey {
    text: String,
    limit: usize,
    origin: Option<(i64, i64)>,
    language: Language,
    strategy: SearchStrategy,
}

/// A geocoded place.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Place {
    /// Provider identifier; synthesised from name and location when absent.
    pub id: String,
    /// Short display name.
    pub name: String,
    /// Name followed by address, for list display.
    pub place_name: String,
    /// Street address, if reported.
    pub address: Option<String>,
    /// Location with `x = longitude`, `y = latitude`.
    pub location: Coord<f64>,
    /// Label of the provider or strategy that produced the row.
    pub provider: String,
    /// Distance from the search origin in metres.
    pub distance_meters: Option<f64>,
    /// Human-readable distance from the search origin.
    pub distance_text: Option<String>,
    /// Fuzzy match score, if the row came from a fuzzy search.
    pub similarity: Option<f64>,
}

impl Place {
    /// Build a place with only the mandatory fields.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        location: Coord<f64>,
        provider: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            place_name: name.clone(),
            name,
            address: None,
            location,
            provider: provider.into(),
            distance_meters: None,
            distance_text: None,
            similarity: None,
        }
    }

    /// Attach an address and extend `place_name` with it.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        let address = address.into();
        if !address.trim().is_empty() {
            self.place_name = format!("{}, {}", self.name, address);
            self.address = Some(address);
        }
        self
    }

    /// Record the distance from the search origin.
    #[must_use]
    pub fn with_distance_meters(mut self, meters: f64) -> Self {
        if meters.is_finite() && meters >= 0.0 {
            self.distance_meters = Some(meters);
            self.distance_text = Some(format_distance(meters));
        }
        self
    }

    /// Record a fuzzy match score.
    #[must_use]
    pub fn with_similarity(mut self, score: f64) -> Self {
        self.similarity = score.is_finite().then_some(score);
        self
    }
}

/// Render a distance for display: metres below one kilometre, otherwise
/// kilometres with one decimal.
///
/// # Examples
/// ```
/// use reserve_core::format_distance;
///
/// assert_eq!(format_distance(850.0), "850 m");
/// assert_eq!(format_distance(2_500.0), "2.5 km");
/// ```
#[must_use]
pub fn format_distance(meters: f64) -> String {
    if meters < 1_000.0 {
        format!("{meters:.0} m")
    } else {
        format!("{:.1} km", meters / 1_000.0)
    }
}
