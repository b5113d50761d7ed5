//! Route requests and the parameters that shape them.
//!
//! A [`RouteRequest`] is validated on construction, so provider clients can
//! assume in-range coordinates and never spend a network call on bad input.

use geo::Coord;

use crate::location::{CoordinateError, coordinate, grid_cell, haversine_km};

/// Response languages supported by the mapping services.
///
/// # Examples
/// ```
/// use reserve_core::Language;
///
/// assert_eq!(Language::Az.as_str(), "az");
/// assert_eq!("RU".parse::<Language>(), Ok(Language::Ru));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Language {
    /// Azerbaijani.
    #[default]
    Az,
    /// English.
    En,
    /// Russian.
    Ru,
}

impl Language {
    /// Return the two-letter language code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Az => "az",
            Self::En => "en",
            Self::Ru => "ru",
        }
    }

    /// Resolve an optional caller preference against a default.
    ///
    /// Unsupported codes fall back to `default` instead of failing, matching
    /// how the upstream services treat unknown languages.
    #[must_use]
    pub fn resolve(preferred: Option<&str>, default: Self) -> Self {
        preferred
            .and_then(|code| code.trim().parse().ok())
            .unwrap_or(default)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "az" => Ok(Self::Az),
            "en" => Ok(Self::En),
            "ru" => Ok(Self::Ru),
            _ => Err(format!("unsupported language '{s}'")),
        }
    }
}

/// Routing preference passed to the providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RouteProfile {
    /// Quickest driving route.
    #[default]
    Fastest,
    /// Shortest driving route.
    Shortest,
    /// Walking route.
    Pedestrian,
}

impl RouteProfile {
    /// Return the profile as a lowercase `&str`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fastest => "fastest",
            Self::Shortest => "shortest",
            Self::Pedestrian => "pedestrian",
        }
    }
}

impl std::fmt::Display for RouteProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RouteProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fastest" => Ok(Self::Fastest),
            "shortest" => Ok(Self::Shortest),
            "pedestrian" | "walking" => Ok(Self::Pedestrian),
            _ => Err(format!("unknown route profile '{s}'")),
        }
    }
}

/// A validated origin/destination pair with routing parameters.
///
/// # Examples
/// ```
/// use reserve_core::{Language, RouteProfile, RouteRequest};
///
/// let request = RouteRequest::new(40.40, 49.86, 40.41, 49.87)?
///     .with_profile(RouteProfile::Shortest)
///     .with_language(Language::En);
/// assert_eq!(request.origin().y, 40.40);
/// assert_eq!(request.profile(), RouteProfile::Shortest);
/// # Ok::<(), reserve_core::CoordinateError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteRequest {
    origin: Coord<f64>,
    destination: Coord<f64>,
    profile: RouteProfile,
    language: Option<Language>,
}

impl RouteRequest {
    /// Validate raw latitude/longitude values and build a request.
    pub fn new(
        origin_lat: f64,
        origin_lon: f64,
        dest_lat: f64,
        dest_lon: f64,
    ) -> Result<Self, CoordinateError> {
        Ok(Self {
            origin: coordinate(origin_lat, origin_lon)?,
            destination: coordinate(dest_lat, dest_lon)?,
            profile: RouteProfile::default(),
            language: None,
        })
    }

    /// Set the routing profile.
    #[must_use]
    pub const fn with_profile(mut self, profile: RouteProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Set the response language.
    #[must_use]
    pub const fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    /// Start of the trip.
    #[must_use]
    pub const fn origin(&self) -> Coord<f64> {
        self.origin
    }

    /// End of the trip.
    #[must_use]
    pub const fn destination(&self) -> Coord<f64> {
        self.destination
    }

    /// Requested routing profile.
    #[must_use]
    pub const fn profile(&self) -> RouteProfile {
        self.profile
    }

    /// Requested language, if the caller chose one.
    #[must_use]
    pub const fn language(&self) -> Option<Language> {
        self.language
    }

    /// Straight-line distance between origin and destination in kilometres.
    #[must_use]
    pub fn straight_line_km(&self) -> f64 {
        haversine_km(self.origin, self.destination)
    }

    /// Cache key for this request once the language has been resolved.
    #[must_use]
    pub fn cache_key(&self, default_language: Language) -> RouteKey {
        RouteKey {
            origin: grid_cell(self.origin),
            destination: grid_cell(self.destination),
            profile: self.profile,
            language: self.language.unwrap_or(default_language),
        }
    }
}

/// Hashable identity of a route lookup on the coordinate grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteKey {
    origin: (i64, i64),
    destination: (i64, i64),
    profile: RouteProfile,
    language: Language,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    #[rstest]
    #[case(Some("en"), Language::En)]
    #[case(Some(" RU "), Language::Ru)]
    #[case(Some("fr"), Language::Az)]
    #[case(None, Language::Az)]
    fn resolves_language_with_default(#[case] preferred: Option<&str>, #[case] expected: Language) {
        assert_eq!(Language::resolve(preferred, Language::Az), expected);
    }

    #[rstest]
    fn parsing_rejects_unknown_profile() {
        let err = RouteProfile::from_str("scenic").expect_err("unknown profile");
        assert!(err.contains("unknown route profile"));
    }

    #[rstest]
    fn new_rejects_out_of_range_destination() {
        let err = RouteRequest::new(40.0, 49.0, 40.0, 200.0).expect_err("bad longitude");
        assert_eq!(err, CoordinateError::Longitude(200.0));
    }

    #[rstest]
    fn cache_key_rounds_coordinates() {
        let a = RouteRequest::new(40.409_31, 49.867_11, 40.41, 49.87).expect("valid");
        let b = RouteRequest::new(40.409_32, 49.867_12, 40.41, 49.87).expect("valid");
        assert_eq!(a.cache_key(Language::Az), b.cache_key(Language::Az));
    }

    #[rstest]
    fn cache_key_separates_profiles_and_languages() {
        let base = RouteRequest::new(40.40, 49.86, 40.41, 49.87).expect("valid");
        let shortest = base.with_profile(RouteProfile::Shortest);
        let english = base.with_language(Language::En);
        assert_ne!(base.cache_key(Language::Az), shortest.cache_key(Language::Az));
        assert_ne!(base.cache_key(Language::Az), english.cache_key(Language::Az));
        assert_eq!(base.cache_key(Language::En), english.cache_key(Language::Az));
    }
}
