//! Routes returned by the upstream providers.
//!
//! Both providers produce the same [`RouteResult`] shape, tagged with the
//! [`RouteSource`] that supplied it. Values are built once through the
//! consuming `with_*` methods and only read afterwards; caches hand out
//! clones.

use geo::Coord;

/// Which source produced a route or ETA.
///
/// # Examples
/// ```
/// use reserve_core::RouteSource;
///
/// assert_eq!(RouteSource::Secondary.as_str(), "secondary");
/// assert_eq!(RouteSource::Fallback.to_string(), "fallback");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RouteSource {
    /// The primary routing/geocoding/traffic service.
    Primary,
    /// The independently hosted secondary routing service.
    Secondary,
    /// A synthetic estimate built from straight-line distance.
    Fallback,
}

impl RouteSource {
    /// Return the source as a lowercase `&str`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for RouteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single origin-to-destination route from one provider.
///
/// Distance is optional because providers do not always report it; duration
/// is at least one second whenever present.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use reserve_core::{RouteResult, RouteSource};
///
/// let route = RouteResult::new(RouteSource::Primary)
///     .with_distance_km(5.2)
///     .with_duration_seconds(600)
///     .with_geometry(vec![Coord { x: 49.86, y: 40.40 }, Coord { x: 49.87, y: 40.41 }])
///     .with_notice("Ideal road conditions");
///
/// assert_eq!(route.distance_km(), Some(5.2));
/// assert_eq!(route.duration_seconds(), Some(600));
/// assert_eq!(route.geometry().map(<[_]>::len), Some(2));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteResult {
    source: RouteSource,
    distance_km: Option<f64>,
    duration_seconds: Option<u64>,
    geometry: Option<Vec<Coord<f64>>>,
    notice: Option<String>,
}

impl RouteResult {
    /// Start an empty route tagged with its source.
    #[must_use]
    pub const fn new(source: RouteSource) -> Self {
        Self {
            source,
            distance_km: None,
            duration_seconds: None,
            geometry: None,
            notice: None,
        }
    }

    /// Record the road distance. Negative or non-finite values are ignored.
    #[must_use]
    pub fn with_distance_km(mut self, distance_km: f64) -> Self {
        if distance_km.is_finite() && distance_km >= 0.0 {
            self.distance_km = Some(distance_km);
        }
        self
    }

    /// Record the travel time, clamped to at least one second.
    #[must_use]
    pub fn with_duration_seconds(mut self, seconds: u64) -> Self {
        self.duration_seconds = Some(seconds.max(1));
        self
    }

    /// Record the route polyline. An empty polyline is treated as absent.
    #[must_use]
    pub fn with_geometry(mut self, geometry: Vec<Coord<f64>>) -> Self {
        self.geometry = (!geometry.is_empty()).then_some(geometry);
        self
    }

    /// Record a provider notice. Blank notices are treated as absent.
    #[must_use]
    pub fn with_notice(mut self, notice: impl Into<String>) -> Self {
        let text = notice.into();
        self.notice = (!text.trim().is_empty()).then_some(text);
        self
    }

    /// Provider that produced the route.
    #[must_use]
    pub const fn source(&self) -> RouteSource {
        self.source
    }

    /// Road distance in kilometres, if reported.
    #[must_use]
    pub const fn distance_km(&self) -> Option<f64> {
        self.distance_km
    }

    /// Travel time in seconds, if reported.
    #[must_use]
    pub const fn duration_seconds(&self) -> Option<u64> {
        self.duration_seconds
    }

    /// Route polyline, if reported.
    #[must_use]
    pub fn geometry(&self) -> Option<&[Coord<f64>]> {
        self.geometry.as_deref()
    }

    /// Free-text notice from the provider, if any.
    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Number of polyline points; zero when no geometry was reported.
    #[must_use]
    pub fn geometry_len(&self) -> usize {
        self.geometry.as_ref().map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(-1.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn rejects_invalid_distance(#[case] distance: f64) {
        let route = RouteResult::new(RouteSource::Primary).with_distance_km(distance);
        assert_eq!(route.distance_km(), None);
    }

    #[rstest]
    fn zero_duration_is_clamped() {
        let route = RouteResult::new(RouteSource::Secondary).with_duration_seconds(0);
        assert_eq!(route.duration_seconds(), Some(1));
    }

    #[rstest]
    fn blank_notice_and_empty_geometry_are_absent() {
        let route = RouteResult::new(RouteSource::Primary)
            .with_notice("   ")
            .with_geometry(Vec::new());
        assert!(route.notice().is_none());
        assert!(route.geometry().is_none());
        assert_eq!(route.geometry_len(), 0);
    }
}
