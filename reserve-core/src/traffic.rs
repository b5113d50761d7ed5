//! Traffic severity and point observations.

/// Ordered traffic severity. Higher variants mean slower travel.
///
/// Ordinal values follow the primary service's scale: `0` is unknown and
/// `4` is severe. Out-of-range ordinals are clamped rather than rejected.
///
/// # Examples
/// ```
/// use reserve_core::TrafficSeverity;
///
/// assert_eq!(TrafficSeverity::from_ordinal(2), TrafficSeverity::Moderate);
/// assert_eq!(TrafficSeverity::from_ordinal(9), TrafficSeverity::Severe);
/// assert!(TrafficSeverity::Heavy > TrafficSeverity::Smooth);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TrafficSeverity {
    /// No usable signal.
    #[default]
    Unknown,
    /// Free-flowing traffic.
    Smooth,
    /// Some slowdown.
    Moderate,
    /// Significant slowdown.
    Heavy,
    /// Near standstill.
    Severe,
}

impl TrafficSeverity {
    /// Every severity in ascending order.
    pub const ALL: [Self; 5] = [
        Self::Unknown,
        Self::Smooth,
        Self::Moderate,
        Self::Heavy,
        Self::Severe,
    ];

    /// Map a provider ordinal onto the scale, clamping out-of-range values.
    #[must_use]
    pub const fn from_ordinal(ordinal: i64) -> Self {
        match ordinal {
            i64::MIN..=0 => Self::Unknown,
            1 => Self::Smooth,
            2 => Self::Moderate,
            3 => Self::Heavy,
            _ => Self::Severe,
        }
    }

    /// Ordinal value of the severity, `0..=4`.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Smooth => 1,
            Self::Moderate => 2,
            Self::Heavy => 3,
            Self::Severe => 4,
        }
    }

    /// Return the severity as a lowercase `&str`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Smooth => "smooth",
            Self::Moderate => "moderate",
            Self::Heavy => "heavy",
            Self::Severe => "severe",
        }
    }

    /// Interpret a textual severity label.
    ///
    /// Accepts the canonical names plus the common synonyms the primary
    /// service uses (`free`, `light`, `medium`, `jam`, ...). Unrecognised
    /// labels yield `None`.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let severity = match label.trim().to_lowercase().as_str() {
            "unknown" | "none" | "" => Self::Unknown,
            "smooth" | "free" | "free_flow" | "low" | "light" => Self::Smooth,
            "moderate" | "medium" | "slow" => Self::Moderate,
            "heavy" | "high" | "congested" => Self::Heavy,
            "severe" | "jam" | "blocked" | "standstill" => Self::Severe,
            _ => return None,
        };
        Some(severity)
    }

    /// Whether the severity should add the heavy-traffic buffer.
    #[must_use]
    pub const fn is_congested(self) -> bool {
        matches!(self, Self::Heavy | Self::Severe)
    }
}

impl std::fmt::Display for TrafficSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A traffic observation near one coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrafficSnapshot {
    severity: TrafficSeverity,
    speed_kmh: Option<f64>,
    delay_minutes: Option<u32>,
    congestion_level: Option<f64>,
}

impl TrafficSnapshot {
    /// Create a snapshot with only a severity.
    #[must_use]
    pub const fn new(severity: TrafficSeverity) -> Self {
        Self {
            severity,
            speed_kmh: None,
            delay_minutes: None,
            congestion_level: None,
        }
    }

    /// Record the observed average speed.
    #[must_use]
    pub fn with_speed_kmh(mut self, speed: f64) -> Self {
        self.speed_kmh = (speed.is_finite() && speed >= 0.0).then_some(speed);
        self
    }

    /// Record a provider-estimated delay in whole minutes.
    #[must_use]
    pub const fn with_delay_minutes(mut self, minutes: u32) -> Self {
        self.delay_minutes = Some(minutes);
        self
    }

    /// Record the congestion ratio, clamped to `0.0..=1.0`.
    #[must_use]
    pub fn with_congestion_level(mut self, level: f64) -> Self {
        self.congestion_level = level.is_finite().then(|| level.clamp(0.0, 1.0));
        self
    }

    /// Observed severity.
    #[must_use]
    pub const fn severity(&self) -> TrafficSeverity {
        self.severity
    }

    /// Observed average speed, if reported.
    #[must_use]
    pub const fn speed_kmh(&self) -> Option<f64> {
        self.speed_kmh
    }

    /// Provider delay estimate, if reported.
    #[must_use]
    pub const fn delay_minutes(&self) -> Option<u32> {
        self.delay_minutes
    }

    /// Congestion ratio in `0.0..=1.0`, if reported.
    #[must_use]
    pub const fn congestion_level(&self) -> Option<f64> {
        self.congestion_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(-3, TrafficSeverity::Unknown)]
    #[case(0, TrafficSeverity::Unknown)]
    #[case(1, TrafficSeverity::Smooth)]
    #[case(3, TrafficSeverity::Heavy)]
    #[case(4, TrafficSeverity::Severe)]
    #[case(17, TrafficSeverity::Severe)]
    fn clamps_ordinals(#[case] ordinal: i64, #[case] expected: TrafficSeverity) {
        assert_eq!(TrafficSeverity::from_ordinal(ordinal), expected);
    }

    #[rstest]
    fn ordinals_round_trip() {
        for severity in TrafficSeverity::ALL {
            assert_eq!(
                TrafficSeverity::from_ordinal(i64::from(severity.ordinal())),
                severity
            );
        }
    }

    #[rstest]
    #[case("JAM", Some(TrafficSeverity::Severe))]
    #[case(" light ", Some(TrafficSeverity::Smooth))]
    #[case("medium", Some(TrafficSeverity::Moderate))]
    #[case("sideways", None)]
    fn parses_labels(#[case] label: &str, #[case] expected: Option<TrafficSeverity>) {
        assert_eq!(TrafficSeverity::from_label(label), expected);
    }

    #[rstest]
    fn congestion_level_is_clamped() {
        let snapshot = TrafficSnapshot::new(TrafficSeverity::Heavy).with_congestion_level(1.7);
        assert_eq!(snapshot.congestion_level(), Some(1.0));
        let snapshot = snapshot.with_congestion_level(f64::NAN);
        assert_eq!(snapshot.congestion_level(), None);
    }

    #[rstest]
    fn only_heavy_and_severe_are_congested() {
        let congested: Vec<_> = TrafficSeverity::ALL
            .into_iter()
            .filter(|s| s.is_congested())
            .collect();
        assert_eq!(congested, vec![TrafficSeverity::Heavy, TrafficSeverity::Severe]);
    }
}
