//! Response types for a Nominatim-compatible `/search` endpoint
//! (`format=jsonv2`).

use serde::Deserialize;
use serde_json::Value;

/// One search hit.
///
/// Nominatim reports coordinates as strings and `place_id` as a number; both
/// are kept loosely typed and interpreted by the client.
#[derive(Debug, Deserialize)]
pub struct SearchHit {
    /// Provider identifier.
    #[serde(default)]
    pub place_id: Option<Value>,
    /// Short name, when the hit is a named feature.
    #[serde(default)]
    pub name: Option<String>,
    /// Full comma-separated address.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Latitude.
    pub lat: Value,
    /// Longitude.
    pub lon: Value,
}
