#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Street network types shared by the index and the join engine.
//!
//! A street network row describes one centerline block identified by a
//! stable network segment ID. Every block has exactly two curbs, one on
//! each [`Side`] of the centerline's coordinate-order direction of travel.
//! Administrative boundary rows label non-overlapping polygons with a
//! [`Jurisdiction`] pair used to break ties near jurisdiction edges.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A planar coordinate pair (`[x, y]`, metres in the working projection).
pub type Coordinate = [f64; 2];

/// Side of a directed centerline, relative to its coordinate order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Side {
    /// Left of the direction of travel (positive cross product).
    #[serde(rename = "L", alias = "Left", alias = "left", alias = "LEFT")]
    #[strum(to_string = "L", serialize = "Left")]
    Left,
    /// Right of the direction of travel (negative cross product).
    #[serde(rename = "R", alias = "Right", alias = "right", alias = "RIGHT")]
    #[strum(to_string = "R", serialize = "Right")]
    Right,
}

impl Side {
    /// Both sides, left first.
    pub const BOTH: [Self; 2] = [Self::Left, Self::Right];

    /// Returns the other curb of the same block.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Returns this side as seen when travelling the centerline backwards.
    #[must_use]
    pub const fn flipped_if(self, reversed: bool) -> Self {
        if reversed { self.opposite() } else { self }
    }
}

/// Stable identifier of one centerline block in the street network.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(pub String);

impl NetworkId {
    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NetworkId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NetworkId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// An administrative jurisdiction pair (e.g. city + permit district).
///
/// Boundary polygons are each labelled with exactly one pair, and the
/// coverage never overlaps.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Jurisdiction {
    /// Issuing authority (e.g. `"SFMTA"`).
    pub authority: String,
    /// District within the authority (e.g. `"Area Q"`).
    pub district: String,
}

impl Jurisdiction {
    /// Creates a jurisdiction pair.
    #[must_use]
    pub fn new(authority: impl Into<String>, district: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            district: district.into(),
        }
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.authority, self.district)
    }
}

/// Address range metadata for a block, kept verbatim from the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressRange {
    /// Lowest address on the block.
    pub from_address: Option<String>,
    /// Highest address on the block.
    pub to_address: Option<String>,
}

/// A street network row as delivered by the ingestion layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreetRow {
    /// Stable network segment ID (e.g. `"100"`).
    pub network_id: NetworkId,
    /// Street name (e.g. `"Valencia St"`).
    pub street_name: String,
    /// Centerline polyline in coordinate order. Required.
    pub centerline: Option<Vec<Coordinate>>,
    /// Cross street at the start of the centerline.
    #[serde(default)]
    pub from_street: Option<String>,
    /// Cross street at the end of the centerline.
    #[serde(default)]
    pub to_street: Option<String>,
    /// Address range metadata.
    #[serde(default)]
    pub address_range: Option<AddressRange>,
    /// Precise curb-offset polyline on the left side, if surveyed.
    #[serde(default)]
    pub left_curb: Option<Vec<Coordinate>>,
    /// Precise curb-offset polyline on the right side, if surveyed.
    #[serde(default)]
    pub right_curb: Option<Vec<Coordinate>>,
    /// Jurisdiction declared by the street dataset itself.
    #[serde(default)]
    pub jurisdiction: Option<Jurisdiction>,
}

impl StreetRow {
    /// Returns the surveyed curb polyline for `side`, if any.
    #[must_use]
    pub fn curb(&self, side: Side) -> Option<&[Coordinate]> {
        match side {
            Side::Left => self.left_curb.as_deref(),
            Side::Right => self.right_curb.as_deref(),
        }
    }
}

/// An administrative boundary row: one polygon, one jurisdiction pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryRow {
    /// The jurisdiction this polygon belongs to.
    pub jurisdiction: Jurisdiction,
    /// `GeoJSON` `Polygon` or `MultiPolygon` geometry.
    pub boundary_geojson: String,
}

/// Normalizes a street name for comparison: trimmed, internal whitespace
/// collapsed, upper-cased.
#[must_use]
pub fn normalize_street_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_uppercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    #[test]
    fn side_parses_short_and_long_forms() {
        assert_eq!(Side::from_str("L").unwrap(), Side::Left);
        assert_eq!(Side::from_str("r").unwrap(), Side::Right);
        assert_eq!(Side::from_str("Right").unwrap(), Side::Right);
        assert_eq!(Side::from_str("LEFT").unwrap(), Side::Left);
        assert!(Side::from_str("both").is_err());
    }

    #[test]
    fn side_displays_short_form() {
        assert_eq!(Side::Left.to_string(), "L");
        assert_eq!(Side::Right.to_string(), "R");
    }

    #[test]
    fn side_serde_accepts_aliases() {
        let side: Side = serde_json::from_str("\"Right\"").unwrap();
        assert_eq!(side, Side::Right);
        let side: Side = serde_json::from_str("\"L\"").unwrap();
        assert_eq!(side, Side::Left);
        assert_eq!(serde_json::to_string(&Side::Right).unwrap(), "\"R\"");
    }

    #[test]
    fn opposite_and_flip() {
        assert_eq!(Side::Left.opposite(), Side::Right);
        assert_eq!(Side::Right.flipped_if(true), Side::Left);
        assert_eq!(Side::Right.flipped_if(false), Side::Right);
    }

    #[test]
    fn street_row_deserializes_with_optional_fields_missing() {
        let row: StreetRow = serde_json::from_value(serde_json::json!({
            "networkId": "100",
            "streetName": "Valencia St",
            "centerline": [[0.0, 0.0], [100.0, 0.0]],
        }))
        .unwrap();
        assert_eq!(row.network_id, NetworkId::from("100"));
        assert_eq!(row.centerline.as_ref().map(Vec::len), Some(2));
        assert!(row.from_street.is_none());
        assert!(row.curb(Side::Left).is_none());
    }

    #[test]
    fn street_row_without_centerline_is_none() {
        let row: StreetRow = serde_json::from_value(serde_json::json!({
            "networkId": "101",
            "streetName": "Mission St",
        }))
        .unwrap();
        assert!(row.centerline.is_none());
    }

    #[test]
    fn normalizes_street_names() {
        assert_eq!(normalize_street_name("  valencia   st "), "VALENCIA ST");
        assert_eq!(normalize_street_name("Valencia St"), "VALENCIA ST");
    }

    #[test]
    fn jurisdiction_display() {
        assert_eq!(Jurisdiction::new("SFMTA", "Area Q").to_string(), "SFMTA/Area Q");
    }
}
