#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Curb regulation types.
//!
//! Regulation rows arrive in one of two shapes: with an explicit
//! `(networkId, side)` pair (the direct-id path), or with only a raw,
//! side-agnostic line geometry (the geometric join path). Either way the
//! rule itself is one of a fixed set of [`RuleAttributes`] categories,
//! and the join emits [`RegulationAssignment`]s that wrap the rule in a
//! common envelope.

use chrono::Weekday;
use curb_map_street_models::{Coordinate, Jurisdiction, NetworkId, Side};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// When a rule is in force.
///
/// Hours are kept verbatim (e.g. `"08:00-10:00"`); interpreting them is a
/// separate pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    /// Days of the week the rule applies. Empty means every day.
    #[serde(default)]
    pub days: Vec<Weekday>,
    /// Hours of the day the rule applies.
    #[serde(default)]
    pub hours: Option<String>,
}

/// Top-level rule categories, used for per-category summaries.
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleCategory {
    /// Parking time limits
    TimeLimit,
    /// Residential or area permit zones
    Permit,
    /// Vehicle class, weight or size restrictions
    VehicleClass,
    /// Street cleaning schedules
    CleaningSchedule,
    /// Parking meters
    Metered,
}

impl RuleCategory {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::TimeLimit,
            Self::Permit,
            Self::VehicleClass,
            Self::CleaningSchedule,
            Self::Metered,
        ]
    }
}

/// The rule a regulation imposes, tagged by category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "category",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum RuleAttributes {
    /// Parking limited to a maximum stay.
    TimeLimit {
        /// Maximum stay in minutes.
        limit_minutes: u32,
        /// When the limit is enforced.
        #[serde(default)]
        schedule: Schedule,
        /// Permit zones exempt from the limit.
        #[serde(default)]
        exempt_permit_zones: Vec<String>,
    },
    /// Parking reserved for permit holders.
    Permit {
        /// Permit zone label (e.g. `"Q"`).
        zone: String,
        /// When the permit requirement is enforced.
        #[serde(default)]
        schedule: Schedule,
    },
    /// Restriction on vehicle types or sizes.
    VehicleClass {
        /// Restricted vehicle types, verbatim (e.g. `"COMMERCIAL"`).
        #[serde(default)]
        vehicle_types: Vec<String>,
        /// Weight threshold in kilograms.
        #[serde(default)]
        max_weight_kg: Option<f64>,
        /// Height threshold in metres.
        #[serde(default)]
        max_height_m: Option<f64>,
        /// Length threshold in metres.
        #[serde(default)]
        max_length_m: Option<f64>,
        /// When the restriction applies.
        #[serde(default)]
        schedule: Schedule,
    },
    /// Street cleaning: no parking during the window.
    CleaningSchedule {
        /// Cleaning days and hours.
        #[serde(default)]
        schedule: Schedule,
        /// Weeks of the month (1-5). Empty means every week.
        #[serde(default)]
        weeks_of_month: Vec<u8>,
    },
    /// Metered parking.
    Metered {
        /// Meter post identifier.
        #[serde(default)]
        meter_id: Option<String>,
        /// Hourly rate in the local currency.
        #[serde(default)]
        rate_per_hour: Option<f64>,
        /// Maximum paid stay in minutes.
        #[serde(default)]
        limit_minutes: Option<u32>,
        /// When payment is required.
        #[serde(default)]
        schedule: Schedule,
    },
}

impl RuleAttributes {
    /// Returns the category of this rule.
    #[must_use]
    pub const fn category(&self) -> RuleCategory {
        match self {
            Self::TimeLimit { .. } => RuleCategory::TimeLimit,
            Self::Permit { .. } => RuleCategory::Permit,
            Self::VehicleClass { .. } => RuleCategory::VehicleClass,
            Self::CleaningSchedule { .. } => RuleCategory::CleaningSchedule,
            Self::Metered { .. } => RuleCategory::Metered,
        }
    }

    /// Returns the schedule the rule is enforced on.
    #[must_use]
    pub const fn schedule(&self) -> &Schedule {
        match self {
            Self::TimeLimit { schedule, .. }
            | Self::Permit { schedule, .. }
            | Self::VehicleClass { schedule, .. }
            | Self::CleaningSchedule { schedule, .. }
            | Self::Metered { schedule, .. } => schedule,
        }
    }
}

/// A regulation row as delivered by the ingestion layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegulationRow {
    /// Source identifier of the regulation.
    pub regulation_id: String,
    /// Explicit network segment, when the source provides one.
    #[serde(default)]
    pub network_id: Option<NetworkId>,
    /// Explicit side, when the source provides one.
    #[serde(default)]
    pub side: Option<Side>,
    /// Raw, side-agnostic line geometry.
    #[serde(default)]
    pub geometry: Option<Vec<Coordinate>>,
    /// Physical length declared by the source, in metres.
    #[serde(default)]
    pub declared_length_m: Option<f64>,
    /// Jurisdiction declared by the source. Only used for disambiguation.
    #[serde(default)]
    pub jurisdiction: Option<Jurisdiction>,
    /// The rule itself.
    pub rule: RuleAttributes,
}

/// Which join path a regulation row takes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegulationShape<'a> {
    /// Shape A: explicit `(networkId, side)`. The geometry, if present, is
    /// only consulted when the segment is unknown to the index.
    DirectId {
        /// Explicit network segment.
        network_id: &'a NetworkId,
        /// Explicit side.
        side: Side,
        /// Geometry to fall back on.
        geometry: Option<&'a [Coordinate]>,
    },
    /// Shape B: geometry only.
    Geometric {
        /// Raw line geometry.
        geometry: &'a [Coordinate],
    },
}

impl RegulationRow {
    /// Determines the join path for this row.
    ///
    /// Returns `None` when the row carries neither an explicit segment
    /// reference nor a geometry, which makes it unjoinable.
    #[must_use]
    pub fn shape(&self) -> Option<RegulationShape<'_>> {
        match (&self.network_id, self.side, &self.geometry) {
            (Some(network_id), Some(side), geometry) => Some(RegulationShape::DirectId {
                network_id,
                side,
                geometry: geometry.as_deref(),
            }),
            (_, _, Some(geometry)) => Some(RegulationShape::Geometric { geometry }),
            _ => None,
        }
    }

    /// Returns the rule category.
    #[must_use]
    pub const fn category(&self) -> RuleCategory {
        self.rule.category()
    }
}

/// How an assignment was produced.
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
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum MatchMethod {
    /// Explicit `(networkId, side)` from the source.
    DirectId,
    /// Geometric join onto a single block.
    SingleSpan,
    /// Geometric join across a run of consecutive blocks.
    MultiSpan,
    /// Boundary-band match settled by the jurisdiction layer.
    BoundaryResolved,
}

/// One regulation applied to one curb.
///
/// Immutable once created; re-ingestion replaces the full set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegulationAssignment {
    /// Target block.
    pub network_id: NetworkId,
    /// Target curb.
    pub side: Side,
    /// Source regulation identifier.
    pub regulation_id: String,
    /// Match confidence in `[0, 1]`.
    pub confidence: f64,
    /// Whether this is one block of a multi-block regulation.
    pub spanned: bool,
    /// How the match was produced.
    pub match_method: MatchMethod,
    /// The rule, carried verbatim.
    pub rule: RuleAttributes,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    fn cleaning_row() -> RegulationRow {
        serde_json::from_value(serde_json::json!({
            "regulationId": "reg-1",
            "networkId": "200",
            "side": "R",
            "rule": {
                "category": "CLEANING_SCHEDULE",
                "schedule": { "days": ["Tue"], "hours": "08:00-10:00" },
            },
        }))
        .unwrap()
    }

    #[test]
    fn deserializes_tagged_rule() {
        let row = cleaning_row();
        assert_eq!(row.category(), RuleCategory::CleaningSchedule);
        assert_eq!(row.rule.schedule().days, vec![Weekday::Tue]);
        assert_eq!(row.rule.schedule().hours.as_deref(), Some("08:00-10:00"));
    }

    #[test]
    fn explicit_pair_is_direct_id_shape() {
        let row = cleaning_row();
        match row.shape() {
            Some(RegulationShape::DirectId {
                network_id,
                side,
                geometry,
            }) => {
                assert_eq!(network_id.as_str(), "200");
                assert_eq!(side, Side::Right);
                assert!(geometry.is_none());
            }
            other => panic!("expected direct-id shape, got {other:?}"),
        }
    }

    #[test]
    fn network_id_without_side_falls_to_geometry() {
        let mut row = cleaning_row();
        row.side = None;
        row.geometry = Some(vec![[0.0, 5.0], [10.0, 5.0]]);
        assert!(matches!(
            row.shape(),
            Some(RegulationShape::Geometric { .. })
        ));
    }

    #[test]
    fn row_without_reference_or_geometry_has_no_shape() {
        let mut row = cleaning_row();
        row.network_id = None;
        assert!(row.shape().is_none());
    }

    #[test]
    fn match_method_uses_kebab_case() {
        assert_eq!(MatchMethod::DirectId.to_string(), "direct-id");
        assert_eq!(
            MatchMethod::from_str("boundary-resolved").unwrap(),
            MatchMethod::BoundaryResolved
        );
        assert_eq!(
            serde_json::to_string(&MatchMethod::MultiSpan).unwrap(),
            "\"multi-span\""
        );
    }

    #[test]
    fn time_limit_fields_are_camel_case() {
        let rule: RuleAttributes = serde_json::from_value(serde_json::json!({
            "category": "TIME_LIMIT",
            "limitMinutes": 120,
            "exemptPermitZones": ["Q"],
        }))
        .unwrap();
        assert_eq!(rule.category(), RuleCategory::TimeLimit);
        assert!(rule.schedule().days.is_empty());
    }

    #[test]
    fn every_category_listed() {
        assert_eq!(RuleCategory::all().len(), 5);
    }
}
