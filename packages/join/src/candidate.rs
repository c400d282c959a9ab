//! A regulation ready for geometric matching, and its candidate curbs.

use curb_map_geometry::{Coord, GeometryError, LineString, line_string_from_coords, midpoint};
use curb_map_join_models::{CandidateMatch, DistanceBand};
use curb_map_regulation_models::{MatchMethod, RegulationAssignment, RegulationRow};
use curb_map_spatial::DirectedStreetSegment;
use curb_map_street_models::Coordinate;

/// Bounds for geometric confidence; only the direct-id path reports 1.
const MIN_CONFIDENCE: f64 = 1e-9;
const MAX_CONFIDENCE: f64 = 1.0 - 1e-9;

/// Confidence for a match at `distance` metres: `1 / (1 + d)`, kept
/// strictly inside `(0, 1)`.
#[must_use]
pub fn distance_confidence(distance: f64) -> f64 {
    (1.0 / (1.0 + distance.max(0.0))).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

/// A shape-B regulation with its geometry parsed.
#[derive(Debug, Clone)]
pub struct PreparedRegulation<'r> {
    /// The source row.
    pub row: &'r RegulationRow,
    /// Parsed geometry.
    pub line: LineString<f64>,
    /// Arc-length midpoint of `line`.
    pub midpoint: Coord<f64>,
    /// Physical length to cover: declared, else (optionally) measured.
    pub target_length_m: Option<f64>,
}

impl<'r> PreparedRegulation<'r> {
    /// Parses `coords` for `row`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if the geometry is malformed.
    pub fn new(
        row: &'r RegulationRow,
        coords: &[Coordinate],
        measure_undeclared_length: bool,
    ) -> Result<Self, GeometryError> {
        let line = line_string_from_coords(coords)?;
        let midpoint = midpoint(&line)?;
        let declared = row
            .declared_length_m
            .filter(|len| len.is_finite() && *len > 0.0);
        let target_length_m = declared.or_else(|| {
            measure_undeclared_length.then(|| curb_map_geometry::length(&line))
        });

        Ok(Self {
            row,
            line,
            midpoint,
            target_length_m,
        })
    }

    /// Wraps the rule in an assignment envelope for `segment`.
    #[must_use]
    pub fn assign(
        &self,
        segment: &DirectedStreetSegment,
        method: MatchMethod,
        confidence: f64,
    ) -> RegulationAssignment {
        assignment(self.row, segment, method, confidence)
    }
}

/// Builds an assignment of `row` onto `segment`.
#[must_use]
pub fn assignment(
    row: &RegulationRow,
    segment: &DirectedStreetSegment,
    method: MatchMethod,
    confidence: f64,
) -> RegulationAssignment {
    RegulationAssignment {
        network_id: segment.network_id().clone(),
        side: segment.side(),
        regulation_id: row.regulation_id.clone(),
        confidence: confidence.clamp(0.0, 1.0),
        spanned: method == MatchMethod::MultiSpan,
        match_method: method,
        rule: row.rule.clone(),
    }
}

/// One curb under consideration for a regulation.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'s> {
    /// The curb.
    pub segment: &'s DirectedStreetSegment,
    /// Distance from the regulation midpoint to the centerline.
    pub distance: f64,
    /// Distance band.
    pub band: DistanceBand,
    /// Confidence if chosen.
    pub confidence: f64,
}

impl Candidate<'_> {
    /// Owned summary for reporting.
    #[must_use]
    pub fn to_match(&self) -> CandidateMatch {
        CandidateMatch {
            network_id: self.segment.network_id().clone(),
            side: self.segment.side(),
            distance: self.distance,
            band: self.band,
            confidence: self.confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use curb_map_regulation_models::{RuleAttributes, Schedule};

    use super::*;

    fn row(declared: Option<f64>) -> RegulationRow {
        RegulationRow {
            regulation_id: "r".to_string(),
            network_id: None,
            side: None,
            geometry: None,
            declared_length_m: declared,
            jurisdiction: None,
            rule: RuleAttributes::Permit {
                zone: "Q".to_string(),
                schedule: Schedule::default(),
            },
        }
    }

    #[test]
    fn confidence_rewards_closeness() {
        assert!((distance_confidence(1.0) - 0.5).abs() < f64::EPSILON);
        assert!(distance_confidence(6.0) > distance_confidence(7.0));
        assert!(distance_confidence(0.0) > distance_confidence(0.5));
    }

    #[test]
    fn geometric_confidence_never_reaches_zero_or_one() {
        for distance in [0.0, -3.0, 1e-12, f64::MAX, f64::INFINITY] {
            let confidence = distance_confidence(distance);
            assert!(confidence > 0.0 && confidence < 1.0, "{distance} -> {confidence}");
        }
        assert!(distance_confidence(0.0) > 0.999_999);
    }

    #[test]
    fn declared_length_wins_over_measured() {
        let row = row(Some(95.0));
        let prepared = PreparedRegulation::new(&row, &[[0.0, 6.0], [80.0, 6.0]], true).unwrap();
        assert_eq!(prepared.target_length_m, Some(95.0));
        assert_eq!(prepared.midpoint, Coord { x: 40.0, y: 6.0 });
    }

    #[test]
    fn measures_undeclared_length_when_enabled() {
        let row = row(None);
        let coords = [[0.0, 6.0], [80.0, 6.0]];
        let measured = PreparedRegulation::new(&row, &coords, true).unwrap();
        assert_eq!(measured.target_length_m, Some(80.0));
        let unmeasured = PreparedRegulation::new(&row, &coords, false).unwrap();
        assert_eq!(unmeasured.target_length_m, None);
    }

    #[test]
    fn non_positive_declared_length_is_ignored() {
        let row = row(Some(0.0));
        let prepared = PreparedRegulation::new(&row, &[[0.0, 6.0], [80.0, 6.0]], false).unwrap();
        assert_eq!(prepared.target_length_m, None);
    }
}
