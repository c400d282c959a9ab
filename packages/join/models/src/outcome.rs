//! Per-record join results.
//!
//! Every regulation produces exactly one [`RegulationOutcome`]. Only
//! [`RegulationOutcome::Matched`] carries segment references, so an
//! ambiguous or unmatched regulation cannot leak a guessed assignment.

use curb_map_geometry::GeometryError;
use curb_map_regulation_models::{RegulationAssignment, RuleCategory};
use curb_map_street_models::{NetworkId, Side};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::JoinConfig;

/// Distance band of a candidate centerline.
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
pub enum DistanceBand {
    /// Under `clear_max_m`.
    Clear,
    /// Between `clear_max_m` and `boundary_max_m`.
    Boundary,
    /// Beyond `boundary_max_m`.
    Rejected,
}

impl DistanceBand {
    /// Classifies a perpendicular distance.
    #[must_use]
    pub fn classify(distance: f64, config: &JoinConfig) -> Self {
        if distance < config.clear_max_m {
            Self::Clear
        } else if distance <= config.boundary_max_m {
            Self::Boundary
        } else {
            Self::Rejected
        }
    }
}

/// A candidate curb for one regulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateMatch {
    /// Candidate block.
    pub network_id: NetworkId,
    /// Candidate curb.
    pub side: Side,
    /// Distance from the regulation midpoint to the centerline.
    pub distance: f64,
    /// Distance band.
    pub band: DistanceBand,
    /// Confidence the candidate would carry if chosen.
    pub confidence: f64,
}

/// Why a regulation could not be placed on a single answer.
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
pub enum AmbiguityReason {
    /// Side votes were all near zero: the geometry straddles the
    /// centerline.
    IndeterminateSide,
    /// Boundary-band or tied candidates the jurisdiction layer could not
    /// settle.
    UnresolvedBoundary,
}

/// Why a regulation matched nothing.
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
pub enum UnmatchedReason {
    /// No centerline within `boundary_max_m` on the determined side.
    NoCandidates,
    /// The explicit network ID is not in the index and no geometry was
    /// supplied to fall back on.
    UnknownSegment,
    /// A span walk ran into a break in the street network.
    SpanGap,
    /// A span walk could not cover the declared length.
    SpanShortfall,
    /// The regulation geometry is malformed.
    InvalidGeometry,
}

/// The result of joining one regulation.
#[derive(Debug, Clone, PartialEq)]
pub enum RegulationOutcome {
    /// One or more curb assignments.
    Matched(Vec<RegulationAssignment>),
    /// Plausible candidates exist but no single answer can be justified.
    Ambiguous {
        /// Why no answer was chosen.
        reason: AmbiguityReason,
        /// The candidates considered, for follow-up.
        candidates: Vec<CandidateMatch>,
    },
    /// Nothing plausible.
    Unmatched {
        /// Why.
        reason: UnmatchedReason,
    },
    /// The regulation's geometry is malformed.
    Error(GeometryError),
}

impl RegulationOutcome {
    /// Whether the regulation produced assignments.
    #[must_use]
    pub const fn is_matched(&self) -> bool {
        matches!(self, Self::Matched(_))
    }

    /// The assignments, if matched.
    #[must_use]
    pub fn assignments(&self) -> &[RegulationAssignment] {
        match self {
            Self::Matched(assignments) => assignments,
            _ => &[],
        }
    }
}

/// Why a regulation ended up in the follow-up list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnresolvedReason {
    /// See [`RegulationOutcome::Ambiguous`].
    Ambiguous {
        /// Why no answer was chosen.
        reason: AmbiguityReason,
        /// The candidates considered.
        candidates: Vec<CandidateMatch>,
    },
    /// See [`RegulationOutcome::Unmatched`].
    Unmatched {
        /// Why.
        reason: UnmatchedReason,
    },
    /// See [`RegulationOutcome::Error`].
    Error {
        /// The geometry error.
        message: String,
    },
}

/// A regulation that produced no assignment, for data-quality follow-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedRegulation {
    /// Source regulation identifier.
    pub regulation_id: String,
    /// Rule category.
    pub category: RuleCategory,
    /// What went wrong.
    pub reason: UnresolvedReason,
}

impl UnresolvedRegulation {
    /// Builds the follow-up entry for a non-matched outcome.
    ///
    /// Returns `None` for [`RegulationOutcome::Matched`].
    #[must_use]
    pub fn from_outcome(
        regulation_id: &str,
        category: RuleCategory,
        outcome: RegulationOutcome,
    ) -> Option<Self> {
        let reason = match outcome {
            RegulationOutcome::Matched(_) => return None,
            RegulationOutcome::Ambiguous { reason, candidates } => {
                UnresolvedReason::Ambiguous { reason, candidates }
            }
            RegulationOutcome::Unmatched { reason } => UnresolvedReason::Unmatched { reason },
            RegulationOutcome::Error(e) => UnresolvedReason::Error {
                message: e.to_string(),
            },
        };
        Some(Self {
            regulation_id: regulation_id.to_string(),
            category,
            reason,
        })
    }
}
