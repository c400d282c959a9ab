//! Multi-sample side voting.
//!
//! A single sample misclassifies on curved streets and at vertices, so
//! the candidate geometry is sampled at a quarter, half and three
//! quarters of its arc length and each sample votes independently.

use curb_map_geometry::{
    Coord, GeometryError, LineString, Sidedness, project, sample_fractions, sidedness,
    signed_side, tangent_at,
};
use curb_map_join_models::JoinConfig;

/// Normalized arc-length positions sampled on the candidate geometry.
pub const SAMPLE_FRACTIONS: [f64; 3] = [0.25, 0.5, 0.75];

/// Outcome of classifying one geometry against one centerline.
#[derive(Debug, Clone, PartialEq)]
pub struct SideDetermination {
    /// Winning side, or [`Sidedness::Indeterminate`].
    pub side: Sidedness,
    /// Winning votes over samples taken; 0 when indeterminate.
    pub confidence: f64,
    /// Per-sample votes, in sample order.
    pub votes: Vec<Sidedness>,
}

/// Classifies geometries as left or right of a directed centerline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideClassifier {
    side_epsilon: f64,
    tangent_epsilon_m: f64,
}

impl SideClassifier {
    /// Creates a classifier with explicit tolerances.
    #[must_use]
    pub const fn new(side_epsilon: f64, tangent_epsilon_m: f64) -> Self {
        Self {
            side_epsilon,
            tangent_epsilon_m,
        }
    }

    /// Creates a classifier from the join configuration.
    #[must_use]
    pub const fn from_config(config: &JoinConfig) -> Self {
        Self::new(config.side_epsilon, config.tangent_epsilon_m)
    }

    /// Samples `candidate` and votes on its side of `centerline`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if either polyline is degenerate.
    pub fn classify(
        &self,
        centerline: &LineString<f64>,
        candidate: &LineString<f64>,
    ) -> Result<SideDetermination, GeometryError> {
        let samples = sample_fractions(candidate, &SAMPLE_FRACTIONS)?;
        self.classify_samples(centerline, &samples)
    }

    /// Votes on the side of `centerline` for already-sampled points.
    ///
    /// The majority decides; near-zero samples abstain. A tie between
    /// the sides, or no votes at all, is indeterminate.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if the centerline is degenerate.
    pub fn classify_samples(
        &self,
        centerline: &LineString<f64>,
        samples: &[Coord<f64>],
    ) -> Result<SideDetermination, GeometryError> {
        let votes = samples
            .iter()
            .map(|&p| self.vote(centerline, p))
            .collect::<Result<Vec<_>, _>>()?;

        let left = votes.iter().filter(|v| **v == Sidedness::Left).count();
        let right = votes.iter().filter(|v| **v == Sidedness::Right).count();

        let (side, winning) = match left.cmp(&right) {
            std::cmp::Ordering::Greater => (Sidedness::Left, left),
            std::cmp::Ordering::Less => (Sidedness::Right, right),
            std::cmp::Ordering::Equal => (Sidedness::Indeterminate, 0),
        };

        #[allow(clippy::cast_precision_loss)]
        let confidence = if samples.is_empty() {
            0.0
        } else {
            winning as f64 / samples.len() as f64
        };

        log::trace!("side votes {votes:?} -> {side:?} ({confidence:.2})");

        Ok(SideDetermination {
            side,
            confidence,
            votes,
        })
    }

    fn vote(&self, centerline: &LineString<f64>, point: Coord<f64>) -> Result<Sidedness, GeometryError> {
        let projection = project(point, centerline)?;
        let tangent = tangent_at(centerline, projection.arc_length, self.tangent_epsilon_m)?;
        let value = signed_side(tangent, projection.point, point);
        Ok(sidedness(value, self.side_epsilon))
    }
}
