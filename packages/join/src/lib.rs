#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Places curb regulations on directed street segments.
//!
//! Regulations that name their `(networkId, side)` are looked up directly.
//! The rest carry only a line offset from the centerline; for those the
//! engine votes on which side of each nearby centerline the line lies,
//! picks the closest side-matching block, walks along the street when the
//! declared length covers several blocks, and falls back to the
//! jurisdiction layer when candidates sit in the boundary band or tie
//! across an intersection.
//!
//! ```ignore
//! let engine = JoinEngine::new(JoinConfig::embedded_defaults()?)?
//!     .with_jurisdictions(JurisdictionIndex::build(&boundaries));
//! let index = engine.build_index(&streets)?;
//! let output = engine.run(&index, &regulations)?;
//! ```

pub mod boundary;
pub mod candidate;
pub mod engine;
pub mod side;
pub mod span;

pub use boundary::BoundaryResolver;
pub use candidate::{Candidate, PreparedRegulation, distance_confidence};
pub use engine::{JoinEngine, JoinOutput};
pub use side::{SAMPLE_FRACTIONS, SideClassifier, SideDetermination};
pub use span::SpanMatcher;

pub use curb_map_join_models::{
    ConfigError, JoinConfig, JoinStats, RegulationOutcome, UnresolvedRegulation,
};
pub use curb_map_spatial::{IndexError, JurisdictionIndex, SegmentIndex};

/// Errors that abort a join run.
///
/// Per-record problems never surface here; they become
/// [`RegulationOutcome`] values.
#[derive(Debug, thiserror::Error)]
pub enum JoinError {
    /// The segment index could not be built.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// A regulation row has neither an explicit segment reference nor a
    /// geometry.
    #[error("Regulation {regulation_id} has no segment reference and no geometry")]
    MissingGeometry {
        /// Offending row.
        regulation_id: String,
    },

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
