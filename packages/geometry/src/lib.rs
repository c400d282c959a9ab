#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Planar polyline primitives for curb geometry.
//!
//! All functions are pure and operate on [`geo::LineString`] values in a
//! planar coordinate system measured in metres. Nothing here mutates its
//! input: operations that derive a new shape return a new value.
//!
//! The "could not determine" outcome of a sidedness test is its own
//! [`Sidedness::Indeterminate`] variant and is never folded into a
//! default side.

pub mod kernel;
pub mod polyline;
pub mod projection;

pub use geo::{Coord, LineString};
pub use kernel::{Projection, Sidedness, project, sidedness, signed_side, tangent_at};
pub use polyline::{
    distance_to, interpolate, length, line_string_from_coords, midpoint, reversed,
    sample_fractions,
};
pub use projection::LocalProjection;

/// Polylines shorter than this are treated as zero-length.
pub const MIN_LENGTH_M: f64 = 1e-9;

/// Malformed or degenerate geometry.
///
/// Fatal for the one record that carries it, never for a batch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    /// The polyline has fewer than two distinct vertices.
    #[error("polyline has {count} distinct vertices, need at least 2")]
    TooFewPoints {
        /// Number of distinct vertices found.
        count: usize,
    },

    /// The polyline has (effectively) zero length.
    #[error("polyline has zero length")]
    Degenerate,

    /// A coordinate is NaN or infinite.
    #[error("polyline contains a non-finite coordinate")]
    NonFinite,
}
