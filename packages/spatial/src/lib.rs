#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial indexes for the curb join.
//!
//! [`SegmentIndex`] holds both curbs of every centerline block in an
//! R-tree, with O(1) lookup by `(network ID, side)` and an along-street
//! ordering used to walk multi-block regulations. [`JurisdictionIndex`]
//! answers point-in-polygon lookups against the authoritative,
//! non-overlapping administrative layer.
//!
//! Both are built once per run and shared read-only.

mod chain;
pub mod jurisdiction;
pub mod segment;
pub mod segment_index;

use curb_map_street_models::NetworkId;
use geo::{BoundingRect, Rect};
use rstar::AABB;

pub use jurisdiction::{JurisdictionIndex, parse_geojson_to_multipolygon};
pub use segment::{DirectedStreetSegment, StreetCenterline};
pub use segment_index::{
    AlongStreet, ChainPosition, DEFAULT_NODE_SNAP_M, IndexOptions, NearbySegment, SegmentIndex,
    SkipReason, SkippedStreetRow,
};

/// Conditions that make the street network unusable for a run.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// No usable street rows were supplied.
    #[error("street network is empty")]
    EmptyNetwork,

    /// A street row has no centerline field at all.
    #[error("street row {network_id} has no centerline geometry")]
    MissingGeometry {
        /// Network ID of the malformed row.
        network_id: NetworkId,
    },
}

/// Bounding-box envelope of a centerline or polygon for the R-trees.
///
/// Empty geometries get a point envelope at the origin.
pub(crate) fn compute_envelope(geometry: &impl BoundingRect<f64>) -> AABB<[f64; 2]> {
    let rect: Option<Rect<f64>> = geometry.bounding_rect().into();
    rect.map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

#[cfg(test)]
mod tests {
    use geo::{LineString, MultiPolygon, polygon};

    use super::*;

    #[test]
    fn envelope_covers_lines_and_polygons() {
        let line = LineString::from(vec![(3.0, -2.0), (10.0, 4.0), (-1.0, 1.0)]);
        assert_eq!(
            compute_envelope(&line),
            AABB::from_corners([-1.0, -2.0], [10.0, 4.0])
        );

        let square = polygon![(x: 0.0, y: 0.0), (x: 5.0, y: 0.0), (x: 5.0, y: 5.0), (x: 0.0, y: 5.0)];
        let mp = MultiPolygon(vec![square]);
        assert_eq!(compute_envelope(&mp), AABB::from_corners([0.0, 0.0], [5.0, 5.0]));
    }

    #[test]
    fn empty_geometry_gets_origin_envelope() {
        let empty: MultiPolygon<f64> = MultiPolygon(Vec::new());
        assert_eq!(compute_envelope(&empty), AABB::from_point([0.0, 0.0]));
    }
}
