//! The segment index: exact lookup, radius queries and along-street order.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use curb_map_geometry::{GeometryError, line_string_from_coords};
use curb_map_street_models::{NetworkId, Side, StreetRow, normalize_street_name};
use geo::LineString;
use rstar::{AABB, RTree, RTreeObject};

use crate::{IndexError, compute_envelope};
use crate::chain::{ChainLink, order_street};
use crate::jurisdiction::JurisdictionIndex;
use crate::segment::{DirectedStreetSegment, StreetCenterline};

/// Default distance under which two centerline endpoints are one node.
pub const DEFAULT_NODE_SNAP_M: f64 = 2.0;

/// A centerline stored in the R-tree by index.
struct CenterlineEntry {
    street: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for CenterlineEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Why a street row was left out of the index.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// An earlier row already used this network ID.
    DuplicateNetworkId,
    /// The centerline is malformed or degenerate.
    Geometry(GeometryError),
}

/// A street row that was left out of the index.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedStreetRow {
    /// Network ID of the skipped row.
    pub network_id: NetworkId,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// A segment returned by a radius query.
#[derive(Debug, Clone, Copy)]
pub struct NearbySegment<'a> {
    /// The directed segment.
    pub segment: &'a DirectedStreetSegment,
    /// Distance from the query geometry's midpoint to the centerline.
    pub distance: f64,
}

/// A segment in along-street order.
#[derive(Debug, Clone, Copy)]
pub struct AlongStreet<'a> {
    /// The directed segment on the requested physical curb.
    pub segment: &'a DirectedStreetSegment,
    /// Whether the block is digitized against the street's chain direction.
    pub reversed: bool,
    /// Whether the network is disconnected just before this block.
    pub gap_before: bool,
    /// Distance along the street to this block's entry.
    pub offset_m: f64,
}

/// Where a block sits in its street's along-street order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainPosition {
    /// Position in [`SegmentIndex::segments_along_street`].
    pub index: usize,
    /// Whether the block runs against the chain direction.
    pub reversed: bool,
}

/// Build-time options for [`SegmentIndex`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexOptions {
    /// Endpoints closer than this are treated as the same network node.
    pub node_snap_m: f64,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            node_snap_m: DEFAULT_NODE_SNAP_M,
        }
    }
}

/// Spatial index over every `(network ID, side)` curb.
///
/// Constructed once from the street network and shared read-only by
/// reference with every matching call.
pub struct SegmentIndex {
    streets: Vec<Arc<StreetCenterline>>,
    /// `2 * street` is the left curb, `2 * street + 1` the right.
    segments: Vec<DirectedStreetSegment>,
    by_id: HashMap<NetworkId, usize>,
    tree: RTree<CenterlineEntry>,
    chains: BTreeMap<String, Vec<ChainLink>>,
    chain_positions: Vec<usize>,
    skipped: Vec<SkippedStreetRow>,
}

impl SegmentIndex {
    /// Builds the index with default options and no jurisdiction layer.
    ///
    /// # Errors
    ///
    /// See [`Self::build_with`].
    pub fn build(rows: &[StreetRow]) -> Result<Self, IndexError> {
        Self::build_with(rows, IndexOptions::default(), None)
    }

    /// Builds the index.
    ///
    /// Each row yields a left and a right [`DirectedStreetSegment`] that
    /// share one centerline. A row's jurisdiction is the one it declares,
    /// else the polygon containing its centerline midpoint.
    ///
    /// Duplicate network IDs (after the first) and degenerate centerlines
    /// are skipped and listed in [`Self::skipped_rows`].
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::MissingGeometry`] if a row has no centerline
    /// at all, and [`IndexError::EmptyNetwork`] if no usable row remains.
    pub fn build_with(
        rows: &[StreetRow],
        options: IndexOptions,
        jurisdictions: Option<&JurisdictionIndex>,
    ) -> Result<Self, IndexError> {
        if rows.is_empty() {
            return Err(IndexError::EmptyNetwork);
        }

        let mut streets: Vec<Arc<StreetCenterline>> = Vec::with_capacity(rows.len());
        let mut segments = Vec::with_capacity(rows.len() * 2);
        let mut by_id = HashMap::with_capacity(rows.len());
        let mut skipped = Vec::new();

        for row in rows {
            let Some(coords) = row.centerline.as_deref() else {
                return Err(IndexError::MissingGeometry {
                    network_id: row.network_id.clone(),
                });
            };

            if by_id.contains_key(&row.network_id) {
                log::warn!("Skipping duplicate street row for network ID {}", row.network_id);
                skipped.push(SkippedStreetRow {
                    network_id: row.network_id.clone(),
                    reason: SkipReason::DuplicateNetworkId,
                });
                continue;
            }

            let geometry = match line_string_from_coords(coords) {
                Ok(geometry) => geometry,
                Err(e) => {
                    log::warn!("Skipping street row {}: {e}", row.network_id);
                    skipped.push(SkippedStreetRow {
                        network_id: row.network_id.clone(),
                        reason: SkipReason::Geometry(e),
                    });
                    continue;
                }
            };

            let jurisdiction = row.jurisdiction.clone().or_else(|| {
                let lookup = jurisdictions?;
                let mid = curb_map_geometry::midpoint(&geometry).ok()?;
                lookup.lookup(mid).cloned()
            });

            let street = Arc::new(StreetCenterline {
                network_id: row.network_id.clone(),
                street_name: row.street_name.clone(),
                street_key: normalize_street_name(&row.street_name),
                from_street: row.from_street.clone(),
                to_street: row.to_street.clone(),
                address_range: row.address_range.clone(),
                length_m: curb_map_geometry::length(&geometry),
                geometry,
                jurisdiction,
            });

            for side in Side::BOTH {
                let curb = row.curb(side).and_then(|coords| {
                    line_string_from_coords(coords)
                        .map_err(|e| {
                            log::warn!(
                                "Ignoring {side} curb line of street row {}: {e}",
                                row.network_id
                            );
                        })
                        .ok()
                });
                segments.push(DirectedStreetSegment::new(Arc::clone(&street), side, curb));
            }

            by_id.insert(row.network_id.clone(), streets.len());
            streets.push(street);
        }

        if streets.is_empty() {
            return Err(IndexError::EmptyNetwork);
        }

        let tree = RTree::bulk_load(
            streets
                .iter()
                .enumerate()
                .map(|(street, line)| CenterlineEntry {
                    street,
                    envelope: compute_envelope(&line.geometry),
                })
                .collect(),
        );

        let (chains, chain_positions) = build_chains(&streets, options.node_snap_m);

        log::info!(
            "Indexed {} street segments ({} directed) across {} streets, {} rows skipped",
            streets.len(),
            segments.len(),
            chains.len(),
            skipped.len()
        );

        Ok(Self {
            streets,
            segments,
            by_id,
            tree,
            chains,
            chain_positions,
            skipped,
        })
    }

    /// Looks up the curb `(network_id, side)` directly.
    #[must_use]
    pub fn exact(&self, network_id: &NetworkId, side: Side) -> Option<&DirectedStreetSegment> {
        self.by_id
            .get(network_id)
            .map(|&street| self.segment(street, side))
    }

    /// Both curbs of a block, left first.
    #[must_use]
    pub fn sides(&self, network_id: &NetworkId) -> Option<[&DirectedStreetSegment; 2]> {
        self.by_id.get(network_id).map(|&street| {
            [
                self.segment(street, Side::Left),
                self.segment(street, Side::Right),
            ]
        })
    }

    /// Every curb whose centerline lies within `max_distance` of the
    /// geometry's arc-length midpoint, nearest first.
    ///
    /// Both curbs of each qualifying block are returned. Ties are ordered
    /// by network ID, then side.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if the geometry is degenerate.
    pub fn nearby(
        &self,
        geometry: &LineString<f64>,
        max_distance: f64,
    ) -> Result<Vec<NearbySegment<'_>>, GeometryError> {
        let mid = curb_map_geometry::midpoint(geometry)?;
        let query_env = AABB::from_corners(
            [mid.x - max_distance, mid.y - max_distance],
            [mid.x + max_distance, mid.y + max_distance],
        );

        let mut found = Vec::new();
        for entry in self.tree.locate_in_envelope_intersecting(&query_env) {
            let distance = curb_map_geometry::distance_to(mid, &self.streets[entry.street].geometry)?;
            if distance <= max_distance {
                for side in Side::BOTH {
                    found.push(NearbySegment {
                        segment: self.segment(entry.street, side),
                        distance,
                    });
                }
            }
        }

        found.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.segment.network_id().cmp(b.segment.network_id()))
                .then_with(|| a.segment.side().cmp(&b.segment.side()))
        });
        Ok(found)
    }

    /// The blocks of `street_name` in along-street order, each represented
    /// by its curb on `side` of the street's chain direction.
    ///
    /// Blocks digitized against the chain report their own label for that
    /// physical curb, which is the opposite of `side`.
    #[must_use]
    pub fn segments_along_street(&self, street_name: &str, side: Side) -> Vec<AlongStreet<'_>> {
        self.chains
            .get(&normalize_street_name(street_name))
            .map(|links| {
                links
                    .iter()
                    .map(|link| AlongStreet {
                        segment: self.segment(link.street, side.flipped_if(link.reversed)),
                        reversed: link.reversed,
                        gap_before: link.gap_before,
                        offset_m: link.offset_m,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Where a block sits in [`Self::segments_along_street`] for its street.
    #[must_use]
    pub fn chain_position(&self, network_id: &NetworkId) -> Option<ChainPosition> {
        let &street = self.by_id.get(network_id)?;
        let index = self.chain_positions[street];
        let link = self.chains.get(&self.streets[street].street_key)?.get(index)?;
        Some(ChainPosition {
            index,
            reversed: link.reversed,
        })
    }

    /// Every directed segment, in input order (left before right).
    pub fn iter(&self) -> impl Iterator<Item = &DirectedStreetSegment> {
        self.segments.iter()
    }

    /// Number of indexed blocks (network IDs).
    #[must_use]
    pub fn len(&self) -> usize {
        self.streets.len()
    }

    /// Whether the index holds no blocks. Never true for a built index.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streets.is_empty()
    }

    /// Street rows that were left out of the index.
    #[must_use]
    pub fn skipped_rows(&self) -> &[SkippedStreetRow] {
        &self.skipped
    }

    fn segment(&self, street: usize, side: Side) -> &DirectedStreetSegment {
        let offset = match side {
            Side::Left => 0,
            Side::Right => 1,
        };
        &self.segments[street * 2 + offset]
    }
}

/// Groups blocks by normalized street name and orders each group.
fn build_chains(
    streets: &[Arc<StreetCenterline>],
    snap_m: f64,
) -> (BTreeMap<String, Vec<ChainLink>>, Vec<usize>) {
    let mut members: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, street) in streets.iter().enumerate() {
        members.entry(street.street_key.as_str()).or_default().push(i);
    }

    let mut chains = BTreeMap::new();
    let mut positions = vec![0; streets.len()];
    for (key, mut group) in members {
        group.sort_by(|&a, &b| streets[a].network_id.cmp(&streets[b].network_id));
        let links = order_street(&group, streets, snap_m);
        for (pos, link) in links.iter().enumerate() {
            positions[link.street] = pos;
        }
        chains.insert(key.to_string(), links);
    }

    (chains, positions)
}

#[cfg(test)]
mod tests {
    use curb_map_street_models::{BoundaryRow, Jurisdiction};

    use super::*;

    fn row(id: &str, name: &str, coords: &[[f64; 2]]) -> StreetRow {
        StreetRow {
            network_id: NetworkId::from(id),
            street_name: name.to_string(),
            centerline: Some(coords.to_vec()),
            from_street: None,
            to_street: None,
            address_range: None,
            left_curb: None,
            right_curb: None,
            jurisdiction: None,
        }
    }

    fn main_street() -> Vec<StreetRow> {
        vec![
            row("100", "Main St", &[[0.0, 0.0], [100.0, 0.0]]),
            row("101", "Main St", &[[100.0, 0.0], [200.0, 0.0]]),
            row("102", "Main St", &[[300.0, 0.0], [200.0, 0.0]]),
            row("200", "Cross Ave", &[[100.0, -100.0], [100.0, 0.0]]),
        ]
    }

    fn line(coords: &[[f64; 2]]) -> LineString<f64> {
        line_string_from_coords(coords).unwrap()
    }

    #[test]
    fn every_network_id_has_exactly_two_sides_sharing_a_centerline() {
        let index = SegmentIndex::build(&main_street()).unwrap();
        assert_eq!(index.len(), 4);
        assert_eq!(index.iter().count(), 8);
        for id in ["100", "101", "102", "200"] {
            let id = NetworkId::from(id);
            let [left, right] = index.sides(&id).unwrap();
            assert_eq!(left.side(), Side::Left);
            assert_eq!(right.side(), Side::Right);
            assert!(left.shares_centerline_with(right));
            assert_eq!(index.iter().filter(|s| s.network_id() == &id).count(), 2);
        }
    }

    #[test]
    fn exact_lookup() {
        let index = SegmentIndex::build(&main_street()).unwrap();
        let seg = index.exact(&NetworkId::from("101"), Side::Right).unwrap();
        assert_eq!(seg.network_id().as_str(), "101");
        assert_eq!(seg.side(), Side::Right);
        assert!(index.exact(&NetworkId::from("999"), Side::Left).is_none());
    }

    #[test]
    fn empty_network_is_fatal() {
        assert!(matches!(
            SegmentIndex::build(&[]),
            Err(IndexError::EmptyNetwork)
        ));
    }

    #[test]
    fn missing_centerline_is_fatal() {
        let mut rows = main_street();
        rows[1].centerline = None;
        assert!(matches!(
            SegmentIndex::build(&rows),
            Err(IndexError::MissingGeometry { network_id }) if network_id.as_str() == "101"
        ));
    }

    #[test]
    fn duplicates_and_degenerate_rows_are_skipped() {
        let mut rows = main_street();
        rows.push(row("100", "Main St", &[[0.0, 5.0], [100.0, 5.0]]));
        rows.push(row("300", "Dead End", &[[7.0, 7.0], [7.0, 7.0]]));
        let index = SegmentIndex::build(&rows).unwrap();
        assert_eq!(index.len(), 4);
        assert_eq!(index.skipped_rows().len(), 2);
        assert_eq!(
            index.skipped_rows()[0].reason,
            SkipReason::DuplicateNetworkId
        );
        let original = index.exact(&NetworkId::from("100"), Side::Left).unwrap();
        assert_eq!(original.centerline().0[0].y, 0.0);
    }

    #[test]
    fn nearby_orders_by_distance_and_returns_both_sides() {
        let index = SegmentIndex::build(&main_street()).unwrap();
        let found = index.nearby(&line(&[[20.0, 6.0], [80.0, 6.0]]), 50.0).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].segment.network_id().as_str(), "100");
        assert_eq!(found[0].segment.side(), Side::Left);
        assert_eq!(found[1].segment.side(), Side::Right);
        assert!((found[0].distance - 6.0).abs() < 1e-9);
    }

    #[test]
    fn nearby_respects_radius() {
        let index = SegmentIndex::build(&main_street()).unwrap();
        let found = index
            .nearby(&line(&[[20.0, 80.0], [80.0, 80.0]]), 50.0)
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn along_street_follows_chain_and_flips_reversed_blocks() {
        let index = SegmentIndex::build(&main_street()).unwrap();
        let along = index.segments_along_street("main st", Side::Left);
        let ids: Vec<(&str, Side)> = along
            .iter()
            .map(|a| (a.segment.network_id().as_str(), a.segment.side()))
            .collect();
        assert_eq!(
            ids,
            vec![("100", Side::Left), ("101", Side::Left), ("102", Side::Right)]
        );
        assert!(along.iter().all(|a| !a.gap_before));

        let pos = index.chain_position(&NetworkId::from("102")).unwrap();
        assert_eq!(pos, ChainPosition { index: 2, reversed: true });
    }

    #[test]
    fn unknown_street_is_empty() {
        let index = SegmentIndex::build(&main_street()).unwrap();
        assert!(index.segments_along_street("Nowhere", Side::Left).is_empty());
    }

    #[test]
    fn inherits_jurisdiction_from_polygon_layer() {
        let polygon = serde_json::json!({
            "type": "Polygon",
            "coordinates": [[[0.0, -50.0], [150.0, -50.0], [150.0, 50.0], [0.0, 50.0], [0.0, -50.0]]],
        })
        .to_string();
        let layer = JurisdictionIndex::build(&[BoundaryRow {
            jurisdiction: Jurisdiction::new("CITY", "West"),
            boundary_geojson: polygon,
        }]);

        let mut rows = main_street();
        rows[1].jurisdiction = Some(Jurisdiction::new("CITY", "Declared"));
        let index = SegmentIndex::build_with(&rows, IndexOptions::default(), Some(&layer)).unwrap();

        let inherited = index.exact(&NetworkId::from("100"), Side::Left).unwrap();
        assert_eq!(
            inherited.jurisdiction(),
            Some(&Jurisdiction::new("CITY", "West"))
        );
        let declared = index.exact(&NetworkId::from("101"), Side::Left).unwrap();
        assert_eq!(
            declared.jurisdiction(),
            Some(&Jurisdiction::new("CITY", "Declared"))
        );
        let outside = index.exact(&NetworkId::from("102"), Side::Left).unwrap();
        assert!(outside.jurisdiction().is_none());
    }
}
