//! Point-in-polygon lookup over the authoritative jurisdiction layer.
//!
//! The layer's polygons never overlap, so the first containing polygon is
//! the answer.

use curb_map_street_models::{BoundaryRow, Jurisdiction};
use geo::{Contains as _, Coord, MultiPolygon};
use geojson::GeoJson;
use rstar::{AABB, RTree, RTreeObject};

use crate::compute_envelope;

/// A jurisdiction polygon stored in the R-tree with its label.
struct BoundaryEntry {
    jurisdiction: Jurisdiction,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for BoundaryEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree over non-overlapping jurisdiction polygons.
///
/// Built once per run and shared read-only by every worker.
pub struct JurisdictionIndex {
    boundaries: RTree<BoundaryEntry>,
    skipped: usize,
}

impl JurisdictionIndex {
    /// Builds the index from boundary rows.
    ///
    /// Rows whose `GeoJSON` is not a `Polygon` or `MultiPolygon` are
    /// skipped and counted in [`Self::skipped_rows`].
    #[must_use]
    pub fn build(rows: &[BoundaryRow]) -> Self {
        let mut skipped = 0;
        let mut polygons = Vec::with_capacity(rows.len());

        for row in rows {
            let Some(multi_polygon) = parse_geojson_to_multipolygon(&row.boundary_geojson) else {
                log::warn!("Failed to parse GeoJSON for boundary {}", row.jurisdiction);
                skipped += 1;
                continue;
            };
            polygons.push((row.jurisdiction.clone(), multi_polygon));
        }

        let mut index = Self::from_polygons(polygons);
        index.skipped = skipped;
        log::info!(
            "Loaded {} jurisdiction polygons into spatial index ({skipped} skipped)",
            index.len()
        );
        index
    }

    /// Builds the index from already-parsed polygons.
    #[must_use]
    pub fn from_polygons(polygons: Vec<(Jurisdiction, MultiPolygon<f64>)>) -> Self {
        let entries = polygons
            .into_iter()
            .map(|(jurisdiction, polygon)| BoundaryEntry {
                jurisdiction,
                envelope: compute_envelope(&polygon),
                polygon,
            })
            .collect();

        Self {
            boundaries: RTree::bulk_load(entries),
            skipped: 0,
        }
    }

    /// Looks up the jurisdiction whose polygon contains `point`.
    #[must_use]
    pub fn lookup(&self, point: Coord<f64>) -> Option<&Jurisdiction> {
        let geo_point = geo::Point::from(point);
        let query_env = AABB::from_point([point.x, point.y]);

        self.boundaries
            .locate_in_envelope_intersecting(&query_env)
            .find(|entry| entry.polygon.contains(&geo_point))
            .map(|entry| &entry.jurisdiction)
    }

    /// Number of polygons in the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.boundaries.size()
    }

    /// Whether the index holds no polygons.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boundaries.size() == 0
    }

    /// Number of boundary rows that could not be parsed.
    #[must_use]
    pub const fn skipped_rows(&self) -> usize {
        self.skipped
    }
}

/// Parse a `GeoJSON` string into a [`MultiPolygon`].
///
/// Accepts a bare geometry or a feature wrapping one, of type `Polygon`
/// or `MultiPolygon`.
#[must_use]
pub fn parse_geojson_to_multipolygon(geojson_str: &str) -> Option<MultiPolygon<f64>> {
    let geometry = match geojson_str.parse::<GeoJson>().ok()? {
        GeoJson::Geometry(geom) => geom,
        GeoJson::Feature(feature) => feature.geometry?,
        GeoJson::FeatureCollection(_) => return None,
    };

    match geo::Geometry::<f64>::try_from(geometry).ok()? {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> String {
        serde_json::json!({
            "type": "Polygon",
            "coordinates": [[
                [x0, y0], [x0 + size, y0], [x0 + size, y0 + size], [x0, y0 + size], [x0, y0]
            ]],
        })
        .to_string()
    }

    fn two_districts() -> JurisdictionIndex {
        JurisdictionIndex::build(&[
            BoundaryRow {
                jurisdiction: Jurisdiction::new("CITY", "West"),
                boundary_geojson: square(0.0, 0.0, 100.0),
            },
            BoundaryRow {
                jurisdiction: Jurisdiction::new("CITY", "East"),
                boundary_geojson: square(100.0, 0.0, 100.0),
            },
        ])
    }

    #[test]
    fn finds_containing_polygon() {
        let index = two_districts();
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.lookup(Coord { x: 50.0, y: 50.0 }),
            Some(&Jurisdiction::new("CITY", "West"))
        );
        assert_eq!(
            index.lookup(Coord { x: 150.0, y: 20.0 }),
            Some(&Jurisdiction::new("CITY", "East"))
        );
    }

    #[test]
    fn outside_coverage_is_none() {
        assert!(two_districts().lookup(Coord { x: 500.0, y: 500.0 }).is_none());
    }

    #[test]
    fn skips_non_polygon_rows() {
        let index = JurisdictionIndex::build(&[BoundaryRow {
            jurisdiction: Jurisdiction::new("CITY", "Nowhere"),
            boundary_geojson: r#"{"type":"Point","coordinates":[1.0,2.0]}"#.to_string(),
        }]);
        assert!(index.is_empty());
        assert_eq!(index.skipped_rows(), 1);
    }

    #[test]
    fn parses_feature_wrapped_polygon() {
        let feature = serde_json::json!({
            "type": "Feature",
            "properties": {},
            "geometry": serde_json::from_str::<serde_json::Value>(&square(0.0, 0.0, 1.0)).unwrap(),
        })
        .to_string();
        assert!(parse_geojson_to_multipolygon(&feature).is_some());
        assert!(parse_geojson_to_multipolygon("not json").is_none());
    }
}
