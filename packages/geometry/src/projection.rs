//! WGS84 to local planar metres.
//!
//! Every distance threshold in the join is expressed in metres, so rows
//! that arrive as longitude/latitude must be projected first. An
//! equirectangular projection about a city-scale origin keeps errors far
//! below the curb offsets being measured.

use curb_map_street_models::Coordinate;

/// Mean Earth radius in metres.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Equirectangular projection about a fixed origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalProjection {
    origin_lon: f64,
    origin_lat: f64,
    metres_per_deg_lon: f64,
    metres_per_deg_lat: f64,
}

impl LocalProjection {
    /// Creates a projection centred on `(origin_lon, origin_lat)`.
    #[must_use]
    pub fn new(origin_lon: f64, origin_lat: f64) -> Self {
        let metres_per_deg_lat = EARTH_RADIUS_M.to_radians();
        Self {
            origin_lon,
            origin_lat,
            metres_per_deg_lon: metres_per_deg_lat * origin_lat.to_radians().cos(),
            metres_per_deg_lat,
        }
    }

    /// Projects a `[lon, lat]` pair to `[x, y]` metres.
    #[must_use]
    pub fn project(&self, [lon, lat]: Coordinate) -> Coordinate {
        [
            (lon - self.origin_lon) * self.metres_per_deg_lon,
            (lat - self.origin_lat) * self.metres_per_deg_lat,
        ]
    }

    /// Inverse of [`Self::project`].
    #[must_use]
    pub fn unproject(&self, [x, y]: Coordinate) -> Coordinate {
        [
            x / self.metres_per_deg_lon + self.origin_lon,
            y / self.metres_per_deg_lat + self.origin_lat,
        ]
    }

    /// Projects every vertex of a `[lon, lat]` polyline.
    #[must_use]
    pub fn project_line(&self, coords: &[Coordinate]) -> Vec<Coordinate> {
        coords.iter().map(|&c| self.project(c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_maps_to_zero() {
        let proj = LocalProjection::new(-122.42, 37.76);
        assert_eq!(proj.project([-122.42, 37.76]), [0.0, 0.0]);
    }

    #[test]
    fn one_millidegree_of_latitude_is_about_111_metres() {
        let proj = LocalProjection::new(-122.42, 37.76);
        let [x, y] = proj.project([-122.42, 37.761]);
        assert!(x.abs() < 1e-9);
        assert!((y - 111.19).abs() < 0.1, "{y}");
    }

    #[test]
    fn longitude_shrinks_with_latitude() {
        let proj = LocalProjection::new(-122.42, 37.76);
        let [x, _] = proj.project([-122.419, 37.76]);
        assert!((x - 87.9).abs() < 0.2, "{x}");
    }

    #[test]
    fn unproject_inverts_project() {
        let proj = LocalProjection::new(-87.63, 41.88);
        let [lon, lat] = proj.unproject(proj.project([-87.6278, 41.8827]));
        assert!((lon + 87.6278).abs() < 1e-9);
        assert!((lat - 41.8827).abs() < 1e-9);
    }
}
