//! Arc-length measurement, interpolation and conversion helpers.

use curb_map_street_models::Coordinate;
use geo::{Coord, LineString};

use crate::{GeometryError, MIN_LENGTH_M, kernel};

/// Builds a [`LineString`] from raw row coordinates.
///
/// Consecutive duplicate vertices are dropped.
///
/// # Errors
///
/// Returns [`GeometryError`] if any coordinate is non-finite, fewer than
/// two distinct vertices remain, or the result has zero length.
pub fn line_string_from_coords(coords: &[Coordinate]) -> Result<LineString<f64>, GeometryError> {
    let mut out: Vec<Coord<f64>> = Vec::with_capacity(coords.len());
    for &[x, y] in coords {
        if !x.is_finite() || !y.is_finite() {
            return Err(GeometryError::NonFinite);
        }
        let c = Coord { x, y };
        if out.last() != Some(&c) {
            out.push(c);
        }
    }

    if out.len() < 2 {
        return Err(GeometryError::TooFewPoints { count: out.len() });
    }

    let line = LineString::new(out);
    if length(&line) < MIN_LENGTH_M {
        return Err(GeometryError::Degenerate);
    }
    Ok(line)
}

/// Total Euclidean length of a polyline.
#[must_use]
pub fn length(line: &LineString<f64>) -> f64 {
    line.lines().map(|seg| seg.dx().hypot(seg.dy())).sum()
}

/// Returns the point at `arc` metres along the polyline.
///
/// `arc` is clamped to `[0, length]`.
///
/// # Errors
///
/// Returns [`GeometryError::Degenerate`] for zero-length input.
pub fn interpolate(line: &LineString<f64>, arc: f64) -> Result<Coord<f64>, GeometryError> {
    let total = length(line);
    if total < MIN_LENGTH_M {
        return Err(GeometryError::Degenerate);
    }
    let target = arc.clamp(0.0, total);

    let mut walked = 0.0;
    for seg in line.lines() {
        let seg_len = seg.dx().hypot(seg.dy());
        if seg_len <= 0.0 {
            continue;
        }
        if walked + seg_len >= target {
            let t = (target - walked) / seg_len;
            return Ok(seg.start + (seg.end - seg.start) * t);
        }
        walked += seg_len;
    }

    line.0.last().copied().ok_or(GeometryError::Degenerate)
}

/// Returns the points at each normalized position (`0.0..=1.0`) of the
/// polyline's arc length.
///
/// # Errors
///
/// Returns [`GeometryError::Degenerate`] for zero-length input.
pub fn sample_fractions(
    line: &LineString<f64>,
    fractions: &[f64],
) -> Result<Vec<Coord<f64>>, GeometryError> {
    let total = length(line);
    fractions
        .iter()
        .map(|f| interpolate(line, total * f.clamp(0.0, 1.0)))
        .collect()
}

/// The point halfway along the polyline's arc length.
///
/// # Errors
///
/// Returns [`GeometryError::Degenerate`] for zero-length input.
pub fn midpoint(line: &LineString<f64>) -> Result<Coord<f64>, GeometryError> {
    interpolate(line, length(line) / 2.0)
}

/// Shortest distance from `point` to the polyline.
///
/// # Errors
///
/// Returns [`GeometryError::Degenerate`] for zero-length input.
pub fn distance_to(point: Coord<f64>, line: &LineString<f64>) -> Result<f64, GeometryError> {
    kernel::project(point, line).map(|p| p.distance)
}

/// Returns a new polyline with the vertex order reversed.
#[must_use]
pub fn reversed(line: &LineString<f64>) -> LineString<f64> {
    LineString::new(line.0.iter().rev().copied().collect())
}
