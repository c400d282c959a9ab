//! Point projection, tangent estimation and signed sidedness.

use curb_map_street_models::Side;
use geo::{Coord, LineString};

use crate::{GeometryError, MIN_LENGTH_M, polyline};

/// Result of projecting a point onto a polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Arc length from the polyline start to the projected point.
    pub arc_length: f64,
    /// Nearest point on the polyline.
    pub point: Coord<f64>,
    /// Distance from the input point to `point`.
    pub distance: f64,
}

/// Outcome of a single sidedness test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sidedness {
    /// Positive cross product.
    Left,
    /// Negative cross product.
    Right,
    /// Magnitude below the configured epsilon; excluded from voting.
    Indeterminate,
}

impl Sidedness {
    /// Returns the determined side, if any.
    #[must_use]
    pub const fn side(self) -> Option<Side> {
        match self {
            Self::Left => Some(Side::Left),
            Self::Right => Some(Side::Right),
            Self::Indeterminate => None,
        }
    }
}

/// Projects `point` onto the nearest location of `line`.
///
/// Ties between equidistant segments resolve to the earliest segment.
///
/// # Errors
///
/// Returns [`GeometryError::Degenerate`] if the polyline has zero length.
pub fn project(point: Coord<f64>, line: &LineString<f64>) -> Result<Projection, GeometryError> {
    let mut best: Option<Projection> = None;
    let mut walked = 0.0;

    for seg in line.lines() {
        let d = seg.end - seg.start;
        let seg_len_sq = d.x.mul_add(d.x, d.y * d.y);
        if seg_len_sq <= 0.0 {
            continue;
        }
        let seg_len = seg_len_sq.sqrt();

        let w = point - seg.start;
        let t = (w.x.mul_add(d.x, w.y * d.y) / seg_len_sq).clamp(0.0, 1.0);
        let foot = seg.start + d * t;
        let distance = (point.x - foot.x).hypot(point.y - foot.y);

        if best.is_none_or(|b| distance < b.distance) {
            best = Some(Projection {
                arc_length: t.mul_add(seg_len, walked),
                point: foot,
                distance,
            });
        }
        walked += seg_len;
    }

    match best {
        Some(p) if walked >= MIN_LENGTH_M => Ok(p),
        _ => Err(GeometryError::Degenerate),
    }
}

/// Unit direction of travel at `arc` metres along the polyline.
///
/// Uses a forward difference over `epsilon` metres, switching to a
/// backward difference when the forward step would run past the end.
///
/// # Errors
///
/// Returns [`GeometryError::Degenerate`] if the polyline has zero length.
pub fn tangent_at(
    line: &LineString<f64>,
    arc: f64,
    epsilon: f64,
) -> Result<Coord<f64>, GeometryError> {
    let total = polyline::length(line);
    if total < MIN_LENGTH_M {
        return Err(GeometryError::Degenerate);
    }
    let arc = arc.clamp(0.0, total);
    let step = epsilon.clamp(MIN_LENGTH_M, total);

    let (from, to) = if arc + step <= total {
        (arc, arc + step)
    } else {
        ((arc - step).max(0.0), total)
    };

    let a = polyline::interpolate(line, from)?;
    let b = polyline::interpolate(line, to)?;
    let d = b - a;
    let norm = d.x.hypot(d.y);
    if norm < MIN_LENGTH_M {
        return Err(GeometryError::Degenerate);
    }
    Ok(d / norm)
}

/// 2D cross product of `tangent` and `to - from`.
///
/// Positive means `to` lies left of the tangent as seen from `from`,
/// negative means right. With a unit tangent the magnitude is the
/// perpendicular offset.
#[must_use]
pub fn signed_side(tangent: Coord<f64>, from: Coord<f64>, to: Coord<f64>) -> f64 {
    let v = to - from;
    tangent.x.mul_add(v.y, -(tangent.y * v.x))
}

/// Classifies a signed-side value, treating `|value| <= epsilon` as
/// indeterminate.
#[must_use]
pub fn sidedness(value: f64, epsilon: f64) -> Sidedness {
    if !value.is_finite() || value.abs() <= epsilon {
        Sidedness::Indeterminate
    } else if value > 0.0 {
        Sidedness::Left
    } else {
        Sidedness::Right
    }
}
