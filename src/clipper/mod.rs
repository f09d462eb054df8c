//! Polygon boolean and offset operations.
//!
//! This module wraps the geo-clipper library to provide the region operations
//! the support pipeline is built from: union, intersection, difference and
//! offsetting with round joins. Scaled integer regions are converted to
//! `geo` floating-point polygons in millimetres; the clipper scale factor of
//! 1000 makes the internal integer grid exactly one micrometre, so results
//! convert back without precision loss.

use crate::geometry::{ExPolygon, ExPolygons, Point, Polygon};
use crate::{unscale, Coord};
use geo::{Coord as GeoCoord, LineString, MultiPolygon, Polygon as GeoPolygon};
use geo_clipper::{Clipper, EndType, JoinType};

/// Clipper scale factor: 1000 clipper units per mm = one unit per micrometre.
const CLIPPER_FACTOR: f64 = 1000.0;

/// Join type for offset corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetJoinType {
    /// Square corners.
    Square,
    /// Round corners.
    #[default]
    Round,
    /// Mitered corners.
    Miter,
}

impl From<OffsetJoinType> for JoinType {
    fn from(jt: OffsetJoinType) -> Self {
        match jt {
            OffsetJoinType::Square => JoinType::Square,
            OffsetJoinType::Round => JoinType::Round(0.25), // Default arc tolerance
            OffsetJoinType::Miter => JoinType::Miter(2.0),  // Default miter limit
        }
    }
}

fn ring_to_geo(ring: &Polygon) -> LineString<f64> {
    let mut coords: Vec<GeoCoord<f64>> = ring
        .points()
        .iter()
        .map(|p| GeoCoord {
            x: unscale(p.x),
            y: unscale(p.y),
        })
        .collect();

    // geo expects closed rings.
    if let (Some(first), Some(last)) = (coords.first(), coords.last()) {
        if first != last {
            coords.push(*first);
        }
    }

    LineString::new(coords)
}

fn expolygon_to_geo(expoly: &ExPolygon) -> GeoPolygon<f64> {
    let holes = expoly.holes.iter().map(ring_to_geo).collect();
    GeoPolygon::new(ring_to_geo(&expoly.contour), holes)
}

fn expolygons_to_geo_multi(expolys: &[ExPolygon]) -> MultiPolygon<f64> {
    MultiPolygon::new(expolys.iter().map(expolygon_to_geo).collect())
}

fn geo_ring_to_polygon(ring: &LineString<f64>) -> Polygon {
    let mut points: Vec<Point> = ring
        .coords()
        .map(|c| Point::new(crate::scale(c.x), crate::scale(c.y)))
        .collect();

    // Drop the closing point; our polygons are implicitly closed.
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    Polygon::from_points(points)
}

fn geo_to_expolygon(geo_poly: &GeoPolygon<f64>) -> ExPolygon {
    let contour = geo_ring_to_polygon(geo_poly.exterior());
    let holes = geo_poly.interiors().iter().map(geo_ring_to_polygon).collect();
    ExPolygon::with_holes(contour, holes)
}

fn geo_multi_to_expolygons(multi: &MultiPolygon<f64>) -> ExPolygons {
    multi.0.iter().map(geo_to_expolygon).collect()
}

/// Compute the union of two region sets.
pub fn union(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() {
        return union_all(clip);
    }
    if clip.is_empty() {
        return union_all(subject);
    }

    let subject_geo = expolygons_to_geo_multi(subject);
    let clip_geo = expolygons_to_geo_multi(clip);

    let result = subject_geo.union(&clip_geo, CLIPPER_FACTOR);
    geo_multi_to_expolygons(&result)
}

/// Union a single, possibly self-overlapping set into disjoint components.
pub fn union_all(polygons: &[ExPolygon]) -> ExPolygons {
    if polygons.len() <= 1 {
        return polygons.to_vec();
    }

    let subject_geo = expolygons_to_geo_multi(polygons);

    let result = subject_geo.union(&subject_geo, CLIPPER_FACTOR);
    geo_multi_to_expolygons(&result)
}

/// Compute the intersection of two region sets.
pub fn intersection(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() || clip.is_empty() {
        return vec![];
    }

    let subject_geo = expolygons_to_geo_multi(subject);
    let clip_geo = expolygons_to_geo_multi(clip);

    let result = subject_geo.intersection(&clip_geo, CLIPPER_FACTOR);
    geo_multi_to_expolygons(&result)
}

/// Compute the difference of two region sets (subject minus clip).
pub fn difference(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() {
        return vec![];
    }
    if clip.is_empty() {
        return subject.to_vec();
    }

    let subject_geo = expolygons_to_geo_multi(subject);
    let clip_geo = expolygons_to_geo_multi(clip);

    let result = subject_geo.difference(&clip_geo, CLIPPER_FACTOR);
    geo_multi_to_expolygons(&result)
}

/// Offset a region set by `delta` scaled units. Positive inflates, negative
/// deflates.
pub fn offset(expolygons: &[ExPolygon], delta: Coord, join_type: OffsetJoinType) -> ExPolygons {
    if expolygons.is_empty() {
        return vec![];
    }

    let geo_multi = expolygons_to_geo_multi(expolygons);
    let jt = join_type.into();

    let result = geo_multi.offset(unscale(delta), jt, EndType::ClosedPolygon, CLIPPER_FACTOR);
    geo_multi_to_expolygons(&result)
}

/// Remove micrometre-scale zigzag artefacts left behind by repeated insets.
pub fn smooth(expolygons: &[ExPolygon], remove_length: Coord) -> ExPolygons {
    expolygons
        .iter()
        .map(|ex| {
            let mut result = ex.clone();
            result.contour.smooth(remove_length);
            for hole in &mut result.holes {
                hole.smooth(remove_length);
            }
            result
        })
        .filter(|ex| ex.contour.len() >= 3)
        .collect()
}

/// Simplify every ring of a region set. Segments shorter than
/// `smallest_line_segment` are collapsed where the outline deviates by less
/// than `allowed_error`.
pub fn simplify(
    expolygons: &[ExPolygon],
    smallest_line_segment: Coord,
    allowed_error: Coord,
) -> ExPolygons {
    expolygons
        .iter()
        .map(|ex| {
            let mut result = ex.clone();
            result.contour.simplify(smallest_line_segment, allowed_error);
            for hole in &mut result.holes {
                hole.simplify(smallest_line_segment, allowed_error);
            }
            result.holes.retain(|h| h.len() >= 3);
            result
        })
        .filter(|ex| ex.contour.len() >= 3)
        .collect()
}
