//! Polygon type for closed contours.

use super::{BoundingBox, Line, Point};
use crate::{Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, Index};

/// A closed polygon defined by a sequence of points.
///
/// The polygon is implicitly closed - the last point connects back to the
/// first. Points are ordered counter-clockwise for outer contours (positive
/// area) and clockwise for holes (negative area).
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    /// Create a new empty polygon.
    #[inline]
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Create a polygon from a vector of points.
    #[inline]
    pub fn from_points(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Get the points of this polygon.
    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Get the number of points in the polygon.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the polygon is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Add a point to the polygon.
    #[inline]
    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    /// Get the line segment from point `i` to point `i + 1`, wrapping around.
    #[inline]
    pub fn edge(&self, index: usize) -> Line {
        let len = self.points.len();
        Line::new(self.points[index % len], self.points[(index + 1) % len])
    }

    /// Signed area via the shoelace formula. Positive for counter-clockwise.
    pub fn signed_area(&self) -> CoordF {
        if self.points.len() < 3 {
            return 0.0;
        }

        let mut sum: i128 = 0;
        for i in 0..self.points.len() {
            let j = (i + 1) % self.points.len();
            sum += self.points[i].x as i128 * self.points[j].y as i128;
            sum -= self.points[j].x as i128 * self.points[i].y as i128;
        }

        sum as CoordF / 2.0
    }

    /// Unsigned area of the polygon.
    #[inline]
    pub fn area(&self) -> CoordF {
        self.signed_area().abs()
    }

    /// Reverse the point order, flipping the orientation.
    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    /// Bounding box of the polygon.
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.points)
    }

    /// Ray-casting point-in-polygon test. Points exactly on the boundary may
    /// fall on either side; use [`Polygon::is_point_on_boundary`] when the
    /// border matters.
    pub fn contains_point(&self, p: &Point) -> bool {
        if self.points.len() < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = self.points.len() - 1;

        for i in 0..self.points.len() {
            let pi = &self.points[i];
            let pj = &self.points[j];

            if ((pi.y > p.y) != (pj.y > p.y))
                && ((p.x as i128 - pi.x as i128) * (pj.y as i128 - pi.y as i128)
                    < (pj.x as i128 - pi.x as i128) * (p.y as i128 - pi.y as i128))
                    == (pj.y > pi.y)
            {
                inside = !inside;
            }
            j = i;
        }

        inside
    }

    /// Whether the point lies on the polygon boundary within a tolerance.
    pub fn is_point_on_boundary(&self, p: &Point, tolerance: Coord) -> bool {
        for i in 0..self.points.len() {
            if self.edge(i).contains_point(p, tolerance) {
                return true;
            }
        }
        false
    }

    /// Closest point on the polygon boundary, together with the edge it lies
    /// on.
    pub fn closest_point(&self, p: &Point) -> Option<(Point, Line)> {
        if self.points.is_empty() {
            return None;
        }
        if self.points.len() == 1 {
            let line = Line::new(self.points[0], self.points[0]);
            return Some((self.points[0], line));
        }

        let mut best: Option<(Point, Line)> = None;
        let mut min_dist = i128::MAX;

        for i in 0..self.points.len() {
            let edge = self.edge(i);
            let proj = edge.project_point(p);
            let dist = p.distance_squared(&proj);
            if dist < min_dist {
                min_dist = dist;
                best = Some((proj, edge));
            }
        }

        best
    }

    /// Translate the polygon by a vector.
    pub fn translate(&mut self, v: Point) {
        for p in &mut self.points {
            *p = *p + v;
        }
    }

    /// Remove micrometre-scale zigzag segments. A vertex is dropped when both
    /// of its adjacent segments are shorter than `remove_length`.
    pub fn smooth(&mut self, remove_length: Coord) {
        if self.points.len() < 4 {
            return;
        }

        let limit = (remove_length as i128) * (remove_length as i128);
        let mut kept = Vec::with_capacity(self.points.len());
        let n = self.points.len();
        for i in 0..n {
            let prev = self.points[(i + n - 1) % n];
            let curr = self.points[i];
            let next = self.points[(i + 1) % n];
            if prev.distance_squared(&curr) < limit && curr.distance_squared(&next) < limit {
                continue;
            }
            kept.push(curr);
        }

        if kept.len() >= 3 {
            self.points = kept;
        }
    }

    /// Simplify the contour: a vertex is removed when the segment leading to
    /// it is shorter than `smallest_line_segment` and dropping it deviates
    /// from the original outline by less than `allowed_error`.
    pub fn simplify(&mut self, smallest_line_segment: Coord, allowed_error: Coord) {
        if self.points.len() < 4 {
            return;
        }

        let segment_sq = (smallest_line_segment.max(0) as i128) * (smallest_line_segment.max(0) as i128);
        let mut kept: Vec<Point> = Vec::with_capacity(self.points.len());

        for i in 0..self.points.len() {
            let curr = self.points[i];
            let next = self.points[(i + 1) % self.points.len()];

            let prev = match kept.last() {
                Some(p) => *p,
                None => {
                    kept.push(curr);
                    continue;
                }
            };

            if prev.distance_squared(&curr) < segment_sq {
                let shortcut = Line::new(prev, next);
                if shortcut.distance_to_point(&curr) <= allowed_error as CoordF {
                    continue;
                }
            }
            kept.push(curr);
        }

        if kept.len() >= 3 {
            self.points = kept;
        }
    }

    /// Create an axis-aligned rectangle.
    pub fn rectangle(min: Point, max: Point) -> Self {
        Self::from_points(vec![
            min,
            Point::new(max.x, min.y),
            max,
            Point::new(min.x, max.y),
        ])
    }

    /// Create a regular polygon with `n` vertices at the given radius,
    /// centred at the origin.
    pub fn regular(n: usize, radius: Coord) -> Self {
        if n < 3 {
            return Self::new();
        }

        let mut points = Vec::with_capacity(n);
        for i in 0..n {
            let angle = 2.0 * std::f64::consts::PI * i as CoordF / n as CoordF;
            points.push(Point::new(
                (radius as CoordF * angle.cos()).round() as Coord,
                (radius as CoordF * angle.sin()).round() as Coord,
            ));
        }

        Self::from_points(points)
    }

    /// Create a circle approximation with `segments` vertices.
    pub fn circle(center: Point, radius: Coord, segments: usize) -> Self {
        let mut poly = Self::regular(segments, radius);
        poly.translate(center);
        poly
    }
}

impl fmt::Debug for Polygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Polygon({} points)", self.points.len())
    }
}

impl Deref for Polygon {
    type Target = [Point];

    fn deref(&self) -> &Self::Target {
        &self.points
    }
}

impl Index<usize> for Polygon {
    type Output = Point;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

impl FromIterator<Point> for Polygon {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Point>> for Polygon {
    fn from(points: Vec<Point>) -> Self {
        Self::from_points(points)
    }
}

/// A collection of polygons.
pub type Polygons = Vec<Polygon>;

#[cfg(test)]
mod tests {
    use super::*;

    fn make_square() -> Polygon {
        Polygon::from_points(vec![
            Point::new(0, 0),
            Point::new(100, 0),
            Point::new(100, 100),
            Point::new(0, 100),
        ])
    }

    #[test]
    fn test_polygon_area() {
        let poly = make_square();
        assert!((poly.area() - 10000.0).abs() < 1.0);
        assert!(poly.signed_area() > 0.0);

        let mut cw = poly.clone();
        cw.reverse();
        assert!(cw.signed_area() < 0.0);
    }

    #[test]
    fn test_polygon_contains_point() {
        let poly = make_square();
        assert!(poly.contains_point(&Point::new(50, 50)));
        assert!(!poly.contains_point(&Point::new(-10, 50)));
        assert!(!poly.contains_point(&Point::new(110, 50)));
    }

    #[test]
    fn test_polygon_boundary() {
        let poly = make_square();
        assert!(poly.is_point_on_boundary(&Point::new(50, 0), 1));
        assert!(!poly.is_point_on_boundary(&Point::new(50, 50), 1));
    }

    #[test]
    fn test_polygon_closest_point() {
        let poly = make_square();
        let (closest, _) = poly.closest_point(&Point::new(50, -20)).unwrap();
        assert_eq!(closest, Point::new(50, 0));
    }

    #[test]
    fn test_polygon_rectangle() {
        let poly = Polygon::rectangle(Point::new(0, 0), Point::new(100, 50));
        assert_eq!(poly.len(), 4);
        assert!((poly.area() - 5000.0).abs() < 1.0);
    }

    #[test]
    fn test_polygon_regular() {
        let decagon = Polygon::regular(10, 1000);
        assert_eq!(decagon.len(), 10);
        for p in decagon.points() {
            assert!((p.length() - 1000.0).abs() < 2.0);
        }
    }

    #[test]
    fn test_polygon_smooth_removes_zigzag() {
        let mut poly = Polygon::from_points(vec![
            Point::new(0, 0),
            Point::new(5000, 0),
            Point::new(5002, 3), // micro-zigzag apex between close vertices
            Point::new(5004, 0),
            Point::new(10000, 0),
            Point::new(10000, 10000),
            Point::new(0, 10000),
        ]);
        poly.smooth(5);
        assert_eq!(poly.len(), 6);
    }

    #[test]
    fn test_polygon_simplify_collinear() {
        let mut poly = Polygon::from_points(vec![
            Point::new(0, 0),
            Point::new(50, 1),
            Point::new(100, 0),
            Point::new(100, 100),
            Point::new(0, 100),
        ]);
        poly.simplify(60, 5);
        assert_eq!(poly.len(), 4);
    }

    #[test]
    fn test_polygon_simplify_keeps_sharp_features() {
        let mut poly = make_square();
        poly.simplify(10, 1);
        assert_eq!(poly.len(), 4);
    }
}
