//! Line segment type.

use super::Point;
use crate::{Coord, CoordF};
use serde::{Deserialize, Serialize};

/// A line segment between two points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Line {
    pub a: Point,
    pub b: Point,
}

impl Line {
    /// Create a new line segment.
    #[inline]
    pub const fn new(a: Point, b: Point) -> Self {
        Self { a, b }
    }

    /// Length of the segment.
    #[inline]
    pub fn length(&self) -> CoordF {
        self.a.distance(&self.b)
    }

    /// The segment direction as a (non-normalized) vector.
    #[inline]
    pub fn vector(&self) -> Point {
        self.b - self.a
    }

    /// Project a point onto this segment, clamping to the endpoints.
    pub fn project_point(&self, p: &Point) -> Point {
        let ab = self.b - self.a;
        let ap = *p - self.a;

        let ab_len_sq = ab.length_squared();
        if ab_len_sq == 0 {
            return self.a;
        }

        let t = (ap.dot(&ab) as CoordF / ab_len_sq as CoordF).clamp(0.0, 1.0);

        Point::new(
            (self.a.x as CoordF + t * ab.x as CoordF).round() as Coord,
            (self.a.y as CoordF + t * ab.y as CoordF).round() as Coord,
        )
    }

    /// Distance from a point to the segment.
    pub fn distance_to_point(&self, p: &Point) -> CoordF {
        p.distance(&self.project_point(p))
    }

    /// Whether the point lies on the segment within the given tolerance.
    pub fn contains_point(&self, p: &Point, tolerance: Coord) -> bool {
        self.distance_to_point(p) <= tolerance as CoordF
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_length() {
        let line = Line::new(Point::new(0, 0), Point::new(3000, 4000));
        assert!((line.length() - 5000.0).abs() < 1.0);
    }

    #[test]
    fn test_project_point_middle() {
        let line = Line::new(Point::new(0, 0), Point::new(10_000, 0));
        let proj = line.project_point(&Point::new(5_000, 5_000));
        assert_eq!(proj, Point::new(5_000, 0));
    }

    #[test]
    fn test_project_point_clamps() {
        let line = Line::new(Point::new(0, 0), Point::new(10_000, 0));
        assert_eq!(line.project_point(&Point::new(-5_000, 0)), Point::new(0, 0));
        assert_eq!(
            line.project_point(&Point::new(20_000, 0)),
            Point::new(10_000, 0)
        );
    }

    #[test]
    fn test_contains_point() {
        let line = Line::new(Point::new(0, 0), Point::new(10_000, 0));
        assert!(line.contains_point(&Point::new(5_000, 0), 1));
        assert!(line.contains_point(&Point::new(5_000, 3), 5));
        assert!(!line.contains_point(&Point::new(5_000, 100), 5));
    }
}
