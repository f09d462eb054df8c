//! ExPolygon type for polygons with holes.

use super::{BoundingBox, Point, Polygon};
use crate::{Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A polygon with holes (exterior contour plus interior hole contours).
///
/// The contour is counter-clockwise; holes are clockwise. Boolean operations
/// in [`crate::clipper`] return region sets in this form, one `ExPolygon` per
/// connected component.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExPolygon {
    /// The outer contour of the polygon.
    pub contour: Polygon,
    /// The holes (interior contours) of the polygon.
    pub holes: Vec<Polygon>,
}

impl ExPolygon {
    /// Create a new ExPolygon with only a contour and no holes.
    #[inline]
    pub fn new(contour: Polygon) -> Self {
        Self {
            contour,
            holes: Vec::new(),
        }
    }

    /// Create a new ExPolygon with a contour and holes.
    #[inline]
    pub fn with_holes(contour: Polygon, holes: Vec<Polygon>) -> Self {
        Self { contour, holes }
    }

    /// Check if the ExPolygon is empty (no contour points).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contour.is_empty()
    }

    /// Area of the ExPolygon (contour area minus hole areas).
    pub fn area(&self) -> CoordF {
        let contour_area = self.contour.area();
        let holes_area: CoordF = self.holes.iter().map(|h| h.area()).sum();
        contour_area - holes_area
    }

    /// Bounding box of the ExPolygon (the contour's bounding box).
    #[inline]
    pub fn bounding_box(&self) -> BoundingBox {
        self.contour.bounding_box()
    }

    /// Point-in-region test. With `border_inclusive`, points on the contour or
    /// a hole boundary count as inside.
    pub fn contains(&self, p: &Point, border_inclusive: bool) -> bool {
        const BORDER_TOLERANCE: Coord = 1;

        if border_inclusive && self.contour.is_point_on_boundary(p, BORDER_TOLERANCE) {
            return true;
        }
        if !self.contour.contains_point(p) {
            return false;
        }
        for hole in &self.holes {
            if border_inclusive && hole.is_point_on_boundary(p, BORDER_TOLERANCE) {
                return true;
            }
            if hole.contains_point(p) {
                return false;
            }
        }
        true
    }

    /// Iterate over all boundary rings (contour first, then holes).
    pub fn rings(&self) -> impl Iterator<Item = &Polygon> {
        std::iter::once(&self.contour).chain(self.holes.iter())
    }
}

impl fmt::Debug for ExPolygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExPolygon({} points, {} holes)",
            self.contour.len(),
            self.holes.len()
        )
    }
}

impl From<Polygon> for ExPolygon {
    fn from(contour: Polygon) -> Self {
        Self::new(contour)
    }
}

/// A set of regions, one `ExPolygon` per connected component.
pub type ExPolygons = Vec<ExPolygon>;

/// Point-in-region test over a whole region set.
pub fn expolygons_contain(expolygons: &[ExPolygon], p: &Point, border_inclusive: bool) -> bool {
    expolygons.iter().any(|ex| ex.contains(p, border_inclusive))
}

/// Total area of a region set.
pub fn expolygons_area(expolygons: &[ExPolygon]) -> CoordF {
    expolygons.iter().map(|ex| ex.area()).sum()
}
