//! 2D geometry primitives for support generation.
//!
//! All types use scaled integer coordinates (one unit = one micrometre) so
//! that repeated boolean and offset operations stay exact. Squared distances
//! are computed in 128-bit arithmetic because coordinates span whole build
//! plates.

mod bounding_box;
mod expolygon;
mod line;
mod point;
mod polygon;
pub mod polygon_utils;

pub use bounding_box::BoundingBox;
pub use expolygon::{expolygons_area, expolygons_contain, ExPolygon, ExPolygons};
pub use line::Line;
pub use point::{Point, PointF, Points};
pub use polygon::{Polygon, Polygons};
pub use polygon_utils::{ensure_inside, find_closest, move_inside, move_outside, ClosestPolygonPoint};
