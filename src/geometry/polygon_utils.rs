//! Point-versus-region helpers used when routing branch nodes.
//!
//! These operate on region sets (`&[ExPolygon]`) and implement the placement
//! primitives of the node drop: finding the closest boundary point, nudging a
//! point into or out of a region with a bounded move budget, and pushing a
//! point to a prescribed depth inside a region.

use super::expolygon::expolygons_contain;
use super::{ExPolygon, Line, Point};
use crate::Coord;

/// A closest point on a region boundary, together with the boundary segment
/// it lies on.
#[derive(Clone, Copy, Debug)]
pub struct ClosestPolygonPoint {
    pub location: Point,
    pub segment: Line,
}

/// Find the closest point on any boundary ring (contours and holes) of the
/// region set. Returns `None` for an empty set.
pub fn find_closest(p: Point, expolygons: &[ExPolygon]) -> Option<ClosestPolygonPoint> {
    let mut best: Option<ClosestPolygonPoint> = None;
    let mut min_dist = i128::MAX;

    for ex in expolygons {
        for ring in ex.rings() {
            if let Some((location, segment)) = ring.closest_point(&p) {
                let dist = p.distance_squared(&location);
                if dist < min_dist {
                    min_dist = dist;
                    best = Some(ClosestPolygonPoint { location, segment });
                }
            }
        }
    }

    best
}

/// The two candidate positions at `dist` on either side of the boundary at
/// `cpp`. Which one is inside depends on ring orientation, so callers test
/// containment instead of trusting a winding convention.
fn offset_candidates(cpp: &ClosestPolygonPoint, dist: Coord) -> (Point, Point) {
    let dir = cpp.segment.vector().to_f64().normalize();
    let normal = if dir.length_squared() > 0.0 {
        dir.perp()
    } else {
        super::PointF::new(0.0, 1.0)
    };
    let off = Point::new(
        (normal.x * dist as f64).round() as Coord,
        (normal.y * dist as f64).round() as Coord,
    );
    (cpp.location + off, cpp.location - off)
}

/// Move `p` inside the region set if it is not already, without moving
/// farther than `sqrt(max_dist2)`. With `preferred_dist == 0` the point is
/// placed on the boundary itself. Returns whether `p` ends up inside.
pub fn move_inside(
    expolygons: &[ExPolygon],
    p: &mut Point,
    preferred_dist: Coord,
    max_dist2: i128,
) -> bool {
    if expolygons_contain(expolygons, p, true) && preferred_dist == 0 {
        return true;
    }

    let Some(cpp) = find_closest(*p, expolygons) else {
        return false;
    };

    let target = if preferred_dist == 0 {
        cpp.location
    } else {
        let (a, b) = offset_candidates(&cpp, preferred_dist);
        if expolygons_contain(expolygons, &a, true) {
            a
        } else if expolygons_contain(expolygons, &b, true) {
            b
        } else {
            cpp.location
        }
    };

    if p.distance_squared(&target) > max_dist2 {
        return false;
    }
    *p = target;
    true
}

/// Move `p` out of the region set by at least `preferred_dist` if it is
/// inside, without moving farther than `sqrt(max_dist2)`. A point that is
/// already outside is left untouched. Returns whether `p` ends up outside.
pub fn move_outside(
    expolygons: &[ExPolygon],
    p: &mut Point,
    preferred_dist: Coord,
    max_dist2: i128,
) -> bool {
    if !expolygons_contain(expolygons, p, false) {
        return true;
    }

    let Some(cpp) = find_closest(*p, expolygons) else {
        return true;
    };

    let (a, b) = offset_candidates(&cpp, preferred_dist.max(1));
    let target = if !expolygons_contain(expolygons, &a, true) {
        a
    } else if !expolygons_contain(expolygons, &b, true) {
        b
    } else {
        cpp.location
    };

    if p.distance_squared(&target) > max_dist2 {
        return false;
    }
    *p = target;
    !expolygons_contain(expolygons, p, false)
}

/// Ensure `p` sits inside the region set at a depth of `preferred_dist` from
/// the anchor boundary point `cpp`. When the region is too thin for the full
/// depth, the depth is halved until a contained position is found; the anchor
/// itself is the last resort. Returns whether `p` ends up inside.
pub fn ensure_inside(
    expolygons: &[ExPolygon],
    p: &mut Point,
    cpp: &ClosestPolygonPoint,
    preferred_dist: Coord,
) -> bool {
    if expolygons_contain(expolygons, p, true)
        && p.distance_squared(&cpp.location) >= (preferred_dist as i128) * (preferred_dist as i128)
    {
        return true;
    }

    let mut depth = preferred_dist.max(1);
    loop {
        let (a, b) = offset_candidates(cpp, depth);
        if expolygons_contain(expolygons, &a, true) {
            *p = a;
            return true;
        }
        if expolygons_contain(expolygons, &b, true) {
            *p = b;
            return true;
        }
        depth /= 2;
        if depth == 0 {
            break;
        }
    }

    *p = cpp.location;
    expolygons_contain(expolygons, p, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polygon;

    fn square_10mm() -> Vec<ExPolygon> {
        vec![ExPolygon::from(Polygon::rectangle(
            Point::new(0, 0),
            Point::new(10_000, 10_000),
        ))]
    }

    #[test]
    fn test_find_closest() {
        let region = square_10mm();
        let cpp = find_closest(Point::new(5_000, -2_000), &region).unwrap();
        assert_eq!(cpp.location, Point::new(5_000, 0));
    }

    #[test]
    fn test_find_closest_empty() {
        assert!(find_closest(Point::new(0, 0), &[]).is_none());
    }

    #[test]
    fn test_move_inside_from_outside() {
        let region = square_10mm();
        let mut p = Point::new(5_000, -500);
        assert!(move_inside(&region, &mut p, 0, 1_000_000));
        assert_eq!(p, Point::new(5_000, 0));
    }

    #[test]
    fn test_move_inside_too_far() {
        let region = square_10mm();
        let mut p = Point::new(5_000, -5_000);
        let original = p;
        assert!(!move_inside(&region, &mut p, 0, 1_000_000));
        assert_eq!(p, original);
    }

    #[test]
    fn test_move_inside_already_inside() {
        let region = square_10mm();
        let mut p = Point::new(5_000, 5_000);
        assert!(move_inside(&region, &mut p, 0, 100));
        assert_eq!(p, Point::new(5_000, 5_000));
    }

    #[test]
    fn test_move_outside() {
        let region = square_10mm();
        let mut p = Point::new(5_000, 500);
        assert!(move_outside(&region, &mut p, 200, i128::MAX));
        assert!(!region[0].contains(&p, false));
        // Pushed past the nearest border by the margin.
        assert!(p.y <= -100);
    }

    #[test]
    fn test_move_outside_noop_when_outside() {
        let region = square_10mm();
        let mut p = Point::new(5_000, -500);
        assert!(move_outside(&region, &mut p, 200, 100));
        assert_eq!(p, Point::new(5_000, -500));
    }

    #[test]
    fn test_ensure_inside_reaches_depth() {
        let region = square_10mm();
        let cpp = find_closest(Point::new(5_000, -1_000), &region).unwrap();
        let mut p = Point::new(5_000, -1_000);
        assert!(ensure_inside(&region, &mut p, &cpp, 2_000));
        assert!(region[0].contains(&p, true));
        assert!(p.distance_squared(&cpp.location) >= 2_000 * 2_000 - 4);
    }

    #[test]
    fn test_ensure_inside_thin_region_halves_depth() {
        // 0.4mm wide sliver; full depth of 5mm cannot fit.
        let region = vec![ExPolygon::from(Polygon::rectangle(
            Point::new(0, 0),
            Point::new(10_000, 400),
        ))];
        let cpp = find_closest(Point::new(5_000, -300), &region).unwrap();
        let mut p = Point::new(5_000, -300);
        assert!(ensure_inside(&region, &mut p, &cpp, 5_000));
        assert!(region[0].contains(&p, true));
    }
}
