//! Contact-point seeding: sampling branch tops inside overhang regions.
//!
//! Candidate positions come from one grid per mesh, laid out in a frame
//! rotated by 22 degrees so the pattern runs oblique to the axes and covers
//! diagonal overhangs evenly. Every connected overhang component receives at
//! least one node; components the grid misses fall back to a single
//! centre-derived point.

use crate::config::TreeSupportConfig;
use crate::geometry::{expolygons_contain, polygon_utils, BoundingBox, ExPolygon, ExPolygons, Point};
use crate::storage::MeshStorage;
use crate::support::node::{Node, NodeLayer};
use crate::{Coord, CoordF};

/// Rotation of the candidate grid. Oblique to the axes for better coverage of
/// diagonal overhang edges.
const GRID_ROTATE_ANGLE: CoordF = 22.0 / 180.0 * std::f64::consts::PI;

/// Seed contact nodes for one mesh into the per-layer node sets.
///
/// `collision` is the zero-radius collision field, indexed by layer like
/// `contact_nodes`.
pub fn generate_contact_points(
    config: &TreeSupportConfig,
    mesh: &MeshStorage,
    collision: &[ExPolygons],
    contact_nodes: &mut [NodeLayer],
) {
    // One grid covers every overhang of the mesh.
    let mut bounding_box = BoundingBox::new();
    for layer in &mesh.overhang_areas {
        for part in layer {
            bounding_box.merge(&part.bounding_box());
        }
    }
    if !bounding_box.is_defined() {
        return;
    }
    let grid_points = rotated_grid(&bounding_box, config.branch_distance.max(1));

    let z_distance_top_layers = config.z_top_layers();
    let support_roof_layers = config.roof_layers() as i32;
    let half_overhang_distance =
        (config.support_angle.tan() * config.layer_height as CoordF / 2.0) as Coord;
    let half_overhang_distance_sq =
        (half_overhang_distance as i128) * (half_overhang_distance as i128);

    let last_layer = mesh
        .overhang_areas
        .len()
        .saturating_sub(z_distance_top_layers);
    for layer_nr in 1..last_layer {
        let overhang = &mesh.overhang_areas[layer_nr + z_distance_top_layers];
        if overhang.is_empty() {
            continue;
        }

        for overhang_part in overhang {
            // The AABB pre-filter admits points within half an overhang step
            // of the component, so contacts on constant surfaces do not fall
            // between neighbouring overhang areas.
            let mut overhang_bounds = overhang_part.bounding_box();
            overhang_bounds.expand(half_overhang_distance);

            let mut added = false;
            for grid_point in &grid_points {
                if !overhang_bounds.contains_point(grid_point) {
                    continue;
                }
                let mut candidate = *grid_point;
                polygon_utils::move_inside(
                    std::slice::from_ref(overhang_part),
                    &mut candidate,
                    0,
                    half_overhang_distance_sq,
                );
                if overhang_part.contains(&candidate, true)
                    && !expolygons_contain(&collision[layer_nr], &candidate, true)
                {
                    let node = Node::new(
                        candidate,
                        0,
                        (layer_nr + z_distance_top_layers) % 2 == 1,
                        support_roof_layers,
                        true,
                    );
                    contact_nodes[layer_nr].entry(candidate).or_insert(node);
                    added = true;
                }
            }

            if !added {
                // The grid missed this component; seed its centre so loose
                // parts are supported too.
                let candidate = fallback_contact_point(overhang_part);
                let node = Node::new(
                    candidate,
                    0,
                    layer_nr % 2 == 1,
                    support_roof_layers,
                    true,
                );
                contact_nodes[layer_nr].entry(candidate).or_insert(node);
            }
        }
    }
}

/// Candidate grid with the configured spacing, rotated 22 degrees about the
/// lower-left corner of `bounding_box` and large enough to cover it.
fn rotated_grid(bounding_box: &BoundingBox, point_spread: Coord) -> Vec<Point> {
    // Working relative to the lower-left corner, take the AABB of the
    // rotated-back box corners, so the oblique grid covers every point whose
    // rotated pre-image lies in the original box.
    let size = bounding_box.size();
    let mut rotated = BoundingBox::new();
    rotated.merge_point(Point::zero());
    rotated.merge_point(size.rotate(-GRID_ROTATE_ANGLE));
    rotated.merge_point(Point::new(0, size.y).rotate(-GRID_ROTATE_ANGLE));
    rotated.merge_point(Point::new(size.x, 0).rotate(-GRID_ROTATE_ANGLE));

    let mut cover = BoundingBox::new();
    cover.merge_point(rotated.min.rotate(GRID_ROTATE_ANGLE));
    cover.merge_point(rotated.max.rotate(GRID_ROTATE_ANGLE));
    cover.merge_point(Point::new(rotated.min.x, rotated.max.y).rotate(GRID_ROTATE_ANGLE));
    cover.merge_point(Point::new(rotated.max.x, rotated.min.y).rotate(GRID_ROTATE_ANGLE));

    let mut grid_points = Vec::new();
    let mut x = cover.min.x;
    while x <= cover.max.x {
        let mut y = cover.min.y;
        while y <= cover.max.y {
            grid_points.push(Point::new(x, y).rotate(GRID_ROTATE_ANGLE) + bounding_box.min);
            y += point_spread;
        }
        x += point_spread;
    }
    grid_points
}

/// Centre-derived contact point for a component no grid point landed in.
fn fallback_contact_point(overhang_part: &ExPolygon) -> Point {
    let mut candidate = overhang_part.bounding_box().center();
    polygon_utils::move_inside(
        std::slice::from_ref(overhang_part),
        &mut candidate,
        0,
        i128::MAX,
    );
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{ExPolygons, Polygon};
    use crate::scale;

    fn config() -> TreeSupportConfig {
        TreeSupportConfig {
            enabled: true,
            branch_distance: scale(1.0),
            top_distance: scale(0.2),
            layer_height: scale(0.2),
            ..Default::default()
        }
    }

    fn seed(
        config: &TreeSupportConfig,
        overhangs: Vec<ExPolygons>,
        collision: Vec<ExPolygons>,
    ) -> Vec<NodeLayer> {
        let mut contact_nodes = vec![NodeLayer::new(); overhangs.len()];
        let mesh = MeshStorage {
            overhang_areas: overhangs,
            tree_support_enabled: true,
        };
        generate_contact_points(config, &mesh, &collision, &mut contact_nodes);
        contact_nodes
    }

    #[test]
    fn test_rotated_grid_covers_box() {
        let bb = BoundingBox::from_points_minmax(Point::zero(), Point::new_scale(10.0, 10.0));
        let points = rotated_grid(&bb, scale(1.0));
        // Every cell of the box must have a candidate nearby.
        assert!(points.len() > 80);
        let inside = points.iter().filter(|p| bb.contains_point(p)).count();
        assert!(inside > 60);
    }

    #[test]
    fn test_seeds_inside_overhang_and_outside_collision() {
        let config = config();
        let layers = 8;
        let overhang = ExPolygon::from(Polygon::rectangle(
            Point::new_scale(20.0, 20.0),
            Point::new_scale(30.0, 30.0),
        ));
        let mut overhangs: Vec<ExPolygons> = vec![vec![]; layers];
        overhangs[5] = vec![overhang.clone()];
        let collision: Vec<ExPolygons> = vec![vec![]; layers];

        let nodes = seed(&config, overhangs, collision);

        // z_top_layers = ceil(0.2/0.2) + 1 = 2 layers below the overhang.
        let seeded_layer = 3;
        assert!(!nodes[seeded_layer].is_empty());
        for (layer_nr, layer) in nodes.iter().enumerate() {
            if layer_nr != seeded_layer {
                assert!(layer.is_empty(), "unexpected nodes on layer {}", layer_nr);
            }
        }
        for node in nodes[seeded_layer].values() {
            assert!(overhang.contains(&node.position, true));
            assert_eq!(node.distance_to_top, 0);
            assert!(node.to_buildplate);
            assert_eq!(node.skin_direction, (seeded_layer + 2) % 2 == 1);
        }
    }

    #[test]
    fn test_seeds_avoid_collision() {
        let config = config();
        let layers = 8;
        let overhang = ExPolygon::from(Polygon::rectangle(
            Point::new_scale(20.0, 20.0),
            Point::new_scale(30.0, 30.0),
        ));
        let mut overhangs: Vec<ExPolygons> = vec![vec![]; layers];
        overhangs[5] = vec![overhang];
        // The left half of the overhang is blocked.
        let blocked = ExPolygon::from(Polygon::rectangle(
            Point::new_scale(15.0, 15.0),
            Point::new_scale(25.0, 35.0),
        ));
        let collision: Vec<ExPolygons> = vec![vec![blocked.clone()]; layers];

        let nodes = seed(&config, overhangs, collision);
        assert!(!nodes[3].is_empty());
        for node in nodes[3].values() {
            assert!(!blocked.contains(&node.position, true));
        }
    }

    #[test]
    fn test_small_component_gets_fallback_seed() {
        let config = config();
        let layers = 8;
        // Far smaller than the grid spacing and positioned to dodge it.
        let tiny = ExPolygon::from(Polygon::rectangle(
            Point::new(scale(20.0) + 137, scale(20.0) + 211),
            Point::new(scale(20.0) + 337, scale(20.0) + 411),
        ));
        let mut overhangs: Vec<ExPolygons> = vec![vec![]; layers];
        overhangs[5] = vec![tiny.clone()];
        let collision: Vec<ExPolygons> = vec![vec![]; layers];

        let nodes = seed(&config, overhangs, collision);
        assert!(!nodes[3].is_empty());
        for node in nodes[3].values() {
            assert!(tiny.contains(&node.position, true));
        }
    }

    #[test]
    fn test_no_overhangs_no_seeds() {
        let config = config();
        let nodes = seed(&config, vec![vec![]; 6], vec![vec![]; 6]);
        assert!(nodes.iter().all(NodeLayer::is_empty));
    }

    #[test]
    fn test_overhang_too_high_for_top_clearance() {
        let config = config();
        // Overhang in the top z_top_layers cannot seed (no room below).
        let mut overhangs: Vec<ExPolygons> = vec![vec![]; 6];
        overhangs[5] = vec![ExPolygon::from(Polygon::rectangle(
            Point::new_scale(0.0, 0.0),
            Point::new_scale(5.0, 5.0),
        ))];
        // Seeding layer would be 3; but also place one so high its support
        // layer index would be negative.
        overhangs[1] = vec![ExPolygon::from(Polygon::rectangle(
            Point::new_scale(10.0, 10.0),
            Point::new_scale(15.0, 15.0),
        ))];
        let nodes = seed(&config, overhangs, vec![vec![]; 6]);
        // overhang_areas[1] would need nodes at layer -1; none are created
        // anywhere below layer 1.
        assert!(nodes[0].is_empty());
    }
}
