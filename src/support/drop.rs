//! Layer-by-layer descent of the contact-node forest.
//!
//! For each layer from the top down, nodes are grouped by the avoidance
//! component they are stranded in (group 0 is "can still reach the build
//! plate"), connected with a minimum spanning tree per group, merged where the
//! tree brings them within one layer's move budget, and nudged toward their
//! neighbours before being re-projected against the avoidance or
//! internal-guide constraints of the layer below.
//!
//! Layers are inherently serial: each layer's nodes are produced from the
//! layer above.

use crate::config::{SupportType, TreeSupportConfig};
use crate::geometry::{expolygons_contain, polygon_utils, Point};
use crate::support::mst::MinimumSpanningTree;
use crate::support::node::{insert_dropped_node, Node, NodeLayer};
use crate::support::volumes::TreeSupportVolumes;
use crate::support::{progress_total, ProgressSink, PROGRESS_WEIGHT_COLLISION, PROGRESS_WEIGHT_DROPDOWN};
use crate::Coord;
use std::collections::HashSet;

/// Extra move allowance to absorb rounding between radius samples, in scaled
/// units.
const SAMPLE_ROUNDING_MARGIN: Coord = 100;

/// Drop all contact nodes toward the build plate, filling the node sets of
/// every layer below the seeds. Layer 0 is never dropped out of.
pub fn drop_nodes(
    config: &TreeSupportConfig,
    volumes: &TreeSupportVolumes,
    contact_nodes: &mut Vec<NodeLayer>,
    progress: &dyn ProgressSink,
) {
    let layer_count = contact_nodes.len();
    if layer_count < 2 {
        return;
    }

    let maximum_move_distance = config.maximum_move_distance();
    let max_move_sq = (maximum_move_distance as i128) * (maximum_move_distance as i128);
    let support_rests_on_model = config.support_type == SupportType::Everywhere;
    let total = progress_total(volumes.sample_count(), layer_count);

    for layer_nr in (1..layer_count).rev() {
        // Each connected avoidance component is one group; group 0 collects
        // the nodes that can still reach the build plate.
        let parts = volumes.avoidance(0, layer_nr);
        let mut nodes_per_part: Vec<NodeLayer> = vec![NodeLayer::new(); parts.len() + 1];

        for node in contact_nodes[layer_nr].values().copied().collect::<Vec<_>>() {
            if !support_rests_on_model && !node.to_buildplate {
                // Cannot rest on the model and unable to reach the build
                // plate; the node ends here and the overhang above stays
                // unsupported.
                continue;
            }
            if node.to_buildplate || parts.is_empty() {
                nodes_per_part[0].insert(node.position, node);
                continue;
            }

            // A stranded node belongs to the component that contains it, or
            // failing that the one whose boundary is closest. The avoidance
            // is offset by the branch radius, so the component set can differ
            // per node; nearest-boundary grouping still gives every node a
            // home.
            let mut closest_part = 0usize;
            let mut closest_distance_sq = i128::MAX;
            for (part_idx, part) in parts.iter().enumerate() {
                if part.contains(&node.position, true) {
                    closest_part = part_idx;
                    break;
                }
                if let Some(closest) =
                    polygon_utils::find_closest(node.position, std::slice::from_ref(part))
                {
                    let distance_sq = node.position.distance_squared(&closest.location);
                    if distance_sq < closest_distance_sq {
                        closest_distance_sq = distance_sq;
                        closest_part = part_idx;
                    }
                }
            }
            nodes_per_part[closest_part + 1].insert(node.position, node);
        }

        let spanning_trees: Vec<MinimumSpanningTree> = nodes_per_part
            .iter()
            .map(|group| MinimumSpanningTree::new(group.keys().copied().collect()))
            .collect();

        let lower_layer = &mut contact_nodes[layer_nr - 1];

        for (group_index, group) in nodes_per_part.iter_mut().enumerate() {
            let mst = &spanning_trees[group_index];
            let mut to_delete: HashSet<Point> = HashSet::new();

            // Node processing order decides which neighbour absorbs which;
            // sort for run-to-run determinism.
            let mut positions: Vec<Point> = group.keys().copied().collect();
            positions.sort_by_key(|p| (p.x, p.y));

            // First pass: merge nodes that are close together.
            for position in &positions {
                if to_delete.contains(position) {
                    continue;
                }
                let node = group[position];
                let neighbours = mst.adjacent_nodes(position);

                if neighbours.len() == 1
                    && neighbours[0].distance_squared(position) < max_move_sq
                    && mst.adjacent_nodes(&neighbours[0]).len() == 1
                {
                    // Two isolated leaves, very close: both fade and a single
                    // node at their midpoint continues on the next layer.
                    let neighbour_node = group[&neighbours[0]];
                    let distance_to_top =
                        node.distance_to_top.max(neighbour_node.distance_to_top);
                    let roof_layers_below = node
                        .support_roof_layers_below
                        .max(neighbour_node.support_roof_layers_below);
                    let mut next_position = (node.position + neighbours[0]) / 2;

                    let sample =
                        volumes.radius_to_sample(config.branch_radius_at(distance_to_top + 1));
                    constrain_next_position(
                        config,
                        volumes,
                        group_index,
                        sample,
                        layer_nr,
                        node.position,
                        &mut next_position,
                    );

                    let to_buildplate = !expolygons_contain(
                        volumes.avoidance(sample, layer_nr - 1),
                        &next_position,
                        false,
                    );
                    insert_dropped_node(
                        lower_layer,
                        Node::new(
                            next_position,
                            distance_to_top + 1,
                            node.skin_direction,
                            (roof_layers_below - 1).max(-1),
                            to_buildplate,
                        ),
                    );
                    to_delete.insert(node.position);
                    to_delete.insert(neighbours[0]);
                } else if neighbours.len() > 1 {
                    // Absorb all neighbours within one move step into this
                    // node. Collapsing a distant leaf instead would imply a
                    // move beyond the per-layer budget.
                    let mut node = node;
                    let mut absorbed = false;
                    for neighbour in neighbours {
                        if to_delete.contains(neighbour) {
                            continue;
                        }
                        if neighbour.distance_squared(position) < max_move_sq {
                            let neighbour_node = group[neighbour];
                            node.distance_to_top =
                                node.distance_to_top.max(neighbour_node.distance_to_top);
                            node.support_roof_layers_below = node
                                .support_roof_layers_below
                                .max(neighbour_node.support_roof_layers_below);
                            to_delete.insert(*neighbour);
                            absorbed = true;
                        }
                    }
                    if absorbed {
                        group.insert(*position, node);
                    }
                }
            }

            // Second pass: move the remaining nodes toward their neighbours
            // and drop them one layer.
            for position in &positions {
                if to_delete.contains(position) {
                    continue;
                }
                let node = group[position];

                if group_index > 0
                    && expolygons_contain(volumes.collision(0, layer_nr), &node.position, false)
                {
                    // The entire branch would be erased by the X/Y offset if
                    // it sits deeper inside the model than its own radius.
                    let branch_radius_node = config.branch_radius_at(node.distance_to_top);
                    if let Some(to_outside) =
                        polygon_utils::find_closest(node.position, volumes.collision(0, layer_nr))
                    {
                        let depth_sq = node.position.distance_squared(&to_outside.location);
                        if depth_sq >= (branch_radius_node as i128) * (branch_radius_node as i128) {
                            continue;
                        }
                    }
                }

                let neighbours = mst.adjacent_nodes(position);
                let mut next_layer_vertex = node.position;
                if neighbours.len() > 1
                    || (neighbours.len() == 1
                        && neighbours[0].distance_squared(position) >= max_move_sq)
                {
                    // Lean towards the average position of the neighbours;
                    // nodes about to collapse were handled in the first pass.
                    let mut sum_direction = Point::zero();
                    for neighbour in neighbours {
                        sum_direction += *neighbour - node.position;
                    }
                    if sum_direction.length_squared() <= max_move_sq {
                        next_layer_vertex += sum_direction;
                    } else {
                        next_layer_vertex += sum_direction.with_length(maximum_move_distance);
                    }
                }

                let sample =
                    volumes.radius_to_sample(config.branch_radius_at(node.distance_to_top + 1));
                constrain_next_position(
                    config,
                    volumes,
                    group_index,
                    sample,
                    layer_nr,
                    node.position,
                    &mut next_layer_vertex,
                );

                let to_buildplate = !expolygons_contain(
                    volumes.avoidance(sample, layer_nr - 1),
                    &next_layer_vertex,
                    false,
                );
                insert_dropped_node(
                    lower_layer,
                    Node::new(
                        next_layer_vertex,
                        node.distance_to_top + 1,
                        node.skin_direction,
                        (node.support_roof_layers_below - 1).max(-1),
                        to_buildplate,
                    ),
                );
            }
        }

        progress.report(
            volumes.sample_count() * PROGRESS_WEIGHT_COLLISION
                + (layer_count - layer_nr) * PROGRESS_WEIGHT_DROPDOWN,
            total,
        );
    }
}

/// Project a tentative next-layer position against the constraint field of
/// the layer below: plate-bound nodes are pushed out of the avoidance,
/// stranded nodes are pulled into the internal guide corridor.
fn constrain_next_position(
    config: &TreeSupportConfig,
    volumes: &TreeSupportVolumes,
    group_index: usize,
    sample: usize,
    layer_nr: usize,
    origin: Point,
    next_position: &mut Point,
) {
    let maximum_move_distance = config.maximum_move_distance();
    let resolution = config.collision_resolution.max(1);

    if group_index == 0 {
        // The margin absorbs rounding between radius samples.
        let margin = resolution + SAMPLE_ROUNDING_MARGIN;
        let budget = maximum_move_distance.saturating_add(margin);
        polygon_utils::move_outside(
            volumes.avoidance(sample, layer_nr - 1),
            next_position,
            margin,
            (budget as i128) * (budget as i128),
        );
    } else {
        // Stranded: pull the node into the corridor between model and
        // avoidance halo, a bit deeper than it currently sits.
        let guide = volumes.internal_guide(sample, layer_nr - 1);
        let Some(closest_on_border) = polygon_utils::find_closest(origin, guide) else {
            return;
        };
        let current_distance = origin.distance(&closest_on_border.location) as Coord;

        let mut moved_inside = *next_position;
        polygon_utils::ensure_inside(
            guide,
            &mut moved_inside,
            &closest_on_border,
            current_distance.saturating_add(maximum_move_distance),
        );

        let mut difference = moved_inside - origin;
        if difference.length_squared()
            > (maximum_move_distance as i128) * (maximum_move_distance as i128)
        {
            difference = difference.with_length(maximum_move_distance);
        }
        *next_position = origin + difference;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MachineConfig;
    use crate::geometry::{ExPolygon, Polygon};
    use crate::scale;
    use crate::storage::SliceStorage;
    use crate::support::volumes::machine_volume_border;
    use crate::support::NoProgress;

    fn build_volumes(
        config: &TreeSupportConfig,
        layer_outlines: Vec<crate::geometry::ExPolygons>,
    ) -> (TreeSupportVolumes, SliceStorage) {
        let machine = MachineConfig::default();
        let border = machine_volume_border(&machine);
        let storage = SliceStorage::new(layer_outlines, vec![]).unwrap();
        let volumes = TreeSupportVolumes::build(config, &storage, &border, &NoProgress);
        (volumes, storage)
    }

    fn node_at_mm(x: f64, y: f64) -> Node {
        Node::new(Point::new_scale(x, y), 0, false, -1, true)
    }

    #[test]
    fn test_single_node_forms_column() {
        let config = TreeSupportConfig {
            enabled: true,
            ..Default::default()
        };
        let layers = 10;
        let (volumes, _storage) = build_volumes(&config, vec![vec![]; layers]);

        let mut contact_nodes = vec![NodeLayer::new(); layers];
        let seed = node_at_mm(100.0, 100.0);
        contact_nodes[9].insert(seed.position, seed);

        drop_nodes(&config, &volumes, &mut contact_nodes, &NoProgress);

        // One node per layer, all at the seed position; distance to top
        // increases on the way down.
        for layer_nr in 0..layers {
            assert_eq!(contact_nodes[layer_nr].len(), 1, "layer {}", layer_nr);
            let node = contact_nodes[layer_nr].values().next().unwrap();
            assert_eq!(node.position, seed.position);
            assert_eq!(node.distance_to_top as usize, 9 - layer_nr);
        }
    }

    #[test]
    fn test_two_leaves_collapse_to_midpoint() {
        let config = TreeSupportConfig {
            enabled: true,
            angle: 60f64.to_radians(),
            ..Default::default()
        };
        let max_move = config.maximum_move_distance();
        let layers = 6;
        let (volumes, _storage) = build_volumes(&config, vec![vec![]; layers]);

        // Two isolated leaves just inside the collapse distance.
        let left = Node::new(Point::new(scale(100.0) - max_move / 4, scale(100.0)), 0, false, -1, true);
        let right = Node::new(Point::new(scale(100.0) + max_move / 4, scale(100.0)), 2, false, -1, true);
        let mut contact_nodes = vec![NodeLayer::new(); layers];
        contact_nodes[5].insert(left.position, left);
        contact_nodes[5].insert(right.position, right);

        drop_nodes(&config, &volumes, &mut contact_nodes, &NoProgress);

        assert_eq!(contact_nodes[4].len(), 1);
        let merged = contact_nodes[4].values().next().unwrap();
        assert_eq!(merged.position, Point::new(scale(100.0), scale(100.0)));
        // The junction carries the larger parent history plus the drop.
        assert_eq!(merged.distance_to_top, 3);
    }

    #[test]
    fn test_distant_leaves_approach_but_do_not_teleport() {
        let config = TreeSupportConfig {
            enabled: true,
            ..Default::default()
        };
        let max_move = config.maximum_move_distance();
        let layers = 4;
        let (volumes, _storage) = build_volumes(&config, vec![vec![]; layers]);

        let gap = max_move * 6;
        let left = Node::new(Point::new(scale(100.0) - gap / 2, scale(100.0)), 0, false, -1, true);
        let right = Node::new(Point::new(scale(100.0) + gap / 2, scale(100.0)), 0, false, -1, true);
        let mut contact_nodes = vec![NodeLayer::new(); layers];
        contact_nodes[3].insert(left.position, left);
        contact_nodes[3].insert(right.position, right);

        drop_nodes(&config, &volumes, &mut contact_nodes, &NoProgress);

        // Still two nodes a layer down, each one move step closer.
        assert_eq!(contact_nodes[2].len(), 2);
        for node in contact_nodes[2].values() {
            let distance_from_centre =
                (node.position.x - scale(100.0)).abs();
            assert!(distance_from_centre <= gap / 2 - max_move + 2);
            assert!(distance_from_centre >= gap / 2 - max_move - 2);
        }
    }

    #[test]
    fn test_move_bound_holds_for_every_drop() {
        let config = TreeSupportConfig {
            enabled: true,
            ..Default::default()
        };
        let layers = 12;
        // A solid block under part of the trajectory forces real avoidance.
        let block = ExPolygon::from(Polygon::rectangle(
            Point::new_scale(95.0, 95.0),
            Point::new_scale(105.0, 105.0),
        ));
        let mut outlines = vec![vec![block]; 8];
        outlines.extend(vec![vec![]; 4]);
        let (volumes, _storage) = build_volumes(&config, outlines);

        let mut contact_nodes = vec![NodeLayer::new(); layers];
        let seed = node_at_mm(110.0, 100.0);
        contact_nodes[11].insert(seed.position, seed);

        drop_nodes(&config, &volumes, &mut contact_nodes, &NoProgress);

        let bound = config.maximum_move_distance() + config.collision_resolution + 100;
        let bound_sq = (bound as i128) * (bound as i128);
        for layer_nr in (1..layers).rev() {
            for parent in contact_nodes[layer_nr].values() {
                // Every child on the layer below must be within the bound of
                // some parent.
                if contact_nodes[layer_nr - 1].is_empty() {
                    continue;
                }
                let nearest = contact_nodes[layer_nr - 1]
                    .values()
                    .map(|child| parent.position.distance_squared(&child.position))
                    .min()
                    .unwrap();
                assert!(
                    nearest <= bound_sq,
                    "drop from layer {} exceeded the move bound",
                    layer_nr
                );
            }
        }
    }

    #[test]
    fn test_buildplate_only_drops_stranded_nodes() {
        let config = TreeSupportConfig {
            enabled: true,
            support_type: SupportType::BuildplateOnly,
            ..Default::default()
        };
        let layers = 4;
        let (volumes, _storage) = build_volumes(&config, vec![vec![]; layers]);

        let mut stranded = node_at_mm(100.0, 100.0);
        stranded.to_buildplate = false;
        let mut contact_nodes = vec![NodeLayer::new(); layers];
        contact_nodes[3].insert(stranded.position, stranded);

        drop_nodes(&config, &volumes, &mut contact_nodes, &NoProgress);

        // The stranded node produces no children.
        assert!(contact_nodes[2].is_empty());
        assert!(contact_nodes[1].is_empty());
    }

    #[test]
    fn test_roof_counter_decrements_and_clamps() {
        let config = TreeSupportConfig {
            enabled: true,
            roof_enable: true,
            roof_height: scale(0.4),
            ..Default::default()
        };
        let layers = 8;
        let (volumes, _storage) = build_volumes(&config, vec![vec![]; layers]);

        let seed = Node::new(Point::new_scale(100.0, 100.0), 0, false, 2, true);
        let mut contact_nodes = vec![NodeLayer::new(); layers];
        contact_nodes[7].insert(seed.position, seed);

        drop_nodes(&config, &volumes, &mut contact_nodes, &NoProgress);

        assert_eq!(contact_nodes[6].values().next().unwrap().support_roof_layers_below, 1);
        assert_eq!(contact_nodes[5].values().next().unwrap().support_roof_layers_below, 0);
        assert_eq!(contact_nodes[4].values().next().unwrap().support_roof_layers_below, -1);
        // Clamped: long branches do not decrement without bound.
        assert_eq!(contact_nodes[1].values().next().unwrap().support_roof_layers_below, -1);
    }
}
