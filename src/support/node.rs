//! Branch vertex bookkeeping for the node drop.

use crate::geometry::Point;
use std::collections::HashMap;

/// A branch vertex on a specific layer.
///
/// A node's identity is its position: the per-layer node sets are maps keyed
/// by position, and two branches that descend onto the same point fuse by
/// merging metadata (see [`insert_dropped_node`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Node {
    /// Position of this node on its layer.
    pub position: Point,
    /// Number of layers this node lies below its contact point. Zero at a
    /// freshly seeded contact.
    pub distance_to_top: u32,
    /// Which of the two tip orientations this branch uses; alternates per
    /// layer so consecutive tip rhombi cross each other.
    pub skin_direction: bool,
    /// How many further layers this node counts as roof interface. Negative
    /// means ordinary support.
    pub support_roof_layers_below: i32,
    /// Whether a collision-free path to the build plate is still believed
    /// possible.
    pub to_buildplate: bool,
}

impl Node {
    pub fn new(
        position: Point,
        distance_to_top: u32,
        skin_direction: bool,
        support_roof_layers_below: i32,
        to_buildplate: bool,
    ) -> Self {
        Self {
            position,
            distance_to_top,
            skin_direction,
            support_roof_layers_below,
            to_buildplate,
        }
    }

    /// Whether this node still counts as roof interface.
    #[inline]
    pub fn is_roof(&self) -> bool {
        self.support_roof_layers_below >= 0
    }
}

/// The node set of one layer, keyed by position.
pub type NodeLayer = HashMap<Point, Node>;

/// Insert a node produced by the drop into a layer's node set. When a node at
/// that position already exists the two branches fuse: the element-wise
/// maximum of `distance_to_top` and `support_roof_layers_below` wins, so the
/// older branch's history carries on.
pub fn insert_dropped_node(nodes_layer: &mut NodeLayer, node: Node) {
    match nodes_layer.get_mut(&node.position) {
        None => {
            nodes_layer.insert(node.position, node);
        }
        Some(conflicting) => {
            conflicting.distance_to_top = conflicting.distance_to_top.max(node.distance_to_top);
            conflicting.support_roof_layers_below = conflicting
                .support_roof_layers_below
                .max(node.support_roof_layers_below);
        }
    }
}
