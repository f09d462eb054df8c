//! Circle rasterisation: turning the node forest into per-layer support
//! areas.
//!
//! Every node stamps a regular polygon sized by its distance to the contact
//! point: sheared into a rhombus over the tip layers (alternating orientation
//! per layer for a sturdier tip), widening by the diameter angle below them.
//! The stamps are unioned per layer, split into roof and ordinary support,
//! trimmed against the model with vertical clearance, and optionally carved
//! into floor interfaces. Layers are independent, so this stage fans out over
//! the layer axis.

use crate::clipper::{self, OffsetJoinType};
use crate::config::{div_round_up, TreeSupportConfig};
use crate::geometry::{ExPolygons, Point, Polygon};
use crate::storage::{SliceStorage, SupportInfillPart, SupportLayer};
use crate::support::node::{Node, NodeLayer};
use crate::support::volumes::TreeSupportVolumes;
use crate::support::{
    progress_total, ProgressSink, PROGRESS_WEIGHT_AREAS, PROGRESS_WEIGHT_COLLISION,
    PROGRESS_WEIGHT_DROPDOWN,
};
use crate::{Coord, CoordF};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Vertex count of a stamped branch circle.
pub const CIRCLE_RESOLUTION: usize = 10;

/// Offset applied to floor areas before subtracting them from support, so the
/// two never touch line-on-line.
const FLOOR_CLEARANCE: Coord = 10;

/// Rasterise the dropped node forest into the support storage. Fills
/// `support_infill_parts`, `support_roof` and `support_bottom` per layer,
/// and raises `layer_nr_max_filled_layer`.
pub fn draw_circles(
    config: &TreeSupportConfig,
    volumes: &TreeSupportVolumes,
    storage: &mut SliceStorage,
    contact_nodes: &[NodeLayer],
    progress: &dyn ProgressSink,
) {
    let layer_count = contact_nodes.len();
    let branch_radius = config.branch_radius();
    // Pre-generate a circle with the base branch radius so the per-node
    // transforms reduce to a handful of multiplications.
    let branch_circle = Polygon::regular(CIRCLE_RESOLUTION, branch_radius);
    let circle_side_length = (2.0
        * branch_radius as CoordF
        * (std::f64::consts::PI / CIRCLE_RESOLUTION as CoordF).sin()) as Coord;

    let tip_layers = config.tip_layers();
    let diameter_angle_scale_factor = config.diameter_angle_scale_factor();
    let z_distance_bottom_layers = config.z_bottom_layers();
    let line_width = config.line_width;
    let wall_count = config.wall_count;
    let total = progress_total(volumes.sample_count(), layer_count);
    let completed = AtomicUsize::new(0);

    let layer_outlines = &storage.layer_outlines;
    let layers: Vec<SupportLayer> = (0..layer_count)
        .into_par_iter()
        .map(|layer_nr| {
            let mut support_circles: ExPolygons = Vec::new();
            let mut roof_circles: ExPolygons = Vec::new();

            for node in contact_nodes[layer_nr].values() {
                let circle = stamp_circle(config, &branch_circle, tip_layers, node);
                if node.is_roof() {
                    roof_circles.push(circle.into());
                } else {
                    support_circles.push(circle.into());
                }
            }

            let mut support_layer = clipper::union_all(&support_circles);
            let mut roof_layer = clipper::union_all(&roof_circles);
            support_layer = clipper::difference(&support_layer, &roof_layer);

            // Subtract the model itself with vertical clearance; sample 0 has
            // zero branch width but the proper X/Y offset.
            let z_collision_layer =
                (layer_nr as i64 - z_distance_bottom_layers as i64 + 1).max(0) as usize;
            if volumes.layer_count() > z_collision_layer {
                support_layer =
                    clipper::difference(&support_layer, volumes.collision(0, z_collision_layer));
                roof_layer =
                    clipper::difference(&roof_layer, volumes.collision(0, z_collision_layer));
            }

            // Smooth as much as possible without touching an individual
            // circle: branches low in the print are thicker, so more
            // deviation is allowed there. A quarter line width keeps stacked
            // lines printable.
            let diameter_scale_this_layer = ((layer_count as i64
                - layer_nr as i64
                - tip_layers as i64) as CoordF
                * diameter_angle_scale_factor)
                .max(0.0);
            support_layer = clipper::simplify(
                &support_layer,
                (circle_side_length as CoordF * (1.0 + diameter_scale_this_layer)) as Coord,
                line_width / 4,
            );

            let mut floor_layer: ExPolygons = Vec::new();
            if config.bottom_enable {
                let skip_layers =
                    div_round_up(config.interface_skip_height, config.layer_height).max(1);
                let bottom_height_layers = div_round_up(config.bottom_height, config.layer_height);

                let mut samples: Vec<usize> = (0..bottom_height_layers)
                    .step_by(skip_layers)
                    .collect();
                samples.push(bottom_height_layers);
                for layers_below in samples {
                    let sample_layer = (layer_nr as i64
                        - layers_below as i64
                        - z_distance_bottom_layers as i64)
                        .max(0) as usize;
                    floor_layer.extend(clipper::intersection(
                        &support_layer,
                        &layer_outlines[sample_layer],
                    ));
                }
                floor_layer = clipper::union_all(&floor_layer);
                if !floor_layer.is_empty() {
                    support_layer = clipper::difference(
                        &support_layer,
                        &clipper::offset(&floor_layer, FLOOR_CLEARANCE, OffsetJoinType::Miter),
                    );
                }
            }

            let layer = SupportLayer {
                support_infill_parts: support_layer
                    .into_iter()
                    .map(|outline| SupportInfillPart {
                        outline,
                        line_width,
                        wall_count,
                    })
                    .collect(),
                support_roof: roof_layer,
                support_bottom: floor_layer,
            };

            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            progress.report(
                volumes.sample_count() * PROGRESS_WEIGHT_COLLISION
                    + layer_count * PROGRESS_WEIGHT_DROPDOWN
                    + done * PROGRESS_WEIGHT_AREAS,
                total,
            );
            layer
        })
        .collect();

    let mut max_filled_layer = -1i32;
    for (layer_nr, layer) in layers.iter().enumerate() {
        if !layer.support_infill_parts.is_empty()
            || !layer.support_roof.is_empty()
            || !layer.support_bottom.is_empty()
        {
            max_filled_layer = max_filled_layer.max(layer_nr as i32);
        }
    }

    storage.support.layers = layers;
    storage.support.layer_nr_max_filled_layer = storage
        .support
        .layer_nr_max_filled_layer
        .max(max_filled_layer);
}

/// Stamp the canonical circle for one node: a sheared rhombus opening toward
/// the full circle over the tip layers, an isotropically widened circle past
/// them.
fn stamp_circle(
    config: &TreeSupportConfig,
    branch_circle: &Polygon,
    tip_layers: usize,
    node: &Node,
) -> Polygon {
    let mut circle = Polygon::new();
    for corner in branch_circle.points() {
        let corner = if (node.distance_to_top as usize) < tip_layers {
            let s = (node.distance_to_top + 1) as CoordF / tip_layers as CoordF;
            let x = corner.x as CoordF;
            let y = corner.y as CoordF;
            if node.skin_direction {
                Point::new(
                    (x * (0.5 + s / 2.0) + y * (0.5 - s / 2.0)) as Coord,
                    (x * (0.5 - s / 2.0) + y * (0.5 + s / 2.0)) as Coord,
                )
            } else {
                Point::new(
                    (x * (0.5 + s / 2.0) - y * (0.5 - s / 2.0)) as Coord,
                    (x * (-0.5 + s / 2.0) + y * (0.5 + s / 2.0)) as Coord,
                )
            }
        } else {
            let widen = 1.0
                + (node.distance_to_top as usize - tip_layers) as CoordF
                    * config.diameter_angle_scale_factor();
            Point::new(
                (corner.x as CoordF * widen) as Coord,
                (corner.y as CoordF * widen) as Coord,
            )
        };
        circle.push(node.position + corner);
    }
    circle
}
