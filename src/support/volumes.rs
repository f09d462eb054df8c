//! Pre-computed collision, avoidance and internal-guide fields.
//!
//! For every sampled branch radius and every layer, three read-only region
//! tables answer the drop's placement queries:
//!
//! - **collision**: where a branch of that radius may not be;
//! - **avoidance**: from where a branch can no longer descend to the build
//!   plate at the configured lateral speed;
//! - **internal guide**: `avoidance \ collision`, the corridor just outside
//!   the model used to route branches that rest on it.
//!
//! The tables are built once per invocation and only read afterwards; the
//! per-sample columns are independent, so construction fans out over the
//! radius axis.

use crate::clipper::{self, OffsetJoinType};
use crate::config::{MachineConfig, MachineShape, TreeSupportConfig};
use crate::geometry::{ExPolygon, ExPolygons, Point, Polygon};
use crate::storage::SliceStorage;
use crate::support::{progress_total, ProgressSink, PROGRESS_WEIGHT_COLLISION};
use crate::{Coord, CoordF};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Vertex count of the elliptic build plate approximation.
const ELLIPSE_RESOLUTION: usize = 50;

/// Length below which repeated insets leave micrometre zigzag segments that
/// the avoidance propagation smooths away.
const SMOOTH_REMOVE_LENGTH: Coord = 5;

/// Build the region outside the printable area, as a ring around the (inset)
/// build plate border. Adding it to per-layer collision keeps branches from
/// wandering off the plate.
pub fn machine_volume_border(machine: &MachineConfig) -> ExPolygons {
    let actual_border = match machine.shape {
        MachineShape::Elliptic => {
            // Approximate the build volume with an ellipse in the XY bounds.
            let middle = machine.size.center();
            let width = machine.size.width();
            let depth = machine.size.height();
            let mut border = Polygon::new();
            for i in 0..ELLIPSE_RESOLUTION {
                let angle = std::f64::consts::TAU * i as CoordF / ELLIPSE_RESOLUTION as CoordF;
                border.push(Point::new(
                    middle.x + (angle.cos() * width as CoordF / 2.0) as Coord,
                    middle.y + (angle.sin() * depth as CoordF / 2.0) as Coord,
                ));
            }
            border
        }
        MachineShape::Rectangular => Polygon::rectangle(machine.size.min, machine.size.max),
    };

    // Make room for the platform adhesion around support.
    let adhesion_size = machine.adhesion_size();
    let inset = if adhesion_size > 0 {
        clipper::offset(
            &[ExPolygon::from(actual_border)],
            -adhesion_size,
            OffsetJoinType::Miter,
        )
    } else {
        vec![ExPolygon::from(actual_border)]
    };

    // A 1m band around the printable area; anything outside the plate falls
    // in this ring.
    let outer = clipper::offset(&inset, crate::scale(1000.0), OffsetJoinType::Miter);
    clipper::difference(&outer, &inset)
}

/// The three radius-and-layer-indexed region tables used by the node drop.
#[derive(Debug)]
pub struct TreeSupportVolumes {
    /// `collision[sample][layer]`: regions branches of the sampled radius
    /// must avoid.
    collision: Vec<Vec<ExPolygons>>,
    /// `avoidance[sample][layer]`: regions from which the build plate is
    /// unreachable.
    avoidance: Vec<Vec<ExPolygons>>,
    /// `internal_guide[sample][layer] = avoidance \ collision`.
    internal_guide: Vec<Vec<ExPolygons>>,
    radius_sample_resolution: Coord,
}

impl TreeSupportVolumes {
    /// Build all three tables for the sliced model.
    pub fn build(
        config: &TreeSupportConfig,
        storage: &SliceStorage,
        machine_volume_border: &ExPolygons,
        progress: &dyn ProgressSink,
    ) -> Self {
        let layer_count = storage.layer_count();
        let branch_radius = config.branch_radius();
        let maximum_radius = branch_radius
            + (layer_count as CoordF
                * branch_radius as CoordF
                * config.diameter_angle_scale_factor()) as Coord;
        let resolution = config.collision_resolution.max(1);
        let sample_count = (maximum_radius as CoordF / resolution as CoordF).ceil() as usize + 1;
        let total = progress_total(sample_count, layer_count);

        log::debug!(
            "building tree support volumes: {} radius samples x {} layers",
            sample_count,
            layer_count
        );

        let xy_distance = config.xy_distance;
        let completed = AtomicUsize::new(0);
        let collision: Vec<Vec<ExPolygons>> = (0..sample_count)
            .into_par_iter()
            .map(|sample| {
                let radius = sample as Coord * resolution;
                let per_layer: Vec<ExPolygons> = (0..layer_count)
                    .map(|layer_nr| {
                        let blocked =
                            clipper::union(storage.layer_outlines(layer_nr), machine_volume_border);
                        // Enough space to avoid the sampled width of the branch.
                        clipper::offset(&blocked, xy_distance + radius, OffsetJoinType::Round)
                    })
                    .collect();
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                progress.report((done / 2) * PROGRESS_WEIGHT_COLLISION, total);
                per_layer
            })
            .collect();

        let maximum_move_distance = config.maximum_move_distance();
        let completed = AtomicUsize::new(0);
        let avoidance: Vec<Vec<ExPolygons>> = collision
            .par_iter()
            .map(|collision_column| {
                let mut per_layer: Vec<ExPolygons> = Vec::with_capacity(layer_count);
                if layer_count > 0 {
                    per_layer.push(collision_column[0].clone());
                }
                for layer_nr in 1..layer_count {
                    // Inset the previous layer by the move distance a branch
                    // may spend on this step; what remains is still
                    // unreachable.
                    let previous = clipper::offset(
                        &per_layer[layer_nr - 1],
                        -maximum_move_distance,
                        OffsetJoinType::Miter,
                    );
                    let previous = clipper::smooth(&previous, SMOOTH_REMOVE_LENGTH);
                    per_layer.push(clipper::union(&previous, &collision_column[layer_nr]));
                }
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                progress.report(
                    (sample_count / 2 + done / 2) * PROGRESS_WEIGHT_COLLISION,
                    total,
                );
                per_layer
            })
            .collect();

        let internal_guide: Vec<Vec<ExPolygons>> = avoidance
            .par_iter()
            .zip(collision.par_iter())
            .map(|(avoidance_column, collision_column)| {
                (0..layer_count)
                    .map(|layer_nr| {
                        clipper::difference(&avoidance_column[layer_nr], &collision_column[layer_nr])
                    })
                    .collect()
            })
            .collect();

        Self {
            collision,
            avoidance,
            internal_guide,
            radius_sample_resolution: resolution,
        }
    }

    /// Number of radius samples.
    #[inline]
    pub fn sample_count(&self) -> usize {
        self.collision.len()
    }

    /// Number of layers.
    #[inline]
    pub fn layer_count(&self) -> usize {
        self.collision.first().map_or(0, Vec::len)
    }

    /// The radius sample a branch of the given radius occupies.
    pub fn radius_to_sample(&self, radius: Coord) -> usize {
        let sample =
            (radius as CoordF / self.radius_sample_resolution as CoordF).round() as usize;
        sample.min(self.sample_count().saturating_sub(1))
    }

    /// Forbidden region for the given radius sample at a layer.
    pub fn collision(&self, sample: usize, layer_nr: usize) -> &ExPolygons {
        &self.collision[sample.min(self.sample_count() - 1)][layer_nr]
    }

    /// All layers of the forbidden region for one radius sample.
    pub fn collision_layers(&self, sample: usize) -> &[ExPolygons] {
        &self.collision[sample.min(self.sample_count() - 1)]
    }

    /// Plate-unreachable region for the given radius sample at a layer.
    pub fn avoidance(&self, sample: usize, layer_nr: usize) -> &ExPolygons {
        &self.avoidance[sample.min(self.sample_count() - 1)][layer_nr]
    }

    /// Routing corridor (avoidance minus collision) for the given radius
    /// sample at a layer.
    pub fn internal_guide(&self, sample: usize, layer_nr: usize) -> &ExPolygons {
        &self.internal_guide[sample.min(self.sample_count() - 1)][layer_nr]
    }
}
