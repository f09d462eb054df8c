//! Tree support generation.
//!
//! The entry point is [`TreeSupport`]: construct it with the support settings
//! and the machine geometry, then call
//! [`TreeSupport::generate_support_areas`] with the slice storage. The
//! pipeline runs collision-field construction, avoidance propagation,
//! contact-point seeding, the node drop and circle rasterisation, and writes
//! the resulting support, roof and floor regions back into the storage.

pub mod circles;
pub mod contact;
pub mod drop;
pub mod mst;
pub mod node;
pub mod volumes;

pub use circles::CIRCLE_RESOLUTION;
pub use mst::MinimumSpanningTree;
pub use node::{insert_dropped_node, Node, NodeLayer};
pub use volumes::{machine_volume_border, TreeSupportVolumes};

use crate::config::{MachineConfig, TreeSupportConfig};
use crate::geometry::ExPolygons;
use crate::storage::SliceStorage;

// The stages are weighted differently in the progress bar; these weights were
// obtained experimentally.
pub(crate) const PROGRESS_WEIGHT_COLLISION: usize = 50;
pub(crate) const PROGRESS_WEIGHT_DROPDOWN: usize = 1;
pub(crate) const PROGRESS_WEIGHT_AREAS: usize = 1;

/// Total progress units for a run over the given table dimensions.
pub(crate) fn progress_total(sample_count: usize, layer_count: usize) -> usize {
    sample_count * PROGRESS_WEIGHT_COLLISION
        + layer_count * PROGRESS_WEIGHT_DROPDOWN
        + layer_count * PROGRESS_WEIGHT_AREAS
}

/// Sink for monotonically non-decreasing progress reports.
///
/// Parallel stages report through it concurrently, so implementations must be
/// `Sync`; the amounts themselves never decrease within a stage.
pub trait ProgressSink: Sync {
    /// `amount` progress units completed out of `total`.
    fn report(&self, amount: usize, total: usize);
}

/// A progress sink that discards all reports.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _amount: usize, _total: usize) {}
}

/// Tree support generator.
pub struct TreeSupport {
    config: TreeSupportConfig,
    /// The region outside the (adhesion-inset) printable area, pre-built once
    /// so every collision layer can forbid leaving the plate.
    machine_volume_border: ExPolygons,
}

impl TreeSupport {
    /// Create a generator for the given settings and machine.
    pub fn new(config: TreeSupportConfig, machine: &MachineConfig) -> Self {
        Self {
            machine_volume_border: machine_volume_border(machine),
            config,
        }
    }

    /// The active settings.
    pub fn config(&self) -> &TreeSupportConfig {
        &self.config
    }

    /// Generate support areas into the storage without progress reporting.
    pub fn generate_support_areas(&self, storage: &mut SliceStorage) {
        self.generate_support_areas_with_progress(storage, &NoProgress);
    }

    /// Generate support areas into the storage.
    ///
    /// Runs when tree support is enabled globally or on any mesh; meshes
    /// inherit the global toggle. On completion `storage.support.generated`
    /// is set and `layer_nr_max_filled_layer` reflects the highest non-empty
    /// layer.
    pub fn generate_support_areas_with_progress(
        &self,
        storage: &mut SliceStorage,
        progress: &dyn ProgressSink,
    ) {
        let use_tree_support = self.config.enabled
            || storage.meshes.iter().any(|mesh| mesh.tree_support_enabled);
        if !use_tree_support {
            return;
        }

        log::debug!(
            "generating tree support for {} layers, {} meshes",
            storage.layer_count(),
            storage.meshes.len()
        );

        // Areas that have to be avoided, per branch radius sample, and the
        // regions from which the build plate can no longer be reached.
        let volumes = TreeSupportVolumes::build(
            &self.config,
            storage,
            &self.machine_volume_border,
            progress,
        );

        let mut contact_nodes: Vec<NodeLayer> = vec![NodeLayer::new(); storage.layer_count()];
        for mesh in &storage.meshes {
            if !(mesh.tree_support_enabled || self.config.enabled) {
                continue;
            }
            contact::generate_contact_points(
                &self.config,
                mesh,
                volumes.collision_layers(0),
                &mut contact_nodes,
            );
        }

        // Drop nodes to lower layers.
        drop::drop_nodes(&self.config, &volumes, &mut contact_nodes, progress);

        // Generate support areas.
        circles::draw_circles(&self.config, &volumes, storage, &contact_nodes, progress);

        storage.support.generated = true;
    }
}
