//! Slice data storage: the inputs consumed from the slicing environment and
//! the per-layer support output written back for the toolpath planner.

use crate::geometry::{ExPolygon, ExPolygons};
use crate::Coord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while assembling slice storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("mesh {mesh} has {overhang_layers} overhang layers, expected {expected} to match the slice")]
    LayerCountMismatch {
        mesh: usize,
        overhang_layers: usize,
        expected: usize,
    },
}

/// Per-mesh input data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshStorage {
    /// The XY region requiring support, per layer.
    pub overhang_areas: Vec<ExPolygons>,
    /// Per-mesh tree support toggle.
    pub tree_support_enabled: bool,
}

/// One connected support region, ready for infill generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportInfillPart {
    /// The region outline (one connected component, holes included).
    pub outline: ExPolygon,
    /// Extrusion line width for this part.
    pub line_width: Coord,
    /// Number of walls to draw around the infill.
    pub wall_count: usize,
}

/// Support output for one layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupportLayer {
    /// Ordinary support regions, one entry per connected part.
    pub support_infill_parts: Vec<SupportInfillPart>,
    /// Dense top interface directly under the model.
    pub support_roof: ExPolygons,
    /// Dense bottom interface where support rests on the model.
    pub support_bottom: ExPolygons,
}

impl SupportLayer {
    /// Whether this layer carries any support geometry.
    pub fn is_empty(&self) -> bool {
        self.support_infill_parts.is_empty()
            && self.support_roof.is_empty()
            && self.support_bottom.is_empty()
    }
}

/// Support output for the whole print.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupportStorage {
    /// Per-layer support areas, same indexing as the slice.
    pub layers: Vec<SupportLayer>,
    /// Set once support generation has run.
    pub generated: bool,
    /// Highest layer index carrying support geometry, -1 when none.
    pub layer_nr_max_filled_layer: i32,
}

/// The sliced model plus the support output written by generation.
///
/// Layer 0 is at the build plate; indices increase upward.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SliceStorage {
    /// Solid model region per layer.
    pub layer_outlines: Vec<ExPolygons>,
    /// Input meshes; overhang areas are indexed like the slice.
    pub meshes: Vec<MeshStorage>,
    /// Support output.
    pub support: SupportStorage,
}

impl SliceStorage {
    /// Assemble storage, validating that every mesh covers the slice's layer
    /// range.
    pub fn new(
        layer_outlines: Vec<ExPolygons>,
        meshes: Vec<MeshStorage>,
    ) -> Result<Self, StorageError> {
        let expected = layer_outlines.len();
        for (mesh_idx, mesh) in meshes.iter().enumerate() {
            if mesh.overhang_areas.len() != expected {
                return Err(StorageError::LayerCountMismatch {
                    mesh: mesh_idx,
                    overhang_layers: mesh.overhang_areas.len(),
                    expected,
                });
            }
        }

        let support = SupportStorage {
            layers: vec![SupportLayer::default(); expected],
            generated: false,
            layer_nr_max_filled_layer: -1,
        };

        Ok(Self {
            layer_outlines,
            meshes,
            support,
        })
    }

    /// Number of layers in the slice.
    #[inline]
    pub fn layer_count(&self) -> usize {
        self.layer_outlines.len()
    }

    /// The solid model region at a layer. Out-of-range queries return an
    /// empty region.
    pub fn layer_outlines(&self, layer_nr: usize) -> &ExPolygons {
        static EMPTY: ExPolygons = Vec::new();
        self.layer_outlines.get(layer_nr).unwrap_or(&EMPTY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Polygon};
    use crate::scale;

    fn square_layer() -> ExPolygons {
        vec![ExPolygon::from(Polygon::rectangle(
            Point::new(0, 0),
            Point::new(scale(10.0), scale(10.0)),
        ))]
    }

    #[test]
    fn test_storage_new() {
        let storage = SliceStorage::new(vec![square_layer(), square_layer()], vec![]).unwrap();
        assert_eq!(storage.layer_count(), 2);
        assert_eq!(storage.support.layers.len(), 2);
        assert!(!storage.support.generated);
        assert_eq!(storage.support.layer_nr_max_filled_layer, -1);
    }

    #[test]
    fn test_storage_rejects_mismatched_mesh() {
        let mesh = MeshStorage {
            overhang_areas: vec![vec![]; 3],
            tree_support_enabled: true,
        };
        let result = SliceStorage::new(vec![square_layer(), square_layer()], vec![mesh]);
        assert!(matches!(
            result,
            Err(StorageError::LayerCountMismatch { mesh: 0, .. })
        ));
    }

    #[test]
    fn test_layer_outlines_out_of_range() {
        let storage = SliceStorage::new(vec![square_layer()], vec![]).unwrap();
        assert!(storage.layer_outlines(5).is_empty());
    }

    #[test]
    fn test_support_layer_is_empty() {
        let mut layer = SupportLayer::default();
        assert!(layer.is_empty());
        layer.support_roof = square_layer();
        assert!(!layer.is_empty());
    }
}
