//! Tree support generation for fused-filament 3D printing.
//!
//! Given a sliced model (per-layer outlines plus the overhang regions derived
//! from them), this crate computes tree-like branching support structures:
//! tapered columns rooted at the build plate (or, optionally, on the model)
//! that fan out upward and touch the model at overhang points. The output is,
//! per layer, a set of 2D polygonal regions marking support infill, support
//! roof and support floor.
//!
//! # Pipeline
//!
//! 1. **Collision fields**: for each sampled branch radius, the per-layer
//!    region branches of that radius must avoid ([`support::TreeSupportVolumes`]).
//! 2. **Avoidance propagation**: the per-layer region from which a branch can
//!    no longer reach the build plate at a bounded lateral speed.
//! 3. **Contact seeding**: a rotated grid of candidate branch tops sampled
//!    inside the overhang regions.
//! 4. **Node drop**: layer-by-layer descent of the node forest, merging
//!    branches via minimum spanning trees.
//! 5. **Circle rasterisation**: tapered circles stamped at every node, unioned
//!    per layer and split into roof, floor and infill regions.
//!
//! Coordinates are scaled signed 64-bit integers; one unit is one micrometre.

pub mod clipper;
pub mod config;
pub mod geometry;
pub mod storage;
pub mod support;

/// Scaled integer coordinate type (1 unit = 1 micrometre).
pub type Coord = i64;

/// Floating-point coordinate type for unscaled values (millimetres).
pub type CoordF = f64;

/// Number of scaled units per millimetre.
pub const SCALING_FACTOR: CoordF = 1000.0;

/// Convert a value in millimetres to scaled integer units.
#[inline]
pub fn scale(value: CoordF) -> Coord {
    (value * SCALING_FACTOR).round() as Coord
}

/// Convert a scaled integer value back to millimetres.
#[inline]
pub fn unscale(value: Coord) -> CoordF {
    value as CoordF / SCALING_FACTOR
}

pub use config::{AdhesionType, MachineConfig, MachineShape, SupportType, TreeSupportConfig};
pub use storage::{
    MeshStorage, SliceStorage, StorageError, SupportInfillPart, SupportLayer, SupportStorage,
};
pub use support::{NoProgress, ProgressSink, TreeSupport};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_unscale_roundtrip() {
        assert_eq!(scale(1.0), 1000);
        assert_eq!(scale(0.2), 200);
        assert!((unscale(scale(12.345)) - 12.345).abs() < 1e-9);
    }

    #[test]
    fn test_scale_negative() {
        assert_eq!(scale(-2.5), -2500);
        assert!((unscale(-2500) + 2.5).abs() < 1e-12);
    }
}
