//! Configuration for tree support generation.
//!
//! All distances are scaled integers (one unit = one micrometre); angles are
//! radians. Defaults follow common FFF printing profiles.

use crate::geometry::BoundingBox;
use crate::{scale, Coord, CoordF};
use serde::{Deserialize, Serialize};

/// Shape of the build plate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MachineShape {
    /// Axis-aligned rectangular plate.
    #[default]
    Rectangular,
    /// Elliptic plate inscribed in the machine bounds.
    Elliptic,
}

/// Platform adhesion helper printed around the first layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AdhesionType {
    #[default]
    None,
    Brim,
    Raft,
    Skirt,
}

/// Where support is allowed to rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SupportType {
    /// Branches may only root on the build plate; stranded branches are
    /// dropped.
    #[default]
    BuildplateOnly,
    /// Branches may also rest on top of the model.
    Everywhere,
}

/// Machine geometry and adhesion allowances, used to keep branches on the
/// printable area.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineConfig {
    /// Printable XY bounds of the machine.
    pub size: BoundingBox,
    /// Build plate shape.
    pub shape: MachineShape,
    /// Platform adhesion type.
    pub adhesion: AdhesionType,
    /// Line width used for skirt and brim lines.
    pub skirt_brim_line_width: Coord,
    /// Number of brim lines.
    pub brim_line_count: usize,
    /// Margin claimed by a raft around the model.
    pub raft_margin: Coord,
    /// Gap between the skirt and the model.
    pub skirt_gap: Coord,
    /// Number of skirt lines.
    pub skirt_line_count: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            size: BoundingBox::from_points_minmax(
                crate::geometry::Point::zero(),
                crate::geometry::Point::new_scale(220.0, 220.0),
            ),
            shape: MachineShape::Rectangular,
            adhesion: AdhesionType::None,
            skirt_brim_line_width: scale(0.4),
            brim_line_count: 8,
            raft_margin: scale(15.0),
            skirt_gap: scale(3.0),
            skirt_line_count: 1,
        }
    }
}

impl MachineConfig {
    /// Room to leave free around support for the platform adhesion.
    pub fn adhesion_size(&self) -> Coord {
        match self.adhesion {
            AdhesionType::Brim => self.skirt_brim_line_width * self.brim_line_count as Coord,
            AdhesionType::Raft => self.raft_margin,
            AdhesionType::Skirt => {
                self.skirt_gap + self.skirt_brim_line_width * self.skirt_line_count as Coord
            }
            AdhesionType::None => 0,
        }
    }
}

/// Tree support settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeSupportConfig {
    /// Master toggle; a per-mesh toggle exists on
    /// [`crate::storage::MeshStorage`].
    pub enabled: bool,
    /// Diameter of a branch at its thinnest, before tip tapering.
    pub branch_diameter: Coord,
    /// Spacing of the contact-point grid inside overhang areas.
    pub branch_distance: Coord,
    /// Angle by which branches widen on their way down (radians).
    pub branch_diameter_angle: CoordF,
    /// Maximum branch slant from vertical (radians). Bounds the lateral
    /// distance a branch may traverse per layer.
    pub angle: CoordF,
    /// Sampling resolution of the branch-radius axis for collision fields.
    pub collision_resolution: Coord,
    /// Number of walls around support infill areas.
    pub wall_count: usize,
    /// Minimum horizontal clearance between support and model.
    pub xy_distance: Coord,
    /// Vertical clearance between support top and the overhang it supports.
    pub top_distance: Coord,
    /// Vertical clearance between support bottom and the model below.
    pub bottom_distance: Coord,
    /// Whether to generate dense floor interfaces where branches rest on the
    /// model.
    pub bottom_enable: bool,
    /// Height of the floor interface.
    pub bottom_height: Coord,
    /// Vertical sampling step when collecting floor areas.
    pub interface_skip_height: Coord,
    /// Whether to generate dense roof interfaces under overhangs.
    pub roof_enable: bool,
    /// Height of the roof interface.
    pub roof_height: Coord,
    /// Width of a support extrusion line.
    pub line_width: Coord,
    /// Layer height of the print.
    pub layer_height: Coord,
    /// Overhang threshold angle of the print (radians); overhang areas come
    /// pre-computed, but the threshold still sizes the seeding tolerance.
    pub support_angle: CoordF,
    /// Where branches may rest.
    pub support_type: SupportType,
}

impl Default for TreeSupportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            branch_diameter: scale(2.0),
            branch_distance: scale(1.0),
            branch_diameter_angle: 5f64.to_radians(),
            angle: 40f64.to_radians(),
            collision_resolution: scale(0.5),
            wall_count: 1,
            xy_distance: scale(0.7),
            top_distance: scale(0.1),
            bottom_distance: scale(0.1),
            bottom_enable: false,
            bottom_height: scale(1.0),
            interface_skip_height: scale(0.3),
            roof_enable: false,
            roof_height: scale(1.0),
            line_width: scale(0.4),
            layer_height: scale(0.2),
            support_angle: 50f64.to_radians(),
            support_type: SupportType::BuildplateOnly,
        }
    }
}

impl TreeSupportConfig {
    /// Branch radius at its thinnest (half the configured diameter).
    #[inline]
    pub fn branch_radius(&self) -> Coord {
        self.branch_diameter / 2
    }

    /// Lateral distance a branch may traverse while dropping one layer.
    /// Effectively unbounded once the branch angle reaches 90 degrees.
    pub fn maximum_move_distance(&self) -> Coord {
        // 1km sentinel: dwarfs any build plate while keeping offsets and
        // squared distances well inside the coordinate range.
        const UNBOUNDED_MOVE: Coord = 1_000_000_000;
        if self.angle < std::f64::consts::FRAC_PI_2 {
            (self.angle.tan() * self.layer_height as CoordF) as Coord
        } else {
            UNBOUNDED_MOVE
        }
    }

    /// Radius growth factor per layer that realises `branch_diameter_angle`.
    pub fn diameter_angle_scale_factor(&self) -> CoordF {
        self.branch_diameter_angle.sin() * self.layer_height as CoordF
            / self.branch_radius() as CoordF
    }

    /// Number of layers over which a branch tip tapers from a point to the
    /// full branch radius (a 45 degree tip).
    pub fn tip_layers(&self) -> usize {
        (self.branch_radius() / self.layer_height) as usize
    }

    /// Layers of clearance between a contact point and the overhang above it.
    /// The extra layer keeps support strictly below the overhang.
    pub fn z_top_layers(&self) -> usize {
        div_round_up(self.top_distance, self.layer_height) + 1
    }

    /// Layers of clearance between support and the model below it.
    pub fn z_bottom_layers(&self) -> usize {
        div_round_up(self.bottom_distance, self.layer_height)
    }

    /// Number of roof interface layers below each contact point.
    pub fn roof_layers(&self) -> usize {
        if self.roof_enable {
            ((self.roof_height as CoordF / self.layer_height as CoordF).round()) as usize
        } else {
            0
        }
    }

    /// Radius of a branch `distance_to_top` layers below its contact point:
    /// linear taper over the tip, then widening by the diameter angle.
    pub fn branch_radius_at(&self, distance_to_top: u32) -> Coord {
        let branch_radius = self.branch_radius();
        let tip_layers = self.tip_layers();
        if distance_to_top as usize > tip_layers || tip_layers == 0 {
            branch_radius
                + (branch_radius as CoordF
                    * distance_to_top as CoordF
                    * self.diameter_angle_scale_factor()) as Coord
        } else {
            branch_radius * distance_to_top as Coord / tip_layers as Coord
        }
    }
}

/// Integer division rounding up, for converting distances to layer counts.
#[inline]
pub(crate) fn div_round_up(dividend: Coord, divisor: Coord) -> usize {
    if divisor <= 0 {
        return 0;
    }
    ((dividend + divisor - 1) / divisor).max(0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adhesion_size() {
        let mut machine = MachineConfig::default();
        assert_eq!(machine.adhesion_size(), 0);

        machine.adhesion = AdhesionType::Brim;
        assert_eq!(machine.adhesion_size(), scale(0.4) * 8);

        machine.adhesion = AdhesionType::Raft;
        assert_eq!(machine.adhesion_size(), scale(15.0));

        machine.adhesion = AdhesionType::Skirt;
        assert_eq!(machine.adhesion_size(), scale(3.0) + scale(0.4));
    }

    #[test]
    fn test_maximum_move_distance() {
        let config = TreeSupportConfig {
            angle: 45f64.to_radians(),
            layer_height: scale(0.2),
            ..Default::default()
        };
        // tan(45 deg) = 1, so one layer height of lateral movement.
        assert_eq!(config.maximum_move_distance(), scale(0.2));

        let vertical = TreeSupportConfig {
            angle: std::f64::consts::FRAC_PI_2,
            ..Default::default()
        };
        assert!(vertical.maximum_move_distance() > scale(100_000.0));
    }

    #[test]
    fn test_tip_layers() {
        let config = TreeSupportConfig {
            branch_diameter: scale(2.0),
            layer_height: scale(0.2),
            ..Default::default()
        };
        assert_eq!(config.tip_layers(), 5);
    }

    #[test]
    fn test_z_top_layers() {
        let config = TreeSupportConfig {
            top_distance: scale(0.2),
            layer_height: scale(0.2),
            ..Default::default()
        };
        assert_eq!(config.z_top_layers(), 2);

        let zero = TreeSupportConfig {
            top_distance: 0,
            ..config
        };
        assert_eq!(zero.z_top_layers(), 1);
    }

    #[test]
    fn test_roof_layers() {
        let config = TreeSupportConfig {
            roof_enable: true,
            roof_height: scale(0.8),
            layer_height: scale(0.2),
            ..Default::default()
        };
        assert_eq!(config.roof_layers(), 4);

        let disabled = TreeSupportConfig {
            roof_enable: false,
            ..config
        };
        assert_eq!(disabled.roof_layers(), 0);
    }

    #[test]
    fn test_branch_radius_at_tapers_then_flares() {
        let config = TreeSupportConfig {
            branch_diameter: scale(2.0),
            layer_height: scale(0.2),
            ..Default::default()
        };
        // Inside the tip: linear fraction of the branch radius.
        assert_eq!(config.branch_radius_at(1), scale(1.0) / 5);
        assert_eq!(config.branch_radius_at(5), scale(1.0));
        // Past the tip: widening with distance to top.
        assert!(config.branch_radius_at(50) > config.branch_radius_at(10));
        assert!(config.branch_radius_at(10) >= scale(1.0));
    }

    #[test]
    fn test_div_round_up() {
        assert_eq!(div_round_up(200, 200), 1);
        assert_eq!(div_round_up(201, 200), 2);
        assert_eq!(div_round_up(0, 200), 0);
        assert_eq!(div_round_up(100, 0), 0);
    }
}
