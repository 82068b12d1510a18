use glam::{Vec3, Vec4};

use crate::asset_pipeline::DocumentBuilder;
use crate::config::{ComposerConfig, HelperStyle};
use crate::math::AABB;
use crate::scene_graph::{Material, SceneDocument, Transform};

pub const AXES_NODE: &str = "axes";
pub const GRID_BOX_NODE: &str = "grid_box";

const CUBE_CORNERS: [Vec3; 8] = [
    Vec3::new(-0.5, -0.5, -0.5),
    Vec3::new(0.5, -0.5, -0.5),
    Vec3::new(0.5, 0.5, -0.5),
    Vec3::new(-0.5, 0.5, -0.5),
    Vec3::new(-0.5, -0.5, 0.5),
    Vec3::new(0.5, -0.5, 0.5),
    Vec3::new(0.5, 0.5, 0.5),
    Vec3::new(-0.5, 0.5, 0.5),
];

const CUBE_EDGES: [[u32; 2]; 12] = [
    [0, 1],
    [1, 2],
    [2, 3],
    [3, 0],
    [4, 5],
    [5, 6],
    [6, 7],
    [7, 4],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];

/// Builds the axes and grid box that frame a bounding box.
///
/// Both helpers are unit-sized geometry placed by their node transform:
/// the axes are scaled by half the box size, the grid box by the full size.
/// Both are translated to the box center.
#[derive(Debug, Clone)]
pub struct HelperSynthesizer {
    style: HelperStyle,
    empty_threshold: f32,
}

impl HelperSynthesizer {
    pub fn new(config: &ComposerConfig) -> Self {
        Self {
            style: config.helpers.clone(),
            empty_threshold: config.empty_threshold,
        }
    }

    pub fn synthesize(&self, bounds: &AABB) -> SceneDocument {
        let bounds = self.framed(bounds);
        let center = bounds.center();
        let size = bounds.size();

        let mut builder = DocumentBuilder::new(AXES_NODE)
            .with_transform(Transform::from_translation_scale(center, size * 0.5));
        for (axis, (direction, color)) in [Vec3::X, Vec3::Y, Vec3::Z]
            .into_iter()
            .zip(self.style.axis_colors)
            .enumerate()
        {
            builder.add_lines(
                vec![Vec3::ZERO, direction],
                &[[0, 1]],
                Material::new(format!("axis_{}", ["x", "y", "z"][axis]), Vec4::from(color)),
            );
        }

        builder.begin_node(GRID_BOX_NODE, Transform::from_translation_scale(center, size));
        builder.add_lines(
            CUBE_CORNERS.to_vec(),
            &CUBE_EDGES,
            Material::new("box", Vec4::from(self.style.box_color)),
        );
        let (grid, segments) = floor_grid(self.style.grid_divisions);
        builder.add_lines(grid, &segments, Material::new("grid", Vec4::from(self.style.grid_color)));

        builder.build()
    }

    /// Substitutes a box of `empty_extent` around the origin when `bounds` holds nothing.
    fn framed(&self, bounds: &AABB) -> AABB {
        if !bounds.is_empty(self.empty_threshold) {
            return *bounds;
        }
        let half = Vec3::splat(self.style.empty_extent.abs() * 0.5);
        AABB::new(-half, half)
    }
}

/// Interior lines of a unit floor grid at y = -0.5. The outer lines coincide
/// with the box edges and are left out.
fn floor_grid(divisions: u32) -> (Vec<Vec3>, Vec<[u32; 2]>) {
    let mut positions = Vec::new();
    let mut segments = Vec::new();

    for step in 1..divisions {
        let t = step as f32 / divisions as f32 - 0.5;
        for (from, to) in [
            (Vec3::new(t, -0.5, -0.5), Vec3::new(t, -0.5, 0.5)),
            (Vec3::new(-0.5, -0.5, t), Vec3::new(0.5, -0.5, t)),
        ] {
            let first = positions.len() as u32;
            positions.push(from);
            positions.push(to);
            segments.push([first, first + 1]);
        }
    }

    (positions, segments)
}
