use crate::config::{BoundsMode, ComposerConfig};
use crate::math::AABB;
use crate::scene_graph::{Node, SceneDocument};

/// Computes the world-space box around all ordinary (non-helper) geometry.
#[derive(Debug, Clone)]
pub struct BoundingBoxCalculator {
    tag_key: String,
    helper_name: String,
    mode: BoundsMode,
}

impl BoundingBoxCalculator {
    pub fn new(config: &ComposerConfig) -> Self {
        Self {
            tag_key: config.tag_key.clone(),
            helper_name: config.helper_name.clone(),
            mode: config.bounds_mode,
        }
    }

    /// Untagged nodes are ordinary content.
    pub fn is_helper(&self, node: &Node) -> bool {
        node.unit(&self.tag_key) == Some(self.helper_name.as_str())
    }

    /// Returns [`AABB::empty`] when there is no ordinary geometry.
    pub fn compute(&self, doc: &SceneDocument) -> AABB {
        let world = doc.world_matrices();
        let mut aabb = AABB::empty();

        for (node, matrix) in doc.nodes.iter().zip(&world) {
            if self.is_helper(node) {
                continue;
            }
            let Some(mesh) = node.mesh.and_then(|mesh| doc.meshes.get(mesh)) else {
                continue;
            };

            for primitive in mesh.primitives.iter().filter(|p| !p.positions.is_empty()) {
                let local = primitive.bounds();
                match self.mode {
                    BoundsMode::ExtremeCorners => {
                        for corner in local.transformed_extremes(matrix) {
                            aabb.extend(corner);
                        }
                    }
                    BoundsMode::AllCorners => {
                        for corner in local.transformed_corners(matrix) {
                            aabb.extend(corner);
                        }
                    }
                }
            }
        }

        aabb
    }
}
