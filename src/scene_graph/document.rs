use glam::{Mat4, Vec3, Vec4};
use serde_json::{Map, Value};

use crate::math::AABB;
use crate::scene_graph::transform::Transform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub mode: PrimitiveMode,
    pub positions: Vec<Vec3>,
    pub indices: Option<Vec<u32>>,
    pub material: Option<usize>,
    bounds: AABB,
}

impl Primitive {
    pub fn new(
        mode: PrimitiveMode,
        positions: Vec<Vec3>,
        indices: Option<Vec<u32>>,
        material: Option<usize>,
    ) -> Self {
        let bounds = AABB::from_points(positions.iter().copied());
        Self {
            mode,
            positions,
            indices,
            material,
            bounds,
        }
    }

    /// Local-space min/max of the position attribute.
    pub fn bounds(&self) -> AABB {
        self.bounds
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: Option<String>,
    pub base_color: Vec4,
}

impl Material {
    pub fn new(name: impl Into<String>, base_color: Vec4) -> Self {
        Self {
            name: Some(name.into()),
            base_color,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub name: Option<String>,
    pub transform: Transform,
    pub mesh: Option<usize>,
    pub children: Vec<usize>,
    pub extras: Map<String, Value>,
}

impl Node {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Name of the unit this node was merged under, if it is tagged at all.
    pub fn unit(&self, tag_key: &str) -> Option<&str> {
        self.extras.get(tag_key).and_then(Value::as_str)
    }

    pub fn set_unit(&mut self, tag_key: &str, name: &str) {
        self.extras
            .insert(tag_key.to_string(), Value::String(name.to_string()));
    }
}

/// The composed scene: a flat, index-addressed node graph in glTF layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneDocument {
    pub nodes: Vec<Node>,
    pub roots: Vec<usize>,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
}

impl SceneDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add_node(&mut self, node: Node, parent: Option<usize>) -> usize {
        let index = self.nodes.len();
        self.nodes.push(node);
        match parent.and_then(|parent| self.nodes.get_mut(parent)) {
            Some(parent) => parent.children.push(index),
            None => self.roots.push(index),
        }
        index
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    pub fn get_node_by_name(&self, name: &str) -> Option<usize> {
        self.nodes
            .iter()
            .position(|node| node.name.as_deref() == Some(name))
    }

    /// Distinct unit names present in the document, sorted.
    pub fn unit_names(&self, tag_key: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .nodes
            .iter()
            .filter_map(|node| node.unit(tag_key))
            .map(String::from)
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn nodes_in_unit<'a>(
        &'a self,
        tag_key: &'a str,
        name: &'a str,
    ) -> impl Iterator<Item = (usize, &'a Node)> + 'a {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, node)| node.unit(tag_key) == Some(name))
    }

    /// Checks every cross reference. Each node may have at most one parent and
    /// roots may not be anybody's child.
    pub fn validate(&self) -> Result<(), String> {
        let mut parents = vec![None; self.nodes.len()];

        for (index, node) in self.nodes.iter().enumerate() {
            if let Some(mesh) = node.mesh {
                if mesh >= self.meshes.len() {
                    return Err(format!("node {} references missing mesh {}", index, mesh));
                }
            }
            for &child in &node.children {
                let Some(parent) = parents.get_mut(child) else {
                    return Err(format!("node {} references missing child {}", index, child));
                };
                if let Some(previous) = parent.replace(index) {
                    return Err(format!(
                        "node {} has two parents ({} and {})",
                        child, previous, index
                    ));
                }
            }
        }

        for &root in &self.roots {
            match parents.get(root) {
                None => return Err(format!("missing root node {}", root)),
                Some(Some(parent)) => {
                    return Err(format!("root node {} is a child of {}", root, parent))
                }
                Some(None) => {}
            }
        }

        for start in 0..self.nodes.len() {
            let mut current = start;
            for _ in 0..=self.nodes.len() {
                match parents[current] {
                    Some(parent) if parent == start => {
                        return Err(format!("node {} is its own ancestor", start))
                    }
                    Some(parent) => current = parent,
                    None => break,
                }
            }
        }

        for (mesh_index, mesh) in self.meshes.iter().enumerate() {
            for primitive in &mesh.primitives {
                if let Some(material) = primitive.material {
                    if material >= self.materials.len() {
                        return Err(format!(
                            "mesh {} references missing material {}",
                            mesh_index, material
                        ));
                    }
                }
                let vertex_count = primitive.positions.len() as u32;
                if let Some(indices) = &primitive.indices {
                    if indices.iter().any(|&i| i >= vertex_count) {
                        return Err(format!("mesh {} has out of range indices", mesh_index));
                    }
                }
            }
        }

        Ok(())
    }

    /// Index of the parent of every node, `None` for nodes nobody lists as a child.
    pub fn parents(&self) -> Vec<Option<usize>> {
        let mut parents = vec![None; self.nodes.len()];
        for (index, node) in self.nodes.iter().enumerate() {
            for &child in &node.children {
                if let Some(slot) = parents.get_mut(child) {
                    slot.get_or_insert(index);
                }
            }
        }
        parents
    }

    /// World matrix of every node, indexed like `nodes`.
    ///
    /// Nodes that hang off no root are resolved from their own top-most
    /// ancestor; nodes caught in a cycle fall back to their local matrix.
    pub fn world_matrices(&self) -> Vec<Mat4> {
        let mut world = vec![None; self.nodes.len()];

        for &root in &self.roots {
            self.update_world(root, &mut world);
        }

        let parents = self.parents();
        for index in 0..self.nodes.len() {
            if world[index].is_none() && parents[index].is_none() {
                self.update_world(index, &mut world);
            }
        }

        world
            .into_iter()
            .enumerate()
            .map(|(index, matrix)| {
                matrix.unwrap_or_else(|| self.nodes[index].transform.local_matrix())
            })
            .collect()
    }

    /// Resolves the subtree under `root`, depth first on an explicit stack.
    fn update_world(&self, root: usize, world: &mut [Option<Mat4>]) {
        let mut stack = vec![(root, Mat4::IDENTITY)];

        while let Some((index, parent)) = stack.pop() {
            let Some(node) = self.nodes.get(index) else {
                continue;
            };
            if world[index].is_some() {
                continue;
            }

            let matrix = parent * node.transform.local_matrix();
            world[index] = Some(matrix);
            stack.extend(node.children.iter().map(|&child| (child, matrix)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn world_matrices_follow_hierarchy() {
        let mut doc = SceneDocument::new();
        let mut parent = Node::named("parent");
        parent.transform = Transform::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let parent = doc.add_node(parent, None);

        let mut child = Node::named("child");
        child.transform = Transform::from_translation_scale(Vec3::new(0.0, 2.0, 0.0), Vec3::splat(2.0));
        let child = doc.add_node(child, Some(parent));

        let world = doc.world_matrices();
        let origin = world[child].transform_point3(Vec3::ZERO);
        let unit_x = world[child].transform_point3(Vec3::X);

        assert_relative_eq!(origin.x, 1.0);
        assert_relative_eq!(origin.y, 2.0);
        assert_relative_eq!(unit_x.x, 3.0);
    }

    #[test]
    fn world_matrices_handle_deep_chains() {
        let mut doc = SceneDocument::new();
        let mut parent = None;
        for _ in 0..100_000 {
            let mut node = Node::default();
            node.transform = Transform::from_translation(Vec3::X);
            parent = Some(doc.add_node(node, parent));
        }

        let world = doc.world_matrices();
        let leaf = world[world.len() - 1].transform_point3(Vec3::ZERO);
        assert_relative_eq!(leaf.x, 100_000.0);
    }

    #[test]
    fn world_matrices_survive_cycles() {
        let mut doc = SceneDocument::new();
        let a = doc.add_node(Node::named("a"), None);
        let b = doc.add_node(Node::named("b"), Some(a));
        doc.nodes[b].children.push(a);
        doc.roots.clear();

        assert_eq!(doc.world_matrices().len(), 2);
    }

    #[test]
    fn unit_names_are_sorted_and_distinct() {
        let mut doc = SceneDocument::new();
        for name in ["b", "a", "b"] {
            let mut node = Node::named(name);
            node.set_unit("__unit", name);
            doc.add_node(node, None);
        }
        doc.add_node(Node::named("untagged"), None);

        assert_eq!(doc.unit_names("__unit"), vec!["a", "b"]);
        assert_eq!(doc.nodes_in_unit("__unit", "b").count(), 2);
    }

    #[test]
    fn validate_rejects_shared_children() {
        let mut doc = SceneDocument::new();
        let a = doc.add_node(Node::named("a"), None);
        let b = doc.add_node(Node::named("b"), None);
        let c = doc.add_node(Node::named("c"), Some(a));
        doc.nodes[b].children.push(c);

        assert!(doc.validate().is_err());
    }

    #[test]
    fn validate_rejects_cycles() {
        let mut doc = SceneDocument::new();
        let a = doc.add_node(Node::named("a"), None);
        let b = doc.add_node(Node::named("b"), Some(a));
        doc.nodes[b].children.push(a);
        doc.roots.clear();

        assert!(doc.validate().is_err());
    }
}
