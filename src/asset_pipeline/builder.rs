use glam::{Vec3, Vec4};
use itertools::Itertools;

use crate::scene_graph::{Material, Mesh, Node, Primitive, PrimitiveMode, SceneDocument, Transform};

/// Kind of tessellated element. Each kind has its own base colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Face,
    Edge,
    Vertex,
}

impl ElementKind {
    pub fn material_name(self) -> &'static str {
        match self {
            ElementKind::Face => "face",
            ElementKind::Edge => "edge",
            ElementKind::Vertex => "vertex",
        }
    }

    pub fn base_color(self) -> Vec4 {
        match self {
            ElementKind::Face => Vec4::new(1.0, 1.0, 0.5, 1.0),
            ElementKind::Edge => Vec4::new(0.0, 0.0, 0.5, 1.0),
            ElementKind::Vertex => Vec4::new(0.0, 0.2, 0.0, 1.0),
        }
    }
}

struct PendingNode {
    name: String,
    transform: Transform,
    mesh: Mesh,
}

/// Builds a document incrementally, one primitive at a time.
///
/// Primitives are appended to the mesh of the current node; every primitive
/// gets a material of its own so that it can be restyled independently.
pub struct DocumentBuilder {
    doc: SceneDocument,
    current: PendingNode,
}

impl DocumentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            doc: SceneDocument::new(),
            current: PendingNode {
                name: name.into(),
                transform: Transform::IDENTITY,
                mesh: Mesh::default(),
            },
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.current.transform = transform;
        self
    }

    /// Finishes the current node and starts a new root node.
    pub fn begin_node(&mut self, name: impl Into<String>, transform: Transform) -> &mut Self {
        let next = PendingNode {
            name: name.into(),
            transform,
            mesh: Mesh::default(),
        };
        let finished = std::mem::replace(&mut self.current, next);
        self.flush(finished);
        self
    }

    pub fn add_face(&mut self, vertices: &[Vec3], triangles: &[[u32; 3]]) -> &mut Self {
        if vertices.is_empty() || triangles.is_empty() {
            log::warn!("Skipping empty face in {}", self.current.name);
            return self;
        }
        debug_assert!(triangles.iter().flatten().all(|&i| (i as usize) < vertices.len()));

        let indices = triangles.iter().flatten().copied().collect();
        self.push(
            PrimitiveMode::Triangles,
            vertices.to_vec(),
            indices,
            Material::new(ElementKind::Face.material_name(), ElementKind::Face.base_color()),
        )
    }

    /// Adds a polyline as a run of line segments.
    pub fn add_edge(&mut self, polyline: &[Vec3]) -> &mut Self {
        if polyline.len() < 2 {
            log::warn!("Skipping edge with fewer than two points in {}", self.current.name);
            return self;
        }

        let indices = (0..polyline.len() as u32)
            .tuple_windows()
            .flat_map(|(a, b)| [a, b])
            .collect();
        self.push(
            PrimitiveMode::Lines,
            polyline.to_vec(),
            indices,
            Material::new(ElementKind::Edge.material_name(), ElementKind::Edge.base_color()),
        )
    }

    pub fn add_vertex(&mut self, point: Vec3) -> &mut Self {
        self.push(
            PrimitiveMode::Points,
            vec![point],
            vec![0],
            Material::new(ElementKind::Vertex.material_name(), ElementKind::Vertex.base_color()),
        )
    }

    /// Adds arbitrary line segments with a custom material.
    pub fn add_lines(
        &mut self,
        positions: Vec<Vec3>,
        segments: &[[u32; 2]],
        material: Material,
    ) -> &mut Self {
        if positions.is_empty() || segments.is_empty() {
            return self;
        }
        debug_assert!(segments.iter().flatten().all(|&i| (i as usize) < positions.len()));

        let indices = segments.iter().flatten().copied().collect();
        self.push(PrimitiveMode::Lines, positions, indices, material)
    }

    pub fn primitive_count(&self) -> usize {
        self.doc
            .meshes
            .iter()
            .map(|mesh| mesh.primitives.len())
            .sum::<usize>()
            + self.current.mesh.primitives.len()
    }

    pub fn build(mut self) -> SceneDocument {
        let last = std::mem::replace(
            &mut self.current,
            PendingNode {
                name: String::new(),
                transform: Transform::IDENTITY,
                mesh: Mesh::default(),
            },
        );
        self.flush(last);
        self.doc
    }

    fn push(
        &mut self,
        mode: PrimitiveMode,
        positions: Vec<Vec3>,
        indices: Vec<u32>,
        material: Material,
    ) -> &mut Self {
        let material = self.doc.add_material(material);
        self.current
            .mesh
            .primitives
            .push(Primitive::new(mode, positions, Some(indices), Some(material)));
        self
    }

    fn flush(&mut self, pending: PendingNode) {
        let mut node = Node::named(pending.name);
        node.transform = pending.transform;
        if !pending.mesh.primitives.is_empty() {
            let mut mesh = pending.mesh;
            mesh.name = node.name.clone();
            node.mesh = Some(self.doc.add_mesh(mesh));
        }
        self.doc.add_node(node, None);
    }
}
