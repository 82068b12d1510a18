use glam::{Quat, Vec3, Vec4};
use gltf::mesh::Mode;
use serde_json::{Map, Value};

use crate::error::CodecError;
use crate::scene_graph::{
    Material, Mesh, Node, Primitive, PrimitiveMode, SceneDocument, Transform,
};

pub type Buffers<'a> = &'a [gltf::buffer::Data];

/// Decodes a binary (or self-contained JSON) glTF into a [`SceneDocument`].
///
/// Only geometry, hierarchy, base colours and node extras survive; images,
/// textures, skins and animations are dropped.
pub fn read_glb(bytes: &[u8]) -> Result<SceneDocument, CodecError> {
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes)?;
    let buffers = gltf::import_buffers(&document, None, blob)?;

    if document.animations().next().is_some() || document.skins().next().is_some() {
        log::debug!("Dropping animations and skins while importing");
    }
    if document.textures().next().is_some() {
        log::debug!("Dropping {} textures while importing", document.textures().count());
    }

    let materials = document
        .materials()
        .map(|material| Material {
            name: material.name().map(String::from),
            base_color: Vec4::from(material.pbr_metallic_roughness().base_color_factor()),
        })
        .collect();

    let meshes = document
        .meshes()
        .map(|mesh| mesh_from_gltf(&mesh, &buffers))
        .collect();

    let nodes = document.nodes().map(|node| node_from_gltf(&node)).collect();

    let roots = match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => scene.nodes().map(|node| node.index()).collect(),
        None => Vec::new(),
    };

    let mut doc = SceneDocument {
        nodes,
        roots,
        meshes,
        materials,
    };

    // Without any scene, every node nobody claims as a child is a root.
    if doc.roots.is_empty() {
        doc.roots = doc
            .parents()
            .iter()
            .enumerate()
            .filter(|(_, parent)| parent.is_none())
            .map(|(index, _)| index)
            .collect();
    }

    Ok(doc)
}

fn node_from_gltf(node: &gltf::Node) -> Node {
    let (translation, rotation, scale) = node.transform().decomposed();

    Node {
        name: node.name().map(String::from),
        transform: Transform::from_trs(
            Vec3::from(translation),
            Quat::from_array(rotation),
            Vec3::from(scale),
        ),
        mesh: node.mesh().map(|mesh| mesh.index()),
        children: node.children().map(|child| child.index()).collect(),
        extras: extras_from_gltf(node.extras()),
    }
}

fn extras_from_gltf(extras: &gltf::json::Extras) -> Map<String, Value> {
    let Some(raw) = extras.as_ref() else {
        return Map::new();
    };

    match serde_json::from_str::<Value>(raw.get()) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            log::debug!("Ignoring non-object node extras");
            Map::new()
        }
        Err(err) => {
            log::warn!("Ignoring unreadable node extras: {}", err);
            Map::new()
        }
    }
}

fn mesh_from_gltf(mesh: &gltf::Mesh, buffers: Buffers) -> Mesh {
    let mut primitives = Vec::new();

    for primitive in mesh.primitives() {
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

        let positions: Vec<Vec3> = match reader.read_positions() {
            Some(positions) => positions.map(Vec3::from).collect(),
            None => {
                log::warn!(
                    "Skipping primitive {} of mesh {:?}: no positions",
                    primitive.index(),
                    mesh.name()
                );
                continue;
            }
        };

        let indices = reader
            .read_indices()
            .map(|indices| indices.into_u32().collect::<Vec<u32>>());

        primitives.push(Primitive::new(
            mode_from_gltf(primitive.mode()),
            positions,
            indices,
            primitive.material().index(),
        ));
    }

    Mesh {
        name: mesh.name().map(String::from),
        primitives,
    }
}

fn mode_from_gltf(mode: Mode) -> PrimitiveMode {
    match mode {
        Mode::Points => PrimitiveMode::Points,
        Mode::Lines => PrimitiveMode::Lines,
        Mode::LineLoop => PrimitiveMode::LineLoop,
        Mode::LineStrip => PrimitiveMode::LineStrip,
        Mode::Triangles => PrimitiveMode::Triangles,
        Mode::TriangleStrip => PrimitiveMode::TriangleStrip,
        Mode::TriangleFan => PrimitiveMode::TriangleFan,
    }
}
