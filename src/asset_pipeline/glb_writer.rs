use std::borrow::Cow;
use std::collections::BTreeMap;

use gltf::binary::{Glb, Header};
use gltf::json;
use json::validation::Checked::Valid;
use json::validation::USize64;
use serde_json::Value;

use crate::error::CodecError;
use crate::scene_graph::{Material, Node, Primitive, PrimitiveMode, SceneDocument};

/// Encodes a document as binary glTF: one buffer, one view per attribute.
///
/// Equal documents encode to identical bytes.
pub fn write_glb(doc: &SceneDocument, generator: &str) -> Result<Vec<u8>, CodecError> {
    doc.validate().map_err(CodecError::Invalid)?;

    let mut writer = RootWriter {
        root: json::Root {
            asset: json::Asset {
                generator: Some(generator.to_string()),
                ..Default::default()
            },
            ..Default::default()
        },
        bin: Vec::new(),
    };

    for material in &doc.materials {
        writer.root.materials.push(material_to_json(material));
    }

    for mesh in &doc.meshes {
        let primitives = mesh
            .primitives
            .iter()
            .filter(|primitive| !primitive.positions.is_empty())
            .map(|primitive| writer.push_primitive(primitive))
            .collect();

        writer.root.meshes.push(json::Mesh {
            extensions: Default::default(),
            extras: Default::default(),
            name: mesh.name.clone(),
            primitives,
            weights: None,
        });
    }

    for node in &doc.nodes {
        let node = node_to_json(node)?;
        writer.root.nodes.push(node);
    }

    // A scene must list at least one node, so a rootless document gets none.
    if !doc.roots.is_empty() {
        writer.root.scenes.push(json::Scene {
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            nodes: doc.roots.iter().map(|&root| index(root)).collect(),
        });
        writer.root.scene = Some(json::Index::new(0));
    }

    writer.finish()
}

struct RootWriter {
    root: json::Root,
    bin: Vec<u8>,
}

impl RootWriter {
    fn push_view(
        &mut self,
        bytes: &[u8],
        target: json::buffer::Target,
    ) -> json::Index<json::buffer::View> {
        let offset = self.bin.len();
        self.bin.extend_from_slice(bytes);
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }

        self.root.buffer_views.push(json::buffer::View {
            buffer: json::Index::new(0),
            byte_length: USize64::from(bytes.len()),
            byte_offset: Some(USize64::from(offset)),
            byte_stride: None,
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            target: Some(Valid(target)),
        });
        index(self.root.buffer_views.len() - 1)
    }

    fn push_accessor(&mut self, accessor: json::Accessor) -> json::Index<json::Accessor> {
        self.root.accessors.push(accessor);
        index(self.root.accessors.len() - 1)
    }

    fn push_primitive(&mut self, primitive: &Primitive) -> json::mesh::Primitive {
        let bounds = primitive.bounds();
        let view = self.push_view(
            bytemuck::cast_slice(&primitive.positions),
            json::buffer::Target::ArrayBuffer,
        );
        let positions = self.push_accessor(json::Accessor {
            buffer_view: Some(view),
            byte_offset: None,
            count: USize64::from(primitive.positions.len()),
            component_type: Valid(json::accessor::GenericComponentType(
                json::accessor::ComponentType::F32,
            )),
            extensions: Default::default(),
            extras: Default::default(),
            type_: Valid(json::accessor::Type::Vec3),
            min: Some(Value::from(bounds.min.to_array().to_vec())),
            max: Some(Value::from(bounds.max.to_array().to_vec())),
            name: None,
            normalized: false,
            sparse: None,
        });

        let indices = primitive.indices.as_ref().map(|indices| {
            let view = self.push_view(
                bytemuck::cast_slice(indices),
                json::buffer::Target::ElementArrayBuffer,
            );
            self.push_accessor(json::Accessor {
                buffer_view: Some(view),
                byte_offset: None,
                count: USize64::from(indices.len()),
                component_type: Valid(json::accessor::GenericComponentType(
                    json::accessor::ComponentType::U32,
                )),
                extensions: Default::default(),
                extras: Default::default(),
                type_: Valid(json::accessor::Type::Scalar),
                min: None,
                max: None,
                name: None,
                normalized: false,
                sparse: None,
            })
        });

        let mut attributes = BTreeMap::new();
        attributes.insert(Valid(json::mesh::Semantic::Positions), positions);

        json::mesh::Primitive {
            attributes,
            extensions: Default::default(),
            extras: Default::default(),
            indices,
            material: primitive.material.map(index),
            mode: Valid(mode_to_json(primitive.mode)),
            targets: None,
        }
    }

    fn finish(mut self) -> Result<Vec<u8>, CodecError> {
        if !self.bin.is_empty() {
            self.root.buffers.push(json::Buffer {
                byte_length: USize64::from(self.bin.len()),
                extensions: Default::default(),
                extras: Default::default(),
                name: None,
                uri: None,
            });
        }

        let mut json = serde_json::to_vec(&self.root)?;
        while json.len() % 4 != 0 {
            json.push(b' ');
        }

        let glb = Glb {
            header: Header {
                magic: *b"glTF",
                version: 2,
                length: 0,
            },
            json: Cow::Owned(json),
            bin: (!self.bin.is_empty()).then_some(Cow::Owned(self.bin)),
        };
        Ok(glb.to_vec()?)
    }
}

fn index<T>(value: usize) -> json::Index<T> {
    json::Index::new(value as u32)
}

fn material_to_json(material: &Material) -> json::Material {
    json::Material {
        name: material.name.clone(),
        pbr_metallic_roughness: json::material::PbrMetallicRoughness {
            base_color_factor: json::material::PbrBaseColorFactor(material.base_color.to_array()),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn node_to_json(node: &Node) -> Result<json::Node, CodecError> {
    let transform = node.transform;
    let extras = if node.extras.is_empty() {
        None
    } else {
        Some(serde_json::value::to_raw_value(&node.extras)?)
    };

    Ok(json::Node {
        name: node.name.clone(),
        mesh: node.mesh.map(index),
        children: (!node.children.is_empty())
            .then(|| node.children.iter().map(|&child| index(child)).collect()),
        translation: (transform.translation() != glam::Vec3::ZERO)
            .then(|| transform.translation().to_array()),
        rotation: (transform.rotation() != glam::Quat::IDENTITY)
            .then(|| json::scene::UnitQuaternion(transform.rotation().to_array())),
        scale: (transform.scale() != glam::Vec3::ONE).then(|| transform.scale().to_array()),
        extras,
        ..Default::default()
    })
}

fn mode_to_json(mode: PrimitiveMode) -> json::mesh::Mode {
    match mode {
        PrimitiveMode::Points => json::mesh::Mode::Points,
        PrimitiveMode::Lines => json::mesh::Mode::Lines,
        PrimitiveMode::LineLoop => json::mesh::Mode::LineLoop,
        PrimitiveMode::LineStrip => json::mesh::Mode::LineStrip,
        PrimitiveMode::Triangles => json::mesh::Mode::Triangles,
        PrimitiveMode::TriangleStrip => json::mesh::Mode::TriangleStrip,
        PrimitiveMode::TriangleFan => json::mesh::Mode::TriangleFan,
    }
}
