use crate::scene_graph::SceneDocument;

/// Replaces the unit `name` in `doc` with `incoming`, tagging every incoming node.
pub fn merge_unit(
    doc: &SceneDocument,
    incoming: SceneDocument,
    name: &str,
    tag_key: &str,
) -> SceneDocument {
    let mut out = remove_unit(doc, name, tag_key);

    let node_offset = out.nodes.len();
    let mesh_offset = out.meshes.len();
    let material_offset = out.materials.len();

    out.materials.extend(incoming.materials);

    out.meshes.extend(incoming.meshes.into_iter().map(|mut mesh| {
        for primitive in &mut mesh.primitives {
            if let Some(material) = primitive.material.as_mut() {
                *material += material_offset;
            }
        }
        mesh
    }));

    out.nodes.extend(incoming.nodes.into_iter().map(|mut node| {
        if let Some(mesh) = node.mesh.as_mut() {
            *mesh += mesh_offset;
        }
        for child in &mut node.children {
            *child += node_offset;
        }
        node.set_unit(tag_key, name);
        node
    }));

    out.roots
        .extend(incoming.roots.into_iter().map(|root| root + node_offset));

    out
}

/// Drops every node tagged `name` together with its descendants.
///
/// Meshes and materials are left in place; [`finalize`] prunes them.
pub fn remove_unit(doc: &SceneDocument, name: &str, tag_key: &str) -> SceneDocument {
    let mut removed = vec![false; doc.nodes.len()];
    let mut stack: Vec<usize> = doc
        .nodes_in_unit(tag_key, name)
        .map(|(index, _)| index)
        .collect();
    if stack.is_empty() {
        return doc.clone();
    }

    while let Some(index) = stack.pop() {
        if std::mem::replace(&mut removed[index], true) {
            continue;
        }
        stack.extend(
            doc.nodes[index]
                .children
                .iter()
                .copied()
                .filter(|&child| child < removed.len()),
        );
    }

    let remap = compaction_map(removed.iter().map(|removed| !removed));

    let nodes = doc
        .nodes
        .iter()
        .zip(&removed)
        .filter(|(_, removed)| !**removed)
        .map(|(node, _)| {
            let mut node = node.clone();
            node.children = node
                .children
                .iter()
                .filter_map(|&child| remap.get(child).copied().flatten())
                .collect();
            node
        })
        .collect();

    SceneDocument {
        nodes,
        roots: doc
            .roots
            .iter()
            .filter_map(|&root| remap.get(root).copied().flatten())
            .collect(),
        meshes: doc.meshes.clone(),
        materials: doc.materials.clone(),
    }
}

/// Validates `doc` and drops meshes and materials that nothing references.
pub fn finalize(doc: &SceneDocument) -> Result<SceneDocument, String> {
    doc.validate()?;

    let mut used_meshes = vec![false; doc.meshes.len()];
    for mesh in doc.nodes.iter().filter_map(|node| node.mesh) {
        used_meshes[mesh] = true;
    }

    let mut used_materials = vec![false; doc.materials.len()];
    for (mesh, _) in doc.meshes.iter().zip(&used_meshes).filter(|(_, used)| **used) {
        for material in mesh.primitives.iter().filter_map(|primitive| primitive.material) {
            used_materials[material] = true;
        }
    }

    let mesh_remap = compaction_map(used_meshes.iter().copied());
    let material_remap = compaction_map(used_materials.iter().copied());

    let materials = doc
        .materials
        .iter()
        .zip(&used_materials)
        .filter(|(_, used)| **used)
        .map(|(material, _)| material.clone())
        .collect();

    let meshes = doc
        .meshes
        .iter()
        .zip(&used_meshes)
        .filter(|(_, used)| **used)
        .map(|(mesh, _)| {
            let mut mesh = mesh.clone();
            for primitive in &mut mesh.primitives {
                primitive.material = primitive.material.and_then(|m| material_remap[m]);
            }
            mesh
        })
        .collect();

    let nodes = doc
        .nodes
        .iter()
        .map(|node| {
            let mut node = node.clone();
            node.mesh = node.mesh.and_then(|m| mesh_remap[m]);
            node
        })
        .collect();

    Ok(SceneDocument {
        nodes,
        roots: doc.roots.clone(),
        meshes,
        materials,
    })
}

/// Maps old indices to new ones once every entry with `keep == false` is gone.
fn compaction_map(keep: impl Iterator<Item = bool>) -> Vec<Option<usize>> {
    let mut next = 0;
    keep.map(|keep| {
        keep.then(|| {
            next += 1;
            next - 1
        })
    })
    .collect()
}
