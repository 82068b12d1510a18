use std::sync::Arc;

/// A finalized, serialized scene ready to hand to a renderer.
///
/// The handle is unique per publication so that consumers caching by name
/// always see fresh content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderableSource {
    generation: u64,
    handle: String,
    glb: Arc<[u8]>,
}

impl RenderableSource {
    pub fn new(generation: u64, prefix: &str, glb: impl Into<Arc<[u8]>>) -> Self {
        Self {
            generation,
            handle: format!("{}{}.glb", prefix, generation),
            glb: glb.into(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn glb(&self) -> &[u8] {
        &self.glb
    }
}
