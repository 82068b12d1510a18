pub mod document;
pub mod transform;

// Re-export main types for convenience
pub use document::{Material, Mesh, Node, Primitive, PrimitiveMode, SceneDocument};
pub use transform::Transform;
