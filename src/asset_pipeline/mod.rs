pub mod builder;
pub mod glb_reader;
pub mod glb_writer;
pub mod glbs;

pub use builder::{DocumentBuilder, ElementKind};
pub use glb_reader::read_glb;
pub use glb_writer::write_glb;
