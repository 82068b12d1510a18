pub mod asset_pipeline;
pub mod composer;
pub mod config;
pub mod error;
pub mod math;
pub mod merge;
pub mod scene_graph;

pub use composer::{Publication, RenderableSource, SceneComposer, SceneRequest, SharedComposer};
pub use config::ComposerConfig;
pub use error::{CodecError, ComposeError};
pub use merge::{DocumentMergeService, GlbMergeService, ModelSource};
pub use scene_graph::SceneDocument;
