pub mod bounding;
pub mod helpers;
pub mod pubsub;
pub mod scene_composer;
pub mod shared;
pub mod source;

pub use bounding::BoundingBoxCalculator;
pub use helpers::HelperSynthesizer;
pub use pubsub::BufferedPubSub;
pub use scene_composer::{ComposerStats, Publication, SceneComposer, SceneRequest};
pub use shared::SharedComposer;
pub use source::RenderableSource;
