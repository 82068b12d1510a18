use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{CodecError, ComposeError};
use crate::scene_graph::SceneDocument;

pub mod ops;
pub mod service;

pub use service::GlbMergeService;

/// Where the bytes of a model come from.
#[derive(Debug, Clone)]
pub enum ModelSource {
    Bytes(Arc<[u8]>),
    Path(PathBuf),
}

impl ModelSource {
    pub async fn read(&self) -> Result<Arc<[u8]>, CodecError> {
        match self {
            ModelSource::Bytes(bytes) => Ok(bytes.clone()),
            ModelSource::Path(path) => Ok(Arc::from(tokio::fs::read(path).await?)),
        }
    }
}

impl From<Vec<u8>> for ModelSource {
    fn from(bytes: Vec<u8>) -> Self {
        ModelSource::Bytes(Arc::from(bytes))
    }
}

impl From<Arc<[u8]>> for ModelSource {
    fn from(bytes: Arc<[u8]>) -> Self {
        ModelSource::Bytes(bytes)
    }
}

impl From<PathBuf> for ModelSource {
    fn from(path: PathBuf) -> Self {
        ModelSource::Path(path)
    }
}

impl From<&Path> for ModelSource {
    fn from(path: &Path) -> Self {
        ModelSource::Path(path.to_path_buf())
    }
}

/// Merges named units into documents and turns documents into GLB buffers.
///
/// Every operation returns a new document; the input is never modified.
pub trait DocumentMergeService: Send + Sync {
    /// Merges `source` into `doc` as unit `name`, replacing a unit of the same name.
    fn merge_partial(
        &self,
        source: ModelSource,
        name: &str,
        doc: Arc<SceneDocument>,
    ) -> impl Future<Output = Result<SceneDocument, ComposeError>> + Send;

    /// Removes unit `name`. Removing an absent unit returns an equal document.
    fn remove_model(
        &self,
        name: &str,
        doc: Arc<SceneDocument>,
    ) -> impl Future<Output = Result<SceneDocument, ComposeError>> + Send;

    /// Brings `doc` into a self-consistent state ready to serialize. Idempotent.
    fn merge_finalize(
        &self,
        doc: Arc<SceneDocument>,
    ) -> impl Future<Output = Result<SceneDocument, ComposeError>> + Send;

    fn to_buffer(
        &self,
        doc: Arc<SceneDocument>,
    ) -> impl Future<Output = Result<Vec<u8>, ComposeError>> + Send;
}
