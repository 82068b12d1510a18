use std::future::Future;
use std::sync::Arc;

use crate::asset_pipeline::{read_glb, write_glb};
use crate::config::ComposerConfig;
use crate::error::{CodecError, ComposeError};
use crate::merge::{ops, DocumentMergeService, ModelSource};
use crate::scene_graph::SceneDocument;

/// Default merge service working on binary glTF.
///
/// Decoding, merging and encoding are CPU bound and run on tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct GlbMergeService {
    tag_key: String,
    generator: String,
}

impl GlbMergeService {
    pub fn new(config: &ComposerConfig) -> Self {
        Self {
            tag_key: config.tag_key.clone(),
            generator: config.generator.clone(),
        }
    }

    pub fn tag_key(&self) -> &str {
        &self.tag_key
    }
}

impl Default for GlbMergeService {
    fn default() -> Self {
        Self::new(&ComposerConfig::default())
    }
}

fn check_name(name: &str) -> Result<(), ComposeError> {
    if name.trim().is_empty() {
        return Err(ComposeError::merge(
            name,
            CodecError::Invalid("model name must not be empty".to_string()),
        ));
    }
    Ok(())
}

impl DocumentMergeService for GlbMergeService {
    fn merge_partial(
        &self,
        source: ModelSource,
        name: &str,
        doc: Arc<SceneDocument>,
    ) -> impl Future<Output = Result<SceneDocument, ComposeError>> + Send {
        let name = name.to_string();
        let tag_key = self.tag_key.clone();

        async move {
            check_name(&name)?;
            let bytes = source
                .read()
                .await
                .map_err(|e| ComposeError::merge(&name, e))?;

            log::debug!("Merging {} ({} bytes)", name, bytes.len());
            tokio::task::spawn_blocking(move || -> Result<SceneDocument, ComposeError> {
                let incoming = read_glb(&bytes).map_err(|e| ComposeError::merge(&name, e))?;
                Ok(ops::merge_unit(&doc, incoming, &name, &tag_key))
            })
            .await?
        }
    }

    fn remove_model(
        &self,
        name: &str,
        doc: Arc<SceneDocument>,
    ) -> impl Future<Output = Result<SceneDocument, ComposeError>> + Send {
        let name = name.to_string();
        let tag_key = self.tag_key.clone();

        async move {
            check_name(&name)?;
            log::debug!("Removing {}", name);
            let removed = tokio::task::spawn_blocking(move || ops::remove_unit(&doc, &name, &tag_key))
                .await?;
            Ok(removed)
        }
    }

    fn merge_finalize(
        &self,
        doc: Arc<SceneDocument>,
    ) -> impl Future<Output = Result<SceneDocument, ComposeError>> + Send {
        async move {
            tokio::task::spawn_blocking(move || {
                ops::finalize(&doc)
                    .map_err(|reason| ComposeError::Serialization(CodecError::Invalid(reason)))
            })
            .await?
        }
    }

    fn to_buffer(
        &self,
        doc: Arc<SceneDocument>,
    ) -> impl Future<Output = Result<Vec<u8>, ComposeError>> + Send {
        let generator = self.generator.clone();

        async move {
            tokio::task::spawn_blocking(move || {
                write_glb(&doc, &generator).map_err(ComposeError::Serialization)
            })
            .await?
        }
    }
}
