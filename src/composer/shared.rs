use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};

use crate::composer::pubsub::BufferedPubSub;
use crate::composer::scene_composer::{ComposerStats, Publication, SceneComposer, SceneRequest};
use crate::composer::source::RenderableSource;
use crate::error::ComposeError;
use crate::merge::{DocumentMergeService, GlbMergeService, ModelSource};
use crate::scene_graph::SceneDocument;

/// Cloneable handle serializing access to one [`SceneComposer`].
///
/// Calls queue on a fair mutex and run one at a time in arrival order, so
/// none is dropped and each publishes on top of the previous one.
/// Observers subscribe without waiting for the queue.
pub struct SharedComposer<S: DocumentMergeService = GlbMergeService> {
    inner: Arc<Mutex<SceneComposer<S>>>,
    document: watch::Receiver<Arc<SceneDocument>>,
    source: watch::Receiver<Option<RenderableSource>>,
    publications: Arc<BufferedPubSub<Publication>>,
}

impl<S: DocumentMergeService> Clone for SharedComposer<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            document: self.document.clone(),
            source: self.source.clone(),
            publications: self.publications.clone(),
        }
    }
}

impl<S: DocumentMergeService> SharedComposer<S> {
    pub fn new(composer: SceneComposer<S>) -> Self {
        Self {
            document: composer.subscribe_document(),
            source: composer.subscribe_source(),
            publications: composer.publication_feed(),
            inner: Arc::new(Mutex::new(composer)),
        }
    }

    pub async fn load_model(
        &self,
        name: &str,
        source: impl Into<ModelSource>,
    ) -> Result<Arc<SceneDocument>, ComposeError> {
        let source = source.into();
        self.inner.lock().await.load_model(name, source).await
    }

    pub async fn remove_model(&self, name: &str) -> Result<Arc<SceneDocument>, ComposeError> {
        self.inner.lock().await.remove_model(name).await
    }

    pub async fn refresh_helpers(&self) -> Result<Arc<SceneDocument>, ComposeError> {
        self.inner.lock().await.refresh_helpers().await
    }

    pub async fn apply_batch(
        &self,
        requests: Vec<SceneRequest>,
    ) -> Result<Option<Arc<SceneDocument>>, ComposeError> {
        self.inner.lock().await.apply_batch(requests).await
    }

    pub async fn clear(&self, except: &[&str]) -> Result<Arc<SceneDocument>, ComposeError> {
        self.inner.lock().await.clear(except).await
    }

    pub async fn export(&self, name: &str) -> Result<Option<Vec<u8>>, ComposeError> {
        self.inner.lock().await.export(name).await
    }

    pub async fn stats(&self) -> ComposerStats {
        self.inner.lock().await.stats()
    }

    pub fn document(&self) -> Arc<SceneDocument> {
        self.document.borrow().clone()
    }

    pub fn source(&self) -> Option<RenderableSource> {
        self.source.borrow().clone()
    }

    pub fn subscribe_document(&self) -> watch::Receiver<Arc<SceneDocument>> {
        self.document.clone()
    }

    pub fn subscribe_source(&self) -> watch::Receiver<Option<RenderableSource>> {
        self.source.clone()
    }

    pub fn publications(&self) -> mpsc::UnboundedReceiver<Publication> {
        self.publications.subscribe(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset_pipeline::{write_glb, DocumentBuilder};
    use crate::config::ComposerConfig;
    use glam::Vec3;

    fn point_glb(at: Vec3) -> Vec<u8> {
        let mut builder = DocumentBuilder::new("point");
        builder.add_vertex(at);
        write_glb(&builder.build(), "test").unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_loads_are_all_applied() {
        let config = ComposerConfig {
            history_limit: 16,
            ..ComposerConfig::default()
        };
        let shared = SharedComposer::new(SceneComposer::new(config));

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let shared = shared.clone();
                tokio::spawn(async move {
                    shared
                        .load_model(&format!("part{}", i), point_glb(Vec3::splat(i as f32)))
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let doc = shared.document();
        assert_eq!(doc.unit_names("__unit").len(), 9);
        assert_eq!(shared.stats().await.publishes, 8);
        assert_eq!(shared.source().unwrap().generation(), 8);

        let mut history = shared.publications();
        let mut generations = Vec::new();
        while let Ok(publication) = history.try_recv() {
            generations.push(publication.source.generation());
        }
        assert_eq!(generations, (1..=8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn clear_and_export_go_through_the_queue() {
        let shared = SharedComposer::new(SceneComposer::new(ComposerConfig::default()));
        shared.load_model("kept", point_glb(Vec3::ZERO)).await.unwrap();
        shared.load_model("dropped", point_glb(Vec3::ONE)).await.unwrap();

        shared.clear(&["kept"]).await.unwrap();
        assert_eq!(shared.document().unit_names("__unit"), vec!["__helpers", "kept"]);
        assert!(shared.export("dropped").await.unwrap().is_none());
        assert!(shared.export("kept").await.unwrap().is_some());
    }
}
