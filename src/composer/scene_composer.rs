use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::composer::bounding::BoundingBoxCalculator;
use crate::composer::helpers::HelperSynthesizer;
use crate::composer::pubsub::BufferedPubSub;
use crate::composer::source::RenderableSource;
use crate::config::ComposerConfig;
use crate::error::ComposeError;
use crate::math::AABB;
use crate::merge::{DocumentMergeService, GlbMergeService, ModelSource};
use crate::scene_graph::SceneDocument;

/// What just happened to the working document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    /// Ordinary content changed, helpers are stale.
    ContentChanged,
    /// Helpers are up to date, the document only needs publishing.
    HelperPublished,
}

impl Change {
    fn combine(self, other: Change) -> Change {
        if self == Change::ContentChanged || other == Change::ContentChanged {
            Change::ContentChanged
        } else {
            Change::HelperPublished
        }
    }
}

#[derive(Debug, Clone)]
pub enum SceneRequest {
    Load { name: String, source: ModelSource },
    Remove { name: String },
}

impl SceneRequest {
    pub fn load(name: impl Into<String>, source: impl Into<ModelSource>) -> Self {
        SceneRequest::Load {
            name: name.into(),
            source: source.into(),
        }
    }

    pub fn remove(name: impl Into<String>) -> Self {
        SceneRequest::Remove { name: name.into() }
    }
}

/// One published state of the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Publication {
    pub source: RenderableSource,
    /// Bounds of the ordinary content at publication time.
    pub bounds: AABB,
    /// Unit names present, helpers included.
    pub units: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComposerStats {
    pub helper_reloads: u64,
    pub finalizes: u64,
    pub publishes: u64,
}

/// Owns the working scene document and keeps its helpers in sync.
///
/// Every successful mutating call publishes exactly once: the finalized
/// document, a fresh [`RenderableSource`] and a [`Publication`] event are
/// committed together. A failing call commits nothing.
pub struct SceneComposer<S: DocumentMergeService = GlbMergeService> {
    service: S,
    config: ComposerConfig,
    bounds: BoundingBoxCalculator,
    helpers: HelperSynthesizer,
    document: watch::Sender<Arc<SceneDocument>>,
    source: watch::Sender<Option<RenderableSource>>,
    publications: Arc<BufferedPubSub<Publication>>,
    generation: u64,
    stats: ComposerStats,
}

impl SceneComposer<GlbMergeService> {
    pub fn new(config: ComposerConfig) -> Self {
        let service = GlbMergeService::new(&config);
        Self::with_service(config, service)
    }
}

impl<S: DocumentMergeService> SceneComposer<S> {
    pub fn with_service(config: ComposerConfig, service: S) -> Self {
        let (document, _) = watch::channel(Arc::new(SceneDocument::new()));
        let (source, _) = watch::channel(None);

        Self {
            service,
            bounds: BoundingBoxCalculator::new(&config),
            helpers: HelperSynthesizer::new(&config),
            publications: Arc::new(BufferedPubSub::new(config.history_limit)),
            config,
            document,
            source,
            generation: 0,
            stats: ComposerStats::default(),
        }
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// The last published document.
    pub fn document(&self) -> Arc<SceneDocument> {
        self.document.borrow().clone()
    }

    /// The last published source, `None` before the first publication.
    pub fn source(&self) -> Option<RenderableSource> {
        self.source.borrow().clone()
    }

    pub fn subscribe_document(&self) -> watch::Receiver<Arc<SceneDocument>> {
        self.document.subscribe()
    }

    pub fn subscribe_source(&self) -> watch::Receiver<Option<RenderableSource>> {
        self.source.subscribe()
    }

    /// Every publication so far, then every future one.
    pub fn publications(&self) -> mpsc::UnboundedReceiver<Publication> {
        self.publications.subscribe(true)
    }

    pub fn publication_feed(&self) -> Arc<BufferedPubSub<Publication>> {
        self.publications.clone()
    }

    pub fn stats(&self) -> ComposerStats {
        self.stats
    }

    /// Bounds of the ordinary content of the published document.
    pub fn bounds(&self) -> AABB {
        self.bounds.compute(&self.document())
    }

    /// Merges `source` as unit `name` and publishes.
    ///
    /// Loading under the helper name replaces the helpers verbatim and skips
    /// regenerating them.
    pub async fn load_model(
        &mut self,
        name: &str,
        source: impl Into<ModelSource>,
    ) -> Result<Arc<SceneDocument>, ComposeError> {
        let merged = self
            .service
            .merge_partial(source.into(), name, self.document())
            .await?;
        let change = self.change_for(name);
        self.step(Arc::new(merged), change).await
    }

    /// Removes unit `name` and publishes, even when no such unit exists.
    pub async fn remove_model(&mut self, name: &str) -> Result<Arc<SceneDocument>, ComposeError> {
        let removed = self.service.remove_model(name, self.document()).await?;
        self.step(Arc::new(removed), Change::ContentChanged).await
    }

    /// Regenerates the helpers from the current content and publishes.
    pub async fn refresh_helpers(&mut self) -> Result<Arc<SceneDocument>, ComposeError> {
        let current = self.document();
        self.step(current, Change::ContentChanged).await
    }

    /// Applies all requests in order and publishes once at the end.
    ///
    /// An empty batch publishes nothing and returns `None`. Any failing
    /// request aborts the whole batch.
    pub async fn apply_batch(
        &mut self,
        requests: impl IntoIterator<Item = SceneRequest>,
    ) -> Result<Option<Arc<SceneDocument>>, ComposeError> {
        let mut doc = self.document();
        let mut change: Option<Change> = None;

        for request in requests {
            let next = match request {
                SceneRequest::Load { name, source } => {
                    let merged = self.service.merge_partial(source, &name, doc).await?;
                    (merged, self.change_for(&name))
                }
                SceneRequest::Remove { name } => {
                    let removed = self.service.remove_model(&name, doc).await?;
                    (removed, Change::ContentChanged)
                }
            };
            doc = Arc::new(next.0);
            change = Some(change.map_or(next.1, |change| change.combine(next.1)));
        }

        match change {
            Some(change) => self.step(doc, change).await.map(Some),
            None => Ok(None),
        }
    }

    /// Removes every unit except the helpers and `except` in one batch.
    ///
    /// Publishes exactly once, even when there is nothing to remove.
    pub async fn clear(&mut self, except: &[&str]) -> Result<Arc<SceneDocument>, ComposeError> {
        let requests: Vec<_> = self
            .document()
            .unit_names(&self.config.tag_key)
            .into_iter()
            .filter(|name| *name != self.config.helper_name && !except.contains(&name.as_str()))
            .map(SceneRequest::remove)
            .collect();
        log::debug!("Clearing {} units", requests.len());

        match self.apply_batch(requests).await? {
            Some(doc) => Ok(doc),
            None => self.refresh_helpers().await,
        }
    }

    /// Encodes unit `name` of the published document on its own.
    ///
    /// Returns `None` when no such unit exists. Publishes nothing.
    pub async fn export(&self, name: &str) -> Result<Option<Vec<u8>>, ComposeError> {
        let mut doc = self.document();
        let units = doc.unit_names(&self.config.tag_key);
        if !units.iter().any(|unit| unit == name) {
            log::warn!("Cannot export {}: no such unit", name);
            return Ok(None);
        }

        for other in units.iter().filter(|unit| *unit != name) {
            doc = Arc::new(self.service.remove_model(other, doc).await?);
        }
        let finalized = self.service.merge_finalize(doc).await?;
        self.service.to_buffer(Arc::new(finalized)).await.map(Some)
    }

    fn change_for(&self, name: &str) -> Change {
        if name == self.config.helper_name {
            Change::HelperPublished
        } else {
            Change::ContentChanged
        }
    }

    async fn step(
        &mut self,
        mut doc: Arc<SceneDocument>,
        mut change: Change,
    ) -> Result<Arc<SceneDocument>, ComposeError> {
        let mut reloaded = false;
        loop {
            match change {
                Change::ContentChanged => {
                    doc = self.reload_helpers(doc).await?;
                    reloaded = true;
                    change = Change::HelperPublished;
                }
                Change::HelperPublished => return self.show_current_doc(doc, reloaded).await,
            }
        }
    }

    async fn reload_helpers(&self, doc: Arc<SceneDocument>) -> Result<Arc<SceneDocument>, ComposeError> {
        let bounds = self.bounds.compute(&doc);
        if bounds.is_empty(self.config.empty_threshold) {
            log::debug!("No content to frame, drawing default helpers");
        } else {
            log::debug!(
                "Framing content: center {:?}, size {:?}",
                bounds.center(),
                bounds.size()
            );
        }

        let helpers = Arc::new(self.helpers.synthesize(&bounds));
        let glb = self.service.to_buffer(helpers).await?;
        let merged = self
            .service
            .merge_partial(glb.into(), &self.config.helper_name, doc)
            .await?;
        Ok(Arc::new(merged))
    }

    async fn show_current_doc(
        &mut self,
        doc: Arc<SceneDocument>,
        reloaded: bool,
    ) -> Result<Arc<SceneDocument>, ComposeError> {
        let finalized = Arc::new(self.service.merge_finalize(doc).await?);
        let glb = self.service.to_buffer(finalized.clone()).await?;

        let generation = self.generation + 1;
        let source = RenderableSource::new(generation, &self.config.source_prefix, glb);
        let publication = Publication {
            source: source.clone(),
            bounds: self.bounds.compute(&finalized),
            units: finalized.unit_names(&self.config.tag_key),
        };

        // Nothing below can fail.
        self.generation = generation;
        self.document.send_replace(finalized.clone());
        self.source.send_replace(Some(source));
        self.stats.helper_reloads += u64::from(reloaded);
        self.stats.finalizes += 1;
        self.stats.publishes += 1;

        log::info!(
            "Published {} ({} nodes, {} bytes, {} subscribers)",
            publication.source.handle(),
            finalized.nodes.len(),
            publication.source.glb().len(),
            self.publications.subscriber_count()
        );
        self.publications.publish(publication);

        Ok(finalized)
    }
}
