use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use approx::assert_relative_eq;
use glam::{Quat, Vec3};

use scene_composer::asset_pipeline::{glbs, read_glb, write_glb, DocumentBuilder};
use scene_composer::composer::helpers::{AXES_NODE, GRID_BOX_NODE};
use scene_composer::composer::{BoundingBoxCalculator, HelperSynthesizer};
use scene_composer::config::BoundsMode;
use scene_composer::error::CodecError;
use scene_composer::math::bounds::SENTINEL;
use scene_composer::scene_graph::Transform;
use scene_composer::{
    ComposeError, ComposerConfig, DocumentMergeService, GlbMergeService, ModelSource,
    SceneComposer, SceneDocument, SceneRequest,
};

/// Twelve edges of the axis-aligned cube between -1 and 1.
fn cube_glb() -> Vec<u8> {
    let corners = [
        Vec3::new(-1.0, -1.0, -1.0),
        Vec3::new(1.0, -1.0, -1.0),
        Vec3::new(1.0, 1.0, -1.0),
        Vec3::new(-1.0, 1.0, -1.0),
        Vec3::new(-1.0, -1.0, 1.0),
        Vec3::new(1.0, -1.0, 1.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(-1.0, 1.0, 1.0),
    ];
    let mut builder = DocumentBuilder::new("cube");
    builder
        .add_face(&corners[..4], &[[0, 1, 2], [0, 2, 3]])
        .add_face(&corners[4..], &[[0, 1, 2], [0, 2, 3]]);
    for i in 0..4 {
        builder.add_edge(&[corners[i], corners[i + 4]]);
    }
    write_glb(&builder.build(), "tests").unwrap()
}

fn node_scale(doc: &SceneDocument, name: &str) -> Vec3 {
    let index = doc.get_node_by_name(name).unwrap();
    doc.nodes[index].transform.scale()
}

fn helper_nodes(doc: &SceneDocument, config: &ComposerConfig) -> SceneDocument {
    let mut helpers = SceneDocument::new();
    for (_, node) in doc.nodes_in_unit(&config.tag_key, &config.helper_name) {
        let mut node = node.clone();
        node.mesh = node.mesh.map(|mesh| helpers.add_mesh(doc.meshes[mesh].clone()));
        helpers.add_node(node, None);
    }
    helpers
}

/// Delegates to [`GlbMergeService`] but can be told to fail finalizing.
#[derive(Default)]
struct FlakyService {
    inner: GlbMergeService,
    fail_finalize: AtomicBool,
}

impl DocumentMergeService for FlakyService {
    fn merge_partial(
        &self,
        source: ModelSource,
        name: &str,
        doc: Arc<SceneDocument>,
    ) -> impl Future<Output = Result<SceneDocument, ComposeError>> + Send {
        self.inner.merge_partial(source, name, doc)
    }

    fn remove_model(
        &self,
        name: &str,
        doc: Arc<SceneDocument>,
    ) -> impl Future<Output = Result<SceneDocument, ComposeError>> + Send {
        self.inner.remove_model(name, doc)
    }

    fn merge_finalize(
        &self,
        doc: Arc<SceneDocument>,
    ) -> impl Future<Output = Result<SceneDocument, ComposeError>> + Send {
        let fail = self.fail_finalize.load(Ordering::SeqCst);
        let finalize = self.inner.merge_finalize(doc);
        async move {
            if fail {
                return Err(ComposeError::Serialization(CodecError::Invalid(
                    "finalize disabled".to_string(),
                )));
            }
            finalize.await
        }
    }

    fn to_buffer(
        &self,
        doc: Arc<SceneDocument>,
    ) -> impl Future<Output = Result<Vec<u8>, ComposeError>> + Send {
        self.inner.to_buffer(doc)
    }
}

#[test]
fn empty_document_has_sentinel_bounds_and_default_helpers() {
    let config = ComposerConfig::default();
    let bounds = BoundingBoxCalculator::new(&config).compute(&SceneDocument::new());

    assert_eq!(bounds.min, Vec3::splat(SENTINEL));
    assert_eq!(bounds.max, Vec3::splat(-SENTINEL));
    assert!(bounds.is_empty(config.empty_threshold));

    let helpers = HelperSynthesizer::new(&config).synthesize(&bounds);
    assert!(node_scale(&helpers, GRID_BOX_NODE).is_finite());
}

#[tokio::test]
async fn unit_cube_is_framed_by_helpers() {
    let mut composer = SceneComposer::new(ComposerConfig::default());
    let doc = composer.load_model("cube", cube_glb()).await.unwrap();

    let bounds = composer.bounds();
    assert_relative_eq!(bounds.center().length(), 0.0);
    assert_relative_eq!(bounds.size().x, 2.0);
    assert_relative_eq!(bounds.size().y, 2.0);
    assert_relative_eq!(bounds.size().z, 2.0);

    assert_eq!(node_scale(&doc, AXES_NODE), Vec3::ONE);
    assert_eq!(node_scale(&doc, GRID_BOX_NODE), Vec3::splat(2.0));
}

#[tokio::test]
async fn helpers_do_not_influence_bounds() {
    let config = ComposerConfig::default();
    let mut composer = SceneComposer::new(config.clone());
    composer.load_model("cube", cube_glb()).await.unwrap();
    let before = composer.bounds();

    // Huge helpers loaded verbatim must not grow the box.
    let mut huge = DocumentBuilder::new("huge");
    huge.add_edge(&[Vec3::splat(-1000.0), Vec3::splat(1000.0)]);
    composer
        .load_model(&config.helper_name, write_glb(&huge.build(), "tests").unwrap())
        .await
        .unwrap();

    assert_eq!(composer.bounds(), before);
}

#[tokio::test]
async fn refreshing_twice_yields_identical_helpers() {
    let config = ComposerConfig::default();
    let mut composer = SceneComposer::new(config.clone());
    composer.load_model("cube", cube_glb()).await.unwrap();

    let first = composer.refresh_helpers().await.unwrap();
    let second = composer.refresh_helpers().await.unwrap();

    assert_eq!(helper_nodes(&first, &config), helper_nodes(&second, &config));
    assert_eq!(first, second);
}

#[tokio::test]
async fn every_operation_publishes_exactly_once() {
    let mut composer = SceneComposer::new(ComposerConfig::default());
    let mut publications = composer.publications();

    composer.load_model("a", cube_glb()).await.unwrap();
    composer.load_model("b", cube_glb()).await.unwrap();
    composer.remove_model("a").await.unwrap();
    composer.remove_model("never-loaded").await.unwrap();
    composer.refresh_helpers().await.unwrap();

    let mut units = Vec::new();
    while let Ok(publication) = publications.try_recv() {
        units.push(publication.units);
    }
    assert_eq!(
        units,
        vec![
            vec!["__helpers", "a"],
            vec!["__helpers", "a", "b"],
            vec!["__helpers", "b"],
            vec!["__helpers", "b"],
            vec!["__helpers", "b"],
        ]
    );
    assert_eq!(composer.stats().publishes, 5);
    assert_eq!(composer.source().unwrap().generation(), 5);
}

#[tokio::test]
async fn loading_helpers_directly_skips_regeneration() {
    let config = ComposerConfig::default();
    let mut composer = SceneComposer::new(config.clone());
    composer.load_model("cube", cube_glb()).await.unwrap();
    assert_eq!(composer.stats().helper_reloads, 1);

    composer
        .load_model(&config.helper_name, cube_glb())
        .await
        .unwrap();

    let stats = composer.stats();
    assert_eq!(stats.helper_reloads, 1);
    assert_eq!(stats.finalizes, 2);
    assert_eq!(stats.publishes, 2);
}

#[tokio::test]
async fn removing_the_only_model_still_publishes() {
    let config = ComposerConfig::default();
    let mut composer = SceneComposer::new(config.clone());
    composer.load_model("cube", cube_glb()).await.unwrap();

    let doc = composer.remove_model("cube").await.unwrap();

    assert!(composer.bounds().is_empty(config.empty_threshold));
    assert_eq!(doc.unit_names(&config.tag_key), vec![config.helper_name.clone()]);
    assert_eq!(node_scale(&doc, GRID_BOX_NODE), Vec3::ONE);
    assert_eq!(composer.stats().publishes, 2);
}

#[tokio::test]
async fn failures_leave_published_state_untouched() {
    let mut composer =
        SceneComposer::with_service(ComposerConfig::default(), FlakyService::default());
    composer.load_model("cube", cube_glb()).await.unwrap();
    let document = composer.document();
    let source = composer.source();

    let err = composer
        .load_model("broken", b"not a model".to_vec())
        .await
        .unwrap_err();
    assert!(err.is_merge_failure());

    composer.service().fail_finalize.store(true, Ordering::SeqCst);
    let err = composer.remove_model("cube").await.unwrap_err();
    assert!(err.is_serialization_failure());

    assert_eq!(composer.document(), document);
    assert_eq!(composer.source(), source);
    assert_eq!(composer.stats().publishes, 1);

    composer.service().fail_finalize.store(false, Ordering::SeqCst);
    composer.remove_model("cube").await.unwrap();
    assert_eq!(composer.source().unwrap().generation(), 2);
}

#[tokio::test]
async fn batch_publishes_once() {
    let mut composer = SceneComposer::new(ComposerConfig::default());
    let mut publications = composer.publications();

    composer
        .apply_batch(vec![
            SceneRequest::load("a", cube_glb()),
            SceneRequest::load("b", cube_glb()),
            SceneRequest::load("c", cube_glb()),
        ])
        .await
        .unwrap();

    assert_eq!(publications.recv().await.unwrap().units.len(), 4);
    assert!(publications.try_recv().is_err());
}

#[tokio::test]
async fn published_glbs_decode_and_stream() {
    let mut composer = SceneComposer::new(ComposerConfig::default());
    composer.load_model("cube", cube_glb()).await.unwrap();
    composer.refresh_helpers().await.unwrap();

    let history: Vec<_> = composer
        .publication_feed()
        .history()
        .into_iter()
        .map(|publication| publication.source)
        .collect();
    let mut stream = Vec::new();
    glbs::write_glbs(&mut stream, history.iter().map(|source| source.glb()))
        .await
        .unwrap();

    let entries = glbs::split_glbs(&stream).unwrap();
    assert_eq!(entries.len(), 2);
    let decoded = read_glb(entries[1]).unwrap();
    let current = composer.document();
    assert_eq!(decoded.nodes.len(), current.nodes.len());
    assert_eq!(decoded.unit_names("__unit"), current.unit_names("__unit"));
    assert_eq!(node_scale(&decoded, GRID_BOX_NODE), Vec3::splat(2.0));
}

#[tokio::test]
async fn empty_document_round_trips_through_the_service() {
    let service = GlbMergeService::default();
    let glb = service.to_buffer(Arc::new(SceneDocument::new())).await.unwrap();

    let merged = service
        .merge_partial(glb.into(), "empty", Arc::new(SceneDocument::new()))
        .await
        .unwrap();
    assert!(merged.is_empty());

    let reencoded = service.to_buffer(Arc::new(merged)).await.unwrap();
    let mut composer = SceneComposer::new(ComposerConfig::default());
    composer.load_model("empty", reencoded).await.unwrap();
    assert_eq!(composer.stats().publishes, 1);
}

#[tokio::test]
async fn publish_history_is_bounded() {
    let config = ComposerConfig {
        history_limit: 3,
        ..ComposerConfig::default()
    };
    let mut composer = SceneComposer::new(config);
    let mut live = composer.publications();

    for _ in 0..200 {
        composer.load_model("cube", cube_glb()).await.unwrap();
    }

    let retained: Vec<_> = composer
        .publication_feed()
        .history()
        .iter()
        .map(|publication| publication.source.generation())
        .collect();
    assert_eq!(retained, vec![198, 199, 200]);

    let mut delivered = 0;
    while live.try_recv().is_ok() {
        delivered += 1;
    }
    assert_eq!(delivered, 200);
}

#[tokio::test]
async fn rotated_model_bounds_follow_bounds_mode() {
    let rotated = Transform::from_trs(
        Vec3::ZERO,
        Quat::from_rotation_y(std::f32::consts::FRAC_PI_4),
        Vec3::ONE,
    );
    let mut builder = DocumentBuilder::new("rotated").with_transform(rotated);
    builder.add_edge(&[Vec3::splat(-1.0), Vec3::splat(1.0)]);
    let glb = write_glb(&builder.build(), "tests").unwrap();

    // Two-corner default: the rotated extremes collapse onto z = 0.
    let mut composer = SceneComposer::new(ComposerConfig::default());
    composer.load_model("rotated", glb.clone()).await.unwrap();
    let extremes = composer.bounds();
    assert_relative_eq!(extremes.size().x, 2.0 * std::f32::consts::SQRT_2, epsilon = 1e-5);
    assert_relative_eq!(extremes.size().y, 2.0, epsilon = 1e-5);
    assert_relative_eq!(extremes.size().z, 0.0, epsilon = 1e-5);

    let config = ComposerConfig {
        bounds_mode: BoundsMode::AllCorners,
        ..ComposerConfig::default()
    };
    let mut composer = SceneComposer::new(config);
    composer.load_model("rotated", glb).await.unwrap();
    let corners = composer.bounds();
    assert_relative_eq!(corners.size().z, 2.0 * std::f32::consts::SQRT_2, epsilon = 1e-5);
}
