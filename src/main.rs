use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use scene_composer::asset_pipeline::glbs;
use scene_composer::{ComposerConfig, SceneComposer};

#[derive(Parser, Debug)]
#[command(version, about = "Compose GLB models into one scene with bounding helpers")]
struct Args {
    /// Models to load, as `path` (named after the file stem) or `name=path`
    inputs: Vec<String>,

    /// Unit names to remove after loading
    #[arg(short, long)]
    remove: Vec<String>,

    /// Where to write the last published GLB
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Where to write every published GLB as a GLBS stream
    #[arg(long)]
    history: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn parse_input(input: &str) -> Result<(String, PathBuf)> {
    if let Some((name, path)) = input.split_once('=') {
        return Ok((name.to_string(), PathBuf::from(path)));
    }

    let path = PathBuf::from(input);
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| anyhow!("Cannot derive a model name from {}", input))?
        .to_string();
    Ok((name, path))
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ComposerConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ComposerConfig::default(),
    };

    let mut composer = SceneComposer::new(config);
    let mut history = composer.publications();

    for input in &args.inputs {
        let (name, path) = parse_input(input)?;
        log::info!("Loading {} from {}", name, path.display());
        composer
            .load_model(&name, path.as_path())
            .await
            .with_context(|| format!("Failed to load {}", input))?;
    }

    for name in &args.remove {
        log::info!("Removing {}", name);
        composer
            .remove_model(name)
            .await
            .with_context(|| format!("Failed to remove {}", name))?;
    }

    if composer.source().is_none() {
        composer.refresh_helpers().await.context("Failed to publish empty scene")?;
    }

    let bounds = composer.bounds();
    if bounds.is_empty(composer.config().empty_threshold) {
        log::info!("Scene has no content");
    } else {
        log::info!("Scene bounds: min {:?}, max {:?}", bounds.min, bounds.max);
    }

    if let Some(output) = &args.output {
        let source = composer
            .source()
            .ok_or_else(|| anyhow!("Nothing was published"))?;
        tokio::fs::write(output, source.glb())
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?;
        log::info!("Wrote {} to {}", source.handle(), output.display());
    }

    if let Some(path) = &args.history {
        let mut published = Vec::new();
        while let Ok(publication) = history.try_recv() {
            published.push(publication.source);
        }

        let mut file = tokio::fs::File::create(path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))?;
        glbs::write_glbs(&mut file, published.iter().map(|source| source.glb()))
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Wrote {} publications to {}", published.len(), path.display());
    }

    Ok(())
}
