//! # Mugprint
//!
//! Command line front end: inspects mug models and renders design mockups.

mod args;
mod preview;

use std::error::Error;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use mugprint_core::compute::ThreadRunner;
use mugprint_core::material::{CpuMaterial, MaterialProperty, MaterialSemantic, MaterialValue};
use mugprint_core::mesh::generators::{generate_cylinder, generate_cylinder_untextured};
use mugprint_core::scene::{NodeTransform, Scene, SceneNode};
use mugprint_texturing::export::RenderSurface;
use mugprint_texturing::{
    DesignPipeline, MugprintConfig, SceneSink, describe_materials, export_design, export_frame,
};

use crate::args::{Cli, Command, RenderArgs};
use crate::preview::UnwrapPreview;

const DEFAULT_CONFIG_FILE: &str = "mugprint.ron";

type AppResult<T> = Result<T, Box<dyn Error>>;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    mugprint_texturing::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> AppResult<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Inspect { model } => inspect(&model, &config),
        Command::Render(args) => render(&args, &config),
    }
}

fn load_config(path: Option<&Path>) -> AppResult<MugprintConfig> {
    match path {
        Some(path) => Ok(MugprintConfig::load(path)?),
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            log::info!("Using {}", DEFAULT_CONFIG_FILE);
            Ok(MugprintConfig::load(DEFAULT_CONFIG_FILE)?)
        }
        None => Ok(MugprintConfig::default()),
    }
}

fn load_model(path: &Path) -> AppResult<Scene> {
    let bytes = std::fs::read(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    let document = mugprint_core::gltf::load_gltf(&bytes)?;
    let scene = document
        .into_default_scene()
        .ok_or_else(|| format!("{} contains no scene", path.display()))?;
    log::info!(
        "Loaded {} ({} nodes, {} primitives)",
        path.display(),
        scene.node_count(),
        scene.meshes.len()
    );
    Ok(scene)
}

/// Stand-in mug: a printable body and a handle without UVs.
fn procedural_mug() -> Scene {
    let body = Arc::new(
        CpuMaterial::new()
            .with_name("Caneca-corpo")
            .with_property(MaterialProperty {
                semantic: MaterialSemantic::BaseColorFactor,
                value: MaterialValue::Vec4([0.92, 0.92, 0.92, 1.0]),
            }),
    );
    let handle = Arc::new(CpuMaterial::new().with_name("Alca"));

    let meshes = vec![
        generate_cylinder(0.4, 0.95, 64)
            .with_material(body)
            .with_label("body"),
        generate_cylinder_untextured(0.06, 0.55, 16)
            .with_material(handle)
            .with_label("handle"),
    ];
    let mug = SceneNode::new()
        .with_name("Mug")
        .with_meshes(vec![0])
        .with_children(vec![
            SceneNode::new()
                .with_name("Handle")
                .with_transform(NodeTransform::IDENTITY.with_translation([0.46, 0.0, 0.0]))
                .with_meshes(vec![1]),
        ]);

    Scene::new()
        .with_name("procedural mug")
        .with_nodes(vec![mug])
        .with_meshes(meshes)
}

fn inspect(model: &Path, config: &MugprintConfig) -> AppResult<()> {
    let scene = load_model(model)?;
    let rows = describe_materials(&scene, &config.binder);
    if rows.is_empty() {
        println!("{}: no mesh primitives", model.display());
        return Ok(());
    }

    println!(
        "{:<20} {:>4} {:>4}  {:<24} {:<22} {:<4} {:<8} {}",
        "node", "slot", "mesh", "material", "base color", "uvs", "textured", "design"
    );
    for row in &rows {
        let [r, g, b, a] = row.base_color;
        println!(
            "{:<20} {:>4} {:>4}  {:<24} {:<22} {:<4} {:<8} {}",
            row.node.as_deref().unwrap_or("-"),
            row.slot,
            row.mesh_index,
            row.material.as_deref().unwrap_or("-"),
            format!("[{r:.2} {g:.2} {b:.2} {a:.2}]"),
            if row.has_uvs { "yes" } else { "no" },
            if row.textured { "yes" } else { "no" },
            if row.selected { "<- here" } else { "" },
        );
    }
    if !rows.iter().any(|r| r.selected) {
        log::warn!("No material slot would receive the design");
    }
    Ok(())
}

fn render(args: &RenderArgs, config: &MugprintConfig) -> AppResult<()> {
    let scene = match &args.model {
        Some(path) => load_model(path)?,
        None => procedural_mug(),
    };
    let spec = args.design_spec()?;

    let sink = SceneSink::new(scene, config.binder.clone());
    let mut pipeline = DesignPipeline::new(config.compositor.clone(), ThreadRunner, sink);
    pipeline.submit(spec);
    if !pipeline.is_settled() {
        pipeline.wait_latest();
    }
    let texture = pipeline
        .current()
        .ok_or("design produced no texture")?
        .clone();

    let mut surface =
        UnwrapPreview::new(args.width, args.height).with_preserve_drawing_buffer(!args.no_preserve_buffer);
    if let Some(background) = args.background {
        surface = surface.with_background(background.to_rgba());
    }
    surface.present(pipeline.sink().scene());
    export_frame(&mut surface, &args.out)?;

    if let Some(path) = &args.design_out {
        export_design(&texture, path)?;
    }
    Ok(())
}
