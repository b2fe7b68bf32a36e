use std::path::{Path, PathBuf};

use clap::Parser;
use glam::{Vec2, Vec4};
use sobel_outline::error::OutlineError;
use sobel_outline::options::Options;
use sobel_outline::renderer::filter::LayerMask;
use sobel_outline::renderer::frame::{FrameRenderer, RendererFeature};
use sobel_outline::renderer::material::MaterialLibrary;
use sobel_outline::renderer::outline::{
    register_builtin_materials, OutlineFeature,
};
use sobel_outline::renderer::target::TargetId;
use sobel_outline::software::{Image, Shape, SoftwareBackend, SoftwareScene};

/// Render a sample scene with and without silhouette outlines.
#[derive(Parser, Debug)]
#[command(name = "sobel-outline", version, about)]
struct Cli {
    /// Output width in pixels.
    #[arg(long, default_value_t = 960)]
    width: u32,
    /// Output height in pixels.
    #[arg(long, default_value_t = 540)]
    height: u32,
    /// Directory the PNGs are written to.
    #[arg(long, default_value = "out")]
    out_dir: PathBuf,
    /// TOML preset to load options from.
    #[arg(long)]
    preset: Option<PathBuf>,
    /// Layer names to outline; defaults to `Outlined` without a preset.
    #[arg(long, value_delimiter = ',')]
    layers: Option<Vec<String>>,
    /// Also write the options JSON schema next to the images.
    #[arg(long)]
    schema: bool,
}

fn sample_scene(width: u32, height: u32) -> SoftwareScene {
    let (w, h) = (width as f32, height as f32);
    let rect = |x0: f32, y0: f32, x1: f32, y1: f32| Shape::Rect {
        min: Vec2::new(x0 * w, y0 * h),
        max: Vec2::new(x1 * w, y1 * h),
    };

    let mut scene = SoftwareScene::new();
    scene.name_layer("Default", 0);
    scene.name_layer("Outlined", 8);
    let _ = scene.add(
        "floor",
        rect(0.0, 0.78, 1.0, 1.0),
        0,
        0.95,
        Vec4::new(0.28, 0.24, 0.2, 1.0),
    );
    let _ = scene.add(
        "crate",
        rect(0.08, 0.35, 0.3, 0.8),
        8,
        0.5,
        Vec4::new(0.7, 0.45, 0.2, 1.0),
    );
    let _ = scene.add(
        "orb",
        Shape::Circle {
            center: Vec2::new(0.5 * w, 0.5 * h),
            radius: 0.18 * h,
        },
        8,
        0.45,
        Vec4::new(0.25, 0.6, 0.35, 1.0),
    );
    let _ = scene.add(
        "pillar",
        rect(0.7, 0.12, 0.82, 0.8),
        8,
        0.6,
        Vec4::new(0.3, 0.35, 0.75, 1.0),
    );
    let _ = scene.add(
        "crate occluder",
        rect(0.2, 0.55, 0.4, 0.7),
        0,
        0.3,
        Vec4::new(0.5, 0.5, 0.5, 1.0),
    );
    let _ = scene.add(
        "lamp",
        rect(0.88, 0.1, 0.92, 0.78),
        0,
        0.7,
        Vec4::new(0.6, 0.6, 0.55, 1.0),
    );
    scene
}

fn load_options(
    cli: &Cli,
    scene: &SoftwareScene,
) -> Result<Options, OutlineError> {
    let mut options = match &cli.preset {
        Some(path) => {
            log::info!("loading preset {}", path.display());
            Options::load(path)?
        }
        None => Options::default(),
    };
    let layers = match (&cli.layers, &cli.preset) {
        (Some(layers), _) => Some(layers.clone()),
        (None, None) => Some(vec!["Outlined".to_owned()]),
        (None, Some(_)) => None,
    };
    if let Some(layers) = layers {
        let names: Vec<&str> = layers.iter().map(String::as_str).collect();
        options.outline.layer_mask = scene.layer_mask(&names);
        if options.outline.layer_mask == LayerMask::NOTHING {
            log::warn!("no known layer in {layers:?}, nothing is outlined");
        }
    }
    Ok(options)
}

fn write_png(image: &Image, path: &Path) -> Result<(), OutlineError> {
    let buffer = image::RgbaImage::from_raw(
        image.width(),
        image.height(),
        image.to_rgba8(),
    )
    .ok_or_else(|| {
        OutlineError::Export(format!(
            "pixel buffer size mismatch for {}",
            path.display()
        ))
    })?;
    buffer.save(path).map_err(|e| {
        OutlineError::Export(format!("{}: {e}", path.display()))
    })?;
    log::info!(
        "wrote {}x{} image to {}",
        image.width(),
        image.height(),
        path.display()
    );
    Ok(())
}

fn run(cli: &Cli) -> Result<(), OutlineError> {
    let scene = sample_scene(cli.width, cli.height);
    let options = load_options(cli, &scene)?;

    let mut library = MaterialLibrary::new();
    let _ = register_builtin_materials(&mut library);
    let config = options.outline.resolve(&library);
    let mask_id = TargetId::from_name(&config.render_target_name);

    let mut feature = OutlineFeature::new(config);
    feature.create();

    let mut backend = SoftwareBackend::new(scene, cli.width, cli.height);
    backend.set_retain_released(true);
    let frame = backend.begin_frame();
    let baseline = backend.camera_color().clone();

    let report = FrameRenderer::new().render_features(
        &mut [&mut feature as &mut dyn RendererFeature],
        &frame,
        &mut backend,
    );
    for (pass, error) in &report.failed {
        log::error!("pass '{pass}' failed: {error}");
    }
    log::info!(
        "executed {:?}, {} pixels changed, {:?}",
        report.executed,
        backend.camera_color().differing_pixels(&baseline).len(),
        backend.stats()
    );

    std::fs::create_dir_all(&cli.out_dir)?;
    write_png(&baseline, &cli.out_dir.join("baseline.png"))?;
    write_png(backend.camera_color(), &cli.out_dir.join("outlined.png"))?;
    if let Some(mask) = backend.released(mask_id) {
        write_png(mask, &cli.out_dir.join("mask.png"))?;
    }
    if cli.schema {
        let path = cli.out_dir.join("options.schema.json");
        let schema = serde_json::to_string_pretty(&Options::json_schema())
            .map_err(|e| OutlineError::Export(e.to_string()))?;
        std::fs::write(&path, schema)?;
        log::info!("wrote schema to {}", path.display());
    }
    Ok(())
}

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .filter_module("wgpu_core", log::LevelFilter::Warn)
        .filter_module("wgpu_hal", log::LevelFilter::Warn)
        .filter_module("naga", log::LevelFilter::Error)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
