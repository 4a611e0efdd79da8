#![deny(future_incompatible)]
#![deny(nonstandard_style)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::many_single_char_names,
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::too_many_arguments
)]

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use lumenforge::{api, cpupt, pass, ColorRgb};
use rayon::prelude::*;

/// Renders a scene JSON document through one or more passes and writes
/// the result to a PNG, demonstrating the full `initialize` ->
/// `build_bvh` -> tiled `render_pass` pipeline (§5/§6) end to end.
#[derive(clap::Parser)]
#[clap(author, version, about = "Offline Monte-Carlo path tracer")]
struct Args {
    /// Path to a scene JSON document (§3's `SceneDocument` schema).
    scene: PathBuf,

    /// Path to a render-pass JSON document (§6's `RenderPassDocument`
    /// schema). Defaults to a single perspective pass over the whole
    /// scene's bounds if omitted.
    #[clap(long)]
    pass: Option<PathBuf>,

    /// Output PNG path.
    #[clap(long, default_value = "render.png")]
    output: PathBuf,

    /// Number of progressive samples to accumulate (§4.9).
    #[clap(long, default_value_t = 1)]
    samples: u32,

    /// Square tile size the image is split into for the parallel
    /// worker fan-out (§5).
    #[clap(long, default_value_t = 64)]
    tile_size: u32,

    /// Load a previously-serialized BVH instead of building one.
    #[clap(long)]
    bvh: Option<PathBuf>,

    /// Write the built BVH to this path after rendering, serialized as
    /// JSON (§4.12).
    #[clap(long)]
    save_bvh: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    run(args)
}

fn run(args: Args) -> Result<()> {
    let scene_json = fs::read_to_string(&args.scene)
        .with_context(|| format!("reading scene file {}", args.scene.display()))?;
    let mut context = api::initialize(&scene_json).context("initializing scene")?;

    if let Some(bvh_path) = &args.bvh {
        let bvh_json = fs::read_to_string(bvh_path)
            .with_context(|| format!("reading BVH file {}", bvh_path.display()))?;
        api::load_bvh(&mut context, &bvh_json).context("loading BVH")?;
        info!("loaded BVH from {}", bvh_path.display());
    } else {
        let serialized = api::build_bvh(&mut context).context("building BVH")?;
        if let Some(save_path) = &args.save_bvh {
            fs::write(save_path, serialized).context("writing BVH file")?;
        }
    }

    let doc: api::RenderPassDocument = match &args.pass {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading render-pass file {}", path.display()))?;
            serde_json::from_str(&text).context("parsing render-pass document")?
        }
        None => default_pass_document(&context),
    };

    let mut render_pass = pass::RenderPass::new(doc.width, doc.height);
    let tile_size = args.tile_size.max(1);

    let progress = ProgressBar::new(u64::from(args.samples));
    progress.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} samples ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    for sample in 0..args.samples {
        let pixels = render_sample(&context, &doc, tile_size, u64::from(sample));
        render_pass.add_sample(&pixels);
        progress.inc(1);
    }
    progress.finish_and_clear();

    let image = render_pass.image(&doc.settings);
    write_png(&args.output, doc.width, doc.height, &image)
        .with_context(|| format!("writing output PNG {}", args.output.display()))?;
    info!(
        "wrote {} ({} samples accumulated)",
        args.output.display(),
        render_pass.sample_count()
    );

    Ok(())
}

/// Splits the image into `tile_size`-square tiles and renders one
/// sample across all of them in parallel with `rayon::scope`, each
/// thread calling `pass::run_pass` against its own cloned `Camera`/
/// `AreaLight` (§5). Results are assembled back into full-image row-major
/// order once every tile completes.
fn render_sample(
    context: &cpupt::RenderContext,
    doc: &api::RenderPassDocument,
    tile_size: u32,
    seed: u64,
) -> Vec<ColorRgb> {
    let camera = api::camera_from_document(&doc.camera, (doc.width, doc.height));
    let light = context.light_for_pass(doc.settings.light_intensity);

    let mut tiles = vec![];
    let mut yoff = 0;
    while yoff < doc.height {
        let height = tile_size.min(doc.height - yoff);
        let mut xoff = 0;
        while xoff < doc.width {
            let width = tile_size.min(doc.width - xoff);
            tiles.push((xoff, yoff, width, height));
            xoff += tile_size;
        }
        yoff += tile_size;
    }

    let results: Vec<pass::PassResult> = tiles
        .into_par_iter()
        .enumerate()
        .map(|(i, (xoff, yoff, width, height))| {
            pass::run_pass(
                context,
                camera.clone(),
                light.clone(),
                &doc.settings,
                xoff,
                yoff,
                width,
                height,
                seed ^ (i as u64),
            )
        })
        .collect();

    let mut image = vec![ColorRgb::BLACK; (doc.width * doc.height) as usize];
    for tile in results {
        for row in 0..tile.height {
            let src_start = (row * tile.width) as usize;
            let src = &tile.pixels[src_start..src_start + tile.width as usize];
            let dst_start = ((tile.yoff + row) * doc.width + tile.xoff) as usize;
            image[dst_start..dst_start + tile.width as usize].copy_from_slice(src);
        }
    }
    image
}

fn default_pass_document(context: &cpupt::RenderContext) -> api::RenderPassDocument {
    let (min, max) = scene_bounds(context);
    let center = lumenforge::Point3::from((min.coords + max.coords) / 2.0);
    let radius = (max - min).norm().max(1.0);
    let eye = center + lumenforge::Vec3::new(0.0, radius * 0.3, radius * 1.5);

    api::RenderPassDocument {
        width: 256,
        height: 256,
        camera: api::CameraDocument {
            transform: row_major(lumenforge::Mat4::new_translation(&eye.coords)),
            projection: cpupt::Projection::Perspective,
            fov_deg: 45.0,
            orthographic_size: radius,
            plane_distance: 1.0,
            rays_per_pixel: 1,
        },
        settings: cpupt::Settings::default(),
        tile_size: 64,
        render_key: 0,
    }
}

fn scene_bounds(context: &cpupt::RenderContext) -> (lumenforge::Point3, lumenforge::Point3) {
    if context.triangles.is_empty() {
        return (lumenforge::Point3::origin(), lumenforge::Point3::origin());
    }
    let mut min = context.triangles[0].min();
    let mut max = context.triangles[0].max();
    for triangle in &context.triangles[1..] {
        let tmin = triangle.min();
        let tmax = triangle.max();
        min = lumenforge::Point3::new(min.x.min(tmin.x), min.y.min(tmin.y), min.z.min(tmin.z));
        max = lumenforge::Point3::new(max.x.max(tmax.x), max.y.max(tmax.y), max.z.max(tmax.z));
    }
    (min, max)
}

fn row_major(m: lumenforge::Mat4) -> [f32; 16] {
    let mut out = [0.0f32; 16];
    for r in 0..4 {
        for c in 0..4 {
            out[r * 4 + c] = m[(r, c)];
        }
    }
    out
}

fn write_png(path: &std::path::Path, width: u32, height: u32, pixels: &[[u8; 4]]) -> Result<()> {
    let file = fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    let mut encoder = png::Encoder::new(writer, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    let bytes: Vec<u8> = pixels.iter().flatten().copied().collect();
    writer.write_image_data(&bytes)?;
    Ok(())
}
