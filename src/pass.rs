//! Pixel-loop driver (§4.9). A "pass" is one sample-per-pixel sweep over
//! a rectangular region of the image; `main.rs` fans several of these out
//! across threads with `rayon::scope`, each against its own `Camera`/
//! `AreaLight` copy so no mutable state is shared (§5). `RenderPass`
//! folds successive passes into a running average for progressive,
//! incremental refinement (§4.9/§6).

use super::*;

/// One pass's output over a rectangular sub-image, plus the ray count it
/// spent, for progress reporting (§6).
pub struct PassResult {
    pub xoff: u32,
    pub yoff: u32,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<ColorRgb>,
    pub stats: cpupt::Stats,
}

/// Renders one sample per pixel over `[xoff, xoff+width) x [yoff,
/// yoff+height)` of the full image. `camera`/`light` are owned (not
/// borrowed) since each pass gets its own, freshly seeded, Halton state.
#[allow(clippy::too_many_arguments)]
pub fn run_pass(
    context: &cpupt::RenderContext,
    camera: cpupt::Camera,
    light: cpupt::AreaLight,
    settings: &cpupt::Settings,
    xoff: u32,
    yoff: u32,
    width: u32,
    height: u32,
    seed: u64,
) -> PassResult {
    run_pass_with_progress(context, camera, light, settings, xoff, yoff, width, height, seed, &mut |_| {})
}

/// Same as `run_pass`, but calls `on_rays` with the running ray count
/// after every row — the ray-cast-stage half of §6's progress callback.
/// `api::render_pass_with_progress`/`api::incremental_step_with_progress`
/// drive a `progress::ProgressTracker` from this hook.
#[allow(clippy::too_many_arguments)]
pub fn run_pass_with_progress(
    context: &cpupt::RenderContext,
    mut camera: cpupt::Camera,
    mut light: cpupt::AreaLight,
    settings: &cpupt::Settings,
    xoff: u32,
    yoff: u32,
    width: u32,
    height: u32,
    seed: u64,
    on_rays: &mut dyn FnMut(u64),
) -> PassResult {
    let mut rng = rand_pcg::Pcg64Mcg::seed_from_u64(seed);
    let mut stats = cpupt::Stats::default();
    let mut pixels = Vec::with_capacity((width * height) as usize);

    for y in 0..height {
        for x in 0..width {
            let ray = camera.ray(xoff, yoff, x, y);
            let radiance = cpupt::integrator::trace(ray, context, settings, &mut rng, &mut light, &mut stats);
            pixels.push(radiance);
        }
        on_rays(stats.rays);
    }

    PassResult {
        xoff,
        yoff,
        width,
        height,
        pixels,
        stats,
    }
}

/// Gamma-corrects (if enabled) and quantizes a linear radiance buffer
/// into RGBA8, alpha always opaque (§4.9).
pub fn tonemap(pixels: &[ColorRgb], settings: &cpupt::Settings) -> Vec<[u8; 4]> {
    pixels
        .iter()
        .map(|&c| {
            let c = c.clamp01();
            let c = if settings.gamma_correction {
                c.powf(1.0 / settings.gamma)
            } else {
                c
            };
            let [r, g, b] = c.to_srgb8();
            [r, g, b, 255]
        })
        .collect()
}

/// Running average of a full image across successive passes, the
/// incremental-rendering state `api::init_incremental`/
/// `api::incremental_step` drive (§6).
pub struct RenderPass {
    pub width: u32,
    pub height: u32,
    accumulated: Vec<ColorRgb>,
    samples: u32,
}

impl RenderPass {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            accumulated: vec![ColorRgb::BLACK; (width * height) as usize],
            samples: 0,
        }
    }

    /// Folds one full-image sample (assembled from however many tiles
    /// produced it) into the running average.
    pub fn add_sample(&mut self, pixels: &[ColorRgb]) {
        assert_eq!(pixels.len(), self.accumulated.len());
        self.samples += 1;
        let n = self.samples as f32;
        for (acc, &new) in self.accumulated.iter_mut().zip(pixels) {
            *acc += (new - *acc) / n;
        }
    }

    pub fn sample_count(&self) -> u32 {
        self.samples
    }

    pub fn image(&self, settings: &cpupt::Settings) -> Vec<[u8; 4]> {
        tonemap(&self.accumulated, settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;

    fn single_triangle_context() -> cpupt::RenderContext {
        let material = Material {
            name: "White".to_owned(),
            diffuse: ColorRgb::new(0.8, 0.8, 0.8),
            ambient: ColorRgb::BLACK,
            specular: ColorRgb::BLACK,
            diffuse_map: None,
            ambient_map: None,
            specular_map: None,
        };
        let mut triangles = vec![Triangle::new(
            [
                Point3::new(-10.0, -1.0, -10.0),
                Point3::new(10.0, -1.0, -10.0),
                Point3::new(0.0, -1.0, 10.0),
            ],
            [Point2::origin(); 3],
            0,
            0,
            false,
        )];
        let bvh = cpupt::bvh::Bvh::build(&mut triangles, &cpupt::bvh::Config::default());
        cpupt::RenderContext {
            triangles,
            bvh,
            materials: vec![material],
            textures: HashMap::new(),
            bvh_config: cpupt::bvh::Config::default(),
            stats: cpupt::Stats::default(),
            area_light: None,
            last_render_key: None,
        }
    }

    #[test]
    fn test_run_pass_fills_every_pixel() {
        let context = single_triangle_context();
        let camera = cpupt::Camera::new(
            Mat4::new_translation(&Vec3::new(0.0, 2.0, 5.0)),
            cpupt::Projection::Perspective,
            1.0,
            60.0,
            1.0,
            (4, 4),
        );
        let light = cpupt::AreaLight::new(
            Mat4::new_translation(&Vec3::new(0.0, 5.0, 0.0)),
            Vec2::new(1.0, 1.0),
            ColorRgb::new(4.0, 4.0, 4.0),
        );
        let settings = cpupt::Settings::default();
        let result = run_pass(&context, camera, light, &settings, 0, 0, 4, 4, 0);
        assert_eq!(result.pixels.len(), 16);
    }

    #[test]
    fn test_render_pass_averages_samples() {
        let mut pass = RenderPass::new(2, 2);
        let ones = vec![ColorRgb::new(1.0, 1.0, 1.0); 4];
        let zeros = vec![ColorRgb::BLACK; 4];
        pass.add_sample(&ones);
        pass.add_sample(&zeros);
        for c in &pass.accumulated {
            approx::assert_ulps_eq!(c.red(), 0.5, max_ulps = 4);
        }
        assert_eq!(pass.sample_count(), 2);
    }
}
