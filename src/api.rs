//! External interface layer (§6): the four entry points a host process
//! calls into — `initialize`, `build_bvh`, `load_bvh`, and
//! `render_pass`/`init_incremental`+`incremental_step` — plus the JSON
//! envelopes they speak. Every entry point returns `Result<_, Error>`;
//! nothing here panics on bad host input.

use super::*;

/// Host-facing result envelope (§6). `image_data` is raw RGBA8 bytes as
/// a JSON number array rather than base64: `serde_json` already handles
/// `Vec<u8>` natively, so this keeps the wire format simple without
/// pulling in a base64 dependency the rest of the stack has no other use
/// for.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RenderResult {
    #[serde(rename = "exitCode")]
    pub exit_code: i32,
    pub message: String,
    #[serde(rename = "imageData")]
    pub image_data: Vec<u8>,
}

impl RenderResult {
    pub fn ok(_width: u32, _height: u32, pixels: &[[u8; 4]]) -> Self {
        Self {
            exit_code: 0,
            message: String::new(),
            image_data: pixels.iter().flatten().copied().collect(),
        }
    }

    /// A black placeholder tile carrying the error message, built the
    /// same way regardless of which entry point failed (§7).
    pub fn err(width: u32, height: u32, error: &Error) -> Self {
        Self {
            exit_code: -1,
            message: error.to_string(),
            image_data: vec![0u8; (width * height * 4) as usize],
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }
}

/// Parses a scene JSON document and assembles a `RenderContext` with an
/// initial BVH already built (or a single-leaf fallback if the document
/// asks for `useBVH: false`) — a host that wants to skip straight to
/// rendering doesn't need a separate `build_bvh` call, but can still
/// call it again later (e.g. to get the serialized BVH for caching).
pub fn initialize(scene_json: &str) -> Result<cpupt::RenderContext> {
    let doc: loader::SceneDocument =
        serde_json::from_str(scene_json).map_err(|e| Error::BadInput(e.to_string()))?;
    let scene = scene::Scene::build(&doc)?;

    let bvh_config = cpupt::bvh::Config {
        enabled: doc.scene.use_bvh,
        max_leaf_size: doc.scene.bvh_max_leaf_size as u32,
        max_depth: doc.scene.bvh_max_depth as u32,
    };

    let mut triangles = scene.triangles;
    let bvh = cpupt::bvh::Bvh::build(&mut triangles, &bvh_config);

    info!(
        "initialized scene: {} triangles, {} BVH nodes",
        triangles.len(),
        bvh.node_count()
    );

    let mut context = cpupt::RenderContext {
        triangles,
        bvh,
        materials: scene.materials,
        textures: scene.textures,
        bvh_config,
        stats: cpupt::Stats::default(),
        area_light: None,
        last_render_key: None,
    };
    context.area_light = context.discover_area_light();

    Ok(context)
}

/// Rebuilds the BVH from `context`'s current triangle array and
/// `bvh_config`, and returns the serialized form so a host can cache it
/// and hand it back to `load_bvh` on a later run (§4.12).
pub fn build_bvh(context: &mut cpupt::RenderContext) -> Result<String> {
    context.rebuild_bvh();
    serde_json::to_string(&context.bvh).map_err(|e| Error::InvalidState(e.to_string()))
}

/// Loads a previously-serialized BVH and re-sorts `context`'s triangle
/// array in place to match its leaf ranges (§4.12's precondition).
pub fn load_bvh(context: &mut cpupt::RenderContext, bvh_json: &str) -> Result<()> {
    let bvh: cpupt::bvh::Bvh =
        serde_json::from_str(bvh_json).map_err(|e| Error::BadInput(e.to_string()))?;
    if bvh.node_count() == 0 {
        return Err(Error::BadInput("BVH has no nodes".to_owned()));
    }
    context.load_bvh(bvh);
    Ok(())
}

/// A camera's world transform, as a row-major 4x4 matrix, plus its
/// projection parameters (§6's render-pass schema).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CameraDocument {
    pub transform: [f32; 16],
    pub projection: cpupt::Projection,
    #[serde(rename = "fieldOfView", default = "default_fov")]
    pub fov_deg: f32,
    #[serde(rename = "orthographicSize", default = "default_ortho_size")]
    pub orthographic_size: f32,
    #[serde(rename = "projectionPlaneDistance", default = "default_plane_distance")]
    pub plane_distance: f32,
    /// Samples summed and averaged per pixel within a single `render_pass`
    /// call (§4.9) — distinct from incremental mode's one-sample-per-call
    /// accumulation, which a host drives by calling `incremental_step`
    /// repeatedly instead.
    #[serde(rename = "raysPerPixel", default = "default_rays_per_pixel")]
    pub rays_per_pixel: u32,
}

fn default_fov() -> f32 {
    60.0
}
fn default_ortho_size() -> f32 {
    1.0
}
fn default_plane_distance() -> f32 {
    1.0
}
fn default_rays_per_pixel() -> u32 {
    1
}

/// The render-pass JSON schema (§6): image size, camera, integrator
/// settings, and the tile size `main.rs`'s worker fan-out splits the
/// image into. There is no `light` field — the area light is discovered
/// once from scene geometry (§3) and lives on `RenderContext`; a pass
/// only scales it via `settings.lightIntensity`. `renderKey` lets a host
/// signal the scene changed underneath a long-lived context, resetting
/// `RenderContext::stats`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RenderPassDocument {
    pub width: u32,
    pub height: u32,
    pub camera: CameraDocument,
    #[serde(default)]
    pub settings: cpupt::Settings,
    #[serde(rename = "tileSize", default = "default_tile_size")]
    pub tile_size: u32,
    #[serde(rename = "renderKey", default)]
    pub render_key: i64,
}

fn default_tile_size() -> u32 {
    64
}

fn mat4_from_row_major(m: &[f32; 16]) -> Mat4 {
    Mat4::from_row_slice(m)
}

pub fn camera_from_document(doc: &CameraDocument, image_size: (u32, u32)) -> cpupt::Camera {
    cpupt::Camera::new(
        mat4_from_row_major(&doc.transform),
        doc.projection,
        doc.plane_distance,
        doc.fov_deg,
        doc.orthographic_size,
        image_size,
    )
}

/// Renders one full-image sample sequentially (no tiling) and returns
/// the RGBA8 result (§6's simplest `render_pass` shape). `main.rs` uses
/// the tiled `pass::run_pass` directly for the parallel path (§5); this
/// is the single-call convenience entry point.
pub fn render_pass(context: &mut cpupt::RenderContext, doc: &RenderPassDocument) -> RenderResult {
    render_pass_with_progress(context, doc, |_| {})
}

/// Same as `render_pass`, but drives `on_progress` at ~10% ray-count
/// intervals during the ray-cast stage, and once more at 100% after the
/// output stage (tonemapping), per §6's progress callback.
pub fn render_pass_with_progress(
    context: &mut cpupt::RenderContext,
    doc: &RenderPassDocument,
    on_progress: impl FnMut(progress::ProgressEvent),
) -> RenderResult {
    match render_pass_inner(context, doc, on_progress) {
        Ok(pixels) => RenderResult::ok(doc.width, doc.height, &pixels),
        Err(e) => RenderResult::err(doc.width, doc.height, &e),
    }
}

fn render_pass_inner(
    context: &mut cpupt::RenderContext,
    doc: &RenderPassDocument,
    on_progress: impl FnMut(progress::ProgressEvent),
) -> Result<Vec<[u8; 4]>> {
    context.sync_render_key(doc.render_key);
    let mut camera = camera_from_document(&doc.camera, (doc.width, doc.height));
    let light = context.light_for_pass(doc.settings.light_intensity);
    let samples = doc.camera.rays_per_pixel.max(1);

    let total_rays = estimated_total_rays(doc.width, doc.height, &doc.settings) * u64::from(samples);
    let mut tracker = progress::ProgressTracker::new(total_rays, doc.render_key, on_progress);
    let mut accumulated = pass::RenderPass::new(doc.width, doc.height);
    let mut rays_so_far = 0u64;
    for sample in 0..samples {
        let result = pass::run_pass_with_progress(
            context,
            camera.clone(),
            light.clone(),
            &doc.settings,
            0,
            0,
            doc.width,
            doc.height,
            u64::from(sample),
            &mut |rays| tracker.update("raycast", rays_so_far + rays),
        );
        rays_so_far += result.stats.rays;
        accumulated.add_sample(&result.pixels);
        camera.reset();
    }
    let pixels = accumulated.image(&doc.settings);
    tracker.complete("output", rays_so_far);
    Ok(pixels)
}

/// Rough ray-budget estimate used only to bucket progress events into
/// ~10% steps (§6) — one primary ray, `lightSampleRays` shadow rays, and
/// one indirect ray per pixel per bounce.
fn estimated_total_rays(width: u32, height: u32, settings: &cpupt::Settings) -> u64 {
    let per_pixel = 1 + u64::from(settings.light_sample_rays.max(1)) + u64::from(settings.bounce_limit) * 2;
    u64::from(width) * u64::from(height) * per_pixel
}

/// Progressive-rendering handle: one `RenderPass` accumulator plus the
/// camera/settings needed to produce each new sample (§4.9/§6). The
/// light is re-derived from the context each step, so a host that swaps
/// scenes mid-session (bumping `renderKey`) picks up its new light too.
pub struct IncrementalSession {
    pass: pass::RenderPass,
    camera: cpupt::Camera,
    settings: cpupt::Settings,
    render_key: i64,
}

pub fn init_incremental(doc: &RenderPassDocument) -> IncrementalSession {
    IncrementalSession {
        pass: pass::RenderPass::new(doc.width, doc.height),
        camera: camera_from_document(&doc.camera, (doc.width, doc.height)),
        settings: doc.settings,
        render_key: doc.render_key,
    }
}

/// Runs one more full-image sample and folds it into the session's
/// running average, returning the current RGBA8 image plus an exit
/// code (always 0 here — `InvalidState` would only arise from a host
/// bug, e.g. mismatched image dimensions, which `RenderPass::add_sample`
/// asserts against rather than silently corrupting the average).
pub fn incremental_step(session: &mut IncrementalSession, context: &mut cpupt::RenderContext) -> RenderResult {
    incremental_step_with_progress(session, context, |_| {})
}

/// Same as `incremental_step`, but drives `on_progress` at ~10% ray-count
/// intervals during this sample's ray-cast stage (§6).
pub fn incremental_step_with_progress(
    session: &mut IncrementalSession,
    context: &mut cpupt::RenderContext,
    on_progress: impl FnMut(progress::ProgressEvent),
) -> RenderResult {
    context.sync_render_key(session.render_key);
    let sample_seed = u64::from(session.pass.sample_count());
    let light = context.light_for_pass(session.settings.light_intensity);

    let total_rays = estimated_total_rays(session.pass.width, session.pass.height, &session.settings);
    let mut tracker = progress::ProgressTracker::new(total_rays, session.render_key, on_progress);
    let result = pass::run_pass_with_progress(
        context,
        session.camera.clone(),
        light,
        &session.settings,
        0,
        0,
        session.pass.width,
        session.pass.height,
        sample_seed,
        &mut |rays| tracker.update("raycast", rays),
    );
    session.pass.add_sample(&result.pixels);
    let image = session.pass.image(&session.settings);
    tracker.complete("output", result.stats.rays);
    RenderResult::ok(session.pass.width, session.pass.height, &image)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_major(m: Mat4) -> [f32; 16] {
        let mut out = [0.0f32; 16];
        for r in 0..4 {
            for c in 0..4 {
                out[r * 4 + c] = m[(r, c)];
            }
        }
        out
    }

    fn cube_scene_json() -> String {
        let doc = serde_json::json!({
            "scene": {
                "objBuffer": "v -1 0 -1\nv 1 0 -1\nv 1 0 1\nv -1 0 1\nusemtl White\nf 1 2 3 4\n",
                "mtlBuffer": "newmtl White\nKd 0.8 0.8 0.8\n",
                "useBVH": true,
                "bvhMaxLeafSize": 4,
                "bvhMaxDepth": 32
            }
        });
        doc.to_string()
    }

    #[test]
    fn test_initialize_builds_context() {
        let context = initialize(&cube_scene_json()).unwrap();
        assert_eq!(context.triangles.len(), 2);
        assert!(context.bvh.node_count() >= 1);
    }

    #[test]
    fn test_initialize_rejects_bad_json() {
        let err = initialize("not json").unwrap_err();
        assert!(matches!(err, Error::BadInput(_)));
    }

    #[test]
    fn test_build_bvh_then_load_bvh_roundtrips() {
        let mut context = initialize(&cube_scene_json()).unwrap();
        let serialized = build_bvh(&mut context).unwrap();
        load_bvh(&mut context, &serialized).unwrap();
        assert!(context.bvh.node_count() >= 1);
    }

    #[test]
    fn test_load_bvh_rejects_bad_json() {
        let mut context = initialize(&cube_scene_json()).unwrap();
        let err = load_bvh(&mut context, "{}").unwrap_err();
        assert!(matches!(err, Error::BadInput(_)));
    }

    #[test]
    fn test_render_pass_produces_image_data() {
        let mut context = initialize(&cube_scene_json()).unwrap();
        let doc = RenderPassDocument {
            width: 4,
            height: 4,
            camera: CameraDocument {
                transform: row_major(Mat4::new_translation(&Vec3::new(0.0, 2.0, 4.0))),
                projection: cpupt::Projection::Perspective,
                fov_deg: 60.0,
                orthographic_size: 1.0,
                plane_distance: 1.0,
                rays_per_pixel: 1,
            },
            settings: cpupt::Settings::default(),
            tile_size: 64,
            render_key: 0,
        };
        let result = render_pass(&mut context, &doc);
        assert_eq!(result.exit_code(), 0);
        assert_eq!(result.image_data.len(), 4 * 4 * 4);
    }

    #[test]
    fn test_incremental_session_accumulates() {
        let mut context = initialize(&cube_scene_json()).unwrap();
        let doc = RenderPassDocument {
            width: 2,
            height: 2,
            camera: CameraDocument {
                transform: row_major(Mat4::new_translation(&Vec3::new(0.0, 2.0, 4.0))),
                projection: cpupt::Projection::Perspective,
                fov_deg: 60.0,
                orthographic_size: 1.0,
                plane_distance: 1.0,
                rays_per_pixel: 1,
            },
            settings: cpupt::Settings::default(),
            tile_size: 64,
            render_key: 0,
        };
        let mut session = init_incremental(&doc);
        let first = incremental_step(&mut session, &mut context);
        let second = incremental_step(&mut session, &mut context);
        assert_eq!(first.exit_code(), 0);
        assert_eq!(second.exit_code(), 0);
        assert_eq!(session.pass.sample_count(), 2);
    }

    #[test]
    fn test_render_key_change_resets_stats() {
        let mut context = initialize(&cube_scene_json()).unwrap();
        context.stats.rays = 1000;
        context.sync_render_key(1);
        assert_eq!(context.stats.rays, 1000);
        context.sync_render_key(2);
        assert_eq!(context.stats.rays, 0);
    }

    #[test]
    fn test_render_pass_with_progress_emits_events() {
        let mut context = initialize(&cube_scene_json()).unwrap();
        let doc = RenderPassDocument {
            width: 16,
            height: 16,
            camera: CameraDocument {
                transform: row_major(Mat4::new_translation(&Vec3::new(0.0, 2.0, 4.0))),
                projection: cpupt::Projection::Perspective,
                fov_deg: 60.0,
                orthographic_size: 1.0,
                plane_distance: 1.0,
                rays_per_pixel: 1,
            },
            settings: cpupt::Settings::default(),
            tile_size: 64,
            render_key: 7,
        };
        let mut events = vec![];
        let result = render_pass_with_progress(&mut context, &doc, |e| events.push(e));
        assert_eq!(result.exit_code(), 0);
        assert!(!events.is_empty(), "expected at least one progress event");
        assert!(events.iter().all(|e| e.task_id == 7));
        let last = events.last().unwrap();
        assert_eq!(last.event, "output");
        assert!((last.progress - 1.0).abs() < 1e-3 || last.progress <= 1.0);
    }
}
