//! Broader scenario test (§8 scenario 5): a small rectangular room with a
//! floor, a ceiling, an occluder panel, and one downward-facing area light
//! embedded in the ceiling. Exercises `initialize` -> `build_bvh` ->
//! `render_pass` end to end and checks the qualitative claims a reader
//! would expect from a path tracer: a floor point with a clear line of
//! sight to the light reads bright, a floor point shadowed by the
//! occluder reads dark, and a ray aimed straight at the light's own face
//! reads as the light's emission color.

use lumenforge::{api, cpupt};
use nalgebra::Rotation3;

const WHITE_MTL: &str = "newmtl White\nKd 0.8 0.8 0.8\n";

/// Faces wound so each quad's geometric normal points into the room:
/// floor up, ceiling down, occluder down (same winding as the ceiling,
/// so shadow rays traveling upward from the floor are not back-face
/// culled), light down.
fn room_obj() -> &'static str {
    "v -3 0 -3\n\
     v 3 0 -3\n\
     v 3 0 3\n\
     v -3 0 3\n\
     v -3 4 3\n\
     v 3 4 3\n\
     v 3 4 -3\n\
     v -3 4 -3\n\
     v -0.5 3.99 0.5\n\
     v 0.5 3.99 0.5\n\
     v 0.5 3.99 -0.5\n\
     v -0.5 3.99 -0.5\n\
     v -3 2 3\n\
     v -0.5 2 3\n\
     v -0.5 2 -3\n\
     v -3 2 -3\n\
     usemtl White\n\
     f 1 4 3\n\
     f 1 3 2\n\
     f 5 8 7\n\
     f 5 7 6\n\
     f 13 16 15\n\
     f 13 15 14\n\
     usemtl Light\n\
     f 9 12 11\n\
     f 9 11 10\n"
}

fn scene_json() -> String {
    serde_json::json!({
        "scene": {
            "objBuffer": room_obj(),
            "mtlBuffer": WHITE_MTL.to_owned() + "newmtl Light\nKd 8 8 8\n",
            "useBVH": true,
            "bvhMaxLeafSize": 4,
            "bvhMaxDepth": 32,
        }
    })
    .to_string()
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

/// A downward-looking (`dir == -Y`) or upward-looking (`dir == +Y`)
/// orthographic camera centered above/below the origin at `height`.
fn vertical_camera(height: f32, looking_up: bool, size: f32) -> api::CameraDocument {
    let angle = if looking_up {
        std::f32::consts::FRAC_PI_2
    } else {
        -std::f32::consts::FRAC_PI_2
    };
    let transform = Rotation3::from_axis_angle(&lumenforge::Vec3::x_axis(), angle)
        .to_homogeneous()
        .append_translation(&lumenforge::Vec3::new(0.0, height, 0.0));
    api::CameraDocument {
        transform: row_major(transform),
        projection: cpupt::Projection::Orthographic,
        fov_deg: 60.0,
        orthographic_size: size,
        plane_distance: 1.0,
        rays_per_pixel: 1,
    }
}

fn pixel(image: &[u8], width: u32, x: u32, y: u32) -> (u8, u8, u8) {
    let i = ((y * width + x) * 4) as usize;
    (image[i], image[i + 1], image[i + 2])
}

#[test]
fn test_lit_floor_point_is_brighter_than_occluded_point() {
    let mut context = api::initialize(&scene_json()).unwrap();
    api::build_bvh(&mut context).unwrap();

    let width = 32;
    let height = 32;
    let doc = api::RenderPassDocument {
        width,
        height,
        camera: vertical_camera(3.0, false, 3.0),
        settings: cpupt::Settings {
            light_sample_rays: 32,
            bounce_limit: 0,
            gamma: 2.2,
            gamma_correction: true,
            light_intensity: 1.0,
            debug_light: false,
        },
        tile_size: 64,
        render_key: 0,
    };

    let result = api::render_pass(&mut context, &doc);
    assert_eq!(result.exit_code(), 0);

    // Pixel (16, 16) maps to world (x, z) ~= (0.09, -0.09): directly
    // under the light, with a clear shadow-ray path to it.
    let (lit_r, lit_g, lit_b) = pixel(&result.image_data, width, 16, 16);

    // Pixel (7, 16) maps to world (x, z) ~= (-1.6, -0.09): under the
    // occluder panel at y=2, whose span (x in [-3,-0.5]) blocks every
    // shadow ray toward the light's rectangle from this point.
    let (occ_r, occ_g, occ_b) = pixel(&result.image_data, width, 7, 16);

    assert!(
        lit_r > occ_r && lit_g > occ_g && lit_b > occ_b,
        "lit point ({lit_r},{lit_g},{lit_b}) should be brighter than occluded point ({occ_r},{occ_g},{occ_b})"
    );
    assert!(lit_r > 20, "lit floor point should receive visible direct light, got {lit_r}");
    assert!(occ_r < 10, "occluded floor point should read essentially black, got {occ_r}");
}

#[test]
fn test_emitter_face_pixel_reads_as_light_emission() {
    let mut context = api::initialize(&scene_json()).unwrap();
    api::build_bvh(&mut context).unwrap();

    let width = 8;
    let height = 8;
    let doc = api::RenderPassDocument {
        width,
        height,
        camera: vertical_camera(1.0, true, 0.3),
        settings: cpupt::Settings {
            light_sample_rays: 1,
            bounce_limit: 0,
            gamma: 2.2,
            gamma_correction: true,
            light_intensity: 1.0,
            debug_light: true,
        },
        tile_size: 64,
        render_key: 0,
    };

    let result = api::render_pass(&mut context, &doc);
    assert_eq!(result.exit_code(), 0);

    // The whole 0.3-unit-radius frame sits well within the light's
    // 0.5-unit half-extents, so every pixel in the frame should land on
    // the light's face and read back its (clamped) emission color.
    for y in 0..height {
        for x in 0..width {
            let (r, g, b) = pixel(&result.image_data, width, x, y);
            assert_eq!((r, g, b), (255, 255, 255), "emitter-face pixel ({x},{y}) should read as clamped white emission");
        }
    }
}
