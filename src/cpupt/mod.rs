use super::*;

pub mod bvh;
pub mod camera;
pub mod halton;
pub mod integrator;
pub mod light;

mod aabb;

use aabb::Aabb;

pub use camera::{Camera, Projection};
pub use integrator::{Settings, Stats};
pub use light::AreaLight;

/// Process-wide render state (§3). Created once per scene load by
/// `scene::build`; mutated only by `initialize`/`build_bvh`/`load_bvh`;
/// read-only during render passes (§5) — nothing here needs a lock, since
/// each worker owns its own `RenderContext` plus a per-pass `Camera`/
/// `AreaLight` copy.
pub struct RenderContext {
    pub triangles: Vec<Triangle>,
    pub bvh: bvh::Bvh,
    pub materials: Vec<Material>,
    pub textures: HashMap<String, Texture>,
    pub bvh_config: bvh::Config,
    pub stats: Stats,
    /// The scene's area light, discovered once at scene-build time (§3's
    /// render context owns it). `None` for scenes with no `is_light`
    /// geometry; render passes then fall back to a zero-emission light
    /// rather than erroring.
    pub area_light: Option<AreaLight>,
    /// The render-pass `renderKey` last seen by this context, used to
    /// detect a scene change and reset `stats` (§3/§6).
    pub last_render_key: Option<i64>,
}

impl RenderContext {
    /// Material lookup used by the integrator; falls back to a visible
    /// placeholder rather than panicking on an out-of-range index (§7),
    /// the same policy `scene::Scene::material` applies at scene-build
    /// time for a dangling `usemtl` reference.
    pub fn material(&self, index: u32) -> Material {
        self.materials
            .get(index as usize)
            .cloned()
            .unwrap_or_else(Material::debug_magenta)
    }

    /// Looks up the area light by scanning for the first `is_light`
    /// triangle and recovering a world transform/half-extents from its
    /// geometry, with emission taken from that triangle's material Kd
    /// (scaled later, per pass, by the `lightIntensity` setting) — the
    /// typed-flag version of §9's recommendation, done once at
    /// scene-build time rather than per-traversal string comparison.
    pub fn discover_area_light(&self) -> Option<AreaLight> {
        let light_triangle = self.triangles.iter().find(|t| t.is_light)?;
        let emission = self.material(light_triangle.material).diffuse;
        let center = light_triangle.center();
        let normal_dir = light_triangle.normal;

        // Triangle is one half of a right-angled split of the light's
        // rectangle, so its two legs (v1-v0 and v0-v2 reversed) give the
        // rectangle's axes and half-extents directly.
        let leg_u = light_triangle.edges[0];
        let leg_v = -light_triangle.edges[2];
        let half_u = leg_u.norm() / 2.0;
        let half_v = leg_v.norm() / 2.0;

        let u_axis = normal(leg_u);
        let v_axis = normal(leg_v);
        let w_axis = normal_dir;

        let rotation = Mat3::from_columns(&[u_axis.into_inner(), v_axis.into_inner(), w_axis.into_inner()]);
        let mut transform = Mat4::identity();
        transform.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation);
        transform = transform.append_translation(&center.coords);

        Some(AreaLight::new(transform, Vec2::new(half_u, half_v), emission))
    }

    /// Clones the discovered area light scaled by `intensity`, or a
    /// black placeholder if the scene has no emissive geometry — direct
    /// lighting then contributes nothing instead of panicking.
    pub fn light_for_pass(&self, intensity: f32) -> AreaLight {
        self.area_light
            .clone()
            .unwrap_or_else(|| AreaLight::new(Mat4::identity(), Vec2::new(1.0, 1.0), ColorRgb::BLACK))
            .with_intensity(intensity)
    }

    /// Resets `stats` when `key` differs from the last-seen render key —
    /// a host bumps the key to signal the scene changed underneath a
    /// long-lived context (§3).
    pub fn sync_render_key(&mut self, key: i64) {
        if self.last_render_key != Some(key) {
            self.stats = Stats::default();
            self.last_render_key = Some(key);
        }
    }

    pub fn rebuild_bvh(&mut self) {
        self.bvh = bvh::Bvh::build(&mut self.triangles, &self.bvh_config);
    }

    pub fn load_bvh(&mut self, bvh: bvh::Bvh) {
        bvh.reorder_to_match(&mut self.triangles);
        self.bvh = bvh;
    }
}
