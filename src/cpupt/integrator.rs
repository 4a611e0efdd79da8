use super::*;

/// Ray-tracing statistics counters, carried on the render context (§3).
/// Writable, but only by a single worker at a time — no locking required
/// (§5).
#[derive(Clone, Copy, Default, Debug, Serialize, Deserialize)]
pub struct Stats {
    pub rays: u64,
}

/// Per-pass tunables named in the render-pass JSON schema's `settings`
/// object (§6): `lightSampleRays`, `bounceLimit`, `gamma`,
/// `gammaCorrection`, `lightIntensity`, `debugLight`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub light_sample_rays: u32,
    pub bounce_limit: u32,
    pub gamma: f32,
    pub gamma_correction: bool,
    /// Scalar multiplier applied to the scene's discovered area-light
    /// emission for this pass (§6) — the area light itself has no
    /// per-pass JSON representation, only this knob.
    pub light_intensity: f32,
    /// When set, a camera ray that lands directly on the light's
    /// geometry returns its (scaled) emission verbatim instead of
    /// running the full integrator — a quick way to confirm light
    /// placement without reasoning about indirect bounces.
    pub debug_light: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            light_sample_rays: 16,
            bounce_limit: 1,
            gamma: 2.2,
            gamma_correction: true,
            light_intensity: 1.0,
            debug_light: false,
        }
    }
}

/// Walks `bvh.root()`, incrementing `stats`' ray counter on every call
/// (§4.8's raycast primitive).
fn raycast(ray: &Ray, bvh: &bvh::Bvh, triangles: &[Triangle], stats: &mut Stats) -> Option<(bvh::Hit, Point3)> {
    stats.rays += 1;
    let hit = bvh.intersect(ray, triangles)?;
    let point = ray.origin + ray.dir.into_inner() * hit.t;
    Some((hit, point))
}

/// Uniform point in the unit ball via rejection sampling, flipped onto
/// the hemisphere around `normal` if it lands on the wrong side, then
/// normalized (§4.8 step 3 — literally as specified, not importance
/// sampled).
fn hemisphere_sample(normal: Normal, rng: &mut impl rand::Rng) -> Normal {
    loop {
        let p = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        if p.norm_squared() > 1.0 || p.norm_squared() < 1e-12 {
            continue;
        }
        let p = if p.dot(&normal) < 0.0 { -p } else { p };
        return super::normal(p);
    }
}

/// Traces a single camera ray and returns a non-negative radiance (§4.8,
/// §8's non-negativity invariant). Iterative, not recursive: a bounce
/// count above a few hundred would blow a call stack, this won't.
#[allow(clippy::too_many_arguments)]
pub fn trace(
    camera_ray: Ray,
    context: &super::RenderContext,
    settings: &Settings,
    rng: &mut impl rand::Rng,
    light: &mut light::AreaLight,
    stats: &mut Stats,
) -> ColorRgb {
    let mut shading_terms: Vec<ColorRgb> = vec![];
    let mut brdf_terms: Vec<ColorRgb> = vec![];
    let mut current_dir = camera_ray.dir;
    let mut indirect_counter = 0u32;

    let Some((mut hit, mut hit_point)) = raycast(&camera_ray, &context.bvh, &context.triangles, stats) else {
        return ColorRgb::BLACK;
    };
    let mut ray = camera_ray;

    if settings.debug_light && context.triangles[hit.triangle_index as usize].is_light {
        return light.emission();
    }

    loop {
        let triangle = &context.triangles[hit.triangle_index as usize];
        let hit_normal = triangle.normal;

        // 1. Direct illumination at hit (next-event estimation).
        let mut direct = ColorRgb::BLACK;
        for _ in 0..settings.light_sample_rays.max(1) {
            let (light_pos, pdf) = light.sample();
            let shadow = light_pos - hit_point;
            let distance = shadow.norm();
            if distance < 1e-6 {
                continue;
            }
            let s_hat = normal(shadow);

            let light_incident = s_hat.dot(&light.normal());
            if light_incident >= 0.0 {
                // Light back-faces (or grazes) the sample direction.
                continue;
            }

            let shadow_origin = hit_point + hit_normal.into_inner() * 1e-4;
            let shadow_ray = Ray::new(shadow_origin, s_hat, ray.bounce + 1, ray.pixel);
            let occluded = match raycast(&shadow_ray, &context.bvh, &context.triangles, stats) {
                None => false,
                Some((shadow_hit, _)) => {
                    let shadow_triangle = &context.triangles[shadow_hit.triangle_index as usize];
                    shadow_hit.t < distance && !shadow_triangle.is_light
                }
            };
            if occluded {
                continue;
            }

            let theta = f32::max(0.0, s_hat.dot(&hit_normal));
            let theta_l = f32::max(0.0, -light_incident);
            let material = context.material(triangle.material);
            direct += material.diffuse * light.emission() * (theta_l * theta / (distance * distance * pdf * PI));
        }
        let direct = (direct / settings.light_sample_rays.max(1) as f32).clamp01();
        shading_terms.push(direct);

        // 2. Termination.
        if indirect_counter >= settings.bounce_limit {
            brdf_terms.push(ColorRgb::BLACK);
            break;
        }

        // 3. Indirect sample.
        let sample = hemisphere_sample(hit_normal, rng);
        let bounce_origin = hit_point + hit_normal.into_inner() * 1e-4;
        let bounce_ray = Ray::new(bounce_origin, sample, ray.bounce + 1, ray.pixel);
        let Some((next_hit, next_point)) = raycast(&bounce_ray, &context.bvh, &context.triangles, stats) else {
            brdf_terms.push(ColorRgb::BLACK);
            break;
        };

        // 4. BRDF term.
        let theta = sample.dot(&hit_normal);
        let phi = -current_dir.dot(&sample);
        let pdf_cos = phi.cos() / PI;
        let material = context.material(triangle.material);
        let brdf = if pdf_cos.abs() > 1e-6 {
            material.diffuse * (theta.cos() / (PI * pdf_cos))
        } else {
            ColorRgb::BLACK
        };
        brdf_terms.push(brdf);

        current_dir = sample;
        indirect_counter += 1;
        ray = bounce_ray;
        hit = next_hit;
        hit_point = next_point;
    }

    // Back-to-front composition (§4.8): each bounce's BRDF term gets
    // multiplied into the direct+indirect radiance of the bounce after
    // it, so the final value folds the whole chain
    // `L = L_d + f*(L_d' + f'*(...))`.
    for i in (0..shading_terms.len().saturating_sub(1)).rev() {
        brdf_terms[i] = brdf_terms[i] * (shading_terms[i + 1] + brdf_terms[i + 1]);
    }

    shading_terms[0] + brdf_terms[0]
}
