use super::*;

/// A rectangular area emitter (§3/§4.7). `transform` places a unit
/// `(-half, half)` quad in the XY-plane of local space into the world;
/// `normal` is the world-space emitting direction.
#[derive(Clone, Debug)]
pub struct AreaLight {
    transform: Mat4,
    half_extents: Vec2,
    emission: ColorRgb,
    normal: Normal,
    halton: halton::Batch,
}

/// Sample batch size for area-light rectangle sampling (§4.7).
const LIGHT_HALTON_BATCH: usize = 100_001;

impl AreaLight {
    pub fn new(transform: Mat4, half_extents: Vec2, emission: ColorRgb) -> Self {
        let normal = normal(transform.transform_vector(&Vec3::new(0.0, 0.0, 1.0)));
        Self {
            transform,
            half_extents,
            emission,
            normal,
            halton: halton::Batch::new(LIGHT_HALTON_BATCH),
        }
    }

    pub fn normal(&self) -> Normal {
        self.normal
    }

    pub fn emission(&self) -> ColorRgb {
        self.emission
    }

    /// Uniform-over-rectangle sample (§4.7): draw the next batch sample,
    /// map it to local coordinates, transform to world space, and return
    /// `(position, pdf)` with `pdf = 1 / area`.
    pub fn sample(&mut self) -> (Point3, f32) {
        let s = self.halton.next();
        let local = Point3::new(
            (2.0 * s.x - 1.0) * self.half_extents.x,
            (2.0 * s.y - 1.0) * self.half_extents.y,
            0.0,
        );
        let world = self.transform.transform_point(&local);
        let pdf = 1.0 / (4.0 * self.half_extents.x * self.half_extents.y);
        (world, pdf)
    }

    pub fn reset(&mut self) {
        self.halton.reset();
    }

    /// Scales emission by a per-pass intensity multiplier (the render-pass
    /// `lightIntensity` setting, §6) without disturbing the Halton state.
    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.emission = self.emission * intensity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_ulps_eq;

    #[test]
    fn test_samples_lie_in_rectangle() {
        let mut light = AreaLight::new(Mat4::identity(), Vec2::new(2.0, 3.0), ColorRgb::WHITE);
        for _ in 0..200 {
            let (p, pdf) = light.sample();
            assert!(p.x.abs() <= 2.0 + 1e-5);
            assert!(p.y.abs() <= 3.0 + 1e-5);
            assert_ulps_eq!(p.z, 0.0, max_ulps = 4);
            assert_ulps_eq!(pdf, 1.0 / 24.0, max_ulps = 4);
        }
    }

    #[test]
    fn test_normal_follows_transform() {
        let rotated = na::Rotation3::from_axis_angle(&Vec3::x_axis(), PI).to_homogeneous();
        let light = AreaLight::new(rotated, Vec2::new(1.0, 1.0), ColorRgb::WHITE);
        assert_ulps_eq!(light.normal().z, -1.0, max_ulps = 8);
    }
}
