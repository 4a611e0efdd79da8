use super::*;

/// Perspective or orthographic projection, mirroring the `projection`
/// field of the render-pass JSON schema (§6).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Projection {
    Perspective,
    Orthographic,
}

/// Per-pass camera snapshot and projection-plane setup (§4.6). Each pass
/// owns its own `Camera`, and therefore its own Halton batch/index, so
/// parallel workers never share jitter state (§5/§9).
#[derive(Clone, Debug)]
pub struct Camera {
    transform: Mat4,
    position: Point3,
    projection: Projection,
    plane_distance: f32,
    top_left: Point2,
    h_step: f32,
    v_step: f32,
    halton: halton::Batch,
}

/// Sample batch size for the camera's per-pixel jitter (§4.6).
const CAMERA_HALTON_BATCH: usize = 12_345;

impl Camera {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transform: Mat4,
        projection: Projection,
        plane_distance: f32,
        fov_deg: f32,
        orthographic_size: f32,
        image_size: (u32, u32),
    ) -> Self {
        let position = transform.transform_point(&Point3::origin());
        let (width, height) = (image_size.0 as f32, image_size.1 as f32);
        let d = plane_distance;

        let (top_left, bottom_right) = match projection {
            Projection::Perspective => {
                let alpha = (fov_deg / 2.0).to_radians();
                let beta = alpha * (width / height);

                let forward = Vec3::new(0.0, 0.0, d);
                let rescale_to_plane = |v: Vec3| v * (d / v.z);

                let rot_y = |v: Vec3, angle: f32| na::Rotation3::from_axis_angle(&Vec3::y_axis(), angle) * v;
                let rot_x = |v: Vec3, angle: f32| na::Rotation3::from_axis_angle(&Vec3::x_axis(), angle) * v;

                let left_dir = rot_y(forward, -beta);
                let right_dir = rot_y(forward, beta);
                let top_dir = rot_x(forward, -alpha);
                let bottom_dir = rot_x(forward, alpha);

                let left = rescale_to_plane(left_dir);
                let right = rescale_to_plane(right_dir);
                let top = rescale_to_plane(top_dir);
                let bottom = rescale_to_plane(bottom_dir);

                (
                    Point2::new(left.x, top.y),
                    Point2::new(right.x, bottom.y),
                )
            }
            Projection::Orthographic => {
                let half_width = orthographic_size * (width / height);
                (
                    Point2::new(-half_width, orthographic_size),
                    Point2::new(half_width, -orthographic_size),
                )
            }
        };

        let h_step = (bottom_right.x - top_left.x) / width;
        let v_step = (top_left.y - bottom_right.y) / height;

        Self {
            transform,
            position,
            projection,
            plane_distance: d,
            top_left,
            h_step,
            v_step,
            halton: halton::Batch::new(CAMERA_HALTON_BATCH),
        }
    }

    /// Resets the Halton index to 0, required for the determinism test in
    /// §8 (two calls at the same pixel after a reset must match).
    pub fn reset(&mut self) {
        self.halton.reset();
    }

    /// Build a camera ray for tile-local pixel `(x, y)` offset by
    /// `(xoff, yoff)` in the full image (§4.6's per-ray construction).
    pub fn ray(&mut self, xoff: u32, yoff: u32, x: u32, y: u32) -> Ray {
        let s = self.halton.next();

        let lx = self.top_left.x + self.h_step * (xoff + x) as f32 + self.h_step * s.x;
        let ly = self.top_left.y - self.v_step * (yoff + y) as f32 - self.v_step * s.y;

        let camera_space_origin = Point3::new(lx, ly, -self.plane_distance);
        let world_origin = self.transform.transform_point(&camera_space_origin);

        let dir = match self.projection {
            Projection::Perspective => normal(world_origin - self.position),
            Projection::Orthographic => {
                let world_dir = self.transform.transform_vector(&Vec3::new(0.0, 0.0, -1.0));
                normal(world_dir)
            }
        };

        let origin = match self.projection {
            Projection::Perspective => self.position,
            Projection::Orthographic => world_origin,
        };

        Ray::new(origin, dir, 0, (x as i32, y as i32))
    }

    pub fn position(&self) -> Point3 {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_camera() -> Camera {
        Camera::new(
            Mat4::identity(),
            Projection::Perspective,
            1.0,
            60.0,
            1.0,
            (64, 64),
        )
    }

    #[test]
    fn test_determinism_after_reset() {
        let mut camera = test_camera();
        let a = camera.ray(0, 0, 10, 10);
        camera.reset();
        let b = camera.ray(0, 0, 10, 10);
        assert_eq!(a.origin, b.origin);
        assert_eq!(a.dir.into_inner(), b.dir.into_inner());
    }

    #[test]
    fn test_orthographic_rays_are_parallel() {
        let mut camera = Camera::new(
            Mat4::identity(),
            Projection::Orthographic,
            1.0,
            60.0,
            2.0,
            (8, 8),
        );
        let a = camera.ray(0, 0, 0, 0);
        let b = camera.ray(0, 0, 7, 7);
        assert_eq!(a.dir.into_inner(), b.dir.into_inner());
        assert_ne!(a.origin, b.origin);
    }
}
