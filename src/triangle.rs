use super::*;

/// A triangle carries everything the integrator and BVH builder need
/// precomputed at scene-build time: its normal, its three edges (in the
/// `v1-v0, v2-v1, v0-v2` order the Möller-Trumbore test below consumes),
/// its UVs, a material index, a stable build-order index used as a sort
/// tiebreaker, and whether it belongs to the scene's area light.
#[derive(Clone, Copy, Debug)]
pub struct Triangle {
    pub positions: [Point3; 3],
    pub normal: Normal,
    pub edges: [Vec3; 3],
    pub tex_coords: [Point2; 3],
    pub material: u32,
    pub index: u32,
    pub is_light: bool,
}

impl Triangle {
    pub fn new(
        positions: [Point3; 3],
        tex_coords: [Point2; 3],
        material: u32,
        index: u32,
        is_light: bool,
    ) -> Self {
        let [v0, v1, v2] = positions;
        let normal = normal((v1 - v0).cross(&(v2 - v0)));
        let edges = [v1 - v0, v2 - v1, v0 - v2];
        Self {
            positions,
            normal,
            edges,
            tex_coords,
            material,
            index,
            is_light,
        }
    }

    pub fn center(&self) -> Point3 {
        let [v0, v1, v2] = self.positions;
        Point3::from((v0.coords + v1.coords + v2.coords) / 3.0)
    }

    pub fn min(&self) -> Point3 {
        let [v0, v1, v2] = self.positions;
        Point3::new(
            v0.x.min(v1.x).min(v2.x),
            v0.y.min(v1.y).min(v2.y),
            v0.z.min(v1.z).min(v2.z),
        )
    }

    pub fn max(&self) -> Point3 {
        let [v0, v1, v2] = self.positions;
        Point3::new(
            v0.x.max(v1.x).max(v2.x),
            v0.y.max(v1.y).max(v2.y),
            v0.z.max(v1.z).max(v2.z),
        )
    }

    pub fn shortest_edge(&self) -> Vec3 {
        let [e0, e1, e2] = self.edges;
        [e0, e1, e2]
            .into_iter()
            .min_by(|a, b| a.norm().partial_cmp(&b.norm()).expect("NaN edge length"))
            .expect("triangle always has 3 edges")
    }

    pub fn middle_edge(&self) -> Vec3 {
        let mut edges = self.edges;
        edges.sort_by(|a, b| a.norm().partial_cmp(&b.norm()).expect("NaN edge length"));
        edges[1]
    }

    /// Möller-Trumbore with a back-face cull on the determinant. Returns
    /// `(t, u, v)`, `t < 0.0` signals a miss.
    pub fn intersect(&self, ray: &Ray) -> (f32, f32, f32) {
        const DET_EPSILON: f32 = 1e-4;

        let v0v2 = -self.edges[2];
        let pvec = ray.dir.cross(&v0v2);
        let det = self.edges[0].dot(&pvec);
        if det < DET_EPSILON {
            return (-1.0, 0.0, 0.0);
        }

        let inv_det = 1.0 / det;
        let tvec = ray.origin - self.positions[0];
        let u = tvec.dot(&pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return (-1.0, 0.0, 0.0);
        }

        let qvec = tvec.cross(&self.edges[0]);
        let v = ray.dir.dot(&qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return (-1.0, 0.0, 0.0);
        }

        let t = v0v2.dot(&qvec) * inv_det;
        (t, u, v)
    }

    pub fn interpolated_tex_coord(&self, u: f32, v: f32) -> Point2 {
        let w = 1.0 - u - v;
        Point2::from(
            self.tex_coords[0].coords * w + self.tex_coords[1].coords * u + self.tex_coords[2].coords * v,
        )
    }
}
