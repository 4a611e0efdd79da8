use super::*;

/// Min/max corners stored as a 2-element array indexed by ray sign bits,
/// so the slab test below never branches on axis direction. Invariant:
/// `min <= max` componentwise.
#[repr(C)]
#[derive(Pod, Zeroable, Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    bounds: [Point3; 2],
}

impl Aabb {
    #[inline]
    pub fn new() -> Self {
        Self {
            bounds: [
                Vec3::repeat(f32::MAX).into(),
                Vec3::repeat(-f32::MAX).into(),
            ],
        }
    }

    #[inline]
    pub fn from_min_max(min: Point3, max: Point3) -> Self {
        Self { bounds: [min, max] }
    }

    pub fn from_points<'a, Iter>(points: Iter) -> Self
    where
        Iter: IntoIterator<Item = &'a Point3>,
    {
        let mut aabb = Self::new();
        for point in points {
            aabb.extend(point);
        }
        aabb
    }

    #[inline]
    pub fn min(&self) -> Point3 {
        self.bounds[0]
    }

    #[inline]
    pub fn max(&self) -> Point3 {
        self.bounds[1]
    }

    #[inline]
    pub fn center(&self) -> Point3 {
        na::center(&self.min(), &self.max())
    }

    #[inline]
    pub fn extents(&self) -> Vec3 {
        self.max() - self.min()
    }

    pub fn extend(&mut self, point: &Point3) {
        self.bounds[0] = self.min().coords.inf(&point.coords).into();
        self.bounds[1] = self.max().coords.sup(&point.coords).into();
    }

    pub fn merge(&mut self, other: &Aabb) {
        self.bounds[0] = self.min().inf(&other.min());
        self.bounds[1] = self.max().sup(&other.max());
    }

    pub fn merged(&self, other: &Aabb) -> Self {
        Self {
            bounds: [self.min().inf(&other.min()), self.max().sup(&other.max())],
        }
    }

    /// Surface area `2*(dx*dy + dy*dz + dz*dx)`, used by the SAH cost
    /// function (§4.4). Negative extents (a degenerate/empty box)
    /// contribute zero.
    pub fn surface_area(&self) -> f32 {
        let e = self.extents();
        if e.x < 0.0 || e.y < 0.0 || e.z < 0.0 {
            return 0.0;
        }
        2.0 * (e.x * e.y + e.y * e.z + e.z * e.x)
    }

    /// Slab test using the ray's precomputed inverse direction and sign
    /// bits (§4.1). Returns `(hit, tmin, tmax)`; a hit is reported even
    /// when `tmin < 0` (ray origin inside the box) — callers that need a
    /// directed hit must additionally check `tmax > 0`.
    pub fn intersect(&self, ray: &Ray) -> (bool, f32, f32) {
        let bounds = [self.min(), self.max()];

        let mut tmin = (bounds[ray.sign[0]].x - ray.origin.x) * ray.inv_dir.x;
        let mut tmax = (bounds[1 - ray.sign[0]].x - ray.origin.x) * ray.inv_dir.x;
        let tymin = (bounds[ray.sign[1]].y - ray.origin.y) * ray.inv_dir.y;
        let tymax = (bounds[1 - ray.sign[1]].y - ray.origin.y) * ray.inv_dir.y;

        if tmin > tymax || tymin > tmax {
            return (false, 0.0, 0.0);
        }
        if tymin > tmin {
            tmin = tymin;
        }
        if tymax < tmax {
            tmax = tymax;
        }

        let tzmin = (bounds[ray.sign[2]].z - ray.origin.z) * ray.inv_dir.z;
        let tzmax = (bounds[1 - ray.sign[2]].z - ray.origin.z) * ray.inv_dir.z;

        if tmin > tzmax || tzmin > tmax {
            return (false, 0.0, 0.0);
        }
        if tzmin > tmin {
            tmin = tzmin;
        }
        if tzmax < tmax {
            tmax = tzmax;
        }

        (true, tmin, tmax)
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_ulps_eq;

    /// "Axis-aligned unit cube at origin" (§8 scenario 1): side length 1,
    /// centered on the origin.
    fn unit_cube() -> Aabb {
        Aabb::from_min_max(Point3::new(-0.5, -0.5, -0.5), Point3::new(0.5, 0.5, 0.5))
    }

    #[test]
    fn test_intersect_hit_scenario_1() {
        let aabb = unit_cube();
        let ray = Ray::new(
            Point3::new(1.0, 0.0, 0.0),
            normal(Vec3::new(-1.0, 0.0, 0.0)),
            0,
            (0, 0),
        );
        let (hit, tmin, tmax) = aabb.intersect(&ray);
        assert!(hit);
        assert_ulps_eq!(tmin, 0.5, max_ulps = 4);
        assert_ulps_eq!(tmax, 1.5, max_ulps = 4);
    }

    #[test]
    fn test_intersect_miss_scenario_2() {
        let aabb = unit_cube();
        let ray = Ray::new(
            Point3::new(1.0, 0.501, 0.0),
            normal(Vec3::new(-1.0, 0.0, 0.0)),
            0,
            (0, 0),
        );
        let (hit, _, _) = aabb.intersect(&ray);
        assert!(!hit);
    }

    #[test]
    fn test_intersect_origin_inside() {
        let aabb = unit_cube();
        let ray = Ray::new(
            Point3::origin(),
            normal(Vec3::new(1.0, 0.0, 0.0)),
            0,
            (0, 0),
        );
        let (hit, tmin, tmax) = aabb.intersect(&ray);
        assert!(hit);
        assert!(tmin <= 0.0);
        assert!(tmax >= 0.0);
    }

    #[test]
    fn test_intersect_direction_reversal_swaps_signs() {
        let aabb = unit_cube();
        let origin = Point3::new(2.0, 0.0, 0.0);
        let forward = Ray::new(origin, normal(Vec3::new(-1.0, 0.0, 0.0)), 0, (0, 0));
        let backward = Ray::new(origin, normal(Vec3::new(1.0, 0.0, 0.0)), 0, (0, 0));
        let (hit_f, tmin_f, tmax_f) = aabb.intersect(&forward);
        let (hit_b, tmin_b, tmax_b) = aabb.intersect(&backward);
        assert!(hit_f);
        assert!(hit_b);
        assert_ulps_eq!(tmin_f, -tmax_b, max_ulps = 4);
        assert_ulps_eq!(tmax_f, -tmin_b, max_ulps = 4);
    }

    #[test]
    fn test_surface_area() {
        let aabb = Aabb::from_min_max(Point3::origin(), Point3::new(2.0, 3.0, 4.0));
        assert_ulps_eq!(aabb.surface_area(), 2.0 * (6.0 + 12.0 + 8.0), max_ulps = 4);
    }
}
