use super::*;

/// A split plane: the axis it cuts along and the scalar position on that
/// axis (the midpoint between the two triangle centers straddling the
/// split, §4.4).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub axis: Vec3,
    pub w: f32,
}

/// One node of the BVH. Interior nodes store `[left, right]` child
/// indices and the split plane used to produce them; leaves store the
/// `[start, end]` (inclusive) range into the scene's permuted triangle
/// array. `depth`/`index` are the builder's bookkeeping, assigned in
/// build order by a global counter (§4.3).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        depth: u32,
        index: u32,
        bounds: SerAabb,
        start: u32,
        end: u32,
    },
    Interior {
        depth: u32,
        index: u32,
        bounds: SerAabb,
        left: u32,
        right: u32,
        plane: Plane,
    },
}

/// `Aabb` is `Pod`/`Zeroable` for bytemuck's sake, which rules out derives
/// like `Serialize`; this is the plain-data mirror `Node` serializes with.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerAabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl From<Aabb> for SerAabb {
    fn from(aabb: Aabb) -> Self {
        Self {
            min: aabb.min().coords.into(),
            max: aabb.max().coords.into(),
        }
    }
}

impl From<SerAabb> for Aabb {
    fn from(s: SerAabb) -> Self {
        Aabb::from_min_max(Point3::from(s.min), Point3::from(s.max))
    }
}

impl Node {
    pub fn bounds(&self) -> Aabb {
        match *self {
            Node::Leaf { bounds, .. } | Node::Interior { bounds, .. } => bounds.into(),
        }
    }

    pub fn depth(&self) -> u32 {
        match *self {
            Node::Leaf { depth, .. } | Node::Interior { depth, .. } => depth,
        }
    }

    pub fn index(&self) -> u32 {
        match *self {
            Node::Leaf { index, .. } | Node::Interior { index, .. } => index,
        }
    }
}

/// BVH construction knobs, carried on the render context (§3). `enabled =
/// false` forces a single root leaf spanning the whole array — a
/// brute-force fallback expressed as a (degenerate) BVH rather than a
/// special case elsewhere in the pipeline.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Config {
    pub enabled: bool,
    pub max_leaf_size: u32,
    pub max_depth: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            max_leaf_size: 4,
            max_depth: 32,
        }
    }
}

/// Binary tree over a permuted, contiguous triangle array. A scene with
/// `T` triangles produces at most `2T-1` nodes (§5).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bvh {
    nodes: Vec<Node>,
}

/// An intermediate owned tree built by recursion; flattened into `Bvh`'s
/// contiguous `Vec<Node>` afterwards so node indices are assigned in a
/// single, unambiguous pre-order pass.
enum BuildNode {
    Leaf {
        bounds: Aabb,
        start: u32,
        end: u32,
    },
    Interior {
        bounds: Aabb,
        left: Box<BuildNode>,
        right: Box<BuildNode>,
        plane: Plane,
    },
}

impl Bvh {
    /// Recursive top-down SAH builder operating in-place on `triangles`
    /// via `[start, end]` index ranges (§4.3), followed by a flatten pass
    /// that assigns final node indices in build order.
    pub fn build(triangles: &mut [Triangle], config: &Config) -> Self {
        if triangles.is_empty() {
            return Self {
                nodes: vec![Node::Leaf {
                    depth: 0,
                    index: 0,
                    bounds: Aabb::new().into(),
                    start: 0,
                    end: 0,
                }],
            };
        }

        let build_root = build_recursive(triangles, 0, (triangles.len() - 1) as u32, 0, config);
        let mut nodes = Vec::with_capacity(2 * triangles.len() - 1);
        flatten(&build_root, 0, &mut nodes);
        Self { nodes }
    }

    pub fn root(&self) -> u32 {
        0
    }

    pub fn node(&self, index: u32) -> &Node {
        &self.nodes[index as usize]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Recursive front-to-back-agnostic traversal (§4.5): descend into
    /// both children whenever their AABB could improve on `best`, culling
    /// back-facing triangles at the leaves. No explicit stack is used;
    /// recursion depth is bounded by `max_depth` (§4.3).
    pub fn intersect(&self, ray: &Ray, triangles: &[Triangle]) -> Option<Hit> {
        let mut best: Option<Hit> = None;
        self.intersect_node(self.root(), ray, triangles, &mut best);
        best
    }

    fn intersect_node(&self, index: u32, ray: &Ray, triangles: &[Triangle], best: &mut Option<Hit>) {
        match *self.node(index) {
            Node::Leaf { start, end, .. } => {
                for i in start..=end {
                    let triangle = &triangles[i as usize];
                    if triangle.normal.dot(&ray.dir) > 0.0 {
                        continue;
                    }
                    let (t, u, v) = triangle.intersect(ray);
                    let better = t > 0.0
                        && match best {
                            Some(hit) => t < hit.t,
                            None => true,
                        };
                    if better {
                        *best = Some(Hit {
                            t,
                            u,
                            v,
                            triangle_index: i,
                        });
                    }
                }
            }
            Node::Interior { left, right, .. } => {
                let best_t = best.as_ref().map_or(f32::MAX, |h| h.t);
                let left_bounds = self.node(left).bounds();
                let (left_hit, left_tmin, left_tmax) = left_bounds.intersect(ray);
                if left_hit && left_tmin < best_t && left_tmax > 0.0 {
                    self.intersect_node(left, ray, triangles, best);
                }

                let best_t = best.as_ref().map_or(f32::MAX, |h| h.t);
                let right_bounds = self.node(right).bounds();
                let (right_hit, right_tmin, right_tmax) = right_bounds.intersect(ray);
                if right_hit && right_tmin < best_t && right_tmax > 0.0 {
                    self.intersect_node(right, ray, triangles, best);
                }
            }
        }
    }

    /// `[start, end]` coverage of every leaf (§8's leaf-coverage
    /// invariant: the union must cover `[0, |triangles|-1]` exactly once).
    pub fn leaf_ranges(&self) -> Vec<(u32, u32)> {
        fn walk(bvh: &Bvh, index: u32, out: &mut Vec<(u32, u32)>) {
            match *bvh.node(index) {
                Node::Leaf { start, end, .. } => out.push((start, end)),
                Node::Interior { left, right, .. } => {
                    walk(bvh, left, out);
                    walk(bvh, right, out);
                }
            }
        }
        let mut out = vec![];
        walk(self, self.root(), &mut out);
        out
    }

    fn subtree_start(&self, index: u32) -> u32 {
        match *self.node(index) {
            Node::Leaf { start, .. } => start,
            Node::Interior { left, .. } => self.subtree_start(left),
        }
    }

    fn subtree_end(&self, index: u32) -> u32 {
        match *self.node(index) {
            Node::Leaf { end, .. } => end,
            Node::Interior { right, .. } => self.subtree_end(right),
        }
    }

    /// Re-sort `triangles` in place to match this BVH's leaf ranges after
    /// deserialization (§4.12, §6's `load_bvh` precondition). Walks the
    /// tree and re-permutes each interior node's subtree range by its
    /// stored split plane, mirroring the original builder's sort step
    /// rather than re-running SAH selection.
    pub fn reorder_to_match(&self, triangles: &mut [Triangle]) {
        fn walk(bvh: &Bvh, index: u32, triangles: &mut [Triangle]) {
            let Node::Interior {
                left, right, plane, ..
            } = *bvh.node(index)
            else {
                return;
            };
            let lo = bvh.subtree_start(left);
            let hi = bvh.subtree_end(right);
            triangles[lo as usize..=hi as usize].sort_by(|a, b| {
                let ka = plane.axis.dot(&a.center().coords);
                let kb = plane.axis.dot(&b.center().coords);
                ka.partial_cmp(&kb)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.index.cmp(&b.index))
            });
            walk(bvh, left, triangles);
            walk(bvh, right, triangles);
        }
        walk(self, self.root(), triangles);
    }
}

fn node_bounds(triangles: &[Triangle], start: u32, end: u32) -> Aabb {
    let mut bounds = Aabb::new();
    for triangle in &triangles[start as usize..=end as usize] {
        bounds.extend(&triangle.positions[0]);
        bounds.extend(&triangle.positions[1]);
        bounds.extend(&triangle.positions[2]);
    }
    bounds
}

fn build_recursive(triangles: &mut [Triangle], start: u32, end: u32, depth: u32, config: &Config) -> BuildNode {
    let bounds = node_bounds(triangles, start, end);
    let count = end - start + 1;

    if count <= config.max_leaf_size || depth >= config.max_depth || !config.enabled {
        return BuildNode::Leaf { bounds, start, end };
    }

    let Some(plane) = select_split_plane(triangles, start, end) else {
        // Degenerate: fall back to the range midpoint (§4.3 step 4, §4.4).
        let mid = start + (end - start) / 2;
        return split_at(triangles, start, end, mid + 1, depth, bounds, default_plane(), config);
    };

    // Sort the range by axis-dot-center so the split cleanly partitions it
    // (§4.3 step 3), ties broken by triangle index for determinism (§4.3's
    // stability note).
    sort_range(triangles, start, end, &plane);

    // First index at which side-of-plane changes (§4.3 step 4).
    let side = |t: &Triangle| plane.axis.dot(&t.center().coords) - plane.w;
    let mut split = None;
    for i in start..end {
        if side(&triangles[i as usize]) < 0.0 && side(&triangles[(i + 1) as usize]) >= 0.0 {
            split = Some(i + 1);
            break;
        }
    }
    let split = match split {
        Some(s) if s > start && s <= end => s,
        // Split index coincides with either end: fall back to midpoint.
        _ => start + (end - start) / 2 + 1,
    };

    split_at(triangles, start, end, split, depth, bounds, plane, config)
}

#[allow(clippy::too_many_arguments)]
fn split_at(
    triangles: &mut [Triangle],
    start: u32,
    end: u32,
    split: u32,
    depth: u32,
    bounds: Aabb,
    plane: Plane,
    config: &Config,
) -> BuildNode {
    let left = build_recursive(triangles, start, split - 1, depth + 1, config);
    let right = build_recursive(triangles, split, end, depth + 1, config);
    BuildNode::Interior {
        bounds,
        left: Box::new(left),
        right: Box::new(right),
        plane,
    }
}

fn default_plane() -> Plane {
    Plane {
        axis: Vec3::x(),
        w: 0.0,
    }
}

fn sort_range(triangles: &mut [Triangle], start: u32, end: u32, plane: &Plane) {
    triangles[start as usize..=end as usize].sort_by(|a, b| {
        let ka = plane.axis.dot(&a.center().coords);
        let kb = plane.axis.dot(&b.center().coords);
        ka.partial_cmp(&kb)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });
}

/// SAH split-plane selection (§4.4): for each axis, sort the range by
/// `axis . center`, sweep forward/backward to get per-position left/right
/// AABB areas, and pick the split position with lowest
/// `left_area[i-1]*i + right_area[i]*(count-i)`. Ties go to the earlier
/// axis, then the lower index. Returns `None` if the range can't produce
/// an interior split (caller falls back to the midpoint).
fn select_split_plane(triangles: &[Triangle], start: u32, end: u32) -> Option<Plane> {
    let count = (end - start + 1) as usize;
    if count < 2 {
        return None;
    }

    let mut best: Option<(f32, Vec3, f32)> = None;

    for &axis in &[Vec3::x(), Vec3::y(), Vec3::z()] {
        let mut indices = (start..=end).collect::<Vec<_>>();
        indices.sort_by(|&a, &b| {
            let ka = axis.dot(&triangles[a as usize].center().coords);
            let kb = axis.dot(&triangles[b as usize].center().coords);
            ka.partial_cmp(&kb)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(triangles[a as usize].index.cmp(&triangles[b as usize].index))
        });

        let mut left_area = vec![0.0f32; count];
        let mut running = Aabb::new();
        for (i, &ti) in indices.iter().enumerate() {
            let t = &triangles[ti as usize];
            running.extend(&t.positions[0]);
            running.extend(&t.positions[1]);
            running.extend(&t.positions[2]);
            left_area[i] = running.surface_area();
        }

        let mut right_area = vec![0.0f32; count];
        let mut running = Aabb::new();
        for i in (0..count).rev() {
            let t = &triangles[indices[i] as usize];
            running.extend(&t.positions[0]);
            running.extend(&t.positions[1]);
            running.extend(&t.positions[2]);
            right_area[i] = running.surface_area();
        }

        for i in 1..count - 1 {
            let left_count = i as f32;
            let right_count = (count - i) as f32;
            let cost = left_area[i - 1] * left_count + right_area[i] * right_count;
            let better = match best {
                None => true,
                Some((best_cost, _, _)) => cost < best_cost,
            };
            if better {
                let a = axis.dot(&triangles[indices[i - 1] as usize].center().coords);
                let b = axis.dot(&triangles[indices[i] as usize].center().coords);
                best = Some((cost, axis, 0.5 * (a + b)));
            }
        }
    }

    best.map(|(_, axis, w)| Plane { axis, w })
}

fn flatten(build: &BuildNode, depth: u32, nodes: &mut Vec<Node>) -> u32 {
    let index = nodes.len() as u32;
    match build {
        BuildNode::Leaf { bounds, start, end } => {
            nodes.push(Node::Leaf {
                depth,
                index,
                bounds: (*bounds).into(),
                start: *start,
                end: *end,
            });
        }
        BuildNode::Interior {
            bounds,
            left,
            right,
            plane,
        } => {
            // Reserve this node's slot before recursing so the child
            // indices recorded below are correct.
            nodes.push(Node::Leaf {
                depth,
                index,
                bounds: (*bounds).into(),
                start: 0,
                end: 0,
            });
            let left_index = flatten(left, depth + 1, nodes);
            let right_index = flatten(right, depth + 1, nodes);
            nodes[index as usize] = Node::Interior {
                depth,
                index,
                bounds: (*bounds).into(),
                left: left_index,
                right: right_index,
                plane: *plane,
            };
        }
    }
    index
}

/// Closest-hit result from a BVH or brute-force traversal.
#[derive(Clone, Copy, Debug)]
pub struct Hit {
    pub t: f32,
    pub u: f32,
    pub v: f32,
    pub triangle_index: u32,
}

/// Brute-force traversal over every triangle, back-face culled the same
/// way the BVH leaf scan is (§8: used to cross-check BVH traversal
/// equivalence).
pub fn intersect_brute_force(ray: &Ray, triangles: &[Triangle]) -> Option<Hit> {
    let mut best: Option<Hit> = None;
    for (i, triangle) in triangles.iter().enumerate() {
        if triangle.normal.dot(&ray.dir) > 0.0 {
            continue;
        }
        let (t, u, v) = triangle.intersect(ray);
        let better = t > 0.0
            && match best {
                Some(hit) => t < hit.t,
                None => true,
            };
        if better {
            best = Some(Hit {
                t,
                u,
                v,
                triangle_index: i as u32,
            });
        }
    }
    best
}
