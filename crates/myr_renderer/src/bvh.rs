//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! Nodes live in one flat array and refer to their children by index. Leaves
//! own a contiguous range of a permuted triangle-index array, so the scene's
//! triangles are never duplicated or moved.
//!
//! Construction evaluates the Surface Area Heuristic at every rank on all
//! three axes. Large subtrees are built in parallel with rayon; child slots
//! are reserved with an atomic counter so concurrent builders write disjoint
//! nodes without locking.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

use myr_math::{Aabb, Interval, Ray, Triangle, Vec3};
use smallvec::SmallVec;

use crate::Hit;

/// Maximum triangles per leaf node before splitting.
pub const LEAF_MAX_SIZE: usize = 8;

/// Subtrees with more than `total / PARALLEL_SPLIT_DIVISOR` triangles are
/// built as independent rayon tasks.
const PARALLEL_SPLIT_DIVISOR: usize = 12;

/// Inline traversal stack depth; deeper trees spill to the heap.
const STACK_CAPACITY: usize = 64;

type TraversalStack = SmallVec<[(u32, f32); STACK_CAPACITY]>;

/// BVH node - either a branch with two children or a leaf with triangles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BvhNode {
    /// Internal node; children are indices into the node array.
    Branch { bbox: Aabb, left: u32, right: u32 },
    /// Leaf owning `indices[start..start + count]`.
    Leaf { bbox: Aabb, start: u32, count: u32 },
}

impl BvhNode {
    #[inline]
    pub fn bbox(&self) -> &Aabb {
        match self {
            BvhNode::Branch { bbox, .. } | BvhNode::Leaf { bbox, .. } => bbox,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, BvhNode::Leaf { .. })
    }
}

/// Read-only BVH over a borrowed triangle array.
pub struct Bvh<'a> {
    triangles: &'a [Triangle],
    nodes: Vec<BvhNode>,
    indices: Vec<u32>,
}

impl<'a> Bvh<'a> {
    /// Build a BVH over `triangles`. Node 0 is the root.
    ///
    /// An empty triangle slice yields a single empty leaf that every query
    /// misses.
    pub fn new(triangles: &'a [Triangle]) -> Self {
        let start = Instant::now();
        let n = triangles.len();
        let mut indices: Vec<u32> = (0..n as u32).collect();

        if n == 0 {
            return Self {
                triangles,
                nodes: vec![BvhNode::Leaf {
                    bbox: Aabb::EMPTY,
                    start: 0,
                    count: 0,
                }],
                indices,
            };
        }

        let slots: Vec<OnceLock<BvhNode>> = (0..2 * n - 1).map(|_| OnceLock::new()).collect();
        let builder = Builder {
            triangles,
            slots: &slots,
            next_slot: AtomicUsize::new(1),
            parallel_threshold: (n / PARALLEL_SPLIT_DIVISOR).max(LEAF_MAX_SIZE),
        };
        let depth = builder.build(0, 0, &mut indices);
        let used = builder.next_slot.into_inner();

        let nodes: Vec<BvhNode> = slots
            .into_iter()
            .take(used)
            .filter_map(OnceLock::into_inner)
            .collect();
        debug_assert_eq!(nodes.len(), used, "reserved BVH slot left empty");

        let leaves = nodes.iter().filter(|n| n.is_leaf()).count();
        log::info!(
            "BVH built: {} triangles, {} nodes, {} leaves, depth {} in {:?}",
            n,
            nodes.len(),
            leaves,
            depth,
            start.elapsed()
        );

        Self {
            triangles,
            nodes,
            indices,
        }
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Permuted triangle indices; leaves own contiguous ranges of it.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn bounds(&self) -> &Aabb {
        self.nodes[0].bbox()
    }

    /// Nearest triangle hit along `ray` with `t` in `[ray.t.min, t_max)`.
    ///
    /// `t_max` shrinks to the distance of every closer hit found, so on return
    /// it holds the nearest hit distance (or its original value on a miss).
    pub fn intersect(&self, ray: &Ray, t_max: &mut f32) -> Hit {
        let t_min = ray.t.min;
        let mut best = Hit::MISS;

        let Some(root_entry) = self.bounds().intersect(ray, t_min) else {
            return best;
        };
        if root_entry >= *t_max {
            return best;
        }

        let mut stack = TraversalStack::new();
        stack.push((0, root_entry));

        while let Some((index, entry)) = stack.pop() {
            // t_max may have shrunk since this node was pushed.
            if entry >= *t_max {
                continue;
            }

            match self.nodes[index as usize] {
                BvhNode::Leaf { start, count, .. } => {
                    let range = start as usize..(start + count) as usize;
                    for &tri in &self.indices[range] {
                        let bounded = Ray {
                            t: Interval::new(t_min, *t_max),
                            ..*ray
                        };
                        if let Some(t) = self.triangles[tri as usize].intersect(&bounded) {
                            if t < *t_max {
                                best = Hit::new(t, tri);
                                *t_max = t;
                            }
                        }
                    }
                }
                BvhNode::Branch { left, right, .. } => {
                    let near_enough = |t: &f32| *t < *t_max;
                    let left_entry = self.nodes[left as usize].bbox().intersect(ray, t_min).filter(near_enough);
                    let right_entry = self.nodes[right as usize].bbox().intersect(ray, t_min).filter(near_enough);

                    // Push the farther child first so the nearer one is popped next.
                    match (left_entry, right_entry) {
                        (Some(l), Some(r)) if l <= r => {
                            stack.push((right, r));
                            stack.push((left, l));
                        }
                        (Some(l), Some(r)) => {
                            stack.push((left, l));
                            stack.push((right, r));
                        }
                        (Some(l), None) => stack.push((left, l)),
                        (None, Some(r)) => stack.push((right, r)),
                        (None, None) => {}
                    }
                }
            }
        }

        best
    }

    /// True if any triangle is hit with `t` in `[ray.t.min, t_max]`.
    ///
    /// Returns on the first occluder found; says nothing about which one is
    /// nearest.
    pub fn occluded(&self, ray: &Ray, t_max: f32) -> bool {
        let t_min = ray.t.min;
        let bounded = Ray {
            t: Interval::new(t_min, t_max),
            ..*ray
        };
        let within = |node: u32| {
            self.nodes[node as usize]
                .bbox()
                .intersect(ray, t_min)
                .is_some_and(|t| t <= t_max)
        };

        if !self.bounds().intersect(ray, t_min).is_some_and(|t| t <= t_max) {
            return false;
        }

        let mut stack: SmallVec<[u32; STACK_CAPACITY]> = SmallVec::new();
        stack.push(0);

        while let Some(index) = stack.pop() {
            match self.nodes[index as usize] {
                BvhNode::Leaf { start, count, .. } => {
                    let range = start as usize..(start + count) as usize;
                    if self.indices[range]
                        .iter()
                        .any(|&tri| self.triangles[tri as usize].intersect(&bounded).is_some())
                    {
                        return true;
                    }
                }
                BvhNode::Branch { left, right, .. } => {
                    if within(right) {
                        stack.push(right);
                    }
                    if within(left) {
                        stack.push(left);
                    }
                }
            }
        }

        false
    }
}

/// Shared state of one (possibly parallel) build.
struct Builder<'t, 's> {
    triangles: &'t [Triangle],
    slots: &'s [OnceLock<BvhNode>],
    next_slot: AtomicUsize,
    parallel_threshold: usize,
}

impl Builder<'_, '_> {
    /// Build the subtree for `indices` (which start at `offset` in the full
    /// index array) into slot `node`. Returns the subtree depth.
    fn build(&self, node: usize, offset: usize, indices: &mut [u32]) -> usize {
        let bbox = padded(
            indices
                .iter()
                .fold(Aabb::EMPTY, |acc, &i| acc.merge(&self.triangles[i as usize].bbox)),
        );

        if indices.len() <= LEAF_MAX_SIZE {
            self.store(
                node,
                BvhNode::Leaf {
                    bbox,
                    start: offset as u32,
                    count: indices.len() as u32,
                },
            );
            return 1;
        }

        let split = self.partition(indices);
        let left = self.next_slot.fetch_add(2, Ordering::Relaxed);
        let right = left + 1;
        self.store(
            node,
            BvhNode::Branch {
                bbox,
                left: left as u32,
                right: right as u32,
            },
        );

        let (left_indices, right_indices) = indices.split_at_mut(split);
        let (left_depth, right_depth) = if left_indices.len() > self.parallel_threshold
            || right_indices.len() > self.parallel_threshold
        {
            rayon::join(
                || self.build(left, offset, left_indices),
                || self.build(right, offset + split, right_indices),
            )
        } else {
            (
                self.build(left, offset, left_indices),
                self.build(right, offset + split, right_indices),
            )
        };

        1 + left_depth.max(right_depth)
    }

    fn store(&self, slot: usize, node: BvhNode) {
        let stored = self.slots[slot].set(node);
        debug_assert!(stored.is_ok(), "BVH slot {slot} written twice");
    }

    /// Reorder `indices` and return the SAH-optimal split rank in `1..len`.
    ///
    /// For each axis the range is sorted by centroid and every rank is
    /// costed as `area(left) * |left| + area(right) * |right|`, with both
    /// areas accumulated by a running box rather than recomputed.
    fn partition(&self, indices: &mut [u32]) -> usize {
        let n = indices.len();
        let mut right_area = vec![0.0f32; n];
        let (mut best_cost, mut best_axis, mut best_split) = (f32::INFINITY, 0, n / 2);

        for axis in 0..3 {
            self.sort_by_centroid(indices, axis);

            let mut acc = Aabb::EMPTY;
            for i in (1..n).rev() {
                acc = acc.merge(&self.triangles[indices[i] as usize].bbox);
                right_area[i] = acc.surface_area();
            }

            let mut acc = Aabb::EMPTY;
            for i in 1..n {
                acc = acc.merge(&self.triangles[indices[i - 1] as usize].bbox);
                let cost = acc.surface_area() * i as f32 + right_area[i] * (n - i) as f32;
                if cost < best_cost {
                    best_cost = cost;
                    best_axis = axis;
                    best_split = i;
                }
            }
        }

        // The last sort was along z.
        if best_axis != 2 {
            self.sort_by_centroid(indices, best_axis);
        }
        best_split
    }

    fn sort_by_centroid(&self, indices: &mut [u32], axis: usize) {
        let key = |i: u32| self.triangles[i as usize].centroid[axis];
        indices.sort_unstable_by(|&a, &b| {
            key(a)
                .total_cmp(&key(b))
                .then_with(|| a.cmp(&b))
        });
    }
}

/// Grow a node box by a tolerance that increases with its size, so rays that
/// graze a face still enter its box. Monotone in extent, which keeps every
/// child box inside its parent.
fn padded(bbox: Aabb) -> Aabb {
    if bbox.is_empty() {
        return bbox;
    }
    let pad = Vec3::splat(1e-5 * (1.0 + bbox.extent().max_element()));
    Aabb {
        min: bbox.min - pad,
        max: bbox.max + pad,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use myr_core::presets::cube;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_vec(rng: &mut StdRng, extent: f32) -> Vec3 {
        Vec3::new(
            rng.gen_range(-extent..extent),
            rng.gen_range(-extent..extent),
            rng.gen_range(-extent..extent),
        )
    }

    fn triangle_soup(count: usize, seed: u64) -> Vec<Triangle> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                let c = random_vec(&mut rng, 10.0);
                Triangle::new(
                    c + random_vec(&mut rng, 0.5),
                    c + random_vec(&mut rng, 0.5),
                    c + random_vec(&mut rng, 0.5),
                )
            })
            .collect()
    }

    fn cube_triangles() -> Vec<Triangle> {
        let mesh = cube(0);
        (0..mesh.face_count()).map(|f| mesh.triangle(f)).collect()
    }

    fn brute_force(triangles: &[Triangle], ray: &Ray) -> Hit {
        let mut best = Hit::MISS;
        for (i, tri) in triangles.iter().enumerate() {
            if let Some(t) = tri.intersect(ray) {
                if t < best.t {
                    best = Hit::new(t, i as u32);
                }
            }
        }
        best
    }

    fn random_rays(count: usize, seed: u64, extent: f32) -> Vec<Ray> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                let origin = random_vec(&mut rng, extent * 1.5);
                let target = random_vec(&mut rng, extent);
                Ray::new(origin, (target - origin).normalize())
            })
            .collect()
    }

    fn assert_matches_brute_force(triangles: &[Triangle], rays: &[Ray]) {
        let bvh = Bvh::new(triangles);
        let mut hits = 0;
        for ray in rays {
            let expected = brute_force(triangles, ray);
            let mut t_max = f32::INFINITY;
            let got = bvh.intersect(ray, &mut t_max);

            assert_eq!(got.found, expected.found, "ray {ray:?}");
            if expected.found {
                hits += 1;
                assert!((got.t - expected.t).abs() <= 1e-5 * expected.t.max(1.0), "ray {ray:?}");
                assert_eq!(t_max, got.t);
            }
        }
        assert!(hits > 0, "test rays never hit anything");
    }

    fn assert_structure(bvh: &Bvh) {
        let nodes = bvh.nodes();
        let n = bvh.indices().len();

        // Permutation of 0..n.
        let mut sorted = bvh.indices().to_vec();
        sorted.sort_unstable();
        assert!(sorted.iter().enumerate().all(|(i, &v)| i as u32 == v));

        let mut ranges = Vec::new();
        for node in nodes {
            match *node {
                BvhNode::Leaf { bbox, start, count } => {
                    ranges.push((start, count));
                    for &tri in &bvh.indices()[start as usize..(start + count) as usize] {
                        assert!(bbox.contains(&bvh.triangles[tri as usize].bbox));
                    }
                }
                BvhNode::Branch { bbox, left, right } => {
                    assert!(bbox.contains(nodes[left as usize].bbox()));
                    assert!(bbox.contains(nodes[right as usize].bbox()));
                }
            }
        }

        // Leaf ranges tile [0, n) without overlap.
        ranges.sort_unstable();
        let mut next = 0;
        for (start, count) in &ranges {
            assert_eq!(*start, next);
            next += count;
        }
        assert_eq!(next as usize, n);
        assert_eq!(nodes.len(), 2 * ranges.len() - 1);
    }

    #[test]
    fn test_bvh_empty() {
        let bvh = Bvh::new(&[]);
        assert_eq!(bvh.nodes().len(), 1);
        assert!(bvh.bounds().is_empty());

        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        let mut t_max = f32::INFINITY;
        assert!(!bvh.intersect(&ray, &mut t_max).found);
        assert!(!bvh.occluded(&ray, f32::INFINITY));
    }

    #[test]
    fn test_bvh_single_triangle() {
        let triangles = vec![Triangle::new(
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(0.0, 1.0, -1.0),
        )];
        let bvh = Bvh::new(&triangles);
        assert_eq!(bvh.nodes().len(), 1);

        let ray = Ray::new(Vec3::ZERO, -Vec3::Z);
        let mut t_max = f32::INFINITY;
        let hit = bvh.intersect(&ray, &mut t_max);
        assert!(hit.found);
        assert_eq!(hit.triangle, 0);
        assert!((hit.t - 1.0).abs() < 1e-6);

        // Ray stopped short of the triangle.
        let mut short = 0.5;
        assert!(!bvh.intersect(&ray, &mut short).found);
        assert_eq!(short, 0.5);

        assert_matches_brute_force(&triangles, &random_rays(500, 1, 1.0));
    }

    #[test]
    fn test_bvh_structure_invariants() {
        for (count, seed) in [(9, 1), (100, 2), (1000, 3), (5000, 4)] {
            let triangles = triangle_soup(count, seed);
            let bvh = Bvh::new(&triangles);
            assert_structure(&bvh);
        }
        let cube = cube_triangles();
        assert_structure(&Bvh::new(&cube));
    }

    #[test]
    fn test_bvh_depth_is_logarithmic() {
        let triangles = triangle_soup(20_000, 5);
        let bvh = Bvh::new(&triangles);
        fn depth(nodes: &[BvhNode], node: u32) -> usize {
            match nodes[node as usize] {
                BvhNode::Leaf { .. } => 1,
                BvhNode::Branch { left, right, .. } => 1 + depth(nodes, left).max(depth(nodes, right)),
            }
        }
        let tree_depth = depth(bvh.nodes(), 0);
        // log2(20000 / 8) ~ 11; SAH trees stay within a small factor.
        assert!(tree_depth <= 40, "depth {tree_depth}");
        assert!(tree_depth >= 10);
    }

    #[test]
    fn test_bvh_matches_brute_force_on_cube() {
        let triangles = cube_triangles();
        assert_matches_brute_force(&triangles, &random_rays(2000, 6, 0.5));

        // Axis-aligned rays exercise the zero-direction slab branch.
        let axis_rays: Vec<Ray> = [-0.3f32, 0.0, 0.25]
            .iter()
            .flat_map(|&o| {
                [
                    Ray::new(Vec3::new(-2.0, o, 0.1), Vec3::X),
                    Ray::new(Vec3::new(o, 2.0, -0.2), -Vec3::Y),
                    Ray::new(Vec3::new(0.15, o, 3.0), -Vec3::Z),
                ]
            })
            .collect();
        assert_matches_brute_force(&triangles, &axis_rays);
    }

    #[test]
    fn test_bvh_matches_brute_force_on_large_mesh() {
        let triangles = triangle_soup(5000, 7);
        assert_matches_brute_force(&triangles, &random_rays(2000, 8, 10.0));
    }

    #[test]
    fn test_bvh_rays_from_inside_cloud() {
        let triangles = triangle_soup(2000, 9);
        let mut rng = StdRng::seed_from_u64(10);
        let rays: Vec<Ray> = (0..1000)
            .map(|_| Ray::new(random_vec(&mut rng, 5.0), random_vec(&mut rng, 1.0).normalize()))
            .collect();
        assert_matches_brute_force(&triangles, &rays);
    }

    #[test]
    fn test_occluded_agrees_with_nearest() {
        let triangles = triangle_soup(3000, 11);
        let bvh = Bvh::new(&triangles);
        let mut rng = StdRng::seed_from_u64(12);

        for ray in random_rays(2000, 13, 10.0) {
            let mut t_max = f32::INFINITY;
            let nearest = bvh.intersect(&ray, &mut t_max);
            let d = rng.gen_range(0.0..40.0);

            assert_eq!(
                bvh.occluded(&ray, d),
                nearest.found && nearest.t <= d,
                "ray {ray:?} d {d} nearest {nearest:?}"
            );
        }
    }

    #[test]
    fn test_intersect_respects_ray_t_min() {
        let triangles = cube_triangles();
        let bvh = Bvh::new(&triangles);
        let ray = Ray::new(Vec3::new(0.1, 0.2, 5.0), -Vec3::Z);

        let mut t_max = f32::INFINITY;
        let front = bvh.intersect(&ray, &mut t_max);
        assert!((front.t - 4.5).abs() < 1e-5);

        let past_front = Ray::with_range(ray.origin, ray.direction, Interval::new(5.0, f32::INFINITY));
        let mut t_max = f32::INFINITY;
        let back = bvh.intersect(&past_front, &mut t_max);
        assert!((back.t - 5.5).abs() < 1e-5);
    }
}
