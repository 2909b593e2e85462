use std::collections::VecDeque;

use crate::primitives::{Aabb, Vector};

use super::knn::{KnnHeap, KnnHit};
use super::tree::{Octree, OctreeNode};
use super::OctreePoint;

const NO_CHILD: u32 = u32::MAX;

#[derive(Clone, Copy)]
struct LinearNode {
    bounds: Aabb,
    data_start: u32,
    data_len: u32,
    first_child: u32,
}

/// A breadth-first-packed array form of an [`Octree`]: node metadata lives
/// in one flat `Vec`, point payloads in another shared array indexed by
/// each leaf's `data_start..data_start+data_len` range. Built once from a
/// finished `Octree` and never mutated afterwards — the type itself
/// enforces the Pass 1 → Pass 2 read-only transition: there is no API to
/// insert into a `LinearOctree`.
///
/// A node's eight children, when present, occupy a contiguous block of
/// eight consecutive entries starting at `first_child`; this crate builds
/// that block via a breadth-first flatten so the contiguity holds without
/// needing to know subtree sizes up front.
pub struct LinearOctree<P: OctreePoint> {
    nodes: Vec<LinearNode>,
    payload: Vec<P>,
}

impl<P: OctreePoint> LinearOctree<P> {
    pub fn build(tree: &Octree<P>) -> Self {
        Self::from_node(tree.root())
    }

    fn from_node(root: &OctreeNode<P>) -> Self {
        let mut nodes = vec![LinearNode {
            bounds: root.bounds(),
            data_start: 0,
            data_len: 0,
            first_child: NO_CHILD,
        }];
        let mut payload = Vec::new();

        let mut queue: VecDeque<(&OctreeNode<P>, usize)> = VecDeque::new();
        queue.push_back((root, 0));

        while let Some((node, idx)) = queue.pop_front() {
            match node {
                OctreeNode::Leaf { bounds, data } => {
                    let start = payload.len() as u32;
                    payload.extend(data.iter().copied());
                    nodes[idx] = LinearNode {
                        bounds: *bounds,
                        data_start: start,
                        data_len: data.len() as u32,
                        first_child: NO_CHILD,
                    };
                }
                OctreeNode::Internal { bounds, children } => {
                    let first_child = nodes.len() as u32;
                    for child in children.iter() {
                        nodes.push(LinearNode {
                            bounds: child.bounds(),
                            data_start: 0,
                            data_len: 0,
                            first_child: NO_CHILD,
                        });
                    }
                    nodes[idx] = LinearNode {
                        bounds: *bounds,
                        data_start: 0,
                        data_len: 0,
                        first_child,
                    };
                    for (i, child) in children.iter().enumerate() {
                        queue.push_back((child, first_child as usize + i));
                    }
                }
            }
        }

        Self { nodes, payload }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn bounds(&self) -> Aabb {
        self.nodes[0].bounds
    }

    pub fn knn_search(&self, query: Vector, k: usize, r_max: f32) -> Vec<KnnHit<P>> {
        let mut heap = KnnHeap::new(k);
        let r_max_sq = r_max * r_max;
        self.knn_visit(0, query, r_max_sq, &mut heap);
        heap.into_sorted_vec()
    }

    fn knn_visit(&self, idx: usize, query: Vector, r_max_sq: f32, heap: &mut KnnHeap<P>) {
        let node = &self.nodes[idx];
        let r_sq = heap.radius_sq(r_max_sq);
        if node.bounds.distance_sq(&query) > r_sq {
            return;
        }

        if node.first_child == NO_CHILD {
            let start = node.data_start as usize;
            let end = start + node.data_len as usize;
            for &p in &self.payload[start..end] {
                let d_sq = (p.position() - query).len_sqr();
                let r_sq = heap.radius_sq(r_max_sq);
                if d_sq <= r_sq {
                    heap.offer(p, d_sq);
                }
            }
        } else {
            let base = node.first_child as usize;
            let mut order: [usize; 8] = std::array::from_fn(|i| i);
            order.sort_by(|&a, &b| {
                self.nodes[base + a]
                    .bounds
                    .distance_sq(&query)
                    .total_cmp(&self.nodes[base + b].bounds.distance_sq(&query))
            });
            for i in order {
                self.knn_visit(base + i, query, r_max_sq, heap);
            }
        }
    }

    pub fn radius_empty(&self, query: Vector, r: f32) -> bool {
        self.radius_empty_visit(0, query, r * r)
    }

    fn radius_empty_visit(&self, idx: usize, query: Vector, r_sq: f32) -> bool {
        let node = &self.nodes[idx];
        if node.bounds.distance_sq(&query) > r_sq {
            return true;
        }

        if node.first_child == NO_CHILD {
            let start = node.data_start as usize;
            let end = start + node.data_len as usize;
            !self.payload[start..end]
                .iter()
                .any(|p| (p.position() - query).len_sqr() <= r_sq)
        } else {
            let base = node.first_child as usize;
            (0..8).all(|i| self.radius_empty_visit(base + i, query, r_sq))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Vector;

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Pt(Vector);
    impl OctreePoint for Pt {
        fn position(&self) -> Vector {
            self.0
        }
    }

    fn cube(half: f32) -> Aabb {
        Aabb::new(Vector::new(-half, -half, -half), Vector::new(half, half, half))
    }

    fn build_sample_tree() -> Octree<Pt> {
        let mut tree = Octree::new(cube(10.0), 3);
        let mut seed: u32 = 998877;
        let mut next = || {
            seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
            ((seed >> 8) as f32 / u32::MAX as f32) * 20.0 - 10.0
        };
        for _ in 0..200 {
            tree.insert(Pt(Vector::new(next(), next(), next())));
        }
        tree
    }

    #[test]
    fn linear_octree_matches_octree_for_knn() {
        let tree = build_sample_tree();
        let linear = LinearOctree::build(&tree);
        assert_eq!(linear.len(), tree.len());

        let query = Vector::new(1.5, -0.5, 2.0);
        let a = tree.knn_search(query, 15, 6.0);
        let b = linear.knn_search(query, 15, 6.0);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x.distance_sq - y.distance_sq).abs() < 1e-4);
        }
    }

    #[test]
    fn linear_octree_matches_octree_for_radius_empty() {
        let tree = build_sample_tree();
        let linear = LinearOctree::build(&tree);

        for &(q, r) in &[
            (Vector::new(0.0, 0.0, 0.0), 0.5),
            (Vector::new(5.0, 5.0, 5.0), 1.0),
            (Vector::new(-8.0, -8.0, -8.0), 3.0),
        ] {
            assert_eq!(tree.radius_empty(q, r), linear.radius_empty(q, r));
        }
    }

    #[test]
    fn rebuilding_and_requerying_is_idempotent() {
        let tree = build_sample_tree();
        let linear_a = LinearOctree::build(&tree);
        let linear_b = LinearOctree::build(&tree);

        let query = Vector::new(-1.0, 2.0, -3.0);
        let a = linear_a.knn_search(query, 10, 10.0);
        let b = linear_b.knn_search(query, 10, 10.0);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.distance_sq, y.distance_sq);
        }
    }
}
