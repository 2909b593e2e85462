use crate::primitives::Aabb;

use super::knn::{KnnHeap, KnnHit};
use super::OctreePoint;

/// A single octree node: either a leaf holding up to `max_node_data` points,
/// or an internal node with eight children partitioning its bounds at its
/// centre.
pub enum OctreeNode<P: OctreePoint> {
    Leaf { bounds: Aabb, data: Vec<P> },
    Internal {
        bounds: Aabb,
        children: Box<[OctreeNode<P>; 8]>,
    },
}

impl<P: OctreePoint> OctreeNode<P> {
    pub(crate) fn bounds(&self) -> Aabb {
        match self {
            OctreeNode::Leaf { bounds, .. } => *bounds,
            OctreeNode::Internal { bounds, .. } => *bounds,
        }
    }
}

/// A bounded, mutable spatial index over point data. Insertion is the only
/// mutating operation; once converted to a [`super::LinearOctree`] it is
/// read-only.
pub struct Octree<P: OctreePoint> {
    root: OctreeNode<P>,
    max_node_data: usize,
    len: usize,
}

impl<P: OctreePoint> Octree<P> {
    pub fn new(bounds: Aabb, max_node_data: usize) -> Self {
        assert!(max_node_data > 0, "max_node_data must be positive");
        Self {
            root: OctreeNode::Leaf {
                bounds,
                data: Vec::new(),
            },
            max_node_data,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bounds(&self) -> Aabb {
        self.root.bounds()
    }

    /// The root node, exposed so [`super::LinearOctree::build`] can walk
    /// the tree without needing mutable access.
    pub(crate) fn root(&self) -> &OctreeNode<P> {
        &self.root
    }

    pub fn insert(&mut self, point: P) {
        let max_node_data = self.max_node_data;
        Self::insert_into(&mut self.root, point, max_node_data);
        self.len += 1;
    }

    fn insert_into(node: &mut OctreeNode<P>, point: P, max_node_data: usize) {
        match node {
            OctreeNode::Leaf { bounds, data } => {
                if data.len() < max_node_data {
                    data.push(point);
                    return;
                }

                // Subdivide: allocate eight empty child cubes bisected at
                // this node's centre, redistribute existing points, then
                // fall through to insert the new point too.
                let bounds = *bounds;
                let mut existing = std::mem::take(data);
                existing.push(point);

                let children: [OctreeNode<P>; 8] = std::array::from_fn(|i| OctreeNode::Leaf {
                    bounds: bounds.octant(i),
                    data: Vec::new(),
                });
                *node = OctreeNode::Internal {
                    bounds,
                    children: Box::new(children),
                };

                if let OctreeNode::Internal { children, .. } = node {
                    for p in existing {
                        let idx = bounds.octant_index(&p.position());
                        Self::insert_into(&mut children[idx], p, max_node_data);
                    }
                }
            }
            OctreeNode::Internal { bounds, children } => {
                let idx = bounds.octant_index(&point.position());
                Self::insert_into(&mut children[idx], point, max_node_data);
            }
        }
    }

    /// Up to `k` nearest points to `query` within `r_max`, sorted by
    /// ascending squared distance.
    pub fn knn_search(&self, query: crate::primitives::Vector, k: usize, r_max: f32) -> Vec<KnnHit<P>> {
        let mut heap = KnnHeap::new(k);
        let r_max_sq = r_max * r_max;
        Self::knn_visit(&self.root, query, r_max_sq, &mut heap);
        heap.into_sorted_vec()
    }

    fn knn_visit(node: &OctreeNode<P>, query: crate::primitives::Vector, r_max_sq: f32, heap: &mut KnnHeap<P>) {
        let r_sq = heap.radius_sq(r_max_sq);
        if node.bounds().distance_sq(&query) > r_sq {
            return;
        }

        match node {
            OctreeNode::Leaf { data, .. } => {
                for &p in data {
                    let d_sq = (p.position() - query).len_sqr();
                    let r_sq = heap.radius_sq(r_max_sq);
                    if d_sq <= r_sq {
                        heap.offer(p, d_sq);
                    }
                }
            }
            OctreeNode::Internal { children, .. } => {
                let mut order: [usize; 8] = std::array::from_fn(|i| i);
                order.sort_by(|&a, &b| {
                    children[a]
                        .bounds()
                        .distance_sq(&query)
                        .total_cmp(&children[b].bounds().distance_sq(&query))
                });
                for idx in order {
                    Self::knn_visit(&children[idx], query, r_max_sq, heap);
                }
            }
        }
    }

    /// `true` iff no stored point lies within `r` of `query`.
    pub fn radius_empty(&self, query: crate::primitives::Vector, r: f32) -> bool {
        Self::radius_empty_visit(&self.root, query, r * r)
    }

    fn radius_empty_visit(node: &OctreeNode<P>, query: crate::primitives::Vector, r_sq: f32) -> bool {
        if node.bounds().distance_sq(&query) > r_sq {
            return true;
        }

        match node {
            OctreeNode::Leaf { data, .. } => {
                !data.iter().any(|p| (p.position() - query).len_sqr() <= r_sq)
            }
            OctreeNode::Internal { children, .. } => children
                .iter()
                .all(|child| Self::radius_empty_visit(child, query, r_sq)),
        }
    }
}
