use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::OctreePoint;

/// One result of a k-NN query: the stored point and its squared distance to
/// the query position.
#[derive(Clone, Copy, Debug)]
pub struct KnnHit<P> {
    pub point: P,
    pub distance_sq: f32,
}

/// Max-heap entry ordered by `distance_sq` so the worst current result sits
/// at the top, ready to be evicted as better results arrive.
struct HeapEntry<P> {
    distance_sq: f32,
    point: P,
}

impl<P> PartialEq for HeapEntry<P> {
    fn eq(&self, other: &Self) -> bool {
        self.distance_sq == other.distance_sq
    }
}
impl<P> Eq for HeapEntry<P> {}

impl<P> PartialOrd for HeapEntry<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P> Ord for HeapEntry<P> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_sq.total_cmp(&other.distance_sq)
    }
}

/// A bounded max-heap of at most `k` candidates, the working set the k-NN
/// traversal narrows as it visits leaves.
pub(super) struct KnnHeap<P: OctreePoint> {
    k: usize,
    heap: BinaryHeap<HeapEntry<P>>,
}

impl<P: OctreePoint> KnnHeap<P> {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k),
        }
    }

    /// The current pruning radius squared: `r_max²` until the heap is full,
    /// then the worst retained candidate's squared distance.
    pub fn radius_sq(&self, r_max_sq: f32) -> f32 {
        if self.heap.len() >= self.k {
            self.heap.peek().map(|e| e.distance_sq).unwrap_or(r_max_sq)
        } else {
            r_max_sq
        }
    }

    pub fn offer(&mut self, point: P, distance_sq: f32) {
        self.heap.push(HeapEntry { distance_sq, point });
        if self.heap.len() > self.k {
            self.heap.pop();
        }
    }

    pub fn into_sorted_vec(self) -> Vec<KnnHit<P>> {
        let mut hits: Vec<KnnHit<P>> = self
            .heap
            .into_iter()
            .map(|e| KnnHit {
                point: e.point,
                distance_sq: e.distance_sq,
            })
            .collect();
        hits.sort_by(|a, b| a.distance_sq.total_cmp(&b.distance_sq));
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Vector;

    #[derive(Clone, Copy)]
    struct P(Vector);
    impl OctreePoint for P {
        fn position(&self) -> Vector {
            self.0
        }
    }

    #[test]
    fn heap_keeps_only_the_k_smallest_distances() {
        let mut heap = KnnHeap::<P>::new(2);
        heap.offer(P(Vector::ZERO), 5.0);
        heap.offer(P(Vector::ZERO), 1.0);
        heap.offer(P(Vector::ZERO), 3.0);
        let sorted = heap.into_sorted_vec();
        assert_eq!(sorted.len(), 2);
        assert_eq!(sorted[0].distance_sq, 1.0);
        assert_eq!(sorted[1].distance_sq, 3.0);
    }

    #[test]
    fn radius_shrinks_once_heap_is_full() {
        let mut heap = KnnHeap::<P>::new(1);
        assert_eq!(heap.radius_sq(100.0), 100.0);
        heap.offer(P(Vector::ZERO), 9.0);
        assert_eq!(heap.radius_sq(100.0), 9.0);
    }
}
