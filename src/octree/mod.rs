//! A bounded spatial index over point data, used to store and query the
//! four photon maps. `Octree` is the mutable,
//! insertion-time structure built during Pass 1; `LinearOctree` is the
//! read-only, cache-friendly array form it is converted into before Pass 2
//! begins querying it from many threads at once.

pub mod knn;
pub mod linear;
pub mod tree;

pub use knn::KnnHit;
pub use linear::LinearOctree;
pub use tree::{Octree, OctreeNode};

use crate::primitives::Vector;

/// A point payload an octree can store and query by position.
pub trait OctreePoint: Copy {
    fn position(&self) -> Vector;
}
