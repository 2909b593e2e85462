use super::Vector;

/// An orthonormal basis `(tangent, bitangent, normal)` built from a single
/// unit normal.
///
/// Uses the Duff et al. branch-free construction ("Building an Orthonormal
/// Basis, Revisited", JCGT 2017) rather than the classic Gram-Schmidt
/// approach with a `if n.x > 0.9` branch: microfacet sampling depends on
/// this basis being stable as `n` sweeps continuously, and a branching
/// construction introduces a discontinuity exactly at the branch boundary.
#[derive(Clone, Copy, Debug)]
pub struct CoordinateSystem {
    pub tangent: Vector,
    pub bitangent: Vector,
    pub normal: Vector,
}

impl CoordinateSystem {
    pub fn new(normal: Vector) -> Self {
        let sign = (1.0_f32).copysign(normal.z);
        let a = -1.0 / (sign + normal.z);
        let b = normal.x * normal.y * a;

        let tangent = Vector::new(
            1.0 + sign * normal.x * normal.x * a,
            sign * b,
            -sign * normal.x,
        );
        let bitangent = Vector::new(b, sign + normal.y * normal.y * a, -normal.y);

        Self {
            tangent,
            bitangent,
            normal,
        }
    }

    /// Transform a local-space direction into world space.
    pub fn to_world(&self, local: &Vector) -> Vector {
        self.tangent * local.x + self.bitangent * local.y + self.normal * local.z
    }

    /// Transform a world-space direction into this basis's local space.
    pub fn to_local(&self, world: &Vector) -> Vector {
        Vector::new(
            world.dot(&self.tangent),
            world.dot(&self.bitangent),
            world.dot(&self.normal),
        )
    }
}
