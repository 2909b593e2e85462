use super::Vector;

/// A ray consisting of an origin, a (normalised) direction, the refractive
/// index of the medium it currently travels through, its recursion depth,
/// and whether the last scattering event along it was specular.
///
/// `specular` tracks whether the path prefix up to this ray is
/// specular-only (mirror/refraction bounces only): it starts `true` at
/// emission/primary-ray time and is cleared the moment a diffuse bounce
/// occurs.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vector,
    pub direction: Vector,
    pub medium_ior: f32,
    pub depth: u32,
    pub specular: bool,
}

impl Ray {
    pub fn new(origin: Vector, direction: Vector, medium_ior: f32) -> Self {
        Self {
            origin,
            direction,
            medium_ior,
            depth: 0,
            specular: true,
        }
    }

    pub fn point_at(&self, t: f32) -> Vector {
        self.origin + t * self.direction
    }

    /// A new ray continuing from this one at a deeper recursion level.
    pub fn advance(&self, origin: Vector, direction: Vector, medium_ior: f32, specular: bool) -> Self {
        Self {
            origin,
            direction,
            medium_ior,
            depth: self.depth + 1,
            specular,
        }
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self::new(Vector::default(), Vector::new(0.0, 0.0, 1.0), 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_at_follows_direction_scaled_by_t() {
        let ray = Ray::new(Vector::new(1.0, 0.0, 0.0), Vector::new(0.0, 1.0, 0.0), 1.0);
        let p = ray.point_at(3.0);
        assert_eq!(p, Vector::new(1.0, 3.0, 0.0));
    }

    #[test]
    fn advance_increments_depth_and_carries_medium() {
        let ray = Ray::new(Vector::ZERO, Vector::new(0.0, 0.0, 1.0), 1.0);
        let next = ray.advance(Vector::new(0.0, 0.0, 1.0), Vector::new(1.0, 0.0, 0.0), 1.5, false);
        assert_eq!(next.depth, 1);
        assert_eq!(next.medium_ior, 1.5);
        assert!(!next.specular);
    }

    #[test]
    fn new_ray_starts_as_specular_at_depth_zero() {
        let ray = Ray::default();
        assert_eq!(ray.depth, 0);
        assert!(ray.specular);
    }
}
