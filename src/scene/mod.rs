//! The external collaborator interfaces this integrator consumes: scene
//! intersection, emissive surfaces, and materials. Their production
//! implementations — JSON scene loading, triangle-mesh/sphere intersection
//! and BVH traversal, camera ray generation — are out of scope and are not
//! provided here. `#[cfg(test)]`-only analytic fixtures exist in
//! [`testing`] purely so this crate's own property and scenario tests have
//! something concrete to trace rays against.

use crate::primitives::{Aabb, Colour, Vector};

/// A material handle, read-only once the scene is loaded.
#[derive(Clone, Copy, Debug)]
pub struct Material {
    pub emittance: Colour,
    pub ior: f32,
    pub external_ior: f32,
    pub transparency: f32,
    pub reflect_probability: f32,
    pub opaque: bool,
    pub perfect_mirror: bool,
    pub complex_ior: Option<ComplexIor>,
    pub rough_specular: bool,
    pub can_diffusely_reflect: bool,
    pub diffuse_reflectance: Colour,
    pub roughness: f32,
}

/// A complex (conductor) index of refraction `n + ik`, per channel.
#[derive(Clone, Copy, Debug)]
pub struct ComplexIor {
    pub n: Colour,
    pub k: Colour,
}

impl Material {
    /// Sample a microfacet normal in the tangent frame of the shading
    /// normal. Returned in *local* space (z-up);
    /// callers transform it into world space via the shading normal's
    /// `CoordinateSystem`.
    pub fn specular_microfacet_normal(&self, u1: f32, u2: f32) -> Vector {
        // GGX visible-normal-free importance sampling of the half-vector
        // distribution, parameterised by `roughness` (alpha).
        let alpha = self.roughness.max(1e-4);
        let theta = (alpha * (u1 / (1.0 - u1)).sqrt()).atan();
        let phi = 2.0 * std::f32::consts::PI * u2;
        Vector::new(
            theta.sin() * phi.cos(),
            theta.sin() * phi.sin(),
            theta.cos(),
        )
    }

    /// The dielectric specular BRDF evaluated at `(local_in, local_out)`,
    /// before any conductor-Fresnel multiplication.
    pub fn specular_brdf(&self, _local_in: &Vector, local_out: &Vector, _inside: bool) -> Colour {
        if local_out.z <= 0.0 {
            return Colour::BLACK;
        }
        Colour::splat(1.0 / local_out.z.max(1e-4))
    }

    pub fn diffuse_brdf(&self, _local_in: &Vector, _local_out: &Vector) -> Colour {
        self.diffuse_reflectance / std::f32::consts::PI
    }
}

/// A hit resolved by the scene's own intersection/BVH machinery, already
/// reduced to what the interaction constructor needs:
/// the parametric distance, the geometric normal, an optional interpolated
/// shading normal, and the struck material. Mesh/UV interpolation detail
/// stays inside the scene implementation.
#[derive(Clone, Copy)]
pub struct RawHit<'a> {
    pub t: f32,
    pub geometric_normal: Vector,
    pub shading_normal: Option<Vector>,
    pub material: &'a Material,
}

/// A surface capable of emitting photons: sampled uniformly in parameter
/// space, queried for its normal at a sampled point, its area (for
/// emission-budgeting flux-weighting), and its material.
pub trait Emitter: Sync {
    fn sample_point(&self, u: f32, v: f32) -> Vector;
    fn normal(&self, point: Vector) -> Vector;
    fn area(&self) -> f32;
    fn material(&self) -> &Material;

    /// `Φ = emittance · area`, the emitter's total emitted flux.
    fn emitted_flux(&self) -> Colour {
        self.material().emittance * self.area()
    }
}

/// The scene collaborator: ray intersection, bounding box, and the list of
/// emissive surfaces to seed Pass 1 from.
pub trait Scene: Sync {
    fn intersect(&self, origin: Vector, direction: Vector) -> Option<RawHit<'_>>;
    fn bounding_box(&self) -> Aabb;
    fn emissives(&self) -> &[Box<dyn Emitter>];

    /// Whether any surface lies between `origin` and `origin + direction *
    /// max_distance` (exclusive), used by shadow-photon scanning and by
    /// next-event-estimation visibility tests.
    fn is_occluded(&self, origin: Vector, direction: Vector, max_distance: f32) -> bool {
        match self.intersect(origin, direction) {
            Some(hit) => hit.t > 0.0 && hit.t < max_distance,
            None => false,
        }
    }

    /// Radiance returned for a ray that leaves the scene without striking
    /// anything. Defaults to black.
    fn sky_radiance(&self, _origin: Vector, _direction: Vector) -> Colour {
        Colour::BLACK
    }
}

#[cfg(test)]
pub mod testing;
