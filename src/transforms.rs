//! Ray-transform helpers: turning a selected scattering branch (component
//! C) into a new outgoing ray direction. The reflect/refract/diffuse
//! branching here used to be inlined into a single recursive trace function;
//! factored out so both the photon tracer (component E) and the radiance
//! estimator (component F) can share it.

use rand::Rng;

use crate::interaction::Interaction;
use crate::primitives::{CoordinateSystem, Vector};

/// A small push off the surface along its normal, applied to every new ray
/// origin so the next intersection test doesn't immediately re-hit the
/// surface it just left.
pub const EPSILON: f32 = 1e-4;

/// The IOR a path starts in before it strikes anything: vacuum/air.
pub const AIR_IOR: f32 = 1.0;

/// Cosine-weighted hemisphere sample around `normal`, reflecting the
/// Lambertian `cos(theta)` importance-sampling convention used throughout
/// both passes.
pub fn cosine_weighted_hemisphere(normal: Vector, rng: &mut impl Rng) -> Vector {
    let u1: f32 = rng.gen();
    let u2: f32 = rng.gen();
    let r = u1.sqrt();
    let phi = 2.0 * std::f32::consts::PI * u2;
    let local = Vector::new(r * phi.cos(), r * phi.sin(), (1.0 - u1).max(0.0).sqrt());

    CoordinateSystem::new(normal).to_world(&local)
}

/// Cosine-weighted hemisphere sample around an interaction's diffuse branch
/// normal.
pub fn reflect_diffuse(interaction: &Interaction, rng: &mut impl Rng) -> Vector {
    let normal = interaction.branch_normal(crate::interaction::ScatterType::Diffuse);
    cosine_weighted_hemisphere(normal, rng)
}

/// Mirror `interaction.out` about the branch normal (the microfacet normal
/// for a rough specular surface, else the shading normal). If the result
/// would point into the surface relative to the geometric normal, the
/// sample is degenerate and `None` is returned.
pub fn reflect_specular(interaction: &Interaction) -> Option<Vector> {
    let normal = interaction.branch_normal(crate::interaction::ScatterType::Reflect);
    let direction = interaction.out.negate().reflection(&normal);
    if direction.dot(&interaction.normal) <= 0.0 {
        None
    } else {
        Some(direction)
    }
}

/// Refract `interaction.out` through the branch normal using Snell's law.
/// Returns `None` on total internal reflection — callers fall back to
/// [`reflect_specular`] in that case.
pub fn refract_specular(interaction: &Interaction) -> Option<Vector> {
    let normal = interaction.branch_normal(crate::interaction::ScatterType::Refract);
    let incoming = interaction.out.negate();

    let mut n = normal;
    let mut cos_i = -incoming.dot(&n);
    let (eta_i, eta_t) = if cos_i < 0.0 {
        cos_i = -cos_i;
        n = n.negate();
        (interaction.n2, interaction.n1)
    } else {
        (interaction.n1, interaction.n2)
    };

    let eta = eta_i / eta_t;
    let sin_t_sq = eta * eta * (1.0 - cos_i * cos_i).max(0.0);
    if sin_t_sq >= 1.0 {
        return None;
    }
    let cos_t = (1.0 - sin_t_sq).sqrt();
    let direction = eta * incoming + (eta * cos_i - cos_t) * n;
    Some(direction.normalise())
}

/// Offset a surface point along `normal` by [`EPSILON`], oriented to face
/// the side the new ray is heading towards.
pub fn offset_origin(position: Vector, normal: Vector, direction: Vector) -> Vector {
    if direction.dot(&normal) >= 0.0 {
        position + normal * EPSILON
    } else {
        position - normal * EPSILON
    }
}
