//! Per-hit sampling: normal reconciliation, medium bookkeeping, the
//! Fresnel + transparency branch draw, and BRDF evaluation. This is the
//! seam between "we hit something" (the scene
//! collaborator's [`crate::scene::RawHit`]) and "here is what happens
//! next" (component D's ray transforms, and components E/F which drive
//! this module from the tracer and the estimator respectively).

use rand::Rng;

use crate::primitives::{Colour, CoordinateSystem, Vector};
use crate::scene::{Material, RawHit};

/// Which of the three scattering branches a hit resolved to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScatterType {
    Reflect,
    Refract,
    Diffuse,
}

/// A fully resolved surface interaction, ready to be scattered (component
/// D) or evaluated for its BRDF (below).
pub struct Interaction<'a> {
    pub t: f32,
    pub position: Vector,
    /// Geometric normal, flipped to face `-ray.direction`.
    pub normal: Vector,
    /// Shading normal, flipped to face `-ray.direction`. Equal to `normal`
    /// when the scene provided no interpolated normal, or when the
    /// interpolated one disagreed in sign with the geometric normal.
    pub shading_normal: Vector,
    pub material: &'a Material,
    pub out: Vector,
    pub n1: f32,
    pub n2: f32,
    pub inside: bool,
    /// The world-space microfacet normal sampled for a rough-specular
    /// material, if any.
    pub specular_normal: Option<Vector>,
}

impl<'a> Interaction<'a> {
    /// Build an `Interaction` from a ray and a scene-resolved hit:
    /// reconcile normals, resolve the medium, and draw the scattering
    /// branch.
    pub fn construct(
        ray_direction: Vector,
        ray_medium_ior: f32,
        t: f32,
        position: Vector,
        hit: &RawHit<'a>,
        rng: &mut impl Rng,
    ) -> Self {
        let n_g = hit.geometric_normal;

        // Reject an interpolated shading normal that disagrees in sign
        // with the geometric one: prevents self-shadowing on silhouettes.
        let n_s = match hit.shading_normal {
            Some(n_s) if (ray_direction.dot(&n_s)).signum() == (ray_direction.dot(&n_g)).signum() => n_s,
            _ => n_g,
        };

        let (n1, n2, inside) = if ray_direction.dot(&n_g) < 0.0 || hit.material.opaque {
            (ray_medium_ior, hit.material.ior, false)
        } else {
            (ray_medium_ior, hit.material.external_ior, true)
        };

        let normal = face_forward(n_g, ray_direction);
        let shading_normal = face_forward(n_s, ray_direction);

        let specular_normal = if hit.material.rough_specular {
            let cs = CoordinateSystem::new(shading_normal);
            let local_h = hit
                .material
                .specular_microfacet_normal(rng.gen::<f32>(), rng.gen::<f32>());
            Some(cs.to_world(&local_h).normalise())
        } else {
            None
        };

        Self {
            t,
            position,
            normal,
            shading_normal,
            material: hit.material,
            out: ray_direction.negate(),
            n1,
            n2,
            inside,
            specular_normal,
        }
    }

    /// The normal the currently-selected branch should build its local
    /// frame from: the shading normal for diffuse, the sampled microfacet
    /// normal (if any) for non-diffuse branches.
    pub fn branch_normal(&self, scatter: ScatterType) -> Vector {
        match scatter {
            ScatterType::Diffuse => self.shading_normal,
            ScatterType::Reflect | ScatterType::Refract => {
                self.specular_normal.unwrap_or(self.shading_normal)
            }
        }
    }

    pub fn coordinate_system(&self, scatter: ScatterType) -> CoordinateSystem {
        CoordinateSystem::new(self.branch_normal(scatter))
    }

    /// Draw the scattering branch for this hit: reflect, refract, or
    /// diffuse, weighted by Fresnel reflectance `R` and the material's
    /// transparency `T` so the three outcomes sum to probability 1.
    pub fn select_type(&self, rng: &mut impl Rng) -> ScatterType {
        if self.material.perfect_mirror || self.material.complex_ior.is_some() {
            return ScatterType::Reflect;
        }

        let p: f32 = rng.gen();
        let normal_used = self.branch_normal(ScatterType::Reflect);
        let cos_theta = normal_used.dot(&self.out);
        let r = fresnel_dielectric(self.n1, self.n2, cos_theta);
        let t = self.material.transparency;

        if r > p {
            ScatterType::Reflect
        } else if r + (1.0 - r) * t > p {
            ScatterType::Refract
        } else {
            ScatterType::Diffuse
        }
    }

    /// Evaluate the BRDF for a world-space incoming direction, given the
    /// branch already selected for this hit.
    pub fn eval_brdf(&self, scatter: ScatterType, d_in: Vector) -> Colour {
        let cs = self.coordinate_system(scatter);
        let local_in = cs.to_local(&d_in);
        let local_out = cs.to_local(&self.out);

        if local_in.z == 0.0 {
            return Colour::BLACK;
        }

        match scatter {
            ScatterType::Diffuse => self.material.diffuse_brdf(&local_in, &local_out),
            ScatterType::Reflect | ScatterType::Refract => {
                let mut brdf = self
                    .material
                    .specular_brdf(&local_in, &local_out, self.inside);
                if let Some(complex_ior) = &self.material.complex_ior {
                    brdf *= fresnel_conductor(complex_ior, local_out.z);
                }
                brdf
            }
        }
    }
}

fn face_forward(n: Vector, ray_direction: Vector) -> Vector {
    if ray_direction.dot(&n) > 0.0 {
        n.negate()
    } else {
        n
    }
}

/// The exact (unpolarized) Fresnel reflectance for a dielectric interface.
pub fn fresnel_dielectric(n1: f32, n2: f32, cos_i: f32) -> f32 {
    let cos_i = cos_i.clamp(-1.0, 1.0).abs();
    let sin_t_sq = (n1 / n2).powi(2) * (1.0 - cos_i * cos_i).max(0.0);
    if sin_t_sq >= 1.0 {
        return 1.0;
    }
    let cos_t = (1.0 - sin_t_sq).sqrt();
    let r_parl = (n2 * cos_i - n1 * cos_t) / (n2 * cos_i + n1 * cos_t);
    let r_perp = (n1 * cos_i - n2 * cos_t) / (n1 * cos_i + n2 * cos_t);
    0.5 * (r_parl * r_parl + r_perp * r_perp)
}

/// Fresnel reflectance for a conductor with complex IOR `n + ik`, per
/// channel, at the given cosine.
fn fresnel_conductor(ior: &crate::scene::ComplexIor, cos_i: f32) -> Colour {
    let cos_i = cos_i.clamp(0.0, 1.0);
    let channel = |n: f32, k: f32| -> f32 {
        let cos_i2 = cos_i * cos_i;
        let sin_i2 = 1.0 - cos_i2;
        let n2 = n * n;
        let k2 = k * k;

        let t0 = n2 - k2 - sin_i2;
        let a2_plus_b2 = (t0 * t0 + 4.0 * n2 * k2).max(0.0).sqrt();
        let t1 = a2_plus_b2 + cos_i2;
        let a = (0.5 * (a2_plus_b2 + t0)).max(0.0).sqrt();
        let t2 = 2.0 * a * cos_i;
        let rs = (t1 - t2) / (t1 + t2);

        let t3 = cos_i2 * a2_plus_b2 + sin_i2 * sin_i2;
        let t4 = t2 * sin_i2;
        let rp = rs * (t3 - t4) / (t3 + t4);

        0.5 * (rs + rp)
    };

    Colour::new(
        channel(ior.n.r, ior.k.r),
        channel(ior.n.g, ior.k.g),
        channel(ior.n.b, ior.k.b),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::testing::{diffuse_material, glass_material, mirror_material};
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn rng() -> Xoshiro256PlusPlus {
        Xoshiro256PlusPlus::seed_from_u64(42)
    }

    #[test]
    fn normal_faces_incoming_ray_after_construction() {
        let material = diffuse_material(Colour::splat(0.8));
        let hit = RawHit {
            t: 2.0,
            geometric_normal: Vector::new(0.0, 1.0, 0.0),
            shading_normal: None,
            material: &material,
        };
        let ray_dir = Vector::new(0.0, -1.0, 0.0);
        let mut r = rng();
        let interaction = Interaction::construct(ray_dir, 1.0, 2.0, Vector::ZERO, &hit, &mut r);
        assert!(ray_dir.dot(&interaction.normal) <= 0.0);
        assert!(ray_dir.dot(&interaction.shading_normal) <= 0.0);
    }

    #[test]
    fn perfect_mirror_always_selects_reflect() {
        let material = mirror_material();
        let hit = RawHit {
            t: 1.0,
            geometric_normal: Vector::new(0.0, 1.0, 0.0),
            shading_normal: None,
            material: &material,
        };
        let mut r = rng();
        let interaction = Interaction::construct(
            Vector::new(0.0, -1.0, 0.0),
            1.0,
            1.0,
            Vector::ZERO,
            &hit,
            &mut r,
        );
        for _ in 0..20 {
            assert_eq!(interaction.select_type(&mut r), ScatterType::Reflect);
        }
    }

    #[test]
    fn fresnel_dielectric_is_one_under_total_internal_reflection() {
        // Glass to air at a grazing angle undergoes TIR.
        let r = fresnel_dielectric(1.5, 1.0, 0.1);
        assert!((r - 1.0).abs() < 1e-6);
    }

    #[test]
    fn fresnel_dielectric_matches_known_normal_incidence_value() {
        // At normal incidence R = ((n2-n1)/(n2+n1))^2.
        let r = fresnel_dielectric(1.0, 1.5, 1.0);
        let expected = ((1.5 - 1.0) / (1.5 + 1.0)).powi(2);
        assert!((r - expected).abs() < 1e-5);
    }

    #[test]
    fn grazing_local_direction_yields_zero_brdf() {
        let material = diffuse_material(Colour::splat(0.8));
        let hit = RawHit {
            t: 1.0,
            geometric_normal: Vector::new(0.0, 1.0, 0.0),
            shading_normal: None,
            material: &material,
        };
        let mut r = rng();
        let interaction = Interaction::construct(
            Vector::new(0.0, -1.0, 0.0),
            1.0,
            1.0,
            Vector::ZERO,
            &hit,
            &mut r,
        );
        // A direction exactly in the tangent plane has local.z == 0.
        let grazing = interaction.shading_normal.cross(&Vector::new(1.0, 0.0, 0.0));
        let grazing = if grazing.len_sqr() > 1e-6 {
            grazing.normalise()
        } else {
            interaction
                .shading_normal
                .cross(&Vector::new(0.0, 0.0, 1.0))
                .normalise()
        };
        let brdf = interaction.eval_brdf(ScatterType::Diffuse, grazing);
        assert_eq!(brdf.r, 0.0);
    }

    #[test]
    fn glass_transparency_allows_refract_branch_to_be_drawn() {
        let material = glass_material(1.5);
        let hit = RawHit {
            t: 1.0,
            geometric_normal: Vector::new(0.0, 1.0, 0.0),
            shading_normal: None,
            material: &material,
        };
        let mut r = rng();
        let interaction = Interaction::construct(
            Vector::new(0.0, -1.0, 0.0),
            1.0,
            1.0,
            Vector::ZERO,
            &hit,
            &mut r,
        );
        let mut saw_refract = false;
        for _ in 0..500 {
            if interaction.select_type(&mut r) == ScatterType::Refract {
                saw_refract = true;
                break;
            }
        }
        assert!(saw_refract);
    }
}
