//! Pass 2: the radiance estimator and the `Integrator`
//! that ties config, scene, and the frozen photon maps together behind the
//! single `sample_ray` entry point the outer (out-of-scope) render loop
//! calls per camera sample.

use rand::Rng;

use crate::config::RenderConfig;
use crate::interaction::{Interaction, ScatterType};
use crate::octree::KnnHit;
use crate::photon::{trace_photons, Photon, PhotonMaps};
use crate::primitives::{Colour, Ray, Vector};
use crate::scene::Scene;
use crate::transforms::{self, EPSILON};

/// Owns the frozen photon maps and drives Pass 2. Construction performs
/// Pass 1 synchronously.
pub struct Integrator {
    scene: Box<dyn Scene>,
    config: RenderConfig,
    maps: PhotonMaps,
}

impl Integrator {
    pub fn new(scene: Box<dyn Scene>, config: RenderConfig, seed: Option<u64>) -> Self {
        let maps = trace_photons(scene.as_ref(), &config.photon_map, &config.integrator, seed);
        Self { scene, config, maps }
    }

    /// Entry point invoked per camera sample by the outer render loop.
    pub fn sample_ray(&self, ray: Ray, rng: &mut impl Rng) -> Colour {
        sample_ray_impl(self.scene.as_ref(), &self.config, &self.maps, ray, rng)
    }

    pub fn maps(&self) -> &PhotonMaps {
        &self.maps
    }
}

fn sample_ray_impl(
    scene: &dyn Scene,
    config: &RenderConfig,
    maps: &PhotonMaps,
    ray: Ray,
    rng: &mut impl Rng,
) -> Colour {
    if ray.depth >= config.integrator.max_ray_depth {
        tracing::warn!(depth = ray.depth, "bias introduced: camera path hit max_ray_depth");
        return Colour::BLACK;
    }

    let hit = match scene.intersect(ray.origin, ray.direction) {
        Some(hit) => hit,
        None => return scene.sky_radiance(ray.origin, ray.direction),
    };

    let survive = if ray.depth > config.integrator.min_ray_depth {
        let absorb_probability = (1.0 - hit.material.reflect_probability).clamp(0.0, 1.0);
        if rng.gen::<f32>() < absorb_probability {
            return Colour::BLACK;
        }
        1.0 - absorb_probability
    } else {
        1.0
    };

    let position = ray.point_at(hit.t);
    let interaction = Interaction::construct(ray.direction, ray.medium_ior, hit.t, position, &hit, rng);

    let emittance = if ray.depth == 0 || ray.specular {
        interaction.material.emittance
    } else {
        Colour::BLACK
    };

    let branch = interaction.select_type(rng);

    if branch != ScatterType::Diffuse {
        if ray.depth > 0 && !ray.specular {
            return emittance / survive;
        }

        let sampled = match branch {
            ScatterType::Reflect => transforms::reflect_specular(&interaction).map(|d| (d, interaction.n1)),
            ScatterType::Refract => transforms::refract_specular(&interaction)
                .map(|d| (d, interaction.n2))
                .or_else(|| transforms::reflect_specular(&interaction).map(|d| (d, interaction.n1))),
            ScatterType::Diffuse => unreachable!(),
        };

        return match sampled {
            Some((direction, medium)) => {
                let origin = transforms::offset_origin(position, interaction.normal, direction);
                let next_ray = ray.advance(origin, direction, medium, true);
                let incoming = sample_ray_impl(scene, config, maps, next_ray, rng);
                let brdf = interaction.eval_brdf(branch, direction);
                (emittance + incoming * brdf) / survive
            }
            None => emittance / survive,
        };
    }

    // Diffuse branch: caustics are always cone-filtered from the caustic
    // map; direct/indirect either come from an analytic NEE + recursive
    // bounce, or terminate via photon-map density estimation.
    let caustic_hits = maps.caustic.knn_search(
        position,
        config.photon_map.k_nearest_photons,
        config.photon_map.max_caustic_radius,
    );
    let caustics = estimate_caustic_radiance(&interaction, &caustic_hits);

    let min_bounce_distance = 5.0 * config.photon_map.max_radius;
    let should_continue = !config.photon_map.direct_visualization
        && (ray.depth == 0 || ray.specular || hit.t >= min_bounce_distance);

    if !should_continue {
        let indirect_hits = maps.indirect.knn_search(
            position,
            config.photon_map.k_nearest_photons,
            config.photon_map.max_radius,
        );

        if indirect_hits.len() < config.photon_map.k_nearest_photons {
            return continue_diffuse(scene, config, maps, &interaction, &ray, emittance, caustics, survive, rng);
        }

        let direct_hits = maps.direct.knn_search(
            position,
            config.photon_map.k_nearest_photons,
            config.photon_map.max_radius,
        );

        let direct_estimate = if !direct_hits.is_empty() {
            estimate_radiance(&interaction, &direct_hits)
        } else if !has_shadow_photons(maps, position, config.photon_map.max_radius) {
            return continue_diffuse(scene, config, maps, &interaction, &ray, emittance, caustics, survive, rng);
        } else {
            Colour::BLACK
        };

        let indirect_estimate = estimate_radiance(&interaction, &indirect_hits);
        return (emittance + caustics + direct_estimate + indirect_estimate) / survive;
    }

    continue_diffuse(scene, config, maps, &interaction, &ray, emittance, caustics, survive, rng)
}

#[allow(clippy::too_many_arguments)]
fn continue_diffuse(
    scene: &dyn Scene,
    config: &RenderConfig,
    maps: &PhotonMaps,
    interaction: &Interaction,
    ray: &Ray,
    emittance: Colour,
    caustics: Colour,
    survive: f32,
    rng: &mut impl Rng,
) -> Colour {
    let short_circuit_direct = config.photon_map.use_shadow_photons
        && has_shadow_photons(maps, interaction.position, config.photon_map.max_radius)
        && direct_map_empty(maps, interaction.position, config.photon_map.max_radius);

    let direct = if short_circuit_direct {
        Colour::BLACK
    } else {
        let (radiance, light_direction) = sample_direct(scene, interaction, rng);
        radiance * interaction.eval_brdf(ScatterType::Diffuse, light_direction)
    };

    let bounce_direction = transforms::reflect_diffuse(interaction, rng);
    let origin = transforms::offset_origin(interaction.position, interaction.normal, bounce_direction);
    let next_ray = ray.advance(origin, bounce_direction, interaction.n1, false);
    let bounce_radiance = sample_ray_impl(scene, config, maps, next_ray, rng) * std::f32::consts::PI;
    let indirect = bounce_radiance * interaction.eval_brdf(ScatterType::Diffuse, bounce_direction);

    (emittance + caustics + direct + indirect) / survive
}

fn has_shadow_photons(maps: &PhotonMaps, position: Vector, max_radius: f32) -> bool {
    !maps.shadow.radius_empty(position, max_radius)
}

fn direct_map_empty(maps: &PhotonMaps, position: Vector, max_radius: f32) -> bool {
    maps.direct.radius_empty(position, max_radius)
}

/// Explicit next-event estimation: sample a light, test visibility, return
/// `L · cos / pdf` and the direction it was sampled along.
fn sample_direct(scene: &dyn Scene, interaction: &Interaction, rng: &mut impl Rng) -> (Colour, Vector) {
    let emitters = scene.emissives();
    if emitters.is_empty() {
        return (Colour::BLACK, interaction.shading_normal);
    }

    let index = rng.gen_range(0..emitters.len());
    let emitter = &emitters[index];

    let u: f32 = rng.gen();
    let v: f32 = rng.gen();
    let light_point = emitter.sample_point(u, v);

    let to_light = light_point - interaction.position;
    let distance_sq = to_light.len_sqr();
    if distance_sq <= 1e-12 {
        return (Colour::BLACK, interaction.shading_normal);
    }
    let distance = distance_sq.sqrt();
    let light_direction = to_light / distance;

    let cos_surface = interaction.shading_normal.dot(&light_direction);
    if cos_surface <= 0.0 {
        return (Colour::BLACK, light_direction);
    }

    let light_normal = emitter.normal(light_point);
    let cos_light = light_normal.dot(&light_direction.negate());
    if cos_light <= 0.0 {
        return (Colour::BLACK, light_direction);
    }

    let origin = transforms::offset_origin(interaction.position, interaction.normal, light_direction);
    if scene.is_occluded(origin, light_direction, distance - EPSILON) {
        return (Colour::BLACK, light_direction);
    }

    let area_pdf = 1.0 / (emitter.area() * emitters.len() as f32);
    let solid_angle_pdf = area_pdf * distance_sq / cos_light.max(1e-6);
    let radiance = emitter.material().emittance * (cos_surface / solid_angle_pdf.max(1e-8));
    (radiance, light_direction)
}

/// Density-estimate radiance from a set of k-NN photon hits. Skips photons
/// that arrived from the back of the surface.
fn estimate_radiance(interaction: &Interaction, hits: &[KnnHit<Photon>]) -> Colour {
    if hits.is_empty() {
        return Colour::BLACK;
    }
    let r_sq = hits.last().unwrap().distance_sq.max(1e-8);

    let mut sum = Colour::BLACK;
    for hit in hits {
        if hit.point.direction.dot(&interaction.shading_normal) >= 0.0 {
            continue;
        }
        let brdf = interaction.eval_brdf(ScatterType::Diffuse, hit.point.direction.negate());
        sum += hit.point.flux * brdf;
    }
    sum / r_sq
}

/// Cone-filtered caustic estimate:
/// weights nearer photons more heavily than the density estimator does.
fn estimate_caustic_radiance(interaction: &Interaction, hits: &[KnnHit<Photon>]) -> Colour {
    if hits.is_empty() {
        return Colour::BLACK;
    }
    let r_sq = hits.last().unwrap().distance_sq.max(1e-8);

    let mut sum = Colour::BLACK;
    for hit in hits {
        if hit.point.direction.dot(&interaction.shading_normal) >= 0.0 {
            continue;
        }
        let weight = (1.0 - (hit.distance_sq / r_sq).sqrt()).max(0.0);
        let brdf = interaction.eval_brdf(ScatterType::Diffuse, hit.point.direction.negate());
        sum += hit.point.flux * brdf * weight;
    }
    sum * 3.0 / r_sq
}
