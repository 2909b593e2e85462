//! The Pass-1 worker loop: emission budgeting, the per-bounce rule, and
//! shadow-photon scanning. Driven by the bounded queue in [`crate::work`];
//! each worker owns an RNG and four private photon vectors, folded into
//! octrees only after every worker has joined.

use indicatif::{ProgressBar, ProgressStyle};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::config::{IntegratorConfig, PhotonMapConfig};
use crate::interaction::{Interaction, ScatterType};
use crate::primitives::{Colour, Ray, Vector};
use crate::scene::Scene;
use crate::transforms::{self, AIR_IOR, EPSILON};
use crate::work::WorkQueue;

use super::{Photon, PhotonMaps, ShadowPhoton};

/// Emissions are packaged in chunks of roughly this size so the work queue
/// has enough jobs to load-balance across workers without per-photon
/// locking.
const EMISSIONS_PER_CHUNK: u32 = 100_000;

struct EmissionChunk {
    emitter_index: usize,
    photon_flux: Colour,
    count: u32,
}

#[derive(Default)]
struct ThreadVectors {
    direct: Vec<Photon>,
    indirect: Vec<Photon>,
    caustic: Vec<Photon>,
    shadow: Vec<ShadowPhoton>,
}

/// Run Pass 1 to completion and return the four frozen photon maps.
///
/// `seed` fixes both the chunk shuffle order and the per-worker RNG
/// sequence for reproducibility; pass `None`
/// to seed nondeterministically.
pub fn trace_photons(
    scene: &dyn Scene,
    photon_map: &PhotonMapConfig,
    integrator: &IntegratorConfig,
    seed: Option<u64>,
) -> PhotonMaps {
    let bounds = scene.bounding_box();
    let emitters = scene.emissives();

    if emitters.is_empty() {
        return PhotonMaps::from_vectors(
            bounds,
            photon_map.max_photons_per_octree_leaf,
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
    }

    let mut master_rng = match seed {
        Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
        None => Xoshiro256PlusPlus::from_entropy(),
    };

    let chunks = build_emission_chunks(emitters, photon_map, &mut master_rng);
    let total_emissions: u64 = chunks.iter().map(|c| c.count as u64).sum();
    let queue = WorkQueue::new(chunks);

    let progress = ProgressBar::new(total_emissions);
    progress.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} photons emitted ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let worker_seeds: Vec<u64> = (0..integrator.num_threads.max(1))
        .map(|_| master_rng.gen())
        .collect();
    let seeds = std::sync::Mutex::new(worker_seeds.into_iter());

    let thread_vectors = crate::work::run_workers(&queue, integrator.num_threads, |queue| {
        let worker_seed = seeds.lock().unwrap().next().unwrap_or(0);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(worker_seed);
        let mut vectors = ThreadVectors::default();
        while let Some(chunk) = queue.pop() {
            let emitter = &scene.emissives()[chunk.emitter_index];
            for _ in 0..chunk.count {
                emit_one(scene, photon_map, integrator, emitter.as_ref(), chunk.photon_flux, &mut rng, &mut vectors);
            }
            progress.inc(chunk.count as u64);
        }
        vectors
    });
    progress.finish_and_clear();

    let mut direct = Vec::new();
    let mut indirect = Vec::new();
    let mut caustic = Vec::new();
    let mut shadow = Vec::new();
    for v in thread_vectors {
        direct.extend(v.direct);
        indirect.extend(v.indirect);
        caustic.extend(v.caustic);
        shadow.extend(v.shadow);
    }

    PhotonMaps::from_vectors(
        bounds,
        photon_map.max_photons_per_octree_leaf,
        direct,
        indirect,
        caustic,
        shadow,
    )
}

fn build_emission_chunks(
    emitters: &[Box<dyn crate::scene::Emitter>],
    photon_map: &PhotonMapConfig,
    rng: &mut impl Rng,
) -> Vec<EmissionChunk> {
    let total_flux: f32 = emitters.iter().map(|e| e.emitted_flux().l1_norm()).sum();

    let mut chunks = Vec::new();
    if total_flux <= 0.0 {
        return chunks;
    }

    for (index, emitter) in emitters.iter().enumerate() {
        let flux = emitter.emitted_flux();
        let share = flux.l1_norm() / total_flux;
        let n_i = ((photon_map.emissions as f32 * share).round() as u32).max(1);
        let photon_flux = flux / n_i as f32;

        let scaled_count = ((n_i as f32) * photon_map.caustic_factor).round() as u32;
        let mut remaining = scaled_count;
        while remaining > 0 {
            let count = remaining.min(EMISSIONS_PER_CHUNK);
            chunks.push(EmissionChunk {
                emitter_index: index,
                photon_flux,
                count,
            });
            remaining -= count;
        }
    }

    chunks.shuffle(rng);
    chunks
}

#[allow(clippy::too_many_arguments)]
fn emit_one(
    scene: &dyn Scene,
    photon_map: &PhotonMapConfig,
    integrator: &IntegratorConfig,
    emitter: &dyn crate::scene::Emitter,
    photon_flux: Colour,
    rng: &mut impl Rng,
    vectors: &mut ThreadVectors,
) {
    let u: f32 = rng.gen();
    let v: f32 = rng.gen();
    let point = emitter.sample_point(u, v);
    let normal = emitter.normal(point);
    let direction = transforms::cosine_weighted_hemisphere(normal, rng);
    let origin = point + normal * EPSILON;

    let ray = Ray::new(origin, direction, AIR_IOR);
    trace_bounce(scene, photon_map, integrator, ray, photon_flux, rng, vectors);
}

fn trace_bounce(
    scene: &dyn Scene,
    photon_map: &PhotonMapConfig,
    integrator: &IntegratorConfig,
    ray: Ray,
    flux: Colour,
    rng: &mut impl Rng,
    vectors: &mut ThreadVectors,
) {
    if ray.depth >= integrator.max_ray_depth {
        tracing::warn!(depth = ray.depth, "bias introduced: photon path hit max_ray_depth");
        return;
    }

    let hit = match scene.intersect(ray.origin, ray.direction) {
        Some(hit) => hit,
        None => return,
    };

    let position = ray.point_at(hit.t);
    let interaction = Interaction::construct(ray.direction, ray.medium_ior, hit.t, position, &hit, rng);
    let branch = interaction.select_type(rng);

    let (scatter_direction, next_medium, resolved_branch) = match branch {
        ScatterType::Diffuse => (transforms::reflect_diffuse(&interaction, rng), interaction.n1, ScatterType::Diffuse),
        ScatterType::Reflect => match transforms::reflect_specular(&interaction) {
            Some(d) => (d, interaction.n1, ScatterType::Reflect),
            None => return,
        },
        ScatterType::Refract => match transforms::refract_specular(&interaction) {
            Some(d) => (d, interaction.n2, ScatterType::Refract),
            None => match transforms::reflect_specular(&interaction) {
                Some(d) => (d, interaction.n1, ScatterType::Reflect),
                None => return,
            },
        },
    };

    store_photon(scene, photon_map, integrator, &interaction, resolved_branch, &ray, position, flux, rng, vectors);

    let mut brdf = interaction.eval_brdf(resolved_branch, scatter_direction);
    if resolved_branch == ScatterType::Diffuse {
        brdf = brdf * std::f32::consts::PI;
    }

    let new_flux = flux * brdf;
    if !new_flux.is_finite() || !new_flux.is_non_negative() {
        return;
    }

    let base_survival = if ray.depth > integrator.min_ray_depth { 0.9 } else { 1.0 };
    let denom = flux.max_channel().max(1e-8);
    let survival = base_survival.min(new_flux.max_channel() / denom);

    if rng.gen::<f32>() >= survival || survival <= 0.0 {
        return;
    }

    let survived_flux = new_flux / survival;
    let offset_origin = transforms::offset_origin(position, interaction.normal, scatter_direction);
    let specular = resolved_branch != ScatterType::Diffuse;
    let next_ray = ray.advance(offset_origin, scatter_direction, next_medium, specular);

    trace_bounce(scene, photon_map, integrator, next_ray, survived_flux, rng, vectors);
}

#[allow(clippy::too_many_arguments)]
fn store_photon(
    scene: &dyn Scene,
    photon_map: &PhotonMapConfig,
    integrator: &IntegratorConfig,
    interaction: &Interaction,
    branch: ScatterType,
    ray: &Ray,
    position: Vector,
    flux: Colour,
    rng: &mut impl Rng,
    vectors: &mut ThreadVectors,
) {
    let caustic_factor = photon_map.caustic_factor;

    if branch == ScatterType::Diffuse {
        if ray.depth == 0 {
            if rng.gen::<f32>() < 1.0 / caustic_factor {
                vectors.direct.push(Photon {
                    position,
                    flux: flux * caustic_factor,
                    direction: ray.direction,
                });
                shadow_scan(scene, integrator, position, interaction.normal, ray.direction, vectors);
            }
        } else if ray.specular {
            vectors.caustic.push(Photon {
                position,
                flux,
                direction: ray.direction,
            });
        } else if rng.gen::<f32>() < 1.0 / caustic_factor {
            vectors.indirect.push(Photon {
                position,
                flux: flux * caustic_factor,
                direction: ray.direction,
            });
        }
    }

    if branch == ScatterType::Reflect && ray.depth == 0 && rng.gen::<f32>() < 1.0 / caustic_factor {
        shadow_scan(scene, integrator, position, interaction.normal, ray.direction, vectors);
    }
}

/// From a point on a surface, push a ray through it and mark every
/// diffusely-reflective surface the path crosses as occluded.
fn shadow_scan(
    scene: &dyn Scene,
    integrator: &IntegratorConfig,
    start: Vector,
    normal: Vector,
    direction: Vector,
    vectors: &mut ThreadVectors,
) {
    let mut origin = start - normal * EPSILON;
    let mut depth = 0u32;

    loop {
        if depth > integrator.max_ray_depth {
            break;
        }
        let hit = match scene.intersect(origin, direction) {
            Some(hit) => hit,
            None => break,
        };

        let mut n = hit.geometric_normal;
        if n.dot(&direction) > 0.0 {
            n = n.negate();
        }
        let position = origin + direction * hit.t;

        if hit.material.can_diffusely_reflect {
            vectors.shadow.push(ShadowPhoton { position });
        }

        origin = position - n * EPSILON;
        depth += 1;
    }
}
