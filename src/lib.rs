//! Offline, physically-based photon-mapping light transport: a photon
//! tracer (Pass 1), an octree spatial index over the photons it produces,
//! and a radiance estimator (Pass 2) that reads the frozen maps back. Scene
//! loading, mesh/BVH intersection, camera ray generation, and tonemapping
//! are consumed as external interfaces (see [`scene`]) rather than
//! implemented here.

pub mod config;
pub mod error;
pub mod estimator;
pub mod interaction;
pub mod octree;
pub mod photon;
pub mod primitives;
pub mod scene;
pub mod transforms;
pub mod work;

pub use config::{IntegratorConfig, PhotonMapConfig, RenderConfig};
pub use error::ConfigError;
pub use estimator::Integrator;
pub use interaction::{Interaction, ScatterType};
pub use photon::{trace_photons, Photon, PhotonMaps, ShadowPhoton};
pub use scene::{Emitter, Material, RawHit, Scene};
