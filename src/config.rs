//! Configuration schema consumed from the scene document.
//! Only the `photon_map` table and the ambient threading/recursion knobs
//! this integrator needs are modelled here; the rest of the scene document
//! (cameras, materials, objects) belongs to the out-of-scope scene loader.
//! Parsing uses a plain `serde` + `toml` deserialize, with a `thiserror`
//! enum instead of a boxed trait object so callers can match on the
//! failure.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration this crate reads: the `photon_map` table plus
/// the threading/recursion knobs the integrator is parameterised by.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RenderConfig {
    pub photon_map: PhotonMapConfig,
    pub integrator: IntegratorConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            photon_map: PhotonMapConfig::default(),
            integrator: IntegratorConfig::default(),
        }
    }
}

/// The `photon_map` config table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PhotonMapConfig {
    /// Target photon emissions before caustic scaling.
    pub emissions: u32,

    /// Multiplier on total emissions; inverse is stored per non-caustic
    /// photon (`caustic_factor >= 1`).
    pub caustic_factor: f32,

    /// k-NN search radius for direct/indirect/shadow.
    pub max_radius: f32,

    /// k-NN search radius for caustics.
    pub max_caustic_radius: f32,

    /// `k` in all k-NN queries.
    #[serde(default = "default_k_nearest_photons")]
    pub k_nearest_photons: usize,

    /// Octree leaf capacity.
    pub max_photons_per_octree_leaf: usize,

    /// Force the direct estimate from the photon map (debug visualisation).
    #[serde(default)]
    pub direct_visualization: bool,

    /// Enable/disable shadow-photon logic.
    #[serde(default = "default_use_shadow_photons")]
    pub use_shadow_photons: bool,
}

fn default_k_nearest_photons() -> usize {
    50
}

fn default_use_shadow_photons() -> bool {
    true
}

impl Default for PhotonMapConfig {
    fn default() -> Self {
        Self {
            emissions: 100_000,
            caustic_factor: 1.0,
            max_radius: 0.5,
            max_caustic_radius: 0.5,
            k_nearest_photons: default_k_nearest_photons(),
            max_photons_per_octree_leaf: 8,
            direct_visualization: false,
            use_shadow_photons: default_use_shadow_photons(),
        }
    }
}

impl PhotonMapConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.caustic_factor < 1.0 {
            return Err(ConfigError::OutOfRange {
                field: "photon_map.caustic_factor",
                requirement: ">= 1",
                value: self.caustic_factor.to_string(),
            });
        }
        if self.k_nearest_photons == 0 {
            return Err(ConfigError::OutOfRange {
                field: "photon_map.k_nearest_photons",
                requirement: ">= 1",
                value: self.k_nearest_photons.to_string(),
            });
        }
        if self.max_photons_per_octree_leaf == 0 {
            return Err(ConfigError::OutOfRange {
                field: "photon_map.max_photons_per_octree_leaf",
                requirement: ">= 1",
                value: self.max_photons_per_octree_leaf.to_string(),
            });
        }
        if self.max_radius <= 0.0 || self.max_caustic_radius <= 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "photon_map.max_radius / max_caustic_radius",
                requirement: "> 0",
                value: format!("{}, {}", self.max_radius, self.max_caustic_radius),
            });
        }
        Ok(())
    }
}

/// Threading and recursion knobs consumed by `Integrator::num_threads`,
/// `max_ray_depth`, `min_ray_depth`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IntegratorConfig {
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,

    #[serde(default = "default_max_ray_depth")]
    pub max_ray_depth: u32,

    #[serde(default = "default_min_ray_depth")]
    pub min_ray_depth: u32,
}

fn default_num_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_max_ray_depth() -> u32 {
    64
}

fn default_min_ray_depth() -> u32 {
    3
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            num_threads: default_num_threads(),
            max_ray_depth: default_max_ray_depth(),
            min_ray_depth: default_min_ray_depth(),
        }
    }
}

impl RenderConfig {
    pub fn from_toml_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        let config: RenderConfig = toml::from_str(&contents)?;
        config.photon_map.validate()?;
        Ok(config)
    }

    pub fn to_toml_file(&self, path: &str) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })
    }
}
