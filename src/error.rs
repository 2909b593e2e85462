//! Error taxonomy. Configuration problems are surfaced at
//! construction and abort the integrator; everything that can happen once
//! Pass 1/Pass 2 are running (degenerate normals, grazing angles, depth
//! exhaustion, underfilled neighbourhoods) is handled locally by returning
//! zero contribution and is never represented as a `Result` — see the
//! per-module doc comments in `interaction`, `photon`, and `estimator`.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialise config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("{field} must be {requirement}, got {value}")]
    OutOfRange {
        field: &'static str,
        requirement: &'static str,
        value: String,
    },
}
