//! Runtime configuration.
//!
//! Layered the way the teacher crate layers `velesdb.toml`: defaults, then
//! environment variables (highest priority). There is no project config file here —
//! a numeric CLI tool has far less standing configuration than a persistent
//! database, so defaults + env is the proportionate amount of this ambient concern.

use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Figment failed to merge or extract the configuration.
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),
}

/// Engine-wide tunables, overridable via `LINDEMANN_*` environment variables.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Above this many bytes of materialized position tensor, the CLI prefers the
    /// memory-reduced ("online") driver over the materialized one when no explicit
    /// mode flag forces a choice.
    pub online_threshold_bytes: u64,

    /// The parallel reducer (component E) never splits a trajectory into chunks
    /// smaller than this many frames each, even if more CPUs are available.
    pub parallel_chunk_min_frames: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            online_threshold_bytes: 2 * 1024 * 1024 * 1024,
            parallel_chunk_min_frames: 1,
        }
    }
}

impl Settings {
    /// Loads settings from defaults, overridden by `LINDEMANN_*` environment
    /// variables (e.g. `LINDEMANN_ONLINE_THRESHOLD_BYTES=500000000`).
    pub fn load() -> Result<Self, ConfigError> {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Env::prefixed("LINDEMANN_"))
            .extract()
            .map_err(ConfigError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_environment() {
        let settings = Settings::load().expect("defaults must always load");
        assert_eq!(settings.parallel_chunk_min_frames, 1);
        assert!(settings.online_threshold_bytes > 0);
    }
}
